//! Lowering of the typed lifted model into the flat [`strips`](crate::strips)
//! representation: type resolution, expression flattening, and the add/delete
//! effect split. Everything here is a deterministic pure function of the
//! input problem; a rejection is never transient.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{Result, UnsupportedProblemError};
use crate::model::{Action, Expression, Feature, Problem, Term, Value, OBJECT_TYPE};
use crate::strips;

/// Per-session type registry. One table is created per `ground`/`solve`
/// invocation and discarded with it, so nodes never leak between unrelated
/// translations. Within a session each type name resolves to exactly one
/// shared node.
pub struct TypeTable {
    types: BTreeMap<String, Rc<strips::Type>>,
    has_object_type: bool,
}

impl TypeTable {
    pub fn new(problem: &Problem) -> Self {
        let has_object_type = problem.has_type(OBJECT_TYPE);
        let mut types = BTreeMap::new();
        if !has_object_type {
            // synthetic universal root every parentless type hangs below
            types.insert(
                String::from(OBJECT_TYPE),
                Rc::new(strips::Type { name: String::from(OBJECT_TYPE), parent: None }),
            );
        }
        TypeTable { types, has_object_type }
    }

    /// Memoized resolution of a declared type name to its node, building the
    /// parent chain first on a miss. A name that is not a declared user type
    /// is a programming error, not a rejection.
    pub fn resolve(&mut self, problem: &Problem, name: &str) -> Result<Rc<strips::Type>> {
        self.resolve_guarded(problem, name, &mut Vec::new())
    }

    fn resolve_guarded(
        &mut self,
        problem: &Problem,
        name: &str,
        visiting: &mut Vec<String>,
    ) -> Result<Rc<strips::Type>> {
        if let Some(node) = self.types.get(name) {
            return Ok(node.clone());
        }
        if visiting.iter().any(|v| v == name) {
            return Err(UnsupportedProblemError::TypeCycle(String::from(name)));
        }
        let declared = match problem.user_type(name) {
            Some(t) => t,
            None => panic!("`{}` is not a declared user type", name),
        };
        visiting.push(String::from(name));
        let parent = match &declared.parent {
            Some(parent) => Some(self.resolve_guarded(problem, parent, visiting)?),
            // a parentless type hangs below the synthetic root, unless the
            // problem claimed the root name for itself
            None if !self.has_object_type => Some(self.types[OBJECT_TYPE].clone()),
            None => None,
        };
        visiting.pop();
        let node = Rc::new(strips::Type { name: String::from(name), parent });
        self.types.insert(String::from(name), node.clone());
        Ok(node)
    }
}

/// Flattens an implicit conjunction of expressions into predicate templates.
/// Work-list traversal, so deep conjunctions cannot exhaust the stack; the
/// emitted order is irrelevant to every consumer. Anything other than a
/// fluent application or a conjunction is rejected with its context.
fn flatten<F>(
    exprs: &[Expression],
    context: &str,
    resolve_term: &mut F,
) -> Result<Vec<strips::Predicate>>
where
    F: FnMut(&Term) -> Result<(String, Rc<strips::Type>)>,
{
    let mut flat = Vec::new();
    let mut stack: Vec<&Expression> = exprs.iter().collect();
    while let Some(x) = stack.pop() {
        match x {
            Expression::Fluent { name, args } => {
                let mut signature = Vec::with_capacity(args.len());
                for arg in args {
                    signature.push(resolve_term(arg)?);
                }
                flat.push(strips::Predicate::new(name, signature));
            }
            Expression::And(subs) => stack.extend(subs.iter()),
            other => {
                return Err(UnsupportedProblemError::UnsupportedExpression {
                    expression: other.to_string(),
                    context: String::from(context),
                })
            }
        }
    }
    Ok(flat)
}

/// Resolves a literal argument inside an action body: either a parameter
/// bound by the action or a declared object. Constants are not expressible
/// in this fragment.
fn bound_term(
    table: &mut TypeTable,
    problem: &Problem,
    action: &Action,
    term: &Term,
    context: &str,
) -> Result<(String, Rc<strips::Type>)> {
    match term {
        Term::Parameter(name) => {
            let parameter = match action.parameter(name) {
                Some(p) => p,
                None => panic!("parameter `{}` is not bound by action `{}`", name, action.name),
            };
            Ok((name.clone(), table.resolve(problem, &parameter.type_name)?))
        }
        Term::Object(name) => Ok((name.clone(), object_type(table, problem, name)?)),
        Term::Constant(_) => Err(UnsupportedProblemError::UnsupportedOperand {
            operand: term.to_string(),
            context: String::from(context),
        }),
    }
}

/// Resolves a goal-level argument, which has no parameters in scope: only a
/// declared object is acceptable. This is user-authored data, so a parameter
/// here is a rejection, not an assertion.
fn ground_term(
    table: &mut TypeTable,
    problem: &Problem,
    term: &Term,
    context: &str,
) -> Result<(String, Rc<strips::Type>)> {
    match term {
        Term::Object(name) => Ok((name.clone(), object_type(table, problem, name)?)),
        Term::Parameter(_) | Term::Constant(_) => {
            Err(UnsupportedProblemError::UnsupportedOperand {
                operand: term.to_string(),
                context: String::from(context),
            })
        }
    }
}

fn object_type(
    table: &mut TypeTable,
    problem: &Problem,
    name: &str,
) -> Result<Rc<strips::Type>> {
    let type_name = match problem.objects.get(name) {
        Some(t) => t,
        None => panic!("`{}` is not a declared object", name),
    };
    table.resolve(problem, type_name)
}

/// Assembles the target domain. The capability checks run before any
/// translation work; each failure names its own distinct reason.
pub fn convert_domain(table: &mut TypeTable, problem: &Problem) -> Result<strips::Domain> {
    let kind = problem.kind();
    if kind.has(Feature::NegativeConditions) {
        return Err(UnsupportedProblemError::NegativeConditions(problem.name.clone()));
    }
    if kind.has(Feature::DisjunctiveConditions) {
        return Err(UnsupportedProblemError::DisjunctiveConditions(problem.name.clone()));
    }
    if kind.has(Feature::Equality) {
        return Err(UnsupportedProblemError::Equality(problem.name.clone()));
    }
    if kind.has(Feature::DiscreteNumbers) || kind.has(Feature::ContinuousNumbers) {
        return Err(UnsupportedProblemError::Numbers(problem.name.clone()));
    }
    if kind.has(Feature::ConditionalEffects) {
        return Err(UnsupportedProblemError::ConditionalEffects(problem.name.clone()));
    }

    for name in problem.user_types.keys() {
        table.resolve(problem, name)?;
    }

    let mut predicates = BTreeMap::new();
    for fluent in problem.fluents.values() {
        let mut signature = Vec::with_capacity(fluent.signature.len());
        for (i, parameter) in fluent.signature.iter().enumerate() {
            // declaration slots get positional names; nothing downstream
            // reads them back
            signature.push((format!("a_{}", i), table.resolve(problem, &parameter.type_name)?));
        }
        predicates.insert(fluent.name.clone(), strips::Predicate::new(&fluent.name, signature));
    }

    let mut actions = BTreeMap::new();
    for action in problem.actions.values() {
        actions.insert(action.name.clone(), convert_action(table, problem, action)?);
    }

    Ok(strips::Domain {
        name: format!("domain_{}", problem.name),
        types: table.types.values().cloned().collect(),
        predicates,
        actions,
    })
}

/// Translates one instantaneous action: parameters 1:1, preconditions
/// flattened, and every effect routed into exactly one of the add-set or
/// delete-set by its target truth value.
pub fn convert_action(
    table: &mut TypeTable,
    problem: &Problem,
    action: &Action,
) -> Result<strips::Action> {
    let mut signature = Vec::with_capacity(action.parameters.len());
    for parameter in &action.parameters {
        signature.push((parameter.name.clone(), table.resolve(problem, &parameter.type_name)?));
    }

    let context = format!("action `{}`", action.name);
    let preconditions = {
        let mut resolve = |term: &Term| bound_term(table, problem, action, term, &context);
        flatten(&action.preconditions, &context, &mut resolve)?
    };

    let mut effect = strips::Effect::default();
    for e in &action.effects {
        // conditional effects were already rejected at the domain level
        assert!(e.condition.is_none(), "conditional effect reached the effect partitioner");
        let mut signature = Vec::with_capacity(e.args.len());
        for arg in &e.args {
            signature.push(bound_term(table, problem, action, arg, &context)?);
        }
        let predicate = strips::Predicate::new(&e.fluent, signature);
        match e.value {
            Value::Bool(true) => {
                effect.add.insert(predicate);
            }
            Value::Bool(false) => {
                effect.del.insert(predicate);
            }
            Value::Number(_) => {
                unreachable!("numeric effects are rejected before action translation")
            }
        }
    }

    Ok(strips::Action { name: action.name.clone(), signature, preconditions, effect })
}

/// Assembles the target problem: typed object map, closed-world initial
/// facts, and the flattened goal conjunction.
pub fn convert_problem(
    table: &mut TypeTable,
    domain: strips::Domain,
    problem: &Problem,
) -> Result<strips::Problem> {
    let mut objects = BTreeMap::new();
    for (name, type_name) in &problem.objects {
        objects.insert(name.clone(), table.resolve(problem, type_name)?);
    }
    let init = convert_initial_values(table, problem)?;
    let goals = {
        let mut resolve = |term: &Term| ground_term(table, problem, term, "goal");
        flatten(&problem.goals, "goal", &mut resolve)?
    };
    Ok(strips::Problem { name: problem.name.clone(), domain, objects, init, goals })
}

/// Closed world: only assignments holding the constant `true` survive as
/// initial facts; `false` assignments are dropped and anything non-boolean is
/// a rejection.
fn convert_initial_values(
    table: &mut TypeTable,
    problem: &Problem,
) -> Result<Vec<strips::Predicate>> {
    let mut facts = Vec::new();
    for assignment in &problem.initial_values {
        let truth = match assignment.value.as_bool() {
            Some(truth) => truth,
            None => {
                return Err(UnsupportedProblemError::NonBooleanInitialValue {
                    fluent: assignment.fluent.clone(),
                    value: assignment.value.to_string(),
                })
            }
        };
        if truth {
            let mut signature = Vec::with_capacity(assignment.args.len());
            for object in &assignment.args {
                signature.push((object.clone(), object_type(table, problem, object)?));
            }
            facts.push(strips::Predicate::new(&assignment.fluent, signature));
        }
    }
    Ok(facts)
}

/// Full lowering with a fresh session: domain first, then problem.
pub fn translate(problem: &Problem) -> Result<strips::Problem> {
    let mut table = TypeTable::new(problem);
    let domain = convert_domain(&mut table, problem)?;
    convert_problem(&mut table, domain, problem)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use fixed::types::I40F24;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::fixtures::rooms_problem;
    use crate::model::{Assignment, Effect, Expression, Term};

    #[test]
    fn resolution_is_idempotent() {
        let problem = rooms_problem();
        let mut table = TypeTable::new(&problem);
        let first = table.resolve(&problem, "room").unwrap();
        let second = table.resolve(&problem, "room").unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn parentless_types_hang_below_the_synthetic_root() {
        let problem = rooms_problem();
        let mut table = TypeTable::new(&problem);
        let room = table.resolve(&problem, "room").unwrap();
        assert_eq!(room.parent.as_ref().unwrap().name, OBJECT_TYPE);
        assert!(room.parent.as_ref().unwrap().parent.is_none());
    }

    #[test]
    fn declared_root_type_is_not_doubled() {
        let mut problem = rooms_problem();
        problem.add_type(OBJECT_TYPE, None);
        problem.user_types.get_mut("room").unwrap().parent = Some(String::from(OBJECT_TYPE));
        let mut table = TypeTable::new(&problem);
        let object = table.resolve(&problem, OBJECT_TYPE).unwrap();
        assert!(object.parent.is_none());
        let room = table.resolve(&problem, "room").unwrap();
        assert!(Rc::ptr_eq(room.parent.as_ref().unwrap(), &object));
    }

    #[test]
    fn parent_chain_resolves_through_the_table() {
        let mut problem = rooms_problem();
        problem.add_type("vehicle", None);
        problem.add_type("truck", Some("vehicle"));
        let mut table = TypeTable::new(&problem);
        let truck = table.resolve(&problem, "truck").unwrap();
        let vehicle = table.resolve(&problem, "vehicle").unwrap();
        assert!(Rc::ptr_eq(truck.parent.as_ref().unwrap(), &vehicle));
        assert!(truck.is_subtype_of(&vehicle));
    }

    #[test]
    fn type_cycle_is_a_rejection_not_a_hang() {
        let mut problem = rooms_problem();
        problem.add_type("a", Some("b"));
        problem.add_type("b", Some("a"));
        let mut table = TypeTable::new(&problem);
        assert_eq!(
            table.resolve(&problem, "a"),
            Err(UnsupportedProblemError::TypeCycle(String::from("a")))
        );
    }

    #[test]
    fn flattening_is_conjunction_order_insensitive() {
        let goal_a = Expression::And(vec![
            Expression::fluent("at", &[Term::object("r1")]),
            Expression::fluent("at", &[Term::object("r2")]),
        ]);
        let goal_b = Expression::And(vec![
            Expression::fluent("at", &[Term::object("r2")]),
            Expression::fluent("at", &[Term::object("r1")]),
        ]);
        let mut sets = Vec::new();
        for goal in [goal_a, goal_b] {
            let mut problem = rooms_problem();
            problem.goals.clear();
            problem.add_goal(goal);
            let translated = translate(&problem).unwrap();
            sets.push(translated.goals.into_iter().collect::<BTreeSet<_>>());
        }
        assert_eq!(sets[0], sets[1]);
    }

    #[test]
    fn nested_conjunctions_flatten_completely() {
        let mut problem = rooms_problem();
        problem.goals.clear();
        problem.add_goal(Expression::And(vec![
            Expression::fluent("at", &[Term::object("r1")]),
            Expression::And(vec![
                Expression::fluent("at", &[Term::object("r2")]),
                Expression::And(vec![]),
            ]),
        ]));
        let translated = translate(&problem).unwrap();
        assert_eq!(translated.goals.len(), 2);
    }

    #[test]
    fn closed_world_initial_state() {
        let mut problem = rooms_problem();
        problem.assign(Assignment::new("at", &["r2"], Value::Bool(false)));
        let translated = translate(&problem).unwrap();
        let facts: Vec<String> = translated.init.iter().map(|p| p.to_string()).collect();
        assert_eq!(facts, vec![String::from("(at r1)")]);
    }

    #[test]
    fn every_effect_lands_in_exactly_one_set() {
        let problem = rooms_problem();
        let translated = translate(&problem).unwrap();
        let action = &translated.domain.actions["move"];
        let effect = &action.effect;
        assert_eq!(effect.add.len() + effect.del.len(), 2);
        assert!(effect.add.is_disjoint(&effect.del));
        assert_eq!(effect.add.iter().next().unwrap().to_string(), "(at to)");
        assert_eq!(effect.del.iter().next().unwrap().to_string(), "(at from)");
    }

    #[test]
    fn duplicate_effects_collapse() {
        let mut problem = rooms_problem();
        let action = problem.actions.get_mut("move").unwrap();
        action.effects.push(Effect::new("at", &[Term::param("to")], true));
        let translated = translate(&problem).unwrap();
        assert_eq!(translated.domain.actions["move"].effect.add.len(), 1);
    }

    #[test]
    fn negated_goal_is_rejected() {
        let mut problem = rooms_problem();
        problem.goals.clear();
        problem.add_goal(Expression::Not(Box::new(Expression::fluent(
            "at",
            &[Term::object("r1")],
        ))));
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::NegativeConditions(String::from("rooms")))
        );
    }

    #[test]
    fn numeric_initial_value_is_rejected() {
        let mut problem = rooms_problem();
        problem.add_fluent(crate::model::Fluent::new("battery-level", &[]));
        problem.assign(Assignment::new(
            "battery-level",
            &[],
            Value::Number(I40F24::from_num(5)),
        ));
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::Numbers(String::from("rooms")))
        );
    }

    #[test]
    fn disjunctive_precondition_is_rejected() {
        let mut problem = rooms_problem();
        let action = problem.actions.get_mut("move").unwrap();
        action.preconditions = vec![Expression::Or(vec![
            Expression::fluent("at", &[Term::param("from")]),
            Expression::fluent("at", &[Term::param("to")]),
        ])];
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::DisjunctiveConditions(String::from("rooms")))
        );
    }

    #[test]
    fn equality_is_rejected() {
        let mut problem = rooms_problem();
        let action = problem.actions.get_mut("move").unwrap();
        action
            .preconditions
            .push(Expression::Equals(Term::param("from"), Term::param("to")));
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::Equality(String::from("rooms")))
        );
    }

    #[test]
    fn conditional_effect_is_rejected() {
        let mut problem = rooms_problem();
        let action = problem.actions.get_mut("move").unwrap();
        action.effects[0].condition =
            Some(Expression::fluent("at", &[Term::param("from")]));
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::ConditionalEffects(String::from("rooms")))
        );
    }

    #[test]
    fn free_parameter_in_goal_is_an_unsupported_operand() {
        let mut problem = rooms_problem();
        problem.goals.clear();
        problem.add_goal(Expression::fluent("at", &[Term::param("x")]));
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::UnsupportedOperand {
                operand: String::from("x"),
                context: String::from("goal"),
            })
        );
    }

    #[test]
    fn domain_level_rejection_precedes_flattening() {
        let mut problem = rooms_problem();
        let action = problem.actions.get_mut("move").unwrap();
        action.preconditions = vec![Expression::And(vec![Expression::Not(Box::new(
            Expression::fluent("at", &[Term::param("from")]),
        ))])];
        assert_eq!(
            translate(&problem),
            Err(UnsupportedProblemError::NegativeConditions(String::from("rooms")))
        );
    }

    #[test]
    fn flattener_rejects_stray_operators_literal_by_literal() {
        // drive the problem translator directly so the per-literal path is
        // exercised without the up-front capability checks
        let mut problem = rooms_problem();
        problem.goals.clear();
        problem.add_goal(Expression::Or(vec![Expression::fluent(
            "at",
            &[Term::object("r1")],
        )]));
        let mut table = TypeTable::new(&problem);
        let domain = strips::Domain {
            name: String::from("domain_rooms"),
            types: Vec::new(),
            predicates: BTreeMap::new(),
            actions: BTreeMap::new(),
        };
        assert_eq!(
            convert_problem(&mut table, domain, &problem),
            Err(UnsupportedProblemError::UnsupportedExpression {
                expression: String::from("(or (at r1))"),
                context: String::from("goal"),
            })
        );
    }

    #[test]
    fn fluent_declarations_use_positional_slot_names() {
        let problem = rooms_problem();
        let translated = translate(&problem).unwrap();
        let at = &translated.domain.predicates["at"];
        assert_eq!(at.signature.len(), 1);
        assert_eq!(at.signature[0].0, "a_0");
        assert_eq!(at.signature[0].1.name, "room");
    }

    #[test]
    fn domain_carries_the_session_type_list() {
        let problem = rooms_problem();
        let translated = translate(&problem).unwrap();
        let names: Vec<&str> =
            translated.domain.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec![OBJECT_TYPE, "room"]);
        assert_eq!(translated.domain.name, "domain_rooms");
    }

    #[test]
    fn objects_map_to_resolved_nodes() {
        let problem = rooms_problem();
        let translated = translate(&problem).unwrap();
        assert_eq!(translated.objects.len(), 2);
        assert_eq!(translated.objects["r1"].name, "room");
        assert!(Rc::ptr_eq(&translated.objects["r1"], &translated.objects["r2"]));
    }
}
