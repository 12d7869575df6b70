//! Bundled grounding and search collaborators. The bridge treats this module
//! as an external engine: it hands over a translated [`strips::Problem`],
//! gets back an opaque ground task plus a lift map, and later a sequence of
//! ground action identifiers. Nothing here is tuned for performance; it is a
//! reference engine with the exact interface shape the bridge relies on.

use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use crate::strips;

/// A fully instantiated action: preconditions and effects are sets of ground
/// fact identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub name: String,
    pub preconditions: BTreeSet<String>,
    pub add_effects: BTreeSet<String>,
    pub del_effects: BTreeSet<String>,
}

impl Operator {
    pub fn applicable(&self, state: &BTreeSet<String>) -> bool {
        self.preconditions.is_subset(state)
    }

    pub fn apply(&self, state: &BTreeSet<String>) -> BTreeSet<String> {
        let mut next: BTreeSet<String> =
            state.difference(&self.del_effects).cloned().collect();
        next.extend(self.add_effects.iter().cloned());
        next
    }
}

/// The ground, propositional planning task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub name: String,
    pub facts: BTreeSet<String>,
    pub initial_state: BTreeSet<String>,
    pub goals: BTreeSet<String>,
    pub operators: Vec<Operator>,
}

impl Task {
    pub fn goal_reached(&self, state: &BTreeSet<String>) -> bool {
        self.goals.is_subset(state)
    }
}

/// Maps each ground operator name back to the originating action name and
/// its bound arguments, in parameter order.
pub type LiftMap = BTreeMap<String, (String, Vec<String>)>;

/// Ground action or fact identifier: `(name arg …)`.
fn instance_name(name: &str, args: &[&str]) -> String {
    if args.is_empty() {
        format!("({})", name)
    } else {
        format!("({} {})", name, args.join(" "))
    }
}

fn substitute(predicate: &strips::Predicate, binding: &BTreeMap<&str, &str>) -> String {
    let args: Vec<&str> = predicate
        .signature
        .iter()
        .map(|(name, _)| binding.get(name.as_str()).copied().unwrap_or(name.as_str()))
        .collect();
    instance_name(&predicate.name, &args)
}

/// Every type-consistent combination of objects for the given parameter
/// domains. An empty domain anywhere means no instances at all.
fn combinations<'a>(domains: &[Vec<&'a str>]) -> Vec<Vec<&'a str>> {
    let mut combos = vec![Vec::new()];
    for domain in domains {
        let mut grown = Vec::with_capacity(combos.len() * domain.len());
        for combo in &combos {
            for object in domain {
                let mut next = combo.clone();
                next.push(*object);
                grown.push(next);
            }
        }
        combos = grown;
    }
    combos
}

/// Expands every action of the translated problem over all type-compatible
/// object bindings. Returns the ground task and the lift map for replaying a
/// ground plan against the original model.
pub fn ground(problem: &strips::Problem) -> (Task, LiftMap) {
    let mut operators = Vec::new();
    let mut lift = LiftMap::new();
    let mut facts = BTreeSet::new();

    for action in problem.domain.actions.values() {
        let domains: Vec<Vec<&str>> = action
            .signature
            .iter()
            .map(|(_, parameter_type)| {
                problem
                    .objects
                    .iter()
                    .filter(|(_, object_type)| object_type.is_subtype_of(parameter_type))
                    .map(|(name, _)| name.as_str())
                    .collect()
            })
            .collect();
        for combo in combinations(&domains) {
            let binding: BTreeMap<&str, &str> = action
                .signature
                .iter()
                .map(|(parameter, _)| parameter.as_str())
                .zip(combo.iter().copied())
                .collect();
            let name = instance_name(&action.name, &combo);
            let preconditions: BTreeSet<String> =
                action.preconditions.iter().map(|p| substitute(p, &binding)).collect();
            let add_effects: BTreeSet<String> =
                action.effect.add.iter().map(|p| substitute(p, &binding)).collect();
            let del_effects: BTreeSet<String> =
                action.effect.del.iter().map(|p| substitute(p, &binding)).collect();
            facts.extend(preconditions.iter().cloned());
            facts.extend(add_effects.iter().cloned());
            facts.extend(del_effects.iter().cloned());
            lift.insert(
                name.clone(),
                (action.name.clone(), combo.iter().map(|o| String::from(*o)).collect()),
            );
            operators.push(Operator { name, preconditions, add_effects, del_effects });
        }
    }

    let initial_state: BTreeSet<String> =
        problem.init.iter().map(|p| p.to_string()).collect();
    let goals: BTreeSet<String> = problem.goals.iter().map(|p| p.to_string()).collect();
    facts.extend(initial_state.iter().cloned());
    facts.extend(goals.iter().cloned());

    let task = Task {
        name: problem.name.clone(),
        facts,
        initial_state,
        goals,
        operators,
    };
    (task, lift)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    BreadthFirst,
}

/// State estimator slot. The breadth-first strategy is blind, so the bridge
/// always passes `None`; the slot exists because the engine contract admits
/// informed strategies.
pub trait Heuristic {
    fn estimate(&self, task: &Task, state: &BTreeSet<String>) -> usize;
}

/// Runs the selected strategy over the task. `Some` holds the ordered ground
/// action identifiers of a plan (possibly empty), `None` means the whole
/// reachable space was exhausted without satisfying the goals.
pub fn search(
    task: &Task,
    strategy: Strategy,
    _heuristic: Option<&dyn Heuristic>,
) -> Option<Vec<String>> {
    match strategy {
        Strategy::BreadthFirst => breadth_first_search(task),
    }
}

fn breadth_first_search(task: &Task) -> Option<Vec<String>> {
    let mut visited: HashSet<BTreeSet<String>> = HashSet::new();
    // (parent node, operator applied to reach this state), root has neither
    let mut nodes: Vec<(Option<(usize, usize)>, BTreeSet<String>)> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    visited.insert(task.initial_state.clone());
    nodes.push((None, task.initial_state.clone()));
    queue.push_back(0);

    while let Some(index) = queue.pop_front() {
        let state = nodes[index].1.clone();
        if task.goal_reached(&state) {
            return Some(extract_plan(task, &nodes, index));
        }
        for (op_index, operator) in task.operators.iter().enumerate() {
            if operator.applicable(&state) {
                let successor = operator.apply(&state);
                if visited.insert(successor.clone()) {
                    nodes.push((Some((index, op_index)), successor));
                    queue.push_back(nodes.len() - 1);
                }
            }
        }
    }
    None
}

fn extract_plan(
    task: &Task,
    nodes: &[(Option<(usize, usize)>, BTreeSet<String>)],
    mut index: usize,
) -> Vec<String> {
    let mut plan = Vec::new();
    while let Some((parent, op_index)) = nodes[index].0 {
        plan.push(task.operators[op_index].name.clone());
        index = parent;
    }
    plan.reverse();
    plan
}
