use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fixed::types::I40F24;

/// Name of the universal root category. A problem may declare it as one of
/// its own types; otherwise the translation synthesizes it.
pub const OBJECT_TYPE: &str = "object";

/// A user-declared object category, optionally below a parent category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserType {
    pub name: String,
    pub parent: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub type_name: String,
}

impl Parameter {
    pub fn new(name: &str, type_name: &str) -> Self {
        Parameter { name: String::from(name), type_name: String::from(type_name) }
    }
}

/// A declared relation over typed parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fluent {
    pub name: String,
    pub signature: Vec<Parameter>,
}

impl Fluent {
    pub fn new(name: &str, signature: &[(&str, &str)]) -> Self {
        Fluent {
            name: String::from(name),
            signature: signature.iter().map(|(n, t)| Parameter::new(n, t)).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Value {
    Bool(bool),
    Number(I40F24),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Number(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}

/// An argument position inside a fluent application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Term {
    Parameter(String),
    Object(String),
    Constant(Value),
}

impl Term {
    pub fn param(name: &str) -> Self {
        Term::Parameter(String::from(name))
    }

    pub fn object(name: &str) -> Self {
        Term::Object(String::from(name))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Term::Parameter(name) => write!(f, "{}", name),
            Term::Object(name) => write!(f, "{}", name),
            Term::Constant(value) => write!(f, "{}", value),
        }
    }
}

/// Logical expressions as they appear in preconditions and goals. The
/// translation accepts only `Fluent` and `And`; the remaining variants exist
/// so the rejection path is an exhaustive match instead of a chain of
/// runtime type tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    Fluent { name: String, args: Vec<Term> },
    And(Vec<Expression>),
    Not(Box<Expression>),
    Or(Vec<Expression>),
    Equals(Term, Term),
}

impl Expression {
    pub fn fluent(name: &str, args: &[Term]) -> Self {
        Expression::Fluent { name: String::from(name), args: args.to_vec() }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Fluent { name, args } => {
                write!(f, "({}", name)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
            Expression::And(subs) => {
                write!(f, "(and")?;
                for sub in subs {
                    write!(f, " {}", sub)?;
                }
                write!(f, ")")
            }
            Expression::Not(sub) => write!(f, "(not {})", sub),
            Expression::Or(subs) => {
                write!(f, "(or")?;
                for sub in subs {
                    write!(f, " {}", sub)?;
                }
                write!(f, ")")
            }
            Expression::Equals(a, b) => write!(f, "(= {} {})", a, b),
        }
    }
}

/// Assignment of a truth value to a fluent application when the action runs.
/// A `Some` condition makes the effect conditional, which the translation
/// rejects at the domain level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Effect {
    pub fluent: String,
    pub args: Vec<Term>,
    pub value: Value,
    pub condition: Option<Expression>,
}

impl Effect {
    pub fn new(fluent: &str, args: &[Term], value: bool) -> Self {
        Effect {
            fluent: String::from(fluent),
            args: args.to_vec(),
            value: Value::Bool(value),
            condition: None,
        }
    }
}

/// An instantaneous action: typed parameters, a precondition conjunction,
/// and an unconditional effect list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub preconditions: Vec<Expression>,
    pub effects: Vec<Effect>,
}

impl Action {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// A ground initial-state assignment: every argument is an object name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub fluent: String,
    pub args: Vec<String>,
    pub value: Value,
}

impl Assignment {
    pub fn new(fluent: &str, args: &[&str], value: Value) -> Self {
        Assignment {
            fluent: String::from(fluent),
            args: args.iter().map(|a| String::from(*a)).collect(),
            value,
        }
    }
}

/// The lifted, typed planning problem the bridge translates from.
#[derive(Clone, Debug, Default)]
pub struct Problem {
    pub name: String,
    pub user_types: BTreeMap<String, UserType>,
    pub fluents: BTreeMap<String, Fluent>,
    pub actions: BTreeMap<String, Action>,
    pub objects: BTreeMap<String, String>,
    pub initial_values: Vec<Assignment>,
    pub goals: Vec<Expression>,
}

impl Problem {
    pub fn new(name: &str) -> Self {
        Problem { name: String::from(name), ..Default::default() }
    }

    pub fn add_type(&mut self, name: &str, parent: Option<&str>) {
        self.user_types.insert(
            String::from(name),
            UserType { name: String::from(name), parent: parent.map(String::from) },
        );
    }

    pub fn add_fluent(&mut self, fluent: Fluent) {
        self.fluents.insert(fluent.name.clone(), fluent);
    }

    pub fn add_action(&mut self, action: Action) {
        self.actions.insert(action.name.clone(), action);
    }

    pub fn add_object(&mut self, name: &str, type_name: &str) {
        self.objects.insert(String::from(name), String::from(type_name));
    }

    pub fn assign(&mut self, assignment: Assignment) {
        self.initial_values.push(assignment);
    }

    pub fn add_goal(&mut self, goal: Expression) {
        self.goals.push(goal);
    }

    pub fn user_type(&self, name: &str) -> Option<&UserType> {
        self.user_types.get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.user_types.contains_key(name)
    }

    /// Computes the capability profile of this problem by scanning every
    /// expression, effect, and initial assignment.
    pub fn kind(&self) -> ProblemKind {
        let mut kind = ProblemKind::new();
        if !self.user_types.is_empty() {
            kind.set(Feature::FlatTyping);
            if self.user_types.values().any(|t| t.parent.is_some()) {
                kind.set(Feature::HierarchicalTyping);
            }
        }
        for action in self.actions.values() {
            for p in &action.preconditions {
                scan_expression(p, &mut kind);
            }
            for e in &action.effects {
                if let Some(condition) = &e.condition {
                    kind.set(Feature::ConditionalEffects);
                    scan_expression(condition, &mut kind);
                }
                scan_terms(&e.args, &mut kind);
                if let Value::Number(n) = e.value {
                    note_number(n, &mut kind);
                }
            }
        }
        for a in &self.initial_values {
            if let Value::Number(n) = a.value {
                note_number(n, &mut kind);
            }
        }
        for g in &self.goals {
            scan_expression(g, &mut kind);
        }
        kind
    }
}

fn scan_expression(expr: &Expression, kind: &mut ProblemKind) {
    match expr {
        Expression::Fluent { args, .. } => scan_terms(args, kind),
        Expression::And(subs) => subs.iter().for_each(|s| scan_expression(s, kind)),
        Expression::Not(sub) => {
            kind.set(Feature::NegativeConditions);
            scan_expression(sub, kind);
        }
        Expression::Or(subs) => {
            kind.set(Feature::DisjunctiveConditions);
            subs.iter().for_each(|s| scan_expression(s, kind));
        }
        Expression::Equals(a, b) => {
            kind.set(Feature::Equality);
            scan_terms(std::slice::from_ref(a), kind);
            scan_terms(std::slice::from_ref(b), kind);
        }
    }
}

fn scan_terms(terms: &[Term], kind: &mut ProblemKind) {
    for term in terms {
        if let Term::Constant(Value::Number(n)) = term {
            note_number(*n, kind);
        }
    }
}

fn note_number(n: I40F24, kind: &mut ProblemKind) {
    if n.frac() == I40F24::ZERO {
        kind.set(Feature::DiscreteNumbers);
    } else {
        kind.set(Feature::ContinuousNumbers);
    }
}

/// One modelling feature a problem may use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Feature {
    FlatTyping,
    HierarchicalTyping,
    NegativeConditions,
    DisjunctiveConditions,
    Equality,
    DiscreteNumbers,
    ContinuousNumbers,
    ConditionalEffects,
}

/// Capability profile: the set of features a problem uses, or a solver
/// accepts. Profiles form a partial order under set containment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProblemKind {
    features: BTreeSet<Feature>,
}

impl ProblemKind {
    pub fn new() -> Self {
        ProblemKind::default()
    }

    pub fn set(&mut self, feature: Feature) {
        self.features.insert(feature);
    }

    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// True iff every feature of `self` is also present in `other`.
    pub fn is_within(&self, other: &ProblemKind) -> bool {
        self.features.is_subset(&other.features)
    }
}
