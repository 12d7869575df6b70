//! The ground-free target representation handed to the grounder: a flat,
//! fully typed rendering of a domain and problem with every precondition and
//! goal reduced to a list of predicate templates.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

/// A node in the parent-linked type hierarchy. The child owns a reference to
/// its parent; the root has none. Nodes are deduplicated per translation
/// session, never mutated after construction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Type {
    pub name: String,
    pub parent: Option<Rc<Type>>,
}

impl Type {
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self.name == other.name {
            return true;
        }
        let mut up = self.parent.as_deref();
        while let Some(t) = up {
            if t.name == other.name {
                return true;
            }
            up = t.parent.as_deref();
        }
        false
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A predicate template: a name over an ordered, typed argument list. Serves
/// as fluent signature, precondition literal, goal literal, initial fact,
/// and effect literal alike; equality is name plus full signature.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Predicate {
    pub name: String,
    pub signature: Vec<(String, Rc<Type>)>,
}

impl Predicate {
    pub fn new(name: &str, signature: Vec<(String, Rc<Type>)>) -> Self {
        Predicate { name: String::from(name), signature }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for (arg, _) in &self.signature {
            write!(f, " {}", arg)?;
        }
        write!(f, ")")
    }
}

/// Effect of an action split into the facts it makes true and the facts it
/// makes false. Duplicates collapse; order is irrelevant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Effect {
    pub add: BTreeSet<Predicate>,
    pub del: BTreeSet<Predicate>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub signature: Vec<(String, Rc<Type>)>,
    pub preconditions: Vec<Predicate>,
    pub effect: Effect,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Domain {
    pub name: String,
    pub types: Vec<Rc<Type>>,
    pub predicates: BTreeMap<String, Predicate>,
    pub actions: BTreeMap<String, Action>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub name: String,
    pub domain: Domain,
    pub objects: BTreeMap<String, Rc<Type>>,
    pub init: Vec<Predicate>,
    pub goals: Vec<Predicate>,
}
