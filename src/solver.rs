//! Plugin entry points: pure lowering (`ground`) and one-shot solving
//! (`solve`), plus the capability contract a host checks before dispatching a
//! problem here.

use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

use tracing::warn;

use crate::engine::{self, Strategy, Task};
use crate::error::Result;
use crate::model::{Feature, Problem, ProblemKind};
use crate::translate;

/// One plan step: an action of the original model with its parameters bound
/// to declared objects, in parameter order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionInstance {
    pub action: String,
    pub parameters: Vec<String>,
}

/// An ordered plan. The empty plan is a valid plan (the goal already held);
/// it is not the same thing as having no plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SequentialPlan {
    pub actions: Vec<ActionInstance>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    SolvedSatisficing,
    UnsolvableProven,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanGenerationResult {
    pub status: Status,
    pub plan: Option<SequentialPlan>,
    pub engine_name: String,
}

/// Replays a ground plan back into typed action instances through the map
/// the grounder produced. No string parsing happens on this path.
#[derive(Clone, Debug)]
pub struct PlanLifter {
    map: BTreeMap<String, ActionInstance>,
}

impl PlanLifter {
    pub fn lift(&self, ground_actions: &[String]) -> SequentialPlan {
        let actions = ground_actions
            .iter()
            .map(|name| match self.map.get(name) {
                Some(instance) => instance.clone(),
                None => panic!("ground action `{}` is unknown to the lift map", name),
            })
            .collect();
        SequentialPlan { actions }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Solver;

impl Solver {
    pub fn new() -> Self {
        Solver
    }

    pub fn name() -> &'static str {
        "strips-bridge"
    }

    /// The typing subset this bridge handles. Anything beyond it must be
    /// refused by the host before calling in.
    pub fn supported_kind() -> ProblemKind {
        let mut kind = ProblemKind::new();
        kind.set(Feature::FlatTyping);
        kind.set(Feature::HierarchicalTyping);
        kind
    }

    pub fn supports(kind: &ProblemKind) -> bool {
        kind.is_within(&Self::supported_kind())
    }

    /// Pure lowering: translates and grounds the problem, returning the
    /// ground task together with the lifter that maps a ground plan back to
    /// typed action instances. Each call runs in a fresh translation
    /// session.
    pub fn ground(&self, problem: &Problem) -> Result<(Task, PlanLifter)> {
        let translated = translate::translate(problem)?;
        let (task, lift) = engine::ground(&translated);
        let map = lift
            .into_iter()
            .map(|(name, (action, parameters))| (name, ActionInstance { action, parameters }))
            .collect();
        Ok((task, PlanLifter { map }))
    }

    /// Translates, grounds, searches, and reconstructs the plan from the
    /// ground action identifiers by direct parsing. A timeout or output
    /// stream is acknowledged and ignored: the bundled engine offers no hook
    /// for either.
    pub fn solve(
        &self,
        problem: &Problem,
        timeout: Option<Duration>,
        output_stream: Option<&mut dyn Write>,
    ) -> Result<PlanGenerationResult> {
        if timeout.is_some() {
            warn!("{} does not support a timeout; the option is ignored", Self::name());
        }
        if output_stream.is_some() {
            warn!(
                "{} does not support an output stream; the option is ignored",
                Self::name()
            );
        }
        let translated = translate::translate(problem)?;
        let (task, _) = engine::ground(&translated);
        match engine::search(&task, Strategy::BreadthFirst, None) {
            None => Ok(PlanGenerationResult {
                status: Status::UnsolvableProven,
                plan: None,
                engine_name: String::from(Self::name()),
            }),
            Some(solution) => {
                let actions = solution
                    .iter()
                    .map(|name| action_instance_from_name(name, problem))
                    .collect();
                Ok(PlanGenerationResult {
                    status: Status::SolvedSatisficing,
                    plan: Some(SequentialPlan { actions }),
                    engine_name: String::from(Self::name()),
                })
            }
        }
    }
}

/// Parses a ground action identifier `(name obj …)` against the original
/// model. The identifier format is an internal contract with the engine, so
/// a malformed one fails loudly instead of surfacing an error.
fn action_instance_from_name(ground_name: &str, problem: &Problem) -> ActionInstance {
    assert!(
        ground_name.starts_with('(') && ground_name.ends_with(')'),
        "malformed ground action identifier: `{}`",
        ground_name
    );
    let mut tokens = ground_name[1..ground_name.len() - 1].split_whitespace();
    let action = match tokens.next() {
        Some(name) => name,
        None => panic!("empty ground action identifier"),
    };
    assert!(
        problem.actions.contains_key(action),
        "ground action `{}` names no action of problem `{}`",
        action,
        problem.name
    );
    let parameters: Vec<String> = tokens
        .map(|object| {
            assert!(
                problem.objects.contains_key(object),
                "ground action `{}` binds undeclared object `{}`",
                ground_name,
                object
            );
            String::from(object)
        })
        .collect();
    ActionInstance { action: String::from(action), parameters }
}
