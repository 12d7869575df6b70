//! Bridge between a typed, lifted planning model and a ground STRIPS task.
//!
//! Lowering translates a [`model::Problem`] (typed objects, parametric
//! actions, conjunctive conditions) into a flat [`strips`] domain and
//! problem, grounds it through the bundled [`engine`], and hands back the
//! resulting task together with a [`solver::PlanLifter`] that maps ground
//! action identifiers back to typed action instances. [`solver::Solver`]
//! additionally drives the engine's search and reconstructs a
//! [`solver::SequentialPlan`] directly from the ground identifiers.
//!
//! Only conjunctions of positive literals are handled; problems using
//! negation, disjunction, equality, numbers, or conditional effects are
//! rejected with a distinct [`UnsupportedProblemError`] rather than
//! approximated.

pub mod engine;
pub mod error;
pub mod model;
pub mod solver;
pub mod strips;
pub mod translate;

pub use error::{Result, UnsupportedProblemError};
pub use solver::{
    ActionInstance, PlanGenerationResult, PlanLifter, SequentialPlan, Solver, Status,
};
