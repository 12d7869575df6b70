use thiserror::Error;

/// Reasons for refusing a problem outright. Each one is recoverable for the
/// caller in the sense that a different solver may well accept the problem;
/// none of them is ever transient.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UnsupportedProblemError {
    #[error("problem `{0}` contains negative preconditions or negative goals")]
    NegativeConditions(String),
    #[error("problem `{0}` contains disjunctive preconditions")]
    DisjunctiveConditions(String),
    #[error("problem `{0}` contains an equality symbol")]
    Equality(String),
    #[error("problem `{0}` contains numbers")]
    Numbers(String),
    #[error("problem `{0}` contains conditional effects")]
    ConditionalEffects(String),
    #[error("unsupported expression `{expression}` in {context}")]
    UnsupportedExpression { expression: String, context: String },
    #[error("unsupported operand `{operand}` in {context}")]
    UnsupportedOperand { operand: String, context: String },
    #[error("initial value `{value}` of fluent `{fluent}` is not true or false")]
    NonBooleanInitialValue { fluent: String, value: String },
    #[error("type hierarchy contains a cycle through `{0}`")]
    TypeCycle(String),
}

pub type Result<T> = std::result::Result<T, UnsupportedProblemError>;
