//! Engine-layer errors. Mirrors the teacher's split between a plain,
//! dependency-free state-machine error (`engine/nl/errors.rs`) and the
//! `InvariantCheck` trait it pairs with.

/// The seven error kinds of the external error-handling contract. Every
/// state-machine operation either succeeds or returns one of these without
/// mutating state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    Validation(String),
    NotFound(&'static str),
    WrongPhase { expected: &'static str, actual: &'static str },
    Unauthorized(&'static str),
    DoubleAction(&'static str),
    RuleViolation(&'static str),
    Capacity { got: usize, min: usize, max: usize },
}

impl GameError {
    pub fn validation(message: impl Into<String>) -> Self {
        GameError::Validation(message.into())
    }
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::Validation(msg) => write!(f, "validation error: {msg}"),
            GameError::NotFound(what) => write!(f, "{what} not found"),
            GameError::WrongPhase { expected, actual } => {
                write!(f, "wrong phase: expected {expected}, got {actual}")
            }
            GameError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            GameError::DoubleAction(msg) => write!(f, "double action: {msg}"),
            GameError::RuleViolation(msg) => write!(f, "rule violation: {msg}"),
            GameError::Capacity { got, min, max } => {
                write!(f, "capacity error: got {got} players, need {min}-{max}")
            }
        }
    }
}

impl std::error::Error for GameError {}

/// Internal invariant/transition failures, distinct from the caller-facing
/// `GameError`. Mirrors `engine/nl/errors.rs::StateError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    InvalidTransition,
    InvariantViolation(&'static str),
}
