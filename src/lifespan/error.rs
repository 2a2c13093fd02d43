//! Error types for lifespan composition.

use thiserror::Error;

/// Error type lifespan code may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Protocol violations detected while driving a single scope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    /// The sequence finished without reaching its suspension point.
    #[error("lifespan sequence finished without yielding")]
    DidNotYield,

    /// The sequence yielded a second time instead of finishing.
    #[error("lifespan sequence yielded more than once")]
    DidNotStop,

    /// Exit was requested for a scope that is not currently entered.
    #[error("lifespan scope exited without being entered")]
    NotEntered,
}

/// Which half of a lifespan failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Startup,
    Shutdown,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Startup => "startup",
            Phase::Shutdown => "shutdown",
        }
    }
}

/// Errors surfaced by the registry and the aggregation engine.
#[derive(Debug, Error)]
pub enum LifespanError {
    /// A lifespan's setup failed. Earlier lifespans have been torn down.
    #[error("lifespan `{name}` (#{index}) failed during startup: {source}")]
    Startup {
        index: usize,
        name: String,
        #[source]
        source: BoxError,
    },

    /// A lifespan's teardown failed.
    #[error("lifespan `{name}` (#{index}) failed during shutdown: {source}")]
    Shutdown {
        index: usize,
        name: String,
        #[source]
        source: BoxError,
    },

    /// Several failures; a startup failure, if any, comes first.
    #[error("{} lifespan failures: {}", .0.len(), join(.0))]
    Multiple(Vec<LifespanError>),

    /// `remove` was called with a lifespan that is not registered.
    #[error("lifespan is not registered")]
    NotRegistered,

    /// The aggregate lifespan was entered twice.
    #[error("aggregate lifespan has already been entered")]
    AlreadyEntered,
}

impl LifespanError {
    /// Collapse a list of failures: none is `None`, one is itself, more are `Multiple`.
    pub fn from_failures(mut failures: Vec<LifespanError>) -> Option<LifespanError> {
        match failures.len() {
            0 => None,
            1 => failures.pop(),
            _ => Some(LifespanError::Multiple(failures)),
        }
    }

    /// The individual failures, flattening `Multiple`.
    pub fn failures(&self) -> Vec<&LifespanError> {
        match self {
            LifespanError::Multiple(errors) => errors.iter().flat_map(|e| e.failures()).collect(),
            other => vec![other],
        }
    }

    /// Phase of a single entry failure.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            LifespanError::Startup { .. } => Some(Phase::Startup),
            LifespanError::Shutdown { .. } => Some(Phase::Shutdown),
            _ => None,
        }
    }
}

fn join(errors: &[LifespanError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
