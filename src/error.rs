//! Error types for line balancing.
//!
//! Instance errors (`MalformedInstance`, `CyclicPrecedence`) abort before
//! any solve. Timeouts are caught by the Benders orchestrator and turned into
//! a time-limit result. `InfeasibleStationAssignment` is an expected outcome
//! of station sequencing and never leaves the orchestrator.

use thiserror::Error;

use crate::models::{StationId, TaskId};

/// Errors raised while building instances or running the decomposition.
#[derive(Debug, Error)]
pub enum Error {
    /// Input data is inconsistent (counts, ids, numbers).
    #[error("malformed instance: {0}")]
    MalformedInstance(String),

    /// The precedence relation contains a cycle through `task`.
    #[error("cyclic precedence relation involving task {task}")]
    CyclicPrecedence { task: TaskId },

    /// A station sequencing solve ran out of wall-clock time.
    #[error("sequencing of station {station} exceeded the time limit")]
    SubproblemTimeout { station: StationId },

    /// The master problem ran out of wall-clock time.
    #[error("master problem exceeded the time limit")]
    MasterTimeout,

    /// No tour of `tasks` on `station` respects precedence and the load cap.
    #[error("tasks {tasks:?} cannot be sequenced on station {station}")]
    InfeasibleStationAssignment {
        station: StationId,
        tasks: Vec<TaskId>,
    },

    /// The Benders loop hit its iteration safety limit.
    #[error("Benders iteration limit of {limit} exceeded")]
    IterationLimitExceeded { limit: usize },

    /// The underlying MIP or CP backend failed.
    #[error("solver error: {0}")]
    Solver(String),

    /// A line solution failed verification.
    #[error("solution check failed with {violations} violation(s)")]
    InvalidSolution { violations: usize },

    /// Invalid solver configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a wall-clock exhaustion of any solve.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::SubproblemTimeout { .. } | Self::MasterTimeout)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        assert!(Error::MasterTimeout.is_timeout());
        assert!(Error::SubproblemTimeout { station: 2 }.is_timeout());
        assert!(!Error::IterationLimitExceeded { limit: 10 }.is_timeout());
        assert!(!Error::InfeasibleStationAssignment {
            station: 0,
            tasks: vec![1, 2]
        }
        .is_timeout());
    }

    #[test]
    fn test_display() {
        let err = Error::CyclicPrecedence { task: 4 };
        assert_eq!(err.to_string(), "cyclic precedence relation involving task 4");
        let err = Error::IterationLimitExceeded { limit: 3 };
        assert!(err.to_string().contains('3'));
    }
}
