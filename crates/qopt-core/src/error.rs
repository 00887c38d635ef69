//! Core error types.

use thiserror::Error;

/// Optimizer and executor errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] qopt_proto::Error),

    /// A scan referenced a table the store does not have.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A plan node has the wrong number of children.
    #[error("{operator} expects {expected} child node(s), got {actual}")]
    MissingChild {
        operator: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A plan node has no execution rule.
    #[error("unsupported plan node: {0}")]
    UnsupportedNode(String),

    /// A candidate plan could not be built.
    #[error("plan build failed: {0}")]
    PlanBuild(String),

    /// Every candidate plan failed to build.
    #[error("no viable plan for statement")]
    NoViablePlan,

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),
}
