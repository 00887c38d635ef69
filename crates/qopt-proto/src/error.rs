//! Protocol error types.

use thiserror::Error;

/// Errors raised while building or decoding protocol types.
#[derive(Debug, Error)]
pub enum Error {
    /// Column type name is not one of the supported types.
    #[error("unknown data type: {0}")]
    UnknownDataType(String),

    /// Serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
