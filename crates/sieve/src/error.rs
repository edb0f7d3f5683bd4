//! Error types for the sieve crate.
//!
//! Evaluation itself never fails on a malformed query: operators with
//! ill-shaped values simply do not match. Errors come from building queries
//! out of external input (JSON, pattern strings) and from caller-supplied
//! callbacks, whose failures are surfaced unchanged.

use thiserror::Error;

/// Boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when building or executing queries.
#[derive(Debug, Error)]
pub enum SieveError {
    /// Invalid regular expression pattern.
    #[error("invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Operator name is not part of the operator table.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// Query input does not have the shape of a query.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// Record input does not have the shape of a record.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Query or options could not be read or written as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A `$cb` callback returned an error.
    #[error("callback on '{key}' failed: {source}")]
    Callback {
        key: String,
        #[source]
        source: BoxError,
    },
}

/// Result type for sieve operations.
pub type Result<T> = std::result::Result<T, SieveError>;
