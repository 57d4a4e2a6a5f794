//! Error taxonomy for trace reconstruction
//!
//! Three kinds of failure exist, each with a different blast radius:
//!
//! - [`SequencingError`]: a single event is out of place (wrong order index or
//!   foreign trace id). Recovered locally: the event is dropped and logged.
//! - [`InvalidTrace`]: the event sequence of one trace is structurally broken
//!   (After without matching Before, duplicate execution order index, nesting
//!   depth that is not stack-consistent). Aborts that trace only.
//! - Conversion failure: an [`InvalidTrace`] raised while deriving a message
//!   trace. The execution trace is still delivered; see
//!   [`crate::reconstruction::TraceOutcome::PartialSuccess`].

use thiserror::Error;

/// An event that does not belong at its position in the trace
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencingError {
    #[error("trace {trace_id}: found event with wrong order index {found}, expected {expected}")]
    WrongOrderIndex {
        trace_id: i64,
        found: i32,
        expected: i32,
    },

    #[error("found event with wrong trace id {found}, expected {expected}")]
    WrongTraceId { found: i64, expected: i64 },
}

/// A trace whose events cannot be reconstructed into a consistent call tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid trace {trace_id}: {reason}")]
pub struct InvalidTrace {
    pub trace_id: i64,
    pub reason: String,
}

impl InvalidTrace {
    pub fn new(trace_id: i64, reason: impl Into<String>) -> Self {
        Self {
            trace_id,
            reason: reason.into(),
        }
    }
}

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for reconstruction operations
pub type Result<T> = std::result::Result<T, InvalidTrace>;
