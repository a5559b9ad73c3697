use std::time::Duration;

use batchwire_core::{DecodingError, EncodingError};
use thiserror::Error;

/// Failure of a whole batch call, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("endpoint answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("{code}: {message}")]
    Endpoint { code: String, message: String },

    #[error("malformed batch response: {0}")]
    MalformedResponse(String),

    #[error("batch of {expected} items was answered with {actual} rows")]
    RowCount { expected: usize, actual: usize },
}

/// Outcome of a single prediction that did not produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Decoding(#[from] DecodingError),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("batch timed out after {0:?}")]
    Timeout(Duration),

    /// The batch succeeded but the endpoint refused this row.
    #[error("endpoint rejected item ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("scheduler is shut down")]
    SchedulerClosed,
}

impl PredictionError {
    /// Errors that hit every item of the batch they occurred in.
    pub fn is_batch_wide(&self) -> bool {
        matches!(
            self,
            PredictionError::Transport(_) | PredictionError::Timeout(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_batch_size must be greater than zero")]
    ZeroBatchSize,

    #[error("look_ahead_window must be at least one")]
    ZeroLookAhead,

    #[error("request_timeout_ms must be greater than zero")]
    ZeroTimeout,

    #[error("max_in_flight must be at least one")]
    ZeroInFlight,
}
