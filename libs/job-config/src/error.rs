//! Error types for job configuration decoding.

use thiserror::Error;

/// Errors that can occur when turning a payload into a job configuration.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid JSON for a job configuration.
    #[error("malformed job configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload parsed but violates a field constraint.
    #[error("invalid job configuration field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The notification carried no payload at all.
    #[error("job configuration payload is empty")]
    Empty,
}

impl DecodeError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        DecodeError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
