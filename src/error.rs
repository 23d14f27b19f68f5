//! Scoring error type.

use thiserror::Error;

/// Reasons a scoring call is rejected. Nothing here is retryable: the
/// caller has to fix the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("invalid route at candidate {index}: {reason}")]
    InvalidRoute { index: usize, reason: String },
}

impl ScoringError {
    /// Stable machine-readable name, used in HTTP error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidRoute { .. } => "invalid_route",
        }
    }
}

pub type ScoreResult<T> = Result<T, ScoringError>;
