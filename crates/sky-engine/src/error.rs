//! Error types for sky-engine operations.
//!
//! "Nothing found" is not an error: searches that come up empty return
//! [`ScanStatus::NotFound`](crate::types::ScanStatus) or `None`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SkyError {
    /// Malformed time range or step.
    #[error("Invalid domain: {0}")]
    Domain(String),

    /// Threshold out of range, non-positive quota or horizon, bad config value.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The position provider could not answer for a body/instant.
    #[error("Position provider error: {0}")]
    Provider(String),
}

impl SkyError {
    /// Whether this error came from the position provider (or a day-window
    /// collaborator) rather than from the caller's inputs.
    pub fn is_provider(&self) -> bool {
        matches!(self, SkyError::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, SkyError>;
