//! Error taxonomy for the CRM core
//!
//! One flat error enum shared across the engine, store, and service layers.
//! Validation fails fast: only the first violating field is reported.
//! `Internal` never carries storage detail to the caller; the detail is
//! logged at the point of failure instead.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum CrmError {
    /// No valid caller identity
    #[error("authentication required")]
    Unauthenticated,

    /// Authenticated but insufficient role or ownership
    #[error("access denied")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// First failing field only
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("a client with this PAN already exists")]
    DuplicatePan,

    #[error("a user with this email already exists")]
    DuplicateEmail,

    #[error("milestone is not eligible for payment release")]
    NotEligible,

    #[error("milestone has already been released")]
    AlreadyReleased,

    #[error("too many requests, try again later")]
    RateLimited,

    /// Storage failure; generic to the caller, detail goes to the log
    #[error("internal error")]
    Internal(String),
}

impl CrmError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hides_internal_detail() {
        let err = CrmError::Internal("connection reset by peer".to_string());
        assert_eq!(err.to_string(), "internal error");
    }

    #[test]
    fn test_validation_message() {
        let err = CrmError::validation("pan", "must match AAAAA9999A");
        assert_eq!(err.to_string(), "pan: must match AAAAA9999A");
    }
}
