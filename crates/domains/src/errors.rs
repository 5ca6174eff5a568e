//! # AppError
//!
//! Centralized error handling for goodfeed.
//! Every port and service returns this type so callers can tell expected
//! outcomes (validation, missing target, denied access) from infrastructure
//! failures.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed or missing input (e.g., empty title, organization without proof image)
    #[error("validation error: {0}")]
    Validation(String),

    /// Uniqueness violation or cross-reference mismatch (e.g., duplicate email)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Target entity does not exist (e.g., User, Post, Comment)
    #[error("{0} not found")]
    NotFound(String),

    /// Missing, malformed or expired credential
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not permitted to touch the target
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Password-reset code is wrong, missing or past its expiry.
    /// The three causes are deliberately indistinguishable.
    #[error("invalid or expired OTP")]
    InvalidOrExpiredOtp,

    /// Image host rejected or failed to store an upload
    #[error("upload error: {0}")]
    Upload(String),

    /// Mail transport failed to deliver
    #[error("mail delivery error: {0}")]
    MailDelivery(String),

    /// Infrastructure failure (e.g., DB down, serialization bug)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// True for failures the caller did nothing to cause.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::Internal(_) | Self::Upload(_) | Self::MailDelivery(_)
        )
    }
}

/// A specialized Result type for goodfeed logic.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_errors_are_flagged_internal() {
        assert!(AppError::internal("db down").is_internal());
        assert!(AppError::Upload("too big".into()).is_internal());
        assert!(AppError::MailDelivery("smtp".into()).is_internal());
        assert!(!AppError::not_found("Post").is_internal());
        assert!(!AppError::InvalidOrExpiredOtp.is_internal());
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::not_found("Comment").to_string(), "Comment not found");
    }
}
