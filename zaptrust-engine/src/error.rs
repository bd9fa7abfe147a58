//! Error types for the trust engine
//!
//! One closed enum covers every outcome the verification, ingestion and
//! session paths can produce. The boundary layer maps each variant onto its
//! own transport signalling through [`ZapTrustError::class`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::TargetKind;

/// Main error type for trust engine operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ZapTrustError {
    /// Identifier does not match the canonical digest, malformed hex, or a
    /// structurally invalid zap receipt
    #[error("Invalid zap receipt: {0}")]
    InvalidZapReceipt(String),

    /// Schnorr signature does not verify, or the signer is not trusted
    #[error("Signature verification failed: {0}")]
    SignatureVerification(String),

    /// The referenced review, game or comment does not exist
    #[error("Zap target not found: {kind} {id}")]
    ZapTargetNotFound { kind: TargetKind, id: String },

    /// A receipt for this source event was already stored
    #[error("Zap already processed: {event_id}")]
    ZapAlreadyProcessed { event_id: String },

    /// Session token MAC mismatch or malformed structure
    #[error("Invalid session token: {0}")]
    InvalidSessionToken(String),

    /// Session token authenticated but past its expiry
    #[error("Session token expired at {expired_at}")]
    ExpiredSessionToken { expired_at: DateTime<Utc> },

    /// Invalid caller-supplied argument (TTL <= 0, empty secret, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Transient persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration load or validation failure
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse failure class used by the boundary layer to pick a status signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Malformed,
    Unauthenticated,
    NotFound,
    Conflict,
    InvalidArgument,
    Unavailable,
}

impl ZapTrustError {
    /// Create an invalid zap receipt error
    pub fn invalid_receipt<S: Into<String>>(msg: S) -> Self {
        Self::InvalidZapReceipt(msg.into())
    }

    /// Create a signature verification error
    pub fn signature<S: Into<String>>(msg: S) -> Self {
        Self::SignatureVerification(msg.into())
    }

    /// Create a target not found error
    pub fn target_not_found<S: Into<String>>(kind: TargetKind, id: S) -> Self {
        Self::ZapTargetNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create an already processed error
    pub fn already_processed<S: Into<String>>(event_id: S) -> Self {
        Self::ZapAlreadyProcessed {
            event_id: event_id.into(),
        }
    }

    /// Create an invalid session token error
    pub fn invalid_token<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSessionToken(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidZapReceipt(_) => ErrorClass::Malformed,
            Self::SignatureVerification(_)
            | Self::InvalidSessionToken(_)
            | Self::ExpiredSessionToken { .. } => ErrorClass::Unauthenticated,
            Self::ZapTargetNotFound { .. } => ErrorClass::NotFound,
            Self::ZapAlreadyProcessed { .. } => ErrorClass::Conflict,
            Self::InvalidArgument(_) | Self::Config(_) => ErrorClass::InvalidArgument,
            Self::Storage(_) => ErrorClass::Unavailable,
        }
    }

    /// Only transient storage failures may be retried with the same input.
    /// A duplicate zap is terminal and must never be re-submitted as a write.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// A duplicate submission is the idempotent success-equivalent outcome
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::ZapAlreadyProcessed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ZapTrustError::invalid_receipt("bad hex").class(),
            ErrorClass::Malformed
        );
        assert_eq!(
            ZapTrustError::target_not_found(TargetKind::Review, "x").class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            ZapTrustError::already_processed("abc").class(),
            ErrorClass::Conflict
        );
        assert_eq!(
            ZapTrustError::invalid_argument("ttl").class(),
            ErrorClass::InvalidArgument
        );
    }

    #[test]
    fn test_only_storage_is_retryable() {
        assert!(ZapTrustError::storage("pool exhausted").is_retryable());
        assert!(!ZapTrustError::already_processed("abc").is_retryable());
        assert!(ZapTrustError::already_processed("abc").is_duplicate());
        assert!(!ZapTrustError::signature("mismatch").is_retryable());
    }

    #[test]
    fn test_display_messages() {
        let err = ZapTrustError::target_not_found(TargetKind::Game, "42");
        assert_eq!(err.to_string(), "Zap target not found: GAME 42");
    }
}
