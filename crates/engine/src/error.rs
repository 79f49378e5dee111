//! Engine errors
//!
//! Every failure the engine surfaces falls into one [`ErrorKind`]. Only
//! `Commit` and `Internal` can occur after an audit entry was written.

use onbehalf_audit::AuditError;
use onbehalf_claims::TransitionError;
use onbehalf_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Review state: {0}")]
    ReviewState(String),

    /// The audit entry exists but the store write behind it failed
    #[error("Commit failed for audit entry {audit_log_id}: {source}")]
    Commit {
        audit_log_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used to pick a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    ReviewState,
    Internal,
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict | ErrorKind::ReviewState => 409,
            ErrorKind::Internal => 500,
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, ErrorKind::Internal)
    }
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Authorization(_) => ErrorKind::Authorization,
            EngineError::Conflict(_) => ErrorKind::Conflict,
            EngineError::NotFound(_) => ErrorKind::NotFound,
            EngineError::ReviewState(_) => ErrorKind::ReviewState,
            EngineError::Commit { .. } | EngineError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        EngineError::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        EngineError::Authorization(msg.into())
    }
}

impl From<AuditError> for EngineError {
    fn from(err: AuditError) -> Self {
        match err {
            AuditError::ReasonTooShort { .. }
            | AuditError::MissingReviewer(_)
            | AuditError::UnexpectedStatus { .. } => EngineError::Validation(err.to_string()),
            AuditError::SelfReview(_)
            | AuditError::PendingConflict { .. }
            | AuditError::DuplicateEntry(_) => EngineError::Conflict(err.to_string()),
            AuditError::ReviewerMismatch { .. } => EngineError::Authorization(err.to_string()),
            AuditError::EntryNotFound(_) => EngineError::NotFound(err.to_string()),
            AuditError::NotPending { .. } | AuditError::InvalidTransition { .. } => {
                EngineError::ReviewState(err.to_string())
            }
            AuditError::Io(_)
            | AuditError::Serialization(_)
            | AuditError::Chain(_)
            | AuditError::Unwritable => {
                EngineError::Internal(err.to_string())
            }
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => EngineError::NotFound(err.to_string()),
            StoreError::VersionConflict { .. } => EngineError::Conflict(err.to_string()),
            StoreError::NotAnObject(_) | StoreError::InvalidFixture(_) => {
                EngineError::Validation(err.to_string())
            }
            StoreError::Database(_)
            | StoreError::Serialization(_)
            | StoreError::Io(_)
            | StoreError::Corrupt { .. } => EngineError::Internal(err.to_string()),
        }
    }
}

impl From<TransitionError> for EngineError {
    fn from(err: TransitionError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use onbehalf_core::{ReviewStatus, TargetRef};

    #[test]
    fn test_status_codes() {
        assert_eq!(EngineError::validation("x").kind().status_code(), 400);
        assert_eq!(EngineError::authorization("x").kind().status_code(), 403);
        assert_eq!(EngineError::NotFound("x".into()).kind().status_code(), 404);
        assert_eq!(EngineError::Conflict("x".into()).kind().status_code(), 409);
        assert_eq!(EngineError::ReviewState("x".into()).kind().status_code(), 409);
        assert_eq!(EngineError::Internal("x".into()).kind().status_code(), 500);
    }

    #[test]
    fn test_audit_error_mapping() {
        let err: EngineError = AuditError::NotPending {
            id: "AUD-1".into(),
            status: ReviewStatus::Approved,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ReviewState);

        let err: EngineError = AuditError::SelfReview("AUD-1".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: EngineError = AuditError::ReviewerMismatch {
            id: "AUD-1".into(),
            expected: "S002".into(),
            actual: "S003".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_commit_failure_is_server_error() {
        let err = EngineError::Commit {
            audit_log_id: "AUD-1".into(),
            source: StoreError::NotFound(TargetRef::proposal("P-1")),
        };
        assert!(err.kind().is_server_error());
        assert!(err.to_string().contains("AUD-1"));
    }
}
