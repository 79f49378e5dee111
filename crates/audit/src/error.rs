//! Audit ledger errors

use onbehalf_core::{ActionType, ReviewStatus};
use thiserror::Error;

use crate::record::ChainError;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit chain broken: {0}")]
    Chain(#[from] ChainError),

    #[error("Reason for {action} must be at least {min} characters, got {actual}")]
    ReasonTooShort {
        action: ActionType,
        min: usize,
        actual: usize,
    },

    #[error("Entry {0} is staged for review but names no reviewer")]
    MissingReviewer(String),

    #[error("Entry {0} names its own operator as reviewer")]
    SelfReview(String),

    #[error("Entry {id} cannot be appended with review status {status}")]
    UnexpectedStatus { id: String, status: ReviewStatus },

    #[error("Audit entry not found: {0}")]
    EntryNotFound(String),

    #[error("Audit entry already exists: {0}")]
    DuplicateEntry(String),

    #[error("Audit entry {id} is {status}, not PENDING")]
    NotPending { id: String, status: ReviewStatus },

    #[error("Review status cannot move from {from} to {to}")]
    InvalidTransition { from: ReviewStatus, to: ReviewStatus },

    #[error("Entry {id} is assigned to reviewer {expected}, not {actual}")]
    ReviewerMismatch {
        id: String,
        expected: String,
        actual: String,
    },

    #[error("Target {target} already has pending entry {audit_log_id}")]
    PendingConflict { target: String, audit_log_id: String },

    #[error("Ledger file could not be restored after a failed write; reopen the ledger")]
    Unwritable,
}

/// Result type for audit ledger operations
pub type AuditResult<T> = Result<T, AuditError>;
