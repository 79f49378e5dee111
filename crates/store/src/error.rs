//! Store errors

use onbehalf_core::TargetRef;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record not found: {0}")]
    NotFound(TargetRef),

    #[error("Version conflict on {target}: expected {expected:?}, found {actual:?}")]
    VersionConflict {
        target: TargetRef,
        expected: Option<u64>,
        actual: Option<u64>,
    },

    #[error("Record data for {0} must be a JSON object")]
    NotAnObject(TargetRef),

    #[error("Invalid fixture: {0}")]
    InvalidFixture(String),

    #[error("Corrupt record {target}: {detail}")]
    Corrupt { target: String, detail: String },
}

pub type StoreResult<T> = Result<T, StoreError>;
