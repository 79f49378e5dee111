//! Ledger records and hash chain

use chrono::{DateTime, Utc};
use onbehalf_core::ReviewStatus;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::entry::AuditLogEntry;

/// `prev_hash` of the first record
pub const GENESIS_HASH: &str = "GENESIS";

/// What a ledger line records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A new audit entry
    Appended { entry: AuditLogEntry },

    /// The one-time review decision on a pending entry
    ReviewDecided {
        audit_log_id: String,
        status: ReviewStatus,
        reviewer_id: String,
        reject_reason: Option<String>,
        decided_at: DateTime<Utc>,
    },
}

/// One line of the ledger file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub sequence: u64,
    pub prev_hash: String,
    pub hash: String,
    pub event: LedgerEvent,
}

impl LedgerRecord {
    /// Build a sealed record following `prev_hash`
    pub fn seal(sequence: u64, prev_hash: impl Into<String>, event: LedgerEvent) -> Self {
        let mut record = Self {
            sequence,
            prev_hash: prev_hash.into(),
            hash: String::new(),
            event,
        };
        record.hash = calculate_record_hash(&record);
        record
    }
}

/// SHA256 over sequence, prev_hash and the serialized event
pub fn calculate_record_hash(record: &LedgerRecord) -> String {
    let mut hasher = Sha256::new();

    hasher.update(record.sequence.to_le_bytes());
    hasher.update(record.prev_hash.as_bytes());
    // Serializing a LedgerEvent only fails for non-string map keys, which it never has
    let event = serde_json::to_string(&record.event).unwrap_or_default();
    hasher.update(event.as_bytes());

    hex::encode(hasher.finalize())
}

/// Verify hash chain integrity
pub fn verify_chain(records: &[LedgerRecord]) -> Result<(), ChainError> {
    let mut prev_hash = GENESIS_HASH.to_string();
    let mut expected_sequence = 1;

    for record in records {
        if record.sequence != expected_sequence {
            return Err(ChainError::InvalidSequence {
                expected: expected_sequence,
                actual: record.sequence,
            });
        }

        if record.prev_hash != prev_hash {
            return Err(ChainError::BrokenLink {
                sequence: record.sequence,
                expected: prev_hash,
                actual: record.prev_hash.clone(),
            });
        }

        let calculated = calculate_record_hash(record);
        if record.hash != calculated {
            return Err(ChainError::InvalidHash {
                sequence: record.sequence,
                expected: calculated,
                actual: record.hash.clone(),
            });
        }

        prev_hash = record.hash.clone();
        expected_sequence += 1;
    }

    Ok(())
}

/// Errors in hash chain verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Broken link at seq {sequence}: expected prev_hash '{expected}', got '{actual}'")]
    BrokenLink {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Invalid hash at seq {sequence}: expected '{expected}', got '{actual}'")]
    InvalidHash {
        sequence: u64,
        expected: String,
        actual: String,
    },

    #[error("Sequence must be strictly increasing: expected {expected}, got {actual}")]
    InvalidSequence { expected: u64, actual: u64 },
}
