//! OnBehalf Audit Ledger
//!
//! Append-only record of every privileged action attempt that passed
//! validation, who made it, what it changed, and how its review ended.
//!
//! ## Storage
//!
//! ```text
//! <data>/audit/ledger.jsonl
//! ├── {"sequence":1,"prev_hash":"GENESIS","hash":..,"event":{"record":"appended",..}}
//! ├── {"sequence":2,..,"event":{"record":"appended",..}}
//! └── {"sequence":3,..,"event":{"record":"review_decided",..}}
//! ```
//!
//! Entries are never rewritten. The single allowed mutation, PENDING to
//! APPROVED/REJECTED, is itself an appended record that the in-memory index
//! folds on top of the original entry.

pub mod entry;
pub mod error;
pub mod ledger;
pub mod query;
pub mod record;

pub use entry::AuditLogEntry;
pub use error::{AuditError, AuditResult};
pub use ledger::{AuditLedger, LedgerPolicy};
pub use query::{AuditQuery, AuditStats};
pub use record::{verify_chain, ChainError, LedgerEvent, LedgerRecord, GENESIS_HASH};
