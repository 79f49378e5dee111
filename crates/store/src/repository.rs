//! Repository interface

use onbehalf_core::{TargetRef, TargetType};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::record::VersionedRecord;

/// Durable keyed store with per-record optimistic locking.
///
/// Implementations must make `put_if_version` atomic: the version check and
/// the write either both happen or neither does.
pub trait TargetRepository: Send + Sync {
    /// Current record, or `None` if it was never written
    fn get(&self, target: &TargetRef) -> StoreResult<Option<VersionedRecord>>;

    /// Write `data` if the stored version equals `expected`.
    ///
    /// `expected = None` means the record must not exist yet. Returns the
    /// record as written, with its new version.
    fn put_if_version(
        &self,
        target: &TargetRef,
        expected: Option<u64>,
        data: Value,
    ) -> StoreResult<VersionedRecord>;

    /// All records of one type, ordered by id
    fn list(&self, target_type: TargetType) -> StoreResult<Vec<VersionedRecord>>;

    /// Like [`get`](Self::get), but a missing record is an error
    fn require(&self, target: &TargetRef) -> StoreResult<VersionedRecord> {
        self.get(target)?
            .ok_or_else(|| StoreError::NotFound(target.clone()))
    }
}

/// Shared check for implementations
pub(crate) fn ensure_object(target: &TargetRef, data: &Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotAnObject(target.clone()))
    }
}
