//! Store doubles for unit tests

use onbehalf_core::{TargetRef, TargetType};
use onbehalf_store::{MemoryRepository, StoreError, StoreResult, TargetRepository, VersionedRecord};
use serde_json::Value;
use std::io;

/// Memory store that refuses every write to one record type
pub(crate) struct FailingWrites {
    inner: MemoryRepository,
    refused: TargetType,
}

impl FailingWrites {
    pub fn new(inner: MemoryRepository, refused: TargetType) -> Self {
        Self { inner, refused }
    }
}

impl TargetRepository for FailingWrites {
    fn get(&self, target: &TargetRef) -> StoreResult<Option<VersionedRecord>> {
        self.inner.get(target)
    }

    fn put_if_version(
        &self,
        target: &TargetRef,
        expected: Option<u64>,
        data: Value,
    ) -> StoreResult<VersionedRecord> {
        if target.target_type == self.refused {
            return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
        }
        self.inner.put_if_version(target, expected, data)
    }

    fn list(&self, target_type: TargetType) -> StoreResult<Vec<VersionedRecord>> {
        self.inner.list(target_type)
    }
}
