//! In-memory repository (for testing and ephemeral servers)

use chrono::Utc;
use onbehalf_core::{TargetRef, TargetType};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::error::{StoreError, StoreResult};
use crate::record::VersionedRecord;
use crate::repository::{ensure_object, TargetRepository};

#[derive(Default)]
pub struct MemoryRepository {
    records: RwLock<BTreeMap<(String, String), VersionedRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(target: &TargetRef) -> (String, String) {
    (target.target_type.to_string(), target.target_id.clone())
}

impl TargetRepository for MemoryRepository {
    fn get(&self, target: &TargetRef) -> StoreResult<Option<VersionedRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records.get(&key(target)).cloned())
    }

    fn put_if_version(
        &self,
        target: &TargetRef,
        expected: Option<u64>,
        data: Value,
    ) -> StoreResult<VersionedRecord> {
        ensure_object(target, &data)?;

        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let actual = records.get(&key(target)).map(|r| r.version);
        if actual != expected {
            return Err(StoreError::VersionConflict {
                target: target.clone(),
                expected,
                actual,
            });
        }

        let record = VersionedRecord {
            target: target.clone(),
            version: actual.unwrap_or(0) + 1,
            data,
            updated_at: Utc::now(),
        };
        records.insert(key(target), record.clone());
        Ok(record)
    }

    fn list(&self, target_type: TargetType) -> StoreResult<Vec<VersionedRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        Ok(records
            .values()
            .filter(|r| r.target.target_type == target_type)
            .cloned()
            .collect())
    }
}
