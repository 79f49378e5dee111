//! Two-phase state changes
//!
//! An action computes its intended result up front as a [`StagedCommand`].
//! Immediate tiers commit it right away; SUBSTITUTION commands sit in the
//! audit entry until the reviewer decides. Aborting touches nothing.

use onbehalf_audit::AuditLogEntry;
use onbehalf_core::TargetRef;
use onbehalf_store::{StoreError, StoreResult, TargetRepository, VersionedRecord};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{EngineError, EngineResult};

/// Optimistic retries before a commit gives up on a busy record
const MAX_COMMIT_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct StagedCommand {
    pub target: TargetRef,
    /// `None` when the command creates the record
    pub before: Option<Value>,
    pub after: Value,
}

impl StagedCommand {
    pub fn new(target: TargetRef, before: Option<Value>, after: Value) -> Self {
        Self {
            target,
            before,
            after,
        }
    }

    /// Rebuild the command recorded in a staged audit entry
    pub fn from_entry(entry: &AuditLogEntry) -> EngineResult<Self> {
        let after = entry.after_state.clone().ok_or_else(|| {
            EngineError::Internal(format!("audit entry {} carries no staged state", entry.id))
        })?;
        Ok(Self::new(entry.target(), entry.before_state.clone(), after))
    }

    /// Field-level changes: `Some` sets a field, `None` removes it
    pub fn changes(&self) -> Vec<(String, Option<Value>)> {
        let empty = Map::new();
        let before = self
            .before
            .as_ref()
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let after = self.after.as_object().unwrap_or(&empty);

        let mut changes: Vec<(String, Option<Value>)> = after
            .iter()
            .filter(|(key, value)| before.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), Some(value.clone())))
            .collect();
        changes.extend(
            before
                .keys()
                .filter(|key| !after.contains_key(*key))
                .map(|key| (key.clone(), None)),
        );
        changes
    }

    /// Apply the changes onto `current`, leaving every other field alone
    fn patch(&self, current: &Value) -> Value {
        let mut data = current.as_object().cloned().unwrap_or_default();
        for (key, value) in self.changes() {
            match value {
                Some(value) => {
                    data.insert(key, value);
                }
                None => {
                    data.remove(&key);
                }
            }
        }
        Value::Object(data)
    }

    /// Write the command to the store.
    ///
    /// Only the changed fields are applied, onto whatever the record holds
    /// now. Committing an already-applied command writes nothing.
    pub fn commit(&self, repo: &dyn TargetRepository) -> StoreResult<VersionedRecord> {
        if self.before.is_none() {
            return self.create(repo);
        }

        let mut last_conflict = None;
        for attempt in 1..=MAX_COMMIT_ATTEMPTS {
            let current = repo.require(&self.target)?;
            let patched = self.patch(&current.data);
            if patched == current.data {
                return Ok(current);
            }

            match repo.put_if_version(&self.target, Some(current.version), patched) {
                Ok(record) => {
                    debug!(target = %self.target, version = record.version, "staged command committed");
                    return Ok(record);
                }
                Err(err @ StoreError::VersionConflict { .. }) => {
                    debug!(target = %self.target, attempt, "commit raced a concurrent write, retrying");
                    last_conflict = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_conflict.unwrap_or_else(|| StoreError::NotFound(self.target.clone())))
    }

    fn create(&self, repo: &dyn TargetRepository) -> StoreResult<VersionedRecord> {
        match repo.put_if_version(&self.target, None, self.after.clone()) {
            Ok(record) => Ok(record),
            Err(err @ StoreError::VersionConflict { .. }) => match repo.get(&self.target)? {
                Some(current) if current.data == self.after => Ok(current),
                _ => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    /// Discard the command
    pub fn abort(self) {
        debug!(target = %self.target, "staged command discarded");
    }
}
