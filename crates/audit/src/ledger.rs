//! Audit Ledger - Append-only JSONL storage
//!
//! All writes are appended, flushed and synced before the call returns.
//! A failed write is cut back off the file, so the file only ever holds
//! acknowledged records. The in-memory index is rebuilt from the file on
//! open; a torn final line left by a crash is dropped there.

use chrono::{DateTime, Utc};
use onbehalf_core::{ActionType, PowerTier, ReviewStatus, TargetRef};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

use crate::entry::AuditLogEntry;
use crate::error::{AuditError, AuditResult};
use crate::query::{AuditQuery, AuditStats};
use crate::record::{verify_chain, LedgerEvent, LedgerRecord, GENESIS_HASH};

/// Admission rules applied to every appended entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// Minimum reason length (characters) for GUARANTEE and SUBSTITUTION actions
    pub min_reason_chars: usize,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            min_reason_chars: 10,
        }
    }
}

impl LedgerPolicy {
    pub fn min_reason_for(&self, action: ActionType) -> usize {
        match action.required_tier() {
            Some(PowerTier::Guarantee) | Some(PowerTier::Substitution) => self.min_reason_chars,
            _ => 0,
        }
    }
}

/// Append-only audit ledger.
///
/// Every public method takes the ledger lock for its whole duration, so a
/// check followed by a write (pending-conflict check, PENDING -> terminal
/// review transition) is atomic with respect to other callers.
pub struct AuditLedger {
    policy: LedgerPolicy,
    inner: Mutex<LedgerInner>,
}

struct LedgerInner {
    path: Option<PathBuf>,
    file: Option<File>,
    entries: Vec<AuditLogEntry>,
    index: HashMap<String, usize>,
    pending_by_target: HashMap<TargetRef, String>,
    last_sequence: u64,
    last_hash: String,
    /// Set when a failed write could not be rolled back
    unwritable: bool,
}

impl AuditLedger {
    /// Open (or create) a ledger file, replaying and verifying existing records
    pub fn open(path: impl AsRef<Path>, policy: LedgerPolicy) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let (records, torn_at) = read_records(&path)?;
        verify_chain(&records)?;

        if let Some(len) = torn_at {
            warn!(path = %path.display(), len, "dropping torn final ledger line");
            let file = OpenOptions::new().write(true).open(&path)?;
            file.set_len(len)?;
            file.sync_data()?;
        }

        let mut inner = LedgerInner::new(Some(path.clone()));
        for record in &records {
            inner.apply(&record.event);
            inner.last_sequence = record.sequence;
            inner.last_hash = record.hash.clone();
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        inner.file = Some(file);

        info!(
            path = %path.display(),
            records = records.len(),
            entries = inner.entries.len(),
            "audit ledger opened"
        );

        Ok(Self {
            policy,
            inner: Mutex::new(inner),
        })
    }

    /// Create a ledger that keeps records in memory only (for testing)
    pub fn in_memory(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            inner: Mutex::new(LedgerInner::new(None)),
        }
    }

    pub fn policy(&self) -> &LedgerPolicy {
        &self.policy
    }

    /// Append a new entry, returning its id
    pub fn append(&self, entry: AuditLogEntry) -> AuditResult<String> {
        let mut inner = self.lock();
        self.admit(&inner, &entry)?;
        inner.append(entry)
    }

    /// Append a PENDING entry unless its target already has one.
    ///
    /// The check and the write happen under one lock.
    pub fn append_staged(&self, entry: AuditLogEntry) -> AuditResult<String> {
        if entry.review_status != ReviewStatus::Pending {
            return Err(AuditError::UnexpectedStatus {
                id: entry.id,
                status: entry.review_status,
            });
        }

        let mut inner = self.lock();
        self.admit(&inner, &entry)?;

        if let Some(existing) = inner.pending_by_target.get(&entry.target()) {
            return Err(AuditError::PendingConflict {
                target: entry.target().to_string(),
                audit_log_id: existing.clone(),
            });
        }

        inner.append(entry)
    }

    /// The single permitted mutation: PENDING -> APPROVED | REJECTED.
    ///
    /// Compare-and-swap on the entry's current status; a second decision on
    /// the same entry always fails with [`AuditError::NotPending`].
    pub fn update_review_status(
        &self,
        id: &str,
        status: ReviewStatus,
        reviewer_id: &str,
        reject_reason: Option<String>,
    ) -> AuditResult<AuditLogEntry> {
        let mut inner = self.lock();

        let entry = inner
            .get(id)
            .ok_or_else(|| AuditError::EntryNotFound(id.to_string()))?;

        if entry.review_status != ReviewStatus::Pending {
            return Err(AuditError::NotPending {
                id: id.to_string(),
                status: entry.review_status,
            });
        }
        if !entry.review_status.can_transition_to(status) {
            return Err(AuditError::InvalidTransition {
                from: entry.review_status,
                to: status,
            });
        }
        if entry.operator_id == reviewer_id {
            return Err(AuditError::SelfReview(id.to_string()));
        }
        if entry.reviewer_id.as_deref() != Some(reviewer_id) {
            return Err(AuditError::ReviewerMismatch {
                id: id.to_string(),
                expected: entry.reviewer_id.clone().unwrap_or_default(),
                actual: reviewer_id.to_string(),
            });
        }

        inner.commit(LedgerEvent::ReviewDecided {
            audit_log_id: id.to_string(),
            status,
            reviewer_id: reviewer_id.to_string(),
            reject_reason,
            decided_at: Utc::now(),
        })?;

        debug!(audit_log_id = %id, status = %status, "review status recorded");

        inner
            .get(id)
            .cloned()
            .ok_or_else(|| AuditError::EntryNotFound(id.to_string()))
    }

    pub fn get(&self, id: &str) -> Option<AuditLogEntry> {
        self.lock().get(id).cloned()
    }

    /// Matching entries, newest first, at most `query.limit`
    pub fn query(&self, query: &AuditQuery) -> Vec<AuditLogEntry> {
        self.lock()
            .entries
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .take(query.limit)
            .cloned()
            .collect()
    }

    /// Number of matching entries, ignoring the limit
    pub fn count(&self, query: &AuditQuery) -> usize {
        self.lock().entries.iter().filter(|e| query.matches(e)).count()
    }

    /// Pending entries assigned to a reviewer, oldest first
    pub fn pending_for_reviewer(&self, reviewer_id: &str) -> Vec<AuditLogEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.is_pending() && e.reviewer_id.as_deref() == Some(reviewer_id))
            .cloned()
            .collect()
    }

    /// The unresolved pending entry for a target, if any
    pub fn pending_for_target(&self, target: &TargetRef) -> Option<AuditLogEntry> {
        let inner = self.lock();
        let id = inner.pending_by_target.get(target)?;
        inner.get(id).cloned()
    }

    /// Pending entries created before `cutoff`, oldest first
    pub fn stale_pending(&self, cutoff: DateTime<Utc>) -> Vec<AuditLogEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|e| e.is_pending() && e.created_at < cutoff)
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> AuditStats {
        let inner = self.lock();
        let mut stats = AuditStats::default();
        for entry in &inner.entries {
            stats.record(entry.review_status);
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence number of the last record written
    pub fn last_sequence(&self) -> u64 {
        self.lock().last_sequence
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.lock().path.clone()
    }

    /// Re-read the file and verify the hash chain, returning the record count
    pub fn verify(&self) -> AuditResult<usize> {
        let inner = self.lock();
        match inner.path {
            Some(ref path) => {
                let (records, _) = read_records(path)?;
                verify_chain(&records)?;
                Ok(records.len())
            }
            None => Ok(inner.last_sequence as usize),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admission checks shared by every append
    fn admit(&self, inner: &LedgerInner, entry: &AuditLogEntry) -> AuditResult<()> {
        let min = self.policy.min_reason_for(entry.action);
        let actual = entry.reason_chars();
        if actual < min {
            return Err(AuditError::ReasonTooShort {
                action: entry.action,
                min,
                actual,
            });
        }

        match entry.review_status {
            ReviewStatus::None => {}
            ReviewStatus::Pending => match entry.reviewer_id.as_deref() {
                None | Some("") => return Err(AuditError::MissingReviewer(entry.id.clone())),
                Some(reviewer) if reviewer == entry.operator_id => {
                    return Err(AuditError::SelfReview(entry.id.clone()))
                }
                Some(_) => {}
            },
            status => {
                return Err(AuditError::UnexpectedStatus {
                    id: entry.id.clone(),
                    status,
                })
            }
        }

        if inner.index.contains_key(&entry.id) {
            return Err(AuditError::DuplicateEntry(entry.id.clone()));
        }

        Ok(())
    }
}

impl LedgerInner {
    fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            file: None,
            entries: Vec::new(),
            index: HashMap::new(),
            pending_by_target: HashMap::new(),
            last_sequence: 0,
            last_hash: GENESIS_HASH.to_string(),
            unwritable: false,
        }
    }

    fn get(&self, id: &str) -> Option<&AuditLogEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    fn append(&mut self, entry: AuditLogEntry) -> AuditResult<String> {
        let id = entry.id.clone();
        self.commit(LedgerEvent::Appended { entry })?;
        Ok(id)
    }

    /// Write one record durably, then fold it into the index
    fn commit(&mut self, event: LedgerEvent) -> AuditResult<()> {
        if self.unwritable {
            return Err(AuditError::Unwritable);
        }

        let record = LedgerRecord::seal(self.last_sequence + 1, self.last_hash.clone(), event);

        if let Some(ref mut file) = self.file {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');

            let len = file.metadata()?.len();
            if let Err(err) = write_synced(file, &line) {
                if let Err(rollback) = file.set_len(len).and_then(|_| file.sync_data()) {
                    error!(error = %rollback, sequence = record.sequence, "ledger rollback failed, refusing further writes");
                    self.unwritable = true;
                }
                return Err(err.into());
            }
        }

        self.last_sequence = record.sequence;
        self.last_hash = record.hash.clone();
        self.apply(&record.event);
        Ok(())
    }

    fn apply(&mut self, event: &LedgerEvent) {
        match event {
            LedgerEvent::Appended { entry } => {
                if entry.is_pending() {
                    self.pending_by_target
                        .insert(entry.target(), entry.id.clone());
                }
                self.index.insert(entry.id.clone(), self.entries.len());
                self.entries.push(entry.clone());
            }
            LedgerEvent::ReviewDecided {
                audit_log_id,
                status,
                reject_reason,
                decided_at,
                ..
            } => {
                if let Some(&i) = self.index.get(audit_log_id) {
                    let entry = &mut self.entries[i];
                    entry.review_status = *status;
                    entry.reject_reason = reject_reason.clone();
                    entry.reviewed_at = Some(*decided_at);
                    let target = entry.target();
                    self.pending_by_target.remove(&target);
                }
            }
        }
    }
}

fn write_synced(file: &mut File, line: &[u8]) -> io::Result<()> {
    file.write_all(line)?;
    file.flush()?;
    file.sync_data()
}

/// Records in the file, plus the length to cut the file back to when the
/// last line was never terminated.
///
/// A record counts only once its newline is on disk, so an unterminated
/// final line is a torn write whatever its content.
fn read_records(path: &Path) -> AuditResult<(Vec<LedgerRecord>, Option<u64>)> {
    if !path.exists() {
        return Ok((Vec::new(), None));
    }

    let content = fs::read(path)?;
    let mut records = Vec::new();
    let mut offset = 0usize;

    for line in content.split_inclusive(|&b| b == b'\n') {
        if line.last() != Some(&b'\n') {
            return Ok((records, Some(offset as u64)));
        }
        offset += line.len();

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        records.push(serde_json::from_slice(line)?);
    }

    Ok((records, None))
}
