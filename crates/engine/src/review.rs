//! Review queue - second-person confirmation of staged actions
//!
//! The queue is a view over PENDING audit entries; there is no separate
//! store. A decision either commits the staged command and closes the entry
//! as APPROVED, or closes it as REJECTED without touching the target.

use chrono::Utc;
use onbehalf_audit::{AuditLedger, AuditLogEntry};
use onbehalf_core::{ReviewStatus, StaffIdentity};
use onbehalf_store::TargetRepository;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::staged::StagedCommand;

/// A reviewer's verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewDecision {
    Approve,
    Reject { reason: Option<String> },
}

impl ReviewDecision {
    pub fn from_flag(approved: bool, reject_reason: Option<String>) -> Self {
        if approved {
            ReviewDecision::Approve
        } else {
            ReviewDecision::Reject {
                reason: reject_reason,
            }
        }
    }
}

pub struct ReviewQueue {
    ledger: Arc<AuditLedger>,
    repo: Arc<dyn TargetRepository>,
    config: EngineConfig,
    /// Held across commit + status change so an approval and a rejection of
    /// the same entry cannot interleave
    decisions: Mutex<()>,
}

impl ReviewQueue {
    pub fn new(
        ledger: Arc<AuditLedger>,
        repo: Arc<dyn TargetRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            repo,
            config,
            decisions: Mutex::new(()),
        }
    }

    /// Entries awaiting this reviewer, oldest first
    pub fn list_pending(&self, reviewer_id: &str) -> Vec<AuditLogEntry> {
        self.ledger.pending_for_reviewer(reviewer_id)
    }

    /// Entries pending longer than the configured threshold
    pub fn list_stale(&self) -> Vec<AuditLogEntry> {
        self.list_pending_older_than(self.config.review_stale_after())
    }

    pub fn list_pending_older_than(&self, age: chrono::Duration) -> Vec<AuditLogEntry> {
        self.ledger.stale_pending(Utc::now() - age)
    }

    /// Decide a staged action.
    ///
    /// On approval a failed store commit leaves the entry PENDING so the
    /// decision can be retried.
    pub fn confirm(
        &self,
        reviewer: &StaffIdentity,
        audit_log_id: &str,
        decision: ReviewDecision,
    ) -> EngineResult<AuditLogEntry> {
        let result = self.decide(reviewer, audit_log_id, decision);
        if let Err(ref err) = result {
            if err.kind().is_server_error() {
                error!(audit_log_id, reviewer = %reviewer.id, error = %err, "review decision failed");
            } else {
                warn!(audit_log_id, reviewer = %reviewer.id, error = %err, "review decision refused");
            }
        }
        result
    }

    fn decide(
        &self,
        reviewer: &StaffIdentity,
        audit_log_id: &str,
        decision: ReviewDecision,
    ) -> EngineResult<AuditLogEntry> {
        if reviewer.role < self.config.min_reviewer_role {
            return Err(EngineError::authorization(format!(
                "role {} may not decide reviews (requires {} or above)",
                reviewer.role, self.config.min_reviewer_role
            )));
        }

        let _guard = self.decisions.lock().unwrap_or_else(PoisonError::into_inner);

        let entry = self
            .ledger
            .get(audit_log_id)
            .ok_or_else(|| EngineError::NotFound(format!("audit entry {audit_log_id}")))?;

        if entry.reviewer_id.as_deref() != Some(reviewer.id.as_str()) {
            return Err(EngineError::authorization(format!(
                "audit entry {audit_log_id} is not assigned to {}",
                reviewer.id
            )));
        }
        if entry.review_status != ReviewStatus::Pending {
            return Err(EngineError::ReviewState(format!(
                "audit entry {audit_log_id} is already {}",
                entry.review_status
            )));
        }

        match decision {
            ReviewDecision::Approve => {
                let command = StagedCommand::from_entry(&entry)?;
                command
                    .commit(self.repo.as_ref())
                    .map_err(|source| EngineError::Commit {
                        audit_log_id: audit_log_id.to_string(),
                        source,
                    })?;

                let decided = self.ledger.update_review_status(
                    audit_log_id,
                    ReviewStatus::Approved,
                    &reviewer.id,
                    None,
                )?;
                info!(audit_log_id, reviewer = %reviewer.id, target = %decided.target(), "staged action approved and committed");
                Ok(decided)
            }
            ReviewDecision::Reject { reason } => {
                if let Ok(command) = StagedCommand::from_entry(&entry) {
                    command.abort();
                }
                let decided = self.ledger.update_review_status(
                    audit_log_id,
                    ReviewStatus::Rejected,
                    &reviewer.id,
                    reason,
                )?;
                info!(audit_log_id, reviewer = %reviewer.id, target = %decided.target(), "staged action rejected");
                Ok(decided)
            }
        }
    }
}
