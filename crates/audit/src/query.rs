//! Audit queries

use onbehalf_core::ReviewStatus;
use serde::{Deserialize, Serialize};

use crate::entry::AuditLogEntry;

/// Filter for [`crate::AuditLedger::query`]. Results are newest-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub target_id: Option<String>,
    pub operator_id: Option<String>,
    pub limit: usize,
}

impl AuditQuery {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    pub fn operator(mut self, operator_id: impl Into<String>) -> Self {
        self.operator_id = Some(operator_id.into());
        self
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        let target_ok = self
            .target_id
            .as_ref()
            .map_or(true, |id| &entry.target_id == id);
        let operator_ok = self
            .operator_id
            .as_ref()
            .map_or(true, |id| &entry.operator_id == id);
        target_ok && operator_ok
    }
}

/// Counts of entries per review status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStats {
    pub total: usize,
    pub immediate: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl AuditStats {
    pub(crate) fn record(&mut self, status: ReviewStatus) {
        self.total += 1;
        match status {
            ReviewStatus::None => self.immediate += 1,
            ReviewStatus::Pending => self.pending += 1,
            ReviewStatus::Approved => self.approved += 1,
            ReviewStatus::Rejected => self.rejected += 1,
        }
    }
}
