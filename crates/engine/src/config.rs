//! Engine configuration
//!
//! Every threshold can be overridden from a JSON file; missing fields keep
//! their defaults.

use onbehalf_core::Role;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Minimum justification length (characters) for privileged actions
    #[serde(default = "default_min_reason_chars")]
    pub min_reason_chars: usize,

    /// Minimum claim description length (characters)
    #[serde(default = "default_min_claim_description_chars")]
    pub min_claim_description_chars: usize,

    /// Lowest role allowed to decide a staged action
    #[serde(default = "default_min_reviewer_role")]
    pub min_reviewer_role: Role,

    /// Lowest role allowed to move a claim's processing record
    #[serde(default = "default_min_process_role")]
    pub min_process_role: Role,

    /// Age after which a PENDING entry is listed as stale
    #[serde(default = "default_review_stale_after_hours")]
    pub review_stale_after_hours: i64,

    #[serde(default = "default_query_limit")]
    pub default_query_limit: usize,

    #[serde(default = "default_max_query_limit")]
    pub max_query_limit: usize,
}

fn default_min_reason_chars() -> usize {
    10
}

fn default_min_claim_description_chars() -> usize {
    20
}

fn default_min_reviewer_role() -> Role {
    Role::L2
}

fn default_min_process_role() -> Role {
    Role::L3
}

fn default_review_stale_after_hours() -> i64 {
    24
}

fn default_query_limit() -> usize {
    50
}

fn default_max_query_limit() -> usize {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_reason_chars: default_min_reason_chars(),
            min_claim_description_chars: default_min_claim_description_chars(),
            min_reviewer_role: default_min_reviewer_role(),
            min_process_role: default_min_process_role(),
            review_stale_after_hours: default_review_stale_after_hours(),
            default_query_limit: default_query_limit(),
            max_query_limit: default_max_query_limit(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Requested query limit clamped to `1..=max_query_limit`
    pub fn query_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_query_limit)
            .clamp(1, self.max_query_limit.max(1))
    }

    pub fn review_stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.review_stale_after_hours)
    }

    /// Admission policy handed to the audit ledger
    pub fn ledger_policy(&self) -> onbehalf_audit::LedgerPolicy {
        onbehalf_audit::LedgerPolicy {
            min_reason_chars: self.min_reason_chars,
        }
    }
}
