//! Audit log entries

use chrono::{DateTime, Utc};
use onbehalf_core::{ActionType, PowerTier, ReviewStatus, Role, TargetRef, TargetType, VerificationMethod};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One privileged action attempt.
///
/// `before_state`/`after_state` are opaque snapshots of the target record.
/// For a staged (PENDING) entry `after_state` is the intended result that the
/// reviewer's approval will apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub operator_id: String,
    pub operator_role: Role,
    pub power_type: Option<PowerTier>,
    pub action: ActionType,
    pub target_type: TargetType,
    pub target_id: String,
    pub verification_method: Option<VerificationMethod>,
    pub reason: String,
    pub evidence_url: Option<String>,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub review_status: ReviewStatus,
    pub reviewer_id: Option<String>,
    pub reject_reason: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl AuditLogEntry {
    /// Start an entry for an immediate (non-reviewed) action
    pub fn new(
        operator_id: impl Into<String>,
        operator_role: Role,
        action: ActionType,
        target: &TargetRef,
        reason: impl Into<String>,
    ) -> Self {
        let id = format!(
            "AUD-{}",
            uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()
        );

        Self {
            id,
            operator_id: operator_id.into(),
            operator_role,
            power_type: action.required_tier(),
            action,
            target_type: target.target_type,
            target_id: target.target_id.clone(),
            verification_method: None,
            reason: reason.into(),
            evidence_url: None,
            before_state: None,
            after_state: None,
            created_at: Utc::now(),
            review_status: ReviewStatus::None,
            reviewer_id: None,
            reject_reason: None,
            reviewed_at: None,
        }
    }

    pub fn with_before(mut self, state: Option<Value>) -> Self {
        self.before_state = state;
        self
    }

    pub fn with_after(mut self, state: Option<Value>) -> Self {
        self.after_state = state;
        self
    }

    pub fn with_verification(mut self, method: VerificationMethod) -> Self {
        self.verification_method = Some(method);
        self
    }

    pub fn with_evidence(mut self, url: impl Into<String>) -> Self {
        self.evidence_url = Some(url.into());
        self
    }

    /// Mark the entry as staged for `reviewer_id`
    pub fn staged_for(mut self, reviewer_id: impl Into<String>) -> Self {
        self.review_status = ReviewStatus::Pending;
        self.reviewer_id = Some(reviewer_id.into());
        self
    }

    pub fn target(&self) -> TargetRef {
        TargetRef::new(self.target_type, self.target_id.clone())
    }

    pub fn is_pending(&self) -> bool {
        self.review_status == ReviewStatus::Pending
    }

    /// Reason length as the customer-facing UI counts it (characters, not bytes)
    pub fn reason_chars(&self) -> usize {
        self.reason.trim().chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> AuditLogEntry {
        AuditLogEntry::new(
            "S001",
            Role::L3,
            ActionType::SubstitutePayment,
            &TargetRef::proposal("P-100"),
            "客户授权代为缴纳首期保费",
        )
    }

    #[test]
    fn test_new_entry_defaults() {
        let entry = sample();

        assert!(entry.id.starts_with("AUD-"));
        assert_eq!(entry.id.len(), 16);
        assert_eq!(entry.power_type, Some(PowerTier::Substitution));
        assert_eq!(entry.review_status, ReviewStatus::None);
        assert_eq!(entry.target(), TargetRef::proposal("P-100"));
    }

    #[test]
    fn test_staged_for_sets_reviewer() {
        let entry = sample().staged_for("S002");

        assert!(entry.is_pending());
        assert_eq!(entry.reviewer_id.as_deref(), Some("S002"));
    }

    #[test]
    fn test_reason_counts_characters() {
        assert_eq!(sample().reason_chars(), 12);
    }

    #[test]
    fn test_camel_case_serialization() {
        let entry = sample()
            .with_before(Some(json!({"paymentStatus": "UNPAID"})))
            .staged_for("S002");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["operatorId"], "S001");
        assert_eq!(json["operatorRole"], "L3");
        assert_eq!(json["powerType"], "SUBSTITUTION");
        assert_eq!(json["reviewStatus"], "PENDING");
        assert_eq!(json["targetType"], "PROPOSAL");
        assert_eq!(json["beforeState"]["paymentStatus"], "UNPAID");
    }
}
