//! Typed action requests and their outcomes

use onbehalf_core::{
    ActionType, AuthorizationType, ReviewStatus, SurrenderReason, TargetRef, VerificationMethod,
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::validation;

/// One privileged action, with the inputs that action needs.
///
/// Enumerations are already parsed; free-text fields are checked by
/// [`ActionRequest::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    ResendAuthCode {
        proposal_id: String,
        mobile: String,
    },
    QueryUnderwriting {
        proposal_id: String,
    },
    CompleteAuthentication {
        proposal_id: String,
        verification_method: VerificationMethod,
        reason: String,
    },
    UploadMaterial {
        proposal_id: String,
        material_type: String,
        note: Option<String>,
    },
    CorrectData {
        target: TargetRef,
        field_name: String,
        old_value: Option<Value>,
        new_value: Value,
        reason: String,
    },
    SubmitClaim {
        policy_id: String,
        claim_type: String,
        claim_amount: Option<Decimal>,
        description: String,
        authorization_type: AuthorizationType,
        authorization_note: String,
    },
    SubstitutePayment {
        proposal_id: String,
        amount: Decimal,
        payment_method: String,
        evidence_url: String,
        reason: String,
        reviewer_id: String,
    },
    SubstituteSurrender {
        policy_id: String,
        surrender_reason: SurrenderReason,
        refund_amount: Option<Decimal>,
        evidence_url: String,
        reason: String,
        reviewer_id: String,
    },
}

impl ActionRequest {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionRequest::ResendAuthCode { .. } => ActionType::ResendAuthCode,
            ActionRequest::QueryUnderwriting { .. } => ActionType::QueryUnderwriting,
            ActionRequest::CompleteAuthentication { .. } => ActionType::CompleteAuthentication,
            ActionRequest::UploadMaterial { .. } => ActionType::UploadMaterialOnBehalf,
            ActionRequest::CorrectData { .. } => ActionType::CorrectData,
            ActionRequest::SubmitClaim { .. } => ActionType::SubmitClaimOnBehalf,
            ActionRequest::SubstitutePayment { .. } => ActionType::SubstitutePayment,
            ActionRequest::SubstituteSurrender { .. } => ActionType::SubstituteSurrender,
        }
    }

    /// Nominated reviewer of a staged action
    pub fn reviewer_id(&self) -> Option<&str> {
        match self {
            ActionRequest::SubstitutePayment { reviewer_id, .. }
            | ActionRequest::SubstituteSurrender { reviewer_id, .. } => Some(reviewer_id.as_str()),
            _ => None,
        }
    }

    /// Record the action reads and writes.
    ///
    /// A claim filed on the customer's behalf does not exist yet; its id is
    /// assigned by the executor.
    pub fn existing_target(&self) -> Option<TargetRef> {
        match self {
            ActionRequest::ResendAuthCode { proposal_id, .. }
            | ActionRequest::QueryUnderwriting { proposal_id }
            | ActionRequest::CompleteAuthentication { proposal_id, .. }
            | ActionRequest::UploadMaterial { proposal_id, .. }
            | ActionRequest::SubstitutePayment { proposal_id, .. } => {
                Some(TargetRef::proposal(proposal_id.clone()))
            }
            ActionRequest::SubstituteSurrender { policy_id, .. } => {
                Some(TargetRef::policy(policy_id.clone()))
            }
            ActionRequest::CorrectData { target, .. } => Some(target.clone()),
            ActionRequest::SubmitClaim { .. } => None,
        }
    }

    /// Structural checks, independent of stored state
    pub fn validate(&self, config: &EngineConfig) -> EngineResult<()> {
        let min_reason = config.min_reason_chars;

        match self {
            ActionRequest::ResendAuthCode {
                proposal_id,
                mobile,
            } => {
                validation::required("proposalId", proposal_id)?;
                validation::mobile(mobile)
            }
            ActionRequest::QueryUnderwriting { proposal_id } => {
                validation::required("proposalId", proposal_id)
            }
            ActionRequest::CompleteAuthentication {
                proposal_id,
                reason,
                ..
            } => {
                validation::required("proposalId", proposal_id)?;
                validation::min_chars("reason", reason, min_reason)
            }
            ActionRequest::UploadMaterial {
                proposal_id,
                material_type,
                ..
            } => {
                validation::required("proposalId", proposal_id)?;
                validation::required("materialType", material_type)
            }
            ActionRequest::CorrectData {
                target,
                field_name,
                reason,
                ..
            } => {
                validation::required("targetId", &target.target_id)?;
                validation::required("fieldName", field_name)?;
                validation::min_chars("reason", reason, min_reason)
            }
            ActionRequest::SubmitClaim {
                policy_id,
                claim_type,
                claim_amount,
                description,
                authorization_note,
                ..
            } => {
                validation::policy_number(policy_id)?;
                validation::required("claimType", claim_type)?;
                if let Some(amount) = claim_amount {
                    validation::positive_amount("claimAmount", *amount)?;
                }
                validation::min_chars(
                    "claimDescription",
                    description,
                    config.min_claim_description_chars,
                )?;
                validation::min_chars("authorizationNote", authorization_note, min_reason)
            }
            ActionRequest::SubstitutePayment {
                proposal_id,
                amount,
                payment_method,
                evidence_url,
                reason,
                reviewer_id,
            } => {
                validation::required("proposalId", proposal_id)?;
                validation::positive_amount("paymentAmount", *amount)?;
                validation::required("paymentMethod", payment_method)?;
                validation::evidence_url(evidence_url)?;
                validation::min_chars("reason", reason, min_reason)?;
                validation::required("reviewerId", reviewer_id)
            }
            ActionRequest::SubstituteSurrender {
                policy_id,
                refund_amount,
                evidence_url,
                reason,
                reviewer_id,
                ..
            } => {
                validation::policy_number(policy_id)?;
                if let Some(amount) = refund_amount {
                    validation::non_negative_amount("refundAmount", *amount)?;
                }
                validation::evidence_url(evidence_url)?;
                validation::min_chars("reason", reason, min_reason)?;
                validation::required("reviewerId", reviewer_id)
            }
        }
    }
}

/// What [`crate::PowerActionExecutor::execute`] reports back
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub audit_log_id: String,
    pub action: ActionType,
    pub review_status: ReviewStatus,
    /// Record state after an immediate commit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub committed: Option<Value>,
    /// Read-only result (underwriting lookup)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surrender_id: Option<String>,
    pub message: String,
}

impl ActionOutcome {
    pub fn is_pending(&self) -> bool {
        self.review_status == ReviewStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn payment(amount: Decimal, url: &str, reviewer: &str) -> ActionRequest {
        ActionRequest::SubstitutePayment {
            proposal_id: "P-1".into(),
            amount,
            payment_method: "BANK_TRANSFER".into(),
            evidence_url: url.into(),
            reason: "客户授权代为缴纳首期保费".into(),
            reviewer_id: reviewer.into(),
        }
    }

    #[test]
    fn test_payment_validation() {
        let config = EngineConfig::default();

        assert!(payment(dec!(5000), "https://files/rec.mp3", "S002")
            .validate(&config)
            .is_ok());
        assert!(payment(dec!(0), "https://files/rec.mp3", "S002")
            .validate(&config)
            .is_err());
        assert!(payment(dec!(5000), "files/rec.mp3", "S002")
            .validate(&config)
            .is_err());
        assert!(payment(dec!(5000), "https://files/rec.mp3", " ")
            .validate(&config)
            .is_err());
    }

    #[test]
    fn test_claim_description_minimum() {
        let config = EngineConfig::default();
        let request = ActionRequest::SubmitClaim {
            policy_id: "6500001".into(),
            claim_type: "MEDICAL".into(),
            claim_amount: None,
            description: "住院".into(),
            authorization_type: AuthorizationType::PhoneRecording,
            authorization_note: "客户电话录音授权代为报案".into(),
        };

        assert!(request.validate(&config).is_err());
        assert!(request.existing_target().is_none());
    }

    #[test]
    fn test_targets_and_reviewers() {
        let request = payment(dec!(1), "https://x/y", "S002");
        assert_eq!(request.action_type(), ActionType::SubstitutePayment);
        assert_eq!(request.existing_target(), Some(TargetRef::proposal("P-1")));
        assert_eq!(request.reviewer_id(), Some("S002"));

        let query = ActionRequest::QueryUnderwriting {
            proposal_id: "P-1".into(),
        };
        assert_eq!(query.reviewer_id(), None);
        assert!(query.validate(&EngineConfig::default()).is_ok());
    }
}
