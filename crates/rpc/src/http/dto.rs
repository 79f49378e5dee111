//! Request bodies
//!
//! Enumerations travel as strings and are parsed here, so an unknown value
//! is a validation failure rather than a deserialization one.

use onbehalf_claims::ClaimProcessState;
use onbehalf_core::{
    AuthorizationType, Role, SurrenderReason, TargetRef, TargetType, VerificationMethod,
};
use onbehalf_engine::{ActionRequest, ClaimDraft, EngineError, EngineResult};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;

/// Parse a closed enumeration sent as a string
pub fn parse_field<T: FromStr>(field: &str, value: &str) -> EngineResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::validation(format!("{field} has unknown value '{value}'")))
}

/// Who is calling
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorFields {
    pub operator_id: String,
    pub operator_role: String,
}

impl OperatorFields {
    pub fn role(&self) -> EngineResult<Role> {
        parse_field("operatorRole", &self.operator_role)
    }
}

/// A body that names its operator and maps onto one [`ActionRequest`]
pub trait ActionBody: Send + 'static {
    fn operator(&self) -> &OperatorFields;
    fn into_request(self) -> EngineResult<ActionRequest>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendAuthCodeBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub proposal_id: String,
    pub mobile: String,
}

impl ActionBody for ResendAuthCodeBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        Ok(ActionRequest::ResendAuthCode {
            proposal_id: self.proposal_id,
            mobile: self.mobile,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryUnderwritingBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub proposal_id: String,
}

impl ActionBody for QueryUnderwritingBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        Ok(ActionRequest::QueryUnderwriting {
            proposal_id: self.proposal_id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteAuthBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub proposal_id: String,
    pub verification_method: String,
    pub reason: String,
}

impl ActionBody for SubstituteAuthBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        let verification_method: VerificationMethod =
            parse_field("verificationMethod", &self.verification_method)?;
        Ok(ActionRequest::CompleteAuthentication {
            proposal_id: self.proposal_id,
            verification_method,
            reason: self.reason,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMaterialBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub proposal_id: String,
    pub material_type: String,
    #[serde(default)]
    pub material_note: Option<String>,
}

impl ActionBody for UploadMaterialBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        Ok(ActionRequest::UploadMaterial {
            proposal_id: self.proposal_id,
            material_type: self.material_type,
            note: self.material_note,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectDataBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub target_type: String,
    pub target_id: String,
    pub field_name: String,
    /// When present, the stored value must still equal it
    #[serde(default)]
    pub old_value: Option<Value>,
    pub new_value: Value,
    pub reason: String,
}

impl ActionBody for CorrectDataBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        let target_type: TargetType = parse_field("targetType", &self.target_type)?;
        Ok(ActionRequest::CorrectData {
            target: TargetRef::new(target_type, self.target_id),
            field_name: self.field_name,
            old_value: self.old_value,
            new_value: self.new_value,
            reason: self.reason,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitClaimBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub policy_id: String,
    pub claim_type: String,
    #[serde(default)]
    pub claim_amount: Option<Decimal>,
    pub claim_description: String,
    pub authorization_type: String,
    pub authorization_note: String,
}

impl ActionBody for SubmitClaimBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        let authorization_type: AuthorizationType =
            parse_field("authorizationType", &self.authorization_type)?;
        Ok(ActionRequest::SubmitClaim {
            policy_id: self.policy_id,
            claim_type: self.claim_type,
            claim_amount: self.claim_amount,
            description: self.claim_description,
            authorization_type,
            authorization_note: self.authorization_note,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstitutePaymentBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub proposal_id: String,
    pub payment_amount: Decimal,
    pub payment_method: String,
    pub authorization_url: String,
    pub reason: String,
    pub reviewer_id: String,
}

impl ActionBody for SubstitutePaymentBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        Ok(ActionRequest::SubstitutePayment {
            proposal_id: self.proposal_id,
            amount: self.payment_amount,
            payment_method: self.payment_method,
            evidence_url: self.authorization_url,
            reason: self.reason,
            reviewer_id: self.reviewer_id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteSurrenderBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub policy_id: String,
    pub surrender_reason: String,
    #[serde(default)]
    pub refund_amount: Option<Decimal>,
    pub authorization_url: String,
    pub reason: String,
    pub reviewer_id: String,
}

impl ActionBody for SubstituteSurrenderBody {
    fn operator(&self) -> &OperatorFields {
        &self.operator
    }

    fn into_request(self) -> EngineResult<ActionRequest> {
        let surrender_reason: SurrenderReason =
            parse_field("surrenderReason", &self.surrender_reason)?;
        Ok(ActionRequest::SubstituteSurrender {
            policy_id: self.policy_id,
            surrender_reason,
            refund_amount: self.refund_amount,
            evidence_url: self.authorization_url,
            reason: self.reason,
            reviewer_id: self.reviewer_id,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfirmBody {
    pub audit_log_id: String,
    pub reviewer_id: String,
    pub reviewer_role: String,
    pub approved: bool,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReviewsQuery {
    pub reviewer_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    /// Alias of `targetId` kept for proposal-centric clients
    pub proposal_id: Option<String>,
    pub target_id: Option<String>,
    pub operator_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDraftBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub policy_no: String,
    pub claim_type: String,
    pub description: String,
    #[serde(default)]
    pub claim_amount: Option<Decimal>,
}

impl ClaimDraftBody {
    pub fn draft(&self) -> ClaimDraft {
        ClaimDraft {
            policy_no: self.policy_no.clone(),
            claim_type: self.claim_type.clone(),
            description: self.description.clone(),
            claim_amount: self.claim_amount,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMaterialBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub material_type: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessAdvanceBody {
    #[serde(flatten)]
    pub operator: OperatorFields,
    pub to: String,
    pub action: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub required_materials: Vec<String>,
}

impl ProcessAdvanceBody {
    pub fn target_state(&self) -> EngineResult<ClaimProcessState> {
        parse_field("to", &self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_body_maps_to_request() {
        let body: SubstitutePaymentBody = serde_json::from_value(json!({
            "proposalId": "P-100",
            "operatorId": "A",
            "operatorRole": "L3",
            "paymentAmount": 5000,
            "paymentMethod": "BANK_TRANSFER",
            "authorizationUrl": "https://files.example.com/auth.mp3",
            "reason": "客户授权代为缴纳首期保费",
            "reviewerId": "B",
        }))
        .unwrap();

        assert_eq!(body.operator().role().unwrap(), Role::L3);
        let request = body.into_request().unwrap();
        assert_eq!(request.reviewer_id(), Some("B"));
        assert_eq!(request.existing_target(), Some(TargetRef::proposal("P-100")));
    }

    #[test]
    fn test_unknown_enum_is_validation_error() {
        let body: SubstituteSurrenderBody = serde_json::from_value(json!({
            "policyId": "6500001",
            "operatorId": "A",
            "operatorRole": "L3",
            "surrenderReason": "BORED",
            "authorizationUrl": "https://files.example.com/auth.mp3",
            "reason": "客户来电申请退保并已录音",
            "reviewerId": "B",
        }))
        .unwrap();

        assert!(matches!(body.into_request(), Err(EngineError::Validation(_))));
        assert!(matches!(
            parse_field::<Role>("operatorRole", "L9"),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_enum_parsing_ignores_case() {
        let method: VerificationMethod = parse_field("verificationMethod", "video").unwrap();
        assert_eq!(method, VerificationMethod::Video);
        assert_eq!(
            parse_field::<ClaimProcessState>("to", "MATERIALS_REQUIRED").unwrap(),
            ClaimProcessState::MaterialsRequired
        );
    }
}
