//! Power action executor
//!
//! Single entry point for privileged actions. Gates run in a fixed order and
//! every gate before the ledger append is side-effect free:
//!
//! 1. structural validation
//! 2. role permission
//! 3. SUBSTITUTION pre-checks (reviewer, pending entry on the target)
//! 4. read the target, compute the intended result
//! 5. CORRECTION/GUARANTEE: audit entry, then commit
//!    SUBSTITUTION: PENDING audit entry carrying the staged result, no commit

use chrono::Utc;
use onbehalf_audit::{AuditLedger, AuditLogEntry};
use onbehalf_claims::{Claim, ClaimProcess};
use onbehalf_core::{
    ActionType, ReviewStatus, RoleAuthority, StaffIdentity, StaffRoster, TargetRef, TargetType,
    VerificationMethod,
};
use onbehalf_store::{TargetRepository, VersionedRecord};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::desk::{self, ClaimDraft};
use crate::error::{EngineError, EngineResult, ErrorKind};
use crate::request::{ActionOutcome, ActionRequest};
use crate::staged::StagedCommand;

/// Fields owned by a state machine or the review workflow
const PROTECTED_FIELDS: [&str; 5] = ["state", "status", "authStatus", "paymentStatus", "timeline"];

/// What an action intends to do, computed before anything is written
struct Plan {
    target: TargetRef,
    before: Option<Value>,
    change: Option<StagedCommand>,
    /// Records written before the primary change
    follow_ups: Vec<StagedCommand>,
    reason: String,
    verification: Option<VerificationMethod>,
    evidence_url: Option<String>,
    result: Option<Value>,
    claim_id: Option<String>,
    surrender_id: Option<String>,
}

impl Plan {
    fn new(target: TargetRef, before: Option<Value>, reason: impl Into<String>) -> Self {
        Self {
            target,
            before,
            change: None,
            follow_ups: Vec::new(),
            reason: reason.into(),
            verification: None,
            evidence_url: None,
            result: None,
            claim_id: None,
            surrender_id: None,
        }
    }

    /// Change the target from its current snapshot to `after`
    fn updating(mut self, after: Value) -> Self {
        self.change = Some(StagedCommand::new(
            self.target.clone(),
            self.before.clone(),
            after,
        ));
        self
    }

    fn entry(&self, operator: &StaffIdentity, action: ActionType) -> AuditLogEntry {
        let mut entry = AuditLogEntry::new(
            &operator.id,
            operator.role,
            action,
            &self.target,
            self.reason.clone(),
        )
        .with_before(self.before.clone())
        .with_after(self.change.as_ref().map(|c| c.after.clone()));

        if let Some(method) = self.verification {
            entry = entry.with_verification(method);
        }
        if let Some(ref url) = self.evidence_url {
            entry = entry.with_evidence(url.clone());
        }
        entry
    }
}

pub struct PowerActionExecutor {
    ledger: Arc<AuditLedger>,
    repo: Arc<dyn TargetRepository>,
    config: EngineConfig,
    roster: Option<Arc<StaffRoster>>,
}

impl PowerActionExecutor {
    pub fn new(
        ledger: Arc<AuditLedger>,
        repo: Arc<dyn TargetRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            repo,
            config,
            roster: None,
        }
    }

    /// Check nominated reviewers against a known roster
    pub fn with_roster(mut self, roster: Arc<StaffRoster>) -> Self {
        self.roster = Some(roster);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, authorize and run one action
    pub fn execute(
        &self,
        operator: &StaffIdentity,
        request: ActionRequest,
    ) -> EngineResult<ActionOutcome> {
        let action = request.action_type();
        let result = self.run(operator, action, request);

        if let Err(ref err) = result {
            match err.kind() {
                ErrorKind::Internal => {
                    error!(operator = %operator.id, action = %action, error = %err, "action failed")
                }
                _ => warn!(operator = %operator.id, action = %action, error = %err, "action refused"),
            }
        }
        result
    }

    fn run(
        &self,
        operator: &StaffIdentity,
        action: ActionType,
        request: ActionRequest,
    ) -> EngineResult<ActionOutcome> {
        request.validate(&self.config)?;

        if !RoleAuthority::is_permitted(operator.role, action) {
            return Err(EngineError::authorization(format!(
                "role {} may not perform {} (requires {} or above)",
                operator.role,
                action,
                action.minimum_role()
            )));
        }

        if action.requires_dual_review() {
            self.check_staging(operator, &request)?;
        }

        let reviewer_id = request.reviewer_id().map(str::to_string);
        let plan = self.plan(operator, request)?;

        match reviewer_id {
            Some(reviewer_id) if action.requires_dual_review() => {
                self.stage(operator, action, plan, reviewer_id)
            }
            _ => self.commit_now(operator, action, plan),
        }
    }

    /// Reviewer and per-target checks for SUBSTITUTION actions
    fn check_staging(&self, operator: &StaffIdentity, request: &ActionRequest) -> EngineResult<()> {
        let reviewer_id = request
            .reviewer_id()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| EngineError::validation("reviewerId is required for this action"))?;

        if reviewer_id == operator.id {
            return Err(EngineError::Conflict(
                "the reviewer must be a different staff member than the operator".to_string(),
            ));
        }

        if let Some(ref roster) = self.roster {
            let reviewer = roster
                .get(reviewer_id)
                .ok_or_else(|| EngineError::validation(format!("unknown reviewer {reviewer_id}")))?;
            if reviewer.role < self.config.min_reviewer_role {
                return Err(EngineError::validation(format!(
                    "reviewer {} has role {}, reviews need {} or above",
                    reviewer.id, reviewer.role, self.config.min_reviewer_role
                )));
            }
        }

        if let Some(target) = request.existing_target() {
            if let Some(pending) = self.ledger.pending_for_target(&target) {
                return Err(EngineError::Conflict(format!(
                    "{target} already has pending entry {} awaiting review",
                    pending.id
                )));
            }
        }

        Ok(())
    }

    fn commit_now(
        &self,
        operator: &StaffIdentity,
        action: ActionType,
        plan: Plan,
    ) -> EngineResult<ActionOutcome> {
        let audit_log_id = self.ledger.append(plan.entry(operator, action))?;

        let commit = |command: &StagedCommand| {
            command.commit(self.repo.as_ref()).map_err(|source| {
                error!(
                    audit_log_id = %audit_log_id,
                    target = %command.target,
                    error = %source,
                    "store commit failed after the audit entry was written"
                );
                EngineError::Commit {
                    audit_log_id: audit_log_id.clone(),
                    source,
                }
            })
        };

        // Follow-ups first: the primary record may point at them
        for command in &plan.follow_ups {
            commit(command)?;
        }
        let committed = match &plan.change {
            Some(command) => Some(commit(command)?.data),
            None => None,
        };

        info!(
            audit_log_id = %audit_log_id,
            operator = %operator.id,
            action = %action,
            target = %plan.target,
            "action committed"
        );

        Ok(ActionOutcome {
            audit_log_id,
            action,
            review_status: ReviewStatus::None,
            committed,
            result: plan.result,
            claim_id: plan.claim_id,
            surrender_id: plan.surrender_id,
            message: completion_message(action).to_string(),
        })
    }

    fn stage(
        &self,
        operator: &StaffIdentity,
        action: ActionType,
        plan: Plan,
        reviewer_id: String,
    ) -> EngineResult<ActionOutcome> {
        let entry = plan.entry(operator, action).staged_for(reviewer_id.clone());
        let audit_log_id = self.ledger.append_staged(entry)?;

        info!(
            audit_log_id = %audit_log_id,
            operator = %operator.id,
            reviewer = %reviewer_id,
            action = %action,
            target = %plan.target,
            "action staged for review"
        );

        Ok(ActionOutcome {
            audit_log_id,
            action,
            review_status: ReviewStatus::Pending,
            committed: None,
            result: None,
            claim_id: None,
            surrender_id: plan.surrender_id,
            message: format!("已提交复核，等待 {reviewer_id} 确认"),
        })
    }

    fn read(&self, target: &TargetRef) -> EngineResult<VersionedRecord> {
        self.repo
            .get(target)?
            .ok_or_else(|| EngineError::NotFound(target.to_string()))
    }

    /// Read the target and compute the intended result
    fn plan(&self, operator: &StaffIdentity, request: ActionRequest) -> EngineResult<Plan> {
        let now = Utc::now().to_rfc3339();

        match request {
            ActionRequest::ResendAuthCode {
                proposal_id,
                mobile,
            } => {
                let target = TargetRef::proposal(proposal_id);
                let record = self.read(&target)?;
                if let Some(stored) = record.str_field("mobile") {
                    if stored != mobile {
                        return Err(EngineError::validation(
                            "mobile does not match the number on the proposal",
                        ));
                    }
                }

                let count = record
                    .field("authCodeResendCount")
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
                    + 1;
                let after = with_fields(
                    &record.data,
                    [
                        ("authCodeResentAt", json!(now)),
                        ("authCodeResendCount", json!(count)),
                    ],
                );
                let reason = format!("重新发送验证码至尾号{}的手机", &mobile[mobile.len() - 4..]);
                Ok(Plan::new(target, Some(record.data), reason).updating(after))
            }

            ActionRequest::QueryUnderwriting { proposal_id } => {
                let target = TargetRef::proposal(proposal_id.clone());
                let record = self.read(&target)?;
                let result = json!({
                    "proposalId": proposal_id,
                    "underwritingStatus": record.field("underwritingStatus").cloned().unwrap_or(Value::Null),
                    "underwritingNote": record.field("underwritingNote").cloned().unwrap_or(Value::Null),
                });

                let mut plan = Plan::new(target, Some(record.data), "查询投保单核保状态");
                plan.result = Some(result);
                Ok(plan)
            }

            ActionRequest::CompleteAuthentication {
                proposal_id,
                verification_method,
                reason,
            } => {
                let target = TargetRef::proposal(proposal_id);
                let record = self.read(&target)?;
                if record.str_field("authStatus") == Some("VERIFIED") {
                    return Err(EngineError::validation(format!(
                        "{target} is already authenticated"
                    )));
                }

                let after = with_fields(
                    &record.data,
                    [
                        ("authStatus", json!("VERIFIED")),
                        ("authMethod", json!(verification_method.to_string())),
                        ("authCompletedBy", json!(operator.id)),
                        ("authCompletedAt", json!(now)),
                    ],
                );
                let mut plan = Plan::new(target, Some(record.data), reason).updating(after);
                plan.verification = Some(verification_method);
                Ok(plan)
            }

            ActionRequest::UploadMaterial {
                proposal_id,
                material_type,
                note,
            } => {
                let target = TargetRef::proposal(proposal_id);
                let record = self.read(&target)?;

                let mut materials = record
                    .field("materials")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                materials.push(json!({
                    "materialType": material_type,
                    "note": note,
                    "uploadedBy": operator.id,
                    "uploadedAt": now,
                }));
                let after = with_fields(&record.data, [("materials", Value::Array(materials))]);

                let reason = match note {
                    Some(ref note) if note.trim().chars().count() >= self.config.min_reason_chars => {
                        note.trim().to_string()
                    }
                    _ => format!("代客户上传{}材料，操作人{}", material_type, operator.id),
                };
                Ok(Plan::new(target, Some(record.data), reason).updating(after))
            }

            ActionRequest::CorrectData {
                target,
                field_name,
                old_value,
                new_value,
                reason,
            } => {
                if PROTECTED_FIELDS.contains(&field_name.as_str())
                    || field_name == id_field(target.target_type)
                {
                    return Err(EngineError::validation(format!(
                        "field '{field_name}' cannot be changed by a data correction"
                    )));
                }

                let record = self.read(&target)?;
                let current = record.field(&field_name).cloned().unwrap_or(Value::Null);
                if let Some(old_value) = old_value {
                    if old_value != current {
                        return Err(EngineError::Conflict(format!(
                            "{field_name} on {target} is {current}, not {old_value}"
                        )));
                    }
                }
                if new_value == current {
                    return Err(EngineError::validation(format!(
                        "{field_name} already holds {current}"
                    )));
                }

                let after = with_fields(&record.data, [(field_name.as_str(), new_value)]);
                ensure_well_formed(&target, &after)?;
                Ok(Plan::new(target, Some(record.data), reason).updating(after))
            }

            ActionRequest::SubmitClaim {
                policy_id,
                claim_type,
                claim_amount,
                description,
                authorization_type,
                authorization_note,
            } => {
                desk::require_active_policy(self.repo.as_ref(), &policy_id)?;

                let draft = ClaimDraft {
                    policy_no: policy_id,
                    claim_type,
                    description,
                    claim_amount,
                };
                let note = format!("代客户报案（{}）", authorization_type);
                let (claim, process) = desk::file_claim(draft, &operator.id, Some(note))?;

                let claim_target = TargetRef::claim(claim.claim_id.clone());
                let process_target = TargetRef::claim_process(process.process_id.clone());
                let claim_data = to_data(&claim)?;
                let process_data = to_data(&process)?;

                let mut plan = Plan::new(claim_target.clone(), None, authorization_note);
                plan.change = Some(StagedCommand::new(claim_target, None, claim_data));
                plan.follow_ups
                    .push(StagedCommand::new(process_target, None, process_data));
                plan.claim_id = Some(claim.claim_id);
                Ok(plan)
            }

            ActionRequest::SubstitutePayment {
                proposal_id,
                amount,
                payment_method,
                evidence_url,
                reason,
                ..
            } => {
                let target = TargetRef::proposal(proposal_id);
                let record = self.read(&target)?;
                if record.str_field("paymentStatus") == Some("PAID") {
                    return Err(EngineError::validation(format!("{target} is already paid")));
                }

                let after = with_fields(
                    &record.data,
                    [
                        ("paymentStatus", json!("PAID")),
                        ("paidAmount", json!(amount.to_string())),
                        ("paymentMethod", json!(payment_method)),
                        ("paidBy", json!(operator.id)),
                    ],
                );
                let mut plan = Plan::new(target, Some(record.data), reason).updating(after);
                plan.evidence_url = Some(evidence_url);
                Ok(plan)
            }

            ActionRequest::SubstituteSurrender {
                policy_id,
                surrender_reason,
                refund_amount,
                evidence_url,
                reason,
                ..
            } => {
                let record = desk::require_active_policy(self.repo.as_ref(), &policy_id)?;
                let target = TargetRef::policy(policy_id);
                let surrender_id = desk::new_id("SUR");

                let after = with_fields(
                    &record.data,
                    [
                        ("status", json!("SURRENDERED")),
                        ("surrenderId", json!(surrender_id)),
                        ("surrenderReason", json!(surrender_reason.to_string())),
                        (
                            "refundAmount",
                            refund_amount.map_or(Value::Null, |a| json!(a.to_string())),
                        ),
                        ("surrenderedBy", json!(operator.id)),
                    ],
                );
                let mut plan = Plan::new(target, Some(record.data), reason).updating(after);
                plan.evidence_url = Some(evidence_url);
                plan.surrender_id = Some(surrender_id);
                Ok(plan)
            }
        }
    }
}

/// Copy of `data` with the given fields set
fn with_fields<'a, const N: usize>(data: &Value, fields: [(&'a str, Value); N]) -> Value {
    let mut object = data.as_object().cloned().unwrap_or_default();
    for (key, value) in fields {
        object.insert(key.to_string(), value);
    }
    Value::Object(object)
}

fn to_data<T: serde::Serialize>(value: &T) -> EngineResult<Value> {
    serde_json::to_value(value).map_err(|e| EngineError::Internal(e.to_string()))
}

/// Identifier field of each record type
fn id_field(target_type: TargetType) -> &'static str {
    match target_type {
        TargetType::Proposal => "proposalId",
        TargetType::Policy => "policyNo",
        TargetType::Customer => "customerId",
        TargetType::Claim => "claimId",
        TargetType::ClaimProcess => "processId",
    }
}

/// Claims and processes must still parse after a correction
fn ensure_well_formed(target: &TargetRef, data: &Value) -> EngineResult<()> {
    let parsed = match target.target_type {
        TargetType::Claim => serde_json::from_value::<Claim>(data.clone()).map(|_| ()),
        TargetType::ClaimProcess => serde_json::from_value::<ClaimProcess>(data.clone()).map(|_| ()),
        _ => Ok(()),
    };
    parsed.map_err(|e| EngineError::validation(format!("correction would corrupt {target}: {e}")))
}

fn completion_message(action: ActionType) -> &'static str {
    match action {
        ActionType::ResendAuthCode => "验证码已重新发送",
        ActionType::QueryUnderwriting => "核保状态查询完成",
        ActionType::CompleteAuthentication => "已代客户完成身份验证",
        ActionType::UploadMaterialOnBehalf => "已代客户上传材料",
        ActionType::CorrectData => "数据已更正",
        ActionType::SubmitClaimOnBehalf => "已代客户提交理赔申请",
        ActionType::SubstitutePayment | ActionType::SubstituteSurrender => "操作已执行",
    }
}
