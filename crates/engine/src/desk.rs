//! Claim desk - claim and claim-process operations over the target store
//!
//! Every mutation is role-checked, goes through the state machine, lands on
//! the timeline and leaves one audit entry before it is written with
//! `put_if_version`, so two desks racing on one claim cannot both win.
//!
//! Claim-side steps run under the authority of the action they perform for
//! the customer: drafting, readying and submitting under
//! `SubmitClaimOnBehalf`, attaching documents under `UploadMaterialOnBehalf`.
//! Moving a processing record needs `SubmitClaimOnBehalf` and at least
//! `EngineConfig::min_process_role`.

use onbehalf_audit::{AuditLedger, AuditLogEntry};
use onbehalf_claims::{Claim, ClaimProcess, ClaimProcessState, ClaimState, TransitionResult};
use onbehalf_core::{ActionType, RoleAuthority, StaffIdentity, TargetRef};
use onbehalf_store::{TargetRepository, VersionedRecord};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::validation;

/// Input for a new claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDraft {
    pub policy_no: String,
    pub claim_type: String,
    pub description: String,
    #[serde(default)]
    pub claim_amount: Option<Decimal>,
}

impl ClaimDraft {
    pub fn validate(&self, config: &EngineConfig) -> EngineResult<()> {
        validation::policy_number(&self.policy_no)?;
        validation::required("claimType", &self.claim_type)?;
        validation::min_chars(
            "description",
            &self.description,
            config.min_claim_description_chars,
        )?;
        if let Some(amount) = self.claim_amount {
            validation::positive_amount("claimAmount", amount)?;
        }
        Ok(())
    }
}

/// One record write, already audited
struct RecordWrite {
    target: TargetRef,
    expected: Option<u64>,
    data: Value,
}

pub struct ClaimDesk {
    ledger: Arc<AuditLedger>,
    repo: Arc<dyn TargetRepository>,
    config: EngineConfig,
}

impl ClaimDesk {
    pub fn new(
        ledger: Arc<AuditLedger>,
        repo: Arc<dyn TargetRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ledger,
            repo,
            config,
        }
    }

    /// Open a DRAFT claim against an active policy
    pub fn create_draft(&self, actor: &StaffIdentity, draft: ClaimDraft) -> EngineResult<Claim> {
        draft.validate(&self.config)?;
        authorize(actor, ActionType::SubmitClaimOnBehalf)?;
        require_active_policy(self.repo.as_ref(), &draft.policy_no)?;

        let claim = Claim::draft(
            new_id("CLM"),
            draft.policy_no,
            draft.claim_type,
            draft.description,
            draft.claim_amount,
            &actor.id,
        );
        let target = TargetRef::claim(claim.claim_id.clone());
        let reason = format!("代客户创建理赔草稿，保单{}", claim.policy_no);

        let write = RecordWrite {
            target,
            expected: None,
            data: to_data(&claim)?,
        };
        self.record(actor, ActionType::SubmitClaimOnBehalf, reason, None, vec![write])?;

        info!(claim_id = %claim.claim_id, actor = %actor.id, "claim draft created");
        Ok(claim)
    }

    pub fn mark_ready(&self, claim_id: &str, actor: &StaffIdentity) -> EngineResult<Claim> {
        authorize(actor, ActionType::SubmitClaimOnBehalf)?;
        let reason = format!("理赔申请{claim_id}资料齐备，标记为待提交");
        self.update_claim(claim_id, actor, ActionType::SubmitClaimOnBehalf, reason, |claim| {
            claim.transition(ClaimState::ReadyToSubmit, "mark_ready", &actor.id, None)
        })
    }

    /// Submit a READY_TO_SUBMIT claim and open its processing record.
    ///
    /// The processing record is written first, so a stored claim never
    /// points at a process that does not exist.
    pub fn submit(
        &self,
        claim_id: &str,
        actor: &StaffIdentity,
    ) -> EngineResult<(Claim, ClaimProcess)> {
        authorize(actor, ActionType::SubmitClaimOnBehalf)?;

        let target = TargetRef::claim(claim_id);
        let (before, version) = self.read(&target)?;
        let mut claim: Claim = from_data(&target, &before)?;

        let process_id = new_id("CP");
        claim.transition(ClaimState::Submitted, "submit", &actor.id, None)?;
        claim.process_id = Some(process_id.clone());
        let process = ClaimProcess::open(process_id, claim_id, &actor.id);

        let writes = vec![
            RecordWrite {
                target: TargetRef::claim_process(process.process_id.clone()),
                expected: None,
                data: to_data(&process)?,
            },
            RecordWrite {
                target,
                expected: Some(version),
                data: to_data(&claim)?,
            },
        ];
        let reason = format!("代客户提交理赔申请{claim_id}");
        self.record(actor, ActionType::SubmitClaimOnBehalf, reason, Some(before), writes)?;

        info!(claim_id, process_id = %process.process_id, "claim submitted");
        Ok((claim, process))
    }

    pub fn attach_material(
        &self,
        claim_id: &str,
        material_type: &str,
        note: Option<String>,
        actor: &StaffIdentity,
    ) -> EngineResult<Claim> {
        validation::required("materialType", material_type)?;
        authorize(actor, ActionType::UploadMaterialOnBehalf)?;
        let reason = format!("代客户为理赔申请{claim_id}上传{material_type}材料");
        self.update_claim(claim_id, actor, ActionType::UploadMaterialOnBehalf, reason, |claim| {
            claim.attach(material_type, note, &actor.id)
        })
    }

    /// Move a processing record along its state machine
    pub fn advance_process(
        &self,
        process_id: &str,
        to: ClaimProcessState,
        action: &str,
        actor: &StaffIdentity,
        note: Option<String>,
        required_materials: Vec<String>,
    ) -> EngineResult<ClaimProcess> {
        authorize(actor, ActionType::SubmitClaimOnBehalf)?;
        if actor.role < self.config.min_process_role {
            return Err(EngineError::authorization(format!(
                "role {} may not move claim processes (requires {} or above)",
                actor.role, self.config.min_process_role
            )));
        }

        let target = TargetRef::claim_process(process_id);
        let (before, version) = self.read(&target)?;
        let mut process: ClaimProcess = from_data(&target, &before)?;

        let from = process.state;
        process.advance(to, action, &actor.id, note, required_materials)?;

        let write = RecordWrite {
            target,
            expected: Some(version),
            data: to_data(&process)?,
        };
        let reason = format!("理赔流程{process_id}由{from}推进至{to}（{action}）");
        self.record(actor, ActionType::SubmitClaimOnBehalf, reason, Some(before), vec![write])?;

        info!(process_id, from = %from, to = %to, actor = %actor.id, "claim process advanced");
        Ok(process)
    }

    pub fn get_claim(&self, claim_id: &str) -> EngineResult<Claim> {
        let target = TargetRef::claim(claim_id);
        let (data, _) = self.read(&target)?;
        from_data(&target, &data)
    }

    pub fn get_process(&self, process_id: &str) -> EngineResult<ClaimProcess> {
        let target = TargetRef::claim_process(process_id);
        let (data, _) = self.read(&target)?;
        from_data(&target, &data)
    }

    fn update_claim<F>(
        &self,
        claim_id: &str,
        actor: &StaffIdentity,
        action: ActionType,
        reason: String,
        change: F,
    ) -> EngineResult<Claim>
    where
        F: FnOnce(&mut Claim) -> TransitionResult<()>,
    {
        let target = TargetRef::claim(claim_id);
        let (before, version) = self.read(&target)?;
        let mut claim: Claim = from_data(&target, &before)?;
        change(&mut claim)?;

        let write = RecordWrite {
            target,
            expected: Some(version),
            data: to_data(&claim)?,
        };
        self.record(actor, action, reason, Some(before), vec![write])?;
        Ok(claim)
    }

    fn read(&self, target: &TargetRef) -> EngineResult<(Value, u64)> {
        let record = self
            .repo
            .get(target)?
            .ok_or_else(|| EngineError::NotFound(target.to_string()))?;
        Ok((record.data, record.version))
    }

    /// Audit the change, then apply the writes in order.
    ///
    /// The entry describes the last write. A failed write after the entry
    /// is recorded surfaces as [`EngineError::Commit`].
    fn record(
        &self,
        actor: &StaffIdentity,
        action: ActionType,
        reason: String,
        before: Option<Value>,
        writes: Vec<RecordWrite>,
    ) -> EngineResult<String> {
        let primary = writes
            .last()
            .ok_or_else(|| EngineError::Internal("claim desk change without writes".into()))?;
        let entry = AuditLogEntry::new(&actor.id, actor.role, action, &primary.target, reason)
            .with_before(before)
            .with_after(Some(primary.data.clone()));
        let audit_log_id = self.ledger.append(entry)?;

        for write in writes {
            self.repo
                .put_if_version(&write.target, write.expected, write.data)
                .map_err(|source| {
                    error!(
                        audit_log_id = %audit_log_id,
                        target = %write.target,
                        error = %source,
                        "claim desk write failed after the audit entry was written"
                    );
                    EngineError::Commit {
                        audit_log_id: audit_log_id.clone(),
                        source,
                    }
                })?;
        }
        Ok(audit_log_id)
    }
}

/// Refuse actors whose role lacks `action`
fn authorize(actor: &StaffIdentity, action: ActionType) -> EngineResult<()> {
    if RoleAuthority::is_permitted(actor.role, action) {
        return Ok(());
    }
    warn!(actor = %actor.id, role = %actor.role, action = %action, "claim desk refused");
    Err(EngineError::authorization(format!(
        "role {} may not perform {} (requires {} or above)",
        actor.role,
        action,
        action.minimum_role()
    )))
}

/// Build a claim that walks DRAFT -> READY_TO_SUBMIT -> SUBMITTED in one go,
/// with the processing record it opens.
pub(crate) fn file_claim(
    draft: ClaimDraft,
    actor: &str,
    note: Option<String>,
) -> TransitionResult<(Claim, ClaimProcess)> {
    let mut claim = Claim::draft(
        new_id("CLM"),
        draft.policy_no,
        draft.claim_type,
        draft.description,
        draft.claim_amount,
        actor,
    );
    claim.transition(ClaimState::ReadyToSubmit, "mark_ready", actor, None)?;
    claim.transition(ClaimState::Submitted, "submit", actor, note)?;

    let process = ClaimProcess::open(new_id("CP"), claim.claim_id.clone(), actor);
    claim.process_id = Some(process.process_id.clone());
    Ok((claim, process))
}

/// A policy record that exists and is ACTIVE
pub(crate) fn require_active_policy(
    repo: &dyn TargetRepository,
    policy_no: &str,
) -> EngineResult<VersionedRecord> {
    let record = repo
        .get(&TargetRef::policy(policy_no))?
        .ok_or_else(|| EngineError::NotFound(format!("policy {policy_no}")))?;

    match record.str_field("status") {
        Some("ACTIVE") => Ok(record),
        status => Err(EngineError::validation(format!(
            "policy {policy_no} is {}, not ACTIVE",
            status.unwrap_or("missing a status")
        ))),
    }
}

/// `PREFIX-` followed by 12 upper-case hex digits
pub(crate) fn new_id(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix,
        uuid::Uuid::new_v4().simple().to_string()[..12].to_uppercase()
    )
}

fn from_data<T: DeserializeOwned>(target: &TargetRef, data: &Value) -> EngineResult<T> {
    serde_json::from_value(data.clone())
        .map_err(|e| EngineError::Internal(format!("record {target} is malformed: {e}")))
}

fn to_data<T: Serialize>(value: &T) -> EngineResult<Value> {
    serde_json::to_value(value).map_err(|e| EngineError::Internal(format!("cannot serialize: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FailingWrites;
    use onbehalf_audit::{AuditQuery, LedgerPolicy};
    use onbehalf_core::{ReviewStatus, Role, TargetType};
    use onbehalf_store::MemoryRepository;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn policies() -> MemoryRepository {
        let repo = MemoryRepository::new();
        repo.put_if_version(
            &TargetRef::policy("6500001"),
            None,
            json!({"policyNo": "6500001", "status": "ACTIVE"}),
        )
        .unwrap();
        repo.put_if_version(
            &TargetRef::policy("6600002"),
            None,
            json!({"policyNo": "6600002", "status": "LAPSED"}),
        )
        .unwrap();
        repo
    }

    fn setup() -> (Arc<AuditLedger>, Arc<MemoryRepository>, ClaimDesk) {
        let ledger = Arc::new(AuditLedger::in_memory(LedgerPolicy::default()));
        let repo = Arc::new(policies());
        let desk = ClaimDesk::new(ledger.clone(), repo.clone(), EngineConfig::default());
        (ledger, repo, desk)
    }

    fn desk() -> ClaimDesk {
        setup().2
    }

    fn staff() -> StaffIdentity {
        StaffIdentity::new("S010", "王芳", Role::L2)
    }

    fn adjuster() -> StaffIdentity {
        StaffIdentity::new("S100", "赵主管", Role::L3)
    }

    fn draft(policy_no: &str) -> ClaimDraft {
        ClaimDraft {
            policy_no: policy_no.into(),
            claim_type: "MEDICAL".into(),
            description: "客户因急性阑尾炎住院治疗五天，申请医疗费用报销".into(),
            claim_amount: Some(dec!(8600)),
        }
    }

    #[test]
    fn test_draft_ready_submit() {
        let (ledger, _, desk) = setup();
        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();
        assert!(claim.claim_id.starts_with("CLM-"));

        desk.mark_ready(&claim.claim_id, &staff()).unwrap();
        let (submitted, process) = desk.submit(&claim.claim_id, &staff()).unwrap();

        assert_eq!(submitted.state, ClaimState::Submitted);
        assert_eq!(submitted.process_id.as_deref(), Some(process.process_id.as_str()));
        assert_eq!(process.state, ClaimProcessState::PendingReview);

        let stored = desk.get_claim(&claim.claim_id).unwrap();
        assert_eq!(stored, submitted);
        assert_eq!(stored.timeline.len(), 3);
        assert_eq!(desk.get_process(&process.process_id).unwrap(), process);

        let entries = ledger.query(&AuditQuery::new(10).target(claim.claim_id.clone()));
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.action == ActionType::SubmitClaimOnBehalf
            && e.review_status == ReviewStatus::None
            && e.operator_id == "S010"));
        assert_eq!(entries[0].after_state.as_ref().unwrap()["state"], "SUBMITTED");
        assert_eq!(entries[0].before_state.as_ref().unwrap()["state"], "READY_TO_SUBMIT");
    }

    #[test]
    fn test_submit_requires_ready() {
        let (ledger, _, desk) = setup();
        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();

        let err = desk.submit(&claim.claim_id, &staff()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(desk.get_claim(&claim.claim_id).unwrap().state, ClaimState::Draft);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_draft_needs_active_policy() {
        let desk = desk();

        let err = desk.create_draft(&staff(), draft("6600002")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = desk.create_draft(&staff(), draft("6599999")).unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));

        let err = desk.create_draft(&staff(), draft("7700001")).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_junior_roles_cannot_file_claims() {
        let (ledger, repo, desk) = setup();

        for role in [Role::Cs, Role::L1] {
            let junior = StaffIdentity::new("S001", "李专员", role);
            let err = desk.create_draft(&junior, draft("6500001")).unwrap_err();
            assert!(matches!(err, EngineError::Authorization(_)), "{role}");
        }

        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();
        let cs = StaffIdentity::new("C001", "客服", Role::Cs);
        assert!(matches!(
            desk.mark_ready(&claim.claim_id, &cs),
            Err(EngineError::Authorization(_))
        ));
        assert!(matches!(
            desk.attach_material(&claim.claim_id, "INVOICE", None, &cs),
            Err(EngineError::Authorization(_))
        ));

        assert_eq!(repo.list(TargetType::Claim).unwrap().len(), 1);
        assert_eq!(desk.get_claim(&claim.claim_id).unwrap().state, ClaimState::Draft);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_attach_material() {
        let (ledger, _, desk) = setup();
        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();

        let l1 = StaffIdentity::new("S001", "李专员", Role::L1);
        let claim = desk
            .attach_material(&claim.claim_id, "INVOICE", Some("住院发票".into()), &l1)
            .unwrap();
        assert_eq!(claim.attachments.len(), 1);
        assert_eq!(claim.attachments[0].added_by, "S001");

        let entries = ledger.query(&AuditQuery::new(10).operator("S001"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActionType::UploadMaterialOnBehalf);
        assert_eq!(entries[0].target_id, claim.claim_id);
    }

    #[test]
    fn test_advance_process() {
        let (ledger, _, desk) = setup();
        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();
        desk.mark_ready(&claim.claim_id, &staff()).unwrap();
        let (_, process) = desk.submit(&claim.claim_id, &staff()).unwrap();

        let process = desk
            .advance_process(
                &process.process_id,
                ClaimProcessState::MaterialsRequired,
                "request_materials",
                &adjuster(),
                None,
                vec!["诊断证明".into()],
            )
            .unwrap();
        assert_eq!(process.required_materials, vec!["诊断证明".to_string()]);
        assert_eq!(
            ledger.query(&AuditQuery::new(10).target(process.process_id.clone())).len(),
            1
        );

        let err = desk
            .advance_process(
                &process.process_id,
                ClaimProcessState::Paid,
                "pay",
                &adjuster(),
                None,
                vec![],
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        assert!(matches!(
            desk.get_process("CP-MISSING"),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_process_moves_need_senior_role() {
        let (ledger, _, desk) = setup();
        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();
        desk.mark_ready(&claim.claim_id, &staff()).unwrap();
        let (_, process) = desk.submit(&claim.claim_id, &staff()).unwrap();
        let entries_before = ledger.len();

        for role in [Role::Cs, Role::L1, Role::L2] {
            let actor = StaffIdentity::new("S001", "李专员", role);
            let err = desk
                .advance_process(
                    &process.process_id,
                    ClaimProcessState::PendingApproval,
                    "submit_for_approval",
                    &actor,
                    None,
                    vec![],
                )
                .unwrap_err();
            assert!(matches!(err, EngineError::Authorization(_)), "{role}");
        }

        assert_eq!(
            desk.get_process(&process.process_id).unwrap().state,
            ClaimProcessState::PendingReview
        );
        assert_eq!(ledger.len(), entries_before);
    }

    #[test]
    fn test_failed_process_write_leaves_claim_unsubmitted() {
        let ledger = Arc::new(AuditLedger::in_memory(LedgerPolicy::default()));
        let repo = Arc::new(FailingWrites::new(policies(), TargetType::ClaimProcess));
        let desk = ClaimDesk::new(ledger.clone(), repo.clone(), EngineConfig::default());

        let claim = desk.create_draft(&staff(), draft("6500001")).unwrap();
        desk.mark_ready(&claim.claim_id, &staff()).unwrap();

        let err = desk.submit(&claim.claim_id, &staff()).unwrap_err();
        assert!(matches!(err, EngineError::Commit { .. }));

        let stored = desk.get_claim(&claim.claim_id).unwrap();
        assert_eq!(stored.state, ClaimState::ReadyToSubmit);
        assert!(stored.process_id.is_none());
        assert!(repo.list(TargetType::ClaimProcess).unwrap().is_empty());
        // The attempt itself stays on record
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_file_claim_walks_to_submitted() {
        let (claim, process) = file_claim(draft("6500001"), "S010", Some("代客户报案".into())).unwrap();

        assert_eq!(claim.state, ClaimState::Submitted);
        assert_eq!(claim.timeline.len(), 3);
        assert_eq!(process.claim_id, claim.claim_id);
    }
}
