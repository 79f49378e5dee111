//! Claim processing lifecycle (insurer side)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::{TransitionError, TransitionResult};
use crate::machine::StateMachine;
use crate::timeline::TimelineEntry;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimProcessState {
    PendingReview,
    MaterialsRequired,
    UnderInvestigation,
    PendingApproval,
    Approved,
    Rejected,
    Paid,
}

impl StateMachine for ClaimProcessState {
    const NAME: &'static str = "ClaimProcess";

    fn transitions(&self) -> &'static [(&'static str, Self)] {
        use ClaimProcessState::*;
        match self {
            PendingReview => &[
                ("request_materials", MaterialsRequired),
                ("start_investigation", UnderInvestigation),
                ("submit_for_approval", PendingApproval),
                ("reject", Rejected),
            ],
            MaterialsRequired => &[("materials_received", PendingReview), ("reject", Rejected)],
            UnderInvestigation => &[
                ("submit_for_approval", PendingApproval),
                ("request_materials", MaterialsRequired),
                ("reject", Rejected),
            ],
            PendingApproval => &[("approve", Approved), ("reject", Rejected)],
            Approved => &[("pay", Paid)],
            Rejected => &[],
            Paid => &[],
        }
    }
}

impl ClaimProcessState {
    /// Customer-facing status line
    pub fn description(&self) -> &'static str {
        match self {
            ClaimProcessState::PendingReview => "理赔申请已受理，等待审核",
            ClaimProcessState::MaterialsRequired => "审核需要补充材料",
            ClaimProcessState::UnderInvestigation => "理赔案件调查中",
            ClaimProcessState::PendingApproval => "审核完成，等待审批",
            ClaimProcessState::Approved => "理赔已批准，等待赔付",
            ClaimProcessState::Rejected => "理赔申请未通过",
            ClaimProcessState::Paid => "赔款已支付",
        }
    }

    /// What the customer should do (or expect) next
    pub fn hint(&self) -> &'static str {
        match self {
            ClaimProcessState::PendingReview => "预计1-3个工作日内完成初审，请保持电话畅通",
            ClaimProcessState::MaterialsRequired => "请按清单补充上传所需材料",
            ClaimProcessState::UnderInvestigation => "调查人员可能与您联系核实情况",
            ClaimProcessState::PendingApproval => "审批通常在2个工作日内完成",
            ClaimProcessState::Approved => "赔款将转入您指定的账户",
            ClaimProcessState::Rejected => "如有异议，可联系客服申请复核",
            ClaimProcessState::Paid => "请查收赔款，感谢您的耐心等待",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimProcess {
    pub process_id: String,
    pub claim_id: String,
    pub state: ClaimProcessState,
    /// Outstanding materials while in MATERIALS_REQUIRED
    #[serde(default)]
    pub required_materials: Vec<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry<ClaimProcessState>>,
    pub created_at: DateTime<Utc>,
}

impl ClaimProcess {
    /// A new process in PENDING_REVIEW
    pub fn open(process_id: impl Into<String>, claim_id: impl Into<String>, actor: &str) -> Self {
        Self {
            process_id: process_id.into(),
            claim_id: claim_id.into(),
            state: ClaimProcessState::PendingReview,
            required_materials: Vec::new(),
            timeline: vec![TimelineEntry::new(
                None,
                ClaimProcessState::PendingReview,
                "open",
                actor,
                None,
            )],
            created_at: Utc::now(),
        }
    }

    /// Move to `to` via `action`.
    ///
    /// Entering MATERIALS_REQUIRED needs a non-empty material list; leaving
    /// it clears the list.
    pub fn advance(
        &mut self,
        to: ClaimProcessState,
        action: &str,
        actor: &str,
        note: Option<String>,
        required_materials: Vec<String>,
    ) -> TransitionResult<()> {
        self.state.check(to, action)?;

        if to == ClaimProcessState::MaterialsRequired {
            if required_materials.is_empty() {
                return Err(TransitionError::MissingMaterials);
            }
            self.required_materials = required_materials;
        } else {
            self.required_materials.clear();
        }

        self.timeline
            .push(TimelineEntry::new(Some(self.state), to, action, actor, note));
        self.state = to;
        Ok(())
    }

    pub fn description(&self) -> &'static str {
        self.state.description()
    }

    pub fn hint(&self) -> &'static str {
        self.state.hint()
    }
}
