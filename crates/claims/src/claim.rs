//! Customer claim lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
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
pub enum ClaimState {
    Draft,
    ReadyToSubmit,
    Submitted,
    UnderReview,
    NeedsMoreInfo,
    Accepted,
    Rejected,
    Closed,
}

impl StateMachine for ClaimState {
    const NAME: &'static str = "Claim";

    fn transitions(&self) -> &'static [(&'static str, Self)] {
        use ClaimState::*;
        match self {
            Draft => &[("mark_ready", ReadyToSubmit), ("close", Closed)],
            ReadyToSubmit => &[("edit", Draft), ("submit", Submitted), ("close", Closed)],
            Submitted => &[("start_review", UnderReview), ("close", Closed)],
            UnderReview => &[
                ("request_info", NeedsMoreInfo),
                ("accept", Accepted),
                ("reject", Rejected),
            ],
            NeedsMoreInfo => &[("resubmit", UnderReview), ("close", Closed)],
            Accepted => &[("close", Closed)],
            Rejected => &[("close", Closed)],
            Closed => &[],
        }
    }
}

impl ClaimState {
    /// States in which the customer (or staff) may still add documents
    pub fn accepts_attachments(&self) -> bool {
        matches!(
            self,
            ClaimState::Draft | ClaimState::ReadyToSubmit | ClaimState::NeedsMoreInfo
        )
    }
}

/// A document attached to a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub material_type: String,
    pub note: Option<String>,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub claim_id: String,
    pub policy_no: String,
    pub claim_type: String,
    pub description: String,
    #[serde(default)]
    pub claim_amount: Option<Decimal>,
    pub state: ClaimState,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry<ClaimState>>,
    /// Downstream processing record, once the claim was submitted
    #[serde(default)]
    pub process_id: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Claim {
    /// A new claim in DRAFT
    pub fn draft(
        claim_id: impl Into<String>,
        policy_no: impl Into<String>,
        claim_type: impl Into<String>,
        description: impl Into<String>,
        claim_amount: Option<Decimal>,
        actor: &str,
    ) -> Self {
        Self {
            claim_id: claim_id.into(),
            policy_no: policy_no.into(),
            claim_type: claim_type.into(),
            description: description.into(),
            claim_amount,
            state: ClaimState::Draft,
            attachments: Vec::new(),
            timeline: vec![TimelineEntry::new(
                None,
                ClaimState::Draft,
                "create_draft",
                actor,
                None,
            )],
            process_id: None,
            created_by: actor.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Move to `to` via `action`, recording the step on the timeline
    pub fn transition(
        &mut self,
        to: ClaimState,
        action: &str,
        actor: &str,
        note: Option<String>,
    ) -> TransitionResult<()> {
        self.state.check(to, action)?;
        self.timeline
            .push(TimelineEntry::new(Some(self.state), to, action, actor, note));
        self.state = to;
        Ok(())
    }

    /// Run a named action, returning the new state
    pub fn perform(
        &mut self,
        action: &str,
        actor: &str,
        note: Option<String>,
    ) -> TransitionResult<ClaimState> {
        let to = self
            .state
            .target_of(action)
            .ok_or_else(|| TransitionError::ActionNotAllowed {
                action: action.to_string(),
                state: self.state.to_string(),
            })?;
        self.transition(to, action, actor, note)?;
        Ok(to)
    }

    pub fn attach(
        &mut self,
        material_type: impl Into<String>,
        note: Option<String>,
        actor: &str,
    ) -> TransitionResult<()> {
        if !self.state.accepts_attachments() {
            return Err(TransitionError::AttachmentNotAllowed(self.state.to_string()));
        }
        self.attachments.push(Attachment {
            material_type: material_type.into(),
            note,
            added_by: actor.to_string(),
            added_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::can_transition_named;
    use rust_decimal_macros::dec;
    use strum::IntoEnumIterator;
    use ClaimState::*;

    const TABLE: &[(ClaimState, ClaimState)] = &[
        (Draft, ReadyToSubmit),
        (Draft, Closed),
        (ReadyToSubmit, Draft),
        (ReadyToSubmit, Submitted),
        (ReadyToSubmit, Closed),
        (Submitted, UnderReview),
        (Submitted, Closed),
        (UnderReview, NeedsMoreInfo),
        (UnderReview, Accepted),
        (UnderReview, Rejected),
        (NeedsMoreInfo, UnderReview),
        (NeedsMoreInfo, Closed),
        (Accepted, Closed),
        (Rejected, Closed),
    ];

    #[test]
    fn test_transition_table_is_exact() {
        for from in ClaimState::iter() {
            for to in ClaimState::iter() {
                assert_eq!(
                    from.can_transition(to),
                    TABLE.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_only_closed_is_terminal() {
        let terminal: Vec<_> = ClaimState::iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(terminal, vec![Closed]);
    }

    #[test]
    fn test_named_lookup() {
        assert!(can_transition_named::<ClaimState>("DRAFT", "READY_TO_SUBMIT"));
        assert!(!can_transition_named::<ClaimState>("DRAFT", "SUBMITTED"));
        assert!(!can_transition_named::<ClaimState>("ARCHIVED", "CLOSED"));
        assert!(!can_transition_named::<ClaimState>("DRAFT", "ARCHIVED"));
    }

    #[test]
    fn test_draft_to_submitted() {
        let mut claim = Claim::draft("CLM-1", "6500001", "MEDICAL", "住院治疗费用报销申请", Some(dec!(3200)), "S001");

        claim.perform("mark_ready", "S001", None).unwrap();
        claim
            .transition(Submitted, "submit", "S001", Some("代客户提交".into()))
            .unwrap();

        assert_eq!(claim.state, Submitted);
        let steps: Vec<_> = claim.timeline.iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            steps,
            vec![
                (None, Draft),
                (Some(Draft), ReadyToSubmit),
                (Some(ReadyToSubmit), Submitted)
            ]
        );
    }

    #[test]
    fn test_invalid_transition_leaves_claim_untouched() {
        let mut claim = Claim::draft("CLM-1", "6500001", "MEDICAL", "住院治疗费用报销申请", None, "S001");

        let err = claim.transition(Submitted, "submit", "S001", None).unwrap_err();
        assert!(matches!(err, TransitionError::NotAllowed { .. }));

        let err = claim.transition(Closed, "mark_ready", "S001", None).unwrap_err();
        assert!(matches!(err, TransitionError::ActionNotAllowed { .. }));

        assert_eq!(claim.state, Draft);
        assert_eq!(claim.timeline.len(), 1);
    }

    #[test]
    fn test_closed_claim_rejects_everything() {
        let mut claim = Claim::draft("CLM-1", "6500001", "MEDICAL", "住院治疗费用报销申请", None, "S001");
        claim.perform("close", "S001", None).unwrap();

        assert!(matches!(
            claim.perform("mark_ready", "S001", None),
            Err(TransitionError::ActionNotAllowed { .. })
        ));
        assert!(matches!(
            claim.transition(Draft, "edit", "S001", None),
            Err(TransitionError::Terminal(_))
        ));
        assert!(matches!(
            claim.attach("INVOICE", None, "S001"),
            Err(TransitionError::AttachmentNotAllowed(_))
        ));
    }

    #[test]
    fn test_claim_serializes_state_names() {
        let claim = Claim::draft("CLM-1", "6500001", "MEDICAL", "住院治疗费用报销申请", Some(dec!(3200.50)), "S001");
        let json = serde_json::to_value(&claim).unwrap();

        assert_eq!(json["state"], "DRAFT");
        assert_eq!(json["policyNo"], "6500001");
        assert_eq!(json["claimAmount"], "3200.50");
        assert_eq!(json["timeline"][0]["to"], "DRAFT");

        let back: Claim = serde_json::from_value(json).unwrap();
        assert_eq!(back, claim);
    }
}
