//! Action catalogue

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::role::{PowerTier, Role};
use crate::target::TargetType;

/// Every action a staff member may invoke through the engine
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
pub enum ActionType {
    /// Re-send the customer's authentication code (CS)
    ResendAuthCode,
    /// Look up a proposal's underwriting status (CS)
    QueryUnderwriting,
    /// Complete identity verification for the customer (GUARANTEE)
    CompleteAuthentication,
    /// Upload a material document for the customer (GUARANTEE)
    UploadMaterialOnBehalf,
    /// Fix erroneous data on a record (CORRECTION)
    CorrectData,
    /// File a claim on the customer's behalf (GUARANTEE, L2)
    SubmitClaimOnBehalf,
    /// Pay a premium as the customer (SUBSTITUTION)
    SubstitutePayment,
    /// Surrender a policy as the customer (SUBSTITUTION)
    SubstituteSurrender,
}

impl ActionType {
    /// Power tier of the action; operational CS actions carry none
    pub fn required_tier(&self) -> Option<PowerTier> {
        match self {
            ActionType::ResendAuthCode | ActionType::QueryUnderwriting => None,
            ActionType::CorrectData => Some(PowerTier::Correction),
            ActionType::CompleteAuthentication
            | ActionType::UploadMaterialOnBehalf
            | ActionType::SubmitClaimOnBehalf => Some(PowerTier::Guarantee),
            ActionType::SubstitutePayment | ActionType::SubstituteSurrender => {
                Some(PowerTier::Substitution)
            }
        }
    }

    /// Lowest role allowed to invoke this action.
    ///
    /// Never below the floor of the action's tier.
    pub fn minimum_role(&self) -> Role {
        match self {
            ActionType::ResendAuthCode | ActionType::QueryUnderwriting => Role::Cs,
            ActionType::CompleteAuthentication
            | ActionType::UploadMaterialOnBehalf
            | ActionType::CorrectData => Role::L1,
            ActionType::SubmitClaimOnBehalf => Role::L2,
            ActionType::SubstitutePayment | ActionType::SubstituteSurrender => Role::L3,
        }
    }

    /// Whether the action is staged for a second reviewer
    pub fn requires_dual_review(&self) -> bool {
        self.required_tier()
            .map(|tier| tier.requires_dual_review())
            .unwrap_or(false)
    }

    /// Whether the request carries a free-text justification that is
    /// subject to the minimum reason length
    pub fn requires_reason(&self) -> bool {
        !matches!(
            self,
            ActionType::ResendAuthCode | ActionType::QueryUnderwriting
        )
    }

    /// Kind of record the action operates on, when fixed by the action
    pub fn default_target_type(&self) -> Option<TargetType> {
        match self {
            ActionType::ResendAuthCode
            | ActionType::QueryUnderwriting
            | ActionType::CompleteAuthentication
            | ActionType::UploadMaterialOnBehalf
            | ActionType::SubstitutePayment => Some(TargetType::Proposal),
            ActionType::SubmitClaimOnBehalf => Some(TargetType::Claim),
            ActionType::SubstituteSurrender => Some(TargetType::Policy),
            ActionType::CorrectData => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_action_minimum_never_below_tier_floor() {
        for action in ActionType::iter() {
            if let Some(tier) = action.required_tier() {
                assert!(
                    action.minimum_role() >= tier.minimum_role(),
                    "{action} is below its tier floor"
                );
            }
        }
    }

    #[test]
    fn test_only_substitution_actions_need_review() {
        let staged: Vec<_> = ActionType::iter()
            .filter(|a| a.requires_dual_review())
            .collect();
        assert_eq!(
            staged,
            vec![ActionType::SubstitutePayment, ActionType::SubstituteSurrender]
        );
    }

    #[test]
    fn test_parse_action_names() {
        assert_eq!(
            ActionType::from_str("SubstitutePayment").unwrap(),
            ActionType::SubstitutePayment
        );
        assert!(ActionType::from_str("DeletePolicy").is_err());
        assert_eq!(ActionType::CorrectData.to_string(), "CorrectData");
    }
}
