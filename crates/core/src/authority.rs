//! Role authority - the fixed role -> permission mapping
//!
//! Pure queries, no side effects. Callers decide what a missing permission
//! means; this module never raises.

use std::collections::BTreeSet;

use crate::action::ActionType;
use crate::role::{PowerTier, Role};

/// Stateless permission oracle
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthority;

impl RoleAuthority {
    /// Actions a role may invoke. Each level inherits everything below it.
    pub fn permitted_actions(role: Role) -> BTreeSet<ActionType> {
        let mut actions = BTreeSet::new();

        actions.insert(ActionType::ResendAuthCode);
        actions.insert(ActionType::QueryUnderwriting);
        if role == Role::Cs {
            return actions;
        }

        actions.insert(ActionType::CompleteAuthentication);
        actions.insert(ActionType::UploadMaterialOnBehalf);
        actions.insert(ActionType::CorrectData);
        if role == Role::L1 {
            return actions;
        }

        actions.insert(ActionType::SubmitClaimOnBehalf);
        if role == Role::L2 {
            return actions;
        }

        actions.insert(ActionType::SubstitutePayment);
        actions.insert(ActionType::SubstituteSurrender);
        actions
    }

    /// Whether `role` may invoke `action`
    pub fn is_permitted(role: Role, action: ActionType) -> bool {
        Self::permitted_actions(role).contains(&action)
    }

    pub fn required_tier(action: ActionType) -> Option<PowerTier> {
        action.required_tier()
    }

    pub fn minimum_role(tier: PowerTier) -> Role {
        tier.minimum_role()
    }
}
