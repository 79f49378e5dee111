//! Staff roles and power tiers
//!
//! Roles follow a total order used for every permission decision:
//! `CS < L1 < L2 < L3`
//!
//! Power tiers classify how consequential an action is. The tier fixes the
//! lowest role that may ever invoke it and whether a second staff member must
//! confirm it before it takes effect.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum_macros::{Display, EnumIter, EnumString};

/// Staff privilege level - ordered from lowest to highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    /// Baseline customer service
    #[serde(rename = "CS")]
    #[strum(serialize = "CS")]
    Cs = 0,
    /// First-line specialist
    L1 = 1,
    /// Senior specialist, may file claims and review
    L2 = 2,
    /// Supervisor, the only level allowed to move money or terminate a policy
    L3 = 3,
}

impl Role {
    /// Numeric level (CS = 0 .. L3 = 3)
    pub fn level(&self) -> u8 {
        *self as u8
    }

    /// True when this role is at least `other` in the privilege order
    pub fn at_least(&self, other: Role) -> bool {
        *self >= other
    }
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level().cmp(&other.level())
    }
}

/// Power tier of a privileged action
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum PowerTier {
    /// Fix erroneous data
    Correction,
    /// Act for a customer who cannot complete a step themselves
    Guarantee,
    /// Act as the customer for consequential outcomes (money, termination)
    Substitution,
}

impl PowerTier {
    /// Lowest role that may invoke any action of this tier
    pub fn minimum_role(&self) -> Role {
        match self {
            PowerTier::Correction => Role::L1,
            PowerTier::Guarantee => Role::L1,
            PowerTier::Substitution => Role::L3,
        }
    }

    /// Whether a second staff member must confirm before the effect applies
    pub fn requires_dual_review(&self) -> bool {
        matches!(self, PowerTier::Substitution)
    }
}
