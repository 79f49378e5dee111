//! Closed enumerations validated at the request boundary

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

/// How the operator verified the customer's identity
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum VerificationMethod {
    Phone,
    Video,
    InPerson,
}

/// Review state of an audit entry.
///
/// `None` and `Pending` are the only non-terminal values; an entry that
/// reaches `Approved` or `Rejected` never changes again.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum ReviewStatus {
    /// Committed immediately, no review involved
    None,
    /// Staged, awaiting the nominated reviewer
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewStatus::Approved | ReviewStatus::Rejected)
    }

    /// Whether an entry in this status may move to `next`
    pub fn can_transition_to(&self, next: ReviewStatus) -> bool {
        matches!(
            (self, next),
            (ReviewStatus::Pending, ReviewStatus::Approved)
                | (ReviewStatus::Pending, ReviewStatus::Rejected)
        )
    }

    /// Whether a second staff member is part of the entry
    pub fn involves_review(&self) -> bool {
        !matches!(self, ReviewStatus::None)
    }
}

/// Coded reason for surrendering a policy
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SurrenderReason {
    CustomerRequest,
    FinancialHardship,
    ProductDissatisfaction,
    Relocation,
    Other,
}

/// Evidence the customer gave for a claim filed on their behalf
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AuthorizationType {
    /// Recorded phone consent
    PhoneRecording,
    /// Signed written consent
    Written,
    /// Legal power of attorney
    PowerOfAttorney,
}
