//! Target records the engine acts upon

use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Kind of record held by the target state store
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum TargetType {
    Proposal,
    Policy,
    Customer,
    Claim,
    ClaimProcess,
}

/// Key of a single record: `TYPE:ID`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub target_type: TargetType,
    pub target_id: String,
}

impl TargetRef {
    pub fn new(target_type: TargetType, target_id: impl Into<String>) -> Self {
        Self {
            target_type,
            target_id: target_id.into(),
        }
    }

    pub fn proposal(id: impl Into<String>) -> Self {
        Self::new(TargetType::Proposal, id)
    }

    pub fn policy(id: impl Into<String>) -> Self {
        Self::new(TargetType::Policy, id)
    }

    pub fn claim(id: impl Into<String>) -> Self {
        Self::new(TargetType::Claim, id)
    }

    pub fn claim_process(id: impl Into<String>) -> Self {
        Self::new(TargetType::ClaimProcess, id)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_type, self.target_id)
    }
}
