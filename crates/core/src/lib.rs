//! OnBehalf Core - Domain types
//!
//! This crate contains the vocabulary shared by every other crate:
//! - `Role`: staff privilege levels, totally ordered CS < L1 < L2 < L3
//! - `PowerTier`: CORRECTION, GUARANTEE, SUBSTITUTION
//! - `ActionType`: the closed catalogue of privileged actions
//! - `RoleAuthority`: the fixed role -> permitted actions mapping
//! - `StaffIdentity` / `StaffRoster`: who is acting

pub mod action;
pub mod authority;
pub mod error;
pub mod role;
pub mod staff;
pub mod target;
pub mod types;

pub use action::ActionType;
pub use authority::RoleAuthority;
pub use error::CoreError;
pub use role::{PowerTier, Role};
pub use staff::{StaffIdentity, StaffRoster};
pub use target::{TargetRef, TargetType};
pub use types::{AuthorizationType, ReviewStatus, SurrenderReason, VerificationMethod};
