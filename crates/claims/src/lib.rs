//! OnBehalf Claims
//!
//! Table-driven lifecycles of a customer's claim and of its downstream
//! processing. Each state lists the states it may move to and the action
//! names that may move it; every match is exhaustive so a new state cannot
//! be forgotten.
//!
//! ```text
//! Claim:    DRAFT -> READY_TO_SUBMIT -> SUBMITTED -> UNDER_REVIEW -> ACCEPTED/REJECTED -> CLOSED
//! Process:  PENDING_REVIEW -> [MATERIALS_REQUIRED | UNDER_INVESTIGATION] -> PENDING_APPROVAL -> APPROVED -> PAID
//! ```

pub mod claim;
pub mod error;
pub mod machine;
pub mod process;
pub mod timeline;

pub use claim::{Attachment, Claim, ClaimState};
pub use error::{TransitionError, TransitionResult};
pub use machine::{can_transition_named, StateMachine};
pub use process::{ClaimProcess, ClaimProcessState};
pub use timeline::TimelineEntry;
