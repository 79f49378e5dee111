//! OnBehalf Engine
//!
//! Lets tiered support staff act on a customer's behalf:
//!
//! - [`PowerActionExecutor`]: validates, authorizes and runs one action,
//!   committing it at once or staging it for review
//! - [`ReviewQueue`]: a second staff member approves (commit) or rejects
//!   (discard) a staged action
//! - [`ClaimDesk`]: role-checked, audited claim and claim-process updates
//!
//! Every action that passes validation leaves exactly one audit entry.

pub mod config;
pub mod desk;
pub mod error;
pub mod executor;
pub mod request;
pub mod review;
pub mod staged;
#[cfg(test)]
mod testing;
pub mod validation;

pub use config::EngineConfig;
pub use desk::{ClaimDesk, ClaimDraft};
pub use error::{EngineError, EngineResult, ErrorKind};
pub use executor::PowerActionExecutor;
pub use request::{ActionOutcome, ActionRequest};
pub use review::{ReviewDecision, ReviewQueue};
pub use staged::StagedCommand;
