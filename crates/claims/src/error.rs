//! State machine errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{machine} cannot move from {from} to {to}")]
    NotAllowed {
        machine: &'static str,
        from: String,
        to: String,
    },

    #[error("Action '{action}' is not allowed in state {state}")]
    ActionNotAllowed { action: String, state: String },

    #[error("{0} is terminal")]
    Terminal(String),

    #[error("Materials cannot be attached in state {0}")]
    AttachmentNotAllowed(String),

    #[error("Moving to MATERIALS_REQUIRED needs at least one required material")]
    MissingMaterials,
}

pub type TransitionResult<T> = Result<T, TransitionError>;
