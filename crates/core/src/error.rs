//! Core errors

use thiserror::Error;

/// Errors raised while loading core domain values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Duplicate staff id in roster: {0}")]
    DuplicateStaff(String),

    #[error("Invalid staff roster: {0}")]
    InvalidRoster(String),
}
