//! Error types for the engine.

use carewatch_types::InvariantViolation;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Mutators that return `NotFound` variants leave the state untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("facility not found: {0}")]
    FacilityNotFound(String),

    #[error("patient not found: {0}")]
    PatientNotFound(String),

    #[error("no active facility")]
    NoActiveFacility,

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Check if this is one of the "unknown id" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EngineError::FacilityNotFound(_)
                | EngineError::PatientNotFound(_)
                | EngineError::NoActiveFacility
        )
    }
}
