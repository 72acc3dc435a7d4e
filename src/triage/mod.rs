pub mod danger_signs;
pub mod orchestrator;
pub mod rules;

pub use orchestrator::TriageOrchestrator;

use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Errors a triage request can surface to its caller.
///
/// Backend/provider failures never appear here — they are recovered
/// inside the orchestrator by switching to the rule engine.
#[derive(Error, Debug)]
pub enum TriageError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Encounter {0} not found")]
    NotFound(Uuid),

    #[error("Encounter {0} already has a triage result")]
    AlreadyTriaged(Uuid),

    #[error("Persistence failure: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for TriageError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(id) => Self::AlreadyTriaged(id),
            other => Self::Persistence(other),
        }
    }
}
