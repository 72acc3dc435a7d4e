pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{Encounter, FollowupResponse, ProtocolVersion, TriageResult};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Triage result already exists for encounter {0}")]
    AlreadyExists(Uuid),

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Opaque persistence port for the triage engine.
///
/// The engine reads encounters and follow-ups through it and writes exactly
/// one triage result per encounter. `put_triage_result` is the single source
/// of truth for the duplicate-triage guard: under concurrent attempts exactly
/// one write wins and every other caller observes `AlreadyExists`.
pub trait TriageStore: Send + Sync {
    fn insert_encounter(&self, encounter: &Encounter) -> Result<(), StoreError>;

    fn get_encounter(&self, id: Uuid) -> Result<Encounter, StoreError>;

    /// Append answered follow-up pairs in order. Recorded pairs are
    /// immutable; appending also moves a `created` encounter to
    /// `in_progress`.
    fn append_followups(&self, id: Uuid, pairs: &[FollowupResponse]) -> Result<(), StoreError>;

    fn followups(&self, id: Uuid) -> Result<Vec<FollowupResponse>, StoreError>;

    fn get_triage_result(&self, id: Uuid) -> Result<Option<TriageResult>, StoreError>;

    /// Persist the final decision and transition the encounter to
    /// `triaged`. Fails with `AlreadyExists` if a result is already
    /// present; never overwrites.
    fn put_triage_result(&self, id: Uuid, result: &TriageResult) -> Result<(), StoreError>;

    fn active_protocol(&self) -> Result<Option<ProtocolVersion>, StoreError>;

    /// Record a new guideline revision and mark it active, deactivating
    /// every prior revision in the same transaction.
    fn publish_protocol(
        &self,
        description: &str,
        content: &str,
    ) -> Result<ProtocolVersion, StoreError>;
}
