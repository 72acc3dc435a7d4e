//! In-memory persistence port, primarily for tests.
//!
//! A single mutex guards all maps, so the existence check and the result
//! insert in `put_triage_result` are one atomic step — the same
//! exactly-one-write-wins guarantee the SQLite store gets from its
//! primary key.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::{StoreError, TriageStore};
use crate::models::{
    Encounter, EncounterStatus, FollowupResponse, ProtocolVersion, TriageResult,
};

#[derive(Default)]
struct Inner {
    encounters: HashMap<Uuid, Encounter>,
    followups: HashMap<Uuid, Vec<FollowupResponse>>,
    results: HashMap<Uuid, TriageResult>,
    protocols: Vec<ProtocolVersion>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn encounter_not_found(id: Uuid) -> StoreError {
    StoreError::NotFound {
        entity: "encounter".into(),
        id: id.to_string(),
    }
}

impl TriageStore for MemoryStore {
    fn insert_encounter(&self, encounter: &Encounter) -> Result<(), StoreError> {
        self.lock().encounters.insert(encounter.id, encounter.clone());
        Ok(())
    }

    fn get_encounter(&self, id: Uuid) -> Result<Encounter, StoreError> {
        self.lock()
            .encounters
            .get(&id)
            .cloned()
            .ok_or_else(|| encounter_not_found(id))
    }

    fn append_followups(&self, id: Uuid, pairs: &[FollowupResponse]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        let encounter = inner
            .encounters
            .get_mut(&id)
            .ok_or_else(|| encounter_not_found(id))?;
        if encounter.status == EncounterStatus::Created {
            encounter.status = EncounterStatus::InProgress;
        }
        inner
            .followups
            .entry(id)
            .or_default()
            .extend(pairs.iter().cloned());
        Ok(())
    }

    fn followups(&self, id: Uuid) -> Result<Vec<FollowupResponse>, StoreError> {
        Ok(self.lock().followups.get(&id).cloned().unwrap_or_default())
    }

    fn get_triage_result(&self, id: Uuid) -> Result<Option<TriageResult>, StoreError> {
        Ok(self.lock().results.get(&id).cloned())
    }

    fn put_triage_result(&self, id: Uuid, result: &TriageResult) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if !inner.encounters.contains_key(&id) {
            return Err(encounter_not_found(id));
        }
        if inner.results.contains_key(&id) {
            return Err(StoreError::AlreadyExists(id));
        }
        inner.results.insert(id, result.clone());
        if let Some(encounter) = inner.encounters.get_mut(&id) {
            encounter.status = EncounterStatus::Triaged;
        }
        Ok(())
    }

    fn active_protocol(&self) -> Result<Option<ProtocolVersion>, StoreError> {
        Ok(self.lock().protocols.iter().rev().find(|p| p.active).cloned())
    }

    fn publish_protocol(
        &self,
        description: &str,
        content: &str,
    ) -> Result<ProtocolVersion, StoreError> {
        let mut inner = self.lock();
        for protocol in inner.protocols.iter_mut() {
            protocol.active = false;
        }
        let version = ProtocolVersion {
            version: inner.protocols.len() as i64 + 1,
            description: description.to_string(),
            content: content.to_string(),
            active: true,
            published_at: Utc::now(),
        };
        inner.protocols.push(version.clone());
        Ok(version)
    }
}
