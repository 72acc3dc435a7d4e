//! Cached access to the active clinical protocol.
//!
//! Process-wide state with an explicit lifecycle: populated lazily on
//! first read, invalidated atomically when a new revision is published.
//! Readers observe either the old revision or the new one, never a
//! partially-updated value. Injected into the orchestrator as a
//! dependency, not reached through a global.

use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::models::{ProtocolVersion, DEFAULT_PROTOCOL};
use crate::store::{StoreError, TriageStore};

pub struct ProtocolProvider {
    store: Arc<dyn TriageStore>,
    cache: RwLock<Option<Arc<ProtocolVersion>>>,
}

impl ProtocolProvider {
    pub fn new(store: Arc<dyn TriageStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(None),
        }
    }

    /// The active protocol revision, from cache when warm. Falls back
    /// to the built-in baseline when no revision has been published.
    pub fn active_protocol(&self) -> Result<Arc<ProtocolVersion>, StoreError> {
        if let Some(cached) = self.read_cache() {
            return Ok(cached);
        }

        let version = Arc::new(match self.store.active_protocol()? {
            Some(version) => version,
            None => Self::builtin(),
        });

        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        // A concurrent reader may have populated it first; either value
        // is a complete revision, so first writer wins.
        let cached = guard.get_or_insert_with(|| Arc::clone(&version));
        Ok(Arc::clone(cached))
    }

    /// Publish a new revision and invalidate the cache in one step.
    pub fn publish(
        &self,
        description: &str,
        content: &str,
    ) -> Result<ProtocolVersion, StoreError> {
        let version = self.store.publish_protocol(description, content)?;
        self.invalidate();
        Ok(version)
    }

    pub fn invalidate(&self) {
        let mut guard = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    fn read_cache(&self) -> Option<Arc<ProtocolVersion>> {
        let guard = self.cache.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    /// Baseline revision compiled into the binary.
    pub fn builtin() -> ProtocolVersion {
        ProtocolVersion {
            version: 0,
            description: "built-in baseline guideline".into(),
            content: DEFAULT_PROTOCOL.into(),
            active: true,
            published_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use uuid::Uuid;

    use super::*;
    use crate::models::{Encounter, FollowupResponse, TriageResult};

    /// Store wrapper that counts protocol reads.
    struct CountingStore {
        reads: AtomicUsize,
        active: Mutex<Option<ProtocolVersion>>,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                reads: AtomicUsize::new(0),
                active: Mutex::new(None),
            }
        }
    }

    impl TriageStore for CountingStore {
        fn insert_encounter(&self, _: &Encounter) -> Result<(), StoreError> {
            unimplemented!("protocol tests only")
        }
        fn get_encounter(&self, id: Uuid) -> Result<Encounter, StoreError> {
            Err(StoreError::NotFound {
                entity: "encounter".into(),
                id: id.to_string(),
            })
        }
        fn append_followups(&self, _: Uuid, _: &[FollowupResponse]) -> Result<(), StoreError> {
            unimplemented!("protocol tests only")
        }
        fn followups(&self, _: Uuid) -> Result<Vec<FollowupResponse>, StoreError> {
            Ok(vec![])
        }
        fn get_triage_result(&self, _: Uuid) -> Result<Option<TriageResult>, StoreError> {
            Ok(None)
        }
        fn put_triage_result(&self, _: Uuid, _: &TriageResult) -> Result<(), StoreError> {
            unimplemented!("protocol tests only")
        }
        fn active_protocol(&self) -> Result<Option<ProtocolVersion>, StoreError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.active.lock().unwrap().clone())
        }
        fn publish_protocol(
            &self,
            description: &str,
            content: &str,
        ) -> Result<ProtocolVersion, StoreError> {
            let version = ProtocolVersion {
                version: 1,
                description: description.into(),
                content: content.into(),
                active: true,
                published_at: Utc::now(),
            };
            *self.active.lock().unwrap() = Some(version.clone());
            Ok(version)
        }
    }

    #[test]
    fn cache_populates_on_first_read_only() {
        let store = Arc::new(CountingStore::new());
        let provider = ProtocolProvider::new(store.clone());

        provider.active_protocol().unwrap();
        provider.active_protocol().unwrap();
        provider.active_protocol().unwrap();

        assert_eq!(store.reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn publish_invalidates_and_readers_see_new_revision() {
        let store = Arc::new(CountingStore::new());
        let provider = ProtocolProvider::new(store.clone());

        // warm the cache with the built-in baseline
        let first = provider.active_protocol().unwrap();
        assert_eq!(first.version, 0);

        provider.publish("update", "revised guideline text").unwrap();
        let second = provider.active_protocol().unwrap();
        assert_eq!(second.version, 1);
        assert_eq!(second.content, "revised guideline text");
        // publish forced exactly one re-read
        assert_eq!(store.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn empty_store_yields_builtin_baseline() {
        let provider = ProtocolProvider::new(Arc::new(CountingStore::new()));
        let version = provider.active_protocol().unwrap();
        assert_eq!(version.version, 0);
        assert!(!version.content.is_empty());
    }
}
