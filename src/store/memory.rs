//! In-memory document store for testing without a backend.

use super::{DocumentStore, StoreError, VersionedDocument};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Mock store holding documents in a map, with optional failure and
/// conflict injection for exercising the best-effort write path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<(String, String), VersionedDocument>>,
    failing_writes: Mutex<HashSet<(String, String)>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document at version 1.
    pub fn with_document(self, collection: &str, id: &str, body: Value) -> Self {
        {
            let mut docs = self.docs.lock().expect("memory store lock poisoned");
            docs.insert(
                (collection.to_string(), id.to_string()),
                VersionedDocument { body, version: 1 },
            );
        }
        self
    }

    /// Make every write to the given document fail with `Unavailable`.
    pub fn with_failing_write(self, collection: &str, id: &str) -> Self {
        {
            let mut failing = self
                .failing_writes
                .lock()
                .expect("memory store lock poisoned");
            failing.insert((collection.to_string(), id.to_string()));
        }
        self
    }

}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        let docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(docs.get(&(collection.to_string(), id.to_string())).cloned())
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        body: Value,
        expected: Option<i64>,
    ) -> Result<i64, StoreError> {
        let key = (collection.to_string(), id.to_string());

        {
            let failing = self
                .failing_writes
                .lock()
                .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
            if failing.contains(&key) {
                return Err(StoreError::Unavailable(format!(
                    "injected write failure for {}/{}",
                    collection, id
                )));
            }
        }

        let mut docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let current = docs.get(&key).map(|d| d.version);
        if current != expected {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let version = expected.unwrap_or(0) + 1;
        docs.insert(key, VersionedDocument { body, version });
        Ok(version)
    }

    async fn list(
        &self,
        collection: &str,
        id_prefix: &str,
    ) -> Result<Vec<(String, VersionedDocument)>, StoreError> {
        let docs = self
            .docs
            .lock()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(docs
            .iter()
            .filter(|((c, id), _)| c == collection && id.starts_with(id_prefix))
            .map(|((_, id), doc)| (id.clone(), doc.clone()))
            .collect())
    }
}
