use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tracing::trace;

use super::DocumentStore;
use crate::{BackfillError, Document, Patch, Result};

/// An in-memory document store.
///
/// Serves as the substitutable fake for the runner in tests: documents
/// live in a map keyed by collection and id, and every applied patch
/// bumps an update counter so tests can assert the no-op guarantee (a
/// second run over a migrated dataset performs zero update calls).
///
/// Cloning is cheap and clones share the same underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<BTreeMap<String, BTreeMap<String, Value>>>>,
    update_count: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a document, overwriting any existing one with the same id.
    pub fn insert(&self, collection: &str, id: &str, data: Value) {
        trace!("Inserting document {} into collection {}", id, collection);
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        collections
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), data);
    }

    /// Returns a copy of a document's data, or `None` if it is absent.
    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
        collections.get(collection).and_then(|docs| docs.get(id)).cloned()
    }

    /// Number of patches applied through this store so far.
    pub fn update_count(&self) -> u64 {
        self.update_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    /// Streams a snapshot of the collection taken at call time.
    ///
    /// Like the hosted stores this fake stands in for, an unknown
    /// collection is an empty snapshot, not an error.
    fn list_documents(&self, collection: &str) -> BoxStream<'static, Result<Document>> {
        let snapshot: Vec<Document> = {
            let collections = self.collections.read().unwrap_or_else(|e| e.into_inner());
            collections
                .get(collection)
                .map(|docs| {
                    docs.iter()
                        .map(|(id, data)| Document::new(id.clone(), data.clone()))
                        .collect()
                })
                .unwrap_or_default()
        };
        trace!("Streaming {} documents from collection {}", snapshot.len(), collection);
        Box::pin(tokio_stream::iter(snapshot.into_iter().map(Ok)))
    }

    async fn apply_patch(&self, collection: &str, id: &str, patch: Patch) -> Result<()> {
        let mut collections = self.collections.write().unwrap_or_else(|e| e.into_inner());
        let docs = collections.get_mut(collection).ok_or_else(|| {
            BackfillError::CollectionNotFound {
                name: collection.to_owned(),
            }
        })?;
        let data = docs.get_mut(id).ok_or_else(|| BackfillError::DocumentNotFound {
            id: id.to_owned(),
            collection: collection.to_owned(),
        })?;

        if let Value::Object(fields) = data {
            if let Value::Object(updates) = patch.into_value() {
                fields.extend(updates);
            }
        }
        else {
            *data = patch.into_value();
        }

        self.update_count.fetch_add(1, Ordering::Relaxed);
        trace!("Patched document {} in collection {}", id, collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_insert_list_and_get() {
        let store = MemoryStore::new();
        store.insert("users", "user-1", json!({"role": "lead"}));
        store.insert("users", "user-2", json!({}));

        let mut stream = store.list_documents("users");
        let mut ids = Vec::new();
        while let Some(result) = stream.next().await {
            ids.push(result.unwrap().id);
        }
        ids.sort();
        assert_eq!(ids, vec!["user-1", "user-2"]);
        assert_eq!(store.get("users", "user-1"), Some(json!({"role": "lead"})));
    }

    #[tokio::test]
    async fn test_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let mut stream = store.list_documents("nope");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_apply_patch_merges_and_counts() {
        let store = MemoryStore::new();
        store.insert("messages", "m-1", json!({"body": "hi", "status": ""}));

        let mut patch = Patch::new();
        patch.set("status", json!("sent"));
        store.apply_patch("messages", "m-1", patch).await.unwrap();

        assert_eq!(
            store.get("messages", "m-1"),
            Some(json!({"body": "hi", "status": "sent"}))
        );
        assert_eq!(store.update_count(), 1);
    }

    #[tokio::test]
    async fn test_apply_patch_to_missing_document() {
        let store = MemoryStore::new();
        store.insert("messages", "m-1", json!({}));

        let mut patch = Patch::new();
        patch.set("status", json!("sent"));
        let err = store.apply_patch("messages", "ghost", patch).await.unwrap_err();
        assert!(matches!(err, BackfillError::DocumentNotFound { .. }));

        let err = store
            .apply_patch("chats", "ghost", Patch::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackfillError::CollectionNotFound { .. }));
        assert_eq!(store.update_count(), 0);
    }

    #[tokio::test]
    async fn test_listing_is_a_snapshot() {
        let store = MemoryStore::new();
        store.insert("chats", "chat-1", json!({}));

        let mut stream = store.list_documents("chats");
        store.insert("chats", "chat-2", json!({}));

        let mut seen = 0;
        while let Some(result) = stream.next().await {
            result.unwrap();
            seen += 1;
        }
        assert_eq!(seen, 1);
    }
}
