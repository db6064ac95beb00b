use std::path::{Path, PathBuf};

use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use tokio::fs as tokio_fs;
use tracing::{debug, error, trace};

use super::DocumentStore;
use crate::{BackfillError, Document, Patch, Result};

/// A filesystem-backed document store.
///
/// Layout: one subdirectory per collection under the root, one
/// pretty-printed `{id}.json` file per document. This is the production
/// collaborator for the backfill runner; the migration itself is
/// agnostic to where documents live.
///
/// # Example
///
/// ```no_run
/// use backfill::FsStore;
/// use serde_json::json;
///
/// # async fn example() -> backfill::Result<()> {
/// let store = FsStore::open("/var/lib/helpdesk/db").await?;
/// store.insert("users", "user-1", json!({"name": "Alice"})).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FsStore {
    /// The root path of the store.
    root_path: PathBuf,
}

impl FsStore {
    /// Opens a store at the given root path, creating the directory if it
    /// does not exist yet.
    pub async fn open<P>(root_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let root_path = root_path.as_ref().to_path_buf();
        trace!("Opening store at path: {:?}", root_path);
        tokio_fs::create_dir_all(&root_path).await.map_err(|e| {
            error!("Failed to create store root directory {:?}: {}", root_path, e);
            e
        })?;
        debug!("Store root directory ready: {:?}", root_path);
        Ok(Self {
            root_path,
        })
    }

    /// Returns the root path of the store.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn document_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root_path.join(collection).join(format!("{}.json", id))
    }

    /// Writes a document, overwriting any existing one with the same id.
    ///
    /// The collection directory is created on first use. This is a
    /// seeding convenience; the migration run itself only lists and
    /// patches.
    pub async fn insert(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        trace!("Inserting document {} into collection {}", id, collection);
        let collection_path = self.root_path.join(collection);
        tokio_fs::create_dir_all(&collection_path).await.map_err(|e| {
            error!("Failed to create collection directory {:?}: {}", collection_path, e);
            e
        })?;

        let file_path = collection_path.join(format!("{}.json", id));
        let json = serde_json::to_string_pretty(&data)?;
        tokio_fs::write(&file_path, json).await.map_err(|e| {
            error!("Failed to write document {} to file {:?}: {}", id, file_path, e);
            e
        })?;
        debug!("Document {} inserted into collection {}", id, collection);
        Ok(())
    }

    /// Reads a single document, or `None` if it does not exist.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let file_path = self.document_path(collection, id);
        match tokio_fs::read_to_string(&file_path).await {
            Ok(content) => {
                let data: Value = serde_json::from_str(&content).map_err(|e| {
                    error!("Failed to parse JSON for document {}: {}", id, e);
                    e
                })?;
                Ok(Some(Document::new(id, data)))
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Document {} not found in collection {}", id, collection);
                Ok(None)
            },
            Err(e) => {
                error!("IO error reading document {}: {}", id, e);
                Err(BackfillError::Io {
                    source: e,
                })
            },
        }
    }

    /// Merges patch fields into existing top-level fields.
    ///
    /// Only the listed fields change; everything else is preserved. The
    /// merge is shallow: a staged field replaces the existing value
    /// wholesale, nested objects are not merged recursively.
    fn merge_fields(existing: Value, patch: Patch) -> Value {
        let updates = match patch.into_value() {
            Value::Object(updates) => updates,
            other => return other,
        };
        match existing {
            Value::Object(mut fields) => {
                fields.extend(updates);
                Value::Object(fields)
            },
            // Not reachable for documents written by this tool; a patch
            // against non-object data replaces it with just the patch.
            _ => Value::Object(updates),
        }
    }
}

#[async_trait]
impl DocumentStore for FsStore {
    /// Streams every document in the collection directory.
    ///
    /// Documents are yielded in directory order, which carries no
    /// guarantee. A missing collection directory yields an empty stream.
    fn list_documents(&self, collection: &str) -> BoxStream<'static, Result<Document>> {
        let collection_path = self.root_path.join(collection);
        trace!("Streaming documents from collection path: {:?}", collection_path);
        Box::pin(stream! {
            let mut entries = match tokio_fs::read_dir(&collection_path).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Collection directory {:?} does not exist, treating as empty", collection_path);
                    return;
                },
                Err(e) => {
                    yield Err(e.into());
                    return;
                },
            };

            loop {
                let entry = match entries.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    },
                };

                let path = entry.path();
                let file_name = match path.file_name().and_then(|n| n.to_str()) {
                    Some(name) => name.to_owned(),
                    None => continue,
                };
                if !file_name.ends_with(".json") || file_name.starts_with('.') {
                    continue;
                }
                let id = file_name[..file_name.len() - 5].to_owned();

                let content = match tokio_fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        yield Err(e.into());
                        return;
                    },
                };
                match serde_json::from_str::<Value>(&content) {
                    Ok(data) => yield Ok(Document::new(id, data)),
                    Err(e) => {
                        error!("Failed to parse JSON for document {}: {}", id, e);
                        yield Err(e.into());
                        return;
                    },
                }
            }
        })
    }

    async fn apply_patch(&self, collection: &str, id: &str, patch: Patch) -> Result<()> {
        trace!("Applying patch to document {} in collection {}", id, collection);
        let file_path = self.document_path(collection, id);

        let content = match tokio_fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackfillError::DocumentNotFound {
                    id: id.to_owned(),
                    collection: collection.to_owned(),
                });
            },
            Err(e) => {
                error!("IO error reading document {}: {}", id, e);
                return Err(BackfillError::Io {
                    source: e,
                });
            },
        };
        let existing: Value = serde_json::from_str(&content)?;

        let merged = Self::merge_fields(existing, patch);
        let json = serde_json::to_string_pretty(&merged)?;
        tokio_fs::write(&file_path, json).await.map_err(|e| {
            error!("Failed to write patched document {} to file {:?}: {}", id, file_path, e);
            e
        })?;
        debug!("Document {} patched in collection {}", id, collection);
        Ok(())
    }
}
