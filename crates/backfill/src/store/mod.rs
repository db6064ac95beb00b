//! Document store abstraction and implementations.
//!
//! The runner never talks to a concrete store; it receives a
//! [`DocumentStore`] by injection so the same migration logic runs
//! against the filesystem-backed [`FsStore`] in production and the
//! [`MemoryStore`] fake in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::{Document, Patch, Result};

/// Filesystem-backed store implementation.
pub mod fs;
/// In-memory store implementation for tests and dry runs.
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

/// The collaborator surface the backfill runner requires.
///
/// Two operations: list every document in a collection, and apply a
/// merge-only partial update to one document. Listing is lazy and
/// unordered; the runner makes no ordering assumptions. Patch
/// application changes only the listed fields and preserves all others.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Streams every document snapshot in `collection`.
    ///
    /// The stream is finite and not restartable. A collection unknown to
    /// the store yields an empty stream rather than an error, matching
    /// hosted document stores where an unknown collection is simply an
    /// empty snapshot.
    fn list_documents(&self, collection: &str) -> BoxStream<'static, Result<Document>>;

    /// Applies `patch` to the document `id` in `collection`.
    ///
    /// Merge semantics: only the fields staged in the patch are changed;
    /// every other field is preserved. Fails with `DocumentNotFound` if
    /// the document no longer exists.
    async fn apply_patch(&self, collection: &str, id: &str, patch: Patch) -> Result<()>;
}
