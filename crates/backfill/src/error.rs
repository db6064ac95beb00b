use thiserror::Error;

/// Crate-wide error type for the backfill tool.
///
/// There is deliberately no finer-grained taxonomy and no local recovery:
/// any failure inside a sub-pass propagates straight to the top-level
/// handler, which logs it and terminates the run. Already-applied patches
/// stay applied; re-running is safe because every rule is idempotent.
#[derive(Error, Debug)]
pub enum BackfillError {
    /// I/O operations failed (file system, etc.)
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Document not found in collection
    #[error("Document '{id}' not found in collection '{collection}'")]
    DocumentNotFound {
        id: String,
        collection: String,
    },

    /// Collection not found in store
    #[error("Collection '{name}' not found in store")]
    CollectionNotFound {
        name: String,
    },

    /// Generic error for unexpected conditions
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

/// Result type alias for backfill operations.
pub type Result<T> = std::result::Result<T, BackfillError>;
