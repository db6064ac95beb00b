//! One-shot field-defaulting backfill for document stores.
//!
//! Scans four collections (users, queries, chats, messages), computes a
//! sparse patch per document from collection-specific default rules, and
//! applies each patch idempotently. See [`BackfillRunner`] for the run
//! contract and [`rules`] for the default rules themselves.

pub mod document;
pub mod error;
pub mod patch;
pub mod rules;
pub mod runner;
pub mod store;

pub use document::Document;
pub use error::{BackfillError, Result};
pub use patch::Patch;
pub use runner::{BackfillReport, BackfillRunner, SubPassReport};
pub use store::{DocumentStore, FsStore, MemoryStore};
