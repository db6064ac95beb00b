//! The backfill runner: four sequential sub-passes, one per collection.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use crate::{rules, DocumentStore, Patch, Result};

/// One sub-pass: the collection it scans, the noun used in progress
/// lines, and the default rule applied to every document.
struct SubPass {
    collection: &'static str,
    noun: &'static str,
    rule: fn(&Map<String, Value>) -> Patch,
}

/// The fixed phase order. Sub-passes touch disjoint collections and each
/// document's patch depends only on its own state, so no other ordering
/// matters, but the order itself is part of the tool's observable
/// behavior (phase banners) and is kept stable.
const SUB_PASSES: [SubPass; 4] = [
    SubPass {
        collection: "users",
        noun: "user",
        rule: rules::user_defaults,
    },
    SubPass {
        collection: "queries",
        noun: "query",
        rule: rules::query_defaults,
    },
    SubPass {
        collection: "chats",
        noun: "chat",
        rule: rules::chat_defaults,
    },
    SubPass {
        collection: "messages",
        noun: "message",
        rule: rules::message_defaults,
    },
];

/// Outcome of a single sub-pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubPassReport {
    /// The collection this sub-pass scanned.
    pub collection: String,
    /// Documents yielded by the store.
    pub documents_scanned: u64,
    /// Documents that received a non-empty patch.
    pub documents_updated: u64,
    /// Documents skipped because their data was not a JSON object.
    pub documents_skipped: u64,
}

/// Outcome of a full backfill run.
#[derive(Debug, Clone, Serialize)]
pub struct BackfillReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Per-collection outcomes, in phase order.
    pub sub_passes: Vec<SubPassReport>,
}

impl BackfillReport {
    /// Total documents scanned across all sub-passes.
    pub fn total_scanned(&self) -> u64 {
        self.sub_passes.iter().map(|p| p.documents_scanned).sum()
    }

    /// Total documents updated across all sub-passes.
    pub fn total_updated(&self) -> u64 {
        self.sub_passes.iter().map(|p| p.documents_updated).sum()
    }
}

/// Runs the field-defaulting migration over a document store.
///
/// The store is injected at construction so the same runner works
/// against the filesystem store in production and an in-memory fake in
/// tests. One public operation, [`BackfillRunner::run`], performs the
/// four sub-passes in fixed order: users, then queries, then chats,
/// then messages.
///
/// # Error policy
///
/// No local recovery anywhere: the first failure listing documents or
/// applying a patch aborts the whole run and propagates to the caller.
/// Patches applied before the failure stay applied; there is no
/// rollback and no checkpoint. Re-running is safe because every rule is
/// idempotent, so a re-run over migrated documents writes nothing.
pub struct BackfillRunner<S> {
    store: S,
}

impl<S> BackfillRunner<S>
where
    S: DocumentStore,
{
    /// Creates a runner over the given store.
    pub fn new(store: S) -> Self {
        Self {
            store,
        }
    }

    /// Returns the injected store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Performs the full four-phase migration.
    ///
    /// Emits a banner per collection ("Migrating users...") and a final
    /// "All migrations complete!" line, plus one progress line per
    /// updated document naming the fields that changed. Returns a
    /// [`BackfillReport`] with per-phase counts.
    pub async fn run(&self) -> Result<BackfillReport> {
        let started_at = Utc::now();
        let mut sub_passes = Vec::with_capacity(SUB_PASSES.len());

        for sub_pass in &SUB_PASSES {
            info!("Migrating {}...", sub_pass.collection);
            sub_passes.push(self.run_sub_pass(sub_pass).await?);
        }

        info!("All migrations complete!");
        Ok(BackfillReport {
            started_at,
            finished_at: Utc::now(),
            sub_passes,
        })
    }

    /// Scans one collection and patches every document that needs it.
    ///
    /// Documents are processed strictly one at a time, in whatever order
    /// the store yields them; at most one store operation is outstanding
    /// at any moment.
    async fn run_sub_pass(&self, sub_pass: &SubPass) -> Result<SubPassReport> {
        let mut report = SubPassReport {
            collection: sub_pass.collection.to_owned(),
            documents_scanned: 0,
            documents_updated: 0,
            documents_skipped: 0,
        };

        let mut documents = self.store.list_documents(sub_pass.collection);
        while let Some(document) = documents.next().await {
            let document = document?;
            report.documents_scanned += 1;

            let Some(data) = document.data.as_object() else {
                warn!(
                    "Skipping {} {}: document data is not an object",
                    sub_pass.noun, document.id
                );
                report.documents_skipped += 1;
                continue;
            };

            let patch = (sub_pass.rule)(data);
            if patch.is_empty() {
                trace!("{} {} already satisfies all defaults", sub_pass.noun, document.id);
                continue;
            }

            let summary = patch.to_string();
            self.store
                .apply_patch(sub_pass.collection, &document.id, patch)
                .await?;
            info!("Updated {} {}: {}", sub_pass.noun, document.id, summary);
            report.documents_updated += 1;
        }

        debug!(
            "Sub-pass over '{}' finished: {} scanned, {} updated",
            sub_pass.collection, report.documents_scanned, report.documents_updated
        );
        Ok(report)
    }
}
