use backfill::{BackfillRunner, FsStore, Result};
use clap::Parser;
use tracing::{error, info};

/// One-shot field-defaulting migration for a document store.
///
/// Scans the users, queries, chats and messages collections in the store
/// at the given path and patches missing fields with their defaults. The
/// run is idempotent: re-invoking it over an already-migrated store
/// writes nothing.
///
/// # Examples
///
/// ```bash
/// backfill /var/lib/helpdesk/db
/// backfill /var/lib/helpdesk/db --json -v
/// ```
#[derive(Parser)]
#[command(name = "backfill")]
#[command(about = "Backfill missing document fields with default values")]
pub struct Cli {
    /// Path to the store root directory
    pub store_path: String,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    /// Increase verbosity (can be used multiple times: -v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Execute the migration run against the store at `store_path`.
///
/// Opens the filesystem store, runs the four-phase backfill, and logs a
/// per-collection summary. Any failure propagates to the caller after
/// being logged; documents patched before the failure stay patched.
pub async fn run_migration(store_path: &str) -> Result<()> {
    info!("Running backfill against store at {}", store_path);
    let store = FsStore::open(store_path).await?;
    let runner = BackfillRunner::new(store);

    let report = match runner.run().await {
        Ok(report) => report,
        Err(e) => {
            error!("Migration run against store {} failed: {}", store_path, e);
            return Err(e);
        }
    };

    for sub_pass in &report.sub_passes {
        info!(
            "{}: {} scanned, {} updated",
            sub_pass.collection, sub_pass.documents_scanned, sub_pass.documents_updated
        );
    }
    info!(
        "Backfill finished in {} ms: {} documents scanned, {} updated",
        (report.finished_at - report.started_at).num_milliseconds(),
        report.total_scanned(),
        report.total_updated()
    );
    Ok(())
}
