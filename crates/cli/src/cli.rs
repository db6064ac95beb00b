use clap::Parser;

use crate::{
    commands::{run_migration, Cli},
    logging::init_tracing,
};

/// Run the backfill CLI application.
///
/// Parses command-line arguments, initializes tracing, and performs the
/// migration run against the store at the given path.
pub async fn run() -> backfill::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.json, cli.verbose);

    run_migration(&cli.store_path).await
}
