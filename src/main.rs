//! Play-by-play ingest driver
//!
//! Usage:
//!   cargo run -- --input output/pbp_data --db pbp.db
//!   cargo run -- --settings config/ingest.toml --parallel 8

use pbp_engine::{IngestConfig, run_batch};
use tracing::error;
use tracing_subscriber::prelude::*;

fn main() {
    init_tracing();

    let config = IngestConfig::from_args();

    match run_batch(&config) {
        Ok(report) => {
            if !config.quiet {
                println!("{}", report.format_summary());
            }
        }
        Err(e) => {
            error!("Ingest aborted: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pbp_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
