//! Batch ingest of play-by-play files

mod ingest;
mod report;

pub use ingest::{discover_files, process_file, run_batch};
pub use report::{BatchReport, FileOutcome, SkipRecord};
