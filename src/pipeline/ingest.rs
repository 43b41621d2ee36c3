//! File ingest: decode, resolve, replay, persist
//!
//! Each file is handled on its own. A failure at any stage skips that file
//! and leaves the rest of the batch untouched; the store is only written by
//! placeholder creation and the final replace, each atomic.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::report::{BatchReport, FileOutcome, SkipRecord};
use crate::config::IngestConfig;
use crate::error::{BatchError, IngestError, Stage};
use crate::events::decode_file;
use crate::identity::{GameIdentity, resolve_game};
use crate::replay::replay_game;
use crate::store::{GameDatabase, GameStore};

/// Run one event file through the whole pipeline.
///
/// `ordinal` is the file's position in the batch; it keys the placeholder of
/// a file that carries no provider id.
pub fn process_file<S: GameStore>(
    store: &S,
    path: &Path,
    ordinal: usize,
) -> Result<FileOutcome, IngestError> {
    info!("Processing file: {}", path.display());

    let decoded = decode_file(path)?;
    for repair in &decoded.repairs {
        info!(
            "Repaired {} ({} at byte {})",
            path.display(),
            repair.kind.label(),
            repair.offset
        );
    }

    let identity = GameIdentity::from_events(&decoded.events)?;
    let resolution = resolve_game(store, &identity, ordinal)?;
    let game_key = resolution.game.game_key.clone();

    let derived = replay_game(&game_key, &identity.home.name, &decoded.events)?;
    let outcome = store.replace_derived_events(&game_key, &derived)?;
    if outcome.deleted > 0 {
        info!(
            "Deleted {} existing derived events for game {}",
            outcome.deleted, game_key
        );
    }
    info!(
        "Wrote {} derived events for game {}",
        outcome.inserted, game_key
    );

    Ok(FileOutcome {
        path: path.to_path_buf(),
        game_key,
        resolved_by: resolution.origin,
        rows: outcome.inserted,
        replaced: outcome.deleted,
        repairs: decoded.repairs.len(),
    })
}

/// Files in `dir` with the given extension, sorted by path
pub fn discover_files(dir: &Path, extension: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|ext| ext == extension))
        .collect();
    files.sort();
    Ok(files)
}

/// Ingest every event file under the configured input directory.
///
/// Files are processed in parallel, each worker with its own connection.
/// Per-file failures end up in the report; only setup failures are returned.
pub fn run_batch(config: &IngestConfig) -> Result<BatchReport, BatchError> {
    let files = discover_files(&config.input_dir, &config.extension).map_err(|source| {
        BatchError::Discover {
            dir: config.input_dir.display().to_string(),
            source,
        }
    })?;
    info!(
        "Found {} .{} files in {}",
        files.len(),
        config.extension,
        config.input_dir.display()
    );

    // Create the schema once before workers open their own connections
    GameDatabase::open(&config.db_path)?;

    let results = if config.parallel > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build()?;
        pool.install(|| process_all(&files, &config.db_path))
    } else {
        process_all(&files, &config.db_path)
    };

    let mut report = BatchReport::new(files.len());
    for result in results {
        match result {
            Ok(outcome) => report.record_success(&outcome),
            Err(skip) => {
                warn!(
                    "Skipped {} at {} stage: {}",
                    skip.path.display(),
                    skip.stage,
                    skip.message
                );
                report.record_skip(skip);
            }
        }
    }

    info!(
        "Batch complete: {} processed, {} skipped, {} derived rows",
        report.processed,
        report.skipped_count(),
        report.rows
    );
    Ok(report)
}

fn process_all(files: &[PathBuf], db_path: &Path) -> Vec<Result<FileOutcome, SkipRecord>> {
    files
        .par_iter()
        .enumerate()
        .map_init(
            || {
                GameDatabase::open(db_path).map_err(|e| {
                    error!("Worker failed to open {}: {}", db_path.display(), e);
                    e.to_string()
                })
            },
            |db, (ordinal, path)| match db {
                Ok(db) => process_file(&*db, path, ordinal)
                    .map_err(|e| SkipRecord::from_error(path, &e)),
                Err(message) => Err(SkipRecord {
                    path: path.clone(),
                    stage: Stage::Persist,
                    message: message.clone(),
                }),
            },
        )
        .collect()
}
