//! Error taxonomy for the ingest pipeline
//!
//! Each pipeline stage has its own error type. [`IngestError`] unifies them so
//! the batch driver can record a skipped file with the stage it failed in.

use thiserror::Error;

/// Pipeline stage a file failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decode,
    Resolve,
    Replay,
    Persist,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Resolve => "resolve",
            Stage::Replay => "replay",
            Stage::Persist => "persist",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrepairable JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("unexpected event file shape: {0}")]
    Shape(String),

    #[error("no events found")]
    Empty,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("event file has no game metadata")]
    MissingGame,

    #[error("failed to create team {name}: {source}")]
    TeamCreation {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to create placeholder game {key}: {source}")]
    GameCreation {
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("event {index} has invalid period {period}")]
    InvalidPeriod { index: usize, period: i64 },

    #[error("event {index} has invalid clock {clock}")]
    InvalidClock { index: usize, clock: f64 },
}

/// Any failure while processing one event file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error("persistence failed: {0}")]
    Persist(#[from] StoreError),
}

/// Failures that stop a whole batch before any file is processed
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("cannot list {dir}: {source}")]
    Discover {
        dir: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare database: {0}")]
    Store(#[from] StoreError),

    #[error("cannot build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl IngestError {
    pub fn stage(&self) -> Stage {
        match self {
            IngestError::Decode(_) => Stage::Decode,
            IngestError::Resolve(_) => Stage::Resolve,
            IngestError::Replay(_) => Stage::Replay,
            IngestError::Persist(_) => Stage::Persist,
        }
    }
}
