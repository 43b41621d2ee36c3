//! Play-by-play derivation engine
//!
//! Ingests per-game basketball event files from a third-party provider,
//! resolves each to a stored game, replays the events to derive running game
//! context (score, runs, lead changes, bonus, timeouts, momentum) and writes
//! one derived row per event.

pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod identity;
pub mod pipeline;
pub mod replay;
pub mod store;

// Re-export commonly used types for convenience
pub use config::IngestConfig;
pub use constants::*;
pub use error::{
    BatchError, DecodeError, IngestError, ReplayError, ResolveError, Stage, StoreError,
    StoreResult,
};
pub use events::{DecodedFile, GameMeta, RawEvent, Side, TeamMeta, decode_bytes, decode_file};
pub use identity::{GameIdentity, Resolution, ResolvedBy, resolve_game};
pub use pipeline::{BatchReport, FileOutcome, SkipRecord, discover_files, process_file, run_batch};
pub use replay::{DerivedEvent, GameReplay, GameRunningState, replay_game};
pub use store::{CanonicalGame, GameDatabase, GameStore, NewTeam, ReplaceOutcome, Team};
