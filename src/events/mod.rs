//! Provider play-by-play events
//!
//! Decoding of raw event files (with best-effort repair of malformed JSON),
//! the typed event records, and the description classifier the replay uses.

pub mod classify;
pub mod decoder;
pub mod repair;
mod types;

pub use classify::{Classification, ScoreKind, classify_description, classify_event};
pub use decoder::{DecodedFile, decode_bytes, decode_file};
pub use repair::{Repair, RepairKind, repair};
pub use types::{
    GameMeta, PlayItem, RawEvent, Side, TeamMeta, WireEvent, WireGame, WireTeam, classify_items,
    parse_game_date, parse_utc,
};
