//! Ruleset and pipeline constants
//!
//! The foul thresholds and timeout pool reflect a single competition's rules.
//! They are not configurable per league.

// =============================================================================
// GAME CLOCK
// =============================================================================

/// Length of one regulation period in seconds (10 minute quarters)
pub const PERIOD_SECONDS: f64 = 600.0;

/// Number of regulation periods; later periods count as extra time
pub const REGULATION_PERIODS: i64 = 4;

/// Total regulation game length in seconds
pub const GAME_SECONDS: f64 = PERIOD_SECONDS * REGULATION_PERIODS as f64;

// =============================================================================
// RULESET
// =============================================================================

/// Defending side's period fouls at which the offense is in the bonus
pub const BONUS_FOULS: u32 = 7;

/// Defending side's period fouls at which the offense is in the double bonus
pub const DOUBLE_BONUS_FOULS: u32 = 10;

/// Timeouts each side starts the game with
pub const STARTING_TIMEOUTS: u32 = 5;

// =============================================================================
// MOMENTUM
// =============================================================================

/// Trailing window for "last minute" points and possessions
pub const MOMENTUM_WINDOW_SECS: i64 = 60;

/// Play types that open a new possession
pub const POSSESSION_PLAY_TYPES: &[&str] = &[
    "ISO",
    "P&R Ball Handler",
    "Post-Up",
    "Spot-Up",
    "Off Screen",
    "Hand Off",
    "Cut",
];

// =============================================================================
// IDENTITY
// =============================================================================

/// Prefix of placeholder game keys
pub const PLACEHOLDER_PREFIX: &str = "MISSING_";

/// Number of trailing provider-id characters used in a placeholder key
pub const PLACEHOLDER_SUFFIX_LEN: usize = 6;

/// Prefix of game keys constructed from date and team short codes
pub const CONSTRUCTED_KEY_PREFIX: &str = "W";

// =============================================================================
// DECODING
// =============================================================================

/// Wrapper key some provider files nest the event list under
pub const RESULT_WRAPPER_KEY: &str = "result";

/// Upper bound on repair passes over a single file
pub const MAX_REPAIR_PASSES: usize = 32;

/// Suffix that marks a possession item's `$type`
pub const POSSESSION_ITEM_SUFFIX: &str = "PossessionPlayEvent, Synergy.Model.Api";

/// Default settings file for the ingest driver
pub const INGEST_SETTINGS_FILE: &str = "config/ingest.toml";

/// Check whether a play type opens a possession
pub fn is_possession_play_type(play_type: Option<&str>) -> bool {
    play_type.is_some_and(|t| POSSESSION_PLAY_TYPES.contains(&t))
}
