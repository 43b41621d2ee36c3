//! Game storage
//!
//! [`GameStore`] is the narrow interface the pipeline needs from the backing
//! store: single-entity game/team lookups and writes, plus wholesale
//! replacement of a game's derived events. [`GameDatabase`] implements it on
//! SQLite.

mod db;

use chrono::NaiveDate;

use crate::constants::PLACEHOLDER_PREFIX;
use crate::error::{StoreError, StoreResult};
use crate::replay::DerivedEvent;

pub use db::GameDatabase;

/// Stored team record
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub team_id: i64,
    pub city: String,
    pub name: String,
    pub short: String,
    pub school_name: String,
    pub full_name: String,
}

/// Team record before it has an id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTeam {
    pub city: String,
    pub name: String,
    pub short: String,
    pub school_name: String,
    pub full_name: String,
}

/// Stored game record
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGame {
    pub game_key: String,
    pub provider_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub season: String,
    pub location: String,
    pub team_one: i64,
    pub team_two: i64,
    pub team_one_score: u32,
    pub team_two_score: u32,
    pub winner: Option<String>,
    pub overtime: bool,
    pub comments: Option<String>,
}

impl CanonicalGame {
    pub fn is_placeholder(&self) -> bool {
        self.game_key.starts_with(PLACEHOLDER_PREFIX)
    }
}

/// Row counts from replacing a game's derived events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub deleted: usize,
    pub inserted: usize,
}

/// Storage operations consumed by the resolver and the pipeline
pub trait GameStore {
    fn find_game_by_provider_id(&self, provider_id: &str) -> StoreResult<Option<CanonicalGame>>;

    fn find_game_by_key(&self, game_key: &str) -> StoreResult<Option<CanonicalGame>>;

    fn find_games_by_date(&self, date: NaiveDate) -> StoreResult<Vec<CanonicalGame>>;

    fn find_team_by_id(&self, team_id: i64) -> StoreResult<Option<Team>>;

    /// Exact name, then exact full name, then partial match on either
    fn find_team_by_name(&self, name: &str) -> StoreResult<Option<Team>>;

    fn create_team(&self, team: &NewTeam) -> StoreResult<Team>;

    fn create_game(&self, game: &CanonicalGame) -> StoreResult<()>;

    /// Delete every derived event of `game_key` and insert `events`, atomically
    fn replace_derived_events(
        &self,
        game_key: &str,
        events: &[DerivedEvent],
    ) -> StoreResult<ReplaceOutcome>;

    /// Run `f` in one transaction; an `Err` rolls every write back
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>;
}
