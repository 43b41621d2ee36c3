//! Game identity resolution
//!
//! Maps the game metadata embedded in an event file onto a stored
//! [`CanonicalGame`]. Strategies are tried in order and the first hit wins:
//!
//! 1. provider id
//! 2. game date plus both team names, in either order
//! 3. keys constructed from the date and stored team short codes
//! 4. a placeholder keyed on the provider id, created when absent
//!
//! Only the last step writes, and it writes inside one transaction.

use std::fmt;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::keys::{constructed_keys, placeholder_key, season_label};
use crate::error::{ResolveError, StoreResult};
use crate::events::{GameMeta, RawEvent, TeamMeta};
use crate::store::{CanonicalGame, GameStore, NewTeam, Team};

/// What a file says about the game it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct GameIdentity {
    pub provider_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub home: TeamMeta,
    pub away: TeamMeta,
}

impl GameIdentity {
    /// Identity carried by the first event of a file
    pub fn from_events(events: &[RawEvent]) -> Result<Self, ResolveError> {
        events
            .first()
            .and_then(|e| e.game.as_ref())
            .map(Self::from_meta)
            .ok_or(ResolveError::MissingGame)
    }

    pub fn from_meta(meta: &GameMeta) -> Self {
        let provider_id = Some(meta.provider_id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Self {
            provider_id,
            date: meta.date,
            home: meta.home.clone(),
            away: meta.away.clone(),
        }
    }
}

/// Strategy that produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy {
    ProviderId,
    DateAndTeams,
    ConstructedKey,
    ExistingPlaceholder,
    NewPlaceholder,
}

impl ResolvedBy {
    pub fn label(&self) -> &'static str {
        match self {
            ResolvedBy::ProviderId => "provider id",
            ResolvedBy::DateAndTeams => "date and teams",
            ResolvedBy::ConstructedKey => "constructed key",
            ResolvedBy::ExistingPlaceholder => "existing placeholder",
            ResolvedBy::NewPlaceholder => "new placeholder",
        }
    }
}

impl fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub game: CanonicalGame,
    pub origin: ResolvedBy,
}

impl Resolution {
    pub fn created_placeholder(&self) -> bool {
        self.origin == ResolvedBy::NewPlaceholder
    }
}

/// Resolve `identity` to a stored game, creating a placeholder if nothing matches.
///
/// `fallback_ordinal` keys the placeholder of a file without a provider id.
pub fn resolve_game<S: GameStore>(
    store: &S,
    identity: &GameIdentity,
    fallback_ordinal: usize,
) -> Result<Resolution, ResolveError> {
    if let Some(provider_id) = identity.provider_id.as_deref() {
        if let Some(game) = store.find_game_by_provider_id(provider_id)? {
            info!("Resolved {} by provider id", game.game_key);
            return Ok(Resolution {
                game,
                origin: ResolvedBy::ProviderId,
            });
        }
    }

    if let Some(date) = identity.date {
        if let Some(game) = match_date_and_teams(store, date, identity)? {
            info!("Resolved {} by date and teams", game.game_key);
            return Ok(Resolution {
                game,
                origin: ResolvedBy::DateAndTeams,
            });
        }

        if let Some(game) = match_constructed_key(store, date, identity)? {
            info!("Resolved {} by constructed key", game.game_key);
            return Ok(Resolution {
                game,
                origin: ResolvedBy::ConstructedKey,
            });
        }
    }

    let key = placeholder_key(identity.provider_id.as_deref(), fallback_ordinal);
    if let Some(game) = store.find_game_by_key(&key)? {
        info!("Found existing placeholder game {}", key);
        return Ok(Resolution {
            game,
            origin: ResolvedBy::ExistingPlaceholder,
        });
    }

    warn!(
        "No stored game for provider id {:?}, creating placeholder {}",
        identity.provider_id, key
    );
    match store.transaction(|tx| create_placeholder(tx, &key, identity)) {
        Ok(game) => {
            info!(
                "Created placeholder game {} ({} vs {})",
                key, identity.home.name, identity.away.name
            );
            Ok(Resolution {
                game,
                origin: ResolvedBy::NewPlaceholder,
            })
        }
        // Another worker may have created the same placeholder first
        Err(err @ ResolveError::GameCreation { .. }) => match store.find_game_by_key(&key)? {
            Some(game) => Ok(Resolution {
                game,
                origin: ResolvedBy::ExistingPlaceholder,
            }),
            None => Err(err),
        },
        Err(err) => Err(err),
    }
}

fn match_date_and_teams<S: GameStore>(
    store: &S,
    date: NaiveDate,
    identity: &GameIdentity,
) -> StoreResult<Option<CanonicalGame>> {
    let home = identity.home.name.as_str();
    let away = identity.away.name.as_str();

    for game in store.find_games_by_date(date)? {
        let one = store.find_team_by_id(game.team_one)?;
        let two = store.find_team_by_id(game.team_two)?;
        let (Some(one), Some(two)) = (one, two) else {
            debug!("Game {} has a dangling team reference", game.game_key);
            continue;
        };
        let forward = one.name == home && two.name == away;
        let reverse = one.name == away && two.name == home;
        if forward || reverse {
            return Ok(Some(game));
        }
    }
    Ok(None)
}

fn match_constructed_key<S: GameStore>(
    store: &S,
    date: NaiveDate,
    identity: &GameIdentity,
) -> StoreResult<Option<CanonicalGame>> {
    let home = store.find_team_by_name(&identity.home.name)?;
    let away = store.find_team_by_name(&identity.away.name)?;
    let (Some(home), Some(away)) = (home, away) else {
        return Ok(None);
    };
    if home.short.is_empty() || away.short.is_empty() {
        return Ok(None);
    }

    for key in constructed_keys(date, &home.short, &away.short) {
        if let Some(game) = store.find_game_by_key(&key)? {
            return Ok(Some(game));
        }
    }
    Ok(None)
}

fn create_placeholder<S: GameStore>(
    store: &S,
    key: &str,
    identity: &GameIdentity,
) -> Result<CanonicalGame, ResolveError> {
    let home = find_or_create_team(store, &identity.home)?;
    let away = find_or_create_team(store, &identity.away)?;

    let game = CanonicalGame {
        game_key: key.to_string(),
        provider_id: identity.provider_id.clone(),
        date: identity.date,
        season: season_label(identity.date),
        location: identity.home.name.clone(),
        team_one: home.team_id,
        team_two: away.team_id,
        team_one_score: 0,
        team_two_score: 0,
        winner: None,
        overtime: false,
        comments: Some(format!(
            "Placeholder game created from play-by-play data. Home: {}, Away: {}",
            identity.home.name, identity.away.name
        )),
    };
    store
        .create_game(&game)
        .map_err(|source| ResolveError::GameCreation {
            key: key.to_string(),
            source,
        })?;
    Ok(game)
}

fn find_or_create_team<S: GameStore>(store: &S, meta: &TeamMeta) -> Result<Team, ResolveError> {
    if let Some(team) = store.find_team_by_name(&meta.name)? {
        return Ok(team);
    }

    let team = store
        .create_team(&new_team(meta))
        .map_err(|source| ResolveError::TeamCreation {
            name: meta.name.clone(),
            source,
        })?;
    info!("Created team: {} ({})", team.full_name, team.team_id);
    Ok(team)
}

/// Team record built from file metadata; city is the first word of the full name
fn new_team(meta: &TeamMeta) -> NewTeam {
    let city = meta
        .full_name
        .split_whitespace()
        .next()
        .unwrap_or("Unknown")
        .to_string();
    NewTeam {
        city,
        name: meta.name.clone(),
        short: meta.abbr.clone(),
        school_name: meta.full_name.clone(),
        full_name: meta.full_name.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::replay::DerivedEvent;
    use crate::store::{GameDatabase, ReplaceOutcome};
    use std::cell::RefCell;

    fn team(name: &str, abbr: &str, full_name: &str) -> TeamMeta {
        TeamMeta {
            name: name.to_string(),
            abbr: abbr.to_string(),
            full_name: full_name.to_string(),
        }
    }

    fn identity(provider_id: Option<&str>) -> GameIdentity {
        GameIdentity {
            provider_id: provider_id.map(str::to_string),
            date: NaiveDate::from_ymd_opt(2024, 11, 5),
            home: team("Hawks", "HAW", "Hillside Hawks"),
            away: team("Owls", "OWL", "Oakmont Owls"),
        }
    }

    fn seed_teams(db: &GameDatabase) -> (Team, Team) {
        let hawks = db
            .create_team(&new_team(&team("Hawks", "HAW", "Hillside Hawks")))
            .unwrap();
        let owls = db
            .create_team(&new_team(&team("Owls", "OWL", "Oakmont Owls")))
            .unwrap();
        (hawks, owls)
    }

    fn stored_game(key: &str, provider_id: Option<&str>, one: i64, two: i64) -> CanonicalGame {
        CanonicalGame {
            game_key: key.to_string(),
            provider_id: provider_id.map(str::to_string),
            date: NaiveDate::from_ymd_opt(2024, 11, 5),
            season: "2024-25".to_string(),
            location: "Hillside".to_string(),
            team_one: one,
            team_two: two,
            team_one_score: 70,
            team_two_score: 64,
            winner: Some("Hawks".to_string()),
            overtime: false,
            comments: None,
        }
    }

    #[test]
    fn test_identity_requires_game_metadata() {
        let events = vec![RawEvent::default()];
        assert!(matches!(
            GameIdentity::from_events(&events),
            Err(ResolveError::MissingGame)
        ));
        assert!(matches!(
            GameIdentity::from_events(&[]),
            Err(ResolveError::MissingGame)
        ));
    }

    #[test]
    fn test_resolve_by_provider_id() {
        let db = GameDatabase::open_in_memory().unwrap();
        let (hawks, owls) = seed_teams(&db);
        db.create_game(&stored_game("G100", Some("abc123456"), hawks.team_id, owls.team_id))
            .unwrap();

        let res = resolve_game(&db, &identity(Some("abc123456")), 0).unwrap();
        assert_eq!(res.origin, ResolvedBy::ProviderId);
        assert_eq!(res.game.game_key, "G100");
    }

    #[test]
    fn test_resolve_by_date_and_teams_either_order() {
        let db = GameDatabase::open_in_memory().unwrap();
        let (hawks, owls) = seed_teams(&db);
        // Stored with away team first
        db.create_game(&stored_game("G200", None, owls.team_id, hawks.team_id))
            .unwrap();

        let res = resolve_game(&db, &identity(Some("unknown-id")), 0).unwrap();
        assert_eq!(res.origin, ResolvedBy::DateAndTeams);
        assert_eq!(res.game.game_key, "G200");
    }

    #[test]
    fn test_resolve_by_constructed_key() {
        let db = GameDatabase::open_in_memory().unwrap();
        let (hawks, owls) = seed_teams(&db);
        // Different date on the record so step 2 misses
        let mut game = stored_game("W20241105OWLHAW", None, hawks.team_id, owls.team_id);
        game.date = None;
        db.create_game(&game).unwrap();

        let res = resolve_game(&db, &identity(Some("unknown-id")), 0).unwrap();
        assert_eq!(res.origin, ResolvedBy::ConstructedKey);
        assert_eq!(res.game.game_key, "W20241105OWLHAW");
    }

    #[test]
    fn test_placeholder_created_with_teams() {
        let db = GameDatabase::open_in_memory().unwrap();

        let res = resolve_game(&db, &identity(Some("5f2a9c0e81d4b7a6c3e19f02")), 0).unwrap();
        assert_eq!(res.origin, ResolvedBy::NewPlaceholder);
        assert!(res.created_placeholder());

        let game = db.find_game_by_key("MISSING_e19f02").unwrap().unwrap();
        assert!(game.is_placeholder());
        assert_eq!(game.team_one_score, 0);
        assert_eq!(game.team_two_score, 0);
        assert_eq!(game.winner, None);
        assert_eq!(game.season, "2024-25");
        assert_eq!(game.location, "Hawks");
        assert_eq!(
            game.comments.as_deref(),
            Some("Placeholder game created from play-by-play data. Home: Hawks, Away: Owls")
        );

        let home = db.find_team_by_id(game.team_one).unwrap().unwrap();
        assert_eq!(home.city, "Hillside");
        assert_eq!(home.short, "HAW");
        assert_eq!(home.full_name, "Hillside Hawks");
        assert_eq!(db.team_count().unwrap(), 2);
    }

    #[test]
    fn test_placeholder_resolution_is_deterministic() {
        let db = GameDatabase::open_in_memory().unwrap();
        let id = identity(Some("5f2a9c0e81d4b7a6c3e19f02"));

        let first = resolve_game(&db, &id, 0).unwrap();
        let second = resolve_game(&db, &id, 9).unwrap();
        assert_eq!(first.game.game_key, second.game.game_key);
        // The placeholder carries the provider id, so the rerun finds it directly
        assert_eq!(second.origin, ResolvedBy::ProviderId);
        assert_eq!(db.game_count().unwrap(), 1);
        assert_eq!(db.team_count().unwrap(), 2);
    }

    #[test]
    fn test_placeholder_reuses_existing_teams() {
        let db = GameDatabase::open_in_memory().unwrap();
        seed_teams(&db);

        // Names differ from the record's, but the partial match still finds them
        let mut id = identity(None);
        id.date = None;
        id.home.name = "Hillside".to_string();
        id.away.name = "Oakmont".to_string();

        let res = resolve_game(&db, &id, 4).unwrap();
        assert_eq!(res.game.game_key, "MISSING_4");
        assert_eq!(res.game.season, "Unknown");
        assert_eq!(db.team_count().unwrap(), 2);

        let again = resolve_game(&db, &id, 4).unwrap();
        assert_eq!(again.origin, ResolvedBy::ExistingPlaceholder);
        assert_eq!(db.game_count().unwrap(), 1);
    }

    /// Store whose game inserts can be made to fail, or to lose a race
    /// against a game inserted behind the resolver's back
    struct ContendedStore {
        inner: GameDatabase,
        reject_games: bool,
        competitor: RefCell<Option<CanonicalGame>>,
    }

    impl ContendedStore {
        fn new(inner: GameDatabase) -> Self {
            Self {
                inner,
                reject_games: false,
                competitor: RefCell::new(None),
            }
        }
    }

    impl GameStore for ContendedStore {
        fn find_game_by_provider_id(&self, id: &str) -> StoreResult<Option<CanonicalGame>> {
            self.inner.find_game_by_provider_id(id)
        }

        fn find_game_by_key(&self, game_key: &str) -> StoreResult<Option<CanonicalGame>> {
            // The other writer commits right after our lookup misses
            if let Some(game) = self.competitor.borrow_mut().take() {
                self.inner.create_game(&game)?;
                return Ok(None);
            }
            self.inner.find_game_by_key(game_key)
        }

        fn find_games_by_date(&self, date: NaiveDate) -> StoreResult<Vec<CanonicalGame>> {
            self.inner.find_games_by_date(date)
        }

        fn find_team_by_id(&self, team_id: i64) -> StoreResult<Option<Team>> {
            self.inner.find_team_by_id(team_id)
        }

        fn find_team_by_name(&self, name: &str) -> StoreResult<Option<Team>> {
            self.inner.find_team_by_name(name)
        }

        fn create_team(&self, team: &NewTeam) -> StoreResult<Team> {
            self.inner.create_team(team)
        }

        fn create_game(&self, game: &CanonicalGame) -> StoreResult<()> {
            if self.reject_games {
                return Err(StoreError::Sqlite(rusqlite::Error::InvalidQuery));
            }
            self.inner.create_game(game)
        }

        fn replace_derived_events(
            &self,
            game_key: &str,
            events: &[DerivedEvent],
        ) -> StoreResult<ReplaceOutcome> {
            self.inner.replace_derived_events(game_key, events)
        }

        fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
        where
            F: FnOnce(&Self) -> Result<T, E>,
            E: From<StoreError>,
        {
            self.inner.transaction(|_| f(self))
        }
    }

    #[test]
    fn test_failed_placeholder_rolls_back_new_teams() {
        let mut store = ContendedStore::new(GameDatabase::open_in_memory().unwrap());
        store.reject_games = true;

        let id = identity(Some("5f2a9c0e81d4b7a6c3e19f02"));
        let err = resolve_game(&store, &id, 0).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::GameCreation { ref key, .. } if key == "MISSING_e19f02"
        ));
        assert_eq!(store.inner.team_count().unwrap(), 0);
        assert_eq!(store.inner.game_count().unwrap(), 0);
    }

    #[test]
    fn test_placeholder_race_resolves_to_winner() {
        let db = GameDatabase::open_in_memory().unwrap();
        let (hawks, owls) = seed_teams(&db);
        let winner = stored_game("MISSING_e19f02", None, hawks.team_id, owls.team_id);
        let store = ContendedStore::new(db);
        *store.competitor.borrow_mut() = Some(winner.clone());

        let mut id = identity(Some("5f2a9c0e81d4b7a6c3e19f02"));
        id.date = None;
        let res = resolve_game(&store, &id, 0).unwrap();
        assert_eq!(res.origin, ResolvedBy::ExistingPlaceholder);
        assert_eq!(res.game, winner);
        assert_eq!(store.inner.game_count().unwrap(), 1);
        assert_eq!(store.inner.team_count().unwrap(), 2);
    }
}
