//! SQLite game store
//!
//! Teams, canonical games and derived play-by-play rows. Uses WAL mode so
//! parallel workers, each with their own connection, can read while another
//! writes.

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use std::path::Path;

use super::{CanonicalGame, GameStore, NewTeam, ReplaceOutcome, Team};
use crate::error::{StoreError, StoreResult};
use crate::events::Side;
use crate::replay::DerivedEvent;

const DATE_FORMAT: &str = "%Y-%m-%d";
const UTC_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const GAME_COLUMNS: &str = "game_key, provider_id, game_date, season, location, team_one, team_two,
     team_one_score, team_two_score, winner, overtime, comments";

const TEAM_COLUMNS: &str =
    "team_id, team_city, team_name, team_short, team_school_name, team_fullname";

const DERIVED_COLUMNS: &str = "game_key, seq, event_id, period, clock, utc_time, seconds_remaining,
     game_percent_complete, offense_team, defense_team, is_home_offense, offense_player,
     offense_player_id, result_player, result_player_id, play_type, play_result, description,
     tags, play_number, is_home, after_timeout, shot_quality, points, home_score, away_score,
     run_team, run_points, home_run, away_run, score_margin, leading_team, score_margin_pct,
     lead_changes, largest_lead, possession_number, previous_play_type, points_last_minute,
     possessions_last_minute, time_since_last_score, bonus, double_bonus,
     timeouts_remaining_home, timeouts_remaining_away";

/// SQLite-backed [`GameStore`]
pub struct GameDatabase {
    conn: Connection,
}

impl GameDatabase {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for concurrent reads during writes
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        // Set busy timeout for parallel access
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS teams (
                team_id INTEGER PRIMARY KEY,
                team_city TEXT NOT NULL,
                team_name TEXT NOT NULL,
                team_short TEXT NOT NULL,
                team_school_name TEXT NOT NULL,
                team_fullname TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS games (
                game_key TEXT PRIMARY KEY,
                provider_id TEXT,
                game_date TEXT,
                season TEXT NOT NULL,
                location TEXT NOT NULL,
                team_one INTEGER REFERENCES teams(team_id),
                team_two INTEGER REFERENCES teams(team_id),
                team_one_score INTEGER NOT NULL,
                team_two_score INTEGER NOT NULL,
                winner TEXT,
                overtime INTEGER NOT NULL DEFAULT 0,
                comments TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_games_provider ON games(provider_id);
            CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date);

            CREATE TABLE IF NOT EXISTS derived_events (
                game_key TEXT NOT NULL,
                seq INTEGER NOT NULL,
                event_id TEXT NOT NULL,
                period INTEGER NOT NULL,
                clock REAL NOT NULL,
                utc_time TEXT,
                seconds_remaining REAL NOT NULL,
                game_percent_complete REAL NOT NULL,
                offense_team TEXT NOT NULL,
                defense_team TEXT NOT NULL,
                is_home_offense INTEGER NOT NULL,
                offense_player TEXT NOT NULL,
                offense_player_id TEXT NOT NULL,
                result_player TEXT NOT NULL,
                result_player_id TEXT NOT NULL,
                play_type TEXT,
                play_result TEXT,
                description TEXT NOT NULL,
                tags TEXT NOT NULL,
                play_number INTEGER,
                is_home INTEGER NOT NULL,
                after_timeout INTEGER NOT NULL,
                shot_quality REAL,
                points INTEGER NOT NULL,
                home_score INTEGER NOT NULL,
                away_score INTEGER NOT NULL,
                run_team TEXT,
                run_points INTEGER NOT NULL,
                home_run INTEGER NOT NULL,
                away_run INTEGER NOT NULL,
                score_margin INTEGER NOT NULL,
                leading_team TEXT NOT NULL,
                score_margin_pct REAL NOT NULL,
                lead_changes INTEGER NOT NULL,
                largest_lead INTEGER NOT NULL,
                possession_number INTEGER NOT NULL,
                previous_play_type TEXT,
                points_last_minute INTEGER NOT NULL,
                possessions_last_minute INTEGER NOT NULL,
                time_since_last_score REAL NOT NULL,
                bonus INTEGER NOT NULL,
                double_bonus INTEGER NOT NULL,
                timeouts_remaining_home INTEGER NOT NULL,
                timeouts_remaining_away INTEGER NOT NULL,
                PRIMARY KEY (game_key, seq)
            );

            CREATE INDEX IF NOT EXISTS idx_derived_events_game ON derived_events(game_key);
            "#,
        )?;
        Ok(())
    }

    /// Derived events of a game in file order
    pub fn load_derived_events(&self, game_key: &str) -> StoreResult<Vec<DerivedEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM derived_events WHERE game_key = ?1 ORDER BY seq",
            DERIVED_COLUMNS
        ))?;

        let rows = stmt.query_map(params![game_key], derived_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Get derived event count for a game
    pub fn derived_event_count(&self, game_key: &str) -> StoreResult<u64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM derived_events WHERE game_key = ?1",
            params![game_key],
            |row| row.get(0),
        )?)
    }

    /// Get game count
    pub fn game_count(&self) -> StoreResult<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM games", [], |row| row.get(0))?)
    }

    /// Get team count
    pub fn team_count(&self) -> StoreResult<u64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?)
    }

    fn query_team(&self, sql: &str, value: &str) -> StoreResult<Option<Team>> {
        Ok(self
            .conn
            .query_row(sql, params![value], team_from_row)
            .optional()?)
    }
}

impl GameStore for GameDatabase {
    fn find_game_by_provider_id(&self, provider_id: &str) -> StoreResult<Option<CanonicalGame>> {
        Ok(self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM games WHERE provider_id = ?1 ORDER BY game_key LIMIT 1",
                    GAME_COLUMNS
                ),
                params![provider_id],
                game_from_row,
            )
            .optional()?)
    }

    fn find_game_by_key(&self, game_key: &str) -> StoreResult<Option<CanonicalGame>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM games WHERE game_key = ?1", GAME_COLUMNS),
                params![game_key],
                game_from_row,
            )
            .optional()?)
    }

    fn find_games_by_date(&self, date: NaiveDate) -> StoreResult<Vec<CanonicalGame>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM games WHERE game_date = ?1 ORDER BY game_key",
            GAME_COLUMNS
        ))?;
        let rows = stmt.query_map(params![date.format(DATE_FORMAT).to_string()], game_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_team_by_id(&self, team_id: i64) -> StoreResult<Option<Team>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {} FROM teams WHERE team_id = ?1", TEAM_COLUMNS),
                params![team_id],
                team_from_row,
            )
            .optional()?)
    }

    fn find_team_by_name(&self, name: &str) -> StoreResult<Option<Team>> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let exact_name = format!(
            "SELECT {} FROM teams WHERE team_name = ?1 ORDER BY team_id LIMIT 1",
            TEAM_COLUMNS
        );
        if let Some(team) = self.query_team(&exact_name, name)? {
            return Ok(Some(team));
        }

        let exact_full = format!(
            "SELECT {} FROM teams WHERE team_fullname = ?1 ORDER BY team_id LIMIT 1",
            TEAM_COLUMNS
        );
        if let Some(team) = self.query_team(&exact_full, name)? {
            return Ok(Some(team));
        }

        let partial = format!(
            "SELECT {} FROM teams
             WHERE instr(lower(team_name), lower(?1)) > 0
                OR instr(lower(team_fullname), lower(?1)) > 0
             ORDER BY team_id LIMIT 1",
            TEAM_COLUMNS
        );
        self.query_team(&partial, name)
    }

    fn create_team(&self, team: &NewTeam) -> StoreResult<Team> {
        self.conn.execute(
            r#"INSERT INTO teams
               (team_city, team_name, team_short, team_school_name, team_fullname)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
            params![
                team.city,
                team.name,
                team.short,
                team.school_name,
                team.full_name,
            ],
        )?;

        Ok(Team {
            team_id: self.conn.last_insert_rowid(),
            city: team.city.clone(),
            name: team.name.clone(),
            short: team.short.clone(),
            school_name: team.school_name.clone(),
            full_name: team.full_name.clone(),
        })
    }

    fn create_game(&self, game: &CanonicalGame) -> StoreResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO games ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                GAME_COLUMNS
            ),
            params![
                game.game_key,
                game.provider_id,
                game.date.map(|d| d.format(DATE_FORMAT).to_string()),
                game.season,
                game.location,
                game.team_one,
                game.team_two,
                game.team_one_score,
                game.team_two_score,
                game.winner,
                game.overtime,
                game.comments,
            ],
        )?;
        Ok(())
    }

    fn replace_derived_events(
        &self,
        game_key: &str,
        events: &[DerivedEvent],
    ) -> StoreResult<ReplaceOutcome> {
        self.transaction(|db: &Self| -> StoreResult<ReplaceOutcome> {
            let deleted = db.conn.execute(
                "DELETE FROM derived_events WHERE game_key = ?1",
                params![game_key],
            )?;

            let placeholders = vec!["?"; DERIVED_COLUMNS.split(',').count()].join(", ");
            let mut stmt = db.conn.prepare(&format!(
                "INSERT INTO derived_events ({}) VALUES ({})",
                DERIVED_COLUMNS, placeholders
            ))?;

            for e in events {
                stmt.execute(params![
                    game_key,
                    e.seq,
                    e.event_id,
                    e.period,
                    e.clock,
                    e.utc_time.map(|t| t.format(UTC_FORMAT).to_string()),
                    e.seconds_remaining,
                    e.game_percent_complete,
                    e.offense_team,
                    e.defense_team,
                    e.is_home_offense,
                    e.offense_player,
                    e.offense_player_id,
                    e.result_player,
                    e.result_player_id,
                    e.play_type,
                    e.play_result,
                    e.description,
                    e.tags,
                    e.play_number,
                    e.is_home,
                    e.after_timeout,
                    e.shot_quality,
                    e.points,
                    e.home_score,
                    e.away_score,
                    e.run_team.map(|s| s.label()),
                    e.run_points,
                    e.home_run,
                    e.away_run,
                    e.score_margin,
                    e.leading_label(),
                    e.score_margin_pct,
                    e.lead_changes,
                    e.largest_lead,
                    e.possession_number,
                    e.previous_play_type,
                    e.points_last_minute,
                    e.possessions_last_minute,
                    e.time_since_last_score,
                    e.bonus,
                    e.double_bonus,
                    e.timeouts_remaining_home,
                    e.timeouts_remaining_away,
                ])?;
            }

            Ok(ReplaceOutcome {
                deleted,
                inserted: events.len(),
            })
        })
    }

    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        // Already inside an outer transaction: join it
        if !self.conn.is_autocommit() {
            return f(self);
        }

        // Take the write lock up front so concurrent workers queue on the busy timeout
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        let out = f(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }
}

fn parse_date(text: Option<String>) -> Option<NaiveDate> {
    text.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok())
}

fn game_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalGame> {
    Ok(CanonicalGame {
        game_key: row.get(0)?,
        provider_id: row.get(1)?,
        date: parse_date(row.get(2)?),
        season: row.get(3)?,
        location: row.get(4)?,
        team_one: row.get(5)?,
        team_two: row.get(6)?,
        team_one_score: row.get(7)?,
        team_two_score: row.get(8)?,
        winner: row.get(9)?,
        overtime: row.get(10)?,
        comments: row.get(11)?,
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        team_id: row.get(0)?,
        city: row.get(1)?,
        name: row.get(2)?,
        short: row.get(3)?,
        school_name: row.get(4)?,
        full_name: row.get(5)?,
    })
}

fn derived_from_row(row: &Row<'_>) -> rusqlite::Result<DerivedEvent> {
    let utc_time: Option<String> = row.get(5)?;
    let run_team: Option<String> = row.get(26)?;
    let leading_team: String = row.get(31)?;

    Ok(DerivedEvent {
        game_key: row.get(0)?,
        seq: row.get(1)?,
        event_id: row.get(2)?,
        period: row.get(3)?,
        clock: row.get(4)?,
        utc_time: utc_time.and_then(|s| NaiveDateTime::parse_from_str(&s, UTC_FORMAT).ok()),
        seconds_remaining: row.get(6)?,
        game_percent_complete: row.get(7)?,
        offense_team: row.get(8)?,
        defense_team: row.get(9)?,
        is_home_offense: row.get(10)?,
        offense_player: row.get(11)?,
        offense_player_id: row.get(12)?,
        result_player: row.get(13)?,
        result_player_id: row.get(14)?,
        play_type: row.get(15)?,
        play_result: row.get(16)?,
        description: row.get(17)?,
        tags: row.get(18)?,
        play_number: row.get(19)?,
        is_home: row.get(20)?,
        after_timeout: row.get(21)?,
        shot_quality: row.get(22)?,
        points: row.get(23)?,
        home_score: row.get(24)?,
        away_score: row.get(25)?,
        run_team: run_team.as_deref().and_then(Side::parse),
        run_points: row.get(27)?,
        home_run: row.get(28)?,
        away_run: row.get(29)?,
        score_margin: row.get(30)?,
        leading_team: Side::parse(&leading_team),
        score_margin_pct: row.get(32)?,
        lead_changes: row.get(33)?,
        largest_lead: row.get(34)?,
        possession_number: row.get(35)?,
        previous_play_type: row.get(36)?,
        points_last_minute: row.get(37)?,
        possessions_last_minute: row.get(38)?,
        time_since_last_score: row.get(39)?,
        bonus: row.get(40)?,
        double_bonus: row.get(41)?,
        timeouts_remaining_home: row.get(42)?,
        timeouts_remaining_away: row.get(43)?,
    })
}
