//! Running game state
//!
//! One [`GameRunningState`] lives for exactly one game replay. It is mutated
//! event by event and dropped once the file is consumed.

use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, VecDeque};

use crate::constants::{
    BONUS_FOULS, DOUBLE_BONUS_FOULS, MOMENTUM_WINDOW_SECS, STARTING_TIMEOUTS,
    is_possession_play_type,
};
use crate::events::Side;

#[derive(Debug, Clone, Copy)]
struct WindowEntry {
    time: NaiveDateTime,
    points: u32,
    is_possession: bool,
}

/// Scoring events of the trailing 60 seconds
#[derive(Debug, Clone, Default)]
pub struct MomentumWindow {
    entries: VecDeque<WindowEntry>,
}

impl MomentumWindow {
    /// Add a scoring event and drop everything older than the window
    pub fn record(&mut self, time: NaiveDateTime, points: u32, is_possession: bool) {
        self.entries.push_back(WindowEntry {
            time,
            points,
            is_possession,
        });
        let cutoff = time - Duration::seconds(MOMENTUM_WINDOW_SECS);
        self.entries.retain(|e| e.time > cutoff);
    }

    pub fn points(&self) -> u32 {
        self.entries.iter().map(|e| e.points).sum()
    }

    pub fn possessions(&self) -> u32 {
        self.entries.iter().filter(|e| e.is_possession).count() as u32
    }
}

/// Team fouls in one period, by the side that committed them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodFouls {
    pub home: u32,
    pub away: u32,
}

impl PeriodFouls {
    pub fn get(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }

    fn increment(&mut self, side: Side) {
        match side {
            Side::Home => self.home += 1,
            Side::Away => self.away += 1,
        }
    }
}

/// Cumulative context of one game being replayed
#[derive(Debug, Clone)]
pub struct GameRunningState {
    pub home_score: u32,
    pub away_score: u32,
    pub home_run: u32,
    pub away_run: u32,
    /// Side currently on a run
    pub run_team: Option<Side>,
    /// Last side to hold a lead (ties do not clear it)
    pub last_leader: Option<Side>,
    pub lead_changes: u32,
    pub largest_lead: u32,
    pub possessions: u32,
    pub timeouts_home: u32,
    pub timeouts_away: u32,
    pub points_last_minute: u32,
    pub possessions_last_minute: u32,
    fouls: BTreeMap<i64, PeriodFouls>,
    window: MomentumWindow,
    prev_play_type: Option<String>,
    last_score_time: Option<NaiveDateTime>,
    last_clock: f64,
}

impl Default for GameRunningState {
    fn default() -> Self {
        Self {
            home_score: 0,
            away_score: 0,
            home_run: 0,
            away_run: 0,
            run_team: None,
            last_leader: None,
            lead_changes: 0,
            largest_lead: 0,
            possessions: 0,
            timeouts_home: STARTING_TIMEOUTS,
            timeouts_away: STARTING_TIMEOUTS,
            points_last_minute: 0,
            possessions_last_minute: 0,
            fouls: BTreeMap::new(),
            window: MomentumWindow::default(),
            prev_play_type: None,
            last_score_time: None,
            last_clock: 0.0,
        }
    }
}

impl GameRunningState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute the last non-zero clock for a zero clock
    pub fn normalize_clock(&mut self, clock: f64) -> f64 {
        if clock == 0.0 {
            self.last_clock
        } else {
            self.last_clock = clock;
            clock
        }
    }

    /// Count a possession on the edge into a possession-starting play type.
    ///
    /// Returns the previous event's play type.
    pub fn advance_play_type(&mut self, play_type: Option<&str>) -> Option<String> {
        let previous = self.prev_play_type.take();
        if is_possession_play_type(play_type) && !is_possession_play_type(previous.as_deref()) {
            self.possessions += 1;
        }
        self.prev_play_type = play_type.map(str::to_string);
        previous
    }

    /// Seconds from the last scoring moment to `now` (0 if either is unknown)
    pub fn seconds_since_last_score(&self, now: Option<NaiveDateTime>) -> f64 {
        match (self.last_score_time, now) {
            (Some(last), Some(now)) => (now - last).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        }
    }

    /// Apply `points` scored by `side`
    pub fn apply_score(&mut self, side: Side, points: u32, time: Option<NaiveDateTime>) {
        if points == 0 {
            return;
        }

        match side {
            Side::Home => {
                self.home_score += points;
                self.home_run += points;
                self.away_run = 0;
            }
            Side::Away => {
                self.away_score += points;
                self.away_run += points;
                self.home_run = 0;
            }
        }
        self.run_team = Some(side);

        if let Some(current) = self.leader() {
            if self.last_leader.is_some_and(|prev| prev != current) {
                self.lead_changes += 1;
            }
            self.last_leader = Some(current);
        }
        self.largest_lead = self.largest_lead.max(self.home_score.abs_diff(self.away_score));

        self.last_score_time = time;
        if let Some(time) = time {
            self.window.record(time, points, true);
            self.points_last_minute = self.window.points();
            self.possessions_last_minute = self.window.possessions();
        }
    }

    /// Charge a timeout to `side`, never going below zero
    pub fn charge_timeout(&mut self, side: Side) {
        let remaining = match side {
            Side::Home => &mut self.timeouts_home,
            Side::Away => &mut self.timeouts_away,
        };
        *remaining = remaining.saturating_sub(1);
    }

    /// Record a foul committed by `defending` in `period`
    pub fn record_foul(&mut self, period: i64, defending: Side) {
        self.fouls.entry(period).or_default().increment(defending);
    }

    pub fn fouls(&self, period: i64, side: Side) -> u32 {
        self.fouls.get(&period).map_or(0, |f| f.get(side))
    }

    /// Offense is in the bonus against `defending`
    pub fn in_bonus(&self, period: i64, defending: Side) -> bool {
        self.fouls(period, defending) >= BONUS_FOULS
    }

    pub fn in_double_bonus(&self, period: i64, defending: Side) -> bool {
        self.fouls(period, defending) >= DOUBLE_BONUS_FOULS
    }

    /// Side currently ahead, None when tied
    pub fn leader(&self) -> Option<Side> {
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => Some(Side::Home),
            std::cmp::Ordering::Less => Some(Side::Away),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Length of the current run
    pub fn run_points(&self) -> u32 {
        match self.run_team {
            Some(Side::Home) => self.home_run,
            Some(Side::Away) => self.away_run,
            None => 0,
        }
    }

    /// home - away
    pub fn score_margin(&self) -> i64 {
        self.home_score as i64 - self.away_score as i64
    }

    /// Margin as a percentage of all points scored (0 before any score)
    pub fn score_margin_pct(&self) -> f64 {
        let total = self.home_score + self.away_score;
        if total == 0 {
            0.0
        } else {
            self.score_margin() as f64 / total as f64 * 100.0
        }
    }

    pub fn timeouts(&self, side: Side) -> u32 {
        match side {
            Side::Home => self.timeouts_home,
            Side::Away => self.timeouts_away,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(secs: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::seconds(secs as i64)
    }

    #[test]
    fn test_clock_substitution() {
        let mut state = GameRunningState::new();
        assert_eq!(state.normalize_clock(0.0), 0.0);
        assert_eq!(state.normalize_clock(245.0), 245.0);
        assert_eq!(state.normalize_clock(0.0), 245.0);
        assert_eq!(state.normalize_clock(0.0), 245.0);
        assert_eq!(state.normalize_clock(12.5), 12.5);
    }

    #[test]
    fn test_possession_edges() {
        let mut state = GameRunningState::new();
        assert_eq!(state.advance_play_type(Some("Spot-Up")), None);
        assert_eq!(state.possessions, 1);

        // Level, not edge: consecutive possession types count once
        assert_eq!(state.advance_play_type(Some("Cut")).as_deref(), Some("Spot-Up"));
        assert_eq!(state.possessions, 1);

        state.advance_play_type(Some("Free Throw"));
        state.advance_play_type(None);
        state.advance_play_type(Some("ISO"));
        assert_eq!(state.possessions, 2);
    }

    #[test]
    fn test_runs_and_lead_changes() {
        let mut state = GameRunningState::new();
        state.apply_score(Side::Home, 2, None);
        assert_eq!((state.home_run, state.away_run), (2, 0));
        assert_eq!(state.lead_changes, 0);

        state.apply_score(Side::Home, 3, None);
        assert_eq!(state.run_points(), 5);

        state.apply_score(Side::Away, 3, None);
        assert_eq!((state.home_run, state.away_run), (0, 3));
        assert_eq!(state.run_team, Some(Side::Away));
        assert_eq!(state.lead_changes, 0);

        // Tie does not count, the flip afterwards does
        state.apply_score(Side::Away, 2, None);
        assert_eq!(state.leader(), None);
        assert_eq!(state.lead_changes, 0);
        state.apply_score(Side::Away, 1, None);
        assert_eq!(state.leader(), Some(Side::Away));
        assert_eq!(state.lead_changes, 1);
        assert_eq!(state.largest_lead, 5);
    }

    #[test]
    fn test_tie_then_same_leader_is_not_a_change() {
        let mut state = GameRunningState::new();
        state.apply_score(Side::Home, 2, None);
        state.apply_score(Side::Away, 2, None);
        state.apply_score(Side::Home, 1, None);
        assert_eq!(state.lead_changes, 0);
        assert_eq!(state.last_leader, Some(Side::Home));
    }

    #[test]
    fn test_momentum_window() {
        let mut state = GameRunningState::new();
        state.apply_score(Side::Home, 2, Some(at(0)));
        state.apply_score(Side::Away, 3, Some(at(30)));
        assert_eq!(state.points_last_minute, 5);
        assert_eq!(state.possessions_last_minute, 2);

        // Exactly 60 s later the first entry falls out
        state.apply_score(Side::Home, 1, Some(at(60)));
        assert_eq!(state.points_last_minute, 4);
        assert_eq!(state.possessions_last_minute, 2);

        state.apply_score(Side::Home, 2, Some(at(200)));
        assert_eq!(state.points_last_minute, 2);
        assert_eq!(state.seconds_since_last_score(Some(at(215))), 15.0);
        assert_eq!(state.seconds_since_last_score(None), 0.0);
    }

    #[test]
    fn test_timeouts_floor_at_zero() {
        let mut state = GameRunningState::new();
        for _ in 0..(STARTING_TIMEOUTS + 2) {
            state.charge_timeout(Side::Away);
        }
        assert_eq!(state.timeouts(Side::Away), 0);
        assert_eq!(state.timeouts(Side::Home), STARTING_TIMEOUTS);
    }

    #[test]
    fn test_bonus_thresholds_per_period() {
        let mut state = GameRunningState::new();
        for _ in 0..BONUS_FOULS {
            state.record_foul(1, Side::Away);
        }
        assert!(state.in_bonus(1, Side::Away));
        assert!(!state.in_double_bonus(1, Side::Away));
        assert!(!state.in_bonus(1, Side::Home));
        assert!(!state.in_bonus(2, Side::Away));

        for _ in BONUS_FOULS..DOUBLE_BONUS_FOULS {
            state.record_foul(1, Side::Away);
        }
        assert!(state.in_double_bonus(1, Side::Away));
        assert_eq!(state.fouls(1, Side::Away), DOUBLE_BONUS_FOULS);
    }

    #[test]
    fn test_margin_pct() {
        let mut state = GameRunningState::new();
        assert_eq!(state.score_margin_pct(), 0.0);
        state.apply_score(Side::Home, 3, None);
        state.apply_score(Side::Away, 1, None);
        assert_eq!(state.score_margin(), 2);
        assert_eq!(state.score_margin_pct(), 50.0);
    }
}
