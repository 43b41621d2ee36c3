//! Single-pass play-by-play replay
//!
//! Feeds a game's events through a [`GameRunningState`] in file order and
//! emits one [`DerivedEvent`] per input event. No look-ahead: each row only
//! depends on the events before it and the event itself.

use serde_json::Value;
use uuid::Uuid;

use super::state::GameRunningState;
use super::types::DerivedEvent;
use crate::constants::{GAME_SECONDS, PERIOD_SECONDS, REGULATION_PERIODS};
use crate::error::ReplayError;
use crate::events::{RawEvent, Side, classify_event};

/// Replay of one game
pub struct GameReplay {
    game_key: String,
    home_team: String,
    state: GameRunningState,
    seq: u32,
}

impl GameReplay {
    /// Start a replay; `home_team` decides which offense counts as home
    pub fn new(game_key: &str, home_team: &str) -> Self {
        Self {
            game_key: game_key.to_string(),
            home_team: home_team.to_string(),
            state: GameRunningState::new(),
            seq: 0,
        }
    }

    /// Apply the next event and snapshot the resulting context
    pub fn step(&mut self, event: &RawEvent) -> Result<DerivedEvent, ReplayError> {
        let index = self.seq as usize;
        if event.period < 1 {
            return Err(ReplayError::InvalidPeriod {
                index,
                period: event.period,
            });
        }
        if !event.clock.is_finite() || event.clock < 0.0 {
            return Err(ReplayError::InvalidClock {
                index,
                clock: event.clock,
            });
        }

        let event_id = self.event_id(event);
        let state = &mut self.state;
        let period = event.period;

        let clock = state.normalize_clock(event.clock);
        let previous_play_type = state.advance_play_type(event.play_type.as_deref());

        let classification = classify_event(event);
        let time_since_last_score = state.seconds_since_last_score(event.utc);
        let points = classification.points();
        state.apply_score(Side::from_is_home(event.is_home), points, event.utc);

        if let Some(side) = classification.timeout {
            state.charge_timeout(side);
        }

        let is_home_offense = !self.home_team.is_empty() && event.offense_team == self.home_team;
        let defending = Side::from_is_home(is_home_offense).opponent();
        if classification.foul {
            state.record_foul(period, defending);
        }

        let seconds_remaining = (REGULATION_PERIODS - period) as f64 * PERIOD_SECONDS + clock;
        let game_percent_complete = (GAME_SECONDS - seconds_remaining) / GAME_SECONDS * 100.0;

        let derived = DerivedEvent {
            event_id,
            game_key: self.game_key.clone(),
            seq: self.seq,
            period,
            clock,
            utc_time: event.utc,
            seconds_remaining,
            game_percent_complete,
            offense_team: event.offense_team.clone(),
            defense_team: event.defense_team.clone(),
            is_home_offense,
            offense_player: event.offense_player.clone(),
            offense_player_id: event.offense_player_id.clone(),
            result_player: event.result_player.clone(),
            result_player_id: event.result_player_id.clone(),
            play_type: event.play_type.clone(),
            play_result: event.play_result.clone(),
            description: event.description.clone(),
            tags: Value::Array(event.tags.clone()).to_string(),
            play_number: event.play_number,
            is_home: event.is_home,
            after_timeout: event.after_timeout,
            shot_quality: event.shot_quality,
            points,
            home_score: state.home_score,
            away_score: state.away_score,
            run_team: state.run_team,
            run_points: state.run_points(),
            home_run: state.home_run,
            away_run: state.away_run,
            score_margin: state.score_margin(),
            leading_team: state.leader(),
            score_margin_pct: state.score_margin_pct(),
            lead_changes: state.lead_changes,
            largest_lead: state.largest_lead,
            possession_number: state.possessions,
            previous_play_type,
            points_last_minute: state.points_last_minute,
            possessions_last_minute: state.possessions_last_minute,
            time_since_last_score,
            bonus: state.in_bonus(period, defending),
            double_bonus: state.in_double_bonus(period, defending),
            timeouts_remaining_home: state.timeouts_home,
            timeouts_remaining_away: state.timeouts_away,
        };

        self.seq += 1;
        Ok(derived)
    }

    /// Provider id, or a stable id derived from game key and position
    fn event_id(&self, event: &RawEvent) -> String {
        if !event.event_id.is_empty() {
            return event.event_id.clone();
        }
        let name = format!("{}:{}", self.game_key, self.seq);
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }
}

/// Replay a whole game; any invalid event aborts the replay
pub fn replay_game(
    game_key: &str,
    home_team: &str,
    events: &[RawEvent],
) -> Result<Vec<DerivedEvent>, ReplayError> {
    let mut replay = GameReplay::new(game_key, home_team);
    events.iter().map(|event| replay.step(event)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BONUS_FOULS, STARTING_TIMEOUTS};
    use crate::events::parse_utc;

    fn ev(description: &str, is_home: bool, clock: f64, period: i64) -> RawEvent {
        RawEvent {
            event_id: String::new(),
            period,
            clock,
            is_home,
            offense_team: if is_home { "Hawks" } else { "Owls" }.to_string(),
            defense_team: if is_home { "Owls" } else { "Hawks" }.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    fn at(event: RawEvent, utc: &str) -> RawEvent {
        RawEvent {
            utc: parse_utc(utc),
            ..event
        }
    }

    #[test]
    fn test_three_event_scenario() {
        let events = vec![
            ev("Spot-Up > Make 2 Pts", true, 600.0, 1),
            ev("Transition > Make 3 Pts", false, 550.0, 1),
            ev("Home Timeout", true, 0.0, 1),
        ];
        let rows = replay_game("G1", "Hawks", &events).unwrap();
        assert_eq!(rows.len(), 3);

        let scores: Vec<_> = rows.iter().map(|r| (r.home_score, r.away_score)).collect();
        assert_eq!(scores, vec![(2, 0), (2, 3), (2, 3)]);

        let leaders: Vec<_> = rows.iter().map(|r| r.leading_team).collect();
        assert_eq!(leaders, vec![Some(Side::Home), Some(Side::Away), Some(Side::Away)]);

        assert_eq!(rows[2].clock, 550.0);
        assert_eq!(rows[1].away_run, 3);
        assert_eq!(rows[1].home_run, 0);
        assert_eq!(rows[1].run_team, Some(Side::Away));
        assert_eq!(rows[1].lead_changes, 1);
        assert_eq!(rows[2].timeouts_remaining_home, STARTING_TIMEOUTS - 1);
        assert_eq!(rows[2].timeouts_remaining_away, STARTING_TIMEOUTS);
        assert!(rows[2].after_timeout || rows[2].description.contains("Timeout"));
    }

    #[test]
    fn test_clock_zero_after_245() {
        let events = vec![ev("Cut", true, 245.0, 2), ev("Jump Ball", false, 0.0, 2)];
        let rows = replay_game("G1", "Hawks", &events).unwrap();
        assert_eq!(rows[1].clock, 245.0);
        assert_eq!(rows[1].seconds_remaining, 2.0 * 600.0 + 245.0);
    }

    #[test]
    fn test_scores_monotonic_and_single_run() {
        let descriptions = [
            ("Make 2 Pts", true),
            ("Miss 3 Pts", false),
            ("Make 3 Pts", false),
            ("Free Throw > Make", false),
            ("Turnover", true),
            ("Make 2 Pts", true),
            ("Make 2 Pts", true),
            ("Make 3 Pts", false),
        ];
        let events: Vec<_> = descriptions
            .iter()
            .enumerate()
            .map(|(i, (d, home))| ev(d, *home, 600.0 - i as f64 * 10.0, 1))
            .collect();
        let rows = replay_game("G1", "Hawks", &events).unwrap();

        for pair in rows.windows(2) {
            assert!(pair[1].home_score >= pair[0].home_score);
            assert!(pair[1].away_score >= pair[0].away_score);
            assert!(pair[1].lead_changes >= pair[0].lead_changes);
        }
        for row in &rows {
            assert!(row.home_run == 0 || row.away_run == 0);
        }
        assert_eq!(rows.last().map(|r| (r.home_score, r.away_score)), Some((6, 7)));
        assert_eq!(rows[3].run_points, 4);
        assert_eq!(rows[6].home_run, 4);
        assert_eq!(rows[6].away_run, 0);
    }

    #[test]
    fn test_lead_changes_skip_ties() {
        let events = vec![
            ev("Make 2 Pts", true, 600.0, 1),
            ev("Make 2 Pts", false, 590.0, 1),
            ev("Make 2 Pts", true, 580.0, 1),
            ev("Make 3 Pts", false, 570.0, 1),
        ];
        let rows = replay_game("G1", "Hawks", &events).unwrap();
        let changes: Vec<_> = rows.iter().map(|r| r.lead_changes).collect();
        assert_eq!(changes, vec![0, 0, 0, 1]);
        assert_eq!(rows[1].leading_team, None);
        assert_eq!(rows[1].leading_label(), "tie");
        assert_eq!(rows[3].largest_lead, 2);
    }

    #[test]
    fn test_bonus_for_offense_against_defending_fouls() {
        // Home on offense; the away defense commits the fouls
        let mut events: Vec<_> = (0..BONUS_FOULS)
            .map(|i| ev("Shooting Foul", true, 500.0 - i as f64, 3))
            .collect();
        events.push(ev("Jump Shot", false, 400.0, 3));
        let rows = replay_game("G1", "Hawks", &events).unwrap();

        let last_foul = &rows[BONUS_FOULS as usize - 1];
        assert!(last_foul.is_home_offense);
        assert!(last_foul.bonus);
        assert!(!last_foul.double_bonus);
        assert!(!rows[BONUS_FOULS as usize - 2].bonus);

        // Away offense faces the home defense, which has no fouls
        assert!(!rows.last().unwrap().bonus);
    }

    #[test]
    fn test_possessions_and_previous_play_type() {
        let mut events = vec![
            ev("a", true, 600.0, 1),
            ev("b", true, 590.0, 1),
            ev("c", false, 580.0, 1),
            ev("d", false, 570.0, 1),
        ];
        events[0].play_type = Some("Spot-Up".to_string());
        events[1].play_type = Some("Cut".to_string());
        events[2].play_type = Some("Free Throw".to_string());
        events[3].play_type = Some("ISO".to_string());

        let rows = replay_game("G1", "Hawks", &events).unwrap();
        let poss: Vec<_> = rows.iter().map(|r| r.possession_number).collect();
        assert_eq!(poss, vec![1, 1, 1, 2]);
        assert_eq!(rows[0].previous_play_type, None);
        assert_eq!(rows[3].previous_play_type.as_deref(), Some("Free Throw"));
    }

    #[test]
    fn test_momentum_and_time_since_score() {
        let events = vec![
            at(ev("Make 2 Pts", true, 600.0, 1), "2024-11-05T00:00:00Z"),
            at(ev("Make 3 Pts", false, 580.0, 1), "2024-11-05T00:00:20.500Z"),
            at(ev("Rebound", true, 560.0, 1), "2024-11-05T00:00:40Z"),
            at(ev("Make 2 Pts", true, 520.0, 1), "2024-11-05T00:01:10Z"),
        ];
        let rows = replay_game("G1", "Hawks", &events).unwrap();

        assert_eq!(rows[1].points_last_minute, 5);
        assert_eq!(rows[1].possessions_last_minute, 2);
        assert_eq!(rows[1].time_since_last_score, 20.5);
        assert_eq!(rows[2].time_since_last_score, 19.5);
        assert_eq!(rows[2].points_last_minute, 5);
        // The 00:00:00 score has left the window by 00:01:10
        assert_eq!(rows[3].points_last_minute, 5);
        assert_eq!(rows[3].possessions_last_minute, 2);
        assert_eq!(rows[3].time_since_last_score, 49.5);
        assert_eq!(rows[0].time_since_last_score, 0.0);
    }

    #[test]
    fn test_extra_time_completion() {
        let rows = replay_game("G1", "Hawks", &[ev("Jump Ball", true, 300.0, 5)]).unwrap();
        assert_eq!(rows[0].seconds_remaining, -300.0);
        assert!(rows[0].game_percent_complete > 100.0);

        let rows = replay_game("G1", "Hawks", &[ev("Jump Ball", true, 600.0, 1)]).unwrap();
        assert_eq!(rows[0].game_percent_complete, 0.0);
    }

    #[test]
    fn test_margin_pct_zero_before_scoring() {
        let rows = replay_game("G1", "Hawks", &[ev("Jump Ball", true, 600.0, 1)]).unwrap();
        assert_eq!(rows[0].score_margin_pct, 0.0);
        assert_eq!(rows[0].score_margin, 0);
    }

    #[test]
    fn test_generated_event_ids_are_stable() {
        let events = vec![ev("a", true, 600.0, 1), ev("b", true, 590.0, 1)];
        let first = replay_game("G1", "Hawks", &events).unwrap();
        let second = replay_game("G1", "Hawks", &events).unwrap();
        assert_eq!(first, second);
        assert_ne!(first[0].event_id, first[1].event_id);

        let other_game = replay_game("G2", "Hawks", &events).unwrap();
        assert_ne!(first[0].event_id, other_game[0].event_id);

        let mut named = events.clone();
        named[0].event_id = "provider-1".to_string();
        let rows = replay_game("G1", "Hawks", &named).unwrap();
        assert_eq!(rows[0].event_id, "provider-1");
    }

    #[test]
    fn test_invalid_events_abort_replay() {
        let events = vec![ev("a", true, 600.0, 1), ev("b", true, 590.0, 0)];
        let err = replay_game("G1", "Hawks", &events).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidPeriod { index: 1, period: 0 }));

        let events = vec![ev("a", true, -1.0, 1)];
        assert!(matches!(
            replay_game("G1", "Hawks", &events),
            Err(ReplayError::InvalidClock { index: 0, .. })
        ));
    }
}
