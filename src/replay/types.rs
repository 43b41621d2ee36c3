//! Derived per-event output rows

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::events::Side;

/// One row of game context per input event.
///
/// Score, run, lead, foul and timeout fields reflect the game state through
/// and including this event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedEvent {
    // Identity
    pub event_id: String,
    pub game_key: String,
    /// Position in the file (0-based)
    pub seq: u32,

    // Time
    pub period: i64,
    /// Normalized seconds remaining in the period
    pub clock: f64,
    pub utc_time: Option<NaiveDateTime>,
    /// Seconds left in regulation (negative in extra time)
    pub seconds_remaining: f64,
    /// Percent of regulation elapsed (over 100 in extra time)
    pub game_percent_complete: f64,

    // Participants
    pub offense_team: String,
    pub defense_team: String,
    pub is_home_offense: bool,
    pub offense_player: String,
    pub offense_player_id: String,
    pub result_player: String,
    pub result_player_id: String,

    // Classification
    pub play_type: Option<String>,
    pub play_result: Option<String>,
    pub description: String,
    /// Provider tags as JSON text
    pub tags: String,
    pub play_number: Option<i64>,
    pub is_home: bool,
    pub after_timeout: bool,
    pub shot_quality: Option<f64>,
    pub points: u32,

    // Score context
    pub home_score: u32,
    pub away_score: u32,
    pub run_team: Option<Side>,
    pub run_points: u32,
    pub home_run: u32,
    pub away_run: u32,
    /// home - away
    pub score_margin: i64,
    /// None when tied
    pub leading_team: Option<Side>,
    pub score_margin_pct: f64,
    pub lead_changes: u32,
    pub largest_lead: u32,

    // Possessions and momentum
    pub possession_number: u32,
    pub previous_play_type: Option<String>,
    pub points_last_minute: u32,
    pub possessions_last_minute: u32,
    pub time_since_last_score: f64,

    // Situation
    pub bonus: bool,
    pub double_bonus: bool,
    pub timeouts_remaining_home: u32,
    pub timeouts_remaining_away: u32,
}

impl DerivedEvent {
    /// Leading side as stored: "home", "away" or "tie"
    pub fn leading_label(&self) -> &'static str {
        self.leading_team.map_or("tie", |s| s.label())
    }
}

#[cfg(test)]
impl DerivedEvent {
    /// Minimal row for storage tests
    pub(crate) fn sample(game_key: &str, seq: u32) -> Self {
        Self {
            event_id: format!("ev-{}", seq),
            game_key: game_key.to_string(),
            seq,
            period: 1,
            clock: 600.0 - seq as f64,
            utc_time: chrono::NaiveDate::from_ymd_opt(2024, 11, 5)
                .and_then(|d| d.and_hms_milli_opt(0, 10, seq, 250)),
            seconds_remaining: 2400.0 - seq as f64,
            game_percent_complete: 0.5,
            offense_team: "Hawks".to_string(),
            defense_team: "Owls".to_string(),
            is_home_offense: true,
            offense_player: "A. Guard".to_string(),
            offense_player_id: "17".to_string(),
            result_player: String::new(),
            result_player_id: String::new(),
            play_type: Some("Spot-Up".to_string()),
            play_result: None,
            description: "Spot-Up > Make 2 Pts".to_string(),
            tags: "[]".to_string(),
            play_number: Some(seq as i64),
            is_home: true,
            after_timeout: false,
            shot_quality: Some(0.5),
            points: 2,
            home_score: 2,
            away_score: 0,
            run_team: Some(Side::Home),
            run_points: 2,
            home_run: 2,
            away_run: 0,
            score_margin: 2,
            leading_team: Some(Side::Home),
            score_margin_pct: 100.0,
            lead_changes: 0,
            largest_lead: 2,
            possession_number: 1,
            previous_play_type: None,
            points_last_minute: 2,
            possessions_last_minute: 1,
            time_since_last_score: 0.0,
            bonus: false,
            double_bonus: false,
            timeouts_remaining_home: 5,
            timeouts_remaining_away: 4,
        }
    }
}
