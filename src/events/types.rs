//! Provider event types
//!
//! `Wire*` structs mirror the provider's JSON loosely: every field is optional
//! and nulls collapse to defaults. [`RawEvent`] is the cleaned-up record the
//! replay consumes.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::constants::POSSESSION_ITEM_SUFFIX;

/// Side of the court
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn from_is_home(is_home: bool) -> Self {
        if is_home { Side::Home } else { Side::Away }
    }

    pub fn opponent(&self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "home" => Some(Side::Home),
            "away" => Some(Side::Away),
            _ => None,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// LENIENT FIELD DECODING
// =============================================================================

/// Strings, numbers and booleans as text; null or missing as empty
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Option::<Value>::deserialize(d)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// True whenever the key appears, whatever its value (null included)
fn key_present<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    IgnoredAny::deserialize(d).map(|_| true)
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireNamed {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WirePlayer {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireTeam {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub abbr: String,
    #[serde(rename = "fullName", deserialize_with = "lenient_string")]
    pub full_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireGame {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "homeTeam", deserialize_with = "null_as_default")]
    pub home_team: WireTeam,
    #[serde(rename = "awayTeam", deserialize_with = "null_as_default")]
    pub away_team: WireTeam,
    pub date: Option<String>,
    #[serde(rename = "localDate")]
    pub local_date: Option<String>,
}

/// One element of the provider's event array
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireEvent {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub period: Option<i64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub clock: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub ishome: bool,
    pub utc: Option<String>,
    pub offense: Option<WireNamed>,
    pub defense: Option<WireNamed>,
    pub oplayer: Option<WirePlayer>,
    pub rplayer: Option<WirePlayer>,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub plays: Vec<Value>,
    #[serde(rename = "shotQuality", deserialize_with = "lenient_f64")]
    pub shot_quality: Option<f64>,
    #[serde(deserialize_with = "lenient_bool")]
    pub ato: bool,
    pub game: Option<WireGame>,
    #[serde(deserialize_with = "null_as_default")]
    pub items: Vec<PlayItem>,
    #[serde(rename = "actualFtMade", deserialize_with = "key_present")]
    pub actual_ft_made: bool,
    #[serde(deserialize_with = "key_present")]
    pub ftmade: bool,
}

// =============================================================================
// ITEMS
// =============================================================================

/// Typed sub-item of an event's `items` list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum PlayItem {
    /// Possession classification step (play type, then play result)
    PossessionPlay { name: String },
    /// Any other item shape
    Unknown { kind: Option<String> },
}

impl From<Value> for PlayItem {
    fn from(value: Value) -> Self {
        let kind = value
            .get("$type")
            .and_then(Value::as_str)
            .map(str::to_string);
        match kind {
            Some(k) if k.ends_with(POSSESSION_ITEM_SUFFIX) => PlayItem::PossessionPlay {
                name: value
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },
            kind => PlayItem::Unknown { kind },
        }
    }
}

/// Play type and play result: the first and second possession items
pub fn classify_items(items: &[PlayItem]) -> (Option<String>, Option<String>) {
    let mut names = items.iter().filter_map(|item| match item {
        PlayItem::PossessionPlay { name } => Some(name.clone()),
        PlayItem::Unknown { .. } => None,
    });
    let play_type = names.next();
    let play_result = names.next();
    (play_type, play_result)
}

// =============================================================================
// DOMAIN RECORDS
// =============================================================================

/// Team as described inside an event file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamMeta {
    pub name: String,
    pub abbr: String,
    pub full_name: String,
}

impl From<WireTeam> for TeamMeta {
    fn from(team: WireTeam) -> Self {
        Self {
            name: team.name,
            abbr: team.abbr,
            full_name: team.full_name,
        }
    }
}

/// Game metadata embedded in every event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameMeta {
    pub provider_id: String,
    pub date: Option<NaiveDate>,
    pub home: TeamMeta,
    pub away: TeamMeta,
}

impl From<WireGame> for GameMeta {
    fn from(game: WireGame) -> Self {
        let date = parse_game_date(game.date.as_deref(), game.local_date.as_deref());
        Self {
            provider_id: game.id,
            date,
            home: game.home_team.into(),
            away: game.away_team.into(),
        }
    }
}

/// One provider event, cleaned up for replay
#[derive(Debug, Clone, Default)]
pub struct RawEvent {
    pub event_id: String,
    pub period: i64,
    /// Seconds remaining in the period as reported (0 = missing)
    pub clock: f64,
    pub is_home: bool,
    pub utc: Option<NaiveDateTime>,
    pub offense_team: String,
    pub defense_team: String,
    pub offense_player: String,
    pub offense_player_id: String,
    pub result_player: String,
    pub result_player_id: String,
    pub description: String,
    pub name: String,
    pub play_type: Option<String>,
    pub play_result: Option<String>,
    pub play_number: Option<i64>,
    pub after_timeout: bool,
    pub shot_quality: Option<f64>,
    /// A made-free-throw field was present on the record
    pub ft_made: bool,
    pub tags: Vec<Value>,
    pub game: Option<GameMeta>,
}

impl From<WireEvent> for RawEvent {
    fn from(wire: WireEvent) -> Self {
        let (play_type, item_result) = classify_items(&wire.items);
        let play_result = item_result.or_else(|| fallback_result(&wire.name, &wire.description));
        let utc = wire.utc.as_deref().and_then(|s| {
            let parsed = parse_utc(s);
            if parsed.is_none() {
                tracing::warn!("Could not parse UTC time: {}", s);
            }
            parsed
        });
        let offense = wire.oplayer.unwrap_or_default();
        let result = wire.rplayer.unwrap_or_default();

        Self {
            event_id: wire.id,
            period: wire.period.unwrap_or(1),
            clock: wire.clock.unwrap_or(0.0),
            is_home: wire.ishome,
            utc,
            offense_team: wire.offense.map(|t| t.name).unwrap_or_default(),
            defense_team: wire.defense.map(|t| t.name).unwrap_or_default(),
            offense_player: offense.name,
            offense_player_id: offense.id,
            result_player: result.name,
            result_player_id: result.id,
            after_timeout: wire.ato || wire.description.contains("Timeout"),
            description: wire.description,
            name: wire.name,
            play_type,
            play_result,
            play_number: wire.plays.first().and_then(Value::as_i64),
            shot_quality: wire.shot_quality,
            ft_made: wire.actual_ft_made || wire.ftmade,
            tags: wire.tags,
            game: wire.game.map(GameMeta::from),
        }
    }
}

/// Event name, or the text after the last `>` of the description
fn fallback_result(name: &str, description: &str) -> Option<String> {
    if !name.is_empty() {
        return Some(name.to_string());
    }
    description
        .rsplit_once('>')
        .map(|(_, tail)| tail.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a provider UTC timestamp, with or without sub-second precision
pub fn parse_utc(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Game date from `date`, falling back to the first 10 chars of `localDate`
pub fn parse_game_date(date: Option<&str>, local_date: Option<&str>) -> Option<NaiveDate> {
    date.and_then(parse_utc).map(|dt| dt.date()).or_else(|| {
        local_date
            .and_then(|s| s.get(..10))
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
    })
}
