//! Game key construction

use chrono::{Datelike, NaiveDate};

use crate::constants::{CONSTRUCTED_KEY_PREFIX, PLACEHOLDER_PREFIX, PLACEHOLDER_SUFFIX_LEN};

/// Placeholder key for a provider id.
///
/// Uses the last [`PLACEHOLDER_SUFFIX_LEN`] characters of the id, so the same
/// id always lands on the same placeholder. Without an id the caller's
/// `fallback_ordinal` stands in.
pub fn placeholder_key(provider_id: Option<&str>, fallback_ordinal: usize) -> String {
    match provider_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => {
            let chars: Vec<char> = id.chars().collect();
            let start = chars.len().saturating_sub(PLACEHOLDER_SUFFIX_LEN);
            let suffix: String = chars[start..].iter().collect();
            format!("{}{}", PLACEHOLDER_PREFIX, suffix)
        }
        None => format!("{}{}", PLACEHOLDER_PREFIX, fallback_ordinal),
    }
}

/// Candidate keys built from the date and both team short codes, home first
pub fn constructed_keys(date: NaiveDate, home_short: &str, away_short: &str) -> [String; 2] {
    let day = date.format("%Y%m%d");
    [
        format!("{}{}{}{}", CONSTRUCTED_KEY_PREFIX, day, home_short, away_short),
        format!("{}{}{}{}", CONSTRUCTED_KEY_PREFIX, day, away_short, home_short),
    ]
}

/// Season label such as "2024-25"; "Unknown" without a date
pub fn season_label(date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => {
            let year = date.year();
            format!("{}-{:02}", year, (year + 1).rem_euclid(100))
        }
        None => "Unknown".to_string(),
    }
}
