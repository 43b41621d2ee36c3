//! Description classifier
//!
//! The provider has no structured points-scored field, so scoring, timeouts
//! and fouls are read from the free-text description. This is a heuristic:
//! descriptions that word a make differently are missed (false negatives).

use super::types::{RawEvent, Side};

/// Kind of made shot found in a description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreKind {
    FreeThrow,
    TwoPoint,
    ThreePoint,
}

impl ScoreKind {
    pub fn points(&self) -> u32 {
        match self {
            ScoreKind::FreeThrow => 1,
            ScoreKind::TwoPoint => 2,
            ScoreKind::ThreePoint => 3,
        }
    }
}

/// Everything the description says about one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Classification {
    pub score: Option<ScoreKind>,
    /// Side charged with a timeout
    pub timeout: Option<Side>,
    /// A foul was committed by the defense
    pub foul: bool,
}

impl Classification {
    pub fn points(&self) -> u32 {
        self.score.map_or(0, |s| s.points())
    }
}

/// Classify a description.
///
/// `is_home` attributes timeouts that do not name a side; `ft_made` is set
/// when the record carried a made-free-throw field.
pub fn classify_description(description: &str, is_home: bool, ft_made: bool) -> Classification {
    let score = if description.contains("Make 2 Pts") {
        Some(ScoreKind::TwoPoint)
    } else if description.contains("Make 3 Pts") {
        Some(ScoreKind::ThreePoint)
    } else if description.contains("Free Throw") && (ft_made || description.contains("Make")) {
        Some(ScoreKind::FreeThrow)
    } else {
        None
    };

    let timeout = if description.contains("Timeout") {
        let lower = description.to_lowercase();
        if lower.contains("home") {
            Some(Side::Home)
        } else if lower.contains("away") {
            Some(Side::Away)
        } else {
            Some(Side::from_is_home(is_home))
        }
    } else {
        None
    };

    Classification {
        score,
        timeout,
        foul: description.contains("Foul"),
    }
}

/// Classify a decoded event
pub fn classify_event(event: &RawEvent) -> Classification {
    classify_description(&event.description, event.is_home, event.ft_made)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_goals() {
        let c = classify_description("Spot-Up > Jump Shot > Make 2 Pts", true, false);
        assert_eq!(c.score, Some(ScoreKind::TwoPoint));
        assert_eq!(c.points(), 2);

        let c = classify_description("Transition > Make 3 Pts", false, false);
        assert_eq!(c.points(), 3);

        let c = classify_description("Spot-Up > Jump Shot > Miss 3 Pts", false, false);
        assert_eq!(c.score, None);
        assert_eq!(c.points(), 0);
    }

    #[test]
    fn test_free_throws() {
        assert_eq!(
            classify_description("Free Throw > 1 of 2", true, true).points(),
            1
        );
        assert_eq!(
            classify_description("Free Throw > Make", true, false).points(),
            1
        );
        assert_eq!(
            classify_description("Free Throw > Miss", true, false).points(),
            0
        );
    }

    #[test]
    fn test_timeouts() {
        let c = classify_description("Home Timeout", false, false);
        assert_eq!(c.timeout, Some(Side::Home));

        let c = classify_description("Timeout > Away", true, false);
        assert_eq!(c.timeout, Some(Side::Away));

        let c = classify_description("Team Timeout", false, false);
        assert_eq!(c.timeout, Some(Side::Away));

        assert_eq!(classify_description("Jump Ball", true, false).timeout, None);
    }

    #[test]
    fn test_foul_alongside_make() {
        let c = classify_description("Post-Up > Make 2 Pts > Shooting Foul", true, false);
        assert!(c.foul);
        assert_eq!(c.points(), 2);
        assert!(!classify_description("Turnover", true, false).foul);
    }
}
