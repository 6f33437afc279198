// src/analytics/mastery.rs

use serde::{Deserialize, Serialize};

/// Accuracy at which a topic stops being weak.
pub const MODERATE_FROM: f64 = 60.0;
/// Accuracy at which a topic counts as mastered.
pub const MASTERED_FROM: f64 = 75.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Weak,
    Moderate,
    Mastered,
}

/// Lower bounds (inclusive) of the moderate and mastered bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MasteryThresholds {
    pub moderate_from: f64,
    pub mastered_from: f64,
}

impl Default for MasteryThresholds {
    fn default() -> Self {
        Self {
            moderate_from: MODERATE_FROM,
            mastered_from: MASTERED_FROM,
        }
    }
}

impl MasteryThresholds {
    /// Maps an accuracy percentage to a band.
    ///
    /// Only meaningful for topics with at least one scored attempt; use
    /// [`MasteryThresholds::status`] when the attempt count may be zero.
    pub fn classify(&self, accuracy: f64) -> MasteryLevel {
        if accuracy >= self.mastered_from {
            MasteryLevel::Mastered
        } else if accuracy >= self.moderate_from {
            MasteryLevel::Moderate
        } else {
            MasteryLevel::Weak
        }
    }

    /// Classification guarded by the attempt count: a topic nobody has
    /// scored on is `NotStarted`, never `Weak`.
    pub fn status(&self, scored_attempts: i64, accuracy: Option<f64>) -> TopicStatus {
        match accuracy {
            Some(accuracy) if scored_attempts > 0 => self.classify(accuracy).into(),
            _ => TopicStatus::NotStarted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    NotStarted,
    Weak,
    Moderate,
    Mastered,
}

impl From<MasteryLevel> for TopicStatus {
    fn from(level: MasteryLevel) -> Self {
        match level {
            MasteryLevel::Weak => TopicStatus::Weak,
            MasteryLevel::Moderate => TopicStatus::Moderate,
            MasteryLevel::Mastered => TopicStatus::Mastered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries_are_inclusive_on_the_upper_band() {
        let t = MasteryThresholds::default();
        assert_eq!(t.classify(0.0), MasteryLevel::Weak);
        assert_eq!(t.classify(59.99), MasteryLevel::Weak);
        assert_eq!(t.classify(60.0), MasteryLevel::Moderate);
        assert_eq!(t.classify(74.99), MasteryLevel::Moderate);
        assert_eq!(t.classify(75.0), MasteryLevel::Mastered);
        assert_eq!(t.classify(100.0), MasteryLevel::Mastered);
    }

    #[test]
    fn custom_thresholds_move_the_bands() {
        let t = MasteryThresholds {
            moderate_from: 50.0,
            mastered_from: 90.0,
        };
        assert_eq!(t.classify(55.0), MasteryLevel::Moderate);
        assert_eq!(t.classify(85.0), MasteryLevel::Moderate);
        assert_eq!(t.classify(90.0), MasteryLevel::Mastered);
    }

    #[test]
    fn untouched_topic_is_not_started_rather_than_weak() {
        let t = MasteryThresholds::default();
        assert_eq!(t.status(0, None), TopicStatus::NotStarted);
        assert_eq!(t.status(0, Some(0.0)), TopicStatus::NotStarted);
        assert_eq!(t.status(2, Some(40.0)), TopicStatus::Weak);
        assert_eq!(t.status(1, Some(80.0)), TopicStatus::Mastered);
    }
}
