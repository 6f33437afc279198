// src/models/attempt.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use validator::Validate;

/// CPA exam sections. Three core sections plus the three disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Section {
    Aud,
    Bar,
    Far,
    Isc,
    Reg,
    Tcp,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Aud,
        Section::Bar,
        Section::Far,
        Section::Isc,
        Section::Reg,
        Section::Tcp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Aud => "AUD",
            Section::Bar => "BAR",
            Section::Far => "FAR",
            Section::Isc => "ISC",
            Section::Reg => "REG",
            Section::Tcp => "TCP",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = String;

    /// Case-insensitive, so `far` and `FAR` both resolve.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown section '{}'", s))
    }
}

/// Task-based simulation categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TbsType {
    JournalEntry,
    DocumentReview,
    Reconciliation,
    Calculation,
    Research,
    Analysis,
}

impl TbsType {
    pub const ALL: [TbsType; 6] = [
        TbsType::JournalEntry,
        TbsType::DocumentReview,
        TbsType::Reconciliation,
        TbsType::Calculation,
        TbsType::Research,
        TbsType::Analysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TbsType::JournalEntry => "journal_entry",
            TbsType::DocumentReview => "document_review",
            TbsType::Reconciliation => "reconciliation",
            TbsType::Calculation => "calculation",
            TbsType::Research => "research",
            TbsType::Analysis => "analysis",
        }
    }
}

impl fmt::Display for TbsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TbsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TbsType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("unknown tbs type '{}'", s))
    }
}

/// One user interaction with a simulation, joined with the question's
/// classification (section, type, topic).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub section: Section,
    pub tbs_type: Option<TbsType>,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub completed: bool,

    /// Percentage in [0, 100]. `None` until the attempt has been scored.
    pub score_percentage: Option<f64>,
    pub time_spent_seconds: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AttemptRecord {
    /// Score that may contribute to aggregates: only completed attempts count.
    pub fn counted_score(&self) -> Option<f64> {
        if self.completed { self.score_percentage } else { None }
    }

    pub fn counted_time(&self) -> Option<i64> {
        if self.completed { self.time_spent_seconds } else { None }
    }

    /// Topic label used as a grouping key. Blank labels group nowhere.
    pub fn topic_key(&self) -> Option<&str> {
        self.topic.as_deref().and_then(topic_key)
    }
}

/// Padding stripped from topic labels before grouping. Kept in step with the
/// `BTRIM(topic, E' \t\n\r')` calls in SQL; other Unicode whitespace is part
/// of the label on both sides.
pub const TOPIC_PADDING: [char; 4] = [' ', '\t', '\n', '\r'];

/// Normalized grouping key for a raw topic label, `None` when blank.
pub fn topic_key(raw: &str) -> Option<&str> {
    let topic = raw.trim_matches(TOPIC_PADDING);
    (!topic.is_empty()).then_some(topic)
}

/// DTO for recording an attempt against a question.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAttemptRequest {
    pub completed: bool,
    #[validate(range(min = 0.0, max = 100.0, message = "Score must be between 0 and 100"))]
    pub score_percentage: Option<f64>,
    #[validate(range(min = 0, message = "Time spent cannot be negative"))]
    pub time_spent_seconds: Option<i64>,
}

impl SubmitAttemptRequest {
    /// Field ranges are checked by `validate()`; this covers the rule that
    /// an unfinished attempt cannot carry a score.
    pub fn check_consistency(&self) -> Result<(), String> {
        if !self.completed && self.score_percentage.is_some() {
            return Err("An incomplete attempt cannot have a score".to_string());
        }
        Ok(())
    }
}

/// Insert payload handed to the repository.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub question_id: i64,
    pub completed: bool,
    pub score_percentage: Option<f64>,
    pub time_spent_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_parses_case_insensitively() {
        assert_eq!("far".parse::<Section>(), Ok(Section::Far));
        assert_eq!(" TCP ".parse::<Section>(), Ok(Section::Tcp));
        assert!("BEC".parse::<Section>().is_err());
    }

    #[test]
    fn tbs_type_round_trips_through_str() {
        for t in TbsType::ALL {
            assert_eq!(t.as_str().parse::<TbsType>(), Ok(t));
        }
        assert!("essay".parse::<TbsType>().is_err());
    }

    #[test]
    fn topic_key_strips_only_ascii_padding() {
        assert_eq!(topic_key("Leases\t"), Some("Leases"));
        assert_eq!(topic_key(" \r\nBonds \n"), Some("Bonds"));
        assert_eq!(topic_key("\t"), None);
        assert_eq!(topic_key("   "), None);
        // Non-breaking space is not padding in SQL BTRIM either.
        assert_eq!(topic_key("Leases\u{a0}"), Some("Leases\u{a0}"));
        assert_eq!(topic_key("\u{a0}"), Some("\u{a0}"));
    }

    #[test]
    fn incomplete_attempt_with_score_is_rejected() {
        let req = SubmitAttemptRequest {
            completed: false,
            score_percentage: Some(50.0),
            time_spent_seconds: None,
        };
        assert!(req.check_consistency().is_err());
    }

    #[test]
    fn out_of_range_score_fails_validation() {
        let req = SubmitAttemptRequest {
            completed: true,
            score_percentage: Some(120.0),
            time_spent_seconds: Some(30),
        };
        assert!(req.validate().is_err());
    }
}
