// src/models/question.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::attempt::{Section, TbsType};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(format!("unknown difficulty '{}'", s)),
        }
    }
}

/// Represents the 'tbs_questions' catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TbsQuestion {
    pub id: i64,
    pub section: Section,
    pub tbs_type: TbsType,
    pub topic: String,
    pub subtopic: Option<String>,
    pub title: String,
    pub difficulty: Difficulty,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Raw query string for `GET /tbs/questions`.
/// Enum values are kept as strings so unknown values can be dropped instead of rejected.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListParams {
    pub section: Option<String>,
    pub tbs_type: Option<String>,
    pub topic: Option<String>,
    pub difficulty: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parsed catalog filter.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionFilter {
    pub section: Option<Section>,
    pub tbs_type: Option<TbsType>,
    /// Case-insensitive substring of the topic label.
    pub topic: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for QuestionFilter {
    fn default() -> Self {
        Self {
            section: None,
            tbs_type: None,
            topic: None,
            difficulty: None,
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl From<QuestionListParams> for QuestionFilter {
    fn from(params: QuestionListParams) -> Self {
        Self {
            section: params.section.and_then(|s| s.parse().ok()),
            tbs_type: params.tbs_type.and_then(|t| t.parse().ok()),
            topic: params
                .topic
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
            difficulty: params.difficulty.and_then(|d| d.parse().ok()),
            limit: params
                .limit
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
            offset: params.offset.unwrap_or(0).max(0),
        }
    }
}

impl QuestionFilter {
    /// In-process equivalent of the SQL WHERE clause.
    pub fn matches(&self, question: &TbsQuestion) -> bool {
        self.section.is_none_or(|s| question.section == s)
            && self.tbs_type.is_none_or(|t| question.tbs_type == t)
            && self.difficulty.is_none_or(|d| question.difficulty == d)
            && self.topic.as_ref().is_none_or(|needle| {
                question
                    .topic
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
    }
}

/// A catalog question annotated with the caller's history.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListing {
    #[serde(flatten)]
    pub question: TbsQuestion,
    /// Completed attempts by the caller.
    pub attempt_count: i64,
    /// Best completed score, `null` if never completed.
    pub best_score: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct QuestionPage {
    pub questions: Vec<QuestionListing>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
