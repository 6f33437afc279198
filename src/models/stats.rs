// src/models/stats.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::mastery::{MasteryLevel, TopicStatus};

/// Response body of the stats endpoint.
///
/// Maps are ordered by key so two results built from the same data
/// serialize to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResult {
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub unique_questions: i64,
    pub average_score: Option<f64>,
    pub average_time_minutes: Option<f64>,
    pub by_type: BTreeMap<String, f64>,
    pub by_topic: BTreeMap<String, f64>,
    pub strong_topics: Vec<TopicScore>,
    pub weak_topics: Vec<TopicScore>,
}

/// A topic's average, as it appears in the strong/weak lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicScore {
    pub topic: String,
    pub average_score: f64,
    /// Number of scored attempts behind the average.
    pub attempts: i64,
    pub mastery: MasteryLevel,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub stats: StatsResult,
}

/// Per-topic progress, including topics the user has not touched yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicProgress {
    pub topic: String,
    pub attempts: i64,
    pub average_score: Option<f64>,
    pub status: TopicStatus,
}

#[derive(Debug, Serialize)]
pub struct MasteryResponse {
    pub topics: Vec<TopicProgress>,
}
