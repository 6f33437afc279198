// src/analytics/ranking.rs

use std::cmp::Ordering;

use crate::models::stats::TopicScore;

/// Single cut separating strong from weak topics. Deliberately separate
/// from the three-band mastery thresholds.
pub const STRONG_TOPIC_CUT: f64 = 75.0;
pub const RANKED_TOPIC_LIMIT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingPolicy {
    /// Averages at or above this are strong, below it weak.
    pub strong_from: f64,
    /// Maximum entries in each list.
    pub limit: usize,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            strong_from: STRONG_TOPIC_CUT,
            limit: RANKED_TOPIC_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedTopics {
    /// Best first.
    pub strong: Vec<TopicScore>,
    /// Worst first.
    pub weak: Vec<TopicScore>,
}

/// Descending by average, ties by label ascending.
fn best_first(a: &TopicScore, b: &TopicScore) -> Ordering {
    b.average_score
        .total_cmp(&a.average_score)
        .then_with(|| a.topic.cmp(&b.topic))
}

/// Ascending by average, ties by label ascending.
fn worst_first(a: &TopicScore, b: &TopicScore) -> Ordering {
    a.average_score
        .total_cmp(&b.average_score)
        .then_with(|| a.topic.cmp(&b.topic))
}

/// Splits topics at the strong cut and keeps at most `limit` of each side.
/// Lists are never padded when fewer topics qualify.
pub fn rank_topics(topics: &[TopicScore], policy: &RankingPolicy) -> RankedTopics {
    let mut strong: Vec<TopicScore> = topics
        .iter()
        .filter(|t| t.average_score >= policy.strong_from)
        .cloned()
        .collect();
    strong.sort_by(best_first);
    strong.truncate(policy.limit);

    let mut weak: Vec<TopicScore> = topics
        .iter()
        .filter(|t| t.average_score < policy.strong_from)
        .cloned()
        .collect();
    weak.sort_by(worst_first);
    weak.truncate(policy.limit);

    RankedTopics { strong, weak }
}
