// src/analytics/aggregate.rs

use std::collections::{BTreeMap, HashSet};

use crate::{
    analytics::{AnalyticsSettings, ranking::rank_topics},
    models::{
        attempt::AttemptRecord,
        stats::{StatsResult, TopicScore},
    },
};

/// Running sum and count of scored attempts for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroupSums {
    pub score_sum: f64,
    pub scored: i64,
}

impl GroupSums {
    pub fn add(&mut self, score: f64) {
        self.score_sum += score;
        self.scored += 1;
    }

    /// Unrounded mean; `None` for an empty group.
    pub fn average(&self) -> Option<f64> {
        (self.scored > 0).then(|| self.score_sum / self.scored as f64)
    }
}

/// Sums and counts for one user (and optionally one section), before any
/// averaging or rounding. Produced either by the repository's precomputed
/// rollup or by [`fold_attempts`]; both feed [`finalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rollup {
    pub total_attempts: i64,
    pub completed_attempts: i64,
    pub unique_questions: i64,
    /// All completed, scored attempts.
    pub overall: GroupSums,
    pub time_sum_seconds: f64,
    pub timed_attempts: i64,
    pub by_type: BTreeMap<String, GroupSums>,
    pub by_topic: BTreeMap<String, GroupSums>,
}

impl Rollup {
    /// Shape check applied to rollups that come from outside this process.
    pub fn validate(&self) -> Result<(), String> {
        let counts = [
            self.total_attempts,
            self.completed_attempts,
            self.unique_questions,
            self.overall.scored,
            self.timed_attempts,
        ];
        if counts.iter().any(|c| *c < 0) {
            return Err("negative count in rollup".to_string());
        }
        if self.completed_attempts > self.total_attempts
            || self.unique_questions > self.total_attempts
        {
            return Err("completed or unique count exceeds total attempts".to_string());
        }
        if self.overall.scored > self.completed_attempts
            || self.timed_attempts > self.completed_attempts
        {
            return Err("scored or timed count exceeds completed attempts".to_string());
        }
        if !self.overall.score_sum.is_finite() || !self.time_sum_seconds.is_finite() {
            return Err("non-finite sum in rollup".to_string());
        }
        for (key, group) in self.by_type.iter().chain(self.by_topic.iter()) {
            if group.scored < 0 || group.scored > self.overall.scored || !group.score_sum.is_finite() {
                return Err(format!("invalid group '{}' in rollup", key));
            }
        }
        Ok(())
    }
}

/// Folds raw attempt rows into a [`Rollup`].
///
/// Incomplete attempts count towards the totals only. An attempt without a
/// type (or topic) is left out of that one grouping and still counts in the
/// other and in the overall sums.
pub fn fold_attempts<'a, I>(attempts: I) -> Rollup
where
    I: IntoIterator<Item = &'a AttemptRecord>,
{
    let mut rollup = Rollup::default();
    let mut questions = HashSet::new();

    for attempt in attempts {
        rollup.total_attempts += 1;
        questions.insert(attempt.question_id);

        if !attempt.completed {
            continue;
        }
        rollup.completed_attempts += 1;

        if let Some(seconds) = attempt.counted_time() {
            rollup.time_sum_seconds += seconds as f64;
            rollup.timed_attempts += 1;
        }

        let Some(score) = attempt.counted_score() else {
            continue;
        };
        rollup.overall.add(score);

        if let Some(tbs_type) = attempt.tbs_type {
            rollup
                .by_type
                .entry(tbs_type.as_str().to_string())
                .or_default()
                .add(score);
        }
        if let Some(topic) = attempt.topic_key() {
            rollup.by_topic.entry(topic.to_string()).or_default().add(score);
        }
    }

    rollup.unique_questions = questions.len() as i64;
    rollup
}

/// Rounds half away from zero to `places` decimals, deciding on the shortest
/// decimal form of `value` rather than its binary expansion. `1.005` is
/// `1.01` here, as with SQL `ROUND(numeric, 2)`.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    let binary_round = |v: f64| (v * factor).round() / factor;
    if !value.is_finite() || !(0..=9).contains(&places) || value.abs() >= 1e15 {
        return binary_round(value);
    }

    // `Display` for f64 prints the shortest round-tripping digits, never
    // in exponent form.
    let text = value.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let places = places as usize;
    if fraction.len() <= places {
        return value;
    }

    let Ok(mut scaled) = format!("{}{}", whole, &fraction[..places]).parse::<u64>() else {
        return binary_round(value);
    };
    if fraction.as_bytes()[places] >= b'5' {
        scaled += 1;
    }
    (scaled as f64 / factor).copysign(value)
}

/// Per-topic averages (2 dp) with their mastery band. Empty groups are skipped.
pub fn topic_scores(rollup: &Rollup, settings: &AnalyticsSettings) -> Vec<TopicScore> {
    rollup
        .by_topic
        .iter()
        .filter_map(|(topic, sums)| {
            let average = round_to(sums.average()?, 2);
            Some(TopicScore {
                topic: topic.clone(),
                average_score: average,
                attempts: sums.scored,
                mastery: settings.mastery.classify(average),
            })
        })
        .collect()
}

/// Turns sums into the response shape: averages, rounding, ranking.
pub fn finalize(rollup: &Rollup, settings: &AnalyticsSettings) -> StatsResult {
    let average_score = rollup.overall.average().map(|avg| round_to(avg, 2));

    let average_time_minutes = (rollup.timed_attempts > 0).then(|| {
        let seconds = rollup.time_sum_seconds / rollup.timed_attempts as f64;
        round_to(seconds / 60.0, 1)
    });

    let by_type = rollup
        .by_type
        .iter()
        .filter_map(|(key, sums)| Some((key.clone(), round_to(sums.average()?, 2))))
        .collect();

    let topics = topic_scores(rollup, settings);
    let by_topic = topics
        .iter()
        .map(|t| (t.topic.clone(), t.average_score))
        .collect();
    let ranked = rank_topics(&topics, &settings.ranking);

    StatsResult {
        total_attempts: rollup.total_attempts,
        completed_attempts: rollup.completed_attempts,
        unique_questions: rollup.unique_questions,
        average_score,
        average_time_minutes,
        by_type,
        by_topic,
        strong_topics: ranked.strong,
        weak_topics: ranked.weak,
    }
}
