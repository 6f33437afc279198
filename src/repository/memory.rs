// src/repository/memory.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AttemptRepository, joined_record};
use crate::{
    analytics::aggregate::{GroupSums, Rollup},
    error::AppError,
    models::{
        attempt::{AttemptRecord, NewAttempt, Section, topic_key},
        question::{QuestionFilter, TbsQuestion},
    },
};

/// How the in-memory store answers `rollup()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RollupMode {
    /// Computes sums the way the SQL function does.
    #[default]
    Available,
    /// Behaves like a store without a rollup procedure.
    Unavailable,
    /// The rollup call errors.
    Failing,
}

#[derive(Default)]
struct Tables {
    questions: Vec<TbsQuestion>,
    attempts: Vec<AttemptRecord>,
}

/// Process-local store with the same contract as the Postgres one.
#[derive(Default)]
pub struct InMemoryAttemptRepository {
    tables: RwLock<Tables>,
    rollup_mode: RollupMode,
    fail_reads: bool,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_questions(mut self, questions: Vec<TbsQuestion>) -> Self {
        self.tables.get_mut().questions = questions;
        self
    }

    pub fn with_attempts(mut self, attempts: Vec<AttemptRecord>) -> Self {
        self.tables.get_mut().attempts = attempts;
        self
    }

    pub fn with_rollup_mode(mut self, mode: RollupMode) -> Self {
        self.rollup_mode = mode;
        self
    }

    /// Every read other than `rollup()` fails, simulating an unreachable store.
    pub fn with_failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    fn check_reads(&self) -> Result<(), AppError> {
        if self.fail_reads {
            return Err(AppError::InternalServerError(
                "attempt store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

fn in_scope(attempt: &AttemptRecord, user_id: i64, section: Option<Section>) -> bool {
    attempt.user_id == user_id && section.is_none_or(|s| attempt.section == s)
}

/// Grouped sums over completed, scored rows, one key at a time, the way a
/// `GROUP BY` would produce them.
fn group_sums<F>(rows: &[&AttemptRecord], key: F) -> BTreeMap<String, GroupSums>
where
    F: Fn(&AttemptRecord) -> Option<String>,
{
    let scored: Vec<(String, f64)> = rows
        .iter()
        .filter_map(|a| Some((key(*a)?, a.counted_score()?)))
        .collect();
    let keys: BTreeSet<&String> = scored.iter().map(|(k, _)| k).collect();

    keys.into_iter()
        .map(|k| {
            let scores: Vec<f64> = scored
                .iter()
                .filter(|(key, _)| key == k)
                .map(|(_, score)| *score)
                .collect();
            let sums = GroupSums {
                score_sum: scores.iter().sum(),
                scored: scores.len() as i64,
            };
            (k.clone(), sums)
        })
        .collect()
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn rollup(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Option<Rollup>, AppError> {
        match self.rollup_mode {
            RollupMode::Available => {}
            RollupMode::Unavailable => return Ok(None),
            RollupMode::Failing => {
                return Err(AppError::InternalServerError(
                    "tbs_attempt_rollup failed".to_string(),
                ));
            }
        }

        let tables = self.tables.read().await;
        let rows: Vec<&AttemptRecord> = tables
            .attempts
            .iter()
            .filter(|a| in_scope(a, user_id, section))
            .collect();

        let scores: Vec<f64> = rows.iter().filter_map(|a| a.counted_score()).collect();
        let times: Vec<i64> = rows.iter().filter_map(|a| a.counted_time()).collect();
        let unique: BTreeSet<i64> = rows.iter().map(|a| a.question_id).collect();

        Ok(Some(Rollup {
            total_attempts: rows.len() as i64,
            completed_attempts: rows.iter().filter(|a| a.completed).count() as i64,
            unique_questions: unique.len() as i64,
            overall: GroupSums {
                score_sum: scores.iter().sum(),
                scored: scores.len() as i64,
            },
            time_sum_seconds: times.iter().map(|t| *t as f64).sum(),
            timed_attempts: times.len() as i64,
            by_type: group_sums(&rows, |a| a.tbs_type.map(|t| t.as_str().to_string())),
            by_topic: group_sums(&rows, |a| a.topic_key().map(str::to_string)),
        }))
    }

    async fn attempts_for_user(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        self.check_reads()?;
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| in_scope(a, user_id, section))
            .cloned()
            .collect())
    }

    async fn attempts_for_questions(
        &self,
        user_id: i64,
        question_ids: &[i64],
    ) -> Result<Vec<AttemptRecord>, AppError> {
        self.check_reads()?;
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .filter(|a| a.user_id == user_id && question_ids.contains(&a.question_id))
            .cloned()
            .collect())
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<(Vec<TbsQuestion>, i64), AppError> {
        self.check_reads()?;
        let tables = self.tables.read().await;
        let mut matching: Vec<&TbsQuestion> =
            tables.questions.iter().filter(|q| filter.matches(q)).collect();
        matching.sort_by(|a, b| {
            (a.section, &a.topic, a.id).cmp(&(b.section, &b.topic, b.id))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .cloned()
            .collect();

        Ok((page, total))
    }

    async fn catalog_topics(&self, section: Option<Section>) -> Result<Vec<String>, AppError> {
        self.check_reads()?;
        let tables = self.tables.read().await;
        let topics: BTreeSet<String> = tables
            .questions
            .iter()
            .filter(|q| section.is_none_or(|s| q.section == s))
            .filter_map(|q| topic_key(&q.topic))
            .map(str::to_string)
            .collect();
        Ok(topics.into_iter().collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<TbsQuestion>, AppError> {
        self.check_reads()?;
        let tables = self.tables.read().await;
        Ok(tables.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<AttemptRecord, AppError> {
        let mut tables = self.tables.write().await;
        let question = tables
            .questions
            .iter()
            .find(|q| q.id == attempt.question_id)
            .cloned()
            .ok_or(AppError::NotFound("Question not found".to_string()))?;

        let id = tables.attempts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let record = joined_record(id, &question, &attempt, Some(chrono::Utc::now()));
        tables.attempts.push(record.clone());
        Ok(record)
    }
}
