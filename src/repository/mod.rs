// src/repository/mod.rs

//! Data access for attempts and the TBS catalog.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    analytics::aggregate::Rollup,
    error::AppError,
    models::{
        attempt::{AttemptRecord, NewAttempt, Section},
        question::{QuestionFilter, TbsQuestion},
    },
};

pub use memory::{InMemoryAttemptRepository, RollupMode};
pub use postgres::PgAttemptRepository;

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Precomputed server-side sums for one user.
    ///
    /// `Ok(None)` means no rollup is available for this store.
    async fn rollup(&self, user_id: i64, section: Option<Section>)
    -> Result<Option<Rollup>, AppError>;

    /// Every attempt by the user, joined with question type and topic.
    async fn attempts_for_user(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Vec<AttemptRecord>, AppError>;

    /// The user's attempts on the given questions.
    async fn attempts_for_questions(
        &self,
        user_id: i64,
        question_ids: &[i64],
    ) -> Result<Vec<AttemptRecord>, AppError>;

    /// One page of the catalog plus the total number of matches.
    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<(Vec<TbsQuestion>, i64), AppError>;

    /// Distinct, non-blank topic labels in the catalog.
    async fn catalog_topics(&self, section: Option<Section>) -> Result<Vec<String>, AppError>;

    async fn find_question(&self, id: i64) -> Result<Option<TbsQuestion>, AppError>;

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<AttemptRecord, AppError>;
}

/// Builds the joined record for a freshly stored attempt.
pub(crate) fn joined_record(
    id: i64,
    question: &TbsQuestion,
    attempt: &NewAttempt,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
) -> AttemptRecord {
    AttemptRecord {
        id,
        user_id: attempt.user_id,
        question_id: question.id,
        section: question.section,
        tbs_type: Some(question.tbs_type),
        topic: Some(question.topic.clone()),
        subtopic: question.subtopic.clone(),
        completed: attempt.completed,
        score_percentage: attempt.score_percentage,
        time_spent_seconds: attempt.time_spent_seconds,
        created_at,
    }
}
