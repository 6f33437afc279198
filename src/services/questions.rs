// src/services/questions.rs

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::AppError,
    models::{
        attempt::AttemptRecord,
        question::{QuestionFilter, QuestionListing, QuestionPage},
    },
    repository::AttemptRepository,
};

/// A user's history on one question.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AttemptSummary {
    pub completed: i64,
    pub best_score: Option<f64>,
}

/// Completed-attempt count and best completed score, keyed by question id.
pub fn summarize_attempts(attempts: &[AttemptRecord]) -> HashMap<i64, AttemptSummary> {
    let mut summaries: HashMap<i64, AttemptSummary> = HashMap::new();

    for attempt in attempts.iter().filter(|a| a.completed) {
        let summary = summaries.entry(attempt.question_id).or_default();
        summary.completed += 1;
        if let Some(score) = attempt.counted_score() {
            summary.best_score = Some(summary.best_score.map_or(score, |best| best.max(score)));
        }
    }

    summaries
}

/// Catalog listing annotated with the caller's attempt history.
#[derive(Clone)]
pub struct QuestionListingService {
    repo: Arc<dyn AttemptRepository>,
}

impl QuestionListingService {
    pub fn new(repo: Arc<dyn AttemptRepository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, user_id: i64, filter: QuestionFilter) -> Result<QuestionPage, AppError> {
        let (questions, total) = self.repo.list_questions(&filter).await?;

        let ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let attempts = self.repo.attempts_for_questions(user_id, &ids).await?;
        let history = summarize_attempts(&attempts);

        let questions = questions
            .into_iter()
            .map(|question| {
                let summary = history.get(&question.id).copied().unwrap_or_default();
                QuestionListing {
                    question,
                    attempt_count: summary.completed,
                    best_score: summary.best_score,
                }
            })
            .collect();

        Ok(QuestionPage {
            questions,
            total,
            limit: filter.limit,
            offset: filter.offset,
        })
    }
}
