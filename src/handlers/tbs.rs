// src/handlers/tbs.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{NewAttempt, Section, SubmitAttemptRequest},
        question::{QuestionFilter, QuestionListParams},
        stats::{MasteryResponse, StatsResponse},
    },
    repository::AttemptRepository,
    services::{QuestionListingService, StatsService},
    utils::jwt::Claims,
};

/// Query parameters shared by the stats and mastery endpoints.
#[derive(Debug, Deserialize)]
pub struct SectionParams {
    pub section: Option<String>,
}

impl SectionParams {
    /// Unknown sections are ignored rather than rejected.
    fn section(&self) -> Option<Section> {
        self.section.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Lists TBS questions with the caller's attempt count and best score.
pub async fn list_questions(
    State(service): State<QuestionListingService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let page = service.list(user_id, QuestionFilter::from(params)).await?;
    Ok(Json(page))
}

/// Aggregated performance for the caller, optionally scoped to one section.
pub async fn get_stats(
    State(service): State<StatsService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SectionParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let stats = service.stats(user_id, params.section()).await?;
    Ok(Json(StatsResponse { stats }))
}

/// Mastery status of every topic in scope.
pub async fn get_mastery(
    State(service): State<StatsService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<SectionParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let topics = service.mastery(user_id, params.section()).await?;
    Ok(Json(MasteryResponse { topics }))
}

/// Records an attempt by the caller on a question.
///
/// * Section, type and topic are taken from the question.
/// * A score requires `completed: true`.
pub async fn submit_attempt(
    State(repo): State<Arc<dyn AttemptRepository>>,
    Extension(claims): Extension<Claims>,
    Path(question_id): Path<i64>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    payload.validate()?;
    payload.check_consistency().map_err(AppError::BadRequest)?;

    let record = repo
        .insert_attempt(NewAttempt {
            user_id,
            question_id,
            completed: payload.completed,
            score_percentage: payload.score_percentage,
            time_spent_seconds: payload.time_spent_seconds,
        })
        .await?;

    tracing::info!(user_id, question_id, attempt_id = record.id, "Recorded tbs attempt");

    Ok((StatusCode::CREATED, Json(record)))
}
