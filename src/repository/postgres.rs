// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};

use super::{AttemptRepository, joined_record};
use crate::{
    analytics::aggregate::{GroupSums, Rollup},
    error::AppError,
    models::{
        attempt::{AttemptRecord, NewAttempt, Section},
        question::{QuestionFilter, TbsQuestion},
    },
};

const QUESTION_COLUMNS: &str =
    "SELECT id, section, tbs_type, topic, subtopic, title, difficulty, created_at FROM tbs_questions";

const ATTEMPT_COLUMNS: &str = r#"
    SELECT
        a.id, a.user_id, a.question_id,
        q.section, q.tbs_type, q.topic, q.subtopic,
        a.completed, a.score_percentage, a.time_spent_seconds, a.created_at
    FROM tbs_attempts a
    JOIN tbs_questions q ON q.id = a.question_id
"#;

/// Raw `tbs_attempts` row joined with its question.
#[derive(FromRow)]
struct AttemptRow {
    id: i64,
    user_id: i64,
    question_id: i64,
    section: String,
    tbs_type: Option<String>,
    topic: Option<String>,
    subtopic: Option<String>,
    completed: bool,
    score_percentage: Option<f64>,
    time_spent_seconds: Option<i64>,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<AttemptRow> for AttemptRecord {
    type Error = AppError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(AttemptRecord {
            id: row.id,
            user_id: row.user_id,
            question_id: row.question_id,
            section: row.section.parse().map_err(AppError::InternalServerError)?,
            tbs_type: row
                .tbs_type
                .map(|t| t.parse())
                .transpose()
                .map_err(AppError::InternalServerError)?,
            topic: row.topic,
            subtopic: row.subtopic,
            completed: row.completed,
            score_percentage: row.score_percentage,
            time_spent_seconds: row.time_spent_seconds,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    section: String,
    tbs_type: String,
    topic: String,
    subtopic: Option<String>,
    title: String,
    difficulty: String,
    created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<QuestionRow> for TbsQuestion {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        Ok(TbsQuestion {
            id: row.id,
            section: row.section.parse().map_err(AppError::InternalServerError)?,
            tbs_type: row.tbs_type.parse().map_err(AppError::InternalServerError)?,
            topic: row.topic,
            subtopic: row.subtopic,
            title: row.title,
            difficulty: row.difficulty.parse().map_err(AppError::InternalServerError)?,
            created_at: row.created_at,
        })
    }
}

/// One row of `tbs_attempt_rollup()`.
/// `dimension` is 'overall', 'type' or 'topic'.
#[derive(FromRow)]
struct RollupRow {
    dimension: String,
    group_key: Option<String>,
    attempts: i64,
    completed: i64,
    unique_questions: i64,
    score_sum: f64,
    scored: i64,
    time_sum: f64,
    timed: i64,
}

fn rollup_from_rows(rows: Vec<RollupRow>) -> Result<Option<Rollup>, AppError> {
    let mut rollup = Rollup::default();
    let mut saw_overall = false;

    for row in rows {
        let sums = GroupSums {
            score_sum: row.score_sum,
            scored: row.scored,
        };
        match (row.dimension.as_str(), row.group_key) {
            ("overall", _) => {
                saw_overall = true;
                rollup.total_attempts = row.attempts;
                rollup.completed_attempts = row.completed;
                rollup.unique_questions = row.unique_questions;
                rollup.overall = sums;
                rollup.time_sum_seconds = row.time_sum;
                rollup.timed_attempts = row.timed;
            }
            ("type", Some(key)) => {
                rollup.by_type.insert(key, sums);
            }
            ("topic", Some(key)) => {
                rollup.by_topic.insert(key, sums);
            }
            (dimension, key) => {
                return Err(AppError::InternalServerError(format!(
                    "unexpected rollup row ({}, {:?})",
                    dimension, key
                )));
            }
        }
    }

    Ok(saw_overall.then_some(rollup))
}

/// Escapes LIKE metacharacters so the topic filter is a literal substring,
/// matching `QuestionFilter::matches`.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_question_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &QuestionFilter) {
    builder.push(" WHERE TRUE");
    if let Some(section) = filter.section {
        builder.push(" AND section = ").push_bind(section.as_str());
    }
    if let Some(tbs_type) = filter.tbs_type {
        builder.push(" AND tbs_type = ").push_bind(tbs_type.as_str());
    }
    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ").push_bind(difficulty.as_str());
    }
    if let Some(topic) = &filter.topic {
        builder
            .push(" AND topic ILIKE ")
            .push_bind(format!("%{}%", escape_like(topic)))
            .push(r" ESCAPE '\'");
    }
}

/// Postgres-backed repository. The rollup is the `tbs_attempt_rollup`
/// SQL function installed by the migrations.
#[derive(Clone)]
pub struct PgAttemptRepository {
    pool: PgPool,
}

impl PgAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptRepository for PgAttemptRepository {
    async fn rollup(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Option<Rollup>, AppError> {
        let rows = sqlx::query_as::<_, RollupRow>(
            r#"
            SELECT dimension, group_key, attempts, completed, unique_questions,
                   score_sum, scored, time_sum, timed
            FROM tbs_attempt_rollup($1, $2)
            "#,
        )
        .bind(user_id)
        .bind(section.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rollup_from_rows(rows)
    }

    async fn attempts_for_user(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        let sql = format!(
            "{} WHERE a.user_id = $1 AND ($2::TEXT IS NULL OR q.section = $2) ORDER BY a.id",
            ATTEMPT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(user_id)
            .bind(section.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch attempts for user {}: {:?}", user_id, e);
                AppError::InternalServerError(e.to_string())
            })?;

        rows.into_iter().map(AttemptRecord::try_from).collect()
    }

    async fn attempts_for_questions(
        &self,
        user_id: i64,
        question_ids: &[i64],
    ) -> Result<Vec<AttemptRecord>, AppError> {
        if question_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "{} WHERE a.user_id = $1 AND a.question_id = ANY($2) ORDER BY a.id",
            ATTEMPT_COLUMNS
        );
        let rows = sqlx::query_as::<_, AttemptRow>(&sql)
            .bind(user_id)
            .bind(question_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(AttemptRecord::try_from).collect()
    }

    async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<(Vec<TbsQuestion>, i64), AppError> {
        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tbs_questions");
        push_question_filters(&mut count_query, filter);
        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut page_query = QueryBuilder::<Postgres>::new(QUESTION_COLUMNS);
        push_question_filters(&mut page_query, filter);
        page_query
            .push(" ORDER BY section, topic, id LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<QuestionRow> = page_query
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list tbs questions: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        let questions = rows
            .into_iter()
            .map(TbsQuestion::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((questions, total))
    }

    async fn catalog_topics(&self, section: Option<Section>) -> Result<Vec<String>, AppError> {
        let topics = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT BTRIM(topic, E' \t\n\r')
            FROM tbs_questions
            WHERE ($1::TEXT IS NULL OR section = $1)
              AND BTRIM(topic, E' \t\n\r') <> ''
            ORDER BY 1
            "#,
        )
        .bind(section.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        Ok(topics)
    }

    async fn find_question(&self, id: i64) -> Result<Option<TbsQuestion>, AppError> {
        let sql = format!("{} WHERE id = $1", QUESTION_COLUMNS);
        sqlx::query_as::<_, QuestionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(TbsQuestion::try_from)
            .transpose()
    }

    async fn insert_attempt(&self, attempt: NewAttempt) -> Result<AttemptRecord, AppError> {
        let question = self
            .find_question(attempt.question_id)
            .await?
            .ok_or(AppError::NotFound("Question not found".to_string()))?;

        let (id, created_at): (i64, Option<chrono::DateTime<chrono::Utc>>) = sqlx::query_as(
            r#"
            INSERT INTO tbs_attempts (user_id, question_id, completed, score_percentage, time_spent_seconds)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, created_at
            "#,
        )
        .bind(attempt.user_id)
        .bind(attempt.question_id)
        .bind(attempt.completed)
        .bind(attempt.score_percentage)
        .bind(attempt.time_spent_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert tbs attempt: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

        Ok(joined_record(id, &question, &attempt, created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(dimension: &str, key: Option<&str>, score_sum: f64, scored: i64) -> RollupRow {
        RollupRow {
            dimension: dimension.to_string(),
            group_key: key.map(str::to_string),
            attempts: 0,
            completed: 0,
            unique_questions: 0,
            score_sum,
            scored,
            time_sum: 0.0,
            timed: 0,
        }
    }

    #[test]
    fn rollup_rows_are_assembled_by_dimension() {
        let mut overall = row("overall", None, 150.0, 2);
        overall.attempts = 3;
        overall.completed = 2;
        overall.unique_questions = 2;

        let rollup = rollup_from_rows(vec![
            overall,
            row("type", Some("research"), 150.0, 2),
            row("topic", Some("Leases"), 90.0, 1),
            row("topic", Some("Bonds"), 60.0, 1),
        ])
        .unwrap()
        .unwrap();

        assert_eq!(rollup.total_attempts, 3);
        assert_eq!(rollup.overall.scored, 2);
        assert_eq!(rollup.by_type["research"].score_sum, 150.0);
        assert_eq!(rollup.by_topic.len(), 2);
    }

    #[test]
    fn missing_overall_row_means_no_rollup() {
        assert!(rollup_from_rows(Vec::new()).unwrap().is_none());
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("Leases"), "Leases");
        assert_eq!(escape_like("5_%"), r"5\_\%");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
    }

    #[test]
    fn topic_filter_declares_backslash_escape() {
        let filter = QuestionFilter {
            topic: Some("5_%".to_string()),
            ..QuestionFilter::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM tbs_questions");
        push_question_filters(&mut builder, &filter);
        assert_eq!(
            builder.sql(),
            r"SELECT id FROM tbs_questions WHERE TRUE AND topic ILIKE $1 ESCAPE '\'"
        );
    }

    #[test]
    fn unknown_dimension_is_an_error() {
        assert!(rollup_from_rows(vec![row("subtopic", Some("x"), 1.0, 1)]).is_err());
    }
}
