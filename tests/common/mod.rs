// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use tbs_analytics::{
    analytics::AnalyticsSettings,
    config::Config,
    models::{
        attempt::{AttemptRecord, Section, TbsType},
        question::{Difficulty, TbsQuestion},
    },
    repository::InMemoryAttemptRepository,
    routes,
    state::AppState,
    utils::jwt::sign_jwt,
};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

/// Spawns the app on a random port over the given repository.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
pub async fn spawn_app(repo: InMemoryAttemptRepository) -> String {
    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: ([127, 0, 0, 1], 0).into(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        analytics: AnalyticsSettings::default(),
    };

    let state = AppState {
        attempts: Arc::new(repo),
        config,
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

pub fn bearer(user_id: i64) -> String {
    let token = sign_jwt(user_id, JWT_SECRET, 600).expect("Failed to sign token");
    format!("Bearer {}", token)
}

pub fn question(id: i64, section: Section, tbs_type: TbsType, topic: &str, difficulty: Difficulty) -> TbsQuestion {
    TbsQuestion {
        id,
        section,
        tbs_type,
        topic: topic.to_string(),
        subtopic: None,
        title: format!("{} #{}", topic, id),
        difficulty,
        created_at: None,
    }
}

/// Attempt row joined with `question`'s classification.
pub fn attempt(
    id: i64,
    user_id: i64,
    question: &TbsQuestion,
    completed: bool,
    score: Option<f64>,
    seconds: Option<i64>,
) -> AttemptRecord {
    AttemptRecord {
        id,
        user_id,
        question_id: question.id,
        section: question.section,
        tbs_type: Some(question.tbs_type),
        topic: Some(question.topic.clone()),
        subtopic: question.subtopic.clone(),
        completed,
        score_percentage: score,
        time_spent_seconds: seconds,
        created_at: None,
    }
}
