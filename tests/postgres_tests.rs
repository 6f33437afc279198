// tests/postgres_tests.rs
//
// Runs against a live database: DATABASE_URL=postgres://... cargo test -- --ignored

use std::{collections::BTreeSet, sync::Arc};

use sqlx::{PgPool, postgres::PgPoolOptions};
use tbs_analytics::{
    analytics::{AnalyticsSettings, aggregate::finalize},
    models::{
        attempt::{NewAttempt, Section},
        question::QuestionFilter,
    },
    repository::{AttemptRepository, PgAttemptRepository},
    services::stats::StatsService,
};

async fn connect() -> PgPool {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    pool
}

/// Per-run tag so repeated runs against one database do not collide.
fn run_tag() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

async fn insert_question(pool: &PgPool, section: &str, tbs_type: &str, topic: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO tbs_questions (section, tbs_type, topic, title, difficulty)
        VALUES ($1, $2, $3, $4, 'medium')
        RETURNING id
        "#,
    )
    .bind(section)
    .bind(tbs_type)
    .bind(topic)
    .bind(format!("{} ({})", topic.trim(), tbs_type))
    .fetch_one(pool)
    .await
    .expect("Failed to insert question")
}

async fn record(
    repo: &PgAttemptRepository,
    user_id: i64,
    question_id: i64,
    completed: bool,
    score: Option<f64>,
    seconds: Option<i64>,
) {
    repo.insert_attempt(NewAttempt {
        user_id,
        question_id,
        completed,
        score_percentage: score,
        time_spent_seconds: seconds,
    })
    .await
    .expect("Failed to insert attempt");
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn sql_rollup_matches_raw_row_recompute() {
    let pool = connect().await;
    let repo = PgAttemptRepository::new(pool.clone());
    let user_id = run_tag();

    // Padded labels must collapse onto the same key on both paths.
    let leases_je = insert_question(&pool, "FAR", "journal_entry", "Leases\t").await;
    let leases_research = insert_question(&pool, "FAR", "research", " Leases ").await;
    let bonds = insert_question(&pool, "REG", "calculation", "Bonds\r\n").await;
    let blank = insert_question(&pool, "AUD", "analysis", "\t").await;
    let nbsp = insert_question(&pool, "AUD", "document_review", "Sampling\u{a0}").await;

    record(&repo, user_id, leases_je, true, Some(80.0), Some(600)).await;
    record(&repo, user_id, leases_je, true, Some(90.0), Some(720)).await;
    record(&repo, user_id, leases_research, true, Some(70.0), None).await;
    record(&repo, user_id, leases_research, true, Some(60.0), Some(480)).await;
    record(&repo, user_id, leases_je, false, None, Some(3000)).await;
    record(&repo, user_id, bonds, true, Some(43.33), Some(901)).await;
    record(&repo, user_id, bonds, true, Some(73.565), None).await;
    record(&repo, user_id, blank, true, Some(55.0), Some(245)).await;
    record(&repo, user_id, nbsp, true, Some(100.0), Some(350)).await;
    record(&repo, user_id, nbsp, true, None, None).await;

    let settings = AnalyticsSettings::default();
    let service = StatsService::new(Arc::new(repo.clone()), settings);

    for section in [None, Some(Section::Far), Some(Section::Aud), Some(Section::Tcp)] {
        let rollup = repo
            .rollup(user_id, section)
            .await
            .unwrap()
            .expect("tbs_attempt_rollup always returns an overall row");
        assert!(rollup.validate().is_ok());

        let primary = serde_json::to_string(&finalize(&rollup, &settings)).unwrap();
        let fallback = serde_json::to_string(&service.recompute(user_id, section).await.unwrap()).unwrap();
        assert_eq!(primary, fallback, "paths disagree for section {:?}", section);
    }

    let stats = service.stats(user_id, None).await.unwrap();
    assert_eq!(stats.total_attempts, 10);
    assert_eq!(stats.completed_attempts, 9);
    assert_eq!(stats.unique_questions, 5);
    let topics: Vec<&str> = stats.by_topic.keys().map(String::as_str).collect();
    assert_eq!(topics, vec!["Bonds", "Leases", "Sampling\u{a0}"]);
    assert_eq!(stats.by_topic["Leases"], 75.0);
    let strong: Vec<&str> = stats.strong_topics.iter().map(|t| t.topic.as_str()).collect();
    assert_eq!(strong, vec!["Sampling\u{a0}", "Leases"]);
    assert_eq!(stats.weak_topics[0].topic, "Bonds");

    let far = service.stats(user_id, Some(Section::Far)).await.unwrap();
    assert_eq!(far.total_attempts, 5);
    assert_eq!(far.by_type.len(), 2);
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn raw_reads_and_catalog_use_normalized_topics() {
    let pool = connect().await;
    let repo = PgAttemptRepository::new(pool.clone());
    let user_id = run_tag();
    let label = format!("Leases {}", user_id);

    let padded = insert_question(&pool, "TCP", "research", &format!("{}\t", label)).await;
    record(&repo, user_id, padded, true, Some(88.0), Some(60)).await;
    record(&repo, user_id, padded, false, None, None).await;

    let attempts = repo.attempts_for_user(user_id, Some(Section::Tcp)).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].topic_key(), Some(label.as_str()));
    assert!(repo.attempts_for_user(user_id, Some(Section::Far)).await.unwrap().is_empty());

    let for_question = repo.attempts_for_questions(user_id, &[padded]).await.unwrap();
    assert_eq!(for_question.len(), 2);

    let catalog: BTreeSet<String> = repo.catalog_topics(Some(Section::Tcp)).await.unwrap().into_iter().collect();
    assert!(catalog.contains(&label));
    assert!(!catalog.contains(&format!("{}\t", label)));
}

#[tokio::test]
#[ignore = "needs DATABASE_URL pointing at Postgres"]
async fn topic_filter_treats_like_metacharacters_literally() {
    let pool = connect().await;
    let repo = PgAttemptRepository::new(pool.clone());
    let tag = run_tag();

    let literal = insert_question(&pool, "BAR", "analysis", &format!("Rate_5%-{}", tag)).await;
    // Matches `Rate_5%-tag` only if `_` and `%` act as wildcards.
    insert_question(&pool, "BAR", "analysis", &format!("RateX5Y-{}", tag)).await;

    let filter = QuestionFilter {
        topic: Some(format!("rate_5%-{}", tag)),
        ..QuestionFilter::default()
    };
    let (questions, total) = repo.list_questions(&filter).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].id, literal);
}
