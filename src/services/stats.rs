// src/services/stats.rs

use std::{collections::BTreeSet, sync::Arc};

use crate::{
    analytics::{
        AnalyticsSettings,
        aggregate::{Rollup, finalize, fold_attempts, round_to},
    },
    error::AppError,
    models::{
        attempt::Section,
        stats::{StatsResult, TopicProgress},
    },
    repository::AttemptRepository,
};

/// Builds per-user stats from the precomputed rollup when the store has one,
/// otherwise from raw attempt rows. Both sources go through the same
/// `finalize`, so rounding and thresholds cannot drift between them.
#[derive(Clone)]
pub struct StatsService {
    repo: Arc<dyn AttemptRepository>,
    settings: AnalyticsSettings,
}

impl StatsService {
    pub fn new(repo: Arc<dyn AttemptRepository>, settings: AnalyticsSettings) -> Self {
        Self { repo, settings }
    }

    pub async fn stats(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<StatsResult, AppError> {
        let rollup = self.load_rollup(user_id, section).await?;
        Ok(finalize(&rollup, &self.settings))
    }

    /// Stats computed from raw rows only, skipping the rollup.
    pub async fn recompute(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<StatsResult, AppError> {
        let rollup = self.fold_raw_attempts(user_id, section).await?;
        Ok(finalize(&rollup, &self.settings))
    }

    /// Every catalog topic in scope plus every topic the user has scored on,
    /// ordered by label. Untouched topics are `not_started`.
    pub async fn mastery(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Vec<TopicProgress>, AppError> {
        let rollup = self.load_rollup(user_id, section).await?;
        let mut topics: BTreeSet<String> = self
            .repo
            .catalog_topics(section)
            .await?
            .into_iter()
            .collect();
        topics.extend(rollup.by_topic.keys().cloned());

        Ok(topics
            .into_iter()
            .map(|topic| {
                let sums = rollup.by_topic.get(&topic).copied().unwrap_or_default();
                let average = sums.average().map(|avg| round_to(avg, 2));
                TopicProgress {
                    status: self.settings.mastery.status(sums.scored, average),
                    attempts: sums.scored,
                    average_score: average,
                    topic,
                }
            })
            .collect())
    }

    /// Rollup errors, absence and malformed rollups all fall through to the
    /// raw-row path. Errors from the raw-row path are returned.
    async fn load_rollup(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Rollup, AppError> {
        match self.repo.rollup(user_id, section).await {
            Ok(Some(rollup)) => match rollup.validate() {
                Ok(()) => return Ok(rollup),
                Err(reason) => {
                    tracing::warn!(user_id, ?section, "Discarding malformed attempt rollup: {}", reason);
                }
            },
            Ok(None) => {
                tracing::debug!(user_id, ?section, "No attempt rollup available, recomputing");
            }
            Err(e) => {
                tracing::warn!(user_id, ?section, "Attempt rollup failed, recomputing: {}", e);
            }
        }

        self.fold_raw_attempts(user_id, section).await
    }

    async fn fold_raw_attempts(
        &self,
        user_id: i64,
        section: Option<Section>,
    ) -> Result<Rollup, AppError> {
        let attempts = self.repo.attempts_for_user(user_id, section).await?;
        Ok(fold_attempts(&attempts))
    }
}
