// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::AttemptRepository,
    services::{QuestionListingService, StatsService},
};

#[derive(Clone)]
pub struct AppState {
    pub attempts: Arc<dyn AttemptRepository>,
    pub config: Config,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<dyn AttemptRepository> {
    fn from_ref(state: &AppState) -> Self {
        state.attempts.clone()
    }
}

impl FromRef<AppState> for StatsService {
    fn from_ref(state: &AppState) -> Self {
        StatsService::new(state.attempts.clone(), state.config.analytics)
    }
}

impl FromRef<AppState> for QuestionListingService {
    fn from_ref(state: &AppState) -> Self {
        QuestionListingService::new(state.attempts.clone())
    }
}
