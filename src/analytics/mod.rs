// src/analytics/mod.rs

//! Attempt aggregation and topic mastery.
//!
//! Everything here is pure and synchronous: a [`aggregate::Rollup`] of sums
//! goes in, a [`crate::models::stats::StatsResult`] comes out.

pub mod aggregate;
pub mod mastery;
pub mod ranking;

use mastery::MasteryThresholds;
use ranking::RankingPolicy;

/// Threshold configuration shared by every aggregation path.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalyticsSettings {
    pub mastery: MasteryThresholds,
    pub ranking: RankingPolicy,
}
