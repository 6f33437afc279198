// src/services/mod.rs

pub mod questions;
pub mod stats;

pub use questions::QuestionListingService;
pub use stats::StatsService;
