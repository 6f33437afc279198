// src/config.rs

use std::{env, fmt, net::SocketAddr, str::FromStr};

use dotenvy::dotenv;

use crate::analytics::{
    AnalyticsSettings,
    mastery::{MASTERED_FROM, MODERATE_FROM, MasteryThresholds},
    ranking::{RANKED_TOPIC_LIMIT, RankingPolicy, STRONG_TOPIC_CUT},
};

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    pub cors_origins: Vec<String>,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn required(key: &'static str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key))
}

/// Reads `key`, falling back to `default` when unset.
fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_value(key, env::var(key).ok(), default)
}

fn parse_value<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bind_addr = parsed_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            rust_log,
            bind_addr,
            cors_origins,
            analytics: analytics_from_env()?,
        })
    }
}

/// Threshold overrides. Both mastery cuts and the ranking cut stay separate
/// knobs even though they share a default.
fn analytics_from_env() -> Result<AnalyticsSettings, ConfigError> {
    let settings = AnalyticsSettings {
        mastery: MasteryThresholds {
            moderate_from: parsed_or("MASTERY_MODERATE_FROM", MODERATE_FROM)?,
            mastered_from: parsed_or("MASTERY_MASTERED_FROM", MASTERED_FROM)?,
        },
        ranking: RankingPolicy {
            strong_from: parsed_or("STRONG_TOPIC_CUT", STRONG_TOPIC_CUT)?,
            limit: parsed_or("RANKED_TOPIC_LIMIT", RANKED_TOPIC_LIMIT)?,
        },
    };
    check_thresholds(&settings)?;
    Ok(settings)
}

/// Cuts must be finite (a NaN cut matches neither side of a comparison)
/// and the mastery bands must be ordered.
fn check_thresholds(settings: &AnalyticsSettings) -> Result<(), ConfigError> {
    let cuts = [
        ("MASTERY_MODERATE_FROM", settings.mastery.moderate_from),
        ("MASTERY_MASTERED_FROM", settings.mastery.mastered_from),
        ("STRONG_TOPIC_CUT", settings.ranking.strong_from),
    ];
    for (key, value) in cuts {
        if !value.is_finite() {
            return Err(ConfigError::Invalid {
                key,
                value: value.to_string(),
            });
        }
    }

    if settings.mastery.moderate_from > settings.mastery.mastered_from {
        return Err(ConfigError::Invalid {
            key: "MASTERY_MODERATE_FROM",
            value: settings.mastery.moderate_from.to_string(),
        });
    }
    Ok(())
}
