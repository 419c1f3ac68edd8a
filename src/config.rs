use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

use crate::blockchain::{ChainConfig, DEFAULT_DIFFICULTY, DIFF_MAX, DIFF_MIN, MINING_REWARD};

/// Transfers above this amount are flagged by the anomaly scorer.
pub const DEFAULT_ANOMALY_THRESHOLD: i64 = 10_000;

/// Process configuration, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub chain: ChainConfig,
    pub anomaly_threshold: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            chain: ChainConfig::default(),
            anomaly_threshold: Decimal::from(DEFAULT_ANOMALY_THRESHOLD),
        }
    }
}

impl Config {
    /// Unset or unparseable variables keep their defaults. DIFFICULTY is
    /// clamped into `[1, MAX_DIFFICULTY]`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_difficulty = parse_var(&lookup, "MAX_DIFFICULTY")
            .unwrap_or(DIFF_MAX)
            .max(DIFF_MIN);
        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&lookup, "PORT").unwrap_or(8080),
            chain: ChainConfig {
                difficulty: parse_var(&lookup, "DIFFICULTY")
                    .unwrap_or(DEFAULT_DIFFICULTY)
                    .clamp(DIFF_MIN, max_difficulty),
                mining_reward: parse_var::<Decimal>(&lookup, "MINING_REWARD")
                    .filter(|r| *r > Decimal::ZERO)
                    .unwrap_or(Decimal::from(MINING_REWARD)),
                max_difficulty,
                auto_adjust: parse_var(&lookup, "AUTO_ADJUST_DIFFICULTY").unwrap_or(true),
            },
            anomaly_threshold: parse_var(&lookup, "ANOMALY_THRESHOLD")
                .unwrap_or(Decimal::from(DEFAULT_ANOMALY_THRESHOLD)),
        }
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}
