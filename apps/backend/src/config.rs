//! Environment-driven configuration.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use srs_core::BatchRules;
use thiserror::Error;

use crate::services::sync::SyncSettings;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Scheduler tunables shared by the monitor and the sync coordinator.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub generation_cooldown: Duration,
    pub batch_rules: BatchRules,
    pub sync: SyncSettings,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            generation_cooldown: Duration::from_millis(15_000),
            batch_rules: BatchRules::default(),
            sync: SyncSettings::default(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub session_id: String,
    pub seed_deck_path: Option<PathBuf>,
    pub default_unit: String,
    pub persistence_url: Option<String>,
    pub card_source_url: Option<String>,
    pub card_source_api_key: Option<String>,
    pub scheduler: SchedulerSettings,
}

impl Config {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let number = |name: &'static str, default: u64| -> Result<u64, ConfigError> {
            match var(name) {
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { name, value }),
                None => Ok(default),
            }
        };

        let defaults = SchedulerSettings::default();
        let known_units: HashSet<String> = var("KNOWN_UNITS")
            .map(|units| {
                units
                    .split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let retry_ms = number("SYNC_RETRY_MS", 0)?;
        let scheduler = SchedulerSettings {
            generation_cooldown: Duration::from_millis(number(
                "GENERATION_COOLDOWN_MS",
                defaults.generation_cooldown.as_millis() as u64,
            )?),
            batch_rules: BatchRules {
                min_concept_cards: number(
                    "MIN_CONCEPT_CARDS",
                    defaults.batch_rules.min_concept_cards as u64,
                )? as usize,
                min_code_cards: number("MIN_CODE_CARDS", defaults.batch_rules.min_code_cards as u64)?
                    as usize,
                known_units,
            },
            sync: SyncSettings {
                state_debounce: Duration::from_millis(number(
                    "STATE_SYNC_DEBOUNCE_MS",
                    defaults.sync.state_debounce.as_millis() as u64,
                )?),
                cards_debounce: Duration::from_millis(number(
                    "CARDS_SYNC_DEBOUNCE_MS",
                    defaults.sync.cards_debounce.as_millis() as u64,
                )?),
                retry_after: (retry_ms > 0).then(|| Duration::from_millis(retry_ms)),
                max_cards: number("MAX_CARDS", defaults.sync.max_cards as u64)? as usize,
                retention_days: number("RETENTION_DAYS", defaults.sync.retention_days as u64)?
                    as u32,
            },
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: number("PORT", 3000)? as u16,
            session_id: var("SESSION_ID").unwrap_or_else(|| "default".to_string()),
            seed_deck_path: var("SEED_DECK_PATH").map(PathBuf::from),
            default_unit: var("DEFAULT_UNIT").unwrap_or_else(|| "general".to_string()),
            persistence_url: var("PERSISTENCE_URL"),
            card_source_url: var("CARD_SOURCE_URL"),
            card_source_api_key: var("CARD_SOURCE_API_KEY"),
            scheduler,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
