//! Application-level configuration loading, including the duel engine tunables.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "GEO_DUEL_BACK_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// How long a room survives after its last write.
    pub room_ttl: Duration,
    /// Attempts made by the mutation engine before reporting a conflict.
    pub mutation_max_retries: u32,
    /// Lower bound of the jittered pause between conflicting attempts, in milliseconds.
    pub retry_jitter_min_ms: u64,
    /// Upper bound of the jittered pause between conflicting attempts, in milliseconds.
    pub retry_jitter_max_ms: u64,
    /// Fresh codes tried when inserting a room before giving up.
    pub code_insert_attempts: u32,
    /// Question count for discrete modes.
    pub discrete_rounds: usize,
    /// Match length for discrete modes, in seconds.
    pub discrete_duration_seconds: i64,
    /// Match length for the world quiz, in seconds.
    pub world_quiz_duration_seconds: i64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        ttl_seconds = app_config.room_ttl.as_secs(),
                        retries = app_config.mutation_max_retries,
                        "loaded duel settings from config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Jitter window between two conflicting attempts.
    pub fn retry_jitter_range(&self) -> std::ops::RangeInclusive<u64> {
        let low = self.retry_jitter_min_ms.min(self.retry_jitter_max_ms);
        let high = self.retry_jitter_min_ms.max(self.retry_jitter_max_ms);
        low..=high
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    room_ttl_seconds: u64,
    mutation_max_retries: u32,
    retry_jitter_min_ms: u64,
    retry_jitter_max_ms: u64,
    code_insert_attempts: u32,
    discrete_rounds: usize,
    discrete_duration_seconds: i64,
    world_quiz_duration_seconds: i64,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            room_ttl_seconds: 24 * 60 * 60,
            mutation_max_retries: 8,
            retry_jitter_min_ms: 20,
            retry_jitter_max_ms: 80,
            code_insert_attempts: 4,
            discrete_rounds: 12,
            discrete_duration_seconds: 180,
            world_quiz_duration_seconds: 900,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            room_ttl: Duration::from_secs(value.room_ttl_seconds.max(1)),
            mutation_max_retries: value.mutation_max_retries.max(1),
            retry_jitter_min_ms: value.retry_jitter_min_ms,
            retry_jitter_max_ms: value.retry_jitter_max_ms,
            code_insert_attempts: value.code_insert_attempts.max(1),
            discrete_rounds: value.discrete_rounds.max(1),
            discrete_duration_seconds: value.discrete_duration_seconds.max(1),
            world_quiz_duration_seconds: value.world_quiz_duration_seconds.max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
