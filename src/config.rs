//! Application-level configuration loading, including the settings applied to new rooms.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::dao::models::{Difficulty, SettingsEntity};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_BACK_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_settings: DefaultSettings,
}

/// Settings every new room starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    pub rounds: u32,
    pub time_per_round: u32,
    pub questions_per_round: u32,
    pub difficulty: Difficulty,
    pub max_players_per_team: u32,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            rounds: 10,
            time_per_round: 60,
            questions_per_round: 5,
            difficulty: Difficulty::Easy,
            max_players_per_team: 5,
        }
    }
}

impl DefaultSettings {
    /// Materialize a settings record with a fresh id.
    pub fn instantiate(&self) -> SettingsEntity {
        SettingsEntity {
            id: Uuid::new_v4(),
            rounds: self.rounds,
            time_per_round: self.time_per_round,
            questions_per_round: self.questions_per_round,
            difficulty: self.difficulty,
            max_players_per_team: self.max_players_per_team,
        }
    }

    fn is_usable(&self) -> bool {
        self.rounds > 0
            && self.time_per_round > 0
            && self.questions_per_round > 0
            && self.max_players_per_team > 0
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        rounds = app_config.default_settings.rounds,
                        time_per_round = app_config.default_settings.time_per_round,
                        "loaded room defaults from config"
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

    /// Parse a JSON configuration document.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        raw.try_into()
    }

    /// Settings applied to newly created rooms.
    pub fn default_settings(&self) -> &DefaultSettings {
        &self.default_settings
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_settings: DefaultSettings::default(),
        }
    }
}

/// Reasons a configuration document is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("default settings must have non-zero counts and durations")]
    InvalidDefaults,
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_settings: DefaultSettings,
}

impl TryFrom<RawConfig> for AppConfig {
    type Error = ConfigError;

    fn try_from(value: RawConfig) -> Result<Self, Self::Error> {
        if !value.default_settings.is_usable() {
            return Err(ConfigError::InvalidDefaults);
        }
        Ok(Self {
            default_settings: value.default_settings,
        })
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
