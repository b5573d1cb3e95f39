//! Settings persistence.
//!
//! A single flat JSON file holding the endpoint, key, model and persona.
//! The file is rewritten in full on every save.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://integrate.api.nvidia.com/v1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly assistant.";

const CONFIG_FILE: &str = "nim_chat_config.json";
const CONFIG_ENV: &str = "NIM_CHAT_CONFIG";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model_name: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// On-disk shape. Every key is optional so partial files still load, but a
/// key that is present must hold a string.
#[derive(Debug, Default, Deserialize)]
struct StoredSettings {
    #[serde(default, deserialize_with = "present_string")]
    base_url: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    api_key: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    model_name: Option<String>,
    #[serde(default, deserialize_with = "present_string")]
    system_prompt: Option<String>,
}

fn present_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    String::deserialize(deserializer).map(Some)
}

impl From<StoredSettings> for Settings {
    fn from(stored: StoredSettings) -> Self {
        let defaults = Settings::default();
        Self {
            base_url: stored.base_url.unwrap_or(defaults.base_url),
            api_key: stored.api_key.unwrap_or_default(),
            model_name: stored.model_name.unwrap_or_default(),
            system_prompt: stored.system_prompt.unwrap_or(defaults.system_prompt),
        }
    }
}

/// What happened when reading the settings file at startup.
#[derive(Debug)]
pub enum LoadOutcome {
    /// No file yet; defaults are in use.
    Missing(Settings),
    Loaded(Settings),
    /// The file exists but could not be used; defaults are in use.
    Failed(Settings, SettingsError),
}

impl LoadOutcome {
    pub fn into_settings(self) -> Settings {
        match self {
            LoadOutcome::Missing(s) | LoadOutcome::Loaded(s) | LoadOutcome::Failed(s, _) => s,
        }
    }

    /// Status line to show after startup, if any.
    pub fn status(&self) -> Option<String> {
        match self {
            LoadOutcome::Missing(_) => None,
            LoadOutcome::Loaded(_) => Some("Loaded saved settings.".to_string()),
            LoadOutcome::Failed(_, e) => Some(format!("Config load failed: {}", e)),
        }
    }
}

/// Resolve where the settings file lives.
///
/// `NIM_CHAT_CONFIG` wins, then the platform config directory, then the
/// working directory.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    directories::ProjectDirs::from("com", "nvidia-nim", "NimChat")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

pub fn load(path: &Path) -> LoadOutcome {
    if !path.exists() {
        tracing::info!("Settings file {} not found, using defaults", path.display());
        return LoadOutcome::Missing(Settings::default());
    }
    match read(path) {
        Ok(settings) => {
            tracing::debug!("Loaded settings from {}", path.display());
            LoadOutcome::Loaded(settings)
        }
        Err(e) => {
            tracing::warn!("Failed to load settings from {}: {}", path.display(), e);
            LoadOutcome::Failed(Settings::default(), e)
        }
    }
}

fn read(path: &Path) -> Result<Settings, SettingsError> {
    let json = fs::read_to_string(path)?;
    // Structs also deserialize from arrays; only a JSON object is a settings document.
    let document: Map<String, Value> = serde_json::from_str(&json)?;
    let stored: StoredSettings = serde_json::from_value(Value::Object(document))?;
    Ok(stored.into())
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    tracing::debug!("Saved settings to {}", path.display());
    Ok(())
}
