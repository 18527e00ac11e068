//! Typed configuration persisted as YAML under the devchat home directory.
//!
//! Keys form a closed set: `get`/`set`/`unset` reject anything outside
//! [`ConfigKey`] instead of silently returning an absent value.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::assist::GenerationSettings;

pub const CONFIG_FILE_NAME: &str = "config.yaml";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub api_key: Option<String>,
    /// Base URL for OpenAI-compatible endpoints; the default service when unset.
    pub api_base: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            api_key: None,
            api_base: None,
        }
    }
}

/// The closed set of known configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Model,
    Temperature,
    MaxTokens,
    ApiKey,
    ApiBase,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::Model,
        ConfigKey::Temperature,
        ConfigKey::MaxTokens,
        ConfigKey::ApiKey,
        ConfigKey::ApiBase,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::Model => "model",
            ConfigKey::Temperature => "temperature",
            ConfigKey::MaxTokens => "max_tokens",
            ConfigKey::ApiKey => "api_key",
            ConfigKey::ApiBase => "api_base",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "model" => Ok(ConfigKey::Model),
            "temperature" => Ok(ConfigKey::Temperature),
            "max_tokens" => Ok(ConfigKey::MaxTokens),
            "api_key" => Ok(ConfigKey::ApiKey),
            "api_base" => Ok(ConfigKey::ApiBase),
            other => bail!(
                "unknown configuration key '{other}' (expected one of: model, temperature, max_tokens, api_key, api_base)"
            ),
        }
    }
}

/// Loads, mutates and saves the configuration file.
pub struct ConfigManager {
    path: PathBuf,
    pub config: Config,
}

impl ConfigManager {
    /// Default configuration file location: `~/.devchat/config.yaml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("could not determine the home directory")?;
        Ok(home.join(".devchat").join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("malformed config file {}", path.display()))?
        } else {
            Config::default()
        };
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the config directory and write defaults unless a file already exists.
    pub fn setup(&self) -> Result<()> {
        if self.path.exists() {
            debug!(path = %self.path.display(), "config file already present");
            return Ok(());
        }
        self.save()
    }

    /// Write the configuration atomically (temp file + rename).
    pub fn save(&self) -> Result<()> {
        let parent = self
            .path
            .parent()
            .context("config path has no parent directory")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;

        let yaml = serde_yaml::to_string(&self.config).context("failed to serialize config")?;
        let tmp = self.path.with_extension("yaml.tmp");
        fs::write(&tmp, yaml)
            .with_context(|| format!("failed to write config file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace config file {}", self.path.display()))?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    pub fn get(&self, key: ConfigKey) -> Option<String> {
        match key {
            ConfigKey::Model => Some(self.config.model.clone()),
            ConfigKey::Temperature => Some(self.config.temperature.to_string()),
            ConfigKey::MaxTokens => Some(self.config.max_tokens.to_string()),
            ConfigKey::ApiKey => self.config.api_key.clone(),
            ConfigKey::ApiBase => self.config.api_base.clone(),
        }
    }

    /// Parse `value` for `key` and persist the result.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::Model => self.config.model = value.to_string(),
            ConfigKey::Temperature => {
                let temperature: f32 = value
                    .parse()
                    .with_context(|| format!("temperature must be a number, got '{value}'"))?;
                if !(0.0..=2.0).contains(&temperature) {
                    bail!("temperature must be between 0.0 and 2.0, got {temperature}");
                }
                self.config.temperature = temperature;
            }
            ConfigKey::MaxTokens => {
                self.config.max_tokens = value
                    .parse()
                    .with_context(|| format!("max_tokens must be a positive integer, got '{value}'"))?;
            }
            ConfigKey::ApiKey => self.config.api_key = Some(value.to_string()),
            ConfigKey::ApiBase => self.config.api_base = Some(value.to_string()),
        }
        self.save()
    }

    /// Reset `key` to its default value and persist.
    pub fn unset(&mut self, key: ConfigKey) -> Result<()> {
        let defaults = Config::default();
        match key {
            ConfigKey::Model => self.config.model = defaults.model,
            ConfigKey::Temperature => self.config.temperature = defaults.temperature,
            ConfigKey::MaxTokens => self.config.max_tokens = defaults.max_tokens,
            ConfigKey::ApiKey => self.config.api_key = None,
            ConfigKey::ApiBase => self.config.api_base = None,
        }
        self.save()
    }

    /// All keys with their current values; unset optionals render as empty.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        ConfigKey::ALL
            .iter()
            .map(|key| (key.name(), self.get(*key).unwrap_or_default()))
            .collect()
    }

    /// Configured key, falling back to the `OPENAI_API_KEY` environment variable.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    pub fn generation(&self) -> GenerationSettings {
        GenerationSettings {
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}
