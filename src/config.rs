use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

const APP_DIR: &str = ".CodeSnip";
const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "code_snippets.db";
const DOTENV_FILE: &str = ".env";
pub const MIN_TIMEOUT_SECONDS: u64 = 5;

/// Environment variables consulted for the API key, in priority order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["OPENAI_API_KEY", "CODESNIP_AI_API_KEY"];

/// What `doctor` found at the config path.
#[derive(Debug)]
pub enum ConfigFileCheck {
    Found,
    Missing,
    Unreadable(anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub ai_api_key: Option<String>,
    pub ai_api_base_url: String,
    pub ai_model: String,
    pub ai_max_tokens: u32,
    pub ai_temperature: f32,
    pub ai_timeout_seconds: u64,
    pub language: String,
    pub dashboard_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_root_dir().join(DB_FILE),
            ai_api_key: None,
            ai_api_base_url: "https://api.openai.com/v1".to_string(),
            ai_model: "gpt-3.5-turbo-0125".to_string(),
            ai_max_tokens: 100,
            ai_temperature: 0.7,
            ai_timeout_seconds: 30,
            language: "Python".to_string(),
            dashboard_port: 7891,
        }
    }
}

impl Config {
    pub fn root_dir() -> PathBuf {
        default_root_dir()
    }

    pub fn config_path() -> PathBuf {
        default_root_dir().join(CONFIG_FILE)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    /// Loads the file for diagnostics. Never fails: a missing or unreadable
    /// file falls back to defaults and the check says which one it was.
    pub fn inspect(config_path: &Path) -> (Self, ConfigFileCheck) {
        if !config_path.exists() {
            return (Self::default(), ConfigFileCheck::Missing);
        }

        match Self::load_from(config_path) {
            Ok(config) => (config, ConfigFileCheck::Found),
            Err(error) => (Self::default(), ConfigFileCheck::Unreadable(error)),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
        set_mode_600(config_path)?;

        Ok(())
    }

    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        let root = Self::root_dir();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create root directory: {}", root.display()))?;

        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        Ok(())
    }

    /// API key from the environment first, then a `.env` file in the working
    /// directory, then the config file.
    pub fn resolve_api_key(&self) -> Option<String> {
        API_KEY_ENV_VARS
            .iter()
            .find_map(|name| {
                std::env::var(name)
                    .ok()
                    .filter(|value| !value.trim().is_empty())
            })
            .or_else(|| dotenv_api_key(Path::new(DOTENV_FILE)))
            .or_else(|| {
                self.ai_api_key
                    .clone()
                    .filter(|value| !value.trim().is_empty())
            })
            .map(|value| value.trim().to_string())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                if value.trim().is_empty() {
                    bail!("db_path must not be empty");
                }
                self.db_path = expand_home(value.trim());
            }
            "ai_api_key" => {
                self.ai_api_key = (!value.trim().is_empty()).then(|| value.trim().to_string());
            }
            "ai_api_base_url" => {
                self.ai_api_base_url = parse_base_url(value)?;
            }
            "ai_model" => {
                let model = value.trim();
                if model.is_empty() {
                    bail!("ai_model must not be empty");
                }
                self.ai_model = model.to_string();
            }
            "ai_max_tokens" => {
                let parsed = value
                    .parse::<u32>()
                    .map_err(|_| anyhow!("ai_max_tokens must be a number"))?;
                if parsed == 0 {
                    bail!("ai_max_tokens must be at least 1");
                }
                self.ai_max_tokens = parsed;
            }
            "ai_temperature" => {
                let parsed = value
                    .parse::<f32>()
                    .map_err(|_| anyhow!("ai_temperature must be a number"))?;
                if !(0.0..=2.0).contains(&parsed) {
                    bail!("ai_temperature must be between 0.0 and 2.0");
                }
                self.ai_temperature = parsed;
            }
            "ai_timeout_seconds" => {
                self.ai_timeout_seconds = value
                    .parse::<u64>()
                    .map_err(|_| anyhow!("ai_timeout_seconds must be a number"))?
                    .max(MIN_TIMEOUT_SECONDS);
            }
            "language" => {
                let language = value.trim();
                if language.is_empty() {
                    bail!("language must not be empty");
                }
                self.language = language.to_string();
            }
            "dashboard_port" => {
                self.dashboard_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("dashboard_port must be a number"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, ai_api_key|ai.api_key, ai_api_base_url|ai.base_url, ai_model|ai.model, ai_max_tokens|ai.max_tokens, ai_temperature|ai.temperature, ai_timeout_seconds|ai.timeout_seconds, language|snippet.language, dashboard_port|dashboard.port"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "ai_api_key" => Some(
                self.ai_api_key
                    .as_ref()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "ai_api_base_url" => Some(self.ai_api_base_url.clone()),
            "ai_model" => Some(self.ai_model.clone()),
            "ai_max_tokens" => Some(self.ai_max_tokens.to_string()),
            "ai_temperature" => Some(self.ai_temperature.to_string()),
            "ai_timeout_seconds" => Some(self.ai_timeout_seconds.to_string()),
            "language" => Some(self.language.clone()),
            "dashboard_port" => Some(self.dashboard_port.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "ai_api_key" | "ai.api_key" => "ai_api_key",
        "ai_api_base_url" | "ai.base_url" => "ai_api_base_url",
        "ai_model" | "ai.model" => "ai_model",
        "ai_max_tokens" | "ai.max_tokens" => "ai_max_tokens",
        "ai_temperature" | "ai.temperature" => "ai_temperature",
        "ai_timeout_seconds" | "ai.timeout_seconds" => "ai_timeout_seconds",
        "language" | "snippet.language" => "language",
        "dashboard_port" | "dashboard.port" => "dashboard_port",
        _ => key,
    }
}

/// Reads the key from a dotenv file without touching the process environment.
fn dotenv_api_key(path: &Path) -> Option<String> {
    let entries = dotenvy::from_path_iter(path).ok()?;

    let mut found = entries
        .filter_map(|entry| match entry {
            Ok(pair) => Some(pair),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "skipping unreadable .env line");
                None
            }
        })
        .filter(|(name, value)| {
            API_KEY_ENV_VARS.contains(&name.as_str()) && !value.trim().is_empty()
        })
        .collect::<Vec<_>>();

    found.sort_by_key(|(name, _)| API_KEY_ENV_VARS.iter().position(|var| *var == name.as_str()));
    found.into_iter().next().map(|(_, value)| value)
}

pub fn parse_base_url(value: &str) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let url = Url::parse(trimmed)
        .with_context(|| format!("Invalid base URL: {value}. Example: https://api.openai.com/v1"))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Base URL must use http or https: {value}");
    }

    Ok(trimmed.to_string())
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

fn set_mode_600(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("Failed to set file permissions: {}", path.display()))?;
    }

    Ok(())
}
