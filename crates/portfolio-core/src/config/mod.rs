//! Configuration management with file persistence

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable holding the bearer used against the token endpoint
pub const TOKEN_AUTH_ENV: &str = "PORTFOLIO_TOKEN_AUTH";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "PORTFOLIO_CONFIG_DIR";

/// Portfolio configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub analysis: AnalysisConfig,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Synthesize analyses locally instead of calling the LLM
    pub mock_mode: bool,
    pub base_url: Option<String>,
    pub model: String,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub asset_id: Option<String>,
    pub timeout_secs: u64,
    pub token: TokenConfig,
}

/// Token endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub url: Option<String>,
    pub flow_id: Option<String>,
    pub environment: String,
    pub user_id: Option<String>,
    /// Lifetime assumed when the endpoint does not state one
    pub default_lifetime_secs: u64,
    /// A cached token is dropped this long before it expires
    pub refresh_margin_secs: u64,
    /// Rejected by validation; the secret is read from `PORTFOLIO_TOKEN_AUTH`
    #[serde(skip_serializing)]
    pub auth: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Replace failed LLM analyses with a locally synthesized one
    pub fallback_on_error: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            mock_mode: true,
            base_url: None,
            model: "gpt-5.1".to_string(),
            project_id: None,
            user_id: None,
            asset_id: None,
            timeout_secs: 60,
            token: TokenConfig::default(),
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            url: None,
            flow_id: None,
            environment: "DEV".to_string(),
            user_id: None,
            default_lifetime_secs: 3600,
            refresh_margin_secs: 600,
            auth: None,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fallback_on_error: true,
        }
    }
}

impl TokenConfig {
    pub fn resolved_auth(&self) -> anyhow::Result<Option<String>> {
        self.enforce_env_only()?;
        Ok(env::var(TOKEN_AUTH_ENV).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn redacted_auth(&self) -> anyhow::Result<Option<String>> {
        self.resolved_auth().map(|opt| opt.map(|key| redact(&key)))
    }

    pub fn enforce_env_only(&self) -> anyhow::Result<()> {
        if self.auth.is_some() {
            return Err(anyhow!(
                "Token credentials must be provided via {}, not stored in configuration",
                TOKEN_AUTH_ENV
            ));
        }
        Ok(())
    }
}

fn redact(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        "***".to_string()
    } else {
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("***{}", suffix)
    }
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "(not set)".to_string())
}

fn parse_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(anyhow!("Invalid boolean for {}: {}", key, value)),
    }
}

/// Every key accepted by `get`/`set`
const KEYS: &[&str] = &[
    "llm.mock_mode",
    "llm.base_url",
    "llm.model",
    "llm.project_id",
    "llm.user_id",
    "llm.asset_id",
    "llm.timeout_secs",
    "llm.token.url",
    "llm.token.flow_id",
    "llm.token.environment",
    "llm.token.user_id",
    "llm.token.default_lifetime_secs",
    "llm.token.refresh_margin_secs",
    "llm.token.auth",
    "analysis.fallback_on_error",
    "database.path",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var(CONFIG_DIR_ENV) {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("portfolio")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a file, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.llm.token.enforce_env_only()?;
        if self.llm.timeout_secs == 0 {
            return Err(anyhow!("llm.timeout_secs must be greater than zero"));
        }
        if self.llm.token.refresh_margin_secs >= self.llm.token.default_lifetime_secs {
            return Err(anyhow!(
                "llm.token.refresh_margin_secs must be smaller than llm.token.default_lifetime_secs"
            ));
        }
        Ok(())
    }

    /// Database file to use, falling back to the default data location
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(crate::storage::default_database_path)
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        let llm = &self.llm;
        let token = &self.llm.token;
        match key {
            "llm.mock_mode" => Ok(llm.mock_mode.to_string()),
            "llm.base_url" => Ok(optional(&llm.base_url)),
            "llm.model" => Ok(llm.model.clone()),
            "llm.project_id" => Ok(optional(&llm.project_id)),
            "llm.user_id" => Ok(optional(&llm.user_id)),
            "llm.asset_id" => Ok(optional(&llm.asset_id)),
            "llm.timeout_secs" => Ok(llm.timeout_secs.to_string()),

            "llm.token.url" => Ok(optional(&token.url)),
            "llm.token.flow_id" => Ok(optional(&token.flow_id)),
            "llm.token.environment" => Ok(token.environment.clone()),
            "llm.token.user_id" => Ok(optional(&token.user_id)),
            "llm.token.default_lifetime_secs" => Ok(token.default_lifetime_secs.to_string()),
            "llm.token.refresh_margin_secs" => Ok(token.refresh_margin_secs.to_string()),
            "llm.token.auth" => match token.redacted_auth()? {
                Some(redacted) => Ok(redacted),
                None => Ok(format!("(not set - use {} env var)", TOKEN_AUTH_ENV)),
            },

            "analysis.fallback_on_error" => Ok(self.analysis.fallback_on_error.to_string()),

            "database.path" => Ok(self.database_path().display().to_string()),

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `portfolio config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    ///
    /// The change is only kept if the resulting configuration validates.
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut updated = self.clone();
        updated.apply(key, value)?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn apply(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let llm = &mut self.llm;
        match key {
            "llm.mock_mode" => llm.mock_mode = parse_bool(key, value)?,
            "llm.base_url" => llm.base_url = parse_optional(value),
            "llm.model" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("llm.model cannot be empty"));
                }
                llm.model = value.trim().to_string();
            }
            "llm.project_id" => llm.project_id = parse_optional(value),
            "llm.user_id" => llm.user_id = parse_optional(value),
            "llm.asset_id" => llm.asset_id = parse_optional(value),
            "llm.timeout_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid timeout_secs value: {}", value))?;
                if secs == 0 {
                    return Err(anyhow!("Timeout must be greater than zero"));
                }
                llm.timeout_secs = secs;
            }

            "llm.token.url" => llm.token.url = parse_optional(value),
            "llm.token.flow_id" => llm.token.flow_id = parse_optional(value),
            "llm.token.environment" => llm.token.environment = value.trim().to_string(),
            "llm.token.user_id" => llm.token.user_id = parse_optional(value),
            "llm.token.default_lifetime_secs" => {
                llm.token.default_lifetime_secs = value
                    .parse()
                    .with_context(|| format!("Invalid default_lifetime_secs value: {}", value))?;
            }
            "llm.token.refresh_margin_secs" => {
                llm.token.refresh_margin_secs = value
                    .parse()
                    .with_context(|| format!("Invalid refresh_margin_secs value: {}", value))?;
            }
            "llm.token.auth" => {
                return Err(anyhow!(
                    "Token credentials cannot be stored in configuration for security. \
                     Set the {} environment variable instead.",
                    TOKEN_AUTH_ENV
                ));
            }

            "analysis.fallback_on_error" => {
                self.analysis.fallback_on_error = parse_bool(key, value)?;
            }

            "database.path" => {
                self.database.path = parse_optional(value).map(PathBuf::from);
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `portfolio config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        KEYS.iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}
