//! Application configuration management
//!
//! Configuration is read from a TOML file, then selected environment
//! variables override it. Everything is validated at startup so the service
//! fails fast when misconfigured.

use crate::core::constants::{anthropic, openai};
use crate::core::pricing::ModelPricing;
use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Default server port
const DEFAULT_PORT: u16 = 8001;

/// Default per-HTTP-request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT: u64 = 60;

/// Default deadline for a whole comparison in seconds
const DEFAULT_COMPARE_TIMEOUT: u64 = 90;

/// Upper bound for caller-supplied comparison deadlines in seconds
const DEFAULT_MAX_COMPARE_TIMEOUT: u64 = 300;

/// Maximum token limit default
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Maximum prompt length in characters
const DEFAULT_MAX_PROMPT_LENGTH: usize = 4000;

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAIConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_compare_timeout")]
    pub compare_timeout: u64,
    #[serde(default = "default_max_compare_timeout")]
    pub max_compare_timeout: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens_limit: u32,
    #[serde(default = "default_max_prompt_length")]
    pub max_prompt_length: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            compare_timeout: default_compare_timeout(),
            max_compare_timeout: default_max_compare_timeout(),
            max_tokens_limit: default_max_tokens(),
            max_prompt_length: default_max_prompt_length(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_compare_timeout() -> u64 {
    DEFAULT_COMPARE_TIMEOUT
}

fn default_max_compare_timeout() -> u64 {
    DEFAULT_MAX_COMPARE_TIMEOUT
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_max_prompt_length() -> usize {
    DEFAULT_MAX_PROMPT_LENGTH
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub openai: Option<OpenAIConfig>,
    #[serde(default)]
    pub anthropic: Option<AnthropicConfig>,
    /// Extra or replacement pricing entries, keyed by model id
    #[serde(default)]
    pub pricing: HashMap<String, ModelPricing>,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Logging level
    pub log_level: String,

    /// Per-HTTP-request timeout in seconds
    pub request_timeout: u64,

    /// Default comparison deadline in seconds
    pub compare_timeout: u64,

    /// Cap on caller-supplied comparison deadlines in seconds
    pub max_compare_timeout: u64,

    /// Maximum `max_tokens` a caller may request
    pub max_tokens_limit: u32,

    /// Maximum prompt length in characters
    pub max_prompt_length: usize,

    /// OpenAI settings; the provider is registered only with a key
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,

    /// Anthropic settings; the provider is registered only with a key
    pub anthropic_api_key: Option<String>,
    pub anthropic_base_url: String,
    pub anthropic_model: String,
    pub anthropic_version: String,

    /// Pricing entries applied over the built-in table
    pub pricing_overrides: HashMap<String, ModelPricing>,
}

impl Default for Config {
    fn default() -> Self {
        // An empty document only uses defaults, so this cannot fail.
        Self::from_toml(TomlConfig::default())
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl Config {
    fn from_toml(config: TomlConfig) -> Self {
        let openai_section = config.openai.unwrap_or(OpenAIConfig {
            api_key: String::new(),
            base_url: None,
            default_model: None,
        });
        let anthropic_section = config.anthropic.unwrap_or(AnthropicConfig {
            api_key: String::new(),
            base_url: None,
            default_model: None,
            api_version: None,
        });

        Config {
            host: config.server.host,
            port: config.server.port,
            log_level: config.server.log_level,
            request_timeout: config.request.request_timeout,
            compare_timeout: config.request.compare_timeout,
            max_compare_timeout: config.request.max_compare_timeout,
            max_tokens_limit: config.request.max_tokens_limit,
            max_prompt_length: config.request.max_prompt_length,
            openai_api_key: non_empty(openai_section.api_key),
            openai_base_url: openai_section
                .base_url
                .unwrap_or_else(|| openai::BASE_URL.to_string()),
            openai_model: openai_section
                .default_model
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            anthropic_api_key: non_empty(anthropic_section.api_key),
            anthropic_base_url: anthropic_section
                .base_url
                .unwrap_or_else(|| anthropic::BASE_URL.to_string()),
            anthropic_model: anthropic_section
                .default_model
                .unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string()),
            anthropic_version: anthropic_section
                .api_version
                .unwrap_or_else(|| anthropic::API_VERSION.to_string()),
            pricing_overrides: config.pricing,
        }
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).context("Failed to parse TOML configuration")?;
        let config = Self::from_toml(config);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The TOML file cannot be read or parsed
    /// - Configuration values are invalid
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read configuration file")?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from `.env`, the config file and the environment
    ///
    /// The file path comes from `CONFIG_PATH` (default `config.toml`); a
    /// missing file means defaults. `OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
    /// `HOST`, `PORT` and `LOG_LEVEL` override file values.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
                .with_context(|| format!("Invalid configuration in {}", config_path))?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").and_then(non_empty) {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = lookup("ANTHROPIC_API_KEY").and_then(non_empty) {
            self.anthropic_api_key = Some(key);
        }
        if let Some(host) = lookup("HOST").and_then(non_empty) {
            self.host = host;
        }
        if let Some(port) = lookup("PORT").and_then(non_empty) {
            self.port = port
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
        }
        if let Some(level) = lookup("LOG_LEVEL").and_then(non_empty) {
            self.log_level = level;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        ensure!(self.port != 0, "server.port must be non-zero");
        ensure!(self.request_timeout > 0, "request.request_timeout must be positive");
        ensure!(self.compare_timeout > 0, "request.compare_timeout must be positive");
        ensure!(
            self.compare_timeout <= self.max_compare_timeout,
            "request.compare_timeout ({}) exceeds request.max_compare_timeout ({})",
            self.compare_timeout,
            self.max_compare_timeout
        );
        ensure!(self.max_tokens_limit > 0, "request.max_tokens_limit must be positive");
        ensure!(self.max_prompt_length > 0, "request.max_prompt_length must be positive");

        for (model, pricing) in &self.pricing_overrides {
            let valid = |price: f64| price.is_finite() && price >= 0.0;
            if !valid(pricing.input_per_1k) || !valid(pricing.output_per_1k) {
                bail!("pricing for '{}' must be finite and non-negative", model);
            }
        }
        Ok(())
    }

    /// Whether any provider has credentials
    pub fn has_providers(&self) -> bool {
        self.openai_api_key.is_some() || self.anthropic_api_key.is_some()
    }
}
