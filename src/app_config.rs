use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language tag used when a command does not give one
    #[serde(default = "default_language")]
    pub default_language: String,

    /// SQLite database holding imported cues
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Root directory for rendered documents
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Analyzer config
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Analyzer provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerProvider {
    // @provider: OpenAI-compatible chat completions
    #[default]
    OpenAI,
    // @provider: Ollama
    Ollama,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl AnalyzerProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    // @returns: Whether the hosted API needs a key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for AnalyzerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for AnalyzerProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max cues analyzed at once
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Per-call timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: AnalyzerProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            concurrent_requests: default_concurrent_requests(),
            timeout_secs: default_timeout_for(&provider_type),
        }
    }
}

/// Analyzer configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzerConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: AnalyzerProvider,

    /// Configured providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: AnalyzerCommonConfig,
}

/// Settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalyzerCommonConfig {
    /// Temperature parameter for generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Base pause between analysis attempts, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Render a failed cue as plain text instead of leaving it out
    #[serde(default = "default_true")]
    pub fallback_to_plain_text: bool,
}

impl Default for AnalyzerCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            retry_backoff_ms: default_retry_backoff_ms(),
            fallback_to_plain_text: default_true(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "ja".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("subtitles")
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_timeout_for(provider: &AnalyzerProvider) -> u64 {
    match provider {
        // Local models are slow on first load
        AnalyzerProvider::Ollama | AnalyzerProvider::LMStudio => 120,
        _ => default_timeout_secs(),
    }
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_true() -> bool {
    true
}

fn default_endpoint(provider: &AnalyzerProvider) -> String {
    match provider {
        AnalyzerProvider::OpenAI => "https://api.openai.com/v1".to_string(),
        AnalyzerProvider::Ollama => "http://localhost:11434".to_string(),
        AnalyzerProvider::Anthropic => "https://api.anthropic.com".to_string(),
        // LM Studio serves the OpenAI API on port 1234 under /v1
        AnalyzerProvider::LMStudio => "http://localhost:1234/v1".to_string(),
    }
}

fn default_model(provider: &AnalyzerProvider) -> String {
    match provider {
        AnalyzerProvider::OpenAI => "gpt-4o-mini".to_string(),
        AnalyzerProvider::Ollama => "qwen2.5:7b".to_string(),
        AnalyzerProvider::Anthropic => "claude-3-5-haiku-latest".to_string(),
        AnalyzerProvider::LMStudio => "local-model".to_string(),
    }
}

impl Config {
    /// Load a configuration file, writing the defaults first when it is missing
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();

        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok((config, false));
        }

        let config = Config::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.default_language)?;

        if self.analyzer.optimal_concurrent_requests() == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }

        let temperature = self.analyzer.common.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(anyhow!("temperature must be between 0.0 and 2.0, got {}", temperature));
        }

        Ok(())
    }

    /// Database location, falling back to the per-user data directory
    pub fn resolved_database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(crate::database::DatabaseConnection::default_database_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: default_language(),
            database_path: None,
            output_dir: default_output_dir(),
            analyzer: AnalyzerConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Check that the active provider can be reached with this configuration
    pub fn validate(&self) -> Result<()> {
        if self.provider.requires_api_key() && self.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} provider",
                self.provider.display_name()
            ));
        }
        Ok(())
    }

    pub fn optimal_concurrent_requests(&self) -> usize {
        self.get_active_provider_config()
            .map(|p| p.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider, added with defaults when absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(position) => position,
            None => {
                self.available_providers
                    .push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.model.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model(&self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.endpoint.clone())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| default_endpoint(&self.provider))
    }

    /// Get the per-call timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .filter(|t| *t > 0)
            .unwrap_or_else(|| default_timeout_for(&self.provider))
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            provider: AnalyzerProvider::default(),
            available_providers: vec![
                ProviderConfig::new(AnalyzerProvider::OpenAI),
                ProviderConfig::new(AnalyzerProvider::Ollama),
                ProviderConfig::new(AnalyzerProvider::Anthropic),
                ProviderConfig::new(AnalyzerProvider::LMStudio),
            ],
            common: AnalyzerCommonConfig::default(),
        }
    }
}
