use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles loading, validating and saving the aligner
/// configuration. Every section has serde defaults so a partial
/// `conf.json` is accepted.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Language of the anchor track, used in prompts
    pub anchor_language: String,

    /// Language of the candidate track, used in prompts
    pub candidate_language: String,

    /// Alignment engine settings
    #[serde(default)]
    pub aligner: AlignerConfig,

    /// Decision source settings
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Test case corpus settings
    #[serde(default)]
    pub corpus: CorpusConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Chat provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the provider needs an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
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

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Maximum tokens per answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    // @param kind: Provider enum
    // @returns: Provider config with defaults
    pub fn new(kind: ProviderKind) -> Self {
        let (model, endpoint, timeout_secs) = match kind {
            ProviderKind::Ollama => (default_ollama_model(), default_ollama_endpoint(), default_timeout_secs()),
            ProviderKind::OpenAI => (default_openai_model(), default_openai_endpoint(), default_timeout_secs()),
            ProviderKind::Anthropic => (
                default_anthropic_model(),
                default_anthropic_endpoint(),
                default_anthropic_timeout_secs(),
            ),
            ProviderKind::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint(), default_timeout_secs()),
        };

        Self {
            provider_type: kind.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Alignment engine settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AlignerConfig {
    /// Scaled overlap a candidate must exceed to count against an anchor
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: f64,

    /// Upper bound on distribute/shift rounds per block
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Blocks aligned at the same time
    #[serde(default = "default_max_concurrent_blocks")]
    pub max_concurrent_blocks: usize,

    /// Minimum silence in the anchor track that starts a new block
    #[serde(default = "default_block_gap_ms")]
    pub block_gap_ms: u64,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            ambiguity_threshold: default_ambiguity_threshold(),
            max_iterations: default_max_iterations(),
            max_concurrent_blocks: default_max_concurrent_blocks(),
            block_gap_ms: default_block_gap_ms(),
        }
    }
}

/// Decision source configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: ProviderKind,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: OracleCommonConfig,
}

/// Common oracle settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleCommonConfig {
    /// Minimum delay in milliseconds between consecutive requests
    #[serde(default = "default_rate_limit_delay_ms")]
    pub rate_limit_delay_ms: u64,

    /// Retry count for failed or unparsable answers
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum few-shot examples per stage prompt
    #[serde(default = "default_max_examples")]
    pub max_examples: usize,
}

impl Default for OracleCommonConfig {
    fn default() -> Self {
        Self {
            rate_limit_delay_ms: default_rate_limit_delay_ms(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_examples: default_max_examples(),
        }
    }
}

/// Test case corpus configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CorpusConfig {
    /// Directory of corpus JSON files
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Append fresh oracle answers to the corpus as unverified cases
    #[serde(default)]
    pub record_new_cases: bool,

    /// Answer only from the corpus; never call a provider
    #[serde(default)]
    pub replay_only: bool,
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

fn default_ambiguity_threshold() -> f64 {
    0.33
}

fn default_max_iterations() -> usize {
    64
}

fn default_max_concurrent_blocks() -> usize {
    1
}

fn default_block_gap_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_anthropic_timeout_secs() -> u64 {
    120
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_rate_limit_delay_ms() -> u64 {
    500 // 500ms default delay between requests
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.0
}

fn default_max_examples() -> usize {
    8
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

impl Config {
    /// Load `path`, or write and return the defaults when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path).with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            return serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()));
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let threshold = self.aligner.ambiguity_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(anyhow!(
                "Ambiguity threshold must be strictly between 0 and 1, got {}",
                threshold
            ));
        }
        if self.aligner.max_iterations == 0 {
            return Err(anyhow!("max_iterations must be at least 1"));
        }
        if self.aligner.max_concurrent_blocks == 0 {
            return Err(anyhow!("max_concurrent_blocks must be at least 1"));
        }
        if self.corpus.replay_only && self.corpus.directory.is_none() {
            return Err(anyhow!("Replay-only mode needs a corpus directory"));
        }

        // Remote providers need an API key unless we never call them
        if !self.corpus.replay_only && self.oracle.provider.requires_api_key() && self.oracle.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} provider",
                self.oracle.provider.display_name()
            ));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            anchor_language: "Mandarin Chinese".to_string(),
            candidate_language: "Cantonese".to_string(),
            aligner: AlignerConfig::default(),
            oracle: OracleConfig::default(),
            corpus: CorpusConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl OracleConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider's entry, created if missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => &mut self.available_providers[index],
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                let last = self.available_providers.len() - 1;
                &mut self.available_providers[last]
            }
        }
    }

    /// Active provider's settings, with defaults filled in for empty fields
    pub fn resolved_provider_config(&self) -> ProviderConfig {
        let defaults = ProviderConfig::new(self.provider.clone());
        match self.get_active_provider_config() {
            Some(config) => ProviderConfig {
                provider_type: defaults.provider_type,
                model: non_empty_or(&config.model, defaults.model),
                api_key: config.api_key.clone(),
                endpoint: non_empty_or(&config.endpoint, defaults.endpoint),
                timeout_secs: config.timeout_secs,
                max_tokens: config.max_tokens,
            },
            None => defaults,
        }
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.resolved_provider_config().model
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.resolved_provider_config().endpoint
    }
}

fn non_empty_or(value: &str, fallback: String) -> String {
    if value.is_empty() {
        fallback
    } else {
        value.to_string()
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            available_providers: vec![
                ProviderConfig::new(ProviderKind::Ollama),
                ProviderConfig::new(ProviderKind::OpenAI),
                ProviderConfig::new(ProviderKind::Anthropic),
                ProviderConfig::new(ProviderKind::LMStudio),
            ],
            common: OracleCommonConfig::default(),
        }
    }
}
