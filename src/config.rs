//! Configuration types for riskdesk
//!
//! Secrets ([`OpenRouterConfig`], [`SearchConfig`]) are resolved once at
//! startup and injected into the clients that need them. Tunables live in
//! [`Settings`], layered from defaults, an optional file and `RISKDESK__*`
//! environment variables.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Environment variable holding the language-model API key
pub const OPENROUTER_API_KEY_VAR: &str = "OPENROUTER_API_KEY";

/// Environment variable holding the search service API key
pub const SEARCH_API_KEY_VAR: &str = "PERPLEXITY_API_KEY";

/// Model configuration for a participant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier (e.g., "openai/gpt-4o")
    pub model: String,
    /// Temperature for sampling (0.0-2.0)
    pub temperature: f32,
    /// Maximum tokens for completion
    pub max_tokens: Option<u32>,
}

impl ModelConfig {
    /// Create a new model configuration
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// OpenRouter (or any OpenAI-compatible) client configuration
#[derive(Clone)]
pub struct OpenRouterConfig {
    /// API key
    pub api_key: SecretString,
    /// Base URL for the chat-completions API
    pub base_url: Url,
    /// Request timeout
    pub timeout: Duration,
    /// App name sent as `X-Title`
    pub app_name: String,
}

impl OpenRouterConfig {
    /// Create a new configuration from the process environment
    pub fn from_env() -> Result<Self> {
        // Load .env if present so local development picks up the keys
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a configuration by resolving variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(OPENROUTER_API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!("{} environment variable not set", OPENROUTER_API_KEY_VAR))
            })?;
        Ok(Self::new(api_key))
    }

    /// Create a new configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: endpoints::openrouter(),
            timeout: Duration::from_secs(120),
            app_name: "riskdesk".to_string(),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Search service client configuration
#[derive(Clone)]
pub struct SearchConfig {
    /// API key
    pub api_key: SecretString,
    /// Base URL of the search service
    pub base_url: Url,
    /// Online model used for retrieval
    pub model: String,
    /// Maximum tokens per search answer
    pub max_tokens: u32,
    /// Outbound request budget
    pub requests_per_minute: u32,
    /// Restrict results to a recent window
    pub recency: Option<RecencyFilter>,
    /// Request timeout
    pub timeout: Duration,
}

impl SearchConfig {
    /// Create a new configuration from the process environment
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create a configuration by resolving variables through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(SEARCH_API_KEY_VAR)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "Search API key not found. Set {} environment variable.",
                    SEARCH_API_KEY_VAR
                ))
            })?;
        Ok(Self::new(api_key))
    }

    /// Create a new configuration with a specific API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: endpoints::perplexity(),
            model: presets::SEARCH.to_string(),
            max_tokens: 4096,
            requests_per_minute: 20,
            recency: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the base URL
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the recency filter
    pub fn with_recency(mut self, recency: Option<RecencyFilter>) -> Self {
        self.recency = recency;
        self
    }

    /// Apply the tunables from [`SearchSettings`]
    pub fn with_settings(mut self, settings: &SearchSettings) -> Result<Self> {
        if let Some(base_url) = &settings.base_url {
            self.base_url = Url::parse(base_url)
                .map_err(|e| Error::config(format!("Invalid search base_url: {}", e)))?;
        }
        self.model = settings.model.clone();
        self.max_tokens = settings.max_tokens;
        self.requests_per_minute = settings.requests_per_minute;
        self.recency = settings.recency;
        self.timeout = Duration::from_secs(settings.timeout_secs);
        Ok(self)
    }

    /// Get the API key as a string
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("api_key", &"***REDACTED***")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("requests_per_minute", &self.requests_per_minute)
            .field("recency", &self.recency)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Time window accepted by the search service's recency filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyFilter {
    /// Last hour
    Hour,
    /// Last day
    Day,
    /// Last week
    Week,
    /// Last month
    Month,
}

/// Process-wide tunables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Language-model endpoint and defaults
    pub llm: LlmSettings,
    /// Search service tunables
    pub search: SearchSettings,
}

/// Language-model tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Override for the chat-completions base URL
    pub base_url: Option<String>,
    /// Model used by participants that do not name one
    pub default_model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Completion token cap per request
    pub max_tokens: Option<u32>,
    /// Tool-call round trips allowed within one turn
    pub max_tool_rounds: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            default_model: presets::GPT4O.to_string(),
            temperature: 0.7,
            max_tokens: None,
            max_tool_rounds: 4,
            timeout_secs: 120,
        }
    }
}

/// Search tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Override for the search base URL
    pub base_url: Option<String>,
    /// Online model used for retrieval
    pub model: String,
    /// Maximum tokens per search answer
    pub max_tokens: u32,
    /// Outbound request budget
    pub requests_per_minute: u32,
    /// Restrict results to a recent window
    pub recency: Option<RecencyFilter>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            model: presets::SEARCH.to_string(),
            max_tokens: 4096,
            requests_per_minute: 20,
            recency: None,
            timeout_secs: 120,
        }
    }
}

impl Settings {
    /// Layer defaults, an optional settings file and `RISKDESK__*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, None)
    }

    /// Like [`Settings::load`], reading variables from `vars` instead of
    /// the process environment when given
    pub fn load_from(path: Option<&Path>, vars: Option<config::Map<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(Error::config(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("RISKDESK")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make every run fail later
    pub fn validate(&self) -> Result<()> {
        if self.llm.default_model.trim().is_empty() {
            return Err(Error::config("llm.default_model must not be empty"));
        }
        if self.search.requests_per_minute == 0 {
            return Err(Error::config("search.requests_per_minute must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config("llm.temperature must be within 0.0..=2.0"));
        }
        Ok(())
    }

    /// Build the language-model client configuration from these settings
    pub fn openrouter_config(&self, base: OpenRouterConfig) -> Result<OpenRouterConfig> {
        let mut config = base.with_timeout(Duration::from_secs(self.llm.timeout_secs));
        if let Some(base_url) = &self.llm.base_url {
            let url = Url::parse(base_url)
                .map_err(|e| Error::config(format!("Invalid llm base_url: {}", e)))?;
            config = config.with_base_url(url);
        }
        Ok(config)
    }

    /// Model configuration for a participant, honoring an optional override
    pub fn model_config(&self, model: Option<&str>) -> ModelConfig {
        let mut config = ModelConfig::new(model.unwrap_or(&self.llm.default_model))
            .with_temperature(self.llm.temperature);
        if let Some(max_tokens) = self.llm.max_tokens {
            config = config.with_max_tokens(max_tokens);
        }
        config
    }
}

/// Default service endpoints
pub mod endpoints {
    use url::Url;

    /// OpenRouter chat-completions base
    pub fn openrouter() -> Url {
        Url::parse("https://openrouter.ai/api/v1/").expect("valid OpenRouter URL")
    }

    /// Perplexity chat-completions base
    pub fn perplexity() -> Url {
        Url::parse("https://api.perplexity.ai/").expect("valid Perplexity URL")
    }
}

/// Recommended model identifiers
pub mod presets {
    /// GPT-4o through OpenRouter
    pub const GPT4O: &str = "openai/gpt-4o";

    /// Fast, lower cost
    pub const GPT4O_MINI: &str = "openai/gpt-4o-mini";

    /// Online retrieval model used by the search tool
    pub const SEARCH: &str = "sonar-pro";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_missing_search_key_is_config_error() {
        let err = SearchConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains(SEARCH_API_KEY_VAR));
    }

    #[test]
    fn test_blank_openrouter_key_is_config_error() {
        let err = OpenRouterConfig::from_lookup(lookup_from(&[(OPENROUTER_API_KEY_VAR, "  ")]))
            .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_debug_redacts_keys() {
        let config = SearchConfig::from_lookup(lookup_from(&[(SEARCH_API_KEY_VAR, "pplx-secret")]))
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("pplx-secret"));
        assert!(rendered.contains("REDACTED"));
        assert_eq!(config.api_key(), "pplx-secret");
    }

    #[test]
    fn test_settings_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "llm:\n  default_model: openai/gpt-4o-mini\n  max_tool_rounds: 2\nsearch:\n  recency: month\n  requests_per_minute: 5"
        )
        .unwrap();

        let settings = Settings::load_from(Some(file.path()), Some(config::Map::new())).unwrap();
        assert_eq!(settings.llm.default_model, presets::GPT4O_MINI);
        assert_eq!(settings.llm.max_tool_rounds, 2);
        assert_eq!(settings.llm.timeout_secs, 120);
        assert_eq!(settings.search.recency, Some(RecencyFilter::Month));
        assert_eq!(settings.search.requests_per_minute, 5);
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "llm:\n  max_tool_rounds: 6\nsearch:\n  recency: month").unwrap();

        let vars: config::Map<String, String> = [
            ("RISKDESK__SEARCH__RECENCY", "week"),
            ("RISKDESK__LLM__MAX_TOOL_ROUNDS", "2"),
            ("RISKDESK__LLM__TEMPERATURE", "0.3"),
            ("OTHER__LLM__TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let settings = Settings::load_from(Some(file.path()), Some(vars)).unwrap();
        assert_eq!(settings.search.recency, Some(RecencyFilter::Week));
        assert_eq!(settings.llm.max_tool_rounds, 2);
        assert!((settings.llm.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.llm.timeout_secs, 120);

        let bad: config::Map<String, String> =
            [("RISKDESK__SEARCH__REQUESTS_PER_MINUTE".to_string(), "0".to_string())]
                .into_iter()
                .collect();
        assert!(Settings::load_from(None, Some(bad)).unwrap_err().is_config());
    }

    #[test]
    fn test_missing_settings_file_is_config_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/riskdesk.yaml"))).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut settings = Settings::default();
        settings.search.requests_per_minute = 0;
        assert!(settings.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_search_config_applies_settings() {
        let settings = SearchSettings {
            base_url: Some("http://127.0.0.1:9999/".to_string()),
            recency: Some(RecencyFilter::Week),
            ..Default::default()
        };
        let config = SearchConfig::new("key").with_settings(&settings).unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:9999/");
        assert_eq!(config.recency, Some(RecencyFilter::Week));
    }

    #[test]
    fn test_model_config_override() {
        let settings = Settings::default();
        assert_eq!(settings.model_config(None).model, presets::GPT4O);
        assert_eq!(settings.model_config(Some("x/y")).model, "x/y");
    }
}
