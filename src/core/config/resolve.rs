use crate::core::config::data::{Config, ConfigurationError};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STREAM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30;

/// Concrete settings after all layers have been merged.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    pub stream_timeout_secs: u64,
    pub refresh_interval_ms: u64,
    pub markdown: bool,
    pub streaming: bool,
    /// `None` means detect from the environment.
    pub language: Option<String>,
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            stream_timeout_secs: DEFAULT_STREAM_TIMEOUT_SECS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            markdown: true,
            streaming: true,
            language: None,
            debug_mode: false,
        }
    }
}

fn first<T: Clone>(layers: &[&Config], field: impl Fn(&Config) -> &Option<T>) -> Option<T> {
    layers.iter().find_map(|&layer| field(layer).clone())
}

/// Like [`first`], but blank strings count as unset.
fn first_text(layers: &[&Config], field: impl Fn(&Config) -> &Option<String>) -> Option<String> {
    layers
        .iter()
        .find_map(|&layer| field(layer).clone().filter(|v| !v.trim().is_empty()))
}

impl Settings {
    /// Merge `layers`, highest precedence first. Fields no layer sets keep
    /// their defaults; blank strings count as unset.
    pub fn resolve(layers: &[&Config]) -> Settings {
        let defaults = Settings::default();
        Settings {
            api_key: first_text(layers, |c| &c.api_key).unwrap_or(defaults.api_key),
            model: first_text(layers, |c| &c.model).unwrap_or(defaults.model),
            base_url: first_text(layers, |c| &c.base_url).unwrap_or(defaults.base_url),
            max_tokens: first(layers, |c| &c.max_tokens).unwrap_or(defaults.max_tokens),
            temperature: first(layers, |c| &c.temperature).unwrap_or(defaults.temperature),
            request_timeout_secs: first(layers, |c| &c.request_timeout_secs)
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.request_timeout_secs),
            stream_timeout_secs: first(layers, |c| &c.stream_timeout_secs)
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.stream_timeout_secs),
            refresh_interval_ms: first(layers, |c| &c.refresh_interval_ms)
                .filter(|ms| *ms > 0)
                .unwrap_or(defaults.refresh_interval_ms),
            markdown: first(layers, |c| &c.markdown).unwrap_or(defaults.markdown),
            streaming: first(layers, |c| &c.streaming).unwrap_or(defaults.streaming),
            language: first_text(layers, |c| &c.language),
            debug_mode: first(layers, |c| &c.debug_mode).unwrap_or(defaults.debug_mode),
        }
    }

    pub fn require_credentials(&self) -> Result<(), ConfigurationError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigurationError::MissingApiKey);
        }
        Ok(())
    }
}

impl Config {
    /// The environment layer: `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `OPENAI_MODEL` and `CARDCHAT_LANG`.
    pub fn from_env() -> Config {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Config {
        Config {
            api_key: lookup("OPENAI_API_KEY"),
            base_url: lookup("OPENAI_BASE_URL"),
            model: lookup("OPENAI_MODEL"),
            language: lookup("CARDCHAT_LANG"),
            ..Config::default()
        }
    }

    /// A layer holding only an API key, as read from the keyring.
    pub fn with_api_key(api_key: Option<String>) -> Config {
        Config {
            api_key,
            ..Config::default()
        }
    }
}
