use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

/// One configuration layer. Every field is optional so layers can be merged
/// by [`crate::core::config::Settings::resolve`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub request_timeout_secs: Option<u64>,
    pub stream_timeout_secs: Option<u64>,
    pub refresh_interval_ms: Option<u64>,
    pub markdown: Option<bool>,
    pub streaming: Option<bool>,
    pub language: Option<String>,
    pub debug_mode: Option<bool>,
}

/// Problems with credentials or individual settings.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    MissingApiKey,
    UnknownKey(String),
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::MissingApiKey => write!(
                f,
                "No API key configured. Run `cardchat auth` or set OPENAI_API_KEY."
            ),
            ConfigurationError::UnknownKey(key) => write!(
                f,
                "Unknown setting '{key}'. Known settings: {}",
                SETTING_KEYS.join(", ")
            ),
            ConfigurationError::InvalidValue { key, value, reason } => {
                write!(f, "Invalid value '{value}' for {key}: {reason}")
            }
        }
    }
}

impl StdError for ConfigurationError {}

/// Keys accepted by `cardchat set` / `cardchat unset`.
pub const SETTING_KEYS: &[&str] = &[
    "model",
    "base-url",
    "max-tokens",
    "temperature",
    "request-timeout",
    "stream-timeout",
    "refresh-interval",
    "markdown",
    "streaming",
    "language",
    "debug",
];

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigurationError>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|err| ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: err.to_string(),
        })
}

/// A count of `unit`s that must not be zero.
fn parse_positive(key: &str, value: &str, unit: &str) -> Result<u64, ConfigurationError> {
    match parse_value(key, value)? {
        0 => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: format!("must be at least 1 {unit}"),
        }),
        count => Ok(count),
    }
}

fn parse_toggle(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(ConfigurationError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected on or off".to_string(),
        }),
    }
}

impl Config {
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigurationError> {
        match key {
            "model" => self.model = Some(value.trim().to_string()),
            "base-url" => self.base_url = Some(value.trim().to_string()),
            "max-tokens" => self.max_tokens = Some(parse_value(key, value)?),
            "temperature" => {
                let temperature: f32 = parse_value(key, value)?;
                if !(0.0..=2.0).contains(&temperature) {
                    return Err(ConfigurationError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                        reason: "must be between 0 and 2".to_string(),
                    });
                }
                self.temperature = Some(temperature);
            }
            "request-timeout" => {
                self.request_timeout_secs = Some(parse_positive(key, value, "second")?)
            }
            "stream-timeout" => {
                self.stream_timeout_secs = Some(parse_positive(key, value, "second")?)
            }
            "refresh-interval" => {
                self.refresh_interval_ms = Some(parse_positive(key, value, "millisecond")?)
            }
            "markdown" => self.markdown = Some(parse_toggle(key, value)?),
            "streaming" => self.streaming = Some(parse_toggle(key, value)?),
            "language" => self.language = Some(value.trim().to_string()),
            "debug" => self.debug_mode = Some(parse_toggle(key, value)?),
            other => return Err(ConfigurationError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigurationError> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "max-tokens" => self.max_tokens = None,
            "temperature" => self.temperature = None,
            "request-timeout" => self.request_timeout_secs = None,
            "stream-timeout" => self.stream_timeout_secs = None,
            "refresh-interval" => self.refresh_interval_ms = None,
            "markdown" => self.markdown = None,
            "streaming" => self.streaming = None,
            "language" => self.language = None,
            "debug" => self.debug_mode = None,
            other => return Err(ConfigurationError::UnknownKey(other.to_string())),
        }
        Ok(())
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
