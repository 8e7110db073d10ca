//! Endpoint construction for OpenAI-compatible APIs.
//!
//! A configured base URL may be either an API root
//! (`https://api.openai.com/v1`) or the full chat-completions endpoint
//! (`https://gateway.example.com/v1/chat/completions`); both resolve to the
//! same pair of endpoints.

const CHAT_COMPLETIONS: &str = "chat/completions";

/// Remove trailing slashes so endpoints can be appended safely.
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

fn api_root(base_url: &str) -> &str {
    let normalized = normalize_base_url(base_url);
    normalized
        .strip_suffix(CHAT_COMPLETIONS)
        .map(|root| root.trim_end_matches('/'))
        .unwrap_or(normalized)
}

pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", api_root(base_url), endpoint)
}

/// ```
/// use cardchat::utils::url::chat_completions_url;
///
/// assert_eq!(
///     chat_completions_url("https://api.openai.com/v1/"),
///     "https://api.openai.com/v1/chat/completions"
/// );
/// assert_eq!(
///     chat_completions_url("https://proxy.local/v1/chat/completions"),
///     "https://proxy.local/v1/chat/completions"
/// );
/// ```
pub fn chat_completions_url(base_url: &str) -> String {
    construct_api_url(base_url, CHAT_COMPLETIONS)
}

pub fn models_url(base_url: &str) -> String {
    construct_api_url(base_url, "models")
}
