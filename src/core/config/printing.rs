use crate::core::config::data::Config;

fn show<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "(unset)".to_string())
}

fn toggle(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "on",
        Some(false) => "off",
        None => "(unset)",
    }
}

impl Config {
    /// Lines describing the persisted layer, as shown by `cardchat set`.
    pub fn describe(&self) -> Vec<String> {
        vec![
            "Current configuration:".to_string(),
            format!("  model: {}", show(&self.model)),
            format!("  base-url: {}", show(&self.base_url)),
            format!("  max-tokens: {}", show(&self.max_tokens)),
            format!("  temperature: {}", show(&self.temperature)),
            format!("  request-timeout: {}", show(&self.request_timeout_secs)),
            format!("  stream-timeout: {}", show(&self.stream_timeout_secs)),
            format!("  refresh-interval: {}", show(&self.refresh_interval_ms)),
            format!("  markdown: {}", toggle(self.markdown)),
            format!("  streaming: {}", toggle(self.streaming)),
            format!("  language: {}", show(&self.language)),
            format!("  debug: {}", toggle(self.debug_mode)),
        ]
    }

    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }
}
