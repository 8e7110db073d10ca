//! Layered configuration.
//!
//! [`Config`] is one optional-field layer (file, environment, keyring, CLI
//! overrides); [`Settings::resolve`] merges layers into concrete values.

pub mod data;
pub mod io;
pub mod printing;
pub mod resolve;

pub use data::{path_display, Config, ConfigurationError, SETTING_KEYS};
pub use io::ConfigError;
pub use resolve::Settings;
