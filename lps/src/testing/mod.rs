//! Mocks, dummies and contexts shared by the unit and integration tests.

#![allow(clippy::unwrap_in_result, clippy::unwrap_used, clippy::expect_used)]

pub mod context;
pub mod dummy;
pub mod storage;

use crate::config::Settings;

/// The development configuration, relative to the crate root.
pub const DEFAULT_CONFIG_PATH: Option<&str> = Some("./src/config/default");

impl Settings {
    /// Load the development configuration, with any `LPS_` overrides set
    /// in the environment.
    pub fn new_from_default_config() -> Result<Self, config::ConfigError> {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

/// Remove every `LPS_` variable from the environment.
///
/// Tests run on parallel threads of one process, so a test that sets an
/// override must clear it before other tests load settings.
pub fn clear_env() {
    std::env::vars()
        .map(|(key, _)| key)
        .filter(|key| key.starts_with("LPS_"))
        .for_each(|key| std::env::remove_var(key));
}
