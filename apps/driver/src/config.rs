use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::DEFAULT_API_BASE_URL;
use round_controller::{SessionConfig, DEFAULT_SCAN_COOLDOWN, DEFAULT_VALIDATION_RETRY_DELAY};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "driver.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub scan_cooldown_ms: u64,
    pub validation_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            scan_cooldown_ms: u64::try_from(DEFAULT_SCAN_COOLDOWN.as_millis()).unwrap_or(u64::MAX),
            validation_retry_delay_ms: u64::try_from(DEFAULT_VALIDATION_RETRY_DELAY.as_millis())
                .unwrap_or(u64::MAX),
            request_timeout_secs: 10,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            scan_cooldown: Duration::from_millis(self.scan_cooldown_ms),
            validation_retry_delay: Duration::from_millis(self.validation_retry_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Flat `key = value` file. Numbers may be written bare or quoted.
    pub fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!(error = %err, "ignoring malformed driver config file");
                return;
            }
        };

        if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
            self.api_base_url = v.to_string();
        }
        if let Some(v) = file_cfg.get("scan_cooldown_ms").and_then(as_u64) {
            self.scan_cooldown_ms = v;
        }
        if let Some(v) = file_cfg.get("validation_retry_delay_ms").and_then(as_u64) {
            self.validation_retry_delay_ms = v;
        }
        if let Some(v) = file_cfg.get("request_timeout_secs").and_then(as_u64) {
            self.request_timeout_secs = v;
        }
    }

    /// `APP__*` wins over the shorter legacy names.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("COCAGNE_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = lookup("APP__SCAN_COOLDOWN_MS").and_then(|v| v.parse().ok()) {
            self.scan_cooldown_ms = v;
        }
        if let Some(v) = lookup("APP__VALIDATION_RETRY_DELAY_MS").and_then(|v| v.parse().ok()) {
            self.validation_retry_delay_ms = v;
        }
        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = v;
        }
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(|key| std::env::var(key).ok());

    settings
}

fn as_u64(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(v) => u64::try_from(*v).ok(),
        toml::Value::String(v) => v.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
