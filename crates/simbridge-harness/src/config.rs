//! Configuration types for the harness.
//!
//! This module provides the configuration structure controlling where the
//! objective tree is loaded from and how the harness behaves at runtime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "harness.json";

/// Default objectives document source.
fn default_objectives_source() -> String {
    "objectives.xml".to_string()
}

/// Default timeout in seconds for fetching a remote objectives document.
const fn default_fetch_timeout() -> u32 {
    30
}

/// Default capacity of the event broadcast channel.
const fn default_event_buffer_capacity() -> usize {
    100
}

/// Main configuration for the harness.
///
/// Controls the objectives source, fetch behavior, and event fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarnessConfig {
    /// Path or URL of the objectives XML document.
    ///
    /// Values starting with `http://` or `https://` are fetched over HTTP;
    /// anything else is read from the local filesystem.
    #[serde(default = "default_objectives_source")]
    pub objectives_source: String,

    /// Timeout in seconds when fetching a remote objectives document.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u32,

    /// Capacity of the event broadcast channel feeding WebSocket clients.
    #[serde(default = "default_event_buffer_capacity")]
    pub event_buffer_capacity: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            objectives_source: default_objectives_source(),
            fetch_timeout_seconds: default_fetch_timeout(),
            event_buffer_capacity: default_event_buffer_capacity(),
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `harness.json` in the current directory. If found, loads and
    /// validates the configuration. If not found, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            HarnessError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    ///
    /// Looks for `harness.json` in the given directory. If found, loads and
    /// validates the configuration. If not found, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    /// If the file exists but contains invalid JSON, returns an error.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::ConfigParseError` if the file exists but
    /// contains invalid JSON.
    ///
    /// Returns `HarnessError::ConfigValidationError` if the configuration
    /// values are invalid (e.g., empty source, zero timeout).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(HarnessError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| HarnessError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.objectives_source.trim().is_empty() {
            return Err(HarnessError::config_validation(
                "objectivesSource must not be empty",
                "Provide a file path or http(s) URL in your harness.json",
            ));
        }

        if self.fetch_timeout_seconds == 0 {
            return Err(HarnessError::config_validation(
                "fetchTimeoutSeconds must be greater than 0",
                "Set fetchTimeoutSeconds to at least 1 second in your harness.json",
            ));
        }

        if self.event_buffer_capacity == 0 {
            return Err(HarnessError::config_validation(
                "eventBufferCapacity must be greater than 0",
                "Set eventBufferCapacity to at least 1 in your harness.json",
            ));
        }

        Ok(())
    }

    /// Returns `true` if the objectives source is an HTTP(S) URL.
    #[must_use]
    pub fn source_is_url(&self) -> bool {
        self.objectives_source.starts_with("http://")
            || self.objectives_source.starts_with("https://")
    }
}
