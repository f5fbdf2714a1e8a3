//! Error types for the harness.
//!
//! This module defines the error hierarchy for harness operations:
//! configuration loading, objective tree retrieval and parsing, and the
//! data-store bridge. Variants include actionable suggestions where possible
//! to help users resolve issues.

use std::path::PathBuf;

/// A specialized `Result` type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while running the harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your harness.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Objective Loading Errors
    // ========================================================================
    /// Objectives file was not found at the specified path.
    #[error("Objectives file not found: '{path}'\n\nSuggestion: Check the 'objectivesSource' field in harness.json or create the file")]
    ObjectivesNotFound {
        /// Path where the objectives file was expected.
        path: PathBuf,
    },

    /// Fetching the objectives document over HTTP failed.
    #[error("Failed to fetch objectives from '{url}': {message}\n\nSuggestion: Check that the URL is reachable and serves the objectives XML")]
    ObjectivesFetchError {
        /// The URL that was requested.
        url: String,
        /// Description of the fetch failure.
        message: String,
    },

    /// The objectives document is not well-formed XML.
    #[error("Failed to parse objectives XML from '{source_name}': {message}\n\nSuggestion: Validate the document with an XML linter")]
    ObjectivesParseError {
        /// The file path or URL the document came from.
        source_name: String,
        /// Description of the parse error.
        message: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Data Store Errors
    // ========================================================================
    /// An operation against the CMI data store failed.
    #[error("Data store error: {0}")]
    Cmi(#[from] simbridge_cmi::CmiError),
}

impl HarnessError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `ObjectivesNotFound` error.
    #[must_use]
    pub fn objectives_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ObjectivesNotFound { path: path.into() }
    }

    /// Creates a new `ObjectivesFetchError`.
    #[must_use]
    pub fn objectives_fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ObjectivesFetchError {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ObjectivesParseError`.
    #[must_use]
    pub fn objectives_parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ObjectivesParseError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Returns `true` if this error should abort startup rather than degrade
    /// to an empty objective tree.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. }
        )
    }
}
