//! Error types for configuration loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading a pipeline document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The document is not well-formed JSON.
    #[error("Config error on line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// A required section is absent.
    #[error("Missing section: {0}")]
    MissingSection(String),

    /// A section is present but has the wrong JSON type.
    #[error("Invalid section {section}: expected {expected}")]
    InvalidSection {
        section: String,
        expected: &'static str,
    },

    /// A field inside a section could not be decoded.
    #[error("Invalid field in {section}: {message}")]
    Field { section: String, message: String },

    /// A field decoded but its value is out of range.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid_section(section: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidSection {
            section: section.into(),
            expected,
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
