//! Error types shared across Lightbox crates.

use std::path::PathBuf;

/// Top-level error type for Lightbox operations.
#[derive(Debug, thiserror::Error)]
pub enum LightboxError {
    #[error("Malformed control description at line {line}: {reason} ({content:?})")]
    MalformedInput {
        line: usize,
        content: String,
        reason: String,
    },

    #[error("Control discovery failed for {device:?}: {message}")]
    ControlDiscovery { device: PathBuf, message: String },

    #[error("Writing control {identifier} failed: {exit_info}")]
    ControlWriteFailed {
        identifier: String,
        exit_info: String,
    },

    #[error("Invalid value {value} for control {identifier}: {reason}")]
    InvalidControlValue {
        identifier: String,
        value: i64,
        reason: String,
    },

    #[error("Unknown control: {identifier}")]
    UnknownControl { identifier: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Platform error: {message}")]
    Platform { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using LightboxError.
pub type LightboxResult<T> = Result<T, LightboxError>;

impl LightboxError {
    pub fn malformed(line: usize, content: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            content: content.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_value(identifier: impl Into<String>, value: i64, reason: impl Into<String>) -> Self {
        Self::InvalidControlValue {
            identifier: identifier.into(),
            value,
            reason: reason.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
