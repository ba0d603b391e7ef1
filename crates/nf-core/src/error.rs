//! Error taxonomy and user-facing notices.
//!
//! Every refused operation surfaces as an `EditorError`; the caller turns it
//! into a dismissible `Notice`. Nothing in the core panics on bad input.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    /// Empty required field, missing selection, self-targeting branch...
    #[error("{0}")]
    Validation(String),

    /// A scene or branch index that does not exist.
    #[error("{0} not found")]
    NotFound(String),

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed project file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("plugin `{plugin}` failed: {message}")]
    Plugin { plugin: String, message: String },
}

impl EditorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = EditorError> = std::result::Result<T, E>;

/// Severity of a user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A blocking, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl From<&EditorError> for Notice {
    fn from(err: &EditorError) -> Self {
        match err {
            EditorError::Validation(_) | EditorError::NotFound(_) => Notice::warning(err.to_string()),
            _ => Notice::error(err.to_string()),
        }
    }
}
