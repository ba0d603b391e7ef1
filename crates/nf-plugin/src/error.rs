//! Plugin failures and the boundary that contains them.

use nf_core::EditorError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// The plugin reported an error.
    #[error("{0}")]
    Failed(String),

    /// The plugin panicked; the payload message is kept.
    #[error("panicked: {0}")]
    Panicked(String),

    #[error("no plugin named `{0}`")]
    UnknownPlugin(String),

    #[error("`{0}` is already loaded")]
    AlreadyLoaded(String),

    #[error("`{0}` is not loaded")]
    NotLoaded(String),

    #[error("`{0}` is disabled")]
    Disabled(String),

    /// A capability registration the host refused.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl PluginError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Attribute this failure to `plugin` for the editor-wide error type.
    pub fn for_plugin(self, plugin: &str) -> EditorError {
        EditorError::Plugin {
            plugin: plugin.to_string(),
            message: self.to_string(),
        }
    }
}

/// Run plugin code, turning a panic into [`PluginError::Panicked`].
///
/// Nothing a plugin does may unwind into the host.
pub fn guard<T>(f: impl FnOnce() -> Result<T, PluginError>) -> Result<T, PluginError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(PluginError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
