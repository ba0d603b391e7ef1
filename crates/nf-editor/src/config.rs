//! Persistent editor settings (TOML).
//!
//! ```toml
//! recent_files = ["/stories/tale.ngp"]
//!
//! [keybindings]
//! new_project = "Control-n"
//!
//! [plugins]
//! auto_backup = true
//! ```
//!
//! The store heals itself: missing keybindings are filled with defaults and
//! written back. A file that cannot be parsed is left alone for the rest of
//! the session and the defaults are used in memory.

use crate::shortcuts::default_bindings;
use nf_core::{EditorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "novel_flow.toml";
pub const MAX_RECENT_FILES: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    /// Most recent first.
    #[serde(default)]
    pub recent_files: Vec<PathBuf>,
    #[serde(default)]
    pub keybindings: BTreeMap<String, String>,
    #[serde(default)]
    pub plugins: BTreeMap<String, bool>,
}

impl ConfigData {
    /// Add default keybindings that are missing. Returns whether anything
    /// changed.
    fn fill_defaults(&mut self) -> bool {
        let mut changed = false;
        for (action, chord) in default_bindings() {
            if !self.keybindings.contains_key(&action) {
                self.keybindings.insert(action, chord);
                changed = true;
            }
        }
        changed
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    data: ConfigData,
    /// Cleared when the file on disk could not be read; it is then never
    /// overwritten.
    persist: bool,
}

impl ConfigStore {
    /// Load `path`, creating or repairing it as needed. Never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (data, persist, write_back) = match fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<ConfigData>(&text) {
                Ok(mut data) => {
                    let filled = data.fill_defaults();
                    (data, true, filled)
                }
                Err(e) => {
                    log::warn!("cannot parse {}: {e}; using defaults", path.display());
                    (Self::defaults(), false, false)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("no configuration at {}; creating it", path.display());
                (Self::defaults(), true, true)
            }
            Err(e) => {
                log::warn!("cannot read {}: {e}; using defaults", path.display());
                (Self::defaults(), false, false)
            }
        };

        let store = Self { path, data, persist };
        if write_back {
            store.save_or_log();
        }
        store
    }

    /// An in-memory store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            data: Self::defaults(),
            persist: false,
        }
    }

    fn defaults() -> ConfigData {
        let mut data = ConfigData::default();
        data.fill_defaults();
        data
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &ConfigData {
        &self.data
    }

    /// Write the current settings. A no-op for stores that do not persist.
    pub fn save(&self) -> Result<()> {
        if !self.persist {
            return Ok(());
        }
        let text = toml::to_string_pretty(&self.data).map_err(|e| EditorError::Config(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| EditorError::io(&self.path, e))?;
        log::debug!("configuration saved to {}", self.path.display());
        Ok(())
    }

    fn save_or_log(&self) {
        if let Err(e) = self.save() {
            log::error!("{e}");
        }
    }

    // ─── Keybindings ─────────────────────────────────────────────────────

    pub fn keybindings(&self) -> &BTreeMap<String, String> {
        &self.data.keybindings
    }

    pub fn set_keybinding(&mut self, action: &str, chord: &str) -> Result<()> {
        self.data.keybindings.insert(action.to_string(), chord.to_string());
        self.save()
    }

    // ─── Recent files ────────────────────────────────────────────────────

    pub fn recent_files(&self) -> &[PathBuf] {
        &self.data.recent_files
    }

    /// Move `path` to the front of the list, dropping duplicates and the
    /// oldest entries beyond the limit.
    pub fn push_recent(&mut self, path: &Path) -> Result<()> {
        self.data.recent_files.retain(|p| p != path);
        self.data.recent_files.insert(0, path.to_path_buf());
        self.data.recent_files.truncate(MAX_RECENT_FILES);
        self.save()
    }

    // ─── Plugins ─────────────────────────────────────────────────────────

    /// Plugins not mentioned in the file are enabled.
    pub fn plugin_enabled(&self, name: &str) -> bool {
        self.data.plugins.get(name).copied().unwrap_or(true)
    }

    pub fn set_plugin_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.data.plugins.insert(name.to_string(), enabled);
        self.save()
    }

    /// Record newly discovered plugins as enabled.
    pub fn register_discovered<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let mut changed = false;
        for name in names {
            if !self.data.plugins.contains_key(name) {
                self.data.plugins.insert(name.to_string(), true);
                changed = true;
            }
        }
        if changed { self.save() } else { Ok(()) }
    }
}
