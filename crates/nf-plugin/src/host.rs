//! Plugin lifecycle: discovery, load, unload, reload, and dispatch.
//!
//! Plugins are trait objects produced by named factories in a
//! [`PluginCatalog`]. Every call into plugin code goes through
//! [`guard`], so a failing or panicking plugin is logged, recorded, and
//! otherwise ignored; the host keeps running.

use crate::context::{HookContext, LifecycleEvent};
use crate::error::{PluginError, guard};
use crate::registry::{Capabilities, Registry};
use nf_core::DataMap;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

/// Names starting with this prefix are never offered by discovery.
pub const HIDDEN_PREFIX: char = '_';

/// An extension loaded into the editor.
pub trait Plugin {
    /// Prepare internal state. Runs before `register`.
    fn setup(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Publish menu commands, data keys, hooks and timers.
    fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError>;

    /// Withdraw what `register` published.
    fn teardown(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        let _ = caps;
        Ok(())
    }
}

/// What a factory knows about the plugin it is building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEnv {
    pub name: String,
    /// Directory the editor was started in; plugins keep their files here.
    pub work_dir: PathBuf,
}

pub type PluginFactory = Box<dyn Fn(&PluginEnv) -> Result<Box<dyn Plugin>, PluginError>>;

/// Named plugin factories, in registration order.
#[derive(Default)]
pub struct PluginCatalog {
    entries: Vec<(String, PluginFactory)>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the factory for `name`.
    pub fn register(&mut self, name: &str, factory: PluginFactory) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = factory;
        } else {
            self.entries.push((name.to_string(), factory));
        }
    }

    pub fn with(mut self, name: &str, factory: PluginFactory) -> Self {
        self.register(name, factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    fn factory(&self, name: &str) -> Option<&PluginFactory> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }
}

/// Where a plugin stands from the host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Discoverable and enabled, not loaded.
    Available,
    Loaded,
    Disabled,
    /// The last load or teardown failed; see [`PluginHost::last_error`].
    Failed,
}

struct LoadedPlugin {
    name: String,
    plugin: Box<dyn Plugin>,
}

pub struct PluginHost {
    catalog: PluginCatalog,
    work_dir: PathBuf,
    loaded: Vec<LoadedPlugin>,
    disabled: HashSet<String>,
    registry: Registry,
    failures: HashMap<String, PluginError>,
}

impl PluginHost {
    pub fn new(catalog: PluginCatalog, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            catalog,
            work_dir: work_dir.into(),
            loaded: Vec::new(),
            disabled: HashSet::new(),
            registry: Registry::new(Instant::now()),
            failures: HashMap::new(),
        }
    }

    // ─── Discovery & status ──────────────────────────────────────────────

    /// Plugin names offered to the user. Has no side effects.
    pub fn discover(&self) -> Vec<String> {
        self.catalog
            .names()
            .filter(|n| !n.starts_with(HIDDEN_PREFIX))
            .map(str::to_string)
            .collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.iter().any(|p| p.name == name)
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        self.loaded.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.contains(name)
    }

    /// Change whether `name` may be loaded. Does not load or unload it.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.disabled.remove(name);
        } else {
            self.disabled.insert(name.to_string());
        }
    }

    /// `None` for names discovery does not offer.
    pub fn state(&self, name: &str) -> Option<PluginState> {
        if name.starts_with(HIDDEN_PREFIX) || self.catalog.factory(name).is_none() {
            return None;
        }
        Some(if self.is_loaded(name) {
            PluginState::Loaded
        } else if !self.is_enabled(name) {
            PluginState::Disabled
        } else if self.failures.contains_key(name) {
            PluginState::Failed
        } else {
            PluginState::Available
        })
    }

    /// Most recent failure attributed to `name`.
    pub fn last_error(&self, name: &str) -> Option<&PluginError> {
        self.failures.get(name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn menu_labels(&self) -> Vec<&str> {
        self.registry.menu_labels()
    }

    pub fn toolbar_labels(&self) -> Vec<&str> {
        self.registry.toolbar_labels()
    }

    /// Fill reserved data keys missing from `data`.
    pub fn seed_data(&self, data: &mut DataMap) {
        self.registry.seed(data);
    }

    // ─── Lifecycle ───────────────────────────────────────────────────────

    /// Instantiate, set up and register `name`.
    ///
    /// On failure nothing the plugin published survives and the host has no
    /// entry for it.
    pub fn load(&mut self, name: &str) -> Result<(), PluginError> {
        if self.is_loaded(name) {
            log::warn!("{name}: already loaded");
            return Err(PluginError::AlreadyLoaded(name.to_string()));
        }
        if !self.is_enabled(name) {
            return Err(PluginError::Disabled(name.to_string()));
        }
        let factory = match self.catalog.factory(name) {
            Some(f) if !name.starts_with(HIDDEN_PREFIX) => f,
            _ => return Err(PluginError::UnknownPlugin(name.to_string())),
        };

        let env = PluginEnv {
            name: name.to_string(),
            work_dir: self.work_dir.clone(),
        };
        let registry = &mut self.registry;
        let result = guard(|| factory(&env)).and_then(|mut plugin| {
            guard(|| plugin.setup())?;
            let mut caps = Capabilities::new(name, registry);
            guard(|| plugin.register(&mut caps))?;
            Ok(plugin)
        });

        match result {
            Ok(plugin) => {
                self.loaded.push(LoadedPlugin {
                    name: name.to_string(),
                    plugin,
                });
                self.failures.remove(name);
                log::info!("{name}: loaded");
                Ok(())
            }
            Err(err) => {
                let retracted = self.registry.retract(name);
                log::error!("{name}: load failed: {err} ({retracted} registration(s) rolled back)");
                self.failures.insert(name.to_string(), err.clone());
                Err(err)
            }
        }
    }

    /// Load every discovered, enabled plugin. Returns the failures.
    pub fn load_enabled(&mut self) -> Vec<(String, PluginError)> {
        let mut failures = Vec::new();
        for name in self.discover() {
            if !self.is_enabled(&name) || self.is_loaded(&name) {
                continue;
            }
            if let Err(err) = self.load(&name) {
                failures.push((name, err));
            }
        }
        failures
    }

    /// Tear down and forget `name`. `Ok(false)` if it was not loaded.
    ///
    /// The entry is removed even when teardown fails; in that case whatever
    /// the plugin still has registered is retracted.
    pub fn unload(&mut self, name: &str) -> Result<bool, PluginError> {
        let Some(pos) = self.loaded.iter().position(|p| p.name == name) else {
            return Ok(false);
        };
        let mut entry = self.loaded.remove(pos);
        let mut caps = Capabilities::new(name, &mut self.registry);
        let result = guard(|| entry.plugin.teardown(&mut caps));

        match result {
            Ok(()) => {
                let leftovers = self.registry.owned_by(name);
                if !leftovers.is_empty() {
                    log::warn!("{name}: unloaded but left behind {}", leftovers.join(", "));
                }
                log::info!("{name}: unloaded");
                Ok(true)
            }
            Err(err) => {
                let retracted = self.registry.retract(name);
                log::error!("{name}: teardown failed: {err} ({retracted} registration(s) retracted)");
                self.failures.insert(name.to_string(), err.clone());
                Err(err)
            }
        }
    }

    /// Unload then load again.
    pub fn reload(&mut self, name: &str) -> Result<(), PluginError> {
        if let Err(err) = self.unload(name) {
            log::warn!("{name}: continuing reload after failed teardown: {err}");
        }
        self.load(name)
    }

    /// Unload everything, most recently loaded first.
    pub fn unload_all(&mut self) {
        let names: Vec<String> = self.loaded.iter().rev().map(|p| p.name.clone()).collect();
        for name in names {
            // Failures are already logged and recorded.
            let _ = self.unload(&name);
        }
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Notify subscribers of `event`. Returns the failures.
    pub fn emit(&mut self, event: LifecycleEvent, ctx: &mut HookContext<'_>) -> Vec<(String, PluginError)> {
        log::debug!("emit {event}");
        let failures = self.registry.emit(event, ctx);
        self.record(&failures, &event.to_string());
        failures
    }

    pub fn invoke_menu_command(&mut self, label: &str, ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
        let (owner, result) = self
            .registry
            .invoke_menu(label, ctx)
            .ok_or_else(|| PluginError::Rejected(format!("no menu command \"{label}\"")))?;
        self.settle(owner, result, label)
    }

    pub fn invoke_toolbar_entry(&mut self, label: &str, ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
        let (owner, result) = self
            .registry
            .invoke_toolbar(label, ctx)
            .ok_or_else(|| PluginError::Rejected(format!("no toolbar entry \"{label}\"")))?;
        self.settle(owner, result, label)
    }

    /// Fire due timers. Returns the failures.
    pub fn tick(&mut self, now: Instant, ctx: &mut HookContext<'_>) -> Vec<(String, PluginError)> {
        let failures = self.registry.advance_timers(now, ctx);
        self.record(&failures, "timer");
        failures
    }

    fn settle(&mut self, owner: String, result: Result<(), PluginError>, what: &str) -> Result<(), PluginError> {
        if let Err(err) = &result {
            log::error!("{owner}: \"{what}\" failed: {err}");
            self.failures.insert(owner, err.clone());
        }
        result
    }

    fn record(&mut self, failures: &[(String, PluginError)], what: &str) {
        for (owner, err) in failures {
            log::error!("{owner}: {what} callback failed: {err}");
            self.failures.insert(owner.clone(), err.clone());
        }
    }
}

impl Drop for PluginHost {
    fn drop(&mut self) {
        self.unload_all();
    }
}
