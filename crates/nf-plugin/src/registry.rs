//! Capability registry: everything plugins publish into the editor.
//!
//! Each entry remembers its owning plugin, so the host can report what a
//! plugin left behind and retract it wholesale after a failure.

use crate::context::{HookContext, HookFn, LifecycleEvent};
use crate::error::{PluginError, guard};
use crate::timer::{TimerId, TimerQueue};
use nf_core::{DataMap, SCENES_KEY};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Identifies one lifecycle subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

struct Command {
    owner: String,
    label: String,
    callback: HookFn,
}

struct Subscription {
    id: HookId,
    owner: String,
    event: LifecycleEvent,
    callback: HookFn,
}

struct DataKey {
    owner: String,
    key: String,
    default: Value,
}

pub struct Registry {
    menu: Vec<Command>,
    toolbar: Vec<Command>,
    data_keys: Vec<DataKey>,
    hooks: Vec<Subscription>,
    timers: TimerQueue,
    next_hook: u64,
}

impl Registry {
    pub fn new(start: Instant) -> Self {
        Self {
            menu: Vec::new(),
            toolbar: Vec::new(),
            data_keys: Vec::new(),
            hooks: Vec::new(),
            timers: TimerQueue::new(start),
            next_hook: 1,
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Menu command labels in registration order.
    pub fn menu_labels(&self) -> Vec<&str> {
        self.menu.iter().map(|c| c.label.as_str()).collect()
    }

    pub fn toolbar_labels(&self) -> Vec<&str> {
        self.toolbar.iter().map(|c| c.label.as_str()).collect()
    }

    /// Plugin that registered the menu command `label`.
    pub fn menu_owner(&self, label: &str) -> Option<&str> {
        self.menu.iter().find(|c| c.label == label).map(|c| c.owner.as_str())
    }

    pub fn toolbar_owner(&self, label: &str) -> Option<&str> {
        self.toolbar.iter().find(|c| c.label == label).map(|c| c.owner.as_str())
    }

    /// Reserved data keys with their defaults.
    pub fn data_defaults(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.data_keys.iter().map(|d| (d.key.as_str(), &d.default))
    }

    pub fn data_key_owner(&self, key: &str) -> Option<&str> {
        self.data_keys.iter().find(|d| d.key == key).map(|d| d.owner.as_str())
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// Human-readable list of everything `owner` still has registered.
    pub fn owned_by(&self, owner: &str) -> Vec<String> {
        let mut out = Vec::new();
        out.extend(
            self.menu
                .iter()
                .filter(|c| c.owner == owner)
                .map(|c| format!("menu command \"{}\"", c.label)),
        );
        out.extend(
            self.toolbar
                .iter()
                .filter(|c| c.owner == owner)
                .map(|c| format!("toolbar entry \"{}\"", c.label)),
        );
        out.extend(
            self.data_keys
                .iter()
                .filter(|d| d.owner == owner)
                .map(|d| format!("data key \"{}\"", d.key)),
        );
        out.extend(
            self.hooks
                .iter()
                .filter(|h| h.owner == owner)
                .map(|h| format!("{} hook", h.event)),
        );
        out.extend(self.timers.owned_by(owner).into_iter().map(|id| id.to_string()));
        out
    }

    // ─── Invocation ──────────────────────────────────────────────────────

    /// Run the menu command `label`. Returns its owner and outcome, or
    /// `None` when no such command exists.
    pub(crate) fn invoke_menu(
        &mut self,
        label: &str,
        ctx: &mut HookContext<'_>,
    ) -> Option<(String, Result<(), PluginError>)> {
        invoke(&mut self.menu, label, ctx)
    }

    pub(crate) fn invoke_toolbar(
        &mut self,
        label: &str,
        ctx: &mut HookContext<'_>,
    ) -> Option<(String, Result<(), PluginError>)> {
        invoke(&mut self.toolbar, label, ctx)
    }

    /// Run every subscriber of `event` in subscription order.
    pub(crate) fn emit(&mut self, event: LifecycleEvent, ctx: &mut HookContext<'_>) -> Vec<(String, PluginError)> {
        let mut failures = Vec::new();
        for hook in self.hooks.iter_mut().filter(|h| h.event == event) {
            let callback = &mut hook.callback;
            if let Err(err) = guard(|| callback(ctx)) {
                failures.push((hook.owner.clone(), err));
            }
        }
        failures
    }

    pub(crate) fn advance_timers(&mut self, now: Instant, ctx: &mut HookContext<'_>) -> Vec<(String, PluginError)> {
        self.timers.advance(now, ctx)
    }

    /// Fill reserved data keys missing from `data` with their defaults.
    pub fn seed(&self, data: &mut DataMap) {
        for (key, default) in self.data_defaults() {
            if !data.contains_key(key) {
                data.insert(key.to_string(), default.clone());
            }
        }
    }

    /// Remove everything `owner` registered. Returns the number of entries.
    pub(crate) fn retract(&mut self, owner: &str) -> usize {
        let before = self.menu.len() + self.toolbar.len() + self.data_keys.len() + self.hooks.len();
        self.menu.retain(|c| c.owner != owner);
        self.toolbar.retain(|c| c.owner != owner);
        self.data_keys.retain(|d| d.owner != owner);
        self.hooks.retain(|h| h.owner != owner);
        let after = self.menu.len() + self.toolbar.len() + self.data_keys.len() + self.hooks.len();
        before - after + self.timers.cancel_all(owner)
    }
}

fn invoke(
    commands: &mut [Command],
    label: &str,
    ctx: &mut HookContext<'_>,
) -> Option<(String, Result<(), PluginError>)> {
    let command = commands.iter_mut().find(|c| c.label == label)?;
    let callback = &mut command.callback;
    let result = guard(|| callback(ctx));
    Some((command.owner.clone(), result))
}

// ─── Capabilities ────────────────────────────────────────────────────────

/// The registration surface handed to a plugin's `register` and `teardown`.
///
/// Everything published through it is recorded under the plugin's name.
pub struct Capabilities<'a> {
    owner: &'a str,
    registry: &'a mut Registry,
}

impl<'a> Capabilities<'a> {
    pub(crate) fn new(owner: &'a str, registry: &'a mut Registry) -> Self {
        Self { owner, registry }
    }

    /// Name of the plugin these capabilities belong to.
    pub fn owner(&self) -> &str {
        self.owner
    }

    fn reject(&self, what: String) -> PluginError {
        log::warn!("{}: {what}", self.owner);
        PluginError::Rejected(what)
    }

    pub fn register_menu_command(&mut self, label: &str, callback: HookFn) -> Result<(), PluginError> {
        if self.registry.menu.iter().any(|c| c.label == label) {
            return Err(self.reject(format!("menu command \"{label}\" already exists")));
        }
        self.registry.menu.push(Command {
            owner: self.owner.to_string(),
            label: label.to_string(),
            callback,
        });
        log::debug!("{}: added menu command \"{label}\"", self.owner);
        Ok(())
    }

    /// Remove one of this plugin's menu commands.
    pub fn remove_menu_command(&mut self, label: &str) -> bool {
        remove_command(&mut self.registry.menu, self.owner, label)
    }

    pub fn register_toolbar_entry(&mut self, label: &str, callback: HookFn) -> Result<(), PluginError> {
        if self.registry.toolbar.iter().any(|c| c.label == label) {
            return Err(self.reject(format!("toolbar entry \"{label}\" already exists")));
        }
        self.registry.toolbar.push(Command {
            owner: self.owner.to_string(),
            label: label.to_string(),
            callback,
        });
        Ok(())
    }

    pub fn remove_toolbar_entry(&mut self, label: &str) -> bool {
        remove_command(&mut self.registry.toolbar, self.owner, label)
    }

    /// Reserve a top-level document key. `"scenes"` and keys held by
    /// another plugin are refused; re-registering an own key updates the
    /// default.
    pub fn register_data_key(&mut self, key: &str, default: Value) -> Result<(), PluginError> {
        if key == SCENES_KEY {
            return Err(self.reject(format!("data key \"{key}\" is reserved by the editor")));
        }
        match self.registry.data_keys.iter().position(|d| d.key == key) {
            Some(i) if self.registry.data_keys[i].owner != self.owner => {
                let owner = self.registry.data_keys[i].owner.clone();
                Err(self.reject(format!("data key \"{key}\" is already claimed by {owner}")))
            }
            Some(i) => {
                self.registry.data_keys[i].default = default;
                Ok(())
            }
            None => {
                self.registry.data_keys.push(DataKey {
                    owner: self.owner.to_string(),
                    key: key.to_string(),
                    default,
                });
                log::debug!("{}: reserved data key \"{key}\"", self.owner);
                Ok(())
            }
        }
    }

    pub fn release_data_key(&mut self, key: &str) -> bool {
        let before = self.registry.data_keys.len();
        self.registry
            .data_keys
            .retain(|d| !(d.key == key && d.owner == self.owner));
        before != self.registry.data_keys.len()
    }

    pub fn subscribe(&mut self, event: LifecycleEvent, callback: HookFn) -> HookId {
        let id = HookId(self.registry.next_hook);
        self.registry.next_hook += 1;
        self.registry.hooks.push(Subscription {
            id,
            owner: self.owner.to_string(),
            event,
            callback,
        });
        id
    }

    pub fn unsubscribe(&mut self, id: HookId) -> bool {
        let owner = self.owner;
        let before = self.registry.hooks.len();
        self.registry.hooks.retain(|h| !(h.id == id && h.owner == owner));
        before != self.registry.hooks.len()
    }

    /// Run `callback` every `interval`, starting one interval from now.
    pub fn schedule_repeating(&mut self, interval: Duration, callback: HookFn) -> TimerId {
        self.registry.timers.schedule(self.owner, interval, callback)
    }

    pub fn cancel_timer(&mut self, id: TimerId) -> bool {
        self.registry.timers.cancel(self.owner, id)
    }
}

fn remove_command(commands: &mut Vec<Command>, owner: &str, label: &str) -> bool {
    let before = commands.len();
    commands.retain(|c| !(c.label == label && c.owner == owner));
    before != commands.len()
}
