//! Cast list stored under the `characters` document key.
//!
//! The roster is normalised after a project is opened (malformed entries
//! are dropped with a warning) and sorted by name before every save.

use crate::context::{HookContext, LifecycleEvent};
use crate::error::PluginError;
use crate::host::Plugin;
use crate::registry::{Capabilities, HookId};
use nf_core::{DataMap, Notice};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NAME: &str = "character_roster";
pub const DATA_KEY: &str = "characters";
pub const SUMMARY_LABEL: &str = "Character Summary";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default = "fresh_id")]
    pub id: String,
    #[serde(default = "unnamed")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "white")]
    pub color: String,
    #[serde(default)]
    pub image_path: String,
    /// Fields written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn fresh_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn unnamed() -> String {
    "Unnamed".to_string()
}

fn white() -> String {
    "#FFFFFF".to_string()
}

/// Parse the roster. Entries that are not objects are counted and dropped.
pub fn read_roster(data: &DataMap) -> (Vec<Character>, usize) {
    let Some(Value::Array(items)) = data.get(DATA_KEY) else {
        return (Vec::new(), usize::from(data.contains_key(DATA_KEY)));
    };
    let mut skipped = 0;
    let roster = items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Character>(item.clone()) {
            Ok(c) if item.is_object() => Some(c),
            _ => {
                skipped += 1;
                None
            }
        })
        .collect();
    (roster, skipped)
}

pub fn write_roster(data: &mut DataMap, roster: &[Character]) -> Result<(), PluginError> {
    let value = serde_json::to_value(roster).map_err(|e| PluginError::failed(e.to_string()))?;
    data.insert(DATA_KEY.to_string(), value);
    Ok(())
}

#[derive(Default)]
pub struct CharacterRoster {
    hooks: Vec<HookId>,
}

impl Plugin for CharacterRoster {
    fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        caps.register_data_key(DATA_KEY, Value::Array(Vec::new()))?;
        self.hooks.push(caps.subscribe(LifecycleEvent::AfterNew, Box::new(ensure_roster)));
        self.hooks.push(caps.subscribe(LifecycleEvent::AfterOpen, Box::new(normalize)));
        self.hooks.push(caps.subscribe(LifecycleEvent::BeforeSave, Box::new(sort_by_name)));
        caps.register_menu_command(SUMMARY_LABEL, Box::new(summary))
    }

    fn teardown(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        for id in self.hooks.drain(..) {
            caps.unsubscribe(id);
        }
        caps.remove_menu_command(SUMMARY_LABEL);
        caps.release_data_key(DATA_KEY);
        Ok(())
    }
}

fn ensure_roster(ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
    if !ctx.data.contains_key(DATA_KEY) {
        ctx.data.insert(DATA_KEY.to_string(), Value::Array(Vec::new()));
    }
    Ok(())
}

fn normalize(ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
    let (roster, skipped) = read_roster(ctx.data);
    if skipped > 0 || !ctx.data.contains_key(DATA_KEY) {
        write_roster(ctx.data, &roster)?;
    }
    if skipped > 0 {
        log::warn!("dropped {skipped} malformed character entr(y/ies)");
        ctx.notify(Notice::warning(format!(
            "{skipped} character entr{} could not be read and were removed.",
            if skipped == 1 { "y" } else { "ies" }
        )));
        ctx.mark_dirty();
    }
    Ok(())
}

fn sort_by_name(ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
    let (mut roster, _) = read_roster(ctx.data);
    roster.sort_by(|a, b| a.name.cmp(&b.name));
    write_roster(ctx.data, &roster)
}

fn summary(ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
    let (mut roster, _) = read_roster(ctx.data);
    roster.sort_by(|a, b| a.name.cmp(&b.name));
    let message = if roster.is_empty() {
        "No characters yet.".to_string()
    } else {
        let names: Vec<&str> = roster.iter().map(|c| c.name.as_str()).collect();
        format!("{} character(s): {}", roster.len(), names.join(", "))
    };
    ctx.notify(Notice::info(message));
    Ok(())
}
