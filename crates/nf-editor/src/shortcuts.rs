//! Keyboard shortcut mapping.
//!
//! Bindings are stored as Tk-style chords (`Control-n`, `Control-Shift-s`,
//! `Control-plus`) in the configuration file and resolved against
//! `KeyboardEvent.key`-style key names at runtime. `meta` counts as
//! `Control`, so ⌘N works wherever Ctrl+N does.

use crate::input::Modifiers;
use std::collections::BTreeMap;

/// Everything on the editor's command surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    NewProject,
    OpenProject,
    SaveProject,
    SaveProjectAs,
    AddScene,
    DeleteScene,
    AddBranch,
    EditBranch,
    DeleteBranch,
    ZoomIn,
    ZoomOut,
    ResetView,
    Settings,
    PluginManager,
}

impl Action {
    /// Actions that can carry a keybinding, in settings-dialog order.
    pub const BINDABLE: [Action; 9] = [
        Action::NewProject,
        Action::OpenProject,
        Action::SaveProject,
        Action::SaveProjectAs,
        Action::AddScene,
        Action::DeleteScene,
        Action::ZoomIn,
        Action::ZoomOut,
        Action::ResetView,
    ];

    /// Key under `[keybindings]`.
    pub fn config_key(&self) -> &'static str {
        match self {
            Self::NewProject => "new_project",
            Self::OpenProject => "open_project",
            Self::SaveProject => "save_project",
            Self::SaveProjectAs => "save_project_as",
            Self::AddScene => "add_scene",
            Self::DeleteScene => "delete_scene",
            Self::AddBranch => "add_branch",
            Self::EditBranch => "edit_branch",
            Self::DeleteBranch => "delete_branch",
            Self::ZoomIn => "zoom_in",
            Self::ZoomOut => "zoom_out",
            Self::ResetView => "reset_view",
            Self::Settings => "settings",
            Self::PluginManager => "plugin_manager",
        }
    }

    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::BINDABLE.into_iter().find(|a| a.config_key() == key)
    }

    /// Default chord for bindable actions.
    pub fn default_chord(&self) -> Option<&'static str> {
        Some(match self {
            Self::NewProject => "Control-n",
            Self::OpenProject => "Control-o",
            Self::SaveProject => "Control-s",
            Self::SaveProjectAs => "Control-Shift-s",
            Self::AddScene => "Control-a",
            Self::DeleteScene => "Control-d",
            Self::ZoomIn => "Control-plus",
            Self::ZoomOut => "Control-minus",
            Self::ResetView => "Control-0",
            _ => return None,
        })
    }

    /// Menu label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NewProject => "New",
            Self::OpenProject => "Open...",
            Self::SaveProject => "Save",
            Self::SaveProjectAs => "Save As...",
            Self::AddScene => "Add Scene",
            Self::DeleteScene => "Delete Scene",
            Self::AddBranch => "Add Branch...",
            Self::EditBranch => "Edit Branch...",
            Self::DeleteBranch => "Delete Branch",
            Self::ZoomIn => "Zoom In",
            Self::ZoomOut => "Zoom Out",
            Self::ResetView => "Reset View",
            Self::Settings => "Settings...",
            Self::PluginManager => "Plugin Management...",
        }
    }
}

/// Every bindable action with its default chord, keyed by config name.
pub fn default_bindings() -> BTreeMap<String, String> {
    Action::BINDABLE
        .into_iter()
        .filter_map(|a| a.default_chord().map(|c| (a.config_key().to_string(), c.to_string())))
        .collect()
}

// ─── Chords ──────────────────────────────────────────────────────────────

/// A parsed chord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    /// Lowercase key character or a named key (`"escape"`, `"f5"`).
    pub key: String,
}

impl Chord {
    /// Parse `Control-Shift-s` style text.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts: Vec<&str> = text.trim().split('-').collect();
        // "Control--" binds the minus key itself.
        if text.ends_with("--") {
            parts.pop();
            parts.pop();
            parts.push("-");
        }
        let (key, mods) = parts.split_last()?;
        let mut chord = Chord {
            ctrl: false,
            shift: false,
            alt: false,
            key: String::new(),
        };
        for m in mods {
            match m.to_ascii_lowercase().as_str() {
                "control" | "ctrl" | "command" | "cmd" | "meta" => chord.ctrl = true,
                "shift" => chord.shift = true,
                "alt" | "option" => chord.alt = true,
                _ => return None,
            }
        }
        chord.key = match key.to_ascii_lowercase().as_str() {
            "" => return None,
            "plus" => "+".to_string(),
            "minus" => "-".to_string(),
            "equal" => "=".to_string(),
            "space" => " ".to_string(),
            other => other.to_string(),
        };
        // Tk spells Shift+S as an uppercase `S`.
        if key.len() == 1 && key.chars().all(|c| c.is_ascii_uppercase()) {
            chord.shift = true;
        }
        Some(chord)
    }

    /// Does a key event with `key` and `modifiers` trigger this chord?
    pub fn matches(&self, key: &str, modifiers: Modifiers) -> bool {
        if self.ctrl != modifiers.command() || self.alt != modifiers.alt {
            return false;
        }
        let pressed = key.to_lowercase();
        let symbol = !self.key.chars().all(|c| c.is_alphanumeric());
        // Shift is part of how symbols are typed, so it only counts for
        // letters, digits and named keys.
        if !symbol && self.shift != modifiers.shift {
            return false;
        }
        pressed == self.key || (self.key == "+" && pressed == "=")
    }
}

/// Render a chord for menus: `Control-n` → `Ctrl+N`.
pub fn display_chord(text: &str) -> String {
    let Some(chord) = Chord::parse(text) else {
        return text.to_string();
    };
    let mut parts = Vec::new();
    if chord.ctrl {
        parts.push("Ctrl".to_string());
    }
    if chord.alt {
        parts.push("Alt".to_string());
    }
    if chord.shift {
        parts.push("Shift".to_string());
    }
    parts.push(match chord.key.as_str() {
        "+" => "Plus".to_string(),
        "-" => "Minus".to_string(),
        " " => "Space".to_string(),
        k => title_case(k),
    });
    parts.join("+")
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ─── Shortcut map ────────────────────────────────────────────────────────

/// Resolves key events into actions using the configured bindings.
#[derive(Debug, Clone, Default)]
pub struct ShortcutMap {
    bindings: Vec<(Action, String, Chord)>,
}

impl ShortcutMap {
    /// Build from `[keybindings]`. Unknown action names, unparsable chords
    /// and chords already taken are skipped with a warning.
    pub fn from_bindings(bindings: &BTreeMap<String, String>) -> Self {
        let mut map = Self::default();
        for action in Action::BINDABLE {
            let Some(text) = bindings.get(action.config_key()) else {
                continue;
            };
            let Some(chord) = Chord::parse(text) else {
                log::warn!("keybinding {} = {text:?} is not a valid chord", action.config_key());
                continue;
            };
            if let Some((other, _, _)) = map.bindings.iter().find(|(_, _, c)| *c == chord) {
                log::warn!(
                    "keybinding {text:?} for {} already used by {}",
                    action.config_key(),
                    other.config_key()
                );
                continue;
            }
            map.bindings.push((action, text.clone(), chord));
        }
        for name in bindings.keys() {
            if Action::from_config_key(name).is_none() {
                log::warn!("ignoring keybinding for unknown action {name:?}");
            }
        }
        map
    }

    /// Resolve a key event to an action.
    pub fn resolve(&self, key: &str, modifiers: Modifiers) -> Option<Action> {
        let hit = self
            .bindings
            .iter()
            .find(|(_, _, chord)| chord.matches(key, modifiers))
            .map(|(action, _, _)| *action);
        log::trace!("shortcut {key:?} {modifiers:?} -> {hit:?}");
        hit
    }

    /// Configured chord text for `action`.
    pub fn chord_for(&self, action: Action) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(a, _, _)| *a == action)
            .map(|(_, text, _)| text.as_str())
    }

    /// Menu accelerator text for `action`.
    pub fn accelerator(&self, action: Action) -> Option<String> {
        self.chord_for(action).map(display_chord)
    }
}
