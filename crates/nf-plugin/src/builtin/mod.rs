//! Plugins shipped with the editor.

pub mod auto_backup;
pub mod character_roster;
pub mod text_export;

pub use auto_backup::AutoBackup;
pub use character_roster::{Character, CharacterRoster};
pub use text_export::TextExporter;

use crate::host::{Plugin, PluginCatalog, PluginEnv, PluginFactory};

fn factory<P: Plugin + 'static>(make: fn(&PluginEnv) -> P) -> PluginFactory {
    Box::new(move |env: &PluginEnv| Ok(Box::new(make(env)) as Box<dyn Plugin>))
}

/// Catalogue of every built-in plugin.
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(text_export::NAME, factory(|_| TextExporter))
        .with(auto_backup::NAME, factory(AutoBackup::new))
        .with(character_roster::NAME, factory(|_| CharacterRoster::default()))
}
