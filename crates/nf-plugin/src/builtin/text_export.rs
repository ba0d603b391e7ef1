//! Plain-text export of every scene.

use crate::context::HookContext;
use crate::error::PluginError;
use crate::host::Plugin;
use crate::registry::Capabilities;
use nf_core::{Notice, SceneGraph};
use std::fs;
use std::path::{Path, PathBuf};

pub const NAME: &str = "text_exporter";
pub const EXPORT_LABEL: &str = "Export to Text";

const RULE: &str = "--------------------------------";

pub struct TextExporter;

impl Plugin for TextExporter {
    fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        caps.register_menu_command(EXPORT_LABEL, Box::new(export))
    }

    fn teardown(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        caps.remove_menu_command(EXPORT_LABEL);
        Ok(())
    }
}

/// `■ name`, a rule, the content and a blank line per scene, in document order.
pub fn render_text(graph: &SceneGraph) -> String {
    let mut out = String::new();
    for scene in graph.scenes() {
        out.push_str(&format!("■ {}\n{RULE}\n{}\n\n", scene.name, scene.content));
    }
    out
}

/// `<dir>/<stem>_export.txt` next to the project file.
pub fn export_path(project: &Path) -> PathBuf {
    let stem = project.file_stem().and_then(|s| s.to_str()).unwrap_or("project");
    project.with_file_name(format!("{stem}_export.txt"))
}

fn export(ctx: &mut HookContext<'_>) -> Result<(), PluginError> {
    if ctx.graph.is_empty() {
        ctx.notify(Notice::warning("There are no scenes to export."));
        return Ok(());
    }
    let Some(project) = ctx.project_path else {
        ctx.notify(Notice::warning("Save the project once before exporting it."));
        return Ok(());
    };
    let path = export_path(project);
    fs::write(&path, render_text(ctx.graph))
        .map_err(|e| PluginError::failed(format!("cannot write {}: {e}", path.display())))?;

    log::info!("exported {} scene(s) to {}", ctx.graph.len(), path.display());
    ctx.notify(Notice::info(format!("Exported the project to {}", path.display())));
    Ok(())
}
