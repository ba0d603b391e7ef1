//! Integration tests: editor session flows (nf-editor).
//!
//! Drives `Editor` the way a UI layer would: input events, command actions,
//! file operations and plugin management, with the built-in plugins loaded.

use nf_core::{EditorError, Point, Severity};
use nf_editor::{
    Action, CONFIG_FILE_NAME, CloseChoice, CloseOutcome, CloseRequest, ConfigStore, ContextAction, Editor,
    InputEvent, Modifiers, PointerButton, UiRequest,
};
use nf_plugin::{Capabilities, HookContext, Plugin, PluginCatalog, PluginEnv, PluginError, PluginState};
use nf_plugin::builtin::{auto_backup, character_roster, text_export};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;
use std::time::{Duration, Instant};

fn editor(dir: &Path) -> Editor {
    let _ = env_logger::builder().is_test(true).try_init();
    Editor::with_builtins(ConfigStore::load(dir.join(CONFIG_FILE_NAME)), dir)
}

/// Deletes every scene from a menu command.
struct Pruner;

impl Plugin for Pruner {
    fn register(&mut self, caps: &mut Capabilities<'_>) -> Result<(), PluginError> {
        caps.register_menu_command(
            "Prune",
            Box::new(|ctx: &mut HookContext<'_>| {
                let ids: Vec<_> = ctx.graph.ids().collect();
                for id in ids {
                    ctx.graph.delete_scene(id);
                }
                ctx.mark_dirty();
                Ok(())
            }),
        )
    }
}

fn ctrl_shift() -> Modifiers {
    Modifiers {
        shift: true,
        ..Modifiers::CTRL
    }
}

// ─── Files ───────────────────────────────────────────────────────────────

#[test]
fn save_and_reopen_keeps_scenes_branches_and_plugin_data() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    assert!(ed.take_notices().is_empty());

    let a = ed.add_scene();
    ed.rename_selected("Dawn").unwrap();
    let b = ed.add_scene_at(Point::new(300.0, 100.0));
    ed.rename_selected("Dusk").unwrap();
    ed.select(Some(a)).unwrap();
    assert_eq!(ed.add_branch("Wait", b, "patient").unwrap(), 0);

    let path = dir.path().join("tale.ngp");
    ed.save_project_as(&path).unwrap();
    assert!(!ed.is_dirty());
    assert_eq!(ed.project_path(), Some(path.as_path()));

    let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["scenes"].as_array().unwrap().len(), 2);
    assert_eq!(raw[character_roster::DATA_KEY], json!([]));

    ed.new_project();
    assert!(ed.graph().is_empty());
    assert_eq!(ed.project_path(), None);
    assert_eq!(ed.data()[character_roster::DATA_KEY], json!([]));

    ed.open_project(&path).unwrap();
    assert!(!ed.is_dirty());
    assert_eq!(ed.selection(), None);
    assert_eq!(ed.graph().len(), 2);
    let dawn = ed.graph().scenes().find(|s| s.name == "Dawn").unwrap();
    let rows = ed.graph().branch_rows(dawn.id).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].target_name, "Dusk");
    assert_eq!(rows[0].condition, "patient");
    assert_eq!(ed.config().recent_files()[0], path);
}

#[test]
fn failed_open_leaves_the_project_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    ed.add_scene();

    let bad = dir.path().join("bad.ngp");
    std::fs::write(&bad, "not json").unwrap();
    assert!(matches!(ed.open_project(&bad), Err(EditorError::Format(_))));
    assert!(matches!(
        ed.open_project(&dir.path().join("missing.ngp")),
        Err(EditorError::Io { .. })
    ));

    assert_eq!(ed.graph().len(), 1);
    assert!(ed.is_dirty());
    assert_eq!(ed.project_path(), None);
}

#[test]
fn opening_a_damaged_roster_repairs_it_and_marks_dirty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cast.ngp");
    let doc = json!({
        "scenes": [],
        "characters": [{ "id": "1", "name": "Aki" }, 42],
        "weather": "rain"
    });
    std::fs::write(&path, doc.to_string()).unwrap();

    let mut ed = editor(dir.path());
    ed.open_project(&path).unwrap();

    assert!(ed.is_dirty());
    assert_eq!(ed.data()[character_roster::DATA_KEY].as_array().unwrap().len(), 1);
    assert_eq!(ed.data()["weather"], json!("rain"));
    let notices = ed.take_notices();
    assert!(notices.iter().any(|n| n.severity == Severity::Warning));
}

#[test]
fn failed_save_restores_plugin_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cast.ngp");
    let roster = json!([{ "id": "2", "name": "Yuki" }, { "id": "1", "name": "Aki" }]);
    let doc = json!({ "scenes": [], "characters": roster });
    std::fs::write(&path, doc.to_string()).unwrap();

    let mut ed = editor(dir.path());
    ed.open_project(&path).unwrap();
    let before = ed.data()[character_roster::DATA_KEY].clone();

    let unwritable = dir.path().join("no_such_dir").join("cast.ngp");
    assert!(matches!(ed.save_project_as(&unwritable), Err(EditorError::Io { .. })));

    assert_eq!(ed.data()[character_roster::DATA_KEY], before);
    assert_eq!(ed.project_path(), Some(path.as_path()));
}

#[test]
fn save_without_a_path_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    assert!(matches!(ed.save_project(), Err(EditorError::Validation(_))));
}

// ─── Closing ─────────────────────────────────────────────────────────────

#[test]
fn cancelled_close_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    ed.add_scene();

    assert_eq!(ed.request_close(), CloseRequest::ConfirmUnsaved);
    assert_eq!(ed.resolve_close(CloseChoice::Cancel).unwrap(), CloseOutcome::Stayed);
    assert!(!ed.is_closed());
    assert!(ed.is_dirty());
    assert_eq!(ed.graph().len(), 1);
    assert_eq!(ed.plugins().loaded_names().len(), 3);

    assert_eq!(ed.resolve_close(CloseChoice::Save).unwrap(), CloseOutcome::NeedsSaveAs);
    assert!(!ed.is_closed());

    ed.save_project_as(&dir.path().join("done.ngp")).unwrap();
    assert_eq!(ed.request_close(), CloseRequest::Ready);
    assert!(ed.is_closed());
    assert!(ed.plugins().loaded_names().is_empty());
}

#[test]
fn discard_closes_and_unloads_plugins() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    ed.add_scene();

    assert_eq!(ed.resolve_close(CloseChoice::Discard).unwrap(), CloseOutcome::Closed);
    assert!(ed.is_closed());
    assert!(ed.plugins().loaded_names().is_empty());
    assert!(ed.plugin_menu().is_empty());
}

// ─── Canvas input ────────────────────────────────────────────────────────

#[test]
fn click_selects_without_dirtying_and_drag_commits() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    let a = ed.add_scene();
    ed.save_project_as(&dir.path().join("drag.ngp")).unwrap();
    ed.select(None).unwrap();

    ed.handle_input(&InputEvent::press(100.0, 100.0));
    ed.handle_input(&InputEvent::moved(102.0, 101.0));
    assert!(ed.handle_input(&InputEvent::release(102.0, 101.0)).is_empty());
    assert_eq!(ed.selection(), Some(a));
    assert!(!ed.is_dirty());
    assert_eq!(ed.graph().get(a).unwrap().position, Point::new(100.0, 100.0));

    ed.handle_input(&InputEvent::press(100.0, 100.0));
    ed.handle_input(&InputEvent::moved(130.0, 110.0));
    assert!(!ed.is_dirty());
    ed.handle_input(&InputEvent::release(130.0, 110.0));
    assert!(ed.is_dirty());
    assert_eq!(ed.graph().get(a).unwrap().position, Point::new(130.0, 110.0));
}

#[test]
fn background_drag_pans_the_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    ed.add_scene();

    ed.handle_input(&InputEvent::press(500.0, 400.0));
    ed.handle_input(&InputEvent::moved(540.0, 400.0));
    ed.handle_input(&InputEvent::release(540.0, 400.0));

    assert_eq!(ed.viewport().world_to_screen(Point::new(100.0, 100.0)), Point::new(140.0, 100.0));
}

#[test]
fn double_click_asks_for_name_focus() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    let a = ed.add_scene();
    ed.select(None).unwrap();

    let requests = ed.handle_input(&InputEvent::DoubleClick { x: 110.0, y: 90.0 });
    assert_eq!(requests, vec![UiRequest::FocusName(a)]);
    assert_eq!(ed.selection(), Some(a));
}

#[test]
fn context_menu_actions() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());

    let requests = ed.handle_input(&InputEvent::PointerDown {
        x: 400.0,
        y: 300.0,
        button: PointerButton::Secondary,
        modifiers: Modifiers::NONE,
    });
    let [UiRequest::ContextMenu(menu)] = requests.as_slice() else {
        panic!("expected a context menu, got {requests:?}");
    };
    assert_eq!(menu.target, None);
    let add_here = menu.items[0];
    assert_eq!(add_here, ContextAction::AddNodeHere(Point::new(400.0, 300.0)));

    ed.handle_context_action(add_here).unwrap();
    let id = ed.selection().unwrap();
    assert_eq!(ed.graph().get(id).unwrap().position, Point::new(400.0, 300.0));

    ed.zoom_in();
    ed.handle_context_action(ContextAction::ResetView).unwrap();
    assert_eq!(ed.viewport().scale(), 1.0);

    ed.handle_context_action(ContextAction::DeleteNode(id)).unwrap();
    assert!(ed.graph().is_empty());
    assert_eq!(ed.selection(), None);
    assert!(matches!(
        ed.handle_context_action(ContextAction::DeleteNode(id)),
        Err(EditorError::NotFound(_))
    ));
}

#[test]
fn deleting_a_target_drops_branches_into_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    let a = ed.add_scene();
    let b = ed.add_scene_at(Point::new(400.0, 100.0));
    ed.select(Some(a)).unwrap();
    ed.add_branch("Go", b, "").unwrap();
    assert!(
        ed.render()
            .iter()
            .any(|c| matches!(c, nf_render::DrawCommand::Edge { .. }))
    );

    ed.delete_scene(b).unwrap();

    assert!(ed.graph().branch_rows(a).unwrap().is_empty());
    assert_eq!(ed.selection(), Some(a));
    assert!(
        !ed.render()
            .iter()
            .any(|c| matches!(c, nf_render::DrawCommand::Edge { .. }))
    );
}

// ─── Shortcuts ───────────────────────────────────────────────────────────

#[test]
fn new_project_shortcut_confirms_unsaved_work() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());

    ed.add_scene();
    let requests = ed.handle_input(&InputEvent::key("n", Modifiers::CTRL));
    assert_eq!(requests, vec![UiRequest::Dialog(Action::NewProject)]);
    assert_eq!(ed.graph().len(), 1);

    ed.save_project_as(&dir.path().join("kept.ngp")).unwrap();
    assert!(ed.handle_input(&InputEvent::key("n", Modifiers::CTRL)).is_empty());
    assert!(ed.graph().is_empty());
}

#[test]
fn zoom_shortcuts() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());

    ed.handle_input(&InputEvent::key("+", ctrl_shift()));
    assert!(ed.viewport().scale() > 1.0);
    ed.handle_input(&InputEvent::key("0", Modifiers::CTRL));
    assert_eq!(ed.viewport().scale(), 1.0);
    ed.handle_input(&InputEvent::key("-", Modifiers::CTRL));
    assert!(ed.viewport().scale() < 1.0);
}

#[test]
fn custom_keybinding_replaces_default() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = ConfigStore::load(dir.path().join(CONFIG_FILE_NAME));
    config.set_keybinding("add_scene", "Control-Shift-a").unwrap();
    let mut ed = Editor::with_builtins(config, dir.path());

    ed.handle_input(&InputEvent::key("a", Modifiers::CTRL));
    assert!(ed.graph().is_empty());
    ed.handle_input(&InputEvent::key("A", ctrl_shift()));
    assert_eq!(ed.graph().len(), 1);
    assert_eq!(ed.shortcuts().accelerator(Action::AddScene).as_deref(), Some("Ctrl+Shift+A"));
}

// ─── Plugins ─────────────────────────────────────────────────────────────

#[test]
fn disabling_a_plugin_persists_and_unloads_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    assert!(ed.plugin_menu().contains(&text_export::EXPORT_LABEL));

    ed.set_plugin_enabled(text_export::NAME, false).unwrap();
    assert!(!ed.plugin_menu().contains(&text_export::EXPORT_LABEL));
    drop(ed);

    let config = ConfigStore::load(dir.path().join(CONFIG_FILE_NAME));
    assert!(!config.plugin_enabled(text_export::NAME));
    let mut ed = Editor::with_builtins(config, dir.path());
    assert!(!ed.plugins().is_loaded(text_export::NAME));
    assert!(
        ed.plugin_states()
            .contains(&(text_export::NAME.to_string(), PluginState::Disabled))
    );

    ed.set_plugin_enabled(text_export::NAME, true).unwrap();
    assert!(ed.plugins().is_loaded(text_export::NAME));
    assert!(ed.plugin_menu().contains(&text_export::EXPORT_LABEL));
}

#[test]
fn plugin_menu_commands_run_against_the_open_project() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());

    ed.run_menu_command(character_roster::SUMMARY_LABEL).unwrap();
    let notices = ed.take_notices();
    assert_eq!(notices.last().unwrap().message, "No characters yet.");

    ed.add_scene();
    ed.set_selected_content("It begins.").unwrap();
    ed.save_project_as(&dir.path().join("tale.ngp")).unwrap();
    ed.run_menu_command(text_export::EXPORT_LABEL).unwrap();
    let text = std::fs::read_to_string(dir.path().join("tale_export.txt")).unwrap();
    assert!(text.contains("It begins."));

    let err = ed.run_menu_command("Make Coffee").unwrap_err();
    assert!(matches!(err, EditorError::Plugin { .. }));
    assert_eq!(ed.take_notices().last().unwrap().severity, Severity::Error);
}

#[test]
fn selection_is_cleared_when_a_plugin_deletes_it() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = PluginCatalog::new().with(
        "pruner",
        Box::new(|_: &PluginEnv| Ok(Box::new(Pruner) as Box<dyn Plugin>)),
    );
    let config = ConfigStore::load(dir.path().join(CONFIG_FILE_NAME));
    let mut ed = Editor::new(config, catalog, dir.path());
    let a = ed.add_scene();
    assert_eq!(ed.selection(), Some(a));

    ed.run_menu_command("Prune").unwrap();

    assert!(ed.graph().is_empty());
    assert_eq!(ed.selection(), None);
    assert!(ed.branch_targets().is_empty());
}

#[test]
fn tick_drives_auto_backup() {
    let dir = tempfile::tempdir().unwrap();
    let mut ed = editor(dir.path());
    ed.add_scene();

    ed.tick(Instant::now() + Duration::from_secs(6 * 60));

    let backups = dir.path().join(auto_backup::BACKUP_DIR);
    assert_eq!(std::fs::read_dir(backups).unwrap().count(), 1);
    assert!(ed.is_dirty());
}
