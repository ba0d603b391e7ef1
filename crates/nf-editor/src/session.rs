//! The editor session: one open project plus everything around it.
//!
//! `Editor` owns the scene graph, viewport, selection, dirty flag and
//! plugin host, and is the only place they are mutated. UI layers feed it
//! input events and command-surface actions, draw what
//! [`Editor::render`] returns, and show the queued [`Notice`]s.

use crate::config::ConfigStore;
use crate::input::InputEvent;
use crate::interaction::{CanvasEffect, CanvasInteractionController, ContextAction, ContextMenu, InteractionState};
use crate::shortcuts::{Action, ShortcutMap};
use kurbo::{Point, Size};
use nf_core::lint::log_diagnostics;
use nf_core::viewport::ZOOM_STEP;
use nf_core::{
    DEFAULT_SCENE_NAME, DataMap, EditorError, Notice, ProjectDocument, Result, Scene, SceneGraph, SceneId,
    Viewport, lint_graph,
};
use nf_plugin::{HookContext, LifecycleEvent, PluginCatalog, PluginError, PluginHost, PluginState, builtin};
use nf_render::{DrawCommand, Theme, render_scene_with_theme};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Where scenes created from the menu are placed, in world units.
pub const DEFAULT_SCENE_POSITION: Point = Point::new(100.0, 100.0);

/// Canvas size assumed until the UI reports one.
pub const DEFAULT_CANVAS_SIZE: Size = Size::new(800.0, 600.0);

/// Something only the UI layer can do.
#[derive(Debug, Clone, PartialEq)]
pub enum UiRequest {
    FocusName(SceneId),
    ContextMenu(ContextMenu),
    /// The action needs a dialog (file picker, branch form, confirmation).
    Dialog(Action),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRequest {
    /// Nothing unsaved; the session has shut down.
    Ready,
    /// Ask the user to save, discard or cancel.
    ConfirmUnsaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseChoice {
    Save,
    Discard,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    /// The user cancelled; nothing changed.
    Stayed,
    /// Save was chosen for a project that has no path yet.
    NeedsSaveAs,
}

/// Document state that plugin callbacks may see.
#[derive(Default)]
struct Document {
    graph: SceneGraph,
    data: DataMap,
    path: Option<PathBuf>,
    dirty: bool,
}

impl Document {
    fn hook_ctx<'a>(&'a mut self, notices: &'a mut Vec<Notice>) -> HookContext<'a> {
        HookContext::new(
            &mut self.graph,
            &mut self.data,
            self.path.as_deref(),
            &mut self.dirty,
            notices,
        )
    }
}

pub struct Editor {
    doc: Document,
    viewport: Viewport,
    selection: Option<SceneId>,
    controller: CanvasInteractionController,
    canvas_size: Size,
    theme: Theme,
    config: ConfigStore,
    shortcuts: ShortcutMap,
    plugins: PluginHost,
    notices: Vec<Notice>,
    closed: bool,
}

impl Editor {
    /// Start a session with an empty project and every enabled plugin of
    /// `catalog` loaded.
    pub fn new(mut config: ConfigStore, catalog: PluginCatalog, work_dir: impl Into<PathBuf>) -> Self {
        let shortcuts = ShortcutMap::from_bindings(config.keybindings());
        let mut plugins = PluginHost::new(catalog, work_dir);

        let discovered = plugins.discover();
        if let Err(e) = config.register_discovered(discovered.iter().map(String::as_str)) {
            log::warn!("{e}");
        }
        for name in &discovered {
            plugins.set_enabled(name, config.plugin_enabled(name));
        }

        let mut editor = Self {
            doc: Document::default(),
            viewport: Viewport::default(),
            selection: None,
            controller: CanvasInteractionController::new(),
            canvas_size: DEFAULT_CANVAS_SIZE,
            theme: Theme::light(),
            config,
            shortcuts,
            plugins,
            notices: Vec::new(),
            closed: false,
        };
        let failures = editor.plugins.load_enabled();
        editor.report_plugin_failures(failures);
        editor.plugins.seed_data(&mut editor.doc.data);
        editor
    }

    /// Session with the built-in plugins.
    pub fn with_builtins(config: ConfigStore, work_dir: impl Into<PathBuf>) -> Self {
        Self::new(config, builtin::catalog(), work_dir)
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn graph(&self) -> &SceneGraph {
        &self.doc.graph
    }

    /// Plugin-owned document values.
    pub fn data(&self) -> &DataMap {
        &self.doc.data
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn selection(&self) -> Option<SceneId> {
        self.selection
    }

    pub fn selected_scene(&self) -> Option<&Scene> {
        self.selection.and_then(|id| self.doc.graph.get(id))
    }

    pub fn is_dirty(&self) -> bool {
        self.doc.dirty
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.doc.path.as_deref()
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.controller.state()
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn shortcuts(&self) -> &ShortcutMap {
        &self.shortcuts
    }

    pub fn plugins(&self) -> &PluginHost {
        &self.plugins
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Drain queued user-facing messages.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Window title: file name plus a `*` while there are unsaved changes.
    pub fn title(&self) -> String {
        let name = self
            .doc
            .path
            .as_deref()
            .and_then(|p| p.file_name())
            .map_or_else(|| "Untitled".to_string(), |n| n.to_string_lossy().into_owned());
        let mark = if self.doc.dirty { "*" } else { "" };
        format!("{name}{mark} - Novel Flow")
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        self.canvas_size = size;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Draw commands for the current frame.
    pub fn render(&self) -> Vec<DrawCommand> {
        render_scene_with_theme(&self.doc.graph, &self.viewport, self.selection, &self.theme)
    }

    // ─── Project files ───────────────────────────────────────────────────

    /// Replace the open project with an empty one. Unsaved changes are
    /// discarded; check [`Editor::is_dirty`] first.
    pub fn new_project(&mut self) {
        self.emit(LifecycleEvent::BeforeNew);
        self.doc = Document::default();
        self.plugins.seed_data(&mut self.doc.data);
        self.reset_session_view();
        self.emit(LifecycleEvent::AfterNew);
        log::info!("new project");
    }

    /// Load `path`. On failure the open project is untouched.
    pub fn open_project(&mut self, path: &Path) -> Result<()> {
        let (graph, data) = ProjectDocument::read(path)?.into_parts();

        let diagnostics = lint_graph(&graph);
        log_diagnostics(&diagnostics);
        let dangling = graph.dangling_branches().len();

        self.doc = Document {
            graph,
            data,
            path: Some(path.to_path_buf()),
            dirty: false,
        };
        self.plugins.seed_data(&mut self.doc.data);
        self.reset_session_view();
        if dangling > 0 {
            self.notices.push(Notice::warning(format!(
                "{dangling} branch(es) point to scenes that do not exist."
            )));
        }
        self.remember_recent(path);
        self.emit(LifecycleEvent::AfterOpen);
        Ok(())
    }

    /// Save to the current path. Fails with a validation error when the
    /// project has never been saved.
    pub fn save_project(&mut self) -> Result<()> {
        let path = self
            .doc
            .path
            .clone()
            .ok_or_else(|| EditorError::validation("The project has no file yet; use Save As."))?;
        self.write_to(&path)
    }

    pub fn save_project_as(&mut self, path: &Path) -> Result<()> {
        self.write_to(path)?;
        self.doc.path = Some(path.to_path_buf());
        self.remember_recent(path);
        Ok(())
    }

    /// A failed write restores the plugin data `BeforeSave` hooks rewrote.
    fn write_to(&mut self, path: &Path) -> Result<()> {
        let data_before = self.doc.data.clone();
        self.emit(LifecycleEvent::BeforeSave);
        if let Err(e) = ProjectDocument::capture(&self.doc.graph, &self.doc.data).write(path) {
            self.doc.data = data_before;
            return Err(e);
        }
        self.doc.dirty = false;
        self.emit(LifecycleEvent::AfterSave);
        Ok(())
    }

    fn remember_recent(&mut self, path: &Path) {
        if let Err(e) = self.config.push_recent(path) {
            log::warn!("cannot update recent files: {e}");
        }
    }

    fn reset_session_view(&mut self) {
        self.selection = None;
        self.viewport.reset();
        self.controller.reset();
    }

    // ─── Scenes ──────────────────────────────────────────────────────────

    /// Add a scene at the default spot and select it.
    pub fn add_scene(&mut self) -> SceneId {
        self.add_scene_at(DEFAULT_SCENE_POSITION)
    }

    /// Add a scene at a world position and select it.
    pub fn add_scene_at(&mut self, position: Point) -> SceneId {
        let id = self.doc.graph.add_scene(DEFAULT_SCENE_NAME, position).id;
        self.selection = Some(id);
        self.doc.dirty = true;
        id
    }

    /// Select `id`, or clear the selection with `None`.
    pub fn select(&mut self, id: Option<SceneId>) -> Result<()> {
        if let Some(id) = id
            && !self.doc.graph.contains(id)
        {
            return Err(EditorError::not_found(format!("scene {id}")));
        }
        self.selection = id;
        Ok(())
    }

    fn require_selection(&self) -> Result<SceneId> {
        self.selection
            .filter(|id| self.doc.graph.contains(*id))
            .ok_or_else(|| EditorError::validation("Select a scene first."))
    }

    pub fn delete_selected_scene(&mut self) -> Result<Scene> {
        let id = self.require_selection()?;
        self.delete_scene(id)
    }

    pub fn delete_scene(&mut self, id: SceneId) -> Result<Scene> {
        let removed = self
            .doc
            .graph
            .delete_scene(id)
            .ok_or_else(|| EditorError::not_found(format!("scene {id}")))?;
        if self.selection == Some(id) {
            self.selection = None;
        }
        self.doc.dirty = true;
        Ok(removed)
    }

    pub fn rename_selected(&mut self, name: &str) -> Result<()> {
        let id = self.require_selection()?;
        self.doc.graph.rename_scene(id, name)?;
        self.doc.dirty = true;
        Ok(())
    }

    pub fn set_selected_content(&mut self, content: &str) -> Result<()> {
        let id = self.require_selection()?;
        if self.doc.graph.get(id).is_some_and(|s| s.content == content) {
            return Ok(());
        }
        self.doc.graph.set_content(id, content)?;
        self.doc.dirty = true;
        Ok(())
    }

    // ─── Branches of the selected scene ──────────────────────────────────

    /// Scenes a new branch from the selection may lead to: every scene
    /// except the selection itself, as `(id, name)`.
    pub fn branch_targets(&self) -> Vec<(SceneId, String)> {
        self.doc
            .graph
            .scenes()
            .filter(|s| Some(s.id) != self.selection)
            .map(|s| (s.id, s.name.clone()))
            .collect()
    }

    pub fn add_branch(&mut self, text: &str, target: SceneId, condition: &str) -> Result<usize> {
        let source = self.require_selection()?;
        let index = self.doc.graph.add_branch(source, text, target, condition)?;
        self.doc.dirty = true;
        Ok(index)
    }

    pub fn edit_branch(&mut self, index: usize, text: &str, target: SceneId, condition: &str) -> Result<()> {
        let source = self.require_selection()?;
        self.doc.graph.edit_branch(source, index, text, target, condition)?;
        self.doc.dirty = true;
        Ok(())
    }

    pub fn delete_branch(&mut self, index: usize) -> Result<()> {
        let source = self.require_selection()?;
        self.doc.graph.delete_branch(source, index)?;
        self.doc.dirty = true;
        Ok(())
    }

    // ─── View ────────────────────────────────────────────────────────────

    fn canvas_center(&self) -> Point {
        Point::new(self.canvas_size.width / 2.0, self.canvas_size.height / 2.0)
    }

    pub fn zoom_in(&mut self) {
        let center = self.canvas_center();
        self.viewport.zoom_at(center, ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        let center = self.canvas_center();
        self.viewport.zoom_at(center, 1.0 / ZOOM_STEP);
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Feed one input event. Returns what the UI layer has to do.
    pub fn handle_input(&mut self, event: &InputEvent) -> Vec<UiRequest> {
        if let InputEvent::Key { key, modifiers } = event
            && key != "Escape"
        {
            return match self.shortcuts.resolve(key, *modifiers) {
                Some(action) => self.dispatch(action).into_iter().collect(),
                None => Vec::new(),
            };
        }

        let effects = self
            .controller
            .handle(event, &self.doc.graph, &self.viewport, self.selection);
        let mut requests = Vec::new();
        for effect in effects {
            self.apply(effect, &mut requests);
        }
        requests
    }

    fn apply(&mut self, effect: CanvasEffect, requests: &mut Vec<UiRequest>) {
        match effect {
            CanvasEffect::Select(id) => self.selection = Some(id),
            CanvasEffect::ClearSelection => self.selection = None,
            CanvasEffect::MoveScene { id, position } => {
                if let Err(e) = self.doc.graph.set_position(id, position) {
                    log::debug!("move ignored: {e}");
                }
            }
            CanvasEffect::CommitMove { id } => {
                log::debug!("moved {id}");
                self.doc.dirty = true;
            }
            CanvasEffect::PanBy(delta) => self.viewport.pan_by(delta),
            CanvasEffect::ZoomAt { anchor, factor } => self.viewport.zoom_at(anchor, factor),
            CanvasEffect::FocusName(id) => requests.push(UiRequest::FocusName(id)),
            CanvasEffect::OpenContextMenu(menu) => requests.push(UiRequest::ContextMenu(menu)),
        }
    }

    /// Run an entry picked from a canvas context menu.
    pub fn handle_context_action(&mut self, action: ContextAction) -> Result<()> {
        match action {
            ContextAction::DeleteNode(id) => self.delete_scene(id).map(|_| ()),
            ContextAction::AddNodeHere(position) => {
                self.add_scene_at(position);
                Ok(())
            }
            ContextAction::ResetView => {
                self.reset_view();
                Ok(())
            }
        }
    }

    /// Run a command-surface action. Actions that need user input come
    /// back as a [`UiRequest::Dialog`]; failures become notices.
    pub fn dispatch(&mut self, action: Action) -> Option<UiRequest> {
        let dialog = Some(UiRequest::Dialog(action));
        let result = match action {
            Action::NewProject if self.doc.dirty => return dialog,
            Action::NewProject => {
                self.new_project();
                Ok(())
            }
            Action::SaveProject if self.doc.path.is_none() => return Some(UiRequest::Dialog(Action::SaveProjectAs)),
            Action::SaveProject => self.save_project(),
            Action::AddScene => {
                self.add_scene();
                Ok(())
            }
            Action::DeleteScene => self.delete_selected_scene().map(|_| ()),
            Action::AddBranch | Action::EditBranch | Action::DeleteBranch => match self.require_selection() {
                Ok(_) => return dialog,
                Err(e) => Err(e),
            },
            Action::ZoomIn => {
                self.zoom_in();
                Ok(())
            }
            Action::ZoomOut => {
                self.zoom_out();
                Ok(())
            }
            Action::ResetView => {
                self.reset_view();
                Ok(())
            }
            Action::OpenProject | Action::SaveProjectAs | Action::Settings | Action::PluginManager => {
                return dialog;
            }
        };
        if let Err(e) = result {
            log::debug!("{action:?} refused: {e}");
            self.notices.push(Notice::from(&e));
        }
        None
    }

    // ─── Plugins ─────────────────────────────────────────────────────────

    /// Labels for the plugin menu.
    pub fn plugin_menu(&self) -> Vec<&str> {
        self.plugins.menu_labels()
    }

    pub fn plugin_toolbar(&self) -> Vec<&str> {
        self.plugins.toolbar_labels()
    }

    pub fn run_menu_command(&mut self, label: &str) -> Result<()> {
        let owner = self.plugins.registry().menu_owner(label).map(str::to_string);
        let result = self
            .plugins
            .invoke_menu_command(label, &mut self.doc.hook_ctx(&mut self.notices));
        self.prune_selection();
        self.plugin_result(owner.as_deref().unwrap_or(label), result)
    }

    pub fn run_toolbar_entry(&mut self, label: &str) -> Result<()> {
        let owner = self.plugins.registry().toolbar_owner(label).map(str::to_string);
        let result = self
            .plugins
            .invoke_toolbar_entry(label, &mut self.doc.hook_ctx(&mut self.notices));
        self.prune_selection();
        self.plugin_result(owner.as_deref().unwrap_or(label), result)
    }

    /// Drive plugin timers. Call from the event loop.
    pub fn tick(&mut self, now: Instant) {
        let failures = self.plugins.tick(now, &mut self.doc.hook_ctx(&mut self.notices));
        self.prune_selection();
        self.report_plugin_failures(failures);
    }

    /// `(name, state)` of every discoverable plugin.
    pub fn plugin_states(&self) -> Vec<(String, PluginState)> {
        self.plugins
            .discover()
            .into_iter()
            .filter_map(|name| self.plugins.state(&name).map(|s| (name, s)))
            .collect()
    }

    pub fn load_plugin(&mut self, name: &str) -> Result<()> {
        let result = self.plugins.load(name);
        self.plugins.seed_data(&mut self.doc.data);
        self.plugin_result(name, result)
    }

    pub fn unload_plugin(&mut self, name: &str) -> Result<()> {
        let result = self.plugins.unload(name).map(|_| ());
        self.plugin_result(name, result)
    }

    pub fn reload_plugin(&mut self, name: &str) -> Result<()> {
        let result = self.plugins.reload(name);
        self.plugins.seed_data(&mut self.doc.data);
        self.plugin_result(name, result)
    }

    /// Persist the flag, then load or unload to match it.
    pub fn set_plugin_enabled(&mut self, name: &str, enabled: bool) -> Result<()> {
        self.config.set_plugin_enabled(name, enabled)?;
        self.plugins.set_enabled(name, enabled);
        match (enabled, self.plugins.is_loaded(name)) {
            (true, false) => self.load_plugin(name),
            (false, true) => self.unload_plugin(name),
            _ => Ok(()),
        }
    }

    fn emit(&mut self, event: LifecycleEvent) {
        let failures = self.plugins.emit(event, &mut self.doc.hook_ctx(&mut self.notices));
        self.prune_selection();
        self.report_plugin_failures(failures);
    }

    /// Plugin callbacks may delete scenes; drop a selection that no longer
    /// resolves.
    fn prune_selection(&mut self) {
        if let Some(id) = self.selection
            && !self.doc.graph.contains(id)
        {
            log::debug!("selected scene {id} removed by a plugin");
            self.selection = None;
        }
    }

    fn plugin_result(&mut self, plugin: &str, result: std::result::Result<(), PluginError>) -> Result<()> {
        result.map_err(|e| {
            let err = e.for_plugin(plugin);
            self.notices.push(Notice::from(&err));
            err
        })
    }

    fn report_plugin_failures(&mut self, failures: Vec<(String, PluginError)>) {
        for (plugin, err) in failures {
            self.notices.push(Notice::from(&err.for_plugin(&plugin)));
        }
    }

    // ─── Closing ─────────────────────────────────────────────────────────

    /// Ask to close. Shuts down immediately when nothing is unsaved.
    pub fn request_close(&mut self) -> CloseRequest {
        if self.doc.dirty {
            CloseRequest::ConfirmUnsaved
        } else {
            self.shutdown();
            CloseRequest::Ready
        }
    }

    /// Act on the user's answer to [`CloseRequest::ConfirmUnsaved`].
    pub fn resolve_close(&mut self, choice: CloseChoice) -> Result<CloseOutcome> {
        match choice {
            CloseChoice::Cancel => Ok(CloseOutcome::Stayed),
            CloseChoice::Discard => {
                self.shutdown();
                Ok(CloseOutcome::Closed)
            }
            CloseChoice::Save if self.doc.path.is_none() => Ok(CloseOutcome::NeedsSaveAs),
            CloseChoice::Save => {
                self.save_project()?;
                self.shutdown();
                Ok(CloseOutcome::Closed)
            }
        }
    }

    fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.emit(LifecycleEvent::BeforeClose);
        self.plugins.unload_all();
        self.closed = true;
        log::info!("session closed");
    }
}
