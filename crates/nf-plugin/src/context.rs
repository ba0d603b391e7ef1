//! What a plugin callback gets to see and touch.

use crate::error::PluginError;
use nf_core::{DataMap, Notice, SceneGraph};
use std::fmt;
use std::path::Path;

/// Points in the document lifecycle plugins can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BeforeNew,
    AfterNew,
    AfterOpen,
    BeforeSave,
    AfterSave,
    BeforeClose,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BeforeNew => "before-new",
            Self::AfterNew => "after-new",
            Self::AfterOpen => "after-open",
            Self::BeforeSave => "before-save",
            Self::AfterSave => "after-save",
            Self::BeforeClose => "before-close",
        };
        f.write_str(name)
    }
}

/// Mutable view of the open project, handed to every plugin callback.
pub struct HookContext<'a> {
    pub graph: &'a mut SceneGraph,
    /// Plugin-owned top-level document values.
    pub data: &'a mut DataMap,
    /// `None` until the project has been saved or opened from disk.
    pub project_path: Option<&'a Path>,
    dirty: &'a mut bool,
    notices: &'a mut Vec<Notice>,
}

impl<'a> HookContext<'a> {
    pub fn new(
        graph: &'a mut SceneGraph,
        data: &'a mut DataMap,
        project_path: Option<&'a Path>,
        dirty: &'a mut bool,
        notices: &'a mut Vec<Notice>,
    ) -> Self {
        Self {
            graph,
            data,
            project_path,
            dirty,
            notices,
        }
    }

    pub fn is_dirty(&self) -> bool {
        *self.dirty
    }

    /// Flag the document as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        *self.dirty = true;
    }

    /// Queue a message for the user.
    pub fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// A plugin callback: menu command, toolbar entry, lifecycle hook or timer.
pub type HookFn = Box<dyn FnMut(&mut HookContext<'_>) -> Result<(), PluginError>>;
