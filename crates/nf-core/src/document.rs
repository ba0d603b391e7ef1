//! On-disk project document (`.ngp`, JSON).
//!
//! ```json
//! { "scenes": [ { "id", "name", "content", "x", "y", "branches": [...] } ],
//!   "<plugin key>": <any JSON> }
//! ```
//!
//! Top-level keys other than `scenes` belong to plugins. They are carried
//! through untouched, even when the plugin that owns them is not loaded.

use crate::error::{EditorError, Result};
use crate::id::SceneId;
use crate::model::{Branch, Scene, SceneGraph};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smallvec::SmallVec;
use std::fs;
use std::path::Path;

/// The top-level key owned by the core.
pub const SCENES_KEY: &str = "scenes";

/// File extension used by project files.
pub const PROJECT_EXTENSION: &str = "ngp";

/// Plugin-owned top-level values, keyed by data key.
pub type DataMap = Map<String, Value>;

/// Serialized form of one scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneRecord {
    pub id: SceneId,
    pub name: String,
    #[serde(default)]
    pub content: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub branches: SmallVec<[Branch; 4]>,
}

impl From<&Scene> for SceneRecord {
    fn from(scene: &Scene) -> Self {
        Self {
            id: scene.id,
            name: scene.name.clone(),
            content: scene.content.clone(),
            x: scene.position.x,
            y: scene.position.y,
            branches: scene.branches.clone(),
        }
    }
}

impl From<SceneRecord> for Scene {
    fn from(record: SceneRecord) -> Self {
        let mut scene = Scene::new(record.id, record.name, Point::new(record.x, record.y));
        scene.content = record.content;
        scene.branches = record.branches;
        scene
    }
}

/// A whole project file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    pub scenes: Vec<SceneRecord>,
    /// Every other top-level key, preserved verbatim.
    #[serde(flatten)]
    pub data: DataMap,
}

impl ProjectDocument {
    /// Snapshot a graph plus plugin data.
    pub fn capture(graph: &SceneGraph, data: &DataMap) -> Self {
        let mut data = data.clone();
        data.remove(SCENES_KEY);
        Self {
            scenes: graph.scenes().map(SceneRecord::from).collect(),
            data,
        }
    }

    /// Split into the scene graph and the plugin data.
    pub fn into_parts(self) -> (SceneGraph, DataMap) {
        let graph = SceneGraph::from_scenes(self.scenes.into_iter().map(Scene::from));
        (graph, self.data)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and parse a project file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| EditorError::io(path, e))?;
        let doc = Self::from_json(&text)?;
        log::info!("read {} scene(s) from {}", doc.scenes.len(), path.display());
        Ok(doc)
    }

    /// Serialize and write a project file (UTF-8, pretty-printed).
    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.to_json()?;
        fs::write(path, text).map_err(|e| EditorError::io(path, e))?;
        log::info!("wrote {} scene(s) to {}", self.scenes.len(), path.display());
        Ok(())
    }
}
