//! Core scene-graph data model for Novel Flow projects.
//!
//! A project is a directed graph where nodes are scenes (named blocks of
//! narrative text placed in world space) and edges are branches (labeled,
//! conditionally-gated choices leading to another scene). Branches are owned
//! by their source scene in display order; the petgraph edges mirror them so
//! the cascade on scene deletion only visits scenes that actually point at
//! the deleted one.

use crate::error::{EditorError, Result};
use crate::id::SceneId;
use kurbo::Point;
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Display name used when a branch target does not resolve.
pub const UNKNOWN_SCENE: &str = "Unknown scene";

/// Name given to scenes created from the menu or the canvas.
pub const DEFAULT_SCENE_NAME: &str = "New Scene";

// ─── Branch ──────────────────────────────────────────────────────────────

/// A choice leading from one scene to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Choice text shown to the player.
    pub text: String,
    /// The scene this choice leads to (a reference, not ownership).
    pub target: SceneId,
    /// Opaque gating expression. Never interpreted here.
    #[serde(default)]
    pub condition: String,
}

impl Branch {
    pub fn new(text: impl Into<String>, target: SceneId, condition: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target,
            condition: condition.into(),
        }
    }
}

/// One row of the branch table: the target is already resolved to a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRow {
    pub text: String,
    pub target_name: String,
    pub condition: String,
}

// ─── Scene ───────────────────────────────────────────────────────────────

/// A named node in the narrative graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Immutable after creation.
    pub id: SceneId,
    pub name: String,
    pub content: String,
    /// World-space center of the node.
    pub position: Point,
    /// Outgoing choices in display order. Mutated only through `SceneGraph`
    /// so the edge mirror stays in sync.
    pub(crate) branches: SmallVec<[Branch; 4]>,
}

impl Scene {
    pub fn new(id: SceneId, name: impl Into<String>, position: Point) -> Self {
        Self {
            id,
            name: name.into(),
            content: String::new(),
            position,
            branches: SmallVec::new(),
        }
    }

    /// Outgoing branches in display order.
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
}

// ─── Scene Graph ─────────────────────────────────────────────────────────

/// The complete set of scenes and branches of one project.
///
/// Scenes keep their insertion order, which is both the document order and
/// the drawing (stacking) order. Every core mutation keeps the referential
/// invariant: no branch targets a missing scene unless it was loaded that
/// way from a corrupt file.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    /// Scenes as nodes, one edge per branch whose target resolves.
    graph: StableDiGraph<Scene, ()>,

    /// Index from SceneId → NodeIndex for O(1) lookup.
    id_index: HashMap<SceneId, NodeIndex>,

    /// Insertion order of live scenes.
    order: Vec<NodeIndex>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from already-constructed scenes (document loading).
    ///
    /// Branches are kept verbatim even when their target is missing; the
    /// first scene wins when an id appears twice.
    pub fn from_scenes(scenes: impl IntoIterator<Item = Scene>) -> Self {
        let mut sg = Self::new();
        for scene in scenes {
            if sg.id_index.contains_key(&scene.id) {
                log::warn!("duplicate scene id {} dropped while loading", scene.id);
                continue;
            }
            sg.insert(scene);
        }
        // Edges are added once every scene exists so forward references link.
        for &idx in &sg.order {
            let targets: Vec<SceneId> = sg.graph[idx].branches.iter().map(|b| b.target).collect();
            for target in targets {
                if let Some(&t) = sg.id_index.get(&target) {
                    sg.graph.add_edge(idx, t, ());
                }
            }
        }
        sg
    }

    fn insert(&mut self, scene: Scene) -> NodeIndex {
        let id = scene.id;
        let idx = self.graph.add_node(scene);
        self.id_index.insert(id, idx);
        self.order.push(idx);
        idx
    }

    /// Create a scene with a fresh id and append it. Always succeeds.
    pub fn add_scene(&mut self, name: impl Into<String>, position: Point) -> &Scene {
        let idx = self.insert(Scene::new(SceneId::generate(), name, position));
        let scene = &self.graph[idx];
        log::debug!("added scene {} at ({}, {})", scene.id, position.x, position.y);
        scene
    }

    /// Remove a scene and every branch elsewhere that targets it.
    ///
    /// Returns `None` (and changes nothing) when `id` is absent.
    pub fn delete_scene(&mut self, id: SceneId) -> Option<Scene> {
        let idx = self.id_index.remove(&id)?;
        let sources: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter(|&src| src != idx)
            .collect();
        let removed = self.graph.remove_node(idx)?;
        self.order.retain(|&i| i != idx);

        let mut dropped = 0;
        for src in sources {
            let branches = &mut self.graph[src].branches;
            let before = branches.len();
            branches.retain(|b| b.target != id);
            dropped += before - branches.len();
        }
        log::debug!("deleted scene {id}, cascaded {dropped} branch(es)");
        Some(removed)
    }

    /// Look up a scene by id.
    pub fn get(&self, id: SceneId) -> Option<&Scene> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    pub fn contains(&self, id: SceneId) -> bool {
        self.id_index.contains_key(&id)
    }

    /// Scenes in insertion (document and stacking) order.
    pub fn scenes(&self) -> impl DoubleEndedIterator<Item = &Scene> + '_ {
        self.order.iter().map(|idx| &self.graph[*idx])
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = SceneId> + '_ {
        self.scenes().map(|s| s.id)
    }

    pub fn first(&self) -> Option<&Scene> {
        self.order.first().map(|idx| &self.graph[*idx])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn index_of(&self, id: SceneId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    fn scene_mut(&mut self, id: SceneId) -> Result<&mut Scene> {
        let idx = self
            .index_of(id)
            .ok_or_else(|| EditorError::not_found(format!("scene {id}")))?;
        Ok(&mut self.graph[idx])
    }

    // ─── Scene properties ────────────────────────────────────────────────

    /// Rename a scene. The name is trimmed and must not be empty.
    pub fn rename_scene(&mut self, id: SceneId, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditorError::validation("Scene name must not be empty"));
        }
        self.scene_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_content(&mut self, id: SceneId, content: impl Into<String>) -> Result<()> {
        self.scene_mut(id)?.content = content.into();
        Ok(())
    }

    pub fn set_position(&mut self, id: SceneId, position: Point) -> Result<()> {
        self.scene_mut(id)?.position = position;
        Ok(())
    }

    // ─── Branches ────────────────────────────────────────────────────────

    /// Append a branch to `source`. Returns its index.
    pub fn add_branch(
        &mut self,
        source: SceneId,
        text: &str,
        target: SceneId,
        condition: &str,
    ) -> Result<usize> {
        let src = self
            .index_of(source)
            .ok_or_else(|| EditorError::validation(format!("Source scene {source} does not exist")))?;
        self.validate_branch(source, text, target)?;

        self.graph[src]
            .branches
            .push(Branch::new(text.trim(), target, condition.trim()));
        self.link(src, target);
        Ok(self.graph[src].branches.len() - 1)
    }

    /// Replace the branch at `index` in place.
    pub fn edit_branch(
        &mut self,
        source: SceneId,
        index: usize,
        text: &str,
        target: SceneId,
        condition: &str,
    ) -> Result<()> {
        let src = self
            .index_of(source)
            .ok_or_else(|| EditorError::not_found(format!("scene {source}")))?;
        let old_target = self.branch_at(src, index)?.target;
        self.validate_branch(source, text, target)?;

        self.graph[src].branches[index] = Branch::new(text.trim(), target, condition.trim());
        if old_target != target {
            self.unlink(src, old_target);
            self.link(src, target);
        }
        Ok(())
    }

    /// Remove the branch at `index`, keeping the order of the rest.
    pub fn delete_branch(&mut self, source: SceneId, index: usize) -> Result<Branch> {
        let src = self
            .index_of(source)
            .ok_or_else(|| EditorError::not_found(format!("scene {source}")))?;
        self.branch_at(src, index)?;
        let removed = self.graph[src].branches.remove(index);
        self.unlink(src, removed.target);
        Ok(removed)
    }

    fn branch_at(&self, src: NodeIndex, index: usize) -> Result<&Branch> {
        let scene = &self.graph[src];
        scene.branches.get(index).ok_or_else(|| {
            EditorError::validation(format!(
                "Branch {index} is out of range for scene \"{}\" ({} branch(es))",
                scene.name,
                scene.branches.len()
            ))
        })
    }

    fn validate_branch(&self, source: SceneId, text: &str, target: SceneId) -> Result<()> {
        if text.trim().is_empty() {
            return Err(EditorError::validation("Choice text must not be empty"));
        }
        if !self.contains(target) {
            return Err(EditorError::validation(format!("Target scene {target} does not exist")));
        }
        if target == source {
            return Err(EditorError::validation("A branch cannot lead back to its own scene"));
        }
        Ok(())
    }

    fn link(&mut self, src: NodeIndex, target: SceneId) {
        if let Some(t) = self.index_of(target) {
            self.graph.add_edge(src, t, ());
        }
    }

    fn unlink(&mut self, src: NodeIndex, target: SceneId) {
        if let Some(t) = self.index_of(target)
            && let Some(edge) = self.graph.find_edge(src, t)
        {
            self.graph.remove_edge(edge);
        }
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    /// Display name of `id`, or [`UNKNOWN_SCENE`] when it does not resolve.
    pub fn resolve_target_name(&self, id: SceneId) -> &str {
        self.get(id).map_or(UNKNOWN_SCENE, |s| s.name.as_str())
    }

    /// Branch table rows for `id`, with targets resolved to display names.
    pub fn branch_rows(&self, id: SceneId) -> Result<Vec<BranchRow>> {
        let scene = self
            .get(id)
            .ok_or_else(|| EditorError::not_found(format!("scene {id}")))?;
        Ok(scene
            .branches
            .iter()
            .map(|b| BranchRow {
                text: b.text.clone(),
                target_name: self.resolve_target_name(b.target).to_string(),
                condition: b.condition.clone(),
            })
            .collect())
    }

    /// Scenes with at least one branch leading to `id` (excluding `id` itself).
    pub fn sources_of(&self, id: SceneId) -> Vec<SceneId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut sources: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter(|&src| src != idx)
            .collect();
        sources.sort();
        sources.dedup();
        sources.into_iter().map(|src| self.graph[src].id).collect()
    }

    /// `(source, branch index)` of every branch whose target is missing.
    pub fn dangling_branches(&self) -> Vec<(SceneId, usize)> {
        self.scenes()
            .flat_map(|scene| {
                scene
                    .branches
                    .iter()
                    .enumerate()
                    .filter(|(_, b)| !self.contains(b.target))
                    .map(move |(i, _)| (scene.id, i))
            })
            .collect()
    }
}
