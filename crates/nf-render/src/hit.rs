//! Hit testing: screen point → scene lookup.
//!
//! Scene nodes are disks of [`NODE_RADIUS`] world units. The index holds
//! their screen-space shapes in stacking order so a query walks it
//! front-to-back and the topmost node wins.

use crate::NODE_RADIUS;
use kurbo::{Circle, Point};
use nf_core::{Scene, SceneGraph, SceneId, Viewport};

/// Scenes in stacking order (bottom first). The selected scene is raised
/// to the top, matching how it is drawn.
pub fn stacking_order(graph: &SceneGraph, selection: Option<SceneId>) -> Vec<&Scene> {
    let mut order: Vec<&Scene> = graph.scenes().filter(|s| Some(s.id) != selection).collect();
    if let Some(selected) = selection.and_then(|id| graph.get(id)) {
        order.push(selected);
    }
    order
}

/// Screen-space node shapes keyed by scene id.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    /// Bottom → top.
    entries: Vec<(SceneId, Circle)>,
}

impl SpatialIndex {
    pub fn build(graph: &SceneGraph, viewport: &Viewport, selection: Option<SceneId>) -> Self {
        let radius = NODE_RADIUS * viewport.scale();
        let entries = stacking_order(graph, selection)
            .into_iter()
            .map(|scene| (scene.id, Circle::new(viewport.world_to_screen(scene.position), radius)))
            .collect();
        Self { entries }
    }

    /// Topmost scene whose disk contains `screen`, or `None` for background.
    pub fn hit(&self, screen: Point) -> Option<SceneId> {
        self.entries
            .iter()
            .rev()
            .find(|(_, circle)| contains(circle, screen))
            .map(|(id, _)| *id)
    }

    /// Screen-space shape of `id`.
    pub fn bounds(&self, id: SceneId) -> Option<Circle> {
        self.entries.iter().find(|(eid, _)| *eid == id).map(|(_, c)| *c)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn contains(circle: &Circle, p: Point) -> bool {
    (p - circle.center).hypot2() <= circle.radius * circle.radius
}

/// Find the topmost scene at screen position `screen`.
pub fn hit_test(
    graph: &SceneGraph,
    viewport: &Viewport,
    selection: Option<SceneId>,
    screen: Point,
) -> Option<SceneId> {
    let hit = SpatialIndex::build(graph, viewport, selection).hit(screen);
    log::trace!("hit test at ({}, {}) -> {hit:?}", screen.x, screen.y);
    hit
}
