//! Scene graph → ordered draw commands.
//!
//! A full redraw on every call: branch edges first, then scene nodes, then
//! the selected scene and the edges touching it raised above everything
//! else. The output is backend-agnostic; a canvas, SVG or GPU painter walks
//! the list front to back.

use crate::NODE_RADIUS;
use crate::hit::stacking_order;
use kurbo::{Circle, Line, Point, Vec2};
use nf_core::{Branch, Scene, SceneGraph, SceneId, Viewport};

/// Length of the arrow head along the edge, in world units.
const ARROW_LENGTH: f64 = 12.0;
/// Half the width of the arrow head base, in world units.
const ARROW_HALF_WIDTH: f64 = 5.0;
/// Vertical gap between a branch label and its condition label, in pixels.
const CONDITION_OFFSET: f64 = 15.0;

const NAME_SIZE: f64 = 12.0;
const CHOICE_SIZE: f64 = 11.0;
const CONDITION_SIZE: f64 = 8.0;

// ─── Colors & Theme ──────────────────────────────────────────────────────

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// `#RRGGBB` / `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Colors used for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Rgba,
    pub node_fill: Rgba,
    pub node_selected_fill: Rgba,
    pub node_outline: Rgba,
    pub edge: Rgba,
    pub edge_highlight: Rgba,
    pub text: Rgba,
    pub condition_text: Rgba,
}

impl Theme {
    pub fn light() -> Self {
        Self {
            background: Rgba::rgb(255, 255, 255),
            node_fill: Rgba::rgb(255, 255, 255),
            node_selected_fill: Rgba::rgb(173, 216, 230),
            node_outline: Rgba::rgb(0, 0, 0),
            edge: Rgba::rgb(60, 60, 60),
            edge_highlight: Rgba::rgb(30, 110, 220),
            text: Rgba::rgb(0, 0, 0),
            condition_text: Rgba::rgb(110, 110, 110),
        }
    }

    pub fn dark() -> Self {
        Self {
            background: Rgba::rgb(30, 30, 34),
            node_fill: Rgba::rgb(52, 52, 60),
            node_selected_fill: Rgba::rgb(40, 90, 140),
            node_outline: Rgba::rgb(200, 200, 200),
            edge: Rgba::rgb(170, 170, 170),
            edge_highlight: Rgba::rgb(110, 170, 255),
            text: Rgba::rgb(235, 235, 235),
            condition_text: Rgba::rgb(150, 150, 150),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::light()
    }
}

// ─── Draw commands ───────────────────────────────────────────────────────

/// One screen-space drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// A branch arrow, already trimmed to the node rims.
    Edge {
        source: SceneId,
        branch: usize,
        line: Line,
        /// Arrow head triangle: tip, left, right.
        arrow: [Point; 3],
        color: Rgba,
        highlighted: bool,
    },
    /// A scene node disk.
    Node {
        id: SceneId,
        circle: Circle,
        fill: Rgba,
        outline: Rgba,
        selected: bool,
    },
    /// Centered text.
    Text {
        anchor: Point,
        text: String,
        size: f64,
        color: Rgba,
    },
}

/// Render with the light theme.
pub fn render_scene(graph: &SceneGraph, viewport: &Viewport, selection: Option<SceneId>) -> Vec<DrawCommand> {
    render_scene_with_theme(graph, viewport, selection, &Theme::light())
}

pub fn render_scene_with_theme(
    graph: &SceneGraph,
    viewport: &Viewport,
    selection: Option<SceneId>,
    theme: &Theme,
) -> Vec<DrawCommand> {
    // A stale selection is treated as no selection.
    let selection = selection.filter(|id| graph.contains(*id));
    let mut out = Vec::new();
    let mut raised_edges = Vec::new();

    for scene in graph.scenes() {
        for (i, branch) in scene.branches().iter().enumerate() {
            let touches_selection =
                selection.is_some_and(|sel| sel == scene.id || sel == branch.target);
            if touches_selection {
                raised_edges.push((scene, i, branch));
            } else {
                paint_edge(&mut out, graph, viewport, scene, i, branch, false, theme);
            }
        }
    }

    let order = stacking_order(graph, selection);
    let (raised_node, rest) = match selection {
        Some(_) => match order.split_last() {
            Some((last, rest)) => (Some(*last), rest),
            None => (None, &order[..]),
        },
        None => (None, &order[..]),
    };

    for scene in rest {
        paint_node(&mut out, viewport, scene, false, theme);
    }

    for (scene, i, branch) in raised_edges {
        paint_edge(&mut out, graph, viewport, scene, i, branch, true, theme);
    }
    if let Some(scene) = raised_node {
        paint_node(&mut out, viewport, scene, true, theme);
    }

    log::trace!("render: {} scene(s) -> {} command(s)", graph.len(), out.len());
    out
}

// ─── Painters ────────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn paint_edge(
    out: &mut Vec<DrawCommand>,
    graph: &SceneGraph,
    viewport: &Viewport,
    source: &Scene,
    index: usize,
    branch: &Branch,
    highlighted: bool,
    theme: &Theme,
) {
    // Dangling targets have nothing to point at.
    let Some(target) = graph.get(branch.target) else {
        return;
    };
    let Some((line, arrow)) = edge_geometry(source.position, target.position, viewport) else {
        return;
    };

    out.push(DrawCommand::Edge {
        source: source.id,
        branch: index,
        line,
        arrow,
        color: if highlighted { theme.edge_highlight } else { theme.edge },
        highlighted,
    });

    let mid = line.midpoint();
    out.push(DrawCommand::Text {
        anchor: mid,
        text: branch.text.clone(),
        size: CHOICE_SIZE,
        color: theme.text,
    });
    if !branch.condition.is_empty() {
        out.push(DrawCommand::Text {
            anchor: mid + Vec2::new(0.0, CONDITION_OFFSET),
            text: format!("[if: {}]", branch.condition),
            size: CONDITION_SIZE,
            color: theme.condition_text,
        });
    }
}

fn paint_node(out: &mut Vec<DrawCommand>, viewport: &Viewport, scene: &Scene, selected: bool, theme: &Theme) {
    let center = viewport.world_to_screen(scene.position);
    out.push(DrawCommand::Node {
        id: scene.id,
        circle: Circle::new(center, NODE_RADIUS * viewport.scale()),
        fill: if selected { theme.node_selected_fill } else { theme.node_fill },
        outline: theme.node_outline,
        selected,
    });
    out.push(DrawCommand::Text {
        anchor: center,
        text: scene.name.clone(),
        size: NAME_SIZE,
        color: theme.text,
    });
}

/// Screen-space line between two node centers, pulled in by the node
/// radius at both ends, plus its arrow head. `None` when the centers
/// coincide and no direction exists.
pub fn edge_geometry(from: Point, to: Point, viewport: &Viewport) -> Option<(Line, [Point; 3])> {
    let delta = to - from;
    let dist = delta.hypot();
    if dist == 0.0 || !dist.is_finite() {
        return None;
    }
    let unit = delta / dist;
    let start = viewport.world_to_screen(from + unit * NODE_RADIUS);
    let end = viewport.world_to_screen(to - unit * NODE_RADIUS);

    let scale = viewport.scale();
    let base = end - unit * (ARROW_LENGTH * scale);
    let normal = Vec2::new(-unit.y, unit.x) * (ARROW_HALF_WIDTH * scale);
    Some((Line::new(start, end), [end, base + normal, base - normal]))
}
