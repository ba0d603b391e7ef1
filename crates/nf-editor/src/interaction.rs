//! Canvas gesture state machine.
//!
//! Turns raw pointer input into semantic effects: select, move a scene,
//! pan, zoom, open a context menu. A press only becomes a drag after the
//! pointer travels more than 5 px, so a slightly shaky click is still a
//! click.
//!
//! ```text
//!            down                 move > 5px (node)
//!   Idle ──────────▶ Pending ─────────────────────▶ DraggingNode
//!    ▲                 │   └──── move > 5px (bg) ─▶ Panning
//!    └───── up ────────┴───────────────────────────────┘
//! ```
//!
//! The controller never mutates the graph or viewport itself; the session
//! applies the returned [`CanvasEffect`]s.

use crate::input::{InputEvent, PointerButton};
use kurbo::{Point, Vec2};
use nf_core::{SceneGraph, SceneId, Viewport, viewport::ZOOM_STEP};
use nf_render::SpatialIndex;
use smallvec::{SmallVec, smallvec};

/// Squared screen distance a press must travel before it becomes a drag.
pub const DRAG_THRESHOLD_SQ: f64 = 25.0;

pub type Effects = SmallVec<[CanvasEffect; 2]>;

/// Public view of the gesture in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Pending,
    DraggingNode,
    Panning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEffect {
    Select(SceneId),
    ClearSelection,
    /// Live position update while dragging.
    MoveScene { id: SceneId, position: Point },
    /// The drag ended; the document now has unsaved changes.
    CommitMove { id: SceneId },
    /// Screen-space pan delta.
    PanBy(Vec2),
    ZoomAt { anchor: Point, factor: f64 },
    /// Put keyboard focus in the scene's name field.
    FocusName(SceneId),
    OpenContextMenu(ContextMenu),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextAction {
    DeleteNode(SceneId),
    /// World-space position for the new scene.
    AddNodeHere(Point),
    ResetView,
}

impl ContextAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::DeleteNode(_) => "Delete this node",
            Self::AddNodeHere(_) => "Add node here",
            Self::ResetView => "Reset view",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    /// Where to pop the menu up.
    pub screen: Point,
    /// Scene under the pointer, if any.
    pub target: Option<SceneId>,
    pub items: Vec<ContextAction>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Pending {
        target: Option<SceneId>,
        press: Point,
        /// World position of `target` at press time.
        origin: Point,
    },
    DraggingNode {
        id: SceneId,
        press: Point,
        origin: Point,
    },
    Panning {
        last: Point,
    },
}

pub struct CanvasInteractionController {
    gesture: Gesture,
}

impl Default for CanvasInteractionController {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasInteractionController {
    pub fn new() -> Self {
        Self { gesture: Gesture::Idle }
    }

    pub fn state(&self) -> InteractionState {
        match self.gesture {
            Gesture::Idle => InteractionState::Idle,
            Gesture::Pending { .. } => InteractionState::Pending,
            Gesture::DraggingNode { .. } => InteractionState::DraggingNode,
            Gesture::Panning { .. } => InteractionState::Panning,
        }
    }

    pub fn handle(
        &mut self,
        event: &InputEvent,
        graph: &SceneGraph,
        viewport: &Viewport,
        selection: Option<SceneId>,
    ) -> Effects {
        match *event {
            InputEvent::PointerDown {
                x,
                y,
                button: PointerButton::Primary,
                ..
            } => self.press(Point::new(x, y), graph, viewport, selection),
            InputEvent::PointerDown {
                x,
                y,
                button: PointerButton::Secondary,
                ..
            } => self.context_menu(Point::new(x, y), graph, viewport, selection),
            InputEvent::PointerMove { x, y, .. } => self.drag(Point::new(x, y), graph, viewport),
            InputEvent::PointerUp {
                button: PointerButton::Primary,
                ..
            } => self.release(graph),
            InputEvent::DoubleClick { x, y } => {
                match SpatialIndex::build(graph, viewport, selection).hit(Point::new(x, y)) {
                    Some(id) => smallvec![CanvasEffect::Select(id), CanvasEffect::FocusName(id)],
                    None => Effects::new(),
                }
            }
            InputEvent::Wheel { x, y, delta } => {
                if delta == 0.0 || !delta.is_finite() {
                    return Effects::new();
                }
                let factor = if delta > 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
                smallvec![CanvasEffect::ZoomAt {
                    anchor: Point::new(x, y),
                    factor,
                }]
            }
            InputEvent::Key { ref key, .. } if key == "Escape" => self.cancel(graph),
            _ => Effects::new(),
        }
    }

    fn press(&mut self, at: Point, graph: &SceneGraph, viewport: &Viewport, selection: Option<SceneId>) -> Effects {
        let target = SpatialIndex::build(graph, viewport, selection).hit(at);
        let origin = target
            .and_then(|id| graph.get(id))
            .map_or(Point::ZERO, |scene| scene.position);
        self.gesture = Gesture::Pending {
            target,
            press: at,
            origin,
        };
        log::debug!("gesture: pending on {target:?}");
        Effects::new()
    }

    fn drag(&mut self, at: Point, graph: &SceneGraph, viewport: &Viewport) -> Effects {
        match self.gesture {
            Gesture::Idle => Effects::new(),
            Gesture::Pending { target, press, origin } => {
                if (at - press).hypot2() <= DRAG_THRESHOLD_SQ {
                    return Effects::new();
                }
                match target {
                    Some(id) => {
                        if !graph.contains(id) {
                            return self.abort(id);
                        }
                        self.gesture = Gesture::DraggingNode { id, press, origin };
                        log::debug!("gesture: dragging {id}");
                        smallvec![
                            CanvasEffect::Select(id),
                            CanvasEffect::MoveScene {
                                id,
                                position: origin + (at - press) / viewport.scale(),
                            }
                        ]
                    }
                    None => {
                        self.gesture = Gesture::Panning { last: at };
                        log::debug!("gesture: panning");
                        smallvec![CanvasEffect::PanBy(at - press)]
                    }
                }
            }
            Gesture::DraggingNode { id, press, origin } => {
                if !graph.contains(id) {
                    return self.abort(id);
                }
                smallvec![CanvasEffect::MoveScene {
                    id,
                    position: origin + (at - press) / viewport.scale(),
                }]
            }
            Gesture::Panning { last } => {
                self.gesture = Gesture::Panning { last: at };
                smallvec![CanvasEffect::PanBy(at - last)]
            }
        }
    }

    fn release(&mut self, graph: &SceneGraph) -> Effects {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Pending {
                target: Some(id), ..
            } if graph.contains(id) => smallvec![CanvasEffect::Select(id)],
            Gesture::Pending {
                target: Some(id), ..
            } => {
                log::debug!("click target {id} vanished before release");
                Effects::new()
            }
            Gesture::Pending { target: None, .. } => smallvec![CanvasEffect::ClearSelection],
            Gesture::DraggingNode { id, .. } if graph.contains(id) => {
                smallvec![CanvasEffect::CommitMove { id }]
            }
            Gesture::DraggingNode { id, .. } => {
                log::debug!("drag target {id} vanished before release");
                Effects::new()
            }
            Gesture::Idle | Gesture::Panning { .. } => Effects::new(),
        }
    }

    fn context_menu(
        &mut self,
        at: Point,
        graph: &SceneGraph,
        viewport: &Viewport,
        selection: Option<SceneId>,
    ) -> Effects {
        if self.gesture != Gesture::Idle {
            return Effects::new();
        }
        let target = SpatialIndex::build(graph, viewport, selection).hit(at);
        let mut items = Vec::with_capacity(3);
        if let Some(id) = target {
            items.push(ContextAction::DeleteNode(id));
        }
        items.push(ContextAction::AddNodeHere(viewport.screen_to_world(at)));
        items.push(ContextAction::ResetView);

        let menu = CanvasEffect::OpenContextMenu(ContextMenu {
            screen: at,
            target,
            items,
        });
        match target {
            Some(id) => smallvec![CanvasEffect::Select(id), menu],
            None => smallvec![menu],
        }
    }

    /// Abandon the current gesture. A node being dragged goes back to where
    /// it started.
    pub fn cancel(&mut self, graph: &SceneGraph) -> Effects {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::DraggingNode { id, origin, .. } if graph.contains(id) => {
                log::debug!("gesture: drag of {id} cancelled");
                smallvec![CanvasEffect::MoveScene { id, position: origin }]
            }
            _ => Effects::new(),
        }
    }

    /// Forget any gesture without producing effects (new or opened project).
    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
    }

    fn abort(&mut self, id: SceneId) -> Effects {
        log::debug!("drag target {id} vanished; gesture aborted");
        self.gesture = Gesture::Idle;
        Effects::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn one_scene() -> (SceneGraph, SceneId) {
        let mut sg = SceneGraph::new();
        let id = sg.add_scene("A", Point::new(100.0, 100.0)).id;
        (sg, id)
    }

    #[test]
    fn small_wiggle_is_a_click() {
        let (sg, a) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        assert!(ctl.handle(&InputEvent::press(100.0, 100.0), &sg, &vp, None).is_empty());
        assert!(ctl.handle(&InputEvent::moved(103.0, 104.0), &sg, &vp, None).is_empty());
        assert_eq!(ctl.state(), InteractionState::Pending);

        let fx = ctl.handle(&InputEvent::release(103.0, 104.0), &sg, &vp, None);
        assert_eq!(fx.as_slice(), &[CanvasEffect::Select(a)]);
        assert_eq!(ctl.state(), InteractionState::Idle);
    }

    #[test]
    fn node_drag_divides_by_scale() {
        let (sg, a) = one_scene();
        let vp = Viewport::new(2.0, Vec2::ZERO);
        let mut ctl = CanvasInteractionController::new();

        ctl.handle(&InputEvent::press(200.0, 200.0), &sg, &vp, None);
        let fx = ctl.handle(&InputEvent::moved(220.0, 200.0), &sg, &vp, None);
        assert_eq!(
            fx.as_slice(),
            &[
                CanvasEffect::Select(a),
                CanvasEffect::MoveScene {
                    id: a,
                    position: Point::new(110.0, 100.0)
                }
            ]
        );
        let fx = ctl.handle(&InputEvent::release(220.0, 200.0), &sg, &vp, Some(a));
        assert_eq!(fx.as_slice(), &[CanvasEffect::CommitMove { id: a }]);
    }

    #[test]
    fn background_drag_pans_incrementally() {
        let (sg, _) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        ctl.handle(&InputEvent::press(500.0, 500.0), &sg, &vp, None);
        let fx = ctl.handle(&InputEvent::moved(510.0, 500.0), &sg, &vp, None);
        assert_eq!(fx.as_slice(), &[CanvasEffect::PanBy(Vec2::new(10.0, 0.0))]);
        let fx = ctl.handle(&InputEvent::moved(512.0, 503.0), &sg, &vp, None);
        assert_eq!(fx.as_slice(), &[CanvasEffect::PanBy(Vec2::new(2.0, 3.0))]);

        assert!(ctl.handle(&InputEvent::release(512.0, 503.0), &sg, &vp, None).is_empty());
    }

    #[test]
    fn background_click_clears_selection() {
        let (sg, a) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        ctl.handle(&InputEvent::press(600.0, 600.0), &sg, &vp, Some(a));
        let fx = ctl.handle(&InputEvent::release(600.0, 600.0), &sg, &vp, Some(a));
        assert_eq!(fx.as_slice(), &[CanvasEffect::ClearSelection]);
    }

    #[test]
    fn vanished_node_aborts_drag() {
        let (mut sg, a) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        ctl.handle(&InputEvent::press(100.0, 100.0), &sg, &vp, None);
        ctl.handle(&InputEvent::moved(120.0, 100.0), &sg, &vp, None);
        sg.delete_scene(a);

        assert!(ctl.handle(&InputEvent::moved(130.0, 100.0), &sg, &vp, None).is_empty());
        assert_eq!(ctl.state(), InteractionState::Idle);
        assert!(ctl.handle(&InputEvent::release(130.0, 100.0), &sg, &vp, None).is_empty());
    }

    #[test]
    fn vanished_click_target_keeps_other_selection() {
        let (mut sg, a) = one_scene();
        let b = sg.add_scene("B", Point::new(400.0, 100.0)).id;
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        ctl.handle(&InputEvent::press(100.0, 100.0), &sg, &vp, Some(b));
        sg.delete_scene(a);

        let fx = ctl.handle(&InputEvent::release(100.0, 100.0), &sg, &vp, Some(b));
        assert!(fx.is_empty(), "unexpected effects {fx:?}");
        assert_eq!(ctl.state(), InteractionState::Idle);
    }

    #[test]
    fn escape_restores_drag_origin() {
        let (sg, a) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        ctl.handle(&InputEvent::press(100.0, 100.0), &sg, &vp, None);
        ctl.handle(&InputEvent::moved(150.0, 100.0), &sg, &vp, None);
        let esc = InputEvent::key("Escape", Default::default());
        let fx = ctl.handle(&esc, &sg, &vp, Some(a));

        assert_eq!(
            fx.as_slice(),
            &[CanvasEffect::MoveScene {
                id: a,
                position: Point::new(100.0, 100.0)
            }]
        );
        assert_eq!(ctl.state(), InteractionState::Idle);
    }

    #[test]
    fn context_menu_on_node_and_background() {
        let (sg, a) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();
        let right = |x, y| InputEvent::PointerDown {
            x,
            y,
            button: PointerButton::Secondary,
            modifiers: Default::default(),
        };

        let fx = ctl.handle(&right(100.0, 100.0), &sg, &vp, None);
        assert_eq!(fx[0], CanvasEffect::Select(a));
        let CanvasEffect::OpenContextMenu(menu) = &fx[1] else {
            panic!("expected a context menu, got {fx:?}");
        };
        assert_eq!(
            menu.items,
            vec![
                ContextAction::DeleteNode(a),
                ContextAction::AddNodeHere(Point::new(100.0, 100.0)),
                ContextAction::ResetView
            ]
        );

        let fx = ctl.handle(&right(700.0, 20.0), &sg, &vp, None);
        let CanvasEffect::OpenContextMenu(menu) = &fx[0] else {
            panic!("expected a context menu, got {fx:?}");
        };
        assert_eq!(menu.target, None);
        assert_eq!(menu.items.len(), 2);
    }

    #[test]
    fn wheel_and_double_click() {
        let (sg, a) = one_scene();
        let vp = Viewport::default();
        let mut ctl = CanvasInteractionController::new();

        let fx = ctl.handle(&InputEvent::Wheel { x: 5.0, y: 6.0, delta: -120.0 }, &sg, &vp, None);
        assert_eq!(
            fx.as_slice(),
            &[CanvasEffect::ZoomAt {
                anchor: Point::new(5.0, 6.0),
                factor: 1.0 / ZOOM_STEP
            }]
        );

        let fx = ctl.handle(&InputEvent::DoubleClick { x: 90.0, y: 95.0 }, &sg, &vp, None);
        assert_eq!(fx.as_slice(), &[CanvasEffect::Select(a), CanvasEffect::FocusName(a)]);
    }
}
