//! World ↔ screen coordinate mapping for the canvas.
//!
//! `screen = (world + pan) * scale`. The pan offset is kept in world units
//! so panning by a fixed screen distance moves less world at higher zoom.

use kurbo::{Point, Vec2};

/// Smallest allowed zoom factor.
pub const MIN_SCALE: f64 = 0.2;
/// Largest allowed zoom factor.
pub const MAX_SCALE: f64 = 3.0;
/// Multiplier applied by one zoom-in step (wheel notch or menu command).
pub const ZOOM_STEP: f64 = 1.1;

/// Scale and pan state of the drawing surface. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scale: f64,
    /// Pan offset in world units.
    pan: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            scale: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Viewport {
    /// Build a viewport, clamping `scale` into range.
    pub fn new(scale: f64, pan: Vec2) -> Self {
        Self {
            scale: clamp_scale(scale),
            pan,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            (world.x + self.pan.x) * self.scale,
            (world.y + self.pan.y) * self.scale,
        )
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            screen.x / self.scale - self.pan.x,
            screen.y / self.scale - self.pan.y,
        )
    }

    /// Zoom by `factor` keeping the world point under `screen` fixed.
    ///
    /// The scale changes first; the pan then absorbs the world-space shift
    /// the new scale caused at the anchor.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) {
        let before = self.screen_to_world(screen);
        self.scale = clamp_scale(self.scale * factor);
        let after = self.screen_to_world(screen);
        self.pan += after - before;
        log::trace!("zoom x{factor} at {screen:?} -> scale {}", self.scale);
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, screen_delta: Vec2) {
        self.pan += screen_delta / self.scale;
    }

    /// Back to scale 1.0 with no pan.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn clamp_scale(scale: f64) -> f64 {
    if scale.is_nan() {
        return 1.0;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}
