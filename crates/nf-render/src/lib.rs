pub mod hit;
pub mod paint;

pub use hit::{SpatialIndex, hit_test, stacking_order};
pub use paint::{DrawCommand, Rgba, Theme, edge_geometry, render_scene, render_scene_with_theme};

/// Radius of a scene node, in world units.
pub const NODE_RADIUS: f64 = 40.0;
