pub mod document;
pub mod error;
pub mod id;
pub mod lint;
pub mod model;
pub mod viewport;

pub use document::{DataMap, ProjectDocument, SCENES_KEY};
pub use error::{EditorError, Notice, Result, Severity};
pub use id::SceneId;
pub use lint::{LintDiagnostic, LintSeverity, lint_graph};
pub use model::*;
pub use viewport::Viewport;

// Re-export kurbo geometry so downstream crates share one point type
pub use kurbo::{Point, Vec2};
