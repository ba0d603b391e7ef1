pub mod config;
pub mod input;
pub mod interaction;
pub mod session;
pub mod shortcuts;

pub use config::{CONFIG_FILE_NAME, ConfigData, ConfigStore};
pub use input::{InputEvent, Modifiers, PointerButton};
pub use interaction::{CanvasEffect, CanvasInteractionController, ContextAction, ContextMenu, InteractionState};
pub use session::{CloseChoice, CloseOutcome, CloseRequest, Editor, UiRequest};
pub use shortcuts::{Action, Chord, ShortcutMap};
