pub mod builtin;
pub mod context;
pub mod error;
pub mod host;
pub mod registry;
pub mod timer;

pub use context::{HookContext, HookFn, LifecycleEvent};
pub use error::{PluginError, guard};
pub use host::{Plugin, PluginCatalog, PluginEnv, PluginFactory, PluginHost, PluginState};
pub use registry::{Capabilities, HookId, Registry};
pub use timer::{TimerId, TimerQueue};
