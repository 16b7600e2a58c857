//! Update orchestrator and per-type hook registry.

mod orchestrator;
mod registry;

pub use orchestrator::{EntityRepository, SubmitResult};
pub use registry::{HookRegistry, PolicyHooks};
