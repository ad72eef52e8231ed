//! Built-in job tasks

pub mod delay;
pub mod log_message;

pub use delay::DelayTask;
pub use log_message::LogMessageTask;

use crate::host::HostContext;
use crate::jobs::registry::JobRegistry;

/// Register every built-in task with `registry`
pub fn register_builtin(registry: &mut JobRegistry) -> &mut JobRegistry {
    registry.register::<LogMessageTask>().register::<DelayTask>()
}

/// Fresh registry over `host`, preloaded with the built-in tasks
pub fn builtin_registry(host: HostContext) -> JobRegistry {
    let mut registry = JobRegistry::with_host(host);
    register_builtin(&mut registry);
    registry
}
