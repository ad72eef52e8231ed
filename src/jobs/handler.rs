use std::any::Any;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::host::HostContext;
use crate::jobs::context::JobContext;
use crate::jobs::log::JobLogger;
use crate::jobs::registry::Services;

pub type HandlerResult = anyhow::Result<()>;

/// Everything a handler is constructed with
///
/// Built by the resolver for each execution: a fresh [`JobContext`], a
/// logger bound to the job, the host stores and the registry's shared
/// services.
pub struct JobEnv {
    context: JobContext,
    logger: JobLogger,
    host: HostContext,
    services: Services,
}

impl JobEnv {
    pub fn new(context: JobContext, host: HostContext, services: Services) -> Self {
        let logger = JobLogger::new(context.job_id(), context.job_type());
        Self {
            context,
            logger,
            host,
            services,
        }
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut JobContext {
        &mut self.context
    }

    pub fn logger(&self) -> &JobLogger {
        &self.logger
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// Shorthand for [`JobContext::get`]
    pub fn get<'a>(&'a self, name: &str, default: &'a JsonValue) -> &'a JsonValue {
        self.context.get(name, default)
    }

    /// Look up a shared service registered under `name`
    pub fn service<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.services.get::<T>(name)
    }
}

impl std::fmt::Debug for JobEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobEnv")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Lifecycle contract every job handler implements
///
/// The driver calls `setup`, `run` and `teardown` in order, stopping at the
/// first failure. The provided `setup` moves the context to `InProgress`
/// and the provided `teardown` moves it to `Complete`; overrides should call
/// [`JobContext::begin`] / [`JobContext::complete`] themselves.
pub trait JobHandler: Send {
    fn env(&self) -> &JobEnv;

    fn env_mut(&mut self) -> &mut JobEnv;

    fn setup(&mut self) -> HandlerResult {
        self.env_mut().context_mut().begin();
        Ok(())
    }

    fn run(&mut self) -> HandlerResult;

    fn teardown(&mut self) -> HandlerResult {
        self.env_mut().context_mut().complete();
        Ok(())
    }
}

/// A handler type the registry can construct by name
pub trait JobTask: JobHandler + Sized + 'static {
    /// Identifier jobs are submitted under
    fn task_type() -> &'static str;

    fn build(env: JobEnv) -> anyhow::Result<Self>;
}
