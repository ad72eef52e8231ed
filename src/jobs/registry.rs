use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::host::HostContext;
use crate::jobs::context::JobContext;
use crate::jobs::error::{JobError, JobResult, Stage};
use crate::jobs::handler::{JobEnv, JobHandler, JobTask};

type HandlerFactory = Box<dyn Fn(JobEnv) -> anyhow::Result<Box<dyn JobHandler>> + Send + Sync>;

/// Turns a job type into a ready-to-run handler
pub trait HandlerResolver: Send + Sync {
    /// Construct the handler registered under `job_type`, wiring in `context`
    ///
    /// # Errors
    ///
    /// - [`JobError::UnresolvableType`] when nothing is registered under `job_type`
    /// - [`JobError::NotRunnable`] when the name is bound to something that is not a handler
    /// - [`JobError::HandlerFault`] with [`Stage::Construct`] when the factory fails
    fn resolve(&self, job_type: &str, context: JobContext) -> JobResult<Box<dyn JobHandler>>;
}

/// Named shared values available to handlers
#[derive(Clone, Default)]
pub struct Services {
    entries: Arc<DashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl Services {
    pub fn insert<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Arc::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let entry = self.entries.get(name)?;
        Arc::clone(entry.value()).downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Registry for mapping job types to handler factories
pub struct JobRegistry {
    factories: HashMap<String, HandlerFactory>,
    services: Services,
    host: HostContext,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_host(HostContext::default())
    }

    pub fn with_host(host: HostContext) -> Self {
        Self {
            factories: HashMap::new(),
            services: Services::default(),
            host,
        }
    }

    /// Register a task type under [`JobTask::task_type`]
    pub fn register<T: JobTask>(&mut self) -> &mut Self {
        self.register_fn(T::task_type(), |env| Ok(Box::new(T::build(env)?)))
    }

    /// Register a handler factory under an explicit name
    pub fn register_fn<F>(&mut self, job_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(JobEnv) -> anyhow::Result<Box<dyn JobHandler>> + Send + Sync + 'static,
    {
        self.factories.insert(job_type.into(), Box::new(factory));
        self
    }

    /// Make a shared value available to handlers under `name`
    pub fn provide<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.services.insert(name, value);
        self
    }

    pub fn contains(&self, job_type: &str) -> bool {
        self.factories.contains_key(job_type)
    }

    /// Registered job types, sorted
    pub fn job_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerResolver for JobRegistry {
    fn resolve(&self, job_type: &str, context: JobContext) -> JobResult<Box<dyn JobHandler>> {
        let Some(factory) = self.factories.get(job_type) else {
            if self.services.contains(job_type) {
                return Err(JobError::NotRunnable(job_type.to_string()));
            }
            return Err(JobError::UnresolvableType(job_type.to_string()));
        };

        let env = JobEnv::new(context, self.host.clone(), self.services.clone());
        factory(env).map_err(|e| JobError::fault(job_type, Stage::Construct, e))
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("job_types", &self.job_types())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::handler::HandlerResult;
    use crate::jobs::types::JobArgs;

    struct Noop {
        env: JobEnv,
    }

    impl JobHandler for Noop {
        fn env(&self) -> &JobEnv {
            &self.env
        }

        fn env_mut(&mut self) -> &mut JobEnv {
            &mut self.env
        }

        fn run(&mut self) -> HandlerResult {
            Ok(())
        }
    }

    impl JobTask for Noop {
        fn task_type() -> &'static str {
            "noop"
        }

        fn build(env: JobEnv) -> anyhow::Result<Self> {
            Ok(Self { env })
        }
    }

    fn context(job_type: &str) -> JobContext {
        JobContext::new("localjob-1", job_type, Arc::new(JobArgs::new()))
    }

    #[test]
    fn test_resolve_registered_task() {
        let mut registry = JobRegistry::new();
        registry.register::<Noop>();

        let handler = registry.resolve("noop", context("noop")).unwrap();
        assert_eq!(handler.env().context().job_id(), "localjob-1");
        assert!(registry.contains("noop"));
        assert_eq!(registry.job_types(), vec!["noop"]);
    }

    #[test]
    fn test_resolve_unknown_type() {
        let registry = JobRegistry::new();
        let err = registry.resolve("missing", context("missing")).err().unwrap();
        assert!(matches!(err, JobError::UnresolvableType(ref t) if t == "missing"));
    }

    #[test]
    fn test_resolve_service_is_not_runnable() {
        let mut registry = JobRegistry::new();
        registry.provide("mailer", String::from("smtp://localhost"));

        let err = registry.resolve("mailer", context("mailer")).err().unwrap();
        assert!(matches!(err, JobError::NotRunnable(ref t) if t == "mailer"));
    }

    #[test]
    fn test_factory_failure_is_construct_fault() {
        let mut registry = JobRegistry::new();
        registry.register_fn("broken", |_env| Err(anyhow::anyhow!("missing dependency")));

        let err = registry.resolve("broken", context("broken")).err().unwrap();
        assert_eq!(err.stage(), Some(Stage::Construct));
    }

    #[test]
    fn test_services_downcast() {
        let services = Services::default();
        services.insert("limit", 10u32);

        assert_eq!(services.get::<u32>("limit").as_deref(), Some(&10));
        assert!(services.get::<String>("limit").is_none());
        assert!(services.get::<u32>("other").is_none());
    }
}
