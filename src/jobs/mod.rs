pub mod context;
pub mod driver;
pub mod error;
pub mod handle;
pub mod handler;
pub mod hooks;
pub mod log;
pub mod record;
pub mod registry;
pub mod scheduler;
pub mod tasks;
pub mod types;

pub use context::JobContext;
pub use driver::JobDriver;
pub use error::{JobError, JobResult, Stage};
pub use handle::{JobHandle, JobSnapshot};
pub use handler::{HandlerResult, JobEnv, JobHandler, JobTask};
pub use hooks::{LifecycleHooks, NoopFlusher, OutputFlusher, StdoutFlusher};
pub use log::{JobLogger, LogLevel};
pub use record::JobRecord;
pub use registry::{HandlerResolver, JobRegistry, Services};
pub use scheduler::{DrainSummary, Scheduler};
pub use types::{JobArgs, JobStatus};
