use serde_json::{Map, Value as JsonValue};

use crate::jobs::handler::{HandlerResult, JobEnv, JobHandler, JobTask};
use crate::jobs::log::LogLevel;

/// Writes one message to the job log
///
/// Arguments: `message` (required), `level` (default `notice`) and
/// `translate` (look `message` up in the host locale first). Any other
/// argument is attached to the event as context.
#[derive(Debug)]
pub struct LogMessageTask {
    env: JobEnv,
    message: String,
    level: LogLevel,
    translate: bool,
}

impl JobTask for LogMessageTask {
    fn task_type() -> &'static str {
        "log_message"
    }

    fn build(env: JobEnv) -> anyhow::Result<Self> {
        let message = env
            .context()
            .get_as::<String>("message")
            .ok_or_else(|| anyhow::anyhow!("'message' argument is required"))?;
        let level = match env.context().get_as::<String>("level") {
            Some(level) => level.parse()?,
            None => LogLevel::Notice,
        };
        let translate = env.context().get_as::<bool>("translate").unwrap_or(false);

        Ok(Self {
            env,
            message,
            level,
            translate,
        })
    }
}

impl LogMessageTask {
    pub fn rendered_message(&self) -> String {
        if self.translate {
            self.env.host().translate(&self.message, &self.message)
        } else {
            self.message.clone()
        }
    }
}

impl JobHandler for LogMessageTask {
    fn env(&self) -> &JobEnv {
        &self.env
    }

    fn env_mut(&mut self) -> &mut JobEnv {
        &mut self.env
    }

    fn run(&mut self) -> HandlerResult {
        let context: Map<String, JsonValue> = self
            .env
            .context()
            .data()
            .iter()
            .filter(|(key, _)| !matches!(key.as_str(), "message" | "level" | "translate"))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        self.env
            .logger()
            .log(self.level, &self.rendered_message(), context);
        Ok(())
    }
}
