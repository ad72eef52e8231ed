use std::time::Duration;

use crate::jobs::handler::{HandlerResult, JobEnv, JobHandler, JobTask};

/// Blocks for `millis` milliseconds
#[derive(Debug)]
pub struct DelayTask {
    env: JobEnv,
    delay: Duration,
}

impl JobTask for DelayTask {
    fn task_type() -> &'static str {
        "delay"
    }

    fn build(env: JobEnv) -> anyhow::Result<Self> {
        let millis = env.context().get_as::<u64>("millis").unwrap_or(0);
        Ok(Self {
            env,
            delay: Duration::from_millis(millis),
        })
    }
}

impl JobHandler for DelayTask {
    fn env(&self) -> &JobEnv {
        &self.env
    }

    fn env_mut(&mut self) -> &mut JobEnv {
        &mut self.env
    }

    fn run(&mut self) -> HandlerResult {
        std::thread::sleep(self.delay);
        self.env.logger().debug("Delay elapsed");
        Ok(())
    }
}
