//! Unit-of-work lifecycle hooks
//!
//! The host fires a named event once its primary output has been sent. The
//! scheduler binds its drain to that event; the event name is configurable.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

pub type HookCallback = Box<dyn FnOnce() + Send>;

/// Named one-shot callbacks
#[derive(Default)]
pub struct LifecycleHooks {
    bindings: Mutex<HashMap<String, Vec<HookCallback>>>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind<F>(&self, event: impl Into<String>, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Run and unbind every callback registered for `event`, in bind order
    ///
    /// Returns the number of callbacks run.
    pub fn fire(&self, event: &str) -> usize {
        // Released before running so callbacks may bind again.
        let callbacks = self
            .bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(event)
            .unwrap_or_default();

        let count = callbacks.len();
        for callback in callbacks {
            callback();
        }
        count
    }

    pub fn is_bound(&self, event: &str) -> bool {
        self.bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .is_some_and(|callbacks| !callbacks.is_empty())
    }
}

impl std::fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<String> = self
            .bindings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("LifecycleHooks").field("events", &events).finish()
    }
}

/// Pushes any buffered response output to its destination
pub trait OutputFlusher: Send + Sync {
    fn flush(&self) -> anyhow::Result<()>;
}

/// For hosts that have already handed their output off
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFlusher;

impl OutputFlusher for NoopFlusher {
    fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutFlusher;

impl OutputFlusher for StdoutFlusher {
    fn flush(&self) -> anyhow::Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}
