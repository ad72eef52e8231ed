//! Host-side stores exposed to job handlers
//!
//! The embedding application owns its configuration and translations; jobs
//! only see them through the [`KeyValueStore`] interface bundled in a
//! [`HostContext`].

pub mod store;

pub use store::{KeyValueStore, MemoryStore};

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

/// Configuration and locale stores shared with every handler
#[derive(Clone)]
pub struct HostContext {
    config: Arc<dyn KeyValueStore>,
    locale: Arc<dyn KeyValueStore>,
}

impl HostContext {
    pub fn new(config: Arc<dyn KeyValueStore>, locale: Arc<dyn KeyValueStore>) -> Self {
        Self { config, locale }
    }

    /// Build a context backed by in-memory stores seeded from settings tables
    pub fn from_tables(
        config: HashMap<String, JsonValue>,
        locale: HashMap<String, JsonValue>,
    ) -> Self {
        Self::new(
            Arc::new(MemoryStore::from_map(config)),
            Arc::new(MemoryStore::from_map(locale)),
        )
    }

    pub fn config(&self) -> &dyn KeyValueStore {
        self.config.as_ref()
    }

    pub fn locale(&self) -> &dyn KeyValueStore {
        self.locale.as_ref()
    }

    /// Translate `key`, returning `default` when no translation exists
    pub fn translate(&self, key: &str, default: &str) -> String {
        match self.locale.get(key) {
            Some(JsonValue::String(text)) => text,
            Some(other) => other.to_string(),
            None => default.to_string(),
        }
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext").finish_non_exhaustive()
    }
}
