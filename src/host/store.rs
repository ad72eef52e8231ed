use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value as JsonValue;

/// Key/value settings store provided by the host
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<JsonValue>;

    fn get_or(&self, key: &str, default: JsonValue) -> JsonValue {
        self.get(key).unwrap_or(default)
    }

    fn set(&self, key: &str, value: JsonValue);

    /// Remove `key`, returning whether it was present
    fn remove(&self, key: &str) -> bool;

    fn dump(&self) -> HashMap<String, JsonValue>;

    /// Persist pending changes. Stores without a backing medium do nothing.
    fn save(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, JsonValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: HashMap<String, JsonValue>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    fn set(&self, key: &str, value: JsonValue) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    fn dump(&self) -> HashMap<String, JsonValue> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
