//! In-memory storage backend.
//!
//! Thread-safe `StorageProvider` over a nested `HashMap` guarded by a tokio
//! `RwLock`. Intended for tests, development and hosts that do not need
//! persistence. Clones share the same underlying data.

use crate::storage::{StorageError, StorageKey, StorageProvider};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory storage.
///
/// Structure: `resource_type` → `resource_id` → `data`
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    data: Arc<RwLock<HashMap<String, HashMap<String, Value>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get storage statistics for debugging and monitoring.
    pub async fn stats(&self) -> InMemoryStorageStats {
        let data_guard = self.data.read().await;
        InMemoryStorageStats {
            resource_type_count: data_guard.len(),
            total_resources: data_guard.values().map(HashMap::len).sum(),
        }
    }

    /// Clear all data (useful for testing).
    pub async fn clear(&self) {
        self.data.write().await.clear();
    }
}

impl StorageProvider for InMemoryStorage {
    type Error = StorageError;

    async fn put(&self, key: StorageKey, data: Value) -> Result<Value, Self::Error> {
        let mut data_guard = self.data.write().await;
        data_guard
            .entry(key.resource_type().to_string())
            .or_default()
            .insert(key.resource_id().to_string(), data.clone());
        Ok(data)
    }

    async fn get(&self, key: StorageKey) -> Result<Option<Value>, Self::Error> {
        let data_guard = self.data.read().await;
        Ok(data_guard
            .get(key.resource_type())
            .and_then(|type_data| type_data.get(key.resource_id()))
            .cloned())
    }

    async fn delete(&self, key: StorageKey) -> Result<bool, Self::Error> {
        let mut data_guard = self.data.write().await;
        Ok(data_guard
            .get_mut(key.resource_type())
            .is_some_and(|type_data| type_data.remove(key.resource_id()).is_some()))
    }

    async fn find_by_attribute(
        &self,
        resource_type: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Vec<(StorageKey, Value)>, Self::Error> {
        let data_guard = self.data.read().await;
        let Some(type_data) = data_guard.get(resource_type) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<(StorageKey, Value)> = type_data
            .iter()
            .filter(|(_, data)| {
                data.get(attribute)
                    .and_then(Value::as_str)
                    .is_some_and(|v| v.eq_ignore_ascii_case(value))
            })
            .map(|(id, data)| (StorageKey::new(resource_type, id), data.clone()))
            .collect();

        // Sort results by resource ID for consistency
        results.sort_by(|a, b| a.0.resource_id().cmp(b.0.resource_id()));
        Ok(results)
    }

    async fn exists(&self, key: StorageKey) -> Result<bool, Self::Error> {
        let data_guard = self.data.read().await;
        Ok(data_guard
            .get(key.resource_type())
            .is_some_and(|type_data| type_data.contains_key(key.resource_id())))
    }

    async fn count(&self, resource_type: &str) -> Result<usize, Self::Error> {
        let data_guard = self.data.read().await;
        Ok(data_guard.get(resource_type).map_or(0, HashMap::len))
    }
}

/// Statistics about the current state of in-memory storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStorageStats {
    /// Number of resource types with at least one stored entry map
    pub resource_type_count: usize,
    /// Total number of individual resources
    pub total_resources: usize,
}
