//! Storage abstraction for the reference resource managers.
//!
//! The `StorageProvider` trait covers pure data persistence: PUT/GET/DELETE of
//! JSON documents keyed by resource type and id. SCIM concerns (ids, meta,
//! uniqueness, PATCH semantics) stay in [`crate::providers`].
//!
//! At this level CREATE and UPDATE are the same operation: data is put at a
//! key. Whether that is a create or a replace is decided by the manager.
//!
//! # Example Usage
//!
//! ```rust
//! use scim_bulk::storage::{StorageProvider, StorageKey, InMemoryStorage};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = InMemoryStorage::new();
//!
//! let key = StorageKey::new("Users", "123");
//! storage.put(key.clone(), json!({"id": "123", "userName": "john.doe"})).await?;
//!
//! assert!(storage.get(key.clone()).await?.is_some());
//! assert!(storage.delete(key).await?);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;

pub use errors::StorageError;
pub use in_memory::{InMemoryStorage, InMemoryStorageStats};

use serde_json::Value;
use std::fmt;
use std::future::Future;

/// Key of a stored resource: `resource_type` → `resource_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey {
    resource_type: String,
    resource_id: String,
}

impl StorageKey {
    pub fn new(resource_type: impl Into<String>, resource_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.resource_id)
    }
}

/// Pure data persistence used by [`crate::providers::StandardResourceManager`].
///
/// - `put` replaces whatever is stored at the key and returns the stored data.
/// - `delete` returns whether the key existed, so callers can pick 204 vs 404.
/// - No validation is performed on the data.
pub trait StorageProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store data at the key and return what was stored.
    fn put(
        &self,
        key: StorageKey,
        data: Value,
    ) -> impl Future<Output = Result<Value, Self::Error>> + Send;

    fn get(
        &self,
        key: StorageKey,
    ) -> impl Future<Output = Result<Option<Value>, Self::Error>> + Send;

    /// Returns `true` if the resource existed.
    fn delete(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Resources of `resource_type` whose top-level `attribute` equals `value`
    /// (case-insensitive, as SCIM compares `userName`).
    fn find_by_attribute(
        &self,
        resource_type: &str,
        attribute: &str,
        value: &str,
    ) -> impl Future<Output = Result<Vec<(StorageKey, Value)>, Self::Error>> + Send;

    fn exists(&self, key: StorageKey) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn count(
        &self,
        resource_type: &str,
    ) -> impl Future<Output = Result<usize, Self::Error>> + Send;
}
