//! Storage-backed resource manager.
//!
//! `StandardResourceManager` serves one SCIM endpoint on top of any
//! [`StorageProvider`]. It owns the SCIM semantics the storage layer leaves
//! out: server-assigned ids, a unique attribute, `meta` stamping, version
//! preconditions and PATCH.
//!
//! # Example Usage
//!
//! ```rust
//! use scim_bulk::config::BulkConfig;
//! use scim_bulk::manager::{OperationContext, ResourceManager};
//! use scim_bulk::providers::StandardResourceManager;
//! use scim_bulk::storage::InMemoryStorage;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let users = StandardResourceManager::users(InMemoryStorage::new(), &BulkConfig::default());
//! let context = OperationContext::new("req-1");
//!
//! let created = users.create(json!({"userName": "bjensen"}), &context).await?;
//! assert_eq!(created.status, 201);
//! assert!(created.location.ends_with(&created.id));
//! # Ok(())
//! # }
//! ```

use crate::config::BulkConfig;
use crate::error::{ManagerError, ManagerResult};
use crate::manager::{Created, ManagerResponse, OperationContext, ResourceManager};
use crate::providers::patch::apply_patch;
use crate::storage::{StorageKey, StorageProvider};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use log::{debug, info, trace};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

/// Core User schema URN.
pub const USER_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:User";
/// Core Group schema URN.
pub const GROUP_SCHEMA: &str = "urn:ietf:params:scim:schemas:core:2.0:Group";

/// Resource manager for one endpoint over a storage backend.
#[derive(Debug, Clone)]
pub struct StandardResourceManager<S: StorageProvider> {
    storage: S,
    endpoint: String,
    resource_type: String,
    schema: String,
    unique_attribute: Option<String>,
    config: BulkConfig,
}

impl<S: StorageProvider> StandardResourceManager<S> {
    /// Manager for `endpoint` storing resources of `resource_type`.
    pub fn new(
        storage: S,
        endpoint: impl Into<String>,
        resource_type: impl Into<String>,
        schema: impl Into<String>,
        config: &BulkConfig,
    ) -> Self {
        Self {
            storage,
            endpoint: endpoint.into(),
            resource_type: resource_type.into(),
            schema: schema.into(),
            unique_attribute: None,
            config: config.clone(),
        }
    }

    /// Require `attribute` to be present and unique (case-insensitive).
    pub fn with_unique_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.unique_attribute = Some(attribute.into());
        self
    }

    /// `/Users` with unique `userName`.
    pub fn users(storage: S, config: &BulkConfig) -> Self {
        Self::new(storage, "Users", "User", USER_SCHEMA, config).with_unique_attribute("userName")
    }

    /// `/Groups` with unique `displayName`.
    pub fn groups(storage: S, config: &BulkConfig) -> Self {
        Self::new(storage, "Groups", "Group", GROUP_SCHEMA, config)
            .with_unique_attribute("displayName")
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn key(&self, id: &str) -> StorageKey {
        StorageKey::new(&self.resource_type, id)
    }
}

impl<S> StandardResourceManager<S>
where
    S: StorageProvider,
    S::Error: Into<ManagerError>,
{
    /// Fetch a stored resource by id.
    pub async fn get(&self, id: &str) -> ManagerResult<Option<Value>> {
        self.storage.get(self.key(id)).await.map_err(Into::into)
    }

    async fn load(&self, id: &str) -> ManagerResult<Value> {
        self.get(id)
            .await?
            .ok_or_else(|| ManagerError::not_found(&self.resource_type, id))
    }

    /// Reject `data` when another resource already holds its unique value.
    async fn check_unique(&self, data: &Value, own_id: Option<&str>) -> ManagerResult<()> {
        let Some(attribute) = &self.unique_attribute else {
            return Ok(());
        };
        let value = data
            .get(attribute)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ManagerError::validation(format!("{} is required", attribute)))?;

        let existing = self
            .storage
            .find_by_attribute(&self.resource_type, attribute, value)
            .await
            .map_err(Into::into)?;
        if existing
            .iter()
            .any(|(key, _)| Some(key.resource_id()) != own_id)
        {
            return Err(ManagerError::Conflict {
                attribute: attribute.clone(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// Fill in `id`, `schemas` and `meta`, keeping `created` from `previous`.
    fn stamp(&self, mut data: Value, id: &str, previous: Option<&Value>) -> ManagerResult<Value> {
        let now = chrono::Utc::now().to_rfc3339();
        let created = previous
            .and_then(|p| p.pointer("/meta/created"))
            .cloned()
            .unwrap_or_else(|| json!(now));

        let obj = data
            .as_object_mut()
            .ok_or_else(|| ManagerError::validation("Resource must be a JSON object"))?;
        obj.remove("meta");
        obj.insert("id".to_string(), json!(id));
        if !obj.contains_key("schemas") {
            obj.insert("schemas".to_string(), json!([self.schema]));
        }

        let version = content_version(&data)?;
        let meta = json!({
            "resourceType": self.resource_type,
            "created": created,
            "lastModified": now,
            "location": self.config.resource_url(&self.endpoint, id),
            "version": version,
        });
        if let Some(obj) = data.as_object_mut() {
            obj.insert("meta".to_string(), meta);
        }
        Ok(data)
    }

    async fn store(&self, id: &str, resource: Value) -> ManagerResult<ManagerResponse> {
        let version = current_version(&resource);
        let stored = self
            .storage
            .put(self.key(id), resource)
            .await
            .map_err(Into::into)?;
        Ok(ManagerResponse {
            body: Some(stored),
            status: 200,
            version,
        })
    }
}

#[async_trait]
impl<S> ResourceManager for StandardResourceManager<S>
where
    S: StorageProvider + 'static,
    S::Error: Into<ManagerError>,
{
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create(&self, data: Value, context: &OperationContext) -> ManagerResult<Created> {
        info!(
            "Creating {} resource (request: '{}', operation: {})",
            self.resource_type, context.request_id, context.operation_index
        );
        trace!("Create data: {}", data);

        if !data.is_object() {
            return Err(ManagerError::validation("Resource must be a JSON object"));
        }
        self.check_unique(&data, None).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let resource = self.stamp(data, &id, None)?;
        let response = self.store(&id, resource).await?;

        Ok(Created {
            location: self.config.resource_url(&self.endpoint, &id),
            id,
            body: response.body,
            status: 201,
            version: response.version,
        })
    }

    async fn replace(
        &self,
        id: &str,
        data: Value,
        context: &OperationContext,
    ) -> ManagerResult<ManagerResponse> {
        info!(
            "Replacing {} '{}' (request: '{}')",
            self.resource_type, id, context.request_id
        );

        if !data.is_object() {
            return Err(ManagerError::validation("Resource must be a JSON object"));
        }
        let current = self.load(id).await?;
        check_precondition(&current, context)?;
        self.check_unique(&data, Some(id)).await?;

        let resource = self.stamp(data, id, Some(&current))?;
        self.store(id, resource).await
    }

    async fn modify(
        &self,
        id: &str,
        data: Value,
        context: &OperationContext,
    ) -> ManagerResult<ManagerResponse> {
        info!(
            "Patching {} '{}' (request: '{}')",
            self.resource_type, id, context.request_id
        );

        let current = self.load(id).await?;
        check_precondition(&current, context)?;

        let mut patched = current.clone();
        apply_patch(&mut patched, &data)?;
        self.check_unique(&patched, Some(id)).await?;

        let resource = self.stamp(patched, id, Some(&current))?;
        self.store(id, resource).await
    }

    async fn delete(&self, id: &str, context: &OperationContext) -> ManagerResult<u16> {
        info!(
            "Deleting {} '{}' (request: '{}')",
            self.resource_type, id, context.request_id
        );

        if context.version.is_some() {
            let current = self.load(id).await?;
            check_precondition(&current, context)?;
        }

        let existed = self
            .storage
            .delete(self.key(id))
            .await
            .map_err(Into::into)?;
        if !existed {
            debug!("{} '{}' not found for delete", self.resource_type, id);
            return Err(ManagerError::not_found(&self.resource_type, id));
        }
        Ok(204)
    }
}

/// Weak ETag over the resource content, excluding `meta`.
fn content_version(resource: &Value) -> ManagerResult<String> {
    let mut content = resource.clone();
    if let Some(obj) = content.as_object_mut() {
        obj.remove("meta");
    }
    let bytes = serde_json::to_vec(&content)
        .map_err(|e| ManagerError::internal(format!("Failed to serialize resource: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let hash = hasher.finalize();
    Ok(format!("W/\"{}\"", BASE64.encode(&hash[..8])))
}

fn current_version(resource: &Value) -> Option<String> {
    resource
        .pointer("/meta/version")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn check_precondition(current: &Value, context: &OperationContext) -> ManagerResult<()> {
    let Some(expected) = &context.version else {
        return Ok(());
    };
    let current = current_version(current).unwrap_or_default();
    if normalize_etag(expected) != normalize_etag(&current) {
        return Err(ManagerError::PreconditionFailed {
            expected: expected.clone(),
            current,
        });
    }
    Ok(())
}

/// Compare ETags weakly: `W/"abc"`, `"abc"` and `abc` are equal.
fn normalize_etag(etag: &str) -> &str {
    let trimmed = etag.trim();
    trimmed
        .strip_prefix("W/")
        .unwrap_or(trimmed)
        .trim_matches('"')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::patch::PATCH_OP_SCHEMA;
    use crate::storage::InMemoryStorage;

    fn users() -> StandardResourceManager<InMemoryStorage> {
        StandardResourceManager::users(InMemoryStorage::new(), &BulkConfig::default())
    }

    fn context() -> OperationContext {
        OperationContext::new("test-request")
    }

    #[tokio::test]
    async fn test_create_stamps_metadata() {
        let manager = users();
        let created = manager
            .create(json!({"userName": "bjensen"}), &context())
            .await
            .unwrap();

        assert_eq!(created.status, 201);
        assert_eq!(
            created.location,
            format!("https://localhost/v2/Users/{}", created.id)
        );

        let body = created.body.unwrap();
        assert_eq!(body["id"], created.id.as_str());
        assert_eq!(body["schemas"], json!([USER_SCHEMA]));
        assert_eq!(body["meta"]["resourceType"], "User");
        assert_eq!(body["meta"]["location"], created.location.as_str());
        assert_eq!(body["meta"]["version"], created.version.clone().unwrap().as_str());
        assert!(created.version.unwrap().starts_with("W/\""));
    }

    #[tokio::test]
    async fn test_create_enforces_unique_attribute() {
        let manager = users();
        manager
            .create(json!({"userName": "bjensen"}), &context())
            .await
            .unwrap();

        let error = manager
            .create(json!({"userName": "BJENSEN"}), &context())
            .await
            .unwrap_err();
        assert_eq!(error.status(), 409);
        assert_eq!(error.scim_type(), Some("uniqueness"));

        let error = manager
            .create(json!({"displayName": "no user name"}), &context())
            .await
            .unwrap_err();
        assert_eq!(error.status(), 400);

        let error = manager.create(json!("scalar"), &context()).await.unwrap_err();
        assert!(matches!(error, ManagerError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_replace_keeps_id_and_created() {
        let manager = users();
        let created = manager
            .create(json!({"userName": "bjensen"}), &context())
            .await
            .unwrap();
        let original = created.body.unwrap();

        let response = manager
            .replace(
                &created.id,
                json!({"id": "ignored", "userName": "bjensen", "title": "Guide"}),
                &context(),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let body = response.body.unwrap();
        assert_eq!(body["id"], created.id.as_str());
        assert_eq!(body["title"], "Guide");
        assert_eq!(body["meta"]["created"], original["meta"]["created"]);
        assert_ne!(body["meta"]["version"], original["meta"]["version"]);
    }

    #[tokio::test]
    async fn test_version_precondition() {
        let manager = users();
        let created = manager
            .create(json!({"userName": "bjensen"}), &context())
            .await
            .unwrap();

        let stale = OperationContext {
            version: Some("W/\"stale\"".to_string()),
            ..context()
        };
        let error = manager
            .replace(&created.id, json!({"userName": "bjensen"}), &stale)
            .await
            .unwrap_err();
        assert_eq!(error.status(), 412);

        let error = manager.delete(&created.id, &stale).await.unwrap_err();
        assert_eq!(error.status(), 412);

        let fresh = OperationContext {
            version: created.version.clone(),
            ..context()
        };
        assert_eq!(manager.delete(&created.id, &fresh).await.unwrap(), 204);
    }

    #[tokio::test]
    async fn test_modify_applies_patch() {
        let manager = StandardResourceManager::groups(InMemoryStorage::new(), &BulkConfig::default());
        let created = manager
            .create(
                json!({"displayName": "Admins", "members": [{"value": "1"}]}),
                &context(),
            )
            .await
            .unwrap();

        let patch = json!({
            "schemas": [PATCH_OP_SCHEMA],
            "Operations": [{"op": "add", "path": "members", "value": [{"value": "2"}]}]
        });
        let response = manager.modify(&created.id, patch, &context()).await.unwrap();
        assert_eq!(
            response.body.unwrap()["members"],
            json!([{"value": "1"}, {"value": "2"}])
        );

        let stored = manager.get(&created.id).await.unwrap().unwrap();
        assert_eq!(stored["members"].as_array().unwrap().len(), 2);

        let error = manager
            .modify("missing", json!({}), &context())
            .await
            .unwrap_err();
        assert_eq!(error.status(), 404);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let manager = users();
        let error = manager.delete("missing", &context()).await.unwrap_err();
        assert_eq!(error.status(), 404);
        assert_eq!(manager.storage().count("User").await.unwrap(), 0);
    }

    #[test]
    fn test_normalize_etag() {
        assert_eq!(normalize_etag("W/\"abc\""), "abc");
        assert_eq!(normalize_etag("\"abc\""), "abc");
        assert_eq!(normalize_etag(" abc "), "abc");
    }
}
