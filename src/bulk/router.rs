//! Dispatch of sub-operations to resource managers.
//!
//! The registry is keyed by endpoint name and built once when the processor
//! is assembled. Routing only selects a manager and a capability; invoking it
//! is a single call with no logic of its own.

use super::types::BulkMethod;
use crate::error::{BuildError, BuildResult, ManagerResult, OperationError};
use crate::manager::{Created, ManagerResponse, OperationContext, ResourceManager};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Manager capability selected by the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Create,
    Replace,
    Modify,
    Delete,
}

impl From<BulkMethod> for Capability {
    fn from(method: BulkMethod) -> Self {
        match method {
            BulkMethod::Post => Capability::Create,
            BulkMethod::Put => Capability::Replace,
            BulkMethod::Patch => Capability::Modify,
            BulkMethod::Delete => Capability::Delete,
        }
    }
}

/// What a successfully invoked capability produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Created(Created),
    Updated(ManagerResponse),
    Deleted(u16),
}

/// A resolved dispatch target.
#[derive(Clone)]
pub struct Route {
    pub manager: Arc<dyn ResourceManager>,
    pub capability: Capability,
    pub endpoint: String,
    pub resource_id: Option<String>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("capability", &self.capability)
            .field("endpoint", &self.endpoint)
            .field("resource_id", &self.resource_id)
            .finish()
    }
}

impl Route {
    /// Invoke the selected capability on the manager.
    pub async fn invoke(
        &self,
        data: Option<Value>,
        context: &OperationContext,
    ) -> ManagerResult<Invocation> {
        let id = self.resource_id.as_deref().unwrap_or_default();
        let data = data.unwrap_or(Value::Null);
        match self.capability {
            Capability::Create => self.manager.create(data, context).await.map(Invocation::Created),
            Capability::Replace => self
                .manager
                .replace(id, data, context)
                .await
                .map(Invocation::Updated),
            Capability::Modify => self
                .manager
                .modify(id, data, context)
                .await
                .map(Invocation::Updated),
            Capability::Delete => self.manager.delete(id, context).await.map(Invocation::Deleted),
        }
    }
}

/// Endpoint registry.
#[derive(Clone, Default)]
pub struct OperationRouter {
    managers: HashMap<String, Arc<dyn ResourceManager>>,
}

impl OperationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a manager under its endpoint name.
    pub fn register(&mut self, manager: Arc<dyn ResourceManager>) -> BuildResult<()> {
        let endpoint = manager.endpoint().to_string();
        if self.managers.contains_key(&endpoint) {
            return Err(BuildError::DuplicateEndpoint { endpoint });
        }
        self.managers.insert(endpoint, manager);
        Ok(())
    }

    pub fn endpoints(&self) -> Vec<&str> {
        let mut endpoints: Vec<&str> = self.managers.keys().map(String::as_str).collect();
        endpoints.sort_unstable();
        endpoints
    }

    /// Select the manager and capability for a (resolved) path.
    pub fn route(&self, path: &str, method: BulkMethod) -> Result<Route, OperationError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let mut segments = trimmed.split('/');
        let endpoint = segments.next().unwrap_or_default();
        let resource_id = segments.next().filter(|s| !s.is_empty());

        if segments.next().is_some() {
            return Err(OperationError::invalid_path(path, "too many path segments"));
        }

        let manager = self
            .managers
            .get(endpoint)
            .ok_or_else(|| OperationError::UnknownResourceType {
                endpoint: endpoint.to_string(),
            })?;

        match (method.targets_resource(), resource_id) {
            (true, None) => Err(OperationError::invalid_path(
                path,
                format!("{} requires a resource id", method),
            )),
            (false, Some(_)) => Err(OperationError::invalid_path(
                path,
                format!("{} must target the endpoint, not a resource", method),
            )),
            _ => Ok(Route {
                manager: Arc::clone(manager),
                capability: Capability::from(method),
                endpoint: endpoint.to_string(),
                resource_id: resource_id.map(str::to_string),
            }),
        }
    }
}

impl fmt::Debug for OperationRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRouter")
            .field("endpoints", &self.endpoints())
            .finish()
    }
}
