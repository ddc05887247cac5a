//! Resource manager contract consumed by the bulk processor.
//!
//! One manager serves one SCIM endpoint (e.g. `Users`, `Groups`) and performs
//! the actual create/replace/modify/delete against its backing store. The
//! processor only selects a manager and a capability; all business rules live
//! behind this trait.
//!
//! # Example Implementation
//!
//! ```rust
//! use async_trait::async_trait;
//! use scim_bulk::manager::{Created, ManagerResponse, OperationContext, ResourceManager};
//! use scim_bulk::error::{ManagerError, ManagerResult};
//! use serde_json::Value;
//!
//! struct ReadOnlyManager;
//!
//! #[async_trait]
//! impl ResourceManager for ReadOnlyManager {
//!     fn endpoint(&self) -> &str {
//!         "Devices"
//!     }
//!
//!     async fn create(&self, _data: Value, _context: &OperationContext) -> ManagerResult<Created> {
//!         Err(ManagerError::validation("Devices are read-only"))
//!     }
//!
//!     async fn replace(
//!         &self,
//!         id: &str,
//!         _data: Value,
//!         _context: &OperationContext,
//!     ) -> ManagerResult<ManagerResponse> {
//!         Err(ManagerError::not_found("Device", id))
//!     }
//!
//!     async fn delete(&self, id: &str, _context: &OperationContext) -> ManagerResult<u16> {
//!         Err(ManagerError::not_found("Device", id))
//!     }
//! }
//! ```

use crate::error::{ManagerError, ManagerResult};
use async_trait::async_trait;
use serde_json::Value;

/// Per-call context handed to a manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationContext {
    /// Identifier of the enclosing bulk request, for log correlation
    pub request_id: String,
    /// Zero-based position of the operation within the batch
    pub operation_index: usize,
    /// `bulkId` declared by the operation, if any
    pub bulk_id: Option<String>,
    /// Expected resource version (ETag) from the operation's `version` member
    pub version: Option<String>,
}

impl OperationContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            ..Self::default()
        }
    }
}

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq)]
pub struct Created {
    /// Server-assigned resource identifier
    pub id: String,
    /// Absolute resource location
    pub location: String,
    /// Resource representation as stored
    pub body: Option<Value>,
    /// HTTP status, normally 201
    pub status: u16,
    /// Version (ETag) of the stored resource
    pub version: Option<String>,
}

/// Result of a successful replace or modify.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerResponse {
    pub body: Option<Value>,
    pub status: u16,
    pub version: Option<String>,
}

impl ManagerResponse {
    pub fn ok(body: Option<Value>) -> Self {
        Self {
            body,
            status: 200,
            version: None,
        }
    }
}

/// Handler for one SCIM resource endpoint.
#[async_trait]
pub trait ResourceManager: Send + Sync {
    /// Endpoint name as it appears in the first path segment, e.g. `Users`.
    fn endpoint(&self) -> &str;

    /// POST: create a new resource.
    async fn create(&self, data: Value, context: &OperationContext) -> ManagerResult<Created>;

    /// PUT: replace an existing resource.
    async fn replace(
        &self,
        id: &str,
        data: Value,
        context: &OperationContext,
    ) -> ManagerResult<ManagerResponse>;

    /// PATCH: partially modify an existing resource.
    async fn modify(
        &self,
        _id: &str,
        _data: Value,
        _context: &OperationContext,
    ) -> ManagerResult<ManagerResponse> {
        Err(ManagerError::Unsupported {
            resource_type: self.endpoint().to_string(),
            operation: "PATCH".to_string(),
        })
    }

    /// DELETE: remove a resource, returning the HTTP status (normally 204).
    async fn delete(&self, id: &str, context: &OperationContext) -> ManagerResult<u16>;
}
