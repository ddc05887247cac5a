//! Error types for SCIM bulk processing.
//!
//! Errors are split by how far they propagate:
//!
//! - [`BulkError`] is batch-fatal. It escapes [`crate::BulkProcessor::process`]
//!   and no sub-operation is executed.
//! - [`OperationError`] is local to one sub-operation. The processor converts
//!   it into a failed outcome and keeps going.
//! - [`ManagerError`] is what a [`crate::ResourceManager`] reports. It is
//!   wrapped into an [`OperationError`] by the processor.

use serde_json::{Value, json};

/// URN of the SCIM Error message schema.
pub const ERROR_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:Error";

/// Batch-level errors that abort the whole bulk request before execution.
#[derive(Debug, thiserror::Error)]
pub enum BulkError {
    /// The envelope is not well-formed or violates an envelope constraint
    #[error("Malformed bulk request: {0}")]
    MalformedBatch(#[from] MalformedBatchError),

    /// An individual operation entry is missing or has an invalid mandatory field
    #[error("Invalid bulk operation at index {index}: {message}")]
    InvalidOperation { index: usize, message: String },
}

/// Envelope-level violations.
#[derive(Debug, thiserror::Error)]
pub enum MalformedBatchError {
    /// Body is not valid JSON or not a JSON object
    #[error("invalid JSON: {0}")]
    Syntax(String),

    /// The BulkRequest schema URN is missing from `schemas`
    #[error("'schemas' must contain '{expected}'")]
    MissingSchema { expected: String },

    /// `failOnErrors` present but not a positive integer
    #[error("'failOnErrors' must be a positive integer, got {value}")]
    InvalidFailOnErrors { value: String },

    /// `Operations` missing or not an array
    #[error("'Operations' must be an array")]
    MissingOperations,

    /// Operation count exceeds the configured maximum
    #[error("too many operations: {actual} exceeds maximum of {max}")]
    TooManyOperations { max: usize, actual: usize },

    /// Raw payload exceeds the configured maximum size
    #[error("payload too large: {actual} bytes exceeds maximum of {max}")]
    PayloadTooLarge { max: usize, actual: usize },
}

/// Errors local to a single bulk sub-operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OperationError {
    /// A `bulkId:` reference points at nothing committed earlier in the batch
    #[error("Unresolved bulkId reference '{bulk_id}'")]
    UnresolvedReference { bulk_id: String },

    /// No resource manager is registered for the path's endpoint
    #[error("No resource manager registered for endpoint '{endpoint}'")]
    UnknownResourceType { endpoint: String },

    /// Path shape does not fit the method
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Failure reported by the resource manager
    #[error(transparent)]
    Manager(#[from] ManagerError),
}

/// Failures a resource manager can signal.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ManagerError {
    /// Target resource does not exist
    #[error("Resource not found: {resource_type} with ID {id}")]
    NotFound { resource_type: String, id: String },

    /// Uniqueness conflict
    #[error("Conflict on attribute '{attribute}' with value '{value}'")]
    Conflict { attribute: String, value: String },

    /// Payload rejected by the manager
    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// `version` precondition did not match the current resource version
    #[error("Version mismatch: expected {expected}, current {current}")]
    PreconditionFailed { expected: String, current: String },

    /// Manager does not implement this capability
    #[error("Operation '{operation}' not supported for '{resource_type}'")]
    Unsupported {
        resource_type: String,
        operation: String,
    },

    /// Backing store or other internal failure
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Errors raised while assembling a processor.
///
/// These are configuration mistakes and should surface during startup.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Two managers claim the same endpoint
    #[error("Endpoint '{endpoint}' is already registered")]
    DuplicateEndpoint { endpoint: String },

    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl BuildError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

impl BulkError {
    /// Create an invalid operation error
    pub fn invalid_operation(index: usize, message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            index,
            message: message.into(),
        }
    }

    /// HTTP status for the single top-level error response.
    pub fn status(&self) -> u16 {
        match self {
            Self::MalformedBatch(
                MalformedBatchError::TooManyOperations { .. }
                | MalformedBatchError::PayloadTooLarge { .. },
            ) => 413,
            _ => 400,
        }
    }

    /// SCIM `scimType` detail keyword, if any.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::MalformedBatch(MalformedBatchError::Syntax(_))
            | Self::MalformedBatch(MalformedBatchError::MissingOperations) => Some("invalidSyntax"),
            Self::MalformedBatch(MalformedBatchError::TooManyOperations { .. })
            | Self::MalformedBatch(MalformedBatchError::PayloadTooLarge { .. }) => None,
            Self::MalformedBatch(_) | Self::InvalidOperation { .. } => Some("invalidValue"),
        }
    }

    /// Render as a SCIM Error message.
    pub fn to_scim_error(&self) -> Value {
        scim_error_body(self.status(), self.scim_type(), &self.to_string())
    }
}

impl OperationError {
    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// HTTP status placed in the failed outcome.
    pub fn status(&self) -> u16 {
        match self {
            Self::UnresolvedReference { .. } => 409,
            Self::UnknownResourceType { .. } => 404,
            Self::InvalidPath { .. } => 400,
            Self::Manager(e) => e.status(),
        }
    }

    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::UnresolvedReference { .. } => Some("invalidValue"),
            Self::UnknownResourceType { .. } => None,
            Self::InvalidPath { .. } => Some("invalidPath"),
            Self::Manager(e) => e.scim_type(),
        }
    }

    /// Render as the inner `response` of a failed outcome.
    pub fn to_scim_error(&self) -> Value {
        scim_error_body(self.status(), self.scim_type(), &self.to_string())
    }
}

impl ManagerError {
    /// Create a not found error
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Validation { .. } => 400,
            Self::PreconditionFailed { .. } => 412,
            Self::Unsupported { .. } => 501,
            Self::Internal { .. } => 500,
        }
    }

    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::Conflict { .. } => Some("uniqueness"),
            Self::Validation { .. } => Some("invalidValue"),
            _ => None,
        }
    }
}

fn scim_error_body(status: u16, scim_type: Option<&str>, detail: &str) -> Value {
    let mut body = json!({
        "schemas": [ERROR_SCHEMA],
        "status": status.to_string(),
        "detail": detail,
    });
    if let (Some(scim_type), Some(obj)) = (scim_type, body.as_object_mut()) {
        obj.insert("scimType".to_string(), json!(scim_type));
    }
    body
}

// Result type aliases for convenience
pub type BulkResult<T> = Result<T, BulkError>;
pub type ManagerResult<T> = Result<T, ManagerError>;
pub type BuildResult<T> = Result<T, BuildError>;
