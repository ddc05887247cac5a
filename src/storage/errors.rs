//! Storage-layer errors, independent of SCIM semantics.

use crate::error::ManagerError;

/// Failures of the storage backend.
///
/// `InMemoryStorage` never fails; the variants cover backends that can
/// reject data or become unreachable.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested resource was not found
    #[error("Resource not found: {resource_type}/{id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// Data cannot be stored
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Storage backend is temporarily unavailable
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    /// Generic internal storage error
    #[error("Internal storage error: {message}")]
    Internal { message: String },
}

impl StorageError {
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<StorageError> for ManagerError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::ResourceNotFound { resource_type, id } => {
                ManagerError::NotFound { resource_type, id }
            }
            StorageError::InvalidData { message } => ManagerError::Validation { message },
            other => ManagerError::internal(other.to_string()),
        }
    }
}
