//! SCIM 2.0 bulk operation processor for Rust.
//!
//! Executes the operations of a SCIM `BulkRequest` in order against pluggable
//! resource managers, resolving `bulkId:` cross-references between operations
//! and honouring the `failOnErrors` threshold.
//!
//! # Core Components
//!
//! - [`BulkProcessor`] - Parses, executes and assembles a bulk request
//! - [`ResourceManager`] - Trait implemented once per resource endpoint
//! - [`BulkConfig`] - Envelope limits and location settings
//! - [`providers::StandardResourceManager`] - Reference manager over [`storage`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scim_bulk::{BulkConfig, BulkProcessor, providers::StandardResourceManager};
//! use scim_bulk::storage::InMemoryStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = InMemoryStorage::new();
//! let config = BulkConfig::default();
//! let processor = BulkProcessor::builder()
//!     .with_config(config.clone())
//!     .with_manager(StandardResourceManager::users(storage.clone(), &config))
//!     .with_manager(StandardResourceManager::groups(storage, &config))
//!     .build()?;
//!
//! let body = r#"{"schemas":["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],"Operations":[]}"#;
//! let response = processor.process(body).await?;
//! println!("{}", serde_json::to_string(&response)?);
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod config;
pub mod error;
pub mod manager;
pub mod providers;
pub mod storage;

// Re-export commonly used types for convenience
pub use bulk::{
    BatchStatus, BulkMethod, BulkOperationOutcome, BulkOperationRequest, BulkProcessor,
    BulkProcessorBuilder, BulkRequestEnvelope, BulkResponseEnvelope,
};
pub use config::BulkConfig;
pub use error::{
    BuildError, BuildResult, BulkError, BulkResult, MalformedBatchError, ManagerError,
    ManagerResult, OperationError,
};
pub use manager::{Created, ManagerResponse, OperationContext, ResourceManager};
