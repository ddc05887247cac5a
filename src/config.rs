//! Configuration for the bulk endpoint.
//!
//! Holds the envelope limits advertised in the ServiceProviderConfig `bulk`
//! section and the URL settings used to build resource locations.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Bulk endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkConfig {
    /// Base URL for resource locations (without SCIM version or path).
    /// Examples: "https://scim.example.com", "http://localhost:8080"
    pub base_url: String,

    /// SCIM protocol version segment. Defaults to "v2".
    pub scim_version: String,

    /// Maximum number of operations accepted in one bulk request
    pub max_operations: usize,

    /// Maximum raw request size in bytes
    pub max_payload_size: usize,

    /// Return the manager's resource representation in successful outcomes
    pub include_success_bodies: bool,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://localhost".to_string(),
            scim_version: "v2".to_string(),
            max_operations: 1000,
            max_payload_size: 1_048_576,
            include_success_bodies: false,
        }
    }
}

impl BulkConfig {
    /// Location URL of the collection served by `endpoint`.
    ///
    /// ```rust
    /// use scim_bulk::BulkConfig;
    ///
    /// let config = BulkConfig::default();
    /// assert_eq!(config.endpoint_url("Users"), "https://localhost/v2/Users");
    /// ```
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.scim_version,
            endpoint
        )
    }

    /// Location URL of a single resource.
    pub fn resource_url(&self, endpoint: &str, id: &str) -> String {
        format!("{}/{}", self.endpoint_url(endpoint), id)
    }

    /// The `bulk` fragment of the ServiceProviderConfig resource.
    pub fn service_provider_bulk(&self) -> Value {
        json!({
            "supported": true,
            "maxOperations": self.max_operations,
            "maxPayloadSize": self.max_payload_size,
        })
    }

    /// Validate the configuration.
    pub fn validate(&self) -> BuildResult<()> {
        if self.base_url.is_empty() {
            return Err(BuildError::invalid_configuration("Base URL cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(BuildError::invalid_configuration(
                "Base URL must start with http:// or https://",
            ));
        }

        if self.scim_version.is_empty() {
            return Err(BuildError::invalid_configuration("SCIM version cannot be empty"));
        }

        if self.max_operations == 0 {
            return Err(BuildError::invalid_configuration("maxOperations must be at least 1"));
        }

        Ok(())
    }
}
