//! Data model for bulk requests and responses.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// URN of the BulkRequest message schema.
pub const BULK_REQUEST_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:BulkRequest";

/// URN of the BulkResponse message schema.
pub const BULK_RESPONSE_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:BulkResponse";

/// HTTP method of a bulk sub-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BulkMethod {
    Post,
    Put,
    Patch,
    Delete,
}

impl BulkMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkMethod::Post => "POST",
            BulkMethod::Put => "PUT",
            BulkMethod::Patch => "PATCH",
            BulkMethod::Delete => "DELETE",
        }
    }

    /// Whether the method requires a `data` member.
    pub fn requires_data(&self) -> bool {
        !matches!(self, BulkMethod::Delete)
    }

    /// Whether the path must name a specific resource.
    pub fn targets_resource(&self) -> bool {
        !matches!(self, BulkMethod::Post)
    }
}

impl fmt::Display for BulkMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BulkMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "POST" => Ok(BulkMethod::Post),
            "PUT" => Ok(BulkMethod::Put),
            "PATCH" => Ok(BulkMethod::Patch),
            "DELETE" => Ok(BulkMethod::Delete),
            other => Err(format!("unsupported method '{}'", other)),
        }
    }
}

/// One parsed sub-operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperationRequest {
    pub method: BulkMethod,
    /// Target path, e.g. `/Users` or `/Users/2819c223`
    pub path: String,
    pub bulk_id: Option<String>,
    /// Expected resource version for conditional operations
    pub version: Option<String>,
    /// Payload handed to the resource manager untouched (apart from bulkId substitution)
    pub data: Option<Value>,
}

/// A parsed bulk request.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkRequestEnvelope {
    pub operations: Vec<BulkOperationRequest>,
    /// Failure count at which execution stops; `None` means unlimited
    pub fail_on_errors: Option<usize>,
}

/// Result of one sub-operation as placed in the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperationOutcome {
    pub method: BulkMethod,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bulk_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(serialize_with = "status_to_string", deserialize_with = "status_from_string")]
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub response: Option<Value>,
}

impl BulkOperationOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// How execution of the batch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every operation was attempted
    Completed,
    /// Execution stopped once `failOnErrors` failures were recorded
    HaltedByBudget,
}

impl BatchStatus {
    /// Status of the outer HTTP response; partial failure is still a 200.
    pub fn http_status(&self) -> u16 {
        200
    }
}

/// Aggregated bulk response, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResponseEnvelope {
    pub operations: Vec<BulkOperationOutcome>,
    pub status: BatchStatus,
}

impl BulkResponseEnvelope {
    pub fn failure_count(&self) -> usize {
        self.operations.iter().filter(|o| !o.is_success()).count()
    }
}

impl Serialize for BulkResponseEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BulkResponse", 2)?;
        state.serialize_field("schemas", &[BULK_RESPONSE_SCHEMA])?;
        state.serialize_field("Operations", &self.operations)?;
        state.end()
    }
}

fn status_to_string<S: Serializer>(status: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&status.to_string())
}

fn status_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom(format!("invalid status {}", n))),
        other => Err(serde::de::Error::custom(format!("invalid status {}", other))),
    }
}
