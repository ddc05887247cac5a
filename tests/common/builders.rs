//! Fluent builders for bulk request bodies.

use scim_bulk::bulk::BULK_REQUEST_SCHEMA;
use serde_json::{Value, json};

/// Builder for a `BulkRequest` body.
#[derive(Debug, Clone, Default)]
pub struct BulkRequestBuilder {
    fail_on_errors: Option<u64>,
    operations: Vec<Value>,
}

impl BulkRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on_errors(mut self, threshold: u64) -> Self {
        self.fail_on_errors = Some(threshold);
        self
    }

    pub fn operation(mut self, operation: Value) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn post(self, path: &str, bulk_id: &str, data: Value) -> Self {
        self.operation(json!({"method": "POST", "path": path, "bulkId": bulk_id, "data": data}))
    }

    pub fn put(self, path: &str, data: Value) -> Self {
        self.operation(json!({"method": "PUT", "path": path, "data": data}))
    }

    pub fn patch(self, path: &str, operations: Value) -> Self {
        self.operation(json!({
            "method": "PATCH",
            "path": path,
            "data": {
                "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
                "Operations": operations
            }
        }))
    }

    pub fn delete(self, path: &str) -> Self {
        self.operation(json!({"method": "DELETE", "path": path}))
    }

    pub fn build(self) -> Value {
        let mut body = json!({
            "schemas": [BULK_REQUEST_SCHEMA],
            "Operations": self.operations,
        });
        if let (Some(threshold), Some(obj)) = (self.fail_on_errors, body.as_object_mut()) {
            obj.insert("failOnErrors".to_string(), json!(threshold));
        }
        body
    }

    pub fn build_string(self) -> String {
        self.build().to_string()
    }
}

/// Minimal valid user payload.
pub fn user(user_name: &str) -> Value {
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
        "userName": user_name,
        "name": {"givenName": user_name, "familyName": "Test"}
    })
}

/// Group payload whose members are the given values.
pub fn group(display_name: &str, members: &[&str]) -> Value {
    let members: Vec<Value> = members
        .iter()
        .map(|value| json!({"type": "User", "value": value}))
        .collect();
    json!({
        "schemas": ["urn:ietf:params:scim:schemas:core:2.0:Group"],
        "displayName": display_name,
        "members": members
    })
}
