//! Decoding of the BulkRequest envelope.
//!
//! The parser checks envelope limits and the mandatory members of each
//! operation. It knows nothing about resource schemas; payloads are passed
//! through as opaque JSON.

use super::reference::is_valid_bulk_id;
use super::types::{BULK_REQUEST_SCHEMA, BulkMethod, BulkOperationRequest, BulkRequestEnvelope};
use crate::config::BulkConfig;
use crate::error::{BulkError, BulkResult, MalformedBatchError};
use log::{debug, trace};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Parser for raw bulk request bodies.
#[derive(Debug, Clone)]
pub struct BulkOperationParser {
    max_operations: usize,
    max_payload_size: usize,
}

impl BulkOperationParser {
    pub fn new(max_operations: usize, max_payload_size: usize) -> Self {
        Self {
            max_operations,
            max_payload_size,
        }
    }

    pub fn from_config(config: &BulkConfig) -> Self {
        Self::new(config.max_operations, config.max_payload_size)
    }

    /// Parse a raw request body.
    pub fn parse(&self, raw: &str) -> BulkResult<BulkRequestEnvelope> {
        self.check_payload_size(raw.len())?;
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| MalformedBatchError::Syntax(e.to_string()))?;
        self.decode(value)
    }

    /// Parse an already-decoded request body.
    ///
    /// The payload limit applies to the compact serialized form of `value`.
    pub fn parse_value(&self, value: Value) -> BulkResult<BulkRequestEnvelope> {
        self.check_payload_size(value.to_string().len())?;
        self.decode(value)
    }

    fn check_payload_size(&self, actual: usize) -> BulkResult<()> {
        if actual > self.max_payload_size {
            return Err(MalformedBatchError::PayloadTooLarge {
                max: self.max_payload_size,
                actual,
            }
            .into());
        }
        Ok(())
    }

    fn decode(&self, value: Value) -> BulkResult<BulkRequestEnvelope> {
        let Value::Object(mut body) = value else {
            return Err(MalformedBatchError::Syntax("body must be a JSON object".to_string()).into());
        };

        let has_schema = body
            .get("schemas")
            .and_then(Value::as_array)
            .is_some_and(|schemas| schemas.iter().any(|s| s.as_str() == Some(BULK_REQUEST_SCHEMA)));
        if !has_schema {
            return Err(MalformedBatchError::MissingSchema {
                expected: BULK_REQUEST_SCHEMA.to_string(),
            }
            .into());
        }

        let fail_on_errors = match body.get("failOnErrors") {
            None | Some(Value::Null) => None,
            Some(v) => match v.as_u64() {
                Some(n) if n > 0 => Some(usize::try_from(n).unwrap_or(usize::MAX)),
                _ => {
                    return Err(MalformedBatchError::InvalidFailOnErrors {
                        value: v.to_string(),
                    }
                    .into());
                }
            },
        };

        let Some(Value::Array(entries)) = body.remove("Operations") else {
            return Err(MalformedBatchError::MissingOperations.into());
        };

        if entries.len() > self.max_operations {
            return Err(MalformedBatchError::TooManyOperations {
                max: self.max_operations,
                actual: entries.len(),
            }
            .into());
        }

        let mut seen_bulk_ids = HashSet::new();
        let mut operations = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let Value::Object(entry) = entry else {
                return Err(BulkError::invalid_operation(index, "operation must be a JSON object"));
            };
            let operation = parse_operation(index, entry)?;

            if let Some(bulk_id) = &operation.bulk_id {
                if !seen_bulk_ids.insert(bulk_id.clone()) {
                    return Err(BulkError::invalid_operation(
                        index,
                        format!("duplicate bulkId '{}'", bulk_id),
                    ));
                }
            }

            trace!("Parsed bulk operation {}: {:?}", index, operation);
            operations.push(operation);
        }

        debug!(
            "Parsed bulk request with {} operations (failOnErrors: {:?})",
            operations.len(),
            fail_on_errors
        );

        Ok(BulkRequestEnvelope {
            operations,
            fail_on_errors,
        })
    }
}

fn parse_operation(index: usize, mut entry: Map<String, Value>) -> BulkResult<BulkOperationRequest> {
    let method = match entry.get("method").and_then(Value::as_str) {
        Some(m) => m
            .parse::<BulkMethod>()
            .map_err(|e| BulkError::invalid_operation(index, e))?,
        None => return Err(BulkError::invalid_operation(index, "missing 'method'")),
    };

    let path = match entry.get("path").and_then(Value::as_str) {
        Some(p) if p.starts_with('/') && p.len() > 1 => p.to_string(),
        Some(p) => {
            return Err(BulkError::invalid_operation(
                index,
                format!("invalid 'path' '{}'", p),
            ));
        }
        None => return Err(BulkError::invalid_operation(index, "missing 'path'")),
    };

    let bulk_id = match entry.get("bulkId") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) if is_valid_bulk_id(id) => Some(id.clone()),
        Some(other) => {
            return Err(BulkError::invalid_operation(
                index,
                format!("invalid 'bulkId' {}", other),
            ));
        }
    };
    if method == BulkMethod::Post && bulk_id.is_none() {
        return Err(BulkError::invalid_operation(index, "POST requires 'bulkId'"));
    }

    let version = entry
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string);

    let data = match entry.remove("data") {
        None | Some(Value::Null) => None,
        Some(data) => Some(data),
    };
    if method.requires_data() && data.is_none() {
        return Err(BulkError::invalid_operation(
            index,
            format!("{} requires 'data'", method),
        ));
    }

    Ok(BulkOperationRequest {
        method,
        path,
        bulk_id,
        version,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parser() -> BulkOperationParser {
        BulkOperationParser::new(10, 4096)
    }

    fn request(operations: Value) -> Value {
        json!({
            "schemas": [BULK_REQUEST_SCHEMA],
            "Operations": operations
        })
    }

    #[test]
    fn test_parse_valid_request() {
        let body = json!({
            "schemas": [BULK_REQUEST_SCHEMA],
            "failOnErrors": 1,
            "Operations": [
                {"method": "POST", "path": "/Users", "bulkId": "qwerty", "data": {"userName": "Alice"}},
                {"method": "delete", "path": "/Users/b7c14771", "version": "W/\"abc\""}
            ]
        });

        let envelope = parser().parse(&body.to_string()).unwrap();
        assert_eq!(envelope.fail_on_errors, Some(1));
        assert_eq!(envelope.operations.len(), 2);
        assert_eq!(envelope.operations[0].bulk_id.as_deref(), Some("qwerty"));
        assert_eq!(envelope.operations[1].method, BulkMethod::Delete);
        assert_eq!(envelope.operations[1].version.as_deref(), Some("W/\"abc\""));
        assert!(envelope.operations[1].data.is_none());
    }

    #[test]
    fn test_malformed_envelopes() {
        let p = parser();
        assert!(matches!(
            p.parse("{not json"),
            Err(BulkError::MalformedBatch(MalformedBatchError::Syntax(_)))
        ));
        assert!(matches!(
            p.parse_value(json!({"Operations": []})),
            Err(BulkError::MalformedBatch(MalformedBatchError::MissingSchema { .. }))
        ));
        assert!(matches!(
            p.parse_value(json!({"schemas": [BULK_REQUEST_SCHEMA]})),
            Err(BulkError::MalformedBatch(MalformedBatchError::MissingOperations))
        ));

        for bad in [json!(0), json!(-1), json!("2"), json!(1.5)] {
            let mut body = request(json!([]));
            body["failOnErrors"] = bad;
            assert!(matches!(
                p.parse_value(body),
                Err(BulkError::MalformedBatch(MalformedBatchError::InvalidFailOnErrors { .. }))
            ));
        }
    }

    #[test]
    fn test_operation_limits() {
        let ops: Vec<Value> = (0..3)
            .map(|i| json!({"method": "DELETE", "path": format!("/Users/{}", i)}))
            .collect();
        let p = BulkOperationParser::new(2, 4096);
        let err = p.parse_value(request(json!(ops))).unwrap_err();
        assert_eq!(err.status(), 413);

        let p = BulkOperationParser::new(10, 16);
        let err = p.parse(&request(json!([])).to_string()).unwrap_err();
        assert!(matches!(
            err,
            BulkError::MalformedBatch(MalformedBatchError::PayloadTooLarge { max: 16, .. })
        ));

        let err = p.parse_value(request(json!([]))).unwrap_err();
        assert!(matches!(
            err,
            BulkError::MalformedBatch(MalformedBatchError::PayloadTooLarge { max: 16, .. })
        ));
    }

    #[test]
    fn test_invalid_operations() {
        let p = parser();
        let cases = [
            json!({"path": "/Users", "bulkId": "a", "data": {}}),
            json!({"method": "GET", "path": "/Users"}),
            json!({"method": "POST", "bulkId": "a", "data": {}}),
            json!({"method": "POST", "path": "Users", "bulkId": "a", "data": {}}),
            json!({"method": "POST", "path": "/Users", "data": {}}),
            json!({"method": "POST", "path": "/Users", "bulkId": "a/b", "data": {}}),
            json!({"method": "PUT", "path": "/Users/1"}),
            json!("POST /Users"),
        ];

        for case in cases {
            let result = p.parse_value(request(json!([case.clone()])));
            assert!(
                matches!(result, Err(BulkError::InvalidOperation { index: 0, .. })),
                "expected invalid operation for {}",
                case
            );
        }
    }

    #[test]
    fn test_duplicate_bulk_id_rejected() {
        let body = request(json!([
            {"method": "POST", "path": "/Users", "bulkId": "dup", "data": {}},
            {"method": "POST", "path": "/Groups", "bulkId": "dup", "data": {}}
        ]));

        match parser().parse_value(body) {
            Err(BulkError::InvalidOperation { index, message }) => {
                assert_eq!(index, 1);
                assert!(message.contains("duplicate"));
            }
            other => panic!("expected duplicate bulkId error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_operations_accepted() {
        let envelope = parser().parse_value(request(json!([]))).unwrap();
        assert!(envelope.operations.is_empty());
        assert_eq!(envelope.fail_on_errors, None);
    }
}
