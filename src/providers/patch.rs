//! RFC 7644 PatchOp application for the standard manager.
//!
//! Supports `add`, `remove` and `replace` on simple (`userName`) and dotted
//! (`name.givenName`) paths. `remove` additionally accepts a single
//! `attr[sub eq "value"]` filter to drop matching multi-valued entries, which
//! is how group members are removed.
//!
//! ```rust
//! use scim_bulk::providers::patch::{PATCH_OP_SCHEMA, apply_patch};
//! use serde_json::json;
//!
//! let mut group = json!({"displayName": "Admins", "members": [{"value": "1"}, {"value": "2"}]});
//! let patch = json!({
//!     "schemas": [PATCH_OP_SCHEMA],
//!     "Operations": [
//!         {"op": "remove", "path": "members[value eq \"1\"]"},
//!         {"op": "replace", "path": "displayName", "value": "Operators"}
//!     ]
//! });
//!
//! apply_patch(&mut group, &patch).unwrap();
//! assert_eq!(group["members"], json!([{"value": "2"}]));
//! assert_eq!(group["displayName"], "Operators");
//! ```

use crate::error::{ManagerError, ManagerResult};
use serde_json::{Map, Value, json};

/// URN of the PatchOp message schema.
pub const PATCH_OP_SCHEMA: &str = "urn:ietf:params:scim:api:messages:2.0:PatchOp";

/// Apply a complete PatchOp message to `resource`.
///
/// Operations are applied in order; the first failing operation aborts the
/// patch and leaves `resource` partially modified, so callers patch a copy.
pub fn apply_patch(resource: &mut Value, patch: &Value) -> ManagerResult<()> {
    let has_schema = patch
        .get("schemas")
        .and_then(Value::as_array)
        .is_some_and(|s| s.iter().any(|uri| uri.as_str() == Some(PATCH_OP_SCHEMA)));
    if !has_schema {
        return Err(ManagerError::validation(format!(
            "PATCH body must declare schema '{}'",
            PATCH_OP_SCHEMA
        )));
    }

    let operations = patch
        .get("Operations")
        .and_then(Value::as_array)
        .filter(|ops| !ops.is_empty())
        .ok_or_else(|| ManagerError::validation("PATCH body requires non-empty 'Operations'"))?;

    for operation in operations {
        apply_operation(resource, operation)?;
    }
    Ok(())
}

/// Apply a single PATCH operation.
pub fn apply_operation(resource: &mut Value, operation: &Value) -> ManagerResult<()> {
    let op = operation
        .get("op")
        .and_then(Value::as_str)
        .ok_or_else(|| ManagerError::validation("PATCH operation must have 'op' field"))?;
    let path = operation.get("path").and_then(Value::as_str);
    let value = operation.get("value");

    if let Some(path) = path {
        reject_readonly(path)?;
    }

    match op.to_ascii_lowercase().as_str() {
        "add" => apply_add(resource, path, value),
        "remove" => apply_remove(resource, path),
        "replace" => apply_replace(resource, path, value),
        _ => Err(ManagerError::validation(format!(
            "Unsupported PATCH operation: {}",
            op
        ))),
    }
}

fn apply_add(resource: &mut Value, path: Option<&str>, value: Option<&Value>) -> ManagerResult<()> {
    let value = value.ok_or_else(|| ManagerError::validation("ADD operation requires a value"))?;

    match path {
        Some(path) => {
            let parts = split_path(path)?;
            let (last, parents) = split_last(&parts)?;
            add_into(parent_object(resource, parents)?, last, value);
        }
        None => {
            let source = object_value(value, "ADD")?;
            let target = root_object(resource)?;
            for (key, val) in source {
                reject_readonly(key)?;
                add_into(target, key, val);
            }
        }
    }
    Ok(())
}

fn apply_replace(
    resource: &mut Value,
    path: Option<&str>,
    value: Option<&Value>,
) -> ManagerResult<()> {
    let value =
        value.ok_or_else(|| ManagerError::validation("REPLACE operation requires a value"))?;

    match path {
        Some(path) => {
            let parts = split_path(path)?;
            let (last, parents) = split_last(&parts)?;
            parent_object(resource, parents)?.insert(last.to_string(), value.clone());
        }
        None => {
            let source = object_value(value, "REPLACE")?;
            let target = root_object(resource)?;
            for (key, val) in source {
                reject_readonly(key)?;
                target.insert(key.clone(), val.clone());
            }
        }
    }
    Ok(())
}

fn apply_remove(resource: &mut Value, path: Option<&str>) -> ManagerResult<()> {
    let path = path.ok_or_else(|| ManagerError::validation("REMOVE operation requires a path"))?;

    if let Some((attribute, filter)) = path.split_once('[') {
        let filter = filter
            .strip_suffix(']')
            .ok_or_else(|| ManagerError::validation(format!("Invalid SCIM path: {}", path)))?;
        let (sub_attribute, expected) = parse_eq_filter(filter)?;
        if let Some(Value::Array(items)) = resource.get_mut(attribute) {
            items.retain(|item| item.get(sub_attribute).and_then(Value::as_str) != Some(expected));
        }
        return Ok(());
    }

    let parts = split_path(path)?;
    let (last, parents) = split_last(&parts)?;
    let mut current = resource;
    for part in parents {
        match current.get_mut(*part) {
            Some(child) => current = child,
            None => return Ok(()),
        }
    }
    if let Some(obj) = current.as_object_mut() {
        obj.remove(last);
    }
    Ok(())
}

/// Arrays are extended without duplicates; anything else is set.
fn add_into(target: &mut Map<String, Value>, key: &str, value: &Value) {
    match target.get_mut(key) {
        Some(Value::Array(existing)) => {
            let items = match value {
                Value::Array(items) => items.as_slice(),
                single => std::slice::from_ref(single),
            };
            for item in items {
                if !existing.contains(item) {
                    existing.push(item.clone());
                }
            }
        }
        _ => {
            target.insert(key.to_string(), value.clone());
        }
    }
}

/// Walk `parents`, creating empty complex attributes as needed.
fn parent_object<'a>(
    resource: &'a mut Value,
    parents: &[&str],
) -> ManagerResult<&'a mut Map<String, Value>> {
    let mut current = resource;
    for part in parents {
        current = root_object(current)?
            .entry(part.to_string())
            .or_insert_with(|| json!({}));
    }
    current
        .as_object_mut()
        .ok_or_else(|| ManagerError::validation("PATCH path does not address a complex attribute"))
}

fn root_object(resource: &mut Value) -> ManagerResult<&mut Map<String, Value>> {
    resource
        .as_object_mut()
        .ok_or_else(|| ManagerError::validation("PATCH path does not address a complex attribute"))
}

fn object_value<'a>(value: &'a Value, op: &str) -> ManagerResult<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        ManagerError::validation(format!("{} without path requires an object value", op))
    })
}

fn split_last<'a>(parts: &'a [&'a str]) -> ManagerResult<(&'a str, &'a [&'a str])> {
    parts
        .split_last()
        .map(|(last, parents)| (*last, parents))
        .ok_or_else(|| ManagerError::validation("Empty PATCH path"))
}

fn split_path(path: &str) -> ManagerResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    let valid = parts.iter().all(|part| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '-')
    });
    if !valid {
        return Err(ManagerError::validation(format!("Invalid SCIM path: {}", path)));
    }
    Ok(parts)
}

fn parse_eq_filter(filter: &str) -> ManagerResult<(&str, &str)> {
    let mut tokens = filter.splitn(3, ' ');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(attribute), Some(op), Some(value))
            if !attribute.is_empty() && op.eq_ignore_ascii_case("eq") =>
        {
            Ok((attribute, value.trim().trim_matches('"')))
        }
        _ => Err(ManagerError::validation(format!(
            "Unsupported PATCH filter: {}",
            filter
        ))),
    }
}

/// `id` and the server-maintained `meta` cannot be patched.
fn reject_readonly(path: &str) -> ManagerResult<()> {
    let lower = path.to_ascii_lowercase();
    if lower == "id" || lower == "meta" || lower.starts_with("meta.") {
        return Err(ManagerError::validation(format!(
            "Cannot modify readonly attribute: {}",
            path
        )));
    }
    Ok(())
}
