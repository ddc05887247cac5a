//! Resolution of `bulkId:` references between operations of one batch.
//!
//! A reference marker is the literal prefix `bulkId:` followed by the longest
//! run of characters that are not delimiters (`/ ? # , " '` or ASCII
//! whitespace). Markers are replaced by the identifier of the resource created
//! by the operation that declared that bulkId.
//!
//! References only point backwards: a bulkId becomes resolvable once its
//! operation has committed, and stays fixed for the rest of the batch. A
//! forward reference, or one to a failed operation, is an
//! [`OperationError::UnresolvedReference`].
//!
//! ```rust
//! use scim_bulk::bulk::reference::{ReferenceTable, ResolvedReference, substitute};
//!
//! let mut table = ReferenceTable::new();
//! table.register("qwerty", ResolvedReference::new("92b7", "https://localhost/v2/Users/92b7"));
//!
//! assert_eq!(substitute("/Users/bulkId:qwerty", &table).unwrap(), "/Users/92b7");
//! assert!(substitute("bulkId:ytrewq", &table).is_err());
//! ```

use crate::error::OperationError;
use log::trace;
use serde_json::Value;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Marker prefix for intra-batch references.
pub const BULK_ID_PREFIX: &str = "bulkId:";

fn is_delimiter(c: char) -> bool {
    matches!(c, '/' | '?' | '#' | ',' | '"' | '\'') || c.is_ascii_whitespace()
}

/// Whether `bulk_id` can be declared and later referenced unambiguously.
pub fn is_valid_bulk_id(bulk_id: &str) -> bool {
    !bulk_id.is_empty() && !bulk_id.chars().any(is_delimiter)
}

/// Where a committed bulkId points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Identifier substituted for the marker
    pub id: String,
    /// Absolute location of the resource
    pub location: String,
}

impl ResolvedReference {
    pub fn new(id: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            location: location.into(),
        }
    }
}

/// bulkId → committed resource, scoped to one batch.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    entries: HashMap<String, ResolvedReference>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed bulkId. Existing entries are never overwritten;
    /// returns `false` if the bulkId was already present.
    pub fn register(&mut self, bulk_id: impl Into<String>, resolved: ResolvedReference) -> bool {
        match self.entries.entry(bulk_id.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(resolved);
                true
            }
        }
    }

    pub fn get(&self, bulk_id: &str) -> Option<&ResolvedReference> {
        self.entries.get(bulk_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace every reference marker in `text` with its resolved identifier.
pub fn substitute(text: &str, table: &ReferenceTable) -> Result<String, OperationError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(BULK_ID_PREFIX) {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + BULK_ID_PREFIX.len()..];
        let end = after.find(is_delimiter).unwrap_or(after.len());
        let bulk_id = &after[..end];

        if bulk_id.is_empty() {
            // bare prefix, not a marker
            out.push_str(BULK_ID_PREFIX);
        } else {
            let resolved = table
                .get(bulk_id)
                .ok_or_else(|| OperationError::UnresolvedReference {
                    bulk_id: bulk_id.to_string(),
                })?;
            trace!("Resolved bulkId:{} -> {}", bulk_id, resolved.id);
            out.push_str(&resolved.id);
        }
        rest = &after[end..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Substitute references in every string value of a JSON payload.
/// Object keys are left untouched.
pub fn substitute_value(value: &mut Value, table: &ReferenceTable) -> Result<(), OperationError> {
    match value {
        Value::String(s) if s.contains(BULK_ID_PREFIX) => {
            *s = substitute(s, table)?;
        }
        Value::Array(items) => {
            for item in items {
                substitute_value(item, table)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_value(item, table)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Per-batch resolver owning the reference table.
#[derive(Debug, Default)]
pub struct ReferenceResolver {
    table: ReferenceTable,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve markers in an operation's path and payload.
    pub fn resolve(
        &self,
        path: &str,
        data: Option<Value>,
    ) -> Result<(String, Option<Value>), OperationError> {
        let path = substitute(path, &self.table)?;
        let data = match data {
            Some(mut data) => {
                substitute_value(&mut data, &self.table)?;
                Some(data)
            }
            None => None,
        };
        Ok((path, data))
    }

    pub fn register(&mut self, bulk_id: &str, resolved: ResolvedReference) -> bool {
        self.table.register(bulk_id, resolved)
    }

    pub fn table(&self) -> &ReferenceTable {
        &self.table
    }
}
