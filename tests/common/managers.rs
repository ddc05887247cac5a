//! Scripted resource managers.

use async_trait::async_trait;
use scim_bulk::{
    Created, ManagerError, ManagerResponse, ManagerResult, OperationContext, ResourceManager,
};
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts invocations and fails any call whose payload has `"fail": true`
/// or whose target id starts with `missing`.
#[derive(Debug)]
pub struct CountingManager {
    endpoint: String,
    invocations: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl CountingManager {
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            invocations: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// `capability:target` entries in call order.
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn record(&self, entry: String) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(entry);
    }

    fn check(&self, id: Option<&str>, data: Option<&Value>) -> ManagerResult<()> {
        if let Some(id) = id.filter(|id| id.starts_with("missing")) {
            return Err(ManagerError::not_found(&self.endpoint, id));
        }
        if data.is_some_and(|d| d["fail"] == Value::Bool(true)) {
            return Err(ManagerError::validation("scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ResourceManager for CountingManager {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create(&self, data: Value, context: &OperationContext) -> ManagerResult<Created> {
        self.record(format!("create:{}", context.operation_index));
        self.check(None, Some(&data))?;
        let id = format!("{}-{}", self.endpoint.to_lowercase(), context.operation_index);
        Ok(Created {
            location: format!("https://localhost/v2/{}/{}", self.endpoint, id),
            id,
            body: Some(data),
            status: 201,
            version: None,
        })
    }

    async fn replace(
        &self,
        id: &str,
        data: Value,
        _context: &OperationContext,
    ) -> ManagerResult<ManagerResponse> {
        self.record(format!("replace:{}", id));
        self.check(Some(id), Some(&data))?;
        Ok(ManagerResponse::ok(Some(data)))
    }

    async fn modify(
        &self,
        id: &str,
        data: Value,
        _context: &OperationContext,
    ) -> ManagerResult<ManagerResponse> {
        self.record(format!("modify:{}", id));
        self.check(Some(id), Some(&data))?;
        Ok(ManagerResponse::ok(Some(data)))
    }

    async fn delete(&self, id: &str, _context: &OperationContext) -> ManagerResult<u16> {
        self.record(format!("delete:{}", id));
        self.check(Some(id), None)?;
        Ok(204)
    }
}
