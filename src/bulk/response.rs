//! Collection of per-operation outcomes into the BulkResponse.

use super::types::{BatchStatus, BulkMethod, BulkOperationOutcome, BulkResponseEnvelope};
use crate::error::OperationError;
use serde_json::Value;

/// Appends outcomes in execution order and builds the final envelope.
#[derive(Debug, Default)]
pub struct ResponseAssembler {
    outcomes: Vec<BulkOperationOutcome>,
}

impl ResponseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outcomes: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, outcome: BulkOperationOutcome) {
        self.outcomes.push(outcome);
    }

    /// Record a successful operation.
    ///
    /// `bulkId` is echoed only for POST and `location` is dropped for DELETE.
    pub fn record_success(
        &mut self,
        method: BulkMethod,
        bulk_id: Option<String>,
        location: Option<String>,
        status: u16,
        version: Option<String>,
        body: Option<Value>,
    ) {
        self.record(BulkOperationOutcome {
            method,
            bulk_id: echoed_bulk_id(method, bulk_id),
            version,
            location: location.filter(|_| method != BulkMethod::Delete),
            status,
            response: body,
        });
    }

    /// Record a failed operation; the error becomes the inner response.
    pub fn record_failure(
        &mut self,
        method: BulkMethod,
        bulk_id: Option<String>,
        error: &OperationError,
    ) {
        self.record(BulkOperationOutcome {
            method,
            bulk_id: echoed_bulk_id(method, bulk_id),
            version: None,
            location: None,
            status: error.status(),
            response: Some(error.to_scim_error()),
        });
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn build(self, status: BatchStatus) -> BulkResponseEnvelope {
        BulkResponseEnvelope {
            operations: self.outcomes,
            status,
        }
    }
}

fn echoed_bulk_id(method: BulkMethod, bulk_id: Option<String>) -> Option<String> {
    bulk_id.filter(|_| method == BulkMethod::Post)
}
