//! Bulk request orchestration.
//!
//! A batch moves through `Pending → Executing → (HaltedByBudget | Completed)
//! → Assembled`. Operations run strictly in request order, one at a time,
//! because later operations may reference resources created by earlier ones.
//! All per-batch state (reference table, failure count, collected outcomes)
//! lives in a [`BatchRun`] created inside each call, so a single
//! [`BulkProcessor`] can serve concurrent requests without locking.

use super::budget::FailureBudget;
use super::parser::BulkOperationParser;
use super::reference::{ReferenceResolver, ResolvedReference};
use super::response::ResponseAssembler;
use super::router::{Invocation, OperationRouter};
use super::types::{
    BatchStatus, BulkMethod, BulkOperationRequest, BulkRequestEnvelope, BulkResponseEnvelope,
};
use crate::config::BulkConfig;
use crate::error::{BuildResult, BulkResult, OperationError};
use crate::manager::{OperationContext, ResourceManager};
use log::{debug, info, trace, warn};
use serde_json::Value;
use std::sync::Arc;

/// Lifecycle of one batch execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Pending,
    Executing,
    HaltedByBudget,
    Completed,
    Assembled,
}

/// Per-invocation state, discarded once the response is built.
#[derive(Debug)]
struct BatchRun {
    request_id: String,
    state: ProcessorState,
    resolver: ReferenceResolver,
    budget: FailureBudget,
    assembler: ResponseAssembler,
}

impl BatchRun {
    fn new(envelope: &BulkRequestEnvelope) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            state: ProcessorState::Pending,
            resolver: ReferenceResolver::new(),
            budget: FailureBudget::new(envelope.fail_on_errors),
            assembler: ResponseAssembler::with_capacity(envelope.operations.len()),
        }
    }

    fn transition(&mut self, next: ProcessorState) {
        debug!(
            "Bulk request '{}' state {:?} -> {:?}",
            self.request_id, self.state, next
        );
        self.state = next;
    }

    fn assemble(mut self) -> BulkResponseEnvelope {
        let status = match self.state {
            ProcessorState::HaltedByBudget => BatchStatus::HaltedByBudget,
            _ => BatchStatus::Completed,
        };
        self.transition(ProcessorState::Assembled);
        self.assembler.build(status)
    }
}

/// Outcome data of a committed operation.
#[derive(Debug)]
struct Committed {
    id: String,
    location: String,
    status: u16,
    version: Option<String>,
    body: Option<Value>,
}

/// Processor for SCIM bulk requests.
///
/// # Examples
///
/// ```rust
/// use scim_bulk::{BulkProcessor, providers::StandardResourceManager, storage::InMemoryStorage};
/// use scim_bulk::config::BulkConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = InMemoryStorage::new();
/// let config = BulkConfig::default();
/// let processor = BulkProcessor::builder()
///     .with_manager(StandardResourceManager::users(storage.clone(), &config))
///     .with_manager(StandardResourceManager::groups(storage, &config))
///     .build()?;
///
/// let response = processor
///     .process(r#"{
///         "schemas": ["urn:ietf:params:scim:api:messages:2.0:BulkRequest"],
///         "Operations": [
///             {"method": "POST", "path": "/Users", "bulkId": "qwerty",
///              "data": {"userName": "Alice"}}
///         ]
///     }"#)
///     .await?;
/// assert_eq!(response.operations[0].status, 201);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BulkProcessor {
    config: BulkConfig,
    parser: BulkOperationParser,
    router: OperationRouter,
}

impl BulkProcessor {
    pub fn builder() -> BulkProcessorBuilder {
        BulkProcessorBuilder::new()
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    pub fn router(&self) -> &OperationRouter {
        &self.router
    }

    /// Parse and execute a raw bulk request body.
    ///
    /// Only envelope-level problems are returned as errors; every
    /// per-operation failure is reported inside the response.
    pub async fn process(&self, raw: &str) -> BulkResult<BulkResponseEnvelope> {
        let envelope = self.parser.parse(raw).inspect_err(|e| {
            warn!("Rejected bulk request: {}", e);
        })?;
        Ok(self.execute(envelope).await)
    }

    /// Parse and execute an already-decoded bulk request body.
    ///
    /// `maxPayloadSize` is checked against the compact serialization of `body`.
    pub async fn process_value(&self, body: Value) -> BulkResult<BulkResponseEnvelope> {
        let envelope = self.parser.parse_value(body).inspect_err(|e| {
            warn!("Rejected bulk request: {}", e);
        })?;
        Ok(self.execute(envelope).await)
    }

    /// Execute a parsed envelope.
    pub async fn execute(&self, envelope: BulkRequestEnvelope) -> BulkResponseEnvelope {
        let mut run = BatchRun::new(&envelope);
        let total = envelope.operations.len();
        info!(
            "Processing bulk request '{}' with {} operations (failOnErrors: {:?})",
            run.request_id, total, envelope.fail_on_errors
        );

        run.transition(ProcessorState::Executing);
        for (index, operation) in envelope.operations.into_iter().enumerate() {
            let BulkOperationRequest {
                method,
                path,
                bulk_id,
                version,
                data,
            } = operation;

            let context = OperationContext {
                request_id: run.request_id.clone(),
                operation_index: index,
                bulk_id: bulk_id.clone(),
                version,
            };

            let success = match self
                .execute_operation(method, &path, data, &run.resolver, &context)
                .await
            {
                Ok(committed) => {
                    if let Some(bulk_id) = bulk_id.as_deref() {
                        let registered = run.resolver.register(
                            bulk_id,
                            ResolvedReference::new(&committed.id, &committed.location),
                        );
                        if !registered {
                            warn!(
                                "Bulk operation {} in request '{}' repeats bulkId '{}'; keeping the first resolution",
                                index, run.request_id, bulk_id
                            );
                        }
                    }
                    let body = committed.body.filter(|_| self.config.include_success_bodies);
                    run.assembler.record_success(
                        method,
                        bulk_id,
                        Some(committed.location),
                        committed.status,
                        committed.version,
                        body,
                    );
                    true
                }
                Err(error) => {
                    warn!(
                        "Bulk operation {} ({} {}) failed in request '{}': {}",
                        index, method, path, run.request_id, error
                    );
                    run.assembler.record_failure(method, bulk_id, &error);
                    false
                }
            };

            if !run.budget.record(success) {
                warn!(
                    "Bulk request '{}' reached failOnErrors after operation {}; skipping {} remaining",
                    run.request_id,
                    index,
                    total - index - 1
                );
                run.transition(ProcessorState::HaltedByBudget);
                break;
            }
        }

        if run.state == ProcessorState::Executing {
            run.transition(ProcessorState::Completed);
        }

        info!(
            "Bulk request '{}' finished: {} of {} operations executed, {} failed",
            run.request_id,
            run.assembler.len(),
            total,
            run.budget.failures()
        );
        run.assemble()
    }

    async fn execute_operation(
        &self,
        method: BulkMethod,
        path: &str,
        data: Option<Value>,
        resolver: &ReferenceResolver,
        context: &OperationContext,
    ) -> Result<Committed, OperationError> {
        let (path, data) = resolver.resolve(path, data)?;
        let route = self.router.route(&path, method)?;
        debug!(
            "Bulk operation {} routed to {:?} on '{}'",
            context.operation_index, route.capability, route.endpoint
        );
        trace!("Bulk operation {} data: {:?}", context.operation_index, data);

        let invocation = route.invoke(data, context).await?;
        let id = route.resource_id.unwrap_or_default();

        Ok(match invocation {
            Invocation::Created(created) => Committed {
                id: created.id,
                location: created.location,
                status: created.status,
                version: created.version,
                body: created.body,
            },
            Invocation::Updated(response) => Committed {
                location: self.config.resource_url(&route.endpoint, &id),
                id,
                status: response.status,
                version: response.version,
                body: response.body,
            },
            Invocation::Deleted(status) => Committed {
                location: self.config.resource_url(&route.endpoint, &id),
                id,
                status,
                version: None,
                body: None,
            },
        })
    }
}

/// Builder for [`BulkProcessor`].
///
/// Managers are registered once here; the resulting endpoint table is
/// immutable for the processor's lifetime.
#[derive(Default)]
pub struct BulkProcessorBuilder {
    config: BulkConfig,
    managers: Vec<Arc<dyn ResourceManager>>,
}

impl BulkProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn with_config(mut self, config: BulkConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base URL used for resource locations.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn with_max_operations(mut self, max_operations: usize) -> Self {
        self.config.max_operations = max_operations;
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.config.max_payload_size = max_payload_size;
        self
    }

    /// Return resource representations in successful outcomes.
    pub fn include_success_bodies(mut self, include: bool) -> Self {
        self.config.include_success_bodies = include;
        self
    }

    pub fn with_manager(self, manager: impl ResourceManager + 'static) -> Self {
        self.with_shared_manager(Arc::new(manager))
    }

    pub fn with_shared_manager(mut self, manager: Arc<dyn ResourceManager>) -> Self {
        self.managers.push(manager);
        self
    }

    /// Validate the configuration and build the endpoint table.
    pub fn build(self) -> BuildResult<BulkProcessor> {
        self.config.validate()?;

        let mut router = OperationRouter::new();
        for manager in self.managers {
            router.register(manager)?;
        }
        debug!("Bulk processor endpoints: {:?}", router.endpoints());

        Ok(BulkProcessor {
            parser: BulkOperationParser::from_config(&self.config),
            config: self.config,
            router,
        })
    }
}
