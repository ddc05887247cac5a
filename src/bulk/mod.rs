//! Bulk request processing (RFC 7644 §3.7).
//!
//! A request flows through these stages:
//!
//! 1. [`parser`] validates the envelope and every operation up front. Any
//!    violation rejects the whole batch before a manager is called.
//! 2. [`reference`] rewrites `bulkId:<id>` markers in the path and data using
//!    results of earlier operations in the same batch.
//! 3. [`router`] maps the path onto a registered
//!    [`ResourceManager`](crate::manager::ResourceManager) and capability.
//! 4. [`budget`] counts failures against the `failOnErrors` threshold.
//! 5. [`response`] collects one outcome per executed operation.
//!
//! [`processor`] drives the stages sequentially, in request order.

pub mod budget;
pub mod parser;
pub mod processor;
pub mod reference;
pub mod response;
pub mod router;
pub mod types;

pub use budget::FailureBudget;
pub use parser::BulkOperationParser;
pub use processor::{BulkProcessor, BulkProcessorBuilder, ProcessorState};
pub use reference::{BULK_ID_PREFIX, ReferenceResolver, ReferenceTable, ResolvedReference};
pub use response::ResponseAssembler;
pub use router::{Capability, Invocation, OperationRouter, Route};
pub use types::{
    BULK_REQUEST_SCHEMA, BULK_RESPONSE_SCHEMA, BatchStatus, BulkMethod, BulkOperationOutcome,
    BulkOperationRequest, BulkRequestEnvelope, BulkResponseEnvelope,
};
