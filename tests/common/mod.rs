//! Shared fixtures for the bulk integration tests.
//!
//! - `builders` - request bodies and resource payloads
//! - `managers` - scripted managers that count calls and fail on demand

#![allow(dead_code)]

pub mod builders;
pub mod managers;

use scim_bulk::providers::StandardResourceManager;
use scim_bulk::storage::InMemoryStorage;
use scim_bulk::{BulkConfig, BulkProcessor};

/// Route `log` output through `env_logger`; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Processor with `/Users` and `/Groups` over one shared in-memory store.
pub fn standard_processor() -> (BulkProcessor, InMemoryStorage) {
    standard_processor_with(BulkConfig::default())
}

pub fn standard_processor_with(config: BulkConfig) -> (BulkProcessor, InMemoryStorage) {
    init_logging();
    let storage = InMemoryStorage::new();
    let processor = BulkProcessor::builder()
        .with_config(config.clone())
        .with_manager(StandardResourceManager::users(storage.clone(), &config))
        .with_manager(StandardResourceManager::groups(storage.clone(), &config))
        .build()
        .expect("standard processor should build");
    (processor, storage)
}
