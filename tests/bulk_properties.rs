//! Property tests for ordering and failOnErrors accounting.

mod common;

use common::builders::BulkRequestBuilder;
use common::managers::CountingManager;
use proptest::prelude::*;
use scim_bulk::{BatchStatus, BulkProcessor};
use serde_json::json;
use std::sync::Arc;

fn request(failures: &[bool], threshold: Option<u64>) -> serde_json::Value {
    let mut builder = BulkRequestBuilder::new();
    if let Some(threshold) = threshold {
        builder = builder.fail_on_errors(threshold);
    }
    for (i, fail) in failures.iter().enumerate() {
        builder = builder.post(
            "/Users",
            &format!("op{}", i),
            json!({"userName": format!("user{}", i), "fail": fail}),
        );
    }
    builder.build()
}

fn processor() -> (BulkProcessor, Arc<CountingManager>) {
    let manager = Arc::new(CountingManager::new("Users"));
    let processor = BulkProcessor::builder()
        .with_shared_manager(manager.clone())
        .build()
        .unwrap();
    (processor, manager)
}

proptest! {
    #[test]
    fn prop_without_threshold_every_operation_has_an_outcome_in_order(
        failures in prop::collection::vec(any::<bool>(), 0..40)
    ) {
        let (processor, manager) = processor();
        let response = tokio_test::block_on(processor.process_value(request(&failures, None)))
            .unwrap();

        prop_assert_eq!(response.status, BatchStatus::Completed);
        prop_assert_eq!(response.operations.len(), failures.len());
        prop_assert_eq!(manager.invocations(), failures.len());

        for (i, (outcome, fail)) in response.operations.iter().zip(&failures).enumerate() {
            let expected_bulk_id = format!("op{}", i);
            prop_assert_eq!(outcome.bulk_id.as_deref(), Some(expected_bulk_id.as_str()));
            prop_assert_eq!(outcome.status, if *fail { 400 } else { 201 });
            prop_assert_eq!(outcome.location.is_some(), !*fail);
        }
    }

    #[test]
    fn prop_threshold_truncates_at_the_kth_failure(
        failures in prop::collection::vec(any::<bool>(), 1..40),
        threshold in 1u64..5
    ) {
        let (processor, manager) = processor();
        let response = tokio_test::block_on(
            processor.process_value(request(&failures, Some(threshold))),
        )
        .unwrap();

        let mut seen = 0u64;
        let halt_index = failures.iter().position(|fail| {
            if *fail {
                seen += 1;
            }
            seen == threshold
        });

        match halt_index {
            Some(index) => {
                prop_assert_eq!(response.status, BatchStatus::HaltedByBudget);
                prop_assert_eq!(response.operations.len(), index + 1);
                prop_assert_eq!(response.failure_count() as u64, threshold);
            }
            None => {
                prop_assert_eq!(response.status, BatchStatus::Completed);
                prop_assert_eq!(response.operations.len(), failures.len());
            }
        }
        prop_assert_eq!(manager.invocations(), response.operations.len());
    }
}
