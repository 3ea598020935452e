// crates/certify-core/tests/proptest_mapper.rs
// ============================================================================
// Module: Record Mapper Property-Based Tests
// Description: Property tests for expected-record mapping.
// Purpose: Check that mapping is a pure function of the raw record.
// ============================================================================

//! Property-based tests for record mapper invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use certify_core::ExpectedRecordMapper;
use certify_core::NoopExpectedRecordMapper;
use certify_core::OutputRecord;
use certify_core::OutputRecordMeta;
use proptest::prelude::*;
use serde_json::json;

fn record_strategy() -> impl Strategy<Value = OutputRecord> {
    (
        any::<i64>(),
        prop::option::of(0 .. 5i64),
        prop::option::of(any::<i64>()),
        prop::option::of("[a-z ]{0,8}"),
        prop::option::of(0 .. 100i64),
    )
        .prop_map(|(extracted, generation, loaded, name, sync_id)| OutputRecord {
            extracted_at_ms: extracted,
            generation_id: generation,
            loaded_at_ms: loaded,
            data: json!({ "name": name, "tags": [name, null] }),
            meta: sync_id.map(|sync_id| OutputRecordMeta {
                sync_id: Some(sync_id),
                changes: Vec::new(),
            }),
        })
}

proptest! {
    #[test]
    fn noop_mapping_is_repeatable_identity(
        record in record_strategy(),
        repeats in 2 .. 6usize,
    ) {
        let first = NoopExpectedRecordMapper.map(&record).unwrap();
        prop_assert_eq!(&first, &record);
        for _ in 1 .. repeats {
            prop_assert_eq!(&NoopExpectedRecordMapper.map(&record).unwrap(), &first);
        }
    }
}
