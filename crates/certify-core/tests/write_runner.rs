// crates/certify-core/tests/write_runner.rs
// ============================================================================
// Module: Write Runner Tests
// Description: Basic write sessions, verification, and cleanup guarantees.
// ============================================================================
//! ## Overview
//! Drives [`WriteHarness`] against an in-memory destination and checks the
//! checkpoint echo, record comparison, and exactly-once cleanup on every
//! exit path, including panics.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use certify_core::ConfigDocument;
use certify_core::ConnectorError;
use certify_core::ConnectorRun;
use certify_core::DataVerification;
use certify_core::ExpectedRecordMapper;
use certify_core::HarnessError;
use certify_core::HarnessEvent;
use certify_core::InputRecord;
use certify_core::MemoryHarnessLog;
use certify_core::NoopDestinationCleaner;
use certify_core::NoopExpectedRecordMapper;
use certify_core::WriteFailure;
use certify_core::WriteHarness;
use serde_json::json;
use support::CountingCleaner;
use support::CountingMapper;
use support::DropLoadedAt;
use support::MemoryDestination;
use support::MemoryDumper;
use support::PanickingCleaner;
use support::RejectingMapper;
use support::ScriptedConnector;
use support::WriteScript;
use support::check_by_document;
use support::status_run;

struct Fixture {
    destination: Arc<MemoryDestination>,
    dumper: Arc<MemoryDumper>,
    cleaner: Arc<CountingCleaner>,
}

impl Fixture {
    fn new(fail_cleanup: bool) -> Self {
        let destination = Arc::new(MemoryDestination::default());
        Self {
            dumper: Arc::new(MemoryDumper {
                destination: Arc::clone(&destination),
                calls: AtomicUsize::new(0),
            }),
            cleaner: Arc::new(CountingCleaner {
                destination: Arc::clone(&destination),
                calls: AtomicUsize::new(0),
                fail: fail_cleanup,
            }),
            destination,
        }
    }

    fn verification(&self, mapper: Arc<dyn ExpectedRecordMapper>) -> DataVerification {
        DataVerification::new(self.dumper.clone(), self.cleaner.clone(), mapper)
    }

    fn harness(&self, write: WriteScript, mapper: Arc<dyn ExpectedRecordMapper>) -> WriteHarness {
        let connector = Arc::new(ScriptedConnector::new(check_by_document(), write));
        WriteHarness::new(connector, config(), self.verification(mapper))
    }
}

fn config() -> ConfigDocument {
    ConfigDocument::new("inline.json", r#"{"ok": true}"#)
}

fn basic_records() -> Vec<InputRecord> {
    vec![InputRecord::new(json!({ "id": 5678 }), 1234)]
}

#[tokio::test]
async fn verified_write_passes_and_cleans_once() {
    let fixture = Fixture::new(false);
    let harness = fixture.harness(fixture.destination.write_script(|_| true), Arc::new(DropLoadedAt));

    let report = harness.run_basic_write(basic_records(), true).await.expect("write passes");

    assert_eq!(report.records_sent, 1);
    assert_eq!(report.states_received, 1);
    assert_eq!(report.records_verified, Some(1));
    assert_eq!(fixture.cleaner.count(), 1);
    assert!(fixture.destination.namespaces().is_empty());
}

#[tokio::test]
async fn dropped_record_is_reported_missing() {
    let fixture = Fixture::new(false);
    let harness = fixture.harness(fixture.destination.write_script(|index| index != 1), Arc::new(DropLoadedAt));
    let records = vec![
        InputRecord::new(json!({ "id": 1 }), 10),
        InputRecord::new(json!({ "id": 2 }), 20),
        InputRecord::new(json!({ "id": 3 }), 30),
    ];

    let err = harness.run_basic_write(records, true).await.expect_err("record missing");

    let HarnessError::WriteMismatches { failures, .. } = &err else {
        panic!("expected write mismatches, got {err}");
    };
    let [WriteFailure::RecordMismatch { diff, raw, .. }] = failures.as_slice() else {
        panic!("expected one record mismatch, got {err}");
    };
    assert_eq!(diff.missing.len(), 1);
    assert_eq!(diff.missing[0].data, json!({ "id": 2 }));
    assert_eq!(raw.len(), 2);
    assert!(err.to_string().contains("missing record"));
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn identity_mapper_exposes_destination_columns() {
    let fixture = Fixture::new(false);
    let harness =
        fixture.harness(fixture.destination.write_script(|_| true), Arc::new(NoopExpectedRecordMapper));

    let err = harness.run_basic_write(basic_records(), true).await.expect_err("loaded_at differs");

    let HarnessError::WriteMismatches { failures, .. } = &err else {
        panic!("expected write mismatches, got {err}");
    };
    let [WriteFailure::RecordMismatch { diff, .. }] = failures.as_slice() else {
        panic!("expected one record mismatch, got {err}");
    };
    assert!(diff.missing.len() + diff.mismatched.len() > 0);
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn missing_checkpoint_echo_fails_the_session() {
    let fixture = Fixture::new(false);
    let silent: WriteScript = Box::new(|_, _| Ok(status_run(Vec::new(), 0)));
    let harness = fixture.harness(silent, Arc::new(DropLoadedAt));

    let err = harness.run_basic_write(basic_records(), false).await.expect_err("no state");

    let HarnessError::WriteMismatches { failures, .. } = &err else {
        panic!("expected write mismatches, got {err}");
    };
    assert!(matches!(
        failures.as_slice(),
        [WriteFailure::StateMismatch { actual, .. }] if actual.is_empty()
    ));
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn skipping_verification_never_reads_back() {
    let fixture = Fixture::new(false);
    let mapper = Arc::new(CountingMapper::default());
    let harness = fixture.harness(fixture.destination.write_script(|_| true), mapper.clone());

    let report = harness.run_basic_write(basic_records(), false).await.expect("write passes");

    assert_eq!(report.records_verified, None);
    assert_eq!(fixture.dumper.calls.load(Ordering::SeqCst), 0);
    assert_eq!(mapper.calls.load(Ordering::SeqCst), 0);
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn connector_crash_is_fatal_and_still_cleans() {
    let fixture = Fixture::new(false);
    let crash: WriteScript = Box::new(|_, _| {
        Ok(ConnectorRun {
            exit_code: Some(1),
            stderr: "boom".to_string(),
            ..ConnectorRun::default()
        })
    });
    let harness = fixture.harness(crash, Arc::new(DropLoadedAt));

    let err = harness.run_basic_write(basic_records(), true).await.expect_err("crash");

    assert!(matches!(
        err,
        HarnessError::Connector {
            source: ConnectorError::Crashed { .. },
            ..
        }
    ));
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn mapper_failure_carries_raw_records() {
    let fixture = Fixture::new(false);
    let harness = fixture.harness(fixture.destination.write_script(|_| true), Arc::new(RejectingMapper));

    let err = harness.run_basic_write(basic_records(), true).await.expect_err("mapper fails");

    let HarnessError::WriteMismatches { failures, .. } = &err else {
        panic!("expected write mismatches, got {err}");
    };
    let [WriteFailure::Map { raw, .. }] = failures.as_slice() else {
        panic!("expected mapper failure, got {err}");
    };
    assert_eq!(raw.len(), 1);
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn cleanup_failure_after_success_is_reported() {
    let fixture = Fixture::new(true);
    let harness = fixture.harness(fixture.destination.write_script(|_| true), Arc::new(DropLoadedAt));

    let err = harness.run_basic_write(basic_records(), true).await.expect_err("cleanup fails");

    assert!(matches!(err, HarnessError::Cleanup { .. }));
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn cleanup_failure_never_masks_the_primary_failure() {
    let fixture = Fixture::new(true);
    let silent: WriteScript = Box::new(|_, _| Ok(status_run(Vec::new(), 0)));
    let log = Arc::new(MemoryHarnessLog::new());
    let harness = fixture.harness(silent, Arc::new(DropLoadedAt)).with_log(log.clone());

    let err = harness.run_basic_write(basic_records(), false).await.expect_err("both fail");

    assert!(matches!(err, HarnessError::WriteMismatches { .. }));
    assert_eq!(fixture.cleaner.count(), 1);
    assert!(log.events().iter().any(|event| matches!(event, HarnessEvent::CleanupFailed { .. })));
}

#[tokio::test]
async fn panic_inside_the_session_still_cleans_once() {
    let fixture = Fixture::new(false);
    let exploding: WriteScript = Box::new(|_, _| panic!("connector exploded"));
    let harness = fixture.harness(exploding, Arc::new(DropLoadedAt));

    let joined = tokio::spawn(async move { harness.run_basic_write(basic_records(), true).await }).await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(fixture.cleaner.count(), 1);
}

#[tokio::test]
async fn panicking_cleaner_during_a_panic_keeps_the_original_panic() {
    let fixture = Fixture::new(false);
    let cleaner = Arc::new(PanickingCleaner::default());
    let log = Arc::new(MemoryHarnessLog::new());
    let exploding: WriteScript = Box::new(|_, _| panic!("connector exploded"));
    let connector = Arc::new(ScriptedConnector::new(check_by_document(), exploding));
    let verification =
        DataVerification::new(fixture.dumper.clone(), cleaner.clone(), Arc::new(DropLoadedAt));
    let harness = WriteHarness::new(connector, config(), verification).with_log(log.clone());

    let joined = tokio::spawn(async move { harness.run_basic_write(basic_records(), true).await }).await;

    let payload = joined.unwrap_err().into_panic();
    assert_eq!(payload.downcast_ref::<&str>(), Some(&"connector exploded"));
    assert_eq!(cleaner.calls.load(Ordering::SeqCst), 1);
    assert!(log.events().iter().any(|event| matches!(
        event,
        HarnessEvent::CleanupFailed { message, .. } if message == "cleaner panicked"
    )));
}

#[tokio::test]
async fn each_session_gets_a_fresh_namespace() {
    let fixture = Fixture::new(false);
    let harness = fixture.harness(fixture.destination.write_script(|_| true), Arc::new(DropLoadedAt));

    let first = harness.run_basic_write(basic_records(), true).await.unwrap();
    let second = harness.run_basic_write(basic_records(), true).await.unwrap();

    assert_ne!(first.namespace, second.namespace);
    assert_eq!(fixture.cleaner.count(), 2);
}

#[tokio::test]
async fn suite_check_must_succeed() {
    let connector = Arc::new(ScriptedConnector::checking(check_by_document()));
    let passing = WriteHarness::new(
        connector.clone(),
        config(),
        DataVerification::new(
            Arc::new(certify_core::NoopDestinationDataDumper),
            Arc::new(NoopDestinationCleaner),
            Arc::new(NoopExpectedRecordMapper),
        ),
    );
    passing.run_check().await.expect("suite config passes");

    let failing = WriteHarness::new(
        connector,
        ConfigDocument::new("inline.json", r#"{"ok": false, "message": "denied"}"#),
        DataVerification::noop(),
    );
    let err = failing.run_check().await.expect_err("suite config rejected");
    assert!(matches!(err, HarnessError::CheckMismatches(_)));
}
