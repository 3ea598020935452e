// crates/certify-destinations/tests/dev_null_check.rs
// ============================================================================
// Module: Dev-Null Check Certification
// Description: Check expectations for the dev-null destination binary.
// ============================================================================
//! ## Overview
//! Certifies dev-null's `check` across deployment modes: the logging config
//! is valid under OSS and rejected under CLOUD with a schema message that
//! must match in full.

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

use certify_config::CheckManifest;
use certify_config::HarnessConfig;
use certify_core::CheckRunner;
use certify_core::CheckStatus;
use certify_core::ConfigFixture;
use certify_core::DeploymentMode;
use certify_core::FailurePattern;
use certify_core::FixtureVerdict;
use certify_core::HarnessError;
use certify_core::HarnessEvent;
use certify_core::MemoryHarnessLog;
use certify_process::ProcessConnector;
use support::DEV_NULL_IMAGE;
use support::dev_null;
use support::test_config;

#[tokio::test]
async fn logging_config_checks_under_oss() {
    let runner = CheckRunner::new(dev_null());

    let report = runner
        .run_success_configs(&[ConfigFixture::new(test_config("logging.json"), DeploymentMode::Oss)])
        .await
        .unwrap();

    assert!(report.passed());
    assert_eq!(report.results.len(), 1);
}

#[tokio::test]
async fn logging_config_is_rejected_under_cloud() {
    let runner = CheckRunner::new(dev_null());
    let fixture = ConfigFixture::new(test_config("logging.json"), DeploymentMode::Cloud);
    let pattern = FailurePattern::new("Value 'LOGGING' is not defined in the schema").unwrap();

    let report = runner.run_fail_configs(&[(fixture, pattern)]).await.unwrap();

    let outcome = report.results[0].outcome.as_ref().unwrap();
    assert_eq!(outcome.status, CheckStatus::Failed);
    assert_eq!(outcome.message.as_deref(), Some("Value 'LOGGING' is not defined in the schema"));
}

#[tokio::test]
async fn partial_pattern_does_not_satisfy_a_failure_expectation() {
    let runner = CheckRunner::new(dev_null());
    let fixture = ConfigFixture::new(test_config("logging.json"), DeploymentMode::Cloud);
    let pattern = FailurePattern::new("Value 'LOGGING'").unwrap();

    let err = runner.run_fail_configs(&[(fixture, pattern)]).await.unwrap_err();

    let HarnessError::CheckMismatches(report) = err else {
        panic!("expected check mismatches, got {err}");
    };
    assert_eq!(report.results[0].verdict, FixtureVerdict::MessageMismatch);
}

#[tokio::test]
async fn manifest_suite_passes_and_logs_every_fixture() {
    let manifest = CheckManifest::load(&test_config("dev_null_checks.toml")).unwrap();
    let expectations = manifest.expectations().unwrap();
    let log = Arc::new(MemoryHarnessLog::new());
    let runner = CheckRunner::new(dev_null()).with_log(log.clone());

    let report = runner.run_expectations(&expectations).await.unwrap();

    assert_eq!(report.results.len(), 7);
    let verdicts = log
        .events()
        .into_iter()
        .filter(|event| matches!(event, HarnessEvent::CheckFixture { passed: true, .. }))
        .count();
    assert_eq!(verdicts, 7);
}

#[tokio::test]
async fn swapped_expectations_report_every_fixture() {
    let runner = CheckRunner::new(dev_null());
    let fixtures = [
        ConfigFixture::new(test_config("logging.json"), DeploymentMode::Cloud),
        ConfigFixture::new(test_config("failing.json"), DeploymentMode::Cloud),
    ];

    let err = runner.run_success_configs(&fixtures).await.unwrap_err();

    let HarnessError::CheckMismatches(report) = err else {
        panic!("expected check mismatches, got {err}");
    };
    assert_eq!(report.failures().len(), 2);
    assert!(report.results.iter().all(|result| result.verdict == FixtureVerdict::UnexpectedStatus));
}

#[tokio::test]
async fn harness_config_drives_the_suite_with_a_file_log() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("harness.log");
    let toml = format!(
        r#"
        [connector]
        image = "{DEV_NULL_IMAGE}"
        program = "{program}"

        [timeouts]
        check_ms = 30000

        [log]
        sink = "file"
        path = "{log}"
        "#,
        program = env!("CARGO_BIN_EXE_destination-dev-null"),
        log = log_path.display(),
    );
    let config = HarnessConfig::from_toml_str(&toml).unwrap();
    let log = config.open_log().unwrap();
    let runner = CheckRunner::new(Arc::new(ProcessConnector::new(config))).with_log(log);
    let expectations = CheckManifest::load(&test_config("dev_null_checks.toml"))
        .unwrap()
        .expectations()
        .unwrap();

    runner.run_expectations(&expectations).await.unwrap();

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&log_path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 7);
    assert!(lines.iter().all(|line| line["event"] == "check_fixture" && line["passed"] == true));
}
