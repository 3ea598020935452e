// crates/certify-core/src/runtime/check.rs
// ============================================================================
// Module: Check Runner
// Description: Validates connector check behavior over fixture sets.
// Purpose: Assert success/failure expectations with batch reporting.
// Dependencies: crate::core, crate::interfaces, crate::telemetry
// ============================================================================

//! ## Overview
//! [`CheckRunner`] runs `check` once per fixture, under the fixture's own
//! deployment mode, and judges the single connection status it reports.
//! Fixtures are evaluated in batch: every fixture runs, every mismatch is
//! collected, and the batch fails with a report naming each failing fixture.
//! Connector process failures are not verdicts; they abort the batch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::core::CheckExpectations;
use crate::core::CheckOutcome;
use crate::core::CheckStatus;
use crate::core::ConfigDocument;
use crate::core::ConfigFixture;
use crate::core::FailurePattern;
use crate::error::HarnessError;
use crate::interfaces::ConnectorError;
use crate::interfaces::ConnectorRun;
use crate::interfaces::DestinationConnector;
use crate::telemetry::HarnessEvent;
use crate::telemetry::HarnessLog;
use crate::telemetry::NoopHarnessLog;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Hook applied to raw configuration text before each check.
pub type ConfigTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// What a fixture is expected to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// `check` must report `SUCCEEDED`.
    Succeed,
    /// `check` must report `FAILED` with a fully matching message.
    Fail(FailurePattern),
}

impl Expectation {
    /// Returns the expected status.
    #[must_use]
    pub const fn status(&self) -> CheckStatus {
        match self {
            Self::Succeed => CheckStatus::Succeeded,
            Self::Fail(_) => CheckStatus::Failed,
        }
    }
}

/// Judgement for one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureVerdict {
    /// The fixture met its expectation.
    Passed,
    /// The reported status was the opposite of the expected one.
    UnexpectedStatus,
    /// Status was `FAILED` but the message did not match the pattern.
    MessageMismatch,
    /// The connector did not report exactly one connection status.
    StatusCount(usize),
}

/// Result of one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureResult {
    /// Fixture that ran.
    pub fixture: ConfigFixture,
    /// What was expected.
    pub expectation: Expectation,
    /// Reported outcome (the last one when several were reported).
    pub outcome: Option<CheckOutcome>,
    /// Judgement.
    pub verdict: FixtureVerdict,
}

impl FixtureResult {
    /// Returns true when the fixture met its expectation.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == FixtureVerdict::Passed
    }

    /// Describes a mismatch; `None` for passing fixtures.
    #[must_use]
    pub fn mismatch(&self) -> Option<String> {
        let actual_message = self
            .outcome
            .as_ref()
            .and_then(|outcome| outcome.message.as_deref())
            .unwrap_or("<none>");
        let text = match (&self.verdict, &self.expectation) {
            (FixtureVerdict::Passed, _) => return None,
            (FixtureVerdict::StatusCount(count), _) => {
                format!("expected exactly one connection status message, got {count}")
            }
            (FixtureVerdict::UnexpectedStatus, Expectation::Succeed) => {
                format!("expected SUCCEEDED but got FAILED with message \"{actual_message}\"")
            }
            (FixtureVerdict::UnexpectedStatus, Expectation::Fail(pattern)) => {
                format!("expected FAILED matching /{pattern}/ but got SUCCEEDED")
            }
            (FixtureVerdict::MessageMismatch, Expectation::Fail(pattern)) => {
                format!("expected message matching /{pattern}/ but got \"{actual_message}\"")
            }
            (FixtureVerdict::MessageMismatch, Expectation::Succeed) => {
                format!("unexpected message \"{actual_message}\"")
            }
        };
        Some(text)
    }
}

/// Per-fixture results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    /// Results in fixture order.
    pub results: Vec<FixtureResult>,
}

impl CheckReport {
    /// Returns true when every fixture passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.results.iter().all(FixtureResult::passed)
    }

    /// Returns the failing results.
    #[must_use]
    pub fn failures(&self) -> Vec<&FixtureResult> {
        self.results.iter().filter(|result| !result.passed()).collect()
    }

    /// Appends another report.
    pub fn extend(&mut self, other: Self) {
        self.results.extend(other.results);
    }

    /// Converts into `Ok` when every fixture passed.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CheckMismatches`] listing every failing fixture.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        if self.passed() { Ok(self) } else { Err(HarnessError::CheckMismatches(self)) }
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.failures();
        write!(f, "{} of {} check fixtures failed", failures.len(), self.results.len())?;
        for result in failures {
            if let Some(mismatch) = result.mismatch() {
                write!(f, "\n  {}: {mismatch}", result.fixture)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Judgement
// ============================================================================

/// Judges one connector run against an expectation.
///
/// # Errors
///
/// Returns [`ConnectorError::Crashed`] when the connector exited abnormally
/// without reporting any status.
pub(crate) fn judge_run(
    fixture: &ConfigFixture,
    expectation: Expectation,
    run: &ConnectorRun,
) -> Result<FixtureResult, ConnectorError> {
    let statuses = run.connection_statuses();
    if statuses.is_empty() && !run.exited_cleanly() {
        return Err(ConnectorError::crashed("check", run));
    }
    let (outcome, verdict) = match statuses.as_slice() {
        [single] => ((*single).clone(), judge_outcome(&expectation, single)),
        others => {
            let last = others.last().map(|outcome| (*outcome).clone());
            return Ok(FixtureResult {
                fixture: fixture.clone(),
                expectation,
                outcome: last,
                verdict: FixtureVerdict::StatusCount(others.len()),
            });
        }
    };
    Ok(FixtureResult {
        fixture: fixture.clone(),
        expectation,
        outcome: Some(outcome),
        verdict,
    })
}

/// Compares a single reported outcome with the expectation.
fn judge_outcome(expectation: &Expectation, outcome: &CheckOutcome) -> FixtureVerdict {
    match (expectation, outcome.status) {
        (Expectation::Succeed, CheckStatus::Succeeded) => FixtureVerdict::Passed,
        (Expectation::Succeed, CheckStatus::Failed)
        | (Expectation::Fail(_), CheckStatus::Succeeded) => FixtureVerdict::UnexpectedStatus,
        (Expectation::Fail(pattern), CheckStatus::Failed) => {
            match outcome.message.as_deref() {
                Some(message) if pattern.matches(message) => FixtureVerdict::Passed,
                _ => FixtureVerdict::MessageMismatch,
            }
        }
    }
}

/// Emits one fixture event plus any connector log lines.
pub(crate) fn record_fixture(log: &dyn HarnessLog, result: &FixtureResult, run: &ConnectorRun) {
    for line in run.logs() {
        log.record(&HarnessEvent::ConnectorLog {
            session_id: None,
            level: line.level,
            message: line.message.clone(),
        });
    }
    log.record(&HarnessEvent::CheckFixture {
        fixture: result.fixture.to_string(),
        mode: result.fixture.mode(),
        expected: result.expectation.status(),
        status: match result.verdict {
            FixtureVerdict::StatusCount(_) => None,
            _ => result.outcome.as_ref().map(|outcome| outcome.status),
        },
        passed: result.passed(),
        detail: result.mismatch(),
    });
}

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Runs `check` across fixture sets.
pub struct CheckRunner {
    /// Connector under test.
    connector: Arc<dyn DestinationConnector>,
    /// Optional configuration rewrite applied before each check.
    transform: Option<ConfigTransform>,
    /// Event sink.
    log: Arc<dyn HarnessLog>,
}

impl CheckRunner {
    /// Creates a runner with no config transform and a no-op log.
    #[must_use]
    pub fn new(connector: Arc<dyn DestinationConnector>) -> Self {
        Self {
            connector,
            transform: None,
            log: Arc::new(NoopHarnessLog),
        }
    }

    /// Installs a configuration rewrite hook.
    #[must_use]
    pub fn with_config_transform(mut self, transform: ConfigTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Installs an event sink.
    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn HarnessLog>) -> Self {
        self.log = log;
        self
    }

    /// Asserts every fixture checks `SUCCEEDED` under its own mode.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CheckMismatches`] listing every failing fixture,
    /// or the first fixture read or connector process failure.
    pub async fn run_success_configs(
        &self,
        fixtures: &[ConfigFixture],
    ) -> Result<CheckReport, HarnessError> {
        let mut report = CheckReport::default();
        for fixture in fixtures {
            report.results.push(self.run_fixture(fixture, Expectation::Succeed).await?);
        }
        report.into_result()
    }

    /// Asserts every fixture checks `FAILED` with a message fully matching its
    /// pattern.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CheckMismatches`] listing every failing fixture,
    /// or the first fixture read or connector process failure.
    pub async fn run_fail_configs(
        &self,
        fixtures: &[(ConfigFixture, FailurePattern)],
    ) -> Result<CheckReport, HarnessError> {
        let mut report = CheckReport::default();
        for (fixture, pattern) in fixtures {
            let expectation = Expectation::Fail(pattern.clone());
            report.results.push(self.run_fixture(fixture, expectation).await?);
        }
        report.into_result()
    }

    /// Runs both sets of an expectation set and reports them together.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CheckMismatches`] covering both sets, or the
    /// first fixture read or connector process failure.
    pub async fn run_expectations(
        &self,
        expectations: &CheckExpectations,
    ) -> Result<CheckReport, HarnessError> {
        let mut report = match self.run_success_configs(expectations.success()).await {
            Ok(report) | Err(HarnessError::CheckMismatches(report)) => report,
            Err(other) => return Err(other),
        };
        match self.run_fail_configs(expectations.failure()).await {
            Ok(failing) | Err(HarnessError::CheckMismatches(failing)) => report.extend(failing),
            Err(other) => return Err(other),
        }
        report.into_result()
    }

    /// Reads, transforms, and checks one fixture.
    async fn run_fixture(
        &self,
        fixture: &ConfigFixture,
        expectation: Expectation,
    ) -> Result<FixtureResult, HarnessError> {
        let document = self.prepare(fixture.read_document()?);
        let connector_error = |source: ConnectorError| HarnessError::Connector {
            context: fixture.to_string(),
            source,
        };
        let run = self.connector.check(&document, fixture.mode()).await.map_err(connector_error)?;
        let result = judge_run(fixture, expectation, &run).map_err(connector_error)?;
        record_fixture(self.log.as_ref(), &result, &run);
        Ok(result)
    }

    /// Applies the configured transform, if any.
    fn prepare(&self, document: ConfigDocument) -> ConfigDocument {
        match &self.transform {
            Some(transform) => document.with_contents(transform(document.contents())),
            None => document,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
