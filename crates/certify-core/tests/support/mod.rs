// crates/certify-core/tests/support/mod.rs
// ============================================================================
// Module: Runner Test Support
// Description: Scripted in-memory connector and verification collaborators.
// ============================================================================
//! ## Overview
//! Provides a connector whose check and write behavior is scripted per test,
//! plus an in-memory destination shared by the connector, dumper, and cleaner.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Shared test scaffolding; not every test uses every helper."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use certify_core::CheckOutcome;
use certify_core::CleanerError;
use certify_core::ConfigDocument;
use certify_core::ConfiguredCatalog;
use certify_core::ConnectorError;
use certify_core::ConnectorMessage;
use certify_core::ConnectorRun;
use certify_core::DeploymentMode;
use certify_core::DestinationCleaner;
use certify_core::DestinationConnector;
use certify_core::DestinationDataDumper;
use certify_core::ExpectedRecordMapper;
use certify_core::OutputRecord;
use certify_core::OutputRecordMeta;
use certify_core::SessionContext;
use certify_core::VerificationError;
use serde_json::Value;

pub type CheckScript =
    Box<dyn Fn(&ConfigDocument, DeploymentMode) -> Result<ConnectorRun, ConnectorError> + Send + Sync>;

pub type WriteScript = Box<
    dyn Fn(&ConfiguredCatalog, Vec<ConnectorMessage>) -> Result<ConnectorRun, ConnectorError>
        + Send
        + Sync,
>;

/// Builds a run that reported the given statuses and exited with `code`.
pub fn status_run(statuses: Vec<CheckOutcome>, code: i32) -> ConnectorRun {
    ConnectorRun {
        exit_code: Some(code),
        messages: statuses
            .into_iter()
            .map(|connection_status| ConnectorMessage::ConnectionStatus {
                connection_status,
            })
            .collect(),
        ..ConnectorRun::default()
    }
}

/// Check script driven by the config document: `{"ok": true}` succeeds and
/// `{"ok": false, "message": "..."}` fails with the message.
pub fn check_by_document() -> CheckScript {
    Box::new(|config, _mode| {
        let value = config.to_json().unwrap_or(Value::Null);
        let outcome = if value["ok"] == Value::Bool(true) {
            CheckOutcome::succeeded()
        } else {
            CheckOutcome::failed(value["message"].as_str().unwrap_or("rejected"))
        };
        Ok(status_run(vec![outcome], 0))
    })
}

/// Scripted connector that records every invocation.
pub struct ScriptedConnector {
    check: CheckScript,
    write: WriteScript,
    pub check_modes: Mutex<Vec<DeploymentMode>>,
    pub check_configs: Mutex<Vec<String>>,
    pub write_calls: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(check: CheckScript, write: WriteScript) -> Self {
        Self {
            check,
            write,
            check_modes: Mutex::new(Vec::new()),
            check_configs: Mutex::new(Vec::new()),
            write_calls: AtomicUsize::new(0),
        }
    }

    pub fn checking(check: CheckScript) -> Self {
        Self::new(check, Box::new(|_, _| Ok(ConnectorRun::default())))
    }
}

#[async_trait]
impl DestinationConnector for ScriptedConnector {
    fn describe(&self) -> String {
        "scripted".to_string()
    }

    async fn check(
        &self,
        config: &ConfigDocument,
        mode: DeploymentMode,
    ) -> Result<ConnectorRun, ConnectorError> {
        self.check_modes.lock().unwrap().push(mode);
        self.check_configs.lock().unwrap().push(config.contents().to_string());
        (self.check)(config, mode)
    }

    async fn write(
        &self,
        _config: &ConfigDocument,
        catalog: &ConfiguredCatalog,
        _mode: DeploymentMode,
        input: Vec<ConnectorMessage>,
    ) -> Result<ConnectorRun, ConnectorError> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        (self.write)(catalog, input)
    }
}

/// In-memory destination keyed by namespace.
#[derive(Default)]
pub struct MemoryDestination {
    pub tables: Mutex<BTreeMap<String, Vec<OutputRecord>>>,
}

impl MemoryDestination {
    /// Write script that persists records into this destination and echoes
    /// each checkpoint with its destination count. `keep` filters records.
    pub fn write_script(
        self: &Arc<Self>,
        keep: impl Fn(usize) -> bool + Send + Sync + 'static,
    ) -> WriteScript {
        let destination = Arc::clone(self);
        Box::new(move |catalog, input| {
            let stream = catalog.streams.first().expect("catalog stream").clone();
            let namespace = stream.descriptor.namespace.clone().unwrap_or_default();
            let mut output = Vec::new();
            let mut persisted = Vec::new();
            for (index, message) in input.into_iter().enumerate() {
                match message {
                    ConnectorMessage::Record {
                        record,
                    } if keep(index) => persisted.push(OutputRecord {
                        extracted_at_ms: record.emitted_at_ms,
                        generation_id: Some(stream.generation_id),
                        loaded_at_ms: Some(99),
                        data: record.data,
                        meta: Some(OutputRecordMeta {
                            sync_id: Some(stream.sync_id),
                            changes: Vec::new(),
                        }),
                    }),
                    ConnectorMessage::State {
                        mut state,
                    } => {
                        state.destination_record_count = state.source_record_count;
                        output.push(ConnectorMessage::State {
                            state,
                        });
                    }
                    _ => {}
                }
            }
            destination.tables.lock().unwrap().entry(namespace).or_default().extend(persisted);
            Ok(ConnectorRun {
                exit_code: Some(0),
                messages: output,
                ..ConnectorRun::default()
            })
        })
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.tables.lock().unwrap().keys().cloned().collect()
    }
}

/// Dumper reading the in-memory destination.
pub struct MemoryDumper {
    pub destination: Arc<MemoryDestination>,
    pub calls: AtomicUsize,
}

impl DestinationDataDumper for MemoryDumper {
    fn dump(&self, context: &SessionContext) -> Result<Vec<OutputRecord>, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .destination
            .tables
            .lock()
            .unwrap()
            .get(&context.namespace)
            .cloned()
            .unwrap_or_default())
    }
}

/// Cleaner counting invocations; optionally failing.
pub struct CountingCleaner {
    pub destination: Arc<MemoryDestination>,
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl CountingCleaner {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DestinationCleaner for CountingCleaner {
    fn clean(&self, context: &SessionContext) -> Result<(), CleanerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CleanerError::Failed("namespace is locked".to_string()));
        }
        self.destination.tables.lock().unwrap().remove(&context.namespace);
        Ok(())
    }
}

/// Cleaner that counts invocations and then panics.
#[derive(Default)]
pub struct PanickingCleaner {
    pub calls: AtomicUsize,
}

impl DestinationCleaner for PanickingCleaner {
    fn clean(&self, _context: &SessionContext) -> Result<(), CleanerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        panic!("cleaner exploded");
    }
}

/// Mapper dropping the destination load timestamp.
pub struct DropLoadedAt;

impl ExpectedRecordMapper for DropLoadedAt {
    fn map(&self, record: &OutputRecord) -> Result<OutputRecord, VerificationError> {
        let mut mapped = record.clone();
        mapped.loaded_at_ms = None;
        Ok(mapped)
    }
}

/// Mapper dropping the load timestamp and counting invocations.
#[derive(Default)]
pub struct CountingMapper {
    pub calls: AtomicUsize,
}

impl ExpectedRecordMapper for CountingMapper {
    fn map(&self, record: &OutputRecord) -> Result<OutputRecord, VerificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DropLoadedAt.map(record)
    }
}

/// Mapper rejecting every record.
pub struct RejectingMapper;

impl ExpectedRecordMapper for RejectingMapper {
    fn map(&self, _record: &OutputRecord) -> Result<OutputRecord, VerificationError> {
        Err(VerificationError::Map("unsupported column type".to_string()))
    }
}
