// crates/certify-process/src/connector.rs
// ============================================================================
// Module: Process Connector
// Description: Subprocess implementation of the destination connector boundary.
// Purpose: Run connector operations as child processes with hard timeouts.
// Dependencies: certify-core, certify-config, tokio, tempfile, serde_json
// ============================================================================

//! ## Overview
//! Each operation runs as `<program> <args..> <operation> <flags..>`:
//! - `spec`
//! - `check --config <file>`
//! - `write --config <file> --catalog <file>`
//!
//! Config and catalog are written to a private temporary directory. The
//! deployment mode is exported as `DEPLOYMENT_MODE`. For `write`, input
//! messages are written to stdin one per line and stdin is closed afterwards,
//! which is how the connector learns the stream is finished. Stdout and
//! stderr are drained concurrently. A run that exceeds its timeout is killed
//! and reported as [`ConnectorError::Timeout`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use certify_config::HarnessConfig;
use certify_core::ConfigDocument;
use certify_core::ConfiguredCatalog;
use certify_core::ConnectorError;
use certify_core::ConnectorMessage;
use certify_core::ConnectorRun;
use certify_core::DeploymentMode;
use certify_core::DestinationConnector;
use certify_core::SpecMessage;
use certify_core::interfaces::capture_tail;
use certify_core::interfaces::noise_tail;
use tempfile::TempDir;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Config file name inside the run directory.
const CONFIG_FILE_NAME: &str = "config.json";
/// Catalog file name inside the run directory.
const CATALOG_FILE_NAME: &str = "catalog.json";
/// Grace period for draining pipes after the child has been killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// SECTION: Connector
// ============================================================================

/// Connector driven as a child process.
#[derive(Debug, Clone)]
pub struct ProcessConnector {
    /// Launch settings and timeouts.
    config: HarnessConfig,
}

impl ProcessConnector {
    /// Creates a connector from harness configuration.
    #[must_use]
    pub const fn new(config: HarnessConfig) -> Self {
        Self {
            config,
        }
    }

    /// Returns the launch configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs `spec` and returns the specification for the mode.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError`] when the process fails or emits no spec.
    pub async fn spec(&self, mode: DeploymentMode) -> Result<SpecMessage, ConnectorError> {
        let run = self.run("spec", Vec::new(), mode, None, self.config.timeouts.check()).await?;
        if !run.exited_cleanly() {
            return Err(ConnectorError::crashed("spec", &run));
        }
        run.messages
            .into_iter()
            .find_map(|message| match message {
                ConnectorMessage::Spec {
                    spec,
                } => Some(spec),
                _ => None,
            })
            .ok_or_else(|| ConnectorError::Io {
                operation: "spec".to_string(),
                message: "connector emitted no SPEC message".to_string(),
            })
    }

    /// Launches one operation and collects everything it produced.
    async fn run(
        &self,
        operation: &str,
        flags: Vec<OsString>,
        mode: DeploymentMode,
        input: Option<Vec<u8>>,
        limit: Duration,
    ) -> Result<ConnectorRun, ConnectorError> {
        let connector = &self.config.connector;
        let mut command = Command::new(&connector.program);
        command
            .args(&connector.args)
            .arg(operation)
            .args(flags)
            .envs(&connector.env)
            .env(DeploymentMode::ENV_VAR, mode.as_str())
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|err| ConnectorError::Spawn {
            program: connector.program.clone(),
            message: err.to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| io_error(operation, "missing child stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| io_error(operation, "missing child stderr"))?;
        let stdout_task = tokio::spawn(drain(stdout));
        let stderr_task = tokio::spawn(drain(stderr));
        let stdin = child.stdin.take();

        let finished = timeout(limit, async {
            feed(stdin, input).await?;
            child.wait().await
        })
        .await;

        let status = match finished {
            Ok(Ok(status)) => status,
            Ok(Err(err)) => {
                let _ = child.kill().await;
                return Err(io_error(operation, &err.to_string()));
            }
            Err(_) => {
                let _ = child.kill().await;
                let stderr = collect(stderr_task).await.unwrap_or_default();
                let stdout = collect(stdout_task).await.unwrap_or_default();
                let (_, noise) = split_stdout(&stdout);
                return Err(ConnectorError::Timeout {
                    operation: operation.to_string(),
                    elapsed_ms: limit.as_millis(),
                    stderr: capture_tail(&stderr).to_string(),
                    stdout_noise: noise_tail(&noise),
                });
            }
        };

        let stdout = collect(stdout_task).await.map_err(|err| io_error(operation, &err))?;
        let stderr = collect(stderr_task).await.map_err(|err| io_error(operation, &err))?;
        let (messages, stdout_noise) = split_stdout(&stdout);
        Ok(ConnectorRun {
            exit_code: status.code(),
            messages,
            stdout_noise,
            stderr,
        })
    }
}

#[async_trait]
impl DestinationConnector for ProcessConnector {
    fn describe(&self) -> String {
        self.config.connector_identity().to_string()
    }

    async fn check(
        &self,
        config: &ConfigDocument,
        mode: DeploymentMode,
    ) -> Result<ConnectorRun, ConnectorError> {
        let workdir = run_dir("check")?;
        let config_path = write_file(workdir.path(), CONFIG_FILE_NAME, config.contents(), "check")?;
        let flags = vec![OsString::from("--config"), config_path];
        self.run("check", flags, mode, None, self.config.timeouts.check()).await
    }

    async fn write(
        &self,
        config: &ConfigDocument,
        catalog: &ConfiguredCatalog,
        mode: DeploymentMode,
        input: Vec<ConnectorMessage>,
    ) -> Result<ConnectorRun, ConnectorError> {
        let workdir = run_dir("write")?;
        let config_path = write_file(workdir.path(), CONFIG_FILE_NAME, config.contents(), "write")?;
        let catalog_json =
            serde_json::to_string(catalog).map_err(|err| io_error("write", &err.to_string()))?;
        let catalog_path = write_file(workdir.path(), CATALOG_FILE_NAME, &catalog_json, "write")?;
        let mut payload = String::new();
        for message in &input {
            let line = message.to_line().map_err(|err| io_error("write", &err.to_string()))?;
            payload.push_str(&line);
            payload.push('\n');
        }
        let flags = vec![
            OsString::from("--config"),
            config_path,
            OsString::from("--catalog"),
            catalog_path,
        ];
        self.run("write", flags, mode, Some(payload.into_bytes()), self.config.timeouts.write())
            .await
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds an I/O plumbing error.
fn io_error(operation: &str, message: &str) -> ConnectorError {
    ConnectorError::Io {
        operation: operation.to_string(),
        message: message.to_string(),
    }
}

/// Creates the private directory holding config and catalog files.
fn run_dir(operation: &str) -> Result<TempDir, ConnectorError> {
    tempfile::Builder::new()
        .prefix("certify-")
        .tempdir()
        .map_err(|err| io_error(operation, &err.to_string()))
}

/// Writes one input file and returns its path as an argument.
fn write_file(
    dir: &Path,
    name: &str,
    contents: &str,
    operation: &str,
) -> Result<OsString, ConnectorError> {
    let path = dir.join(name);
    std::fs::write(&path, contents).map_err(|err| io_error(operation, &err.to_string()))?;
    Ok(path.into_os_string())
}

/// Writes the input payload and closes stdin. A connector that exits without
/// reading all input is judged by its exit status, not by the broken pipe.
async fn feed(stdin: Option<ChildStdin>, input: Option<Vec<u8>>) -> io::Result<()> {
    let (Some(mut stdin), Some(bytes)) = (stdin, input) else {
        return Ok(());
    };
    let written = async {
        stdin.write_all(&bytes).await?;
        stdin.shutdown().await
    }
    .await;
    drop(stdin);
    match written {
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Reads a pipe to its end.
fn drain<R>(mut reader: R) -> impl Future<Output = io::Result<String>> + Send + 'static
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async move {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Awaits a drain task with a grace period.
async fn collect(task: JoinHandle<io::Result<String>>) -> Result<String, String> {
    match timeout(DRAIN_GRACE, task).await {
        Ok(Ok(Ok(text))) => Ok(text),
        Ok(Ok(Err(err))) => Err(format!("pipe read failed: {err}")),
        Ok(Err(err)) => Err(format!("pipe reader failed: {err}")),
        Err(_) => Err("pipe did not close after the connector exited".to_string()),
    }
}

/// Splits stdout into protocol messages and non-protocol lines; blank lines are dropped.
fn split_stdout(stdout: &str) -> (Vec<ConnectorMessage>, Vec<String>) {
    let mut messages = Vec::new();
    let mut noise = Vec::new();
    for line in stdout.lines().filter(|line| !line.trim().is_empty()) {
        match ConnectorMessage::parse_line(line) {
            Some(message) => messages.push(message),
            None => noise.push(line.to_string()),
        }
    }
    (messages, noise)
}
