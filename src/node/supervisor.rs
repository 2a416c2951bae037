//! Daemon process supervision: spawn, readiness, error relay, shutdown.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::cluster::{ClusterClient, ClusterError, ClusterOps};
use crate::config::RuntimeConfig;

use super::identity::NodeIdentity;
use super::materializer::{self, MaterializeError};
use super::readiness::{MarkerDetector, ReadinessDetector};

/// Daemon launcher, relative to the installation root.
const DAEMON_REL_PATH: &str = "bin/elasticsearch";

/// Environment variable the daemon needs to locate its runtime.
const JAVA_HOME_VAR: &str = "JAVA_HOME";

/// Capacity of the stderr relay channel. Chunks are dropped for lagging
/// subscribers, never for the daemon.
const ERROR_CHANNEL_CAPACITY: usize = 64;

/// How long shutdown waits for the child to exit after the remote shutdown
/// call succeeds, before killing it.
const EXIT_GRACE: Duration = Duration::from_secs(10);

/// Errors that can occur while supervising the daemon
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Node already started")]
    AlreadyStarted,

    #[error("Cluster client not initialized; start the node first")]
    NotInitialized,

    #[error(transparent)]
    Config(#[from] MaterializeError),

    #[error("No runtime home: set JAVA_HOME or engine java_home")]
    MissingJavaHome,

    #[error("Failed to spawn daemon '{path}': {source}")]
    Spawn {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Daemon exited before signalling readiness")]
    ExitedEarly,

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Lifecycle phases of the supervised node.
///
/// There is no failed terminal state: daemon stderr is a continuous
/// non-fatal signal relayed as error events, and the caller decides how to
/// react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    NotStarted,
    Starting,
    Ready,
    Down,
}

/// Supervises one search-engine daemon process end-to-end.
///
/// Owns the node identity, the child process, and the cluster client, which
/// is constructed only after readiness is observed in the daemon's output.
pub struct NodeSupervisor {
    config: RuntimeConfig,
    identity: NodeIdentity,
    state: NodeState,
    child: Option<Child>,
    client: Option<ClusterClient>,
    detector: Option<Box<dyn ReadinessDetector>>,
    errors_tx: broadcast::Sender<String>,
}

impl NodeSupervisor {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_identity(config, NodeIdentity::generate())
    }

    /// Build a supervisor with a fixed identity. Tests use this to make the
    /// readiness marker predictable.
    pub fn with_identity(config: RuntimeConfig, identity: NodeIdentity) -> Self {
        let (errors_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        Self {
            config,
            identity,
            state: NodeState::NotStarted,
            child: None,
            client: None,
            detector: None,
            errors_tx,
        }
    }

    /// Replace the readiness detection strategy for the next start.
    pub fn with_detector(mut self, detector: Box<dyn ReadinessDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Subscribe to the daemon's stderr stream. Every chunk the daemon
    /// writes is relayed verbatim for the lifetime of the process.
    pub fn subscribe_errors(&self) -> broadcast::Receiver<String> {
        self.errors_tx.subscribe()
    }

    /// The cluster client, available once the node is initialized.
    ///
    /// Fails fast before then so callers never operate on an absent handle.
    pub fn client(&self) -> Result<&ClusterClient, SupervisorError> {
        self.client.as_ref().ok_or(SupervisorError::NotInitialized)
    }

    /// Materialize the daemon config, launch the daemon, and suspend until
    /// it signals readiness, then initialize the cluster client.
    ///
    /// Readiness completes this future at most once regardless of how many
    /// later output chunks also carry the marker; the output streams keep
    /// draining for the lifetime of the process.
    pub async fn start(&mut self) -> Result<(), SupervisorError> {
        if self.state != NodeState::NotStarted {
            return Err(SupervisorError::AlreadyStarted);
        }

        let java_home = resolve_java_home(
            std::env::var(JAVA_HOME_VAR).ok(),
            self.config.engine.java_home.as_deref(),
        )
        .ok_or(SupervisorError::MissingJavaHome)?;

        materializer::materialize(&self.config.engine, &self.identity)?;

        let daemon_path = self.config.engine.install_root.join(DAEMON_REL_PATH);
        info!(
            daemon = %daemon_path.display(),
            node = self.identity.node_name(),
            "launching search daemon"
        );

        let mut child = Command::new(&daemon_path)
            .env(JAVA_HOME_VAR, &java_home)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SupervisorError::Spawn {
                path: daemon_path,
                source: e,
            })?;

        self.state = NodeState::Starting;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        self.child = Some(child);

        let (ready_tx, ready_rx) = oneshot::channel();

        let mut detector = self.detector.take().unwrap_or_else(|| {
            Box::new(MarkerDetector::new(self.identity.readiness_marker()))
        });

        if let Some(stdout) = stdout {
            tokio::spawn(async move {
                let mut ready_tx = Some(ready_tx);
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if detector.observe(&line) {
                        if let Some(tx) = ready_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                }
                debug!("daemon stdout closed");
            });
        }

        if let Some(stderr) = stderr {
            let errors_tx = self.errors_tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    // Pure relay: no dedup, no logging, no state change.
                    let _ = errors_tx.send(line);
                }
            });
        }

        ready_rx
            .await
            .map_err(|_| SupervisorError::ExitedEarly)?;

        self.initialize().await?;
        self.state = NodeState::Ready;
        info!(node = self.identity.node_name(), "node ready");
        Ok(())
    }

    /// Construct the cluster client bound to the configured remote API
    /// address. Idempotent once the client exists.
    pub async fn initialize(&mut self) -> Result<(), SupervisorError> {
        if self.client.is_some() {
            return Ok(());
        }
        let client =
            ClusterClient::connect(&self.config.engine.host, self.config.engine.port).await?;
        self.client = Some(client);
        Ok(())
    }

    /// Shut the node down via the remote API and reap the child process.
    pub async fn shutdown(&mut self) -> Result<(), SupervisorError> {
        let client = self.client.as_ref().ok_or(SupervisorError::NotInitialized)?;
        client.shutdown_node().await?;
        self.state = NodeState::Down;

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!(%status, "daemon exited"),
                Ok(Err(e)) => warn!(error = %e, "failed waiting for daemon exit"),
                Err(_) => {
                    warn!("daemon did not exit after remote shutdown, killing");
                    let _ = child.kill().await;
                }
            }
        }

        info!(node = self.identity.node_name(), "node shut down");
        Ok(())
    }
}

/// Resolve the daemon's runtime home: an explicit environment override wins
/// over the configured fallback.
fn resolve_java_home(env_value: Option<String>, configured: Option<&str>) -> Option<String> {
    env_value
        .filter(|v| !v.is_empty())
        .or_else(|| configured.map(str::to_string))
}
