//! Reindex orchestrator: ensure the index is absent, recreate the connector.

use std::time::Duration;

use tracing::{debug, info};

use crate::cluster::{ClusterError, ClusterOps};
use crate::config::SourceConfig;

use super::definitions::{connector_definition, CONNECTOR_NAME, INDEX_NAME};

/// Settle time between tearing down the old connector and submitting the
/// new one. Recreating immediately after deletion is rejected while the
/// remote side is still dismantling the prior connector's internal state.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Short-lived state machine driving one index rebuild.
///
/// Steps run strictly in sequence; the first error aborts the rest and is
/// reported to the caller unchanged. There is no rollback on partial
/// failure: re-running `setup_index` converges to the same end state, so a
/// second invocation is the recovery path.
pub struct ReindexOrchestrator<'a> {
    cluster: &'a dyn ClusterOps,
    source: SourceConfig,
    settle_delay: Duration,
}

impl<'a> ReindexOrchestrator<'a> {
    pub fn new(cluster: &'a dyn ClusterOps, source: SourceConfig) -> Self {
        Self {
            cluster,
            source,
            settle_delay: SETTLE_DELAY,
        }
    }

    /// Override the settle delay. Tests use this to avoid real sleeps.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Ensure the target index is absent, then recreate the import
    /// connector so the relational source streams back in.
    pub async fn setup_index(&self) -> Result<(), ClusterError> {
        if self.cluster.index_exists(INDEX_NAME).await? {
            info!(index = INDEX_NAME, "deleting existing index");
            self.cluster.delete_index(INDEX_NAME).await?;
        } else {
            debug!(index = INDEX_NAME, "index absent, skipping deletion");
        }

        self.recreate_connector().await
    }

    /// Delete the previous connector (idempotent: errors for an absent
    /// connector count as success), wait out the teardown race, submit the
    /// fresh definition. Single attempt; no backoff.
    async fn recreate_connector(&self) -> Result<(), ClusterError> {
        if let Err(e) = self.cluster.delete_connector(CONNECTOR_NAME).await {
            debug!(connector = CONNECTOR_NAME, error = %e, "connector delete skipped");
        }

        tokio::time::sleep(self.settle_delay).await;

        let definition = connector_definition(&self.source);
        self.cluster.put_connector(CONNECTOR_NAME, &definition).await?;
        info!(connector = CONNECTOR_NAME, "import connector created");
        Ok(())
    }
}
