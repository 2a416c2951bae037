//! HTTP-backed cluster client with periodic topology discovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::query::SearchRequest;

use super::{ClusterError, ClusterOps};

/// Interval between cluster topology refreshes.
const TOPOLOGY_REFRESH: Duration = Duration::from_secs(60);

/// Per-request timeout against the remote API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout against the remote API.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Well-known path of the import-connector API.
const CONNECTOR_ROOT: &str = "/_river";

/// Client for one node's remote API.
///
/// Requests go to the configured address; topology discovery keeps a view
/// of the cluster's other nodes, refreshed in the background for the
/// lifetime of the client.
pub struct ClusterClient {
    http: reqwest::Client,
    base_url: String,
    nodes: Arc<RwLock<Vec<String>>>,
    refresh_task: JoinHandle<()>,
}

impl ClusterClient {
    /// Connect to the daemon's remote API at `host:port`.
    ///
    /// Performs an initial topology discovery (best-effort; an unreachable
    /// cluster is logged, not fatal) and spawns the periodic refresh task.
    pub async fn connect(host: &str, port: u16) -> Result<Self, ClusterError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ClusterError::Client)?;

        let base_url = format!("http://{}:{}", host, port);
        let nodes = Arc::new(RwLock::new(Vec::new()));

        match discover(&http, &base_url).await {
            Ok(discovered) => {
                debug!(count = discovered.len(), "cluster topology discovered");
                *nodes.write() = discovered;
            }
            Err(e) => warn!(error = %e, "initial topology discovery failed"),
        }

        let refresh_task = {
            let http = http.clone();
            let base_url = base_url.clone();
            let nodes = nodes.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(TOPOLOGY_REFRESH);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                // The first tick fires immediately; discovery already ran.
                interval.tick().await;
                loop {
                    interval.tick().await;
                    match discover(&http, &base_url).await {
                        Ok(discovered) => *nodes.write() = discovered,
                        Err(e) => debug!(error = %e, "topology refresh failed"),
                    }
                }
            })
        };

        Ok(Self {
            http,
            base_url,
            nodes,
            refresh_task,
        })
    }

    /// Addresses of the cluster nodes seen at the last discovery.
    pub fn known_nodes(&self) -> Vec<String> {
        self.nodes.read().clone()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and require a 2xx response.
    async fn expect_success(
        &self,
        request: reqwest::RequestBuilder,
        url: String,
    ) -> Result<reqwest::Response, ClusterError> {
        let response = request.send().await.map_err(|e| ClusterError::Transport {
            url: url.clone(),
            source: e,
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClusterError::Status { url, status, body })
    }

    async fn json_body(
        &self,
        response: reqwest::Response,
        url: String,
    ) -> Result<Value, ClusterError> {
        response
            .json()
            .await
            .map_err(|e| ClusterError::Body { url, source: e })
    }
}

impl Drop for ClusterClient {
    fn drop(&mut self) {
        self.refresh_task.abort();
    }
}

/// Fetch the cluster's node listing and extract remote addresses.
async fn discover(http: &reqwest::Client, base_url: &str) -> Result<Vec<String>, ClusterError> {
    let url = format!("{}/_nodes", base_url);
    let response = http
        .get(&url)
        .send()
        .await
        .map_err(|e| ClusterError::Transport {
            url: url.clone(),
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClusterError::Status { url, status, body });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| ClusterError::Body { url, source: e })?;

    let addresses = body
        .get("nodes")
        .and_then(Value::as_object)
        .map(|nodes| {
            nodes
                .values()
                .filter_map(|node| node.get("http_address").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(addresses)
}

#[async_trait]
impl ClusterOps for ClusterClient {
    async fn index_exists(&self, index: &str) -> Result<bool, ClusterError> {
        let url = self.url(&format!("/{}", index));
        let response = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| ClusterError::Transport {
                url: url.clone(),
                source: e,
            })?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ClusterError::Status { url, status, body })
            }
        }
    }

    async fn delete_index(&self, index: &str) -> Result<(), ClusterError> {
        let url = self.url(&format!("/{}", index));
        self.expect_success(self.http.delete(&url), url).await?;
        Ok(())
    }

    async fn delete_connector(&self, name: &str) -> Result<(), ClusterError> {
        let url = self.url(&format!("{}/{}", CONNECTOR_ROOT, name));
        self.expect_success(self.http.delete(&url), url).await?;
        Ok(())
    }

    async fn put_connector(&self, name: &str, definition: &Value) -> Result<(), ClusterError> {
        let url = self.url(&format!("{}/{}/_meta", CONNECTOR_ROOT, name));
        self.expect_success(self.http.put(&url).json(definition), url)
            .await?;
        Ok(())
    }

    async fn search(&self, request: &SearchRequest) -> Result<Value, ClusterError> {
        let url = self.url(&format!(
            "/{}/{}/_search",
            request.index, request.doc_type
        ));
        let response = self
            .expect_success(self.http.post(&url).json(&request.body), url.clone())
            .await?;
        self.json_body(response, url).await
    }

    async fn shutdown_node(&self) -> Result<Value, ClusterError> {
        let url = self.url("/_cluster/nodes/_local/_shutdown");
        let response = self
            .expect_success(self.http.post(&url), url.clone())
            .await?;
        self.json_body(response, url).await
    }
}
