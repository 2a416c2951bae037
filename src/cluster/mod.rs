//! Cluster Module
//!
//! Thin handle to the search daemon's remote HTTP API. The supervisor
//! constructs the client once readiness is observed; the reindex
//! orchestrator and search commands borrow it afterwards.

pub mod client;

pub use client::ClusterClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::query::SearchRequest;

/// Errors that can occur when talking to the cluster
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("Invalid response body from {url}: {source}")]
    Body {
        url: String,
        source: reqwest::Error,
    },
}

/// Remote operations the orchestrator and queries depend on.
///
/// Kept object-safe so tests can substitute a deterministic cluster for the
/// HTTP-backed one.
#[async_trait]
pub trait ClusterOps: Send + Sync {
    /// Whether the named index currently exists.
    async fn index_exists(&self, index: &str) -> Result<bool, ClusterError>;

    /// Delete the named index.
    async fn delete_index(&self, index: &str) -> Result<(), ClusterError>;

    /// Delete the named import connector. The remote side rejects deletes
    /// of absent connectors; callers decide whether that matters.
    async fn delete_connector(&self, name: &str) -> Result<(), ClusterError>;

    /// Submit a fresh import-connector definition.
    async fn put_connector(&self, name: &str, definition: &Value) -> Result<(), ClusterError>;

    /// Execute a search request and return the raw response body.
    async fn search(&self, request: &SearchRequest) -> Result<Value, ClusterError>;

    /// Ask the daemon to shut itself down.
    async fn shutdown_node(&self) -> Result<Value, ClusterError>;
}
