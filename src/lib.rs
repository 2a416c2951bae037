//! Tindex: Torrent Search Index Node
//!
//! Manages one node of a torrent-search cluster, featuring:
//! - Daemon supervision: config materialization, launch, readiness
//!   detection from process output, stderr relayed as error events
//! - Cluster client with periodic topology discovery
//! - Index rebuilds via the JDBC import connector ("river")
//! - Plain and seeder-boosted search request builders

pub mod cluster;
pub mod config;
pub mod node;
pub mod query;
pub mod reindex;

pub use config::RuntimeConfig;
