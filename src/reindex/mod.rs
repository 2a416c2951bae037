//! Index rebuild orchestration
//!
//! Rebuilds the torrent index by deleting it and recreating the import
//! connector that streams rows from the relational source back in.

pub mod definitions;
pub mod orchestrator;

pub use definitions::{
    connector_definition, torrent_mapping, CONNECTOR_NAME, DOC_TYPE, INDEX_NAME, SOURCE_QUERY,
};
pub use orchestrator::ReindexOrchestrator;
