//! Node Module
//!
//! Lifecycle of one supervised search-engine daemon: identity generation,
//! config materialization, process supervision with readiness detection,
//! and remote shutdown.

pub mod identity;
pub mod materializer;
pub mod readiness;
pub mod supervisor;

pub use identity::{NodeIdentity, CLUSTER_NAME};
pub use materializer::MaterializeError;
pub use readiness::{MarkerDetector, ReadinessDetector};
pub use supervisor::{NodeState, NodeSupervisor, SupervisorError};
