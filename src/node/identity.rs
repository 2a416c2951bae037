//! Node identity: cluster name, generated node name, readiness marker.

use chrono::Utc;
use rand::Rng;

/// Cluster every supervised node joins.
pub const CLUSTER_NAME: &str = "tindex";

/// Identity of one supervised daemon node.
///
/// The node name is generated once per supervisor construction from the
/// current time and a random factor. Uniqueness is probabilistic, not
/// guaranteed; all derived fields are immutable afterwards.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    node_name: String,
    readiness_marker: String,
}

impl NodeIdentity {
    /// Generate a fresh identity for this process start.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let salt: u16 = rand::thread_rng().gen();
        Self::from_name(format!("{}-{:x}-{:x}", CLUSTER_NAME, millis, salt))
    }

    /// Build an identity from a fixed node name.
    ///
    /// Tests use this to make the readiness marker predictable.
    pub fn from_name(node_name: impl Into<String>) -> Self {
        let node_name = node_name.into();
        let readiness_marker = format!("[{}] started", node_name);
        Self {
            node_name,
            readiness_marker,
        }
    }

    pub fn cluster_name(&self) -> &'static str {
        CLUSTER_NAME
    }

    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Literal substring the daemon prints once it has finished booting.
    pub fn readiness_marker(&self) -> &str {
        &self.readiness_marker
    }
}
