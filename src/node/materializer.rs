//! Materializes the daemon's persisted configuration before each start.

use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::EngineConfig;

use super::identity::NodeIdentity;

/// Daemon config file, relative to the installation root.
pub const CONFIG_REL_PATH: &str = "config/elasticsearch.yml";

/// Errors that can occur while materializing the daemon config.
///
/// All of these are fatal: the daemon must not be spawned against a config
/// file we could not read, parse, or rewrite.
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("Failed to read daemon config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Daemon config '{path}' is not valid YAML: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Daemon config '{path}' is not a YAML mapping")]
    NotMapping { path: PathBuf },

    #[error("Failed to write daemon config '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize daemon config: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

/// Merge the persisted daemon config with this run's identity and network
/// settings, then write it back.
///
/// The existing file (if any) is the base; exactly the cluster/node/network
/// keys are overwritten at the top level and every unrelated key is
/// preserved. The file is rewritten even when nothing else changed so the
/// fresh node name lands on every start.
pub fn materialize(
    engine: &EngineConfig,
    identity: &NodeIdentity,
) -> Result<PathBuf, MaterializeError> {
    let path = engine.install_root.join(CONFIG_REL_PATH);
    let mut base = load_base(&path)?;

    set(&mut base, "cluster.name", identity.cluster_name());
    set(&mut base, "node.name", identity.node_name());
    base.insert(
        Value::String("node.master".to_string()),
        Value::Bool(engine.master),
    );
    set(&mut base, "network.bind_host", &engine.host);
    // Publish host always equals bind host.
    set(&mut base, "network.publish_host", &engine.host);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MaterializeError::Write {
            path: path.clone(),
            source: e,
        })?;
    }

    let rendered =
        serde_yaml::to_string(&Value::Mapping(base)).map_err(MaterializeError::Serialize)?;
    std::fs::write(&path, rendered).map_err(|e| MaterializeError::Write {
        path: path.clone(),
        source: e,
    })?;

    debug!(path = %path.display(), node = identity.node_name(), "daemon config written");
    Ok(path)
}

/// Load the existing config file as the merge base.
///
/// A missing file means an empty base. A present but unparseable file is a
/// fatal configuration error, never silently discarded.
fn load_base(path: &Path) -> Result<Mapping, MaterializeError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Mapping::new()),
        Err(e) => {
            return Err(MaterializeError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    let value: Value = serde_yaml::from_str(&content).map_err(|e| MaterializeError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        // An empty file parses as null; treat it like a missing file.
        Value::Null => Ok(Mapping::new()),
        _ => Err(MaterializeError::NotMapping {
            path: path.to_path_buf(),
        }),
    }
}

fn set(mapping: &mut Mapping, key: &str, value: &str) {
    mapping.insert(
        Value::String(key.to_string()),
        Value::String(value.to_string()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine_for(root: &Path) -> EngineConfig {
        EngineConfig {
            install_root: root.to_path_buf(),
            host: "localhost".to_string(),
            ..EngineConfig::default()
        }
    }

    fn read_mapping(path: &Path) -> Mapping {
        let content = std::fs::read_to_string(path).unwrap();
        match serde_yaml::from_str(&content).unwrap() {
            Value::Mapping(m) => m,
            other => panic!("expected mapping, got {:?}", other),
        }
    }

    fn get<'a>(mapping: &'a Mapping, key: &str) -> &'a Value {
        mapping.get(key).unwrap()
    }

    #[test]
    fn writes_fresh_config_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let identity = NodeIdentity::from_name("pirate-123");

        let path = materialize(&engine_for(dir.path()), &identity).unwrap();

        let written = read_mapping(&path);
        assert_eq!(get(&written, "cluster.name"), &Value::String("tindex".into()));
        assert_eq!(get(&written, "node.name"), &Value::String("pirate-123".into()));
        assert_eq!(get(&written, "node.master"), &Value::Bool(true));
        assert_eq!(
            get(&written, "network.bind_host"),
            &Value::String("localhost".into())
        );
        assert_eq!(
            get(&written, "network.publish_host"),
            &Value::String("localhost".into())
        );
    }

    #[test]
    fn preserves_unrelated_keys_and_overwrites_managed_ones() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join("elasticsearch.yml"),
            "path.data: /var/data\nnode.name: stale-name\nindex.refresh_interval: 5s\n",
        )
        .unwrap();

        let identity = NodeIdentity::from_name("pirate-456");
        let path = materialize(&engine_for(dir.path()), &identity).unwrap();

        let written = read_mapping(&path);
        assert_eq!(
            get(&written, "path.data"),
            &Value::String("/var/data".into())
        );
        assert_eq!(
            get(&written, "index.refresh_interval"),
            &Value::String("5s".into())
        );
        assert_eq!(
            get(&written, "node.name"),
            &Value::String("pirate-456".into())
        );
    }

    #[test]
    fn rewrites_node_name_on_every_run() {
        let dir = TempDir::new().unwrap();
        let engine = engine_for(dir.path());

        materialize(&engine, &NodeIdentity::from_name("first-run")).unwrap();
        let path = materialize(&engine, &NodeIdentity::from_name("second-run")).unwrap();

        let written = read_mapping(&path);
        assert_eq!(
            get(&written, "node.name"),
            &Value::String("second-run".into())
        );
    }

    #[test]
    fn malformed_existing_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("elasticsearch.yml"), "cluster.name: [unclosed").unwrap();

        let result = materialize(&engine_for(dir.path()), &NodeIdentity::from_name("x"));
        assert!(matches!(result, Err(MaterializeError::Parse { .. })));
    }

    #[test]
    fn non_mapping_config_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("elasticsearch.yml"), "- just\n- a\n- list\n").unwrap();

        let result = materialize(&engine_for(dir.path()), &NodeIdentity::from_name("x"));
        assert!(matches!(result, Err(MaterializeError::NotMapping { .. })));
    }

    #[test]
    fn empty_existing_config_is_treated_as_empty_base() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("config");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("elasticsearch.yml"), "").unwrap();

        let identity = NodeIdentity::from_name("pirate-789");
        let path = materialize(&engine_for(dir.path()), &identity).unwrap();
        let written = read_mapping(&path);
        assert_eq!(
            get(&written, "node.name"),
            &Value::String("pirate-789".into())
        );
    }

    #[test]
    fn master_flag_is_carried_through() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_for(dir.path());
        engine.master = false;

        let path = materialize(&engine, &NodeIdentity::from_name("worker-1")).unwrap();
        let written = read_mapping(&path);
        assert_eq!(get(&written, "node.master"), &Value::Bool(false));
    }
}
