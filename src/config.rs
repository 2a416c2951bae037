//! Configuration for tindex

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the tindex node
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    /// Search-engine daemon configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Relational source the import connector pulls from
    #[serde(default)]
    pub source: SourceConfig,
}

/// Search-engine daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Daemon installation root; `bin/` and `config/` live beneath it
    pub install_root: PathBuf,
    /// Remote API host. Also used as the daemon's bind/publish host.
    pub host: String,
    /// Remote API port
    pub port: u16,
    /// Whether this node is master-eligible
    pub master: bool,
    /// Fallback runtime home used when the JAVA_HOME environment variable
    /// is absent
    pub java_home: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("/opt/elasticsearch"),
            host: "localhost".to_string(),
            port: 9200,
            master: true,
            java_home: None,
        }
    }
}

/// Relational source connection parameters.
///
/// Passed through opaquely inside the import-connector definition; tindex
/// never connects to the source itself.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourceConfig {
    /// JDBC-style connection URL
    pub url: String,
    /// Source username
    pub user: String,
    /// Source password
    pub password: String,
}

impl RuntimeConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: RuntimeConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration fields.
    ///
    /// Collects all validation errors and reports them together so the user
    /// can fix everything in one pass.
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.engine.install_root.as_os_str().is_empty() {
            errors.push("engine install_root must not be empty".to_string());
        }
        if self.engine.host.is_empty() {
            errors.push("engine host must not be empty".to_string());
        }
        if self.engine.port == 0 {
            errors.push("engine port must be between 1 and 65535".to_string());
        }
        if self.source.url.is_empty() {
            errors.push("source url must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> RuntimeConfig {
        let mut config = RuntimeConfig::default();
        config.source.url = "jdbc:mysql://localhost:3306/torrents".to_string();
        config
    }

    #[test]
    fn defaults_target_local_engine() {
        let config = RuntimeConfig::default();
        assert_eq!(config.engine.host, "localhost");
        assert_eq!(config.engine.port, 9200);
        assert!(config.engine.master);
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_collects_all_errors() {
        let mut config = RuntimeConfig::default();
        config.engine.host = String::new();
        config.engine.port = 0;
        // source.url is empty by default

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("host"), "missing host error in: {}", err);
        assert!(err.contains("port"), "missing port error in: {}", err);
        assert!(err.contains("source url"), "missing url error in: {}", err);
    }

    #[test]
    fn load_parses_toml_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tindex.toml");
        std::fs::write(
            &path,
            r#"
[engine]
install_root = "/srv/elasticsearch"
host = "10.0.0.5"
port = 9201
master = false

[source]
url = "jdbc:mysql://db/torrents"
user = "reader"
password = "secret"
"#,
        )
        .unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.engine.install_root, PathBuf::from("/srv/elasticsearch"));
        assert_eq!(config.engine.host, "10.0.0.5");
        assert_eq!(config.engine.port, 9201);
        assert!(!config.engine.master);
        assert_eq!(config.source.user, "reader");
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tindex.toml");
        std::fs::write(&path, "[engine\nhost=").unwrap();
        assert!(RuntimeConfig::load(&path).is_err());
    }
}
