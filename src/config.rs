//! Server configuration, loaded from a JSON file.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{GraphError, Result};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    6767
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ReplicationConfig {
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        ReplicationConfig { hosts: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub replication: ReplicationConfig,
    /// Consumed only by the tracing-subscriber env-filter setup; has no
    /// effect on graph semantics.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| GraphError::Config(format!("reading {}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| GraphError::Config(format!("parsing {}: {e}", path.display())))?;
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(f, r#"{{"database": "log.jsonl"}}"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 6767);
        assert!(config.replication.hosts.is_empty());
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn loads_full_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut f = fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"host": "0.0.0.0", "port": 7000, "database": "log.jsonl",
                "replication": {{"hosts": ["10.0.0.2:6767"]}}, "log_level": "debug"}}"#
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:7000");
        assert_eq!(config.replication.hosts, vec!["10.0.0.2:6767".to_string()]);
        assert_eq!(config.log_level, "debug");
    }
}
