/*!
 * Configuration for a podstore pod
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PodstoreError, Result};

/// Configuration of one pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodConfig {
    /// Name of this pod within the federation
    pub pod_id: String,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Prefix of the locations handed out for managed attachments
    #[serde(default = "default_attachment_url_base")]
    pub attachment_url_base: String,

    /// Other pods and the addresses their conduit endpoints listen on
    #[serde(default)]
    pub peers: BTreeMap<String, String>,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            pod_id: default_pod_id(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
            attachment_url_base: default_attachment_url_base(),
            peers: BTreeMap::new(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

fn default_pod_id() -> String {
    "pod-a".to_string()
}

fn default_attachment_url_base() -> String {
    "/attachments".to_string()
}

impl PodConfig {
    /// Configuration for a pod with the given name and defaults elsewhere
    pub fn for_pod(pod_id: impl Into<String>) -> Self {
        Self {
            pod_id: pod_id.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: PodConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pod_id.trim().is_empty() {
            return Err(PodstoreError::Config("pod_id must not be empty".to_string()));
        }
        if self.peers.contains_key(&self.pod_id) {
            return Err(PodstoreError::Config(format!(
                "pod {} lists itself as a peer",
                self.pod_id
            )));
        }
        if let Some((peer, _)) = self.peers.iter().find(|(_, addr)| addr.trim().is_empty()) {
            return Err(PodstoreError::Config(format!(
                "peer {} has an empty address",
                peer
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = PodConfig::default();
        assert_eq!(config.pod_id, "pod-a");
        assert_eq!(config.log_level, LogLevel::Info);
        assert_eq!(config.attachment_url_base, "/attachments");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: PodConfig = toml::from_str(r#"pod_id = "pod-b""#).unwrap();
        assert_eq!(config.pod_id, "pod-b");
        assert!(!config.verbose);
        assert!(config.peers.is_empty());
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
            pod_id = "pod-b"
            log_level = "debug"
            verbose = true
            attachment_url_base = "https://b.example.com/attachments"

            [peers]
            pod-a = "http://10.0.0.5:8008"
        "#;

        let config: PodConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.verbose);
        assert_eq!(config.peers.get("pod-a").unwrap(), "http://10.0.0.5:8008");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_self_peer() {
        let mut config = PodConfig::for_pod("pod-a");
        config
            .peers
            .insert("pod-a".to_string(), "http://localhost:1".to_string());
        assert!(matches!(config.validate(), Err(PodstoreError::Config(_))));

        let mut config = PodConfig::for_pod("pod-a");
        config.peers.insert("pod-b".to_string(), " ".to_string());
        assert!(config.validate().is_err());

        assert!(PodConfig::for_pod("").validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let mut config = PodConfig::for_pod("pod-c");
        config.log_level = LogLevel::Trace;
        config
            .peers
            .insert("pod-a".to_string(), "http://a:8008".to_string());

        config.to_file(file.path()).unwrap();
        let loaded = PodConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Warn.to_tracing_level(), tracing::Level::WARN);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
