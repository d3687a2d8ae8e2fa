//! Client configuration.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. A YAML settings file (explicit path, or `~/.qcs/settings.yaml`)
//! 3. Environment variables (`QCS_*`)

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QcsError, QcsResult};

/// Default QCS API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.qcs.rigetti.com";
/// Default local QVM endpoint.
pub const DEFAULT_QVM_URL: &str = "http://127.0.0.1:5000";
/// Default local quilc endpoint.
pub const DEFAULT_QUILC_URL: &str = "http://127.0.0.1:5555";

/// Endpoints, credentials and HTTP behavior.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QcsConfig {
    /// QCS REST API base URL.
    pub api_url: String,
    /// Bearer token for the QCS API and QPU gateway.
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    /// QVM HTTP endpoint.
    pub qvm_url: String,
    /// quilc HTTP endpoint.
    pub quilc_url: String,
    /// Execution gateway for QPU jobs. QPUs are unavailable without it.
    pub qpu_gateway_url: Option<String>,
    /// Per-request timeout.
    pub timeout_sec: u64,
    /// Retries for transient HTTP failures.
    pub max_retries: u32,
    /// Base delay for exponential backoff.
    pub retry_base_delay_ms: u64,
    /// Seed passed to the QVM for reproducible sampling.
    pub qvm_random_seed: Option<u64>,
}

impl Default for QcsConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            access_token: None,
            qvm_url: DEFAULT_QVM_URL.to_string(),
            quilc_url: DEFAULT_QUILC_URL.to_string(),
            qpu_gateway_url: None,
            timeout_sec: 30,
            max_retries: 3,
            retry_base_delay_ms: 500,
            qvm_random_seed: None,
        }
    }
}

impl fmt::Debug for QcsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QcsConfig")
            .field("api_url", &self.api_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("qvm_url", &self.qvm_url)
            .field("quilc_url", &self.quilc_url)
            .field("qpu_gateway_url", &self.qpu_gateway_url)
            .field("timeout_sec", &self.timeout_sec)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay_ms", &self.retry_base_delay_ms)
            .field("qvm_random_seed", &self.qvm_random_seed)
            .finish()
    }
}

impl QcsConfig {
    /// Load configuration from a settings file and the environment.
    pub fn load(path: Option<&Path>) -> QcsResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_settings_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML settings file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> QcsResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML settings. Missing keys take their defaults.
    pub fn from_yaml(content: &str) -> QcsResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("QCS_API_URL") {
            self.api_url = val;
        }
        if let Some(val) = lookup("QCS_ACCESS_TOKEN") {
            self.access_token = Some(val);
        }
        if let Some(val) = lookup("QCS_QVM_URL") {
            self.qvm_url = val;
        }
        if let Some(val) = lookup("QCS_QUILC_URL") {
            self.quilc_url = val;
        }
        if let Some(val) = lookup("QCS_QPU_GATEWAY_URL") {
            self.qpu_gateway_url = Some(val);
        }
        if let Some(timeout) = lookup("QCS_TIMEOUT_SEC").and_then(|v| v.parse().ok()) {
            self.timeout_sec = timeout;
        }
        if let Some(retries) = lookup("QCS_MAX_RETRIES").and_then(|v| v.parse().ok()) {
            self.max_retries = retries;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> QcsResult<()> {
        for (name, url) in [
            ("api_url", &self.api_url),
            ("qvm_url", &self.qvm_url),
            ("quilc_url", &self.quilc_url),
        ] {
            if url.trim().is_empty() {
                return Err(QcsError::Configuration(format!("{name} cannot be empty")));
            }
        }
        if self.qpu_gateway_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(QcsError::Configuration(
                "qpu_gateway_url cannot be empty".into(),
            ));
        }
        if self.timeout_sec == 0 {
            return Err(QcsError::Configuration("timeout_sec cannot be 0".into()));
        }
        Ok(())
    }
}

/// `~/.qcs/settings.yaml`, if a home directory is known.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".qcs").join("settings.yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = QcsConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert!(config.qpu_gateway_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = QcsConfig::from_yaml("qvm_url: http://qvm:5000\nmax_retries: 0\n").unwrap();
        assert_eq!(config.qvm_url, "http://qvm:5000");
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.quilc_url, DEFAULT_QUILC_URL);
    }

    #[test]
    fn test_from_yaml_invalid() {
        let err = QcsConfig::from_yaml("timeout_sec: [1, 2]").unwrap_err();
        assert!(matches!(err, QcsError::Configuration(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("QCS_ACCESS_TOKEN", "secret"),
            ("QCS_QPU_GATEWAY_URL", "https://gateway"),
            ("QCS_TIMEOUT_SEC", "5"),
            ("QCS_MAX_RETRIES", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = QcsConfig::default();
        config.apply_overrides(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.access_token.as_deref(), Some("secret"));
        assert_eq!(config.qpu_gateway_url.as_deref(), Some("https://gateway"));
        assert_eq!(config.timeout_sec, 5);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = QcsConfig {
            access_token: Some("super-secret".into()),
            ..Default::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("[REDACTED]"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = QcsConfig {
            timeout_sec: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
