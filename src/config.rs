use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::services::DEFAULT_BASE_URL;

pub const ENV_API_URL: &str = "MLNDASH_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "MLNDASH_TIMEOUT_SECS";
pub const ENV_SESSION_FILE: &str = "MLNDASH_SESSION_FILE";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub api: ApiConfig,
    /// Where the CLI keeps the session between invocations
    pub session_file: Option<PathBuf>,
}

impl DashConfig {
    /// Load from `path` (defaults when absent), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: DashConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Apply `MLNDASH_*` overrides looked up through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api.base_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.api.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_TIMEOUT_SECS))?;
        }
        if let Some(file) = lookup(ENV_SESSION_FILE) {
            self.session_file = Some(PathBuf::from(file));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DashConfig::default();
        assert_eq!(config.api.base_url, "http://127.0.0.1:3001/mlndash-test");
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert!(config.session_file.is_none());
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "api:\n  base_url: http://example.test/api\nsession_file: /tmp/mlndash-session.json"
        )
        .unwrap();

        let config = DashConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://example.test/api");
        // missing keys fall back to defaults
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(
            config.session_file,
            Some(PathBuf::from("/tmp/mlndash-session.json"))
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = DashConfig::default()
            .with_overrides(env(&[
                (ENV_API_URL, "http://override.test"),
                (ENV_TIMEOUT_SECS, "5"),
            ]))
            .unwrap();
        assert_eq!(config.api.base_url, "http://override.test");
        assert_eq!(config.api.timeout_secs, 5);

        let err = DashConfig::default()
            .with_overrides(env(&[(ENV_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "api: [not, a, map]").unwrap();
        let err = DashConfig::from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
