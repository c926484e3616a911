//! Service settings.
//!
//! Deserialized from `config/engine.yaml`; every field has a default so a
//! partial file (or no file) still yields usable settings.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_policy_dir() -> PathBuf {
    PathBuf::from("config/policies")
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_organization() -> String {
    "default".to_string()
}

fn default_true() -> bool {
    true
}

/// Settings for the HTTP service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Address the server listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Directory of policy YAML files loaded at startup.
    #[serde(default = "default_policy_dir")]
    pub policy_dir: PathBuf,
    /// Currency assumed when a request does not name one.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Organization policies are seeded for.
    #[serde(default = "default_organization")]
    pub default_organization: String,
    /// Whether to seed the built-in jurisdiction templates at startup.
    #[serde(default = "default_true")]
    pub seed_templates: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            policy_dir: default_policy_dir(),
            default_currency: default_currency(),
            default_organization: default_organization(),
            seed_templates: true,
        }
    }
}

impl Settings {
    /// Reads settings from a YAML file.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use overtime_engine::config::Settings;
    ///
    /// let settings = Settings::load("./config/engine.yaml")?;
    /// println!("Listening on {}", settings.bind_address);
    /// # Ok::<(), overtime_engine::error::EngineError>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        Self::parse(&path_str, &content)
    }

    /// Like [`load`](Self::load) but falls back to defaults when the file is missing.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        match Self::load(path) {
            Err(EngineError::ConfigNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Parses settings from YAML text.
    pub fn parse(source: &str, content: &str) -> EngineResult<Self> {
        serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
            path: source.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_shipped_settings() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/engine.yaml");
        let settings = Settings::load(path).unwrap();
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
        assert_eq!(settings.policy_dir, PathBuf::from("config/policies"));
        assert!(settings.seed_templates);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings = Settings::parse("inline", "default_currency: GBP\n").unwrap();
        assert_eq!(settings.default_currency, "GBP");
        assert_eq!(settings.bind_address, "0.0.0.0:3000");
        assert_eq!(settings.default_organization, "default");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = Settings::parse("inline", "bind_adress: 127.0.0.1:80\n");
        assert!(matches!(result, Err(EngineError::ConfigParseError { .. })));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/nonexistent/engine.yaml").unwrap();
        assert_eq!(settings, Settings::default());
        assert!(matches!(
            Settings::load("/nonexistent/engine.yaml"),
            Err(EngineError::ConfigNotFound { .. })
        ));
    }
}
