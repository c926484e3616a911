//! Policy directory loading.
//!
//! This module provides the [`PolicyLoader`] type for loading jurisdiction
//! policies from a directory of YAML files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};
use crate::models::Policy;
use crate::policy::templates::parse_policy;

/// Loads and validates every policy in a directory.
///
/// # Directory Structure
///
/// ```text
/// config/policies/
/// ├── us_federal.yaml
/// ├── us_california.yaml
/// ├── uk_nhs.yaml
/// └── ...
/// ```
///
/// Files are read in name order; anything without a `.yaml` extension is
/// skipped.
///
/// # Example
///
/// ```no_run
/// use overtime_engine::config::PolicyLoader;
///
/// let loader = PolicyLoader::load_dir("./config/policies")?;
/// for policy in loader.policies() {
///     println!("{} v{} ({})", policy.name, policy.version, policy.country);
/// }
/// # Ok::<(), overtime_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PolicyLoader {
    source: PathBuf,
    policies: Vec<Policy>,
}

impl PolicyLoader {
    /// Loads every `*.yaml` policy in `path`.
    ///
    /// # Returns
    ///
    /// Returns the loader on success, or an error if:
    /// - The directory does not exist (`ConfigNotFound`)
    /// - A file contains invalid YAML or an unknown field (`ConfigParseError`)
    /// - A policy fails validation (`InvalidPolicy`)
    pub fn load_dir<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();
        let dir = path.display().to_string();

        if !path.is_dir() {
            return Err(EngineError::ConfigNotFound { path: dir });
        }

        let entries = fs::read_dir(path).map_err(|_| EngineError::ConfigNotFound {
            path: dir.clone(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|_| EngineError::ConfigNotFound { path: dir.clone() })?;
            let file = entry.path();
            if file.extension().is_some_and(|ext| ext == "yaml") {
                files.push(file);
            }
        }
        files.sort();

        let policies = files
            .iter()
            .map(|file| Self::load_policy(file))
            .collect::<EngineResult<Vec<_>>>()?;

        Ok(Self {
            source: path.to_path_buf(),
            policies,
        })
    }

    /// Loads and validates a single policy file.
    pub fn load_policy(path: &Path) -> EngineResult<Policy> {
        let path_str = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;
        parse_policy(&path_str, &content)
    }

    /// Directory the policies came from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Loaded policies, in file name order.
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Returns the policy with `name`, if loaded.
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.iter().find(|p| p.name == name)
    }

    /// Consumes the loader.
    pub fn into_policies(self) -> Vec<Policy> {
        self.policies
    }
}
