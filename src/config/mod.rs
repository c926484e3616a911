//! Configuration loading for the overtime engine.
//!
//! This module loads jurisdiction policies from a directory of YAML files
//! and the service settings from `config/engine.yaml`.
//!
//! # Example
//!
//! ```no_run
//! use overtime_engine::config::{PolicyLoader, Settings};
//!
//! let settings = Settings::load("./config/engine.yaml").unwrap();
//! let loader = PolicyLoader::load_dir(&settings.policy_dir).unwrap();
//! println!("Loaded {} policies", loader.policies().len());
//! ```

mod loader;
mod types;

pub use loader::PolicyLoader;
pub use types::Settings;
