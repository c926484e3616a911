//! Application state for the overtime engine API.

use std::sync::Arc;

use crate::config::Settings;
use crate::service::OvertimeService;

/// Shared application state.
///
/// Holds the service every handler delegates to and the settings it was
/// started with.
#[derive(Clone, Debug)]
pub struct AppState {
    service: OvertimeService,
    settings: Arc<Settings>,
}

impl AppState {
    /// Creates the state from a wired service.
    pub fn new(service: OvertimeService, settings: Settings) -> Self {
        Self {
            service,
            settings: Arc::new(settings),
        }
    }

    /// The overtime service.
    pub fn service(&self) -> &OvertimeService {
        &self.service
    }

    /// The settings the server was started with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
