//! overtime-engine HTTP server.
//!
//! Loads settings and jurisdiction policies, then serves the JSON API.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use overtime_engine::api::{AppState, create_router};
use overtime_engine::config::{PolicyLoader, Settings};
use overtime_engine::error::EngineError;
use overtime_engine::observability::TracingObserver;
use overtime_engine::repository::InMemoryStore;
use overtime_engine::service::OvertimeService;

/// Overtime calculation and compliance server
#[derive(Parser, Debug)]
#[command(name = "overtime-engine")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, default_value = "config/engine.yaml", env = "OVERTIME_CONFIG")]
    config: PathBuf,

    /// Address to listen on (overrides the settings file)
    #[arg(long, env = "OVERTIME_BIND")]
    bind: Option<String>,

    /// Directory of policy YAML files (overrides the settings file)
    #[arg(long)]
    policy_dir: Option<PathBuf>,

    /// Skip seeding the built-in jurisdiction templates
    #[arg(long)]
    no_seed: bool,
}

impl Cli {
    fn settings(&self) -> Result<Settings, EngineError> {
        let mut settings = Settings::load_or_default(&self.config)?;
        if let Some(bind) = &self.bind {
            settings.bind_address = bind.clone();
        }
        if let Some(dir) = &self.policy_dir {
            settings.policy_dir = dir.clone();
        }
        if self.no_seed {
            settings.seed_templates = false;
        }
        Ok(settings)
    }
}

fn load_policies(service: &OvertimeService, settings: &Settings) -> Result<(), EngineError> {
    if settings.seed_templates {
        let seeded = service.seed_default_policies(&settings.default_organization, None)?;
        info!(
            organization_id = %settings.default_organization,
            policies = seeded.len(),
            "Seeded jurisdiction templates"
        );
    }

    match PolicyLoader::load_dir(&settings.policy_dir) {
        Ok(loader) => {
            let source = loader.source().display().to_string();
            let count = service.load_policies(loader.into_policies())?;
            info!(source = %source, policies = count, "Loaded policy directory");
        }
        Err(EngineError::ConfigNotFound { path }) => {
            warn!(path = %path, "Policy directory not found; using seeded templates only");
        }
        Err(err) => return Err(err),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = cli.settings()?;
    let service = OvertimeService::new(Arc::new(InMemoryStore::new()), Arc::new(TracingObserver));
    load_policies(&service, &settings)?;

    let bind_address = settings.bind_address.clone();
    let router = create_router(AppState::new(service, settings));
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Starting overtime engine server");

    axum::serve(listener, router).await?;
    Ok(())
}
