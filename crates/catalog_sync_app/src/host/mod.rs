mod app;
mod commands;
mod config;
mod effects;
mod logging;
mod render;

use sync_logging::{sync_info, sync_warn};

/// Loads configuration, initializes logging and runs the console session.
pub fn run_app() -> anyhow::Result<()> {
    let path = config::resolve_path(std::env::args().nth(1));
    let loaded = config::load(&path);
    let settings = match &loaded {
        Ok(Some(file)) => file.clone(),
        Ok(None) | Err(_) => config::SyncConfig::default(),
    };

    logging::initialize(settings.log);
    match loaded {
        Ok(Some(_)) => sync_info!("Loaded configuration from {}", path.display()),
        Ok(None) => sync_info!("No configuration at {}; using defaults", path.display()),
        Err(err) => sync_warn!("Ignoring configuration: {:#}", err),
    }

    app::run(settings)
}
