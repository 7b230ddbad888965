//! Leakscan application entry point.

pub mod state;

use leakscan_core::AppConfig;
use state::AppState;
use tracing::info;

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,leakscan=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Load configuration, prepare storage and scan until interrupted.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting Leakscan v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env()?;
    let state = AppState::open(config).await?;
    state.import_configured_rules().await?;
    let scheduler = state.scheduler()?;

    tokio::select! {
        () = scheduler.run() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
