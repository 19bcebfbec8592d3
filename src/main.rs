use std::path::PathBuf;

use persona::config::Configuration;

const CONFIG_PATH: &str = "CONFIG_PATH";

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "cannot listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    persona::telemetry::setup_logging();

    // read configuration file. let it in memory.
    let mut config = Configuration::default();
    if let Ok(path) = std::env::var(CONFIG_PATH) {
        config = config.path(PathBuf::from(path));
    }
    let config = config.read()?;

    let state = persona::initialize_state(config).await?;
    let address = state.config.address.clone();

    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "server is listening");

    axum::serve(listener, persona::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
