//! # vci-api — Binary Entry Point
//!
//! Starts the credential endpoint. Configuration comes from the environment;
//! see [`vci_api::state::AppConfig::from_env`].

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;
use vci_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_tracing(config.json_logs);

    let port = config.port;
    let state = vci_api::bootstrap::bootstrap(config).map_err(|e| {
        tracing::error!("bootstrap failed: {e}");
        e
    })?;
    let app = vci_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("vci-api listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
