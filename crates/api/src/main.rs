//! Virtual Sensor Service - Main Entry Point

use api::{init_logging, run_server, ApiError, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // Optional config file path as the first argument
    let path = std::env::args().nth(1);
    let config = AppConfig::load(path.as_deref())?;
    init_logging(&config.log)?;

    info!("=== Virtual Sensor Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Owner: {}, model: {}",
        config.server.default_owner, config.classifier.model
    );

    run_server(config).await?;

    Ok(())
}
