use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trading_mate::{api::start_server, config::AppConfig, TradingMate};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("Trading Mate - API Server");
    info!("Port: {}", config.api_port);

    let mate = Arc::new(TradingMate::from_config(&config)?);

    info!("Trading coach initialized");
    start_server(mate, config.api_port).await?;

    Ok(())
}
