// rest_api/src/main.rs
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use lib::{bootstrap, AppConfig, ClinicStorage, SledClinicStorage};
use rest_api::{start_server, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rest_api=info,lib=info,security=info")),
        )
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref()).context("Failed to load configuration")?;

    let storage = Arc::new(
        SledClinicStorage::open(&config.storage.data_directory).context("Failed to open clinic store")?,
    );
    let roles = config.roles().context("Failed to load role configuration")?;
    let created = bootstrap::init(storage.as_ref(), &roles).await?;
    if !created.is_empty() {
        info!("Seeded roles: {}", created.join(", "));
    }

    let state = AppState::build(config, storage.clone()).await?;
    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal.");
        }
    };
    start_server(state, shutdown).await?;

    storage.flush().await?;
    Ok(())
}
