use anyhow::{Context, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use songbattle_server::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let catalog = config.load_catalog()?;
    if catalog.len() < 2 {
        bail!(songbattle_core::BattleError::InsufficientCatalog(catalog.len()));
    }

    let store = songbattle_server::connect_sqlite(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    let (app, _state) =
        songbattle_server::build_app(store, catalog, config.matching.clone()).await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, "listening");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
