use anyhow::Context;

use linenroom_infra::LinenConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linenroom_observability::init();

    let config = LinenConfig::from_env().context("invalid configuration")?;
    tracing::info!(
        floors = %config.floors,
        items = config.catalog.len(),
        storage = ?config.storage,
        "configuration loaded"
    );

    let app = linenroom_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
