use tracing::info;

use crate::bootstrap::build_state;
use crate::config::AppConfig;
use crate::infrastructure::logging::init_logging;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_logging(&config.logging);

    let state = build_state(&config)?;

    // Best-effort: establishes upstream connections so the first request
    // does not pay TLS setup
    state.pool.warmup(state.router.providers()).await;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, crate::api::router(state)).await?;

    Ok(())
}
