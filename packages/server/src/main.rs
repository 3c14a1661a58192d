use std::time::Duration;

use anyhow::Context;
use server::config::AppConfig;
use server::database::init_db;
use server::scheduler::run_retry_loop;
use server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let interval = config.retry.interval_secs;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Database ready");

    let state = AppState::new(config, db).context("Failed to build application state")?;

    // Without an interval, runs only happen through the trigger endpoint.
    if let Some(secs) = interval {
        tokio::spawn(run_retry_loop(state.scheduler.clone(), Duration::from_secs(secs)));
    }

    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
