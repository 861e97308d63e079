mod ai_client;
mod api;
mod auth;
mod config;
mod db_utils;
mod doctors;
mod graceful_shutdown;
mod models;
mod report;
mod repo;
#[cfg(test)]
mod test_support;
mod validation;

use ai_client::AiClient;
use config::Config;
use db_utils::*;
use graceful_shutdown::wait_for_signal;

use anyhow::Context;
use dotenv::dotenv;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;


#[tokio::main]
async fn main() -> Result<(), anyhow::Error>{

    dotenv().ok();

    tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

    let config = Config::from_env()?;

    info!("Heal-Io API {} starting", env!("CARGO_PKG_VERSION"));

    let pg_con_pool = get_pg_connection_pool(&config.pg_url(), config.connect_attempts).await?;
    ensure_schema(&pg_con_pool).await?;

    let ai = AiClient::new(&config.ai_service_url, config.ai_image_timeout, config.ai_symptom_timeout);
    // The AI tier is external; requests relay its failures, so startup does not wait on it.
    if let Err(e) = check_ai_service_connection(ai.base_url(), 1).await {
        warn!("AI service at {} is not reachable yet: {}", ai.base_url(), e);
    }

    let app = api::api_router(api::AppState::new(pg_con_pool.clone(), ai));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_signal())
        .await?;

    pg_con_pool.close().await;
    info!("Shutdown complete");
    Ok(())
}
