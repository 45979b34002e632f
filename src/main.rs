//! Beacon chat-bot service.
//!
//! Main entry point. Initializes tracing, the registry store and the
//! outbound clients, then serves the HTTP API until a shutdown signal.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use beacon_api::{AppState, Config};
use beacon_core::{PostgresRegistry, Storage};
use beacon_delivery::{CompletionClient, MessagingClient, Responder};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config.rust_log)?;

    info!("Starting Beacon");

    let addr = config.parse_server_addr()?;
    info!(
        database_url = %config.database_url_masked(),
        server_addr = %addr,
        max_connections = config.database_max_connections,
        broadcast_concurrency = config.broadcast_concurrency,
        "Configuration loaded"
    );

    if config.channel_secret.is_empty() {
        warn!("CHANNEL_SECRET is empty, every webhook will be rejected");
    }
    if config.channel_access_token.is_empty() {
        warn!("CHANNEL_ACCESS_TOKEN is empty, pushes and replies will be refused by the platform");
    }

    let db_pool = create_database_pool(&config).await?;
    info!("Database connection pool established");

    let storage = Arc::new(Storage::new(db_pool.clone()));
    storage.migrate().await.context("Failed to create registry schema")?;
    info!("Registry schema ready");

    let messaging =
        MessagingClient::new(config.to_client_config()).context("Failed to build messaging client")?;
    let responder = build_responder(&config)?;
    info!(mode = responder.mode(), "Reply generation configured");

    let state = AppState::new(
        Arc::new(PostgresRegistry::new(storage)),
        Arc::new(messaging),
        responder,
        config.to_auth_settings(),
        config.to_broadcast_config(),
    );

    beacon_api::start_server(state, addr, config.request_timeout())
        .await
        .context("HTTP server failed")?;

    db_pool.close().await;
    info!("Database connections closed");

    info!("Beacon shutdown complete");
    Ok(())
}

/// Initializes tracing with the configured filter directives.
fn init_tracing(directives: &str) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_new(directives)
        .with_context(|| format!("Invalid log filter: {directives}"))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}

/// Chooses completion replies when an API key is configured, echo otherwise.
fn build_responder(config: &Config) -> Result<Responder> {
    let Some(completion_config) = config.to_completion_config() else {
        return Ok(Responder::Echo);
    };

    let client =
        CompletionClient::new(completion_config).context("Failed to build completion client")?;
    Ok(Responder::completion(Arc::new(client), config.reply_fallback_text.clone()))
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);
    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .idle_timeout(Duration::from_secs(config.database_idle_timeout))
            .max_lifetime(Duration::from_secs(config.database_max_lifetime))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .fetch_one(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                return Ok(pool);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying"
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
