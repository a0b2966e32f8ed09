use chrono::Duration;
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use profinder::api::middleware::session::AppState;
use profinder::config::Config;
use profinder::db;
use profinder::jobs::cleanup;
use profinder::services::{mailer::Mailer, otp::OtpStore, tokens::TokenService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profinder=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ProFinder server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    let otp = OtpStore::new(
        Duration::minutes(config.otp_ttl_minutes),
        config.otp_max_attempts,
    );
    let mailer = Mailer::from_config(&config)?;

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        tokens: TokenService::from_config(&config),
        otp: otp.clone(),
        mailer: Arc::new(mailer),
        config: config.clone(),
    };

    let mut scheduler = cleanup::start_scheduler(pool.clone(), otp)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start job scheduler: {:?}", e))?;

    let app = profinder::api::app(state);

    let host: std::net::IpAddr = config.host.parse()?;
    let addr = SocketAddr::from((host, config.port));
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = ?e, "Job scheduler did not shut down cleanly");
    }
    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
