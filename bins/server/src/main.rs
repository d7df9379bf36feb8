//! Potluck API Server
//!
//! Main entry point for the Potluck group ledger service.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use potluck_api::notify::TracingNotifier;
use potluck_api::{AppState, create_router};
use potluck_db::migration::{Migrator, MigratorTrait};
use potluck_db::{CategoryRepository, connect_with};
use potluck_shared::{AppConfig, JwtConfig, JwtService, LogFormat};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing
    let json = config.logging.format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "potluck=debug,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    let db = connect_with(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    Migrator::up(&db, None)
        .await
        .context("Failed to run migrations")?;

    let seeded = CategoryRepository::new(db.clone())
        .seed_defaults(&config.ledger.default_categories)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to seed categories: {e}"))?;
    info!(seeded, currency = %config.ledger.currency, "Ledger ready");

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let state = AppState::new(db, jwt_service, Arc::new(TracingNotifier));
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
