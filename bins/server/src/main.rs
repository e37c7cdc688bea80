//! Vantage API Server
//!
//! Main entry point for the Vantage reporting service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vantage_api::{AppState, AuditLog, create_router};
use vantage_core::audit::{AuditWriter, BufferedAuditWriter};
use vantage_db::migration::{Migrator, MigratorTrait};
use vantage_db::{AuditLogRepository, CalculationResolver, connect_pool};
use vantage_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vantage=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let config_db = connect_pool(&config.config_database)
        .await
        .context("Failed to connect to configuration store")?;
    info!("Connected to configuration store");
    let warehouse_db = connect_pool(&config.warehouse_database)
        .await
        .context("Failed to connect to warehouse")?;
    info!("Connected to warehouse");

    Migrator::up(&config_db, None)
        .await
        .context("Failed to migrate configuration store")?;

    let audit: Arc<AuditLog> = Arc::new(BufferedAuditWriter::new(
        Arc::new(AuditLogRepository::new(config_db.clone())),
        config.audit.clone(),
    ));
    let ticker = spawn_audit_flusher(Arc::clone(&audit), config.audit.flush_interval_secs);

    let resolver = CalculationResolver::new(
        config_db.clone(),
        warehouse_db.clone(),
        config.query.clone(),
    );
    info!(
        statement_timeout_secs = config.query.statement_timeout_secs,
        validate_raw_sql = config.query.validate_raw_sql,
        "Resolver configured"
    );

    let state = AppState {
        config_db: Arc::new(config_db),
        warehouse_db: Arc::new(warehouse_db),
        resolver: Arc::new(resolver),
        audit: Arc::clone(&audit),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ticker.abort();
    match audit.flush().await {
        Ok(written) => info!(written, "Audit log flushed on shutdown"),
        Err(e) => warn!(error = %e, "Failed to flush audit log on shutdown"),
    }
    Ok(())
}

/// Flushes the audit buffer on a fixed interval.
fn spawn_audit_flusher(audit: Arc<AuditLog>, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(e) = audit.flush().await {
                warn!(error = %e, "Periodic audit flush failed");
            }
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
