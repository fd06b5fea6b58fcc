//! Restaurant Backend Application
//!
//! This is the main entry point for the restaurant order service.
//! The application provides REST API endpoints for the dining room:
//! menu, tables, customers, orders with their line items, and payments.
//!
//! # Architecture
//!
//! The application follows a modular architecture with:
//! - Domain rules for totals, status changes, settlement, table availability and loyalty
//! - Repository layer for data access (PostgreSQL or in-memory)
//! - Service layer running every operation in one unit of work
//! - API layer for HTTP endpoints and Prometheus metrics

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app_config::AppConfig;
use repository::{MemoryStore, PgStore};
use server::Server;
use service::{RestaurantService, RestaurantServiceImpl};

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over the configured log level.
fn init_logger(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_logger(&config.log_level)?;

    info!("Restaurant backend starting...");

    let service: Arc<dyn RestaurantService> = if config.use_memory_store {
        info!("Using in-memory store, data will not survive a restart");
        Arc::new(RestaurantServiceImpl::new(MemoryStore::new()))
    } else {
        let pool = db::init_db_pool(&config)
            .await
            .context("Failed to initialize database")?;
        info!("Database initialized successfully");
        Arc::new(RestaurantServiceImpl::new(PgStore::new(pool)))
    };

    let http_server = Server::new(config.http_port, service, config.shutdown_timeout)?;
    http_server.start().await?;

    info!("Application stopped");
    Ok(())
}
