//! Server crate provides HTTP server functionality.
//!
//! This module implements the JSON API of the restaurant backend on top of
//! [`service::RestaurantService`], together with the `/health` and `/metrics`
//! operational endpoints.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{MatchedPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use service::RestaurantService;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

pub mod error;
mod handlers;
mod metrics;

use handlers::{customers, menu, orders, payments, tables};
pub use metrics::Metrics;

/// Server represents the HTTP server of the restaurant API.
pub struct Server {
    service: Arc<dyn RestaurantService>,
    port: u16,
    shutdown_timeout: Duration,
    metrics: Arc<Metrics>,
}

/// Application state shared between request handlers
#[derive(Clone)]
pub(crate) struct AppState {
    service: Arc<dyn RestaurantService>,
    metrics: Arc<Metrics>,
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `service` - The business operations exposed over HTTP
    /// * `shutdown_timeout` - How long in-flight requests may run after a shutdown signal
    ///
    /// # Errors
    ///
    /// Fails if the metrics registry cannot be set up.
    pub fn new(
        port: u16,
        service: Arc<dyn RestaurantService>,
        shutdown_timeout: Duration,
    ) -> Result<Self> {
        info!("Initializing HTTP server on port {}", port);

        let metrics = Metrics::new().context("Failed to create metrics registry")?;
        Ok(Self {
            service,
            port,
            shutdown_timeout,
            metrics: Arc::new(metrics),
        })
    }

    /// Starts the server and blocks until it's shut down.
    ///
    /// After a shutdown signal the server stops accepting connections and
    /// waits at most `shutdown_timeout` for in-flight requests.
    pub async fn start(&self) -> Result<()> {
        let app = self.router();

        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        let signalled = Arc::new(Notify::new());
        let notify = signalled.clone();
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                notify.notify_one();
            })
            .into_future();

        tokio::select! {
            res = server => res.context("Server error")?,
            _ = async {
                signalled.notified().await;
                tokio::time::sleep(self.shutdown_timeout).await;
            } => {
                warn!(
                    timeout = ?self.shutdown_timeout,
                    "Graceful shutdown timed out, dropping in-flight requests"
                );
                return Ok(());
            }
        }

        info!("HTTP server shut down gracefully");
        Ok(())
    }

    /// Builds the router with every API route and the metrics middleware.
    pub fn router(&self) -> Router {
        let state = AppState {
            service: self.service.clone(),
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route(
                "/api/categories",
                get(menu::list_categories).post(menu::create_category),
            )
            .route(
                "/api/categories/{id}",
                get(menu::get_category)
                    .put(menu::update_category)
                    .delete(menu::delete_category),
            )
            .route("/api/dishes", get(menu::list_dishes).post(menu::create_dish))
            .route("/api/dishes/featured", get(menu::featured_dishes))
            .route(
                "/api/dishes/{id}",
                get(menu::get_dish)
                    .put(menu::update_dish)
                    .delete(menu::delete_dish),
            )
            .route(
                "/api/tables",
                get(tables::list_tables).post(tables::create_table),
            )
            .route("/api/tables/available", get(tables::available_tables))
            .route(
                "/api/tables/{id}",
                get(tables::get_table)
                    .put(tables::update_table)
                    .delete(tables::delete_table),
            )
            .route(
                "/api/customers",
                get(customers::list_customers).post(customers::create_customer),
            )
            .route(
                "/api/customers/by-document/{document}",
                get(customers::customer_by_document),
            )
            .route(
                "/api/customers/{id}",
                get(customers::get_customer)
                    .put(customers::update_customer)
                    .delete(customers::delete_customer),
            )
            .route(
                "/api/customers/{id}/loyalty-points",
                post(customers::adjust_loyalty_points),
            )
            .route(
                "/api/orders",
                get(orders::list_orders).post(orders::create_order),
            )
            .route("/api/orders/daily-sales", get(orders::daily_sales))
            .route("/api/orders/{id}", get(orders::get_order))
            .route("/api/orders/{id}/status", patch(orders::set_order_status))
            .route("/api/orders/{id}/items", post(orders::add_order_item))
            .route(
                "/api/order-items/{id}",
                get(orders::get_order_item)
                    .patch(orders::update_order_item)
                    .delete(orders::remove_order_item),
            )
            .route(
                "/api/order-items/{id}/status",
                patch(orders::set_order_item_status),
            )
            .route(
                "/api/payments",
                get(payments::list_payments).post(payments::add_payment),
            )
            .route("/api/payments/{id}", get(payments::get_payment))
            .route("/health", get(handle_health))
            .route("/metrics", get(handle_metrics))
            .route_layer(axum::middleware::from_fn_with_state(
                state.metrics.clone(),
                metrics_middleware,
            ))
            .with_state(state)
    }
}

/// Middleware for collecting metrics on HTTP requests
async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = req.method().to_string();
    // route template, e.g. /api/orders/{id}
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let request_size = content_length(req.headers());
    if request_size > 0 {
        metrics.record_network_traffic("in", request_size);
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let duration = start.elapsed();

    let status = response.status().as_u16();
    metrics.record_request(&method, &endpoint, status, duration);
    if status >= 400 {
        metrics.record_error("http", &endpoint);
    }

    let response_size = content_length(response.headers());
    if response_size > 0 {
        metrics.record_network_traffic("out", response_size);
    }

    response
}

fn content_length(headers: &axum::http::HeaderMap) -> usize {
    headers
        .get(axum::http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
}

async fn handle_health() -> &'static str {
    "OK"
}

async fn handle_metrics(State(state): State<AppState>) -> Response {
    match state.metrics.encode() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
