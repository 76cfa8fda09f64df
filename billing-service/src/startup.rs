//! Application startup and lifecycle management.

use crate::config::BillingConfig;
use crate::handlers::{
    clients, expenses, history, invoices, ledger, orders, payments, reports, returns,
};
use crate::services::{get_metrics, init_metrics, Database};
use crate::services::metrics::http_metrics_middleware;
use axum::middleware::from_fn;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Json, Router,
};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: BillingConfig,
    pub db: Arc<Database>,
}

/// State for health check endpoints.
#[derive(Clone)]
struct HealthState {
    db: Arc<Database>,
}

/// Health check endpoint for Docker/K8s liveness probes.
async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "billing-service",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "billing-service",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint for K8s readiness probes.
async fn readiness_check(State(state): State<HealthState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Metrics endpoint for Prometheus scraping.
async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/client", post(clients::create_client).get(clients::list_clients))
        .route("/client/lookup", get(clients::lookup_client))
        .route("/client/:id", get(clients::get_client))
        .route("/order", post(orders::create_order).get(orders::list_orders))
        .route("/order/:id", get(orders::get_order))
        .route("/order/:id/status", patch(orders::update_order_status))
        .route("/return", post(returns::create_return).get(returns::list_returns))
        .route("/return/:id/status", patch(returns::update_return_status))
        .route(
            "/invoice",
            post(invoices::create_invoice).get(invoices::list_invoices),
        )
        .route(
            "/invoice/from-order/:order_id",
            post(invoices::create_invoice_from_order),
        )
        .route(
            "/invoice/:id",
            get(invoices::get_invoice)
                .patch(invoices::update_invoice)
                .delete(invoices::remove_invoice),
        )
        .route(
            "/payment",
            post(payments::record_payment).get(payments::list_payments),
        )
        .route("/payment/:id", get(payments::get_payment))
        .route(
            "/expense",
            post(expenses::create_expense).get(expenses::list_expenses),
        )
        .route("/expense/:id", delete(expenses::remove_expense))
        .route("/ledger", get(ledger::list_entries))
        .route("/ledger/summary", get(ledger::summary))
        .route("/ledger/client/:client_id", get(ledger::client_statement))
        .route(
            "/financial-reports/summary",
            get(reports::financial_summary),
        )
        .route("/history", get(history::history))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: BillingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: BillingConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: BillingConfig, run_migrations: bool) -> Result<Self, AppError> {
        // Initialize metrics
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;

        if run_migrations {
            db.run_migrations().await?;
        }

        let state = AppState {
            config: config.clone(),
            db: Arc::new(db),
        };

        // Bind listener (port 0 = random port for testing)
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Billing service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        // Background retry loop for the ledger intent outbox.
        tokio::spawn(crate::services::ledger::run_flusher(
            self.state.db.clone(),
            std::time::Duration::from_secs(2),
        ));

        let health_state = HealthState {
            db: self.state.db.clone(),
        };

        let health_router = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .with_state(health_state)
            .route("/metrics", get(metrics_handler));

        let router = api_router(self.state)
            .merge(health_router)
            .layer(from_fn(http_metrics_middleware))
            .layer(from_fn(request_id_middleware))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            );

        axum::serve(self.listener, router)
            .await
            .map_err(|e| std::io::Error::other(format!("Server error: {}", e)))
    }
}
