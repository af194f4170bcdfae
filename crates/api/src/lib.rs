//! HTTP API server for the food delivery order platform.
//!
//! Wires the inventory ledger, order orchestrator, merchant service and
//! rider service in-process behind REST endpoints, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/inventory/{product_id}",
            put(routes::inventory::put).get(routes::inventory::get),
        )
        .route(
            "/inventory/{product_id}/deduct",
            post(routes::inventory::deduct),
        )
        .route(
            "/inventory/{product_id}/restore",
            post(routes::inventory::restore),
        )
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/history", get(routes::orders::history))
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/users/{id}/orders", get(routes::orders::list_for_user))
        .route("/merchants", post(routes::merchants::register))
        .route("/merchants/{id}/open", put(routes::merchants::set_open))
        .route("/merchants/{id}/orders", get(routes::merchants::list_orders))
        .route(
            "/merchants/{id}/orders/{order_id}/accept",
            post(routes::merchants::accept),
        )
        .route(
            "/merchants/{id}/orders/{order_id}/reject",
            post(routes::merchants::reject),
        )
        .route("/riders", post(routes::riders::register))
        .route("/riders/pending-orders", get(routes::riders::list_pending))
        .route("/riders/{id}/status", put(routes::riders::set_status))
        .route("/riders/{id}/orders", get(routes::riders::list_orders))
        .route(
            "/riders/{id}/orders/{order_id}/accept",
            post(routes::riders::accept),
        )
        .route(
            "/riders/{id}/orders/{order_id}/pickup",
            post(routes::riders::pickup),
        )
        .route(
            "/riders/{id}/orders/{order_id}/deliver",
            post(routes::riders::deliver),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Registers descriptions for the counters and histograms the services emit.
pub fn describe_metrics() {
    metrics::describe_counter!("orders_created_total", "Orders persisted successfully");
    metrics::describe_counter!(
        "order_create_failed_total",
        "Order creations that failed, by reason"
    );
    metrics::describe_histogram!(
        "order_create_duration_seconds",
        metrics::Unit::Seconds,
        "Time spent creating an order, including stock reservation"
    );
    metrics::describe_counter!(
        "order_status_transitions_total",
        "Order status changes, by from and to status"
    );
    metrics::describe_counter!("stock_deductions_total", "Successful stock deductions");
    metrics::describe_counter!(
        "stock_out_of_stock_total",
        "Deductions refused for insufficient stock"
    );
    metrics::describe_counter!(
        "stock_compensations_total",
        "Stock restores issued by saga compensation, by reason"
    );
    metrics::describe_counter!(
        "stock_compensation_failures_total",
        "Compensating stock restores that failed"
    );
    metrics::describe_counter!(
        "merchant_decisions_total",
        "Merchant accept and reject decisions"
    );
    metrics::describe_counter!("delivery_steps_total", "Rider delivery steps, by step");
    metrics::describe_counter!(
        "delivery_compensation_failures_total",
        "Failed releases and rewinds of delivery assignments"
    );
}
