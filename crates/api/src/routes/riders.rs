//! Rider directory and delivery endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, Page, PageRequest, RiderId};
use domain::{DeliveryStatus, Order};
use rider::{DeliveryAssignment, Rider, RiderStatus};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub status: RiderStatus,
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: RiderStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryQuery {
    pub status: Option<DeliveryStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    pub area: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// POST /riders
#[tracing::instrument(skip(state, payload))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Rider>), ApiError> {
    let Json(req) = payload?;
    let rider = state.riders.register(&req.name, req.status).await?;
    Ok((StatusCode::CREATED, Json(rider)))
}

/// PUT /riders/{id}/status
#[tracing::instrument(skip(state, payload))]
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<RiderId>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Rider>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(state.riders.set_status(rider_id, req.status).await?))
}

/// GET /riders/{id}/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Path(rider_id): Path<RiderId>,
    Query(query): Query<DeliveryQuery>,
) -> Result<Json<Page<DeliveryAssignment>>, ApiError> {
    let page = PageRequest::from_optional(query.page, query.page_size)?;
    let deliveries = state
        .riders
        .list_orders(rider_id, query.status, page)
        .await?;
    Ok(Json(deliveries))
}

/// GET /riders/pending-orders: accepted orders nobody has claimed.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PendingQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let page = PageRequest::from_optional(query.page, query.page_size)?;
    Ok(Json(state.riders.list_pending(query.area, page).await?))
}

/// POST /riders/{id}/orders/{order_id}/accept
#[tracing::instrument(skip(state))]
pub async fn accept(
    State(state): State<Arc<AppState>>,
    Path((rider_id, order_id)): Path<(RiderId, OrderId)>,
) -> Result<Json<DeliveryAssignment>, ApiError> {
    Ok(Json(state.riders.accept_order(rider_id, order_id).await?))
}

/// POST /riders/{id}/orders/{order_id}/pickup
#[tracing::instrument(skip(state))]
pub async fn pickup(
    State(state): State<Arc<AppState>>,
    Path((rider_id, order_id)): Path<(RiderId, OrderId)>,
) -> Result<Json<DeliveryAssignment>, ApiError> {
    Ok(Json(state.riders.mark_picked_up(rider_id, order_id).await?))
}

/// POST /riders/{id}/orders/{order_id}/deliver
#[tracing::instrument(skip(state))]
pub async fn deliver(
    State(state): State<Arc<AppState>>,
    Path((rider_id, order_id)): Path<(RiderId, OrderId)>,
) -> Result<Json<DeliveryAssignment>, ApiError> {
    Ok(Json(state.riders.mark_delivered(rider_id, order_id).await?))
}
