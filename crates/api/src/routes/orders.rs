//! Order endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{CustomerId, OrderId, Page, PageRequest};
use domain::{Order, OrderDraft, OrderFilter, OrderStatus, StatusChange};
use saga::CreatedOrder;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    pub operator: String,
    #[serde(default)]
    pub remark: String,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub customer_id: CustomerId,
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// POST /orders: reserve stock and place an order.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedOrder>), ApiError> {
    let Json(draft) = payload?;
    let created = state.orders.create_order(draft).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /orders/{id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.orders.get_order(order_id).await?))
}

/// GET /orders/{id}/history: status changes, oldest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Vec<StatusChange>>, ApiError> {
    Ok(Json(state.orders.order_history(order_id).await?))
}

/// PUT /orders/{id}/status: merchant decisions only.
///
/// Delivery statuses belong to the rider endpoints and `Cancelled` to the
/// cancel endpoint, which own the matching assignment and stock changes.
#[tracing::instrument(skip(state, payload))]
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(req) = payload?;
    if !matches!(req.status, OrderStatus::Accepted | OrderStatus::Rejected) {
        return Err(ApiError::BadRequest(format!(
            "status {} cannot be set through this endpoint",
            req.status
        )));
    }
    let order = state
        .orders
        .update_status(order_id, req.status, &req.operator, &req.remark)
        .await?;
    Ok(Json(order))
}

/// POST /orders/{id}/cancel: cancel on behalf of the customer and give the
/// stock back.
#[tracing::instrument(skip(state, payload))]
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
    payload: Result<Json<CancelRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(req) = payload?;
    let order = state
        .orders
        .cancel_order(order_id, req.customer_id, &req.reason)
        .await?;
    Ok(Json(order))
}

/// GET /users/{id}/orders
pub async fn list_for_user(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<CustomerId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let page = PageRequest::from_optional(query.page, query.page_size)?;
    let filter = OrderFilter::for_customer(customer_id).with_status(query.status);
    Ok(Json(state.orders.list_orders(&filter, page).await?))
}
