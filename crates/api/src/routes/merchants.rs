//! Merchant directory and merchant decision endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{MerchantId, OrderId, Page, PageRequest};
use domain::Order;
use merchant::Merchant;
use serde::Deserialize;

use super::orders::ListQuery;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    #[serde(default)]
    pub is_open: bool,
}

#[derive(Deserialize)]
pub struct OpenRequest {
    pub is_open: bool,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

/// POST /merchants
#[tracing::instrument(skip(state, payload))]
pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Merchant>), ApiError> {
    let Json(req) = payload?;
    let merchant = state.merchants.register(&req.name, req.is_open).await?;
    Ok((StatusCode::CREATED, Json(merchant)))
}

/// PUT /merchants/{id}/open
#[tracing::instrument(skip(state, payload))]
pub async fn set_open(
    State(state): State<Arc<AppState>>,
    Path(merchant_id): Path<MerchantId>,
    payload: Result<Json<OpenRequest>, JsonRejection>,
) -> Result<Json<Merchant>, ApiError> {
    let Json(req) = payload?;
    Ok(Json(state.merchants.set_open(merchant_id, req.is_open).await?))
}

/// GET /merchants/{id}/orders
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Path(merchant_id): Path<MerchantId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<Order>>, ApiError> {
    let page = PageRequest::from_optional(query.page, query.page_size)?;
    let orders = state
        .merchants
        .list_orders(merchant_id, query.status, page)
        .await?;
    Ok(Json(orders))
}

/// POST /merchants/{id}/orders/{order_id}/accept
#[tracing::instrument(skip(state))]
pub async fn accept(
    State(state): State<Arc<AppState>>,
    Path((merchant_id, order_id)): Path<(MerchantId, OrderId)>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.merchants.accept_order(merchant_id, order_id).await?))
}

/// POST /merchants/{id}/orders/{order_id}/reject
#[tracing::instrument(skip(state, payload))]
pub async fn reject(
    State(state): State<Arc<AppState>>,
    Path((merchant_id, order_id)): Path<(MerchantId, OrderId)>,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> Result<Json<Order>, ApiError> {
    let Json(req) = payload?;
    let order = state
        .merchants
        .reject_order(merchant_id, order_id, &req.reason)
        .await?;
    Ok(Json(order))
}
