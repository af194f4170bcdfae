//! Stock ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::ProductId;
use inventory::{InventoryError, InventoryItem, StockLedger};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PutItemRequest {
    pub stock: i64,
}

#[derive(Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

/// PUT /inventory/{product_id}: seed or overwrite stock.
#[tracing::instrument(skip(state, payload))]
pub async fn put(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<ProductId>,
    payload: Result<Json<PutItemRequest>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let Json(req) = payload?;
    let item = state.ledger().put_item(product_id, req.stock).await?;
    Ok(Json(item))
}

/// GET /inventory/{product_id}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<InventoryItem>, ApiError> {
    let item = state
        .ledger()
        .get_item(product_id)
        .await?
        .ok_or(InventoryError::NotFound(product_id))?;
    Ok(Json(item))
}

/// POST /inventory/{product_id}/deduct
#[tracing::instrument(skip(state, payload))]
pub async fn deduct(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<ProductId>,
    payload: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let Json(req) = payload?;
    let item = state
        .ledger()
        .deduct_stock(product_id, req.quantity)
        .await?;
    Ok(Json(item))
}

/// POST /inventory/{product_id}/restore
#[tracing::instrument(skip(state, payload))]
pub async fn restore(
    State(state): State<Arc<AppState>>,
    Path(product_id): Path<ProductId>,
    payload: Result<Json<QuantityRequest>, JsonRejection>,
) -> Result<Json<InventoryItem>, ApiError> {
    let Json(req) = payload?;
    let item = state
        .ledger()
        .restore_stock(product_id, req.quantity)
        .await?;
    Ok(Json(item))
}
