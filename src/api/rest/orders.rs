use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde_json::Value;
use tracing::warn;

use crate::api::rest::extract::StrictJson;
use crate::api::rest::payload::{
    decode_batch, import_response, rejection_response, AssignRequest, AssignResponse,
    CompleteRequest, OrderPayload,
};
use crate::engine::{assignment, registry};
use crate::error::AppError;
use crate::models::assignment::CompletedOrder;
use crate::models::order::Order;
use crate::models::timestamp;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_orders))
        .route("/orders/assign", post(assign_orders))
        .route("/orders/complete", post(complete_order))
        .route("/orders/:id", get(get_order))
}

async fn create_orders(
    State(state): State<Arc<AppState>>,
    StrictJson(items): StrictJson<Vec<Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let orders = match decode_batch::<OrderPayload>(items) {
        Ok(orders) => orders,
        Err(rejected) => {
            warn!(rejected = rejected.len(), "order import rejected");
            return Ok(rejection_response("orders", rejected));
        }
    };

    import_response("orders", registry::register_orders(&state, orders).await)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Order>, AppError> {
    state.order(id).map(Json)
}

async fn assign_orders(
    State(state): State<Arc<AppState>>,
    StrictJson(payload): StrictJson<AssignRequest>,
) -> Result<Json<AssignResponse>, AppError> {
    let batch = assignment::assign(&state, payload.courier_id).await?;
    Ok(Json(batch.into()))
}

async fn complete_order(
    State(state): State<Arc<AppState>>,
    StrictJson(payload): StrictJson<CompleteRequest>,
) -> Result<Json<CompletedOrder>, AppError> {
    let complete_time = timestamp::parse(&payload.complete_time)?;
    assignment::complete(&state, payload.courier_id, payload.order_id, complete_time)
        .await
        .map(Json)
}
