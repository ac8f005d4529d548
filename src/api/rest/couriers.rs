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
    check_patch, decode_batch, import_response, rejection_response, CourierPayload,
};
use crate::engine::{rating, registry};
use crate::error::AppError;
use crate::models::courier::{Courier, CourierDetails, CourierPatch};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/couriers", post(create_couriers))
        .route("/couriers/:id", get(get_courier).patch(update_courier))
}

async fn create_couriers(
    State(state): State<Arc<AppState>>,
    StrictJson(items): StrictJson<Vec<Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let couriers = match decode_batch::<CourierPayload>(items) {
        Ok(couriers) => couriers,
        Err(rejected) => {
            warn!(rejected = rejected.len(), "courier import rejected");
            return Ok(rejection_response("couriers", rejected));
        }
    };

    import_response("couriers", registry::register_couriers(&state, couriers).await)
}

async fn get_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<CourierDetails>, AppError> {
    rating::details(&state, id).await.map(Json)
}

async fn update_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    StrictJson(patch): StrictJson<CourierPatch>,
) -> Result<Json<Courier>, AppError> {
    check_patch(&patch)?;
    registry::update_courier(&state, id, patch).await.map(Json)
}
