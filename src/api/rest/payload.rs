//! Strict request decoding. Every body rejects unknown keys; batch imports
//! are checked item by item so a failure names every offending entry.

use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::registry::{ImportError, Rejection};
use crate::error::AppError;
use crate::models::assignment::AssignmentBatch;
use crate::models::courier::{Courier, CourierPatch, CourierType};
use crate::models::order::Order;
use crate::models::timestamp;
use crate::schedule::TimeInterval;

pub trait ImportItem: DeserializeOwned {
    type Record;

    const ID_FIELD: &'static str;

    fn into_record(self) -> Result<Self::Record, Vec<String>>;
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CourierPayload {
    pub courier_id: u64,
    pub courier_type: CourierType,
    pub regions: Vec<u32>,
    pub working_hours: Vec<TimeInterval>,
}

impl ImportItem for CourierPayload {
    type Record = Courier;

    const ID_FIELD: &'static str = "courier_id";

    fn into_record(self) -> Result<Courier, Vec<String>> {
        let mut errors = Vec::new();
        if self.courier_id == 0 {
            errors.push("courier_id must be positive".to_string());
        }
        errors.extend(check_regions(&self.regions));

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Courier {
            courier_id: self.courier_id,
            courier_type: self.courier_type,
            regions: self.regions,
            working_hours: self.working_hours,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderPayload {
    pub order_id: u64,
    pub weight: f64,
    pub region: u32,
    pub delivery_hours: Vec<TimeInterval>,
}

impl ImportItem for OrderPayload {
    type Record = Order;

    const ID_FIELD: &'static str = "order_id";

    fn into_record(self) -> Result<Order, Vec<String>> {
        let mut errors = Vec::new();
        if self.order_id == 0 {
            errors.push("order_id must be positive".to_string());
        }
        if !(self.weight.is_finite() && self.weight > 0.0) {
            errors.push("weight must be positive".to_string());
        }
        if self.region == 0 {
            errors.push("region must be positive".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Order::new(
            self.order_id,
            self.weight,
            self.region,
            self.delivery_hours,
        ))
    }
}

/// Decodes every item, collecting a rejection for each one that fails.
pub fn decode_batch<P: ImportItem>(items: Vec<Value>) -> Result<Vec<P::Record>, Vec<Rejection>> {
    let mut records = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();

    for item in items {
        let id = item.get(P::ID_FIELD).and_then(Value::as_u64);
        match serde_json::from_value::<P>(item) {
            Ok(payload) => match payload.into_record() {
                Ok(record) => records.push(record),
                Err(errors) => rejected.push(Rejection { id, errors }),
            },
            Err(err) => rejected.push(Rejection::new(id, err.to_string())),
        }
    }

    if rejected.is_empty() {
        Ok(records)
    } else {
        Err(rejected)
    }
}

pub fn check_patch(patch: &CourierPatch) -> Result<(), AppError> {
    let errors = patch.regions.as_deref().map(check_regions).unwrap_or_default();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::BadRequest(errors.join("; ")))
    }
}

fn check_regions(regions: &[u32]) -> Vec<String> {
    if regions.contains(&0) {
        vec!["regions must be positive integers".to_string()]
    } else {
        Vec::new()
    }
}

/// `201 {"<kind>": [{"id": n}]}` on success, `400 {"validation_error": ...}`
/// when any item was rejected.
pub fn import_response(
    kind: &'static str,
    result: Result<Vec<u64>, ImportError>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    match result {
        Ok(ids) => {
            let created: Vec<IdRef> = ids.into_iter().map(|id| IdRef { id }).collect();
            Ok((StatusCode::CREATED, Json(json!({ kind: created }))))
        }
        Err(ImportError::Rejected(rejected)) => Ok(rejection_response(kind, rejected)),
        Err(ImportError::App(err)) => Err(err),
    }
}

pub fn rejection_response(kind: &'static str, rejected: Vec<Rejection>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "validation_error": { kind: rejected } })),
    )
}

#[derive(Debug, Serialize)]
pub struct IdRef {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssignRequest {
    pub courier_id: u64,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub orders: Vec<IdRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assign_time: Option<String>,
}

impl From<AssignmentBatch> for AssignResponse {
    fn from(batch: AssignmentBatch) -> Self {
        Self {
            orders: batch.order_ids.into_iter().map(|id| IdRef { id }).collect(),
            assign_time: batch.assign_time.as_ref().map(timestamp::format),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteRequest {
    pub courier_id: u64,
    pub order_id: u64,
    pub complete_time: String,
}
