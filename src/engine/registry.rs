use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::engine::assignment::revoke_incompatible;
use crate::error::AppError;
use crate::models::courier::{Courier, CourierPatch};
use crate::models::order::Order;
use crate::state::AppState;

/// One item of an import that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub id: Option<u64>,
    pub errors: Vec<String>,
}

impl Rejection {
    pub fn new(id: Option<u64>, error: impl Into<String>) -> Self {
        Self {
            id,
            errors: vec![error.into()],
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{} items rejected", .0.len())]
    Rejected(Vec<Rejection>),

    #[error(transparent)]
    App(#[from] AppError),
}

/// Stores every courier or none. Ids already taken, in the store or earlier
/// in the same batch, reject the whole import.
pub async fn register_couriers(
    state: &AppState,
    couriers: Vec<Courier>,
) -> Result<Vec<u64>, ImportError> {
    let txn = state.begin().await;

    let ids: Vec<u64> = couriers.iter().map(|courier| courier.courier_id).collect();
    let rejected = duplicate_ids(&ids, |id| state.couriers.contains_key(&id), "courier");
    if !rejected.is_empty() {
        return Err(ImportError::Rejected(rejected));
    }

    txn.insert_couriers(couriers)?;
    info!(courier_count = ids.len(), "couriers registered");
    Ok(ids)
}

pub async fn register_orders(state: &AppState, orders: Vec<Order>) -> Result<Vec<u64>, ImportError> {
    let txn = state.begin().await;

    let ids: Vec<u64> = orders.iter().map(|order| order.order_id).collect();
    let rejected = duplicate_ids(&ids, |id| state.orders.contains_key(&id), "order");
    if !rejected.is_empty() {
        return Err(ImportError::Rejected(rejected));
    }

    txn.insert_orders(orders)?;
    info!(order_count = ids.len(), "orders registered");
    Ok(ids)
}

/// Applies a partial update. When the courier's type, regions or working
/// hours change, open orders it can no longer carry go back to the pool in
/// the same critical section.
pub async fn update_courier(
    state: &AppState,
    courier_id: u64,
    patch: CourierPatch,
) -> Result<Courier, AppError> {
    let txn = state.begin().await;
    let mut courier = state.courier(courier_id)?;

    let changed = patch.apply(&mut courier);
    txn.replace_courier(courier.clone())?;

    if changed {
        let revoked = revoke_incompatible(&txn, courier_id)?;
        info!(courier_id, revoked = revoked.len(), "courier updated");
    }

    Ok(courier)
}

fn duplicate_ids(ids: &[u64], stored: impl Fn(u64) -> bool, noun: &str) -> Vec<Rejection> {
    let mut seen = HashSet::new();

    ids.iter()
        .filter_map(|&id| {
            if stored(id) {
                Some(Rejection::new(Some(id), format!("{noun} {id} already exists")))
            } else if !seen.insert(id) {
                Some(Rejection::new(Some(id), format!("{noun} {id} is duplicated in the request")))
            } else {
                None
            }
        })
        .collect()
}
