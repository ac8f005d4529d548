use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::engine::compatibility::{compatible_orders, is_compatible};
use crate::error::AppError;
use crate::models::assignment::{AssignmentBatch, CompletedOrder, DispatchEvent};
use crate::models::timestamp;
use crate::state::{AppState, DispatchTxn, OrderWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssignOutcome {
    NewBatch,
    OpenBatch,
    Empty,
}

impl AssignOutcome {
    fn label(self) -> &'static str {
        match self {
            AssignOutcome::NewBatch => "new_batch",
            AssignOutcome::OpenBatch => "open_batch",
            AssignOutcome::Empty => "empty",
        }
    }
}

/// Hands the courier a batch of orders.
///
/// While the courier still holds uncompleted orders, that open batch is
/// returned as is, with its original stamp. Otherwise every unassigned order
/// the courier can carry is stamped with one shared `assign_time`.
pub async fn assign(state: &AppState, courier_id: u64) -> Result<AssignmentBatch, AppError> {
    let start = Instant::now();
    let result = assign_batch(state, courier_id).await;
    let elapsed = start.elapsed().as_secs_f64();

    let outcome = match &result {
        Ok((_, outcome)) => outcome.label(),
        Err(err) => {
            warn!(courier_id, error = %err, "assignment failed");
            "error"
        }
    };
    state
        .metrics
        .assignment_latency_seconds
        .with_label_values(&[outcome])
        .observe(elapsed);
    state
        .metrics
        .assignments_total
        .with_label_values(&[outcome])
        .inc();

    result.map(|(batch, _)| batch)
}

async fn assign_batch(
    state: &AppState,
    courier_id: u64,
) -> Result<(AssignmentBatch, AssignOutcome), AppError> {
    let txn = state.begin().await;
    let courier = state.courier(courier_id)?;

    let open = state.open_orders(courier_id);
    if !open.is_empty() {
        let batch = AssignmentBatch {
            order_ids: open.iter().map(|order| order.order_id).collect(),
            assign_time: open.iter().find_map(|order| order.assign_time),
        };
        debug!(courier_id, order_count = batch.order_ids.len(), "returning open batch");
        return Ok((batch, AssignOutcome::OpenBatch));
    }

    let candidates = state.unassigned_orders();
    let selected = compatible_orders(&courier, &candidates);
    if selected.is_empty() {
        info!(courier_id, candidates = candidates.len(), "no compatible orders");
        return Ok((AssignmentBatch::empty(), AssignOutcome::Empty));
    }

    let assign_time = timestamp::now();
    let writes: Vec<OrderWrite> = selected
        .iter()
        .map(|order| OrderWrite::stage(order, |order| order.assign(courier_id, assign_time)))
        .collect();
    let order_ids: Vec<u64> = writes.iter().map(OrderWrite::order_id).collect();

    txn.commit_orders(writes)?;

    state
        .metrics
        .orders_assigned_total
        .inc_by(order_ids.len() as u64);
    state.publish(DispatchEvent::Assigned {
        courier_id,
        order_ids: order_ids.clone(),
        assign_time,
    });
    info!(
        courier_id,
        order_count = order_ids.len(),
        assign_time = %timestamp::format(&assign_time),
        "orders assigned"
    );

    Ok((
        AssignmentBatch {
            order_ids,
            assign_time: Some(assign_time),
        },
        AssignOutcome::NewBatch,
    ))
}

/// Returns to the pool every open order of the courier that its current
/// attributes no longer allow it to carry. Orders that still fit keep their
/// stamp. Yields the released order ids.
pub fn revoke_incompatible(txn: &DispatchTxn<'_>, courier_id: u64) -> Result<Vec<u64>, AppError> {
    let state = txn.state();
    let courier = state.courier(courier_id)?;

    let writes: Vec<OrderWrite> = state
        .open_orders(courier_id)
        .iter()
        .filter(|order| !is_compatible(&courier, order))
        .map(|order| OrderWrite::stage(order, |order| order.release()))
        .collect();
    if writes.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<u64> = writes.iter().map(OrderWrite::order_id).collect();
    txn.commit_orders(writes)?;

    state
        .metrics
        .orders_revoked_total
        .inc_by(order_ids.len() as u64);
    state.publish(DispatchEvent::Revoked {
        courier_id,
        order_ids: order_ids.clone(),
    });
    info!(courier_id, ?order_ids, "orders revoked after courier update");

    Ok(order_ids)
}

/// Marks an order held by the courier as delivered at `complete_time`.
pub async fn complete(
    state: &AppState,
    courier_id: u64,
    order_id: u64,
    complete_time: DateTime<Utc>,
) -> Result<CompletedOrder, AppError> {
    let txn = state.begin().await;
    state.courier(courier_id)?;
    let order = state.order(order_id)?;

    if order.courier_id != Some(courier_id) {
        return Err(AppError::Conflict(format!(
            "order {order_id} is not assigned to courier {courier_id}"
        )));
    }
    if order.complete_time.is_some() {
        return Err(AppError::Conflict(format!(
            "order {order_id} is already completed"
        )));
    }

    txn.commit_orders(vec![OrderWrite::stage(&order, |order| {
        order.complete(complete_time)
    })])?;

    state.metrics.orders_completed_total.inc();
    state.publish(DispatchEvent::Completed {
        courier_id,
        order_id,
        complete_time,
    });
    info!(
        courier_id,
        order_id,
        complete_time = %timestamp::format(&complete_time),
        "order completed"
    );

    Ok(CompletedOrder { order_id })
}
