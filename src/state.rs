use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::error::AppError;
use crate::models::assignment::DispatchEvent;
use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub couriers: DashMap<u64, Courier>,
    pub orders: DashMap<u64, Order>,
    pub events_tx: broadcast::Sender<DispatchEvent>,
    pub metrics: Metrics,
    dispatch_lock: RwLock<()>,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size.max(1));

        Self {
            couriers: DashMap::new(),
            orders: DashMap::new(),
            events_tx,
            metrics: Metrics::new(),
            dispatch_lock: RwLock::new(()),
        }
    }

    /// Opens the exclusive section every mutation runs in.
    pub async fn begin(&self) -> DispatchTxn<'_> {
        DispatchTxn {
            state: self,
            _guard: self.dispatch_lock.write().await,
        }
    }

    /// Shared section for multi-record reads that must not observe a
    /// half-applied mutation.
    pub async fn snapshot(&self) -> RwLockReadGuard<'_, ()> {
        self.dispatch_lock.read().await
    }

    pub fn courier(&self, courier_id: u64) -> Result<Courier, AppError> {
        self.couriers
            .get(&courier_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("courier {courier_id} not found")))
    }

    pub fn order(&self, order_id: u64) -> Result<Order, AppError> {
        self.orders
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
    }

    /// Orders held by the courier and not yet completed, by ascending id.
    pub fn open_orders(&self, courier_id: u64) -> Vec<Order> {
        self.select_orders(|order| order.is_open_for(courier_id))
    }

    /// Orders with no courier and no completion, by ascending id.
    pub fn unassigned_orders(&self) -> Vec<Order> {
        self.select_orders(Order::is_unassigned)
    }

    /// Every order currently attributed to the courier, completed or not.
    pub fn orders_of(&self, courier_id: u64) -> Vec<Order> {
        self.select_orders(|order| order.courier_id == Some(courier_id))
    }

    pub fn publish(&self, event: DispatchEvent) {
        // No subscribers is the normal case.
        let _ = self.events_tx.send(event);
    }

    fn select_orders(&self, predicate: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut selected: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        selected.sort_by_key(|order| order.order_id);
        selected
    }

    fn refresh_unassigned_gauge(&self) {
        let unassigned = self
            .orders
            .iter()
            .filter(|entry| entry.value().is_unassigned())
            .count();
        self.metrics.unassigned_orders.set(unassigned as i64);
    }
}

/// A pending change to one order, checked against the stored record before
/// it is written.
#[derive(Debug, Clone)]
pub struct OrderWrite {
    before: Order,
    after: Order,
}

impl OrderWrite {
    pub fn stage(order: &Order, change: impl FnOnce(&mut Order)) -> Self {
        let mut after = order.clone();
        change(&mut after);
        Self {
            before: order.clone(),
            after,
        }
    }

    pub fn order_id(&self) -> u64 {
        self.after.order_id
    }
}

/// Exclusive access to the store for one request.
pub struct DispatchTxn<'a> {
    state: &'a AppState,
    _guard: RwLockWriteGuard<'a, ()>,
}

impl<'a> DispatchTxn<'a> {
    pub fn state(&self) -> &'a AppState {
        self.state
    }

    pub fn insert_couriers(&self, couriers: Vec<Courier>) -> Result<(), AppError> {
        if let Some(taken) = couriers
            .iter()
            .find(|courier| self.state.couriers.contains_key(&courier.courier_id))
        {
            return Err(AppError::Conflict(format!(
                "courier {} already exists",
                taken.courier_id
            )));
        }

        for courier in couriers {
            self.state.couriers.insert(courier.courier_id, courier);
        }
        Ok(())
    }

    pub fn replace_courier(&self, courier: Courier) -> Result<(), AppError> {
        let mut stored = self.state.couriers.get_mut(&courier.courier_id).ok_or_else(|| {
            AppError::NotFound(format!("courier {} not found", courier.courier_id))
        })?;
        *stored = courier;
        Ok(())
    }

    pub fn insert_orders(&self, orders: Vec<Order>) -> Result<(), AppError> {
        if let Some(taken) = orders
            .iter()
            .find(|order| self.state.orders.contains_key(&order.order_id))
        {
            return Err(AppError::Conflict(format!(
                "order {} already exists",
                taken.order_id
            )));
        }

        for order in orders {
            self.state.orders.insert(order.order_id, order);
        }
        self.state.refresh_unassigned_gauge();
        Ok(())
    }

    /// Applies every staged write or none of them.
    pub fn commit_orders(&self, writes: Vec<OrderWrite>) -> Result<(), AppError> {
        for write in &writes {
            let current = self.state.orders.get(&write.order_id());
            if current.as_deref() != Some(&write.before) {
                return Err(AppError::Conflict(format!(
                    "order {} changed while the request was in flight",
                    write.order_id()
                )));
            }
        }

        debug!(write_count = writes.len(), "committing order writes");
        for write in writes {
            self.state.orders.insert(write.after.order_id, write.after);
        }
        self.state.refresh_unassigned_gauge();
        Ok(())
    }
}
