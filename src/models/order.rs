use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;
use crate::schedule::TimeInterval;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: u64,
    pub weight: f64,
    pub region: u32,
    pub delivery_hours: Vec<TimeInterval>,
    /// Courier currently holding the order, if any.
    pub courier_id: Option<u64>,
    #[serde(with = "timestamp::option")]
    pub assign_time: Option<DateTime<Utc>>,
    #[serde(with = "timestamp::option")]
    pub complete_time: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl Order {
    pub fn new(order_id: u64, weight: f64, region: u32, delivery_hours: Vec<TimeInterval>) -> Self {
        Self {
            order_id,
            weight,
            region,
            delivery_hours,
            courier_id: None,
            assign_time: None,
            complete_time: None,
            completed: false,
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.courier_id.is_none() && self.complete_time.is_none()
    }

    pub fn is_open_for(&self, courier_id: u64) -> bool {
        self.courier_id == Some(courier_id) && self.complete_time.is_none()
    }

    pub fn assign(&mut self, courier_id: u64, at: DateTime<Utc>) {
        self.courier_id = Some(courier_id);
        self.assign_time = Some(at);
    }

    /// Returns the order to the unassigned pool.
    pub fn release(&mut self) {
        self.courier_id = None;
        self.assign_time = None;
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.complete_time = Some(at);
        self.completed = true;
    }
}
