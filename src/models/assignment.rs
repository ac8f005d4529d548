use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::timestamp;

/// Orders handed to a courier by one assignment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentBatch {
    pub order_ids: Vec<u64>,
    /// Shared stamp of the batch; absent when the batch is empty.
    pub assign_time: Option<DateTime<Utc>>,
}

impl AssignmentBatch {
    pub fn empty() -> Self {
        Self {
            order_ids: Vec::new(),
            assign_time: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order_ids.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletedOrder {
    pub order_id: u64,
}

/// Committed state changes, published to event subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    Assigned {
        courier_id: u64,
        order_ids: Vec<u64>,
        #[serde(serialize_with = "timestamp::serialize")]
        assign_time: DateTime<Utc>,
    },
    Revoked {
        courier_id: u64,
        order_ids: Vec<u64>,
    },
    Completed {
        courier_id: u64,
        order_id: u64,
        #[serde(serialize_with = "timestamp::serialize")]
        complete_time: DateTime<Utc>,
    },
}
