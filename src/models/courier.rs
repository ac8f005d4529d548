use serde::{Deserialize, Serialize};

use crate::schedule::TimeInterval;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CourierType {
    Foot,
    Bike,
    Car,
}

impl CourierType {
    /// Maximum total order weight this courier type can carry.
    pub const fn capacity(self) -> f64 {
        match self {
            CourierType::Foot => 10.0,
            CourierType::Bike => 15.0,
            CourierType::Car => 50.0,
        }
    }

    pub const fn earnings_coefficient(self) -> u64 {
        match self {
            CourierType::Foot => 2,
            CourierType::Bike => 5,
            CourierType::Car => 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Courier {
    pub courier_id: u64,
    pub courier_type: CourierType,
    pub regions: Vec<u32>,
    pub working_hours: Vec<TimeInterval>,
}

impl Courier {
    pub fn serves_region(&self, region: u32) -> bool {
        self.regions.contains(&region)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CourierStats {
    pub earnings: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// A courier's attributes together with its current stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourierDetails {
    #[serde(flatten)]
    pub courier: Courier,
    #[serde(flatten)]
    pub stats: CourierStats,
}

/// Partial courier update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CourierPatch {
    pub courier_type: Option<CourierType>,
    pub regions: Option<Vec<u32>>,
    pub working_hours: Option<Vec<TimeInterval>>,
}

impl CourierPatch {
    /// Applies the patch in place and reports whether any attribute that
    /// affects order compatibility actually changed.
    pub fn apply(self, courier: &mut Courier) -> bool {
        let mut changed = false;

        if let Some(courier_type) = self.courier_type {
            changed |= courier.courier_type != courier_type;
            courier.courier_type = courier_type;
        }
        if let Some(regions) = self.regions {
            changed |= courier.regions != regions;
            courier.regions = regions;
        }
        if let Some(working_hours) = self.working_hours {
            changed |= courier.working_hours != working_hours;
            courier.working_hours = working_hours;
        }

        changed
    }
}
