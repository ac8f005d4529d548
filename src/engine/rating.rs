use std::collections::BTreeSet;

use crate::error::AppError;
use crate::models::courier::{Courier, CourierDetails, CourierStats};
use crate::models::order::Order;
use crate::state::AppState;

const PAY_PER_ORDER: u64 = 500;
const RATING_HORIZON_SECS: f64 = 3600.0;
const MAX_RATING: f64 = 5.0;

/// Earnings and rating of a courier from the orders currently attributed to it.
pub async fn stats(state: &AppState, courier_id: u64) -> Result<CourierStats, AppError> {
    details(state, courier_id).await.map(|details| details.stats)
}

pub async fn details(state: &AppState, courier_id: u64) -> Result<CourierDetails, AppError> {
    let _snapshot = state.snapshot().await;
    let courier = state.courier(courier_id)?;
    let orders = state.orders_of(courier_id);
    let stats = courier_stats(&courier, &orders);

    Ok(CourierDetails { courier, stats })
}

pub fn courier_stats(courier: &Courier, orders: &[Order]) -> CourierStats {
    CourierStats {
        earnings: earnings(courier, orders),
        rating: rating(courier, orders),
    }
}

/// Every order still attributed to the courier that carries an assignment
/// stamp pays out, completed or not.
pub fn earnings(courier: &Courier, orders: &[Order]) -> u64 {
    let paid = orders
        .iter()
        .filter(|order| order.courier_id == Some(courier.courier_id) && order.assign_time.is_some())
        .count() as u64;

    paid * PAY_PER_ORDER * courier.courier_type.earnings_coefficient()
}

/// Rating from the fastest region's mean delivery gap, on a 0..=5 scale.
/// `None` until the courier has completed an order in a region it serves.
pub fn rating(courier: &Courier, orders: &[Order]) -> Option<f64> {
    let regions: BTreeSet<u32> = courier.regions.iter().copied().collect();

    let best = regions
        .into_iter()
        .filter_map(|region| region_average_secs(courier.courier_id, region, orders))
        .min_by(f64::total_cmp)?;

    let t = best.clamp(0.0, RATING_HORIZON_SECS);
    Some(round_to_hundredths(
        (RATING_HORIZON_SECS - t) / RATING_HORIZON_SECS * MAX_RATING,
    ))
}

/// Mean delivery gap in seconds for one region. The first gap runs from the
/// earliest completed order's assignment to its completion; each later gap
/// runs from the previous completion.
fn region_average_secs(courier_id: u64, region: u32, orders: &[Order]) -> Option<f64> {
    let mut completed: Vec<&Order> = orders
        .iter()
        .filter(|order| {
            order.courier_id == Some(courier_id)
                && order.region == region
                && order.complete_time.is_some()
        })
        .collect();
    completed.sort_by_key(|order| order.complete_time);

    let first = completed.first()?;
    let first_complete = first.complete_time?;
    let first_gap = first_complete - first.assign_time.unwrap_or(first_complete);

    let mut gaps = vec![first_gap];
    gaps.extend(completed.windows(2).filter_map(|pair| {
        Some(pair[1].complete_time? - pair[0].complete_time?)
    }));

    let total_secs: f64 = gaps
        .iter()
        .map(|gap| gap.num_microseconds().unwrap_or(i64::MAX) as f64 / 1_000_000.0)
        .sum();
    Some(total_secs / gaps.len() as f64)
}

/// Rounds the exact binary value of `value` to two decimals, ties to even.
/// Scaling by 100 in floating point first would round twice and can push a
/// value sitting just under a tie over it.
fn round_to_hundredths(value: f64) -> f64 {
    if !value.is_finite() || value == 0.0 {
        return value;
    }

    let bits = value.abs().to_bits();
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << 52) - 1);
    // |value| == mantissa * 2^exponent
    let (mantissa, exponent) = if biased_exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased_exponent - 1075)
    };
    if exponent >= 0 {
        return value;
    }

    let scaled = u128::from(mantissa) * 100;
    let shift = exponent.unsigned_abs();
    let hundredths = if shift >= 127 {
        0
    } else {
        let quotient = scaled >> shift;
        let remainder = scaled - (quotient << shift);
        let half = 1u128 << (shift - 1);
        if remainder > half || (remainder == half && quotient & 1 == 1) {
            quotient + 1
        } else {
            quotient
        }
    };

    (hundredths as f64 / 100.0).copysign(value)
}
