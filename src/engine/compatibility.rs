use crate::models::courier::Courier;
use crate::models::order::Order;
use crate::schedule::any_overlap;

/// Whether the courier can carry the order: weight within capacity, region
/// served, and at least one working window overlapping a delivery window.
pub fn is_compatible(courier: &Courier, order: &Order) -> bool {
    order.weight <= courier.courier_type.capacity()
        && courier.serves_region(order.region)
        && any_overlap(&courier.working_hours, &order.delivery_hours)
}

/// Filters `candidates` down to the orders the courier can carry, keeping
/// their input order.
pub fn compatible_orders<'a, I>(courier: &Courier, candidates: I) -> Vec<&'a Order>
where
    I: IntoIterator<Item = &'a Order>,
{
    candidates
        .into_iter()
        .filter(|order| is_compatible(courier, order))
        .collect()
}
