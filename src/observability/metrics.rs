use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub assignments_total: IntCounterVec,
    pub assignment_latency_seconds: HistogramVec,
    pub orders_assigned_total: IntCounter,
    pub orders_revoked_total: IntCounter,
    pub orders_completed_total: IntCounter,
    pub unassigned_orders: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let assignments_total = IntCounterVec::new(
            Opts::new("assignments_total", "Assign requests by outcome"),
            &["outcome"],
        )
        .expect("valid assignments_total metric");

        let assignment_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "assignment_latency_seconds",
                "Latency of assign requests in seconds",
            ),
            &["outcome"],
        )
        .expect("valid assignment_latency_seconds metric");

        let orders_assigned_total =
            IntCounter::new("orders_assigned_total", "Orders stamped onto a courier")
                .expect("valid orders_assigned_total metric");

        let orders_revoked_total = IntCounter::new(
            "orders_revoked_total",
            "Orders returned to the pool after a courier update",
        )
        .expect("valid orders_revoked_total metric");

        let orders_completed_total =
            IntCounter::new("orders_completed_total", "Orders marked as delivered")
                .expect("valid orders_completed_total metric");

        let unassigned_orders = IntGauge::new(
            "unassigned_orders",
            "Orders waiting for a courier",
        )
        .expect("valid unassigned_orders metric");

        registry
            .register(Box::new(assignments_total.clone()))
            .expect("register assignments_total");
        registry
            .register(Box::new(assignment_latency_seconds.clone()))
            .expect("register assignment_latency_seconds");
        registry
            .register(Box::new(orders_assigned_total.clone()))
            .expect("register orders_assigned_total");
        registry
            .register(Box::new(orders_revoked_total.clone()))
            .expect("register orders_revoked_total");
        registry
            .register(Box::new(orders_completed_total.clone()))
            .expect("register orders_completed_total");
        registry
            .register(Box::new(unassigned_orders.clone()))
            .expect("register unassigned_orders");

        Self {
            registry,
            assignments_total,
            assignment_latency_seconds,
            orders_assigned_total,
            orders_revoked_total,
            orders_completed_total,
            unassigned_orders,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
