use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Poll metrics
    pub static ref POLL_CYCLES: IntCounter = IntCounter::new(
        "price_relay_poll_cycles_total",
        "Total number of poll cycles run"
    ).unwrap();

    pub static ref SOURCE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "price_relay_source_failures_total",
            "Failed fetch attempts per source tier"
        ),
        &["source"]
    ).unwrap();

    pub static ref RECONNECT_ATTEMPTS: IntCounter = IntCounter::new(
        "price_relay_reconnect_attempts_total",
        "Total number of poll loop reconnect attempts"
    ).unwrap();

    // Broadcast metrics
    pub static ref UPDATES_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "price_relay_updates_published_total",
            "Price updates published, by tier"
        ),
        &["tier"]
    ).unwrap();

    pub static ref SUBSCRIBERS: IntGauge = IntGauge::new(
        "price_relay_subscribers",
        "Currently registered subscribers"
    ).unwrap();

    pub static ref SUBSCRIBER_DROPS: IntCounter = IntCounter::new(
        "price_relay_subscriber_drops_total",
        "Subscribers removed after a failed send"
    ).unwrap();

    // Latency metrics
    pub static ref FETCH_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "price_relay_fetch_latency_seconds",
            "Latency of successful source fetches"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0])
    ).unwrap();
}

pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(POLL_CYCLES.clone()),
        Box::new(SOURCE_FAILURES.clone()),
        Box::new(RECONNECT_ATTEMPTS.clone()),
        Box::new(UPDATES_PUBLISHED.clone()),
        Box::new(SUBSCRIBERS.clone()),
        Box::new(SUBSCRIBER_DROPS.clone()),
        Box::new(FETCH_LATENCY.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            tracing::debug!("Metric registration skipped: {}", e);
        }
    }
}

/// Render the registry in the Prometheus text format.
pub fn gather_text() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
