// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

// ============================================================================
// Metrics Module - Prometheus metrics for the dispatch stage
// ============================================================================
//
// Covers:
// - Inbound order.created records and their terminal outcome
// - Handler attempts per record (retries show up as attempt > 1)
// - Stock availability checks by result
// - Events published per topic
// - Dead-letter routing
//
// Scraped via /metrics on the metrics server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub orders_received: IntCounter,
    pub order_outcomes: IntCounterVec,
    pub handler_attempts: IntCounterVec,
    pub processing_duration: HistogramVec,

    pub availability_checks: IntCounterVec,
    pub events_published: IntCounterVec,

    pub dead_letters_total: IntCounterVec,
}

/// Terminal (and intermediate retry) outcomes recorded per record.
pub mod outcome {
    pub const ACKNOWLEDGED: &str = "acknowledged";
    pub const RETRY: &str = "retry";
    pub const DEAD_LETTER: &str = "dead_letter";
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let orders_received = IntCounter::new(
            "dispatch_orders_received_total",
            "Total order.created records received",
        )?;
        registry.register(Box::new(orders_received.clone()))?;

        let order_outcomes = IntCounterVec::new(
            Opts::new("dispatch_order_outcomes_total", "Record outcomes by kind"),
            &["outcome"],
        )?;
        registry.register(Box::new(order_outcomes.clone()))?;

        let handler_attempts = IntCounterVec::new(
            Opts::new("dispatch_handler_attempts_total", "Handler invocations by attempt number"),
            &["attempt"],
        )?;
        registry.register(Box::new(handler_attempts.clone()))?;

        let processing_duration = HistogramVec::new(
            HistogramOpts::new("dispatch_processing_duration_seconds", "Record processing duration including retries")
                .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
            &["outcome"],
        )?;
        registry.register(Box::new(processing_duration.clone()))?;

        let availability_checks = IntCounterVec::new(
            Opts::new("dispatch_availability_checks_total", "Stock availability checks by result"),
            &["result"],
        )?;
        registry.register(Box::new(availability_checks.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("dispatch_events_published_total", "Events published by topic and type"),
            &["topic", "event_type"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let dead_letters_total = IntCounterVec::new(
            Opts::new("dispatch_dead_letters_total", "Records routed to the dead-letter topic"),
            &["failure_kind"],
        )?;
        registry.register(Box::new(dead_letters_total.clone()))?;

        Ok(Self {
            registry,
            orders_received,
            order_outcomes,
            handler_attempts,
            processing_duration,
            availability_checks,
            events_published,
            dead_letters_total,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_received(&self) {
        self.orders_received.inc();
    }

    pub fn record_attempt(&self, attempt: u32) {
        self.handler_attempts.with_label_values(&[&attempt.to_string()]).inc();
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.order_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn record_processing_time(&self, outcome: &str, duration_secs: f64) {
        self.processing_duration.with_label_values(&[outcome]).observe(duration_secs);
    }

    pub fn record_availability(&self, result: &str) {
        self.availability_checks.with_label_values(&[result]).inc();
    }

    pub fn record_event_published(&self, topic: &str, event_type: &str) {
        self.events_published.with_label_values(&[topic, event_type]).inc();
    }

    pub fn record_dead_letter(&self, failure_kind: &str) {
        self.dead_letters_total.with_label_values(&[failure_kind]).inc();
    }
}
