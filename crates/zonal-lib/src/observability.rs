//! Observability for the synthesis engine
//!
//! Provides:
//! - Prometheus metrics (synthesis latency, nodes produced, failures, zones)
//! - Structured logging of synthesis lifecycle events with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Histogram buckets for synthesis latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00005, 0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.5,
];

/// Global metrics instance (registered once); `None` when registration failed
static GLOBAL_METRICS: OnceLock<Option<SynthesisMetricsInner>> = OnceLock::new();

struct SynthesisMetricsInner {
    synthesis_latency_seconds: Histogram,
    leaves_produced: IntCounter,
    composites_produced: IntCounter,
    rules_produced: IntCounter,
    syntheses_failed: IntCounter,
    zones_evaluated: IntGauge,
}

impl SynthesisMetricsInner {
    fn register() -> prometheus::Result<Self> {
        Ok(Self {
            synthesis_latency_seconds: register_histogram!(
                "zonal_synthesis_latency_seconds",
                "Time spent synthesizing one alarm graph",
                LATENCY_BUCKETS.to_vec()
            )?,
            leaves_produced: register_int_counter!(
                "zonal_leaf_alarms_produced_total",
                "Leaf alarms added to synthesized graphs"
            )?,
            composites_produced: register_int_counter!(
                "zonal_composite_alarms_produced_total",
                "Composite alarms added to synthesized graphs"
            )?,
            rules_produced: register_int_counter!(
                "zonal_contributor_rules_produced_total",
                "Contributor rules emitted alongside synthesized graphs"
            )?,
            syntheses_failed: register_int_counter!(
                "zonal_syntheses_failed_total",
                "Syntheses rejected with a configuration error"
            )?,
            zones_evaluated: register_int_gauge!(
                "zonal_zones_evaluated",
                "Zones covered by the most recent synthesis"
            )?,
        })
    }

    fn init() -> Option<Self> {
        match Self::register() {
            Ok(inner) => Some(inner),
            Err(err) => {
                warn!(error = %err, "Failed to register synthesis metrics, metrics disabled");
                None
            }
        }
    }
}

/// Synthesis metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance. Every clone records
/// into the same instruments.
#[derive(Clone)]
pub struct SynthesisMetrics {
    _private: (),
}

impl Default for SynthesisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisMetrics {
    /// Create a handle, registering the global instruments on first call
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(SynthesisMetricsInner::init);
        Self { _private: () }
    }

    fn inner(&self) -> Option<&SynthesisMetricsInner> {
        GLOBAL_METRICS.get().and_then(Option::as_ref)
    }

    pub fn observe_synthesis_latency(&self, duration_secs: f64) {
        if let Some(inner) = self.inner() {
            inner.synthesis_latency_seconds.observe(duration_secs);
        }
    }

    /// Record the size of a successfully synthesized graph
    pub fn record_graph(&self, leaves: usize, composites: usize, rules: usize, zones: usize) {
        if let Some(inner) = self.inner() {
            inner.leaves_produced.inc_by(leaves as u64);
            inner.composites_produced.inc_by(composites as u64);
            inner.rules_produced.inc_by(rules as u64);
            inner.zones_evaluated.set(zones as i64);
        }
    }

    pub fn inc_syntheses_failed(&self) {
        if let Some(inner) = self.inner() {
            inner.syntheses_failed.inc();
        }
    }
}

/// Structured logger for synthesis events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log the start of a synthesis
    pub fn log_synthesis_started(&self, region: &str, zones: usize, operations: usize) {
        info!(
            event = "synthesis_started",
            service = %self.service,
            region = %region,
            zones = zones,
            operations = operations,
            "Synthesizing zonal isolation alarm graph"
        );
    }

    /// Log a completed synthesis with the shape of the produced graph
    pub fn log_synthesis_completed(
        &self,
        leaves: usize,
        composites: usize,
        rules: usize,
        fingerprint: &str,
        duration_secs: f64,
    ) {
        info!(
            event = "synthesis_completed",
            service = %self.service,
            leaves = leaves,
            composites = composites,
            rules = rules,
            fingerprint = %fingerprint,
            duration_secs = duration_secs,
            "Alarm graph synthesized"
        );
    }

    /// Log a rejected synthesis
    pub fn log_synthesis_failed(&self, reason: &str) {
        error!(
            event = "synthesis_failed",
            service = %self.service,
            reason = %reason,
            "Alarm graph synthesis rejected"
        );
    }

    /// Log a signal family left out because its inputs are absent
    pub fn log_family_skipped(&self, zone: &str, family: &str, reason: &str) {
        warn!(
            event = "family_skipped",
            service = %self.service,
            zone = %zone,
            family = %family,
            reason = %reason,
            "Signal family omitted from zone decision"
        );
    }
}
