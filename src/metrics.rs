//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

/// Process-wide metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub tx_submitted: IntCounter,
    pub tx_confirmed: IntCounter,
    pub tx_failed: IntCounterVec,
    pub confirmation_timeouts: IntCounter,
    pub fee_fallbacks: IntCounter,
    pub checkpoints_written: IntCounter,
    pub saga_steps_skipped: IntCounter,

    // Histograms
    pub tx_prepare_latency: Histogram,
    pub tx_confirm_latency: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let tx_submitted = IntCounter::with_opts(Opts::new(
            "tx_submitted_total",
            "Transactions handed to the network",
        ))?;

        let tx_confirmed = IntCounter::with_opts(Opts::new(
            "tx_confirmed_total",
            "Transactions observed at confirmed commitment",
        ))?;

        let tx_failed = IntCounterVec::new(
            Opts::new("tx_failed_total", "Transaction pipeline failures by category"),
            &["category"],
        )?;

        let confirmation_timeouts = IntCounter::with_opts(Opts::new(
            "confirmation_timeouts_total",
            "Transactions whose blockhash expired before confirmation",
        ))?;

        let fee_fallbacks = IntCounter::with_opts(Opts::new(
            "fee_fallbacks_total",
            "Priority fee estimates replaced by the configured fallback",
        ))?;

        let checkpoints_written = IntCounter::with_opts(Opts::new(
            "checkpoints_written_total",
            "Launch checkpoints persisted",
        ))?;

        let saga_steps_skipped = IntCounter::with_opts(Opts::new(
            "saga_steps_skipped_total",
            "Workflow steps skipped because their effect was already committed",
        ))?;

        let tx_prepare_latency = Histogram::with_opts(
            HistogramOpts::new(
                "tx_prepare_seconds",
                "Fee estimation, simulation and blockhash fetch latency",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let tx_confirm_latency = Histogram::with_opts(
            HistogramOpts::new("tx_confirm_seconds", "Send-to-confirmation latency")
                .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 40.0, 90.0]),
        )?;

        registry.register(Box::new(tx_submitted.clone()))?;
        registry.register(Box::new(tx_confirmed.clone()))?;
        registry.register(Box::new(tx_failed.clone()))?;
        registry.register(Box::new(confirmation_timeouts.clone()))?;
        registry.register(Box::new(fee_fallbacks.clone()))?;
        registry.register(Box::new(checkpoints_written.clone()))?;
        registry.register(Box::new(saga_steps_skipped.clone()))?;
        registry.register(Box::new(tx_prepare_latency.clone()))?;
        registry.register(Box::new(tx_confirm_latency.clone()))?;

        Ok(Self {
            registry,
            tx_submitted,
            tx_confirmed,
            tx_failed,
            confirmation_timeouts,
            fee_fallbacks,
            checkpoints_written,
            saga_steps_skipped,
            tx_prepare_latency,
            tx_confirm_latency,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_failure(&self, category: &str) {
        self.tx_failed.with_label_values(&[category]).inc();
    }

    /// Prometheus text exposition of everything registered
    pub fn export_text(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
