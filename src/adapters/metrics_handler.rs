use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

pub struct MetricsCollector {
    registry: Registry,

    // Invocation metrics
    pub invocations_total: CounterVec,
    pub invocation_duration: HistogramVec,
    pub invocations_in_flight: Gauge,

    // Agent run metrics
    pub runs_total: CounterVec,
    pub run_polls: Histogram,
    pub agent_cleanup_failures: Counter,

    // File tool metrics
    pub file_commands_total: CounterVec,
}

impl MetricsCollector {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let invocations_total = CounterVec::new(
            Opts::new("courier_invocations_total", "Total function invocations"),
            &["function", "status"],
        )?;
        registry.register(Box::new(invocations_total.clone()))?;

        let invocation_duration = HistogramVec::new(
            HistogramOpts::new(
                "courier_invocation_duration_seconds",
                "Function invocation duration in seconds",
            )
            .buckets(vec![0.05, 0.25, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
            &["function"],
        )?;
        registry.register(Box::new(invocation_duration.clone()))?;

        let invocations_in_flight = Gauge::new(
            "courier_invocations_in_flight",
            "Number of invocations currently being processed",
        )?;
        registry.register(Box::new(invocations_in_flight.clone()))?;

        let runs_total = CounterVec::new(
            Opts::new("courier_runs_total", "Agent runs by terminal status"),
            &["status"],
        )?;
        registry.register(Box::new(runs_total.clone()))?;

        let run_polls = Histogram::with_opts(
            HistogramOpts::new("courier_run_polls", "Status fetches per agent run")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(run_polls.clone()))?;

        let agent_cleanup_failures = Counter::new(
            "courier_agent_cleanup_failures_total",
            "Agents that could not be deleted after a prompt",
        )?;
        registry.register(Box::new(agent_cleanup_failures.clone()))?;

        let file_commands_total = CounterVec::new(
            Opts::new("courier_file_commands_total", "File commands dispatched"),
            &["outcome"],
        )?;
        registry.register(Box::new(file_commands_total.clone()))?;

        Ok(Self {
            registry,
            invocations_total,
            invocation_duration,
            invocations_in_flight,
            runs_total,
            run_polls,
            agent_cleanup_failures,
            file_commands_total,
        })
    }

    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Count one invocation as in flight until the guard is dropped
    pub fn track_in_flight(&self) -> InFlightGuard {
        self.invocations_in_flight.inc();
        InFlightGuard {
            gauge: self.invocations_in_flight.clone(),
        }
    }
}

/// Decrements the in-flight gauge on drop, including when the request future
/// is cancelled
pub struct InFlightGuard {
    gauge: Gauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

pub struct MetricsHandler {
    collector: Arc<MetricsCollector>,
}

impl MetricsHandler {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }

    pub async fn metrics(&self) -> String {
        self.collector.encode().unwrap_or_else(|e| {
            tracing::error!("Failed to encode metrics: {}", e);
            String::from("# Error encoding metrics\n")
        })
    }
}
