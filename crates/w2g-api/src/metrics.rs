//! Prometheus registry behind `/metrics`.
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Counters shared by all handlers.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests: IntCounterVec,
    pub failures: IntCounterVec,
    pub latency: HistogramVec,
    pub outcomes: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests = IntCounterVec::new(
            Opts::new("w2g_requests_total", "Agent and pipeline invocations"),
            &["endpoint"],
        )?;
        let failures = IntCounterVec::new(
            Opts::new("w2g_failures_total", "Invocations that returned an error"),
            &["endpoint"],
        )?;
        let latency = HistogramVec::new(
            HistogramOpts::new("w2g_latency_seconds", "Invocation latency"),
            &["endpoint"],
        )?;
        let outcomes = IntCounterVec::new(
            Opts::new("w2g_run_outcomes_total", "Pipeline run outcomes by field and value"),
            &["field", "value"],
        )?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        registry.register(Box::new(outcomes.clone()))?;

        Ok(Self {
            registry,
            requests,
            failures,
            latency,
            outcomes,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

pub fn encode(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).to_string())
}
