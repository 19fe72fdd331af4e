//! Process-wide Prometheus metrics (spec §2 C6, SPEC_FULL §3 "Metrics").

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    pub deployments_created_total: IntCounter,
    pub deployments_ready_total: IntCounter,
    pub deployments_failed_total: IntCounter,
    pub webhook_delivery_failures_total: IntCounter,
    pub provider_capacity_errors_total: IntCounter,
    pub time_to_ready_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let deployments_created_total =
            IntCounter::new("deployments_created_total", "Deployments created").unwrap();
        let deployments_ready_total =
            IntCounter::new("deployments_ready_total", "Deployments that reached ready").unwrap();
        let deployments_failed_total =
            IntCounter::new("deployments_failed_total", "Deployments that reached failed").unwrap();
        let webhook_delivery_failures_total = IntCounter::new(
            "webhook_delivery_failures_total",
            "User webhook deliveries that exhausted retries",
        )
        .unwrap();
        let provider_capacity_errors_total = IntCounter::new(
            "provider_capacity_errors_total",
            "Capacity errors encountered while creating provider endpoints",
        )
        .unwrap();
        let time_to_ready_seconds = Histogram::with_opts(HistogramOpts::new(
            "time_to_ready_seconds",
            "Seconds from deployment creation to ready",
        ))
        .unwrap();

        registry
            .register(Box::new(deployments_created_total.clone()))
            .unwrap();
        registry
            .register(Box::new(deployments_ready_total.clone()))
            .unwrap();
        registry
            .register(Box::new(deployments_failed_total.clone()))
            .unwrap();
        registry
            .register(Box::new(webhook_delivery_failures_total.clone()))
            .unwrap();
        registry
            .register(Box::new(provider_capacity_errors_total.clone()))
            .unwrap();
        registry
            .register(Box::new(time_to_ready_seconds.clone()))
            .unwrap();

        Self {
            registry,
            deployments_created_total,
            deployments_ready_total,
            deployments_failed_total,
            webhook_delivery_failures_total,
            provider_capacity_errors_total,
            time_to_ready_seconds,
        }
    }

    /// Render all metrics in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder.encode(&metric_families, &mut buf).unwrap();
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
