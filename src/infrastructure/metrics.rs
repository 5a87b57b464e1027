//! Prometheus metrics

use crate::domain::shared::error::DomainError;
use crate::domain::shared::result::Result;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the Prometheus recorder and describe every metric.
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("phone_tick_duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1],
        )
        .map_err(|e| DomainError::Config(e.to_string()))?
        .install_recorder()
        .map_err(|e| DomainError::Config(e.to_string()))?;

    describe_counter!(
        "phone_numbers_allocated_total",
        "Total number of phone numbers handed out"
    );
    describe_gauge!(
        "phone_numbers_registered",
        "Number of phone numbers currently registered"
    );
    describe_counter!(
        "phone_messages_routed_total",
        "Messages routed by the directory, by message type"
    );
    describe_counter!(
        "phone_calls_total",
        "Outgoing calls placed, by outcome"
    );
    describe_gauge!(
        "phone_relay_entries",
        "Relay entries currently held by a client"
    );
    describe_counter!(
        "phone_relay_pruned_total",
        "Relay entries dropped for range or vanished sources"
    );
    describe_histogram!(
        "phone_tick_duration_seconds",
        "Duration of one client tick in seconds"
    );

    Ok(handle)
}

pub fn record_number_allocated() {
    counter!("phone_numbers_allocated_total").increment(1);
}

pub fn update_registered_numbers(count: usize) {
    gauge!("phone_numbers_registered").set(count as f64);
}

pub fn record_message_routed(kind: &str) {
    counter!("phone_messages_routed_total", "type" => kind.to_string()).increment(1);
}

/// Outcome is one of `routed`, `invalid` or `busy`
pub fn record_call(outcome: &str) {
    counter!("phone_calls_total", "outcome" => outcome.to_string()).increment(1);
}

pub fn update_relay_entries(client: &str, count: usize) {
    gauge!("phone_relay_entries", "client" => client.to_string()).set(count as f64);
}

pub fn record_relay_pruned(count: usize) {
    counter!("phone_relay_pruned_total").increment(count as u64);
}

pub fn record_tick(duration: std::time::Duration) {
    histogram!("phone_tick_duration_seconds").record(duration.as_secs_f64());
}

/// Timer for measuring durations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
