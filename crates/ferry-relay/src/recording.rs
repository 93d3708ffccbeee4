// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; without an installed recorder every call is a no-op.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all relay metric descriptions.
///
/// Called once at startup after the host installs a recorder.
pub fn register_metrics() {
    describe_counter!("ferry_relay_cycles_total", "Relay cycles run, by outcome");
    describe_counter!(
        "ferry_messages_relayed_total",
        "Messages appended to the local log"
    );
    describe_counter!(
        "ferry_forward_outcomes_total",
        "Forward attempts to the destination, by outcome"
    );
    describe_gauge!(
        "ferry_relay_watermark",
        "Highest remote message id processed"
    );
    describe_histogram!("ferry_relay_cycle_seconds", "Relay cycle duration in seconds");
}

/// Record a finished cycle. `outcome` is `ok` or `error`.
pub fn record_cycle(outcome: &'static str, seconds: f64) {
    metrics::counter!("ferry_relay_cycles_total", "outcome" => outcome).increment(1);
    metrics::histogram!("ferry_relay_cycle_seconds").record(seconds);
}

/// Record a message appended to the log.
pub fn record_relayed() {
    metrics::counter!("ferry_messages_relayed_total").increment(1);
}

/// Record one forward attempt.
pub fn record_forward(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "failed" };
    metrics::counter!("ferry_forward_outcomes_total", "outcome" => outcome).increment(1);
}

/// Publish the current watermark.
pub fn set_watermark(watermark: i64) {
    metrics::gauge!("ferry_relay_watermark").set(watermark as f64);
}
