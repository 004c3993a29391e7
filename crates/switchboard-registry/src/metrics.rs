//! Registry metrics.
//!
//! Uses the global OpenTelemetry meter provider, which the host application
//! may install. Without one the instruments are no-ops.

use opentelemetry::metrics::{Counter, Gauge, Meter};
use opentelemetry::KeyValue;
use std::sync::OnceLock;

static METER: OnceLock<Meter> = OnceLock::new();

fn meter() -> &'static Meter {
    METER.get_or_init(|| opentelemetry::global::meter("switchboard-registry"))
}

/// Gauge for registered connections.
pub fn connections_active() -> Gauge<i64> {
    meter()
        .i64_gauge("switchboard.connections.active")
        .with_description("Current number of registered connections")
        .with_unit("connection")
        .build()
}

/// Counter for broadcasts issued.
pub fn broadcasts() -> Counter<u64> {
    meter()
        .u64_counter("switchboard.broadcasts")
        .with_description("Total broadcasts issued")
        .with_unit("broadcast")
        .build()
}

/// Counter for failed per-connection deliveries.
pub fn deliveries_failed() -> Counter<u64> {
    meter()
        .u64_counter("switchboard.deliveries.failed")
        .with_description("Total per-connection deliveries that could not be queued")
        .with_unit("message")
        .build()
}

/// Record the current number of registered connections.
pub fn record_connection_count(count: usize) {
    connections_active().record(count as i64, &[]);
}

/// Record a completed broadcast fan-out.
pub fn record_broadcast(attempted: usize, failed: usize) {
    broadcasts().add(1, &[]);
    if failed > 0 {
        deliveries_failed().add(failed as u64, &[KeyValue::new("path", "broadcast")]);
    }
    tracing::trace!(attempted, failed, "Recorded broadcast metrics");
}

/// Record a failed targeted delivery.
pub fn record_targeted_failure(reason: &str) {
    deliveries_failed().add(
        1,
        &[
            KeyValue::new("path", "targeted"),
            KeyValue::new("reason", reason.to_string()),
        ],
    );
}
