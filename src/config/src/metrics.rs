// Copyright 2025 OpenObserve Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use once_cell::sync::Lazy;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

pub const NAMESPACE: &str = "oab";

// stream ingest, labelled by topic
pub static RECORDS_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("records_received", "Stream records received").namespace(NAMESPACE),
        &["topic"],
    )
    .expect("Metric created")
});
pub static RECORDS_PARSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("records_parsed", "Stream records decoded successfully").namespace(NAMESPACE),
        &["topic"],
    )
    .expect("Metric created")
});
pub static RECORD_PARSE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("record_parse_errors", "Stream records dropped on decode failure")
            .namespace(NAMESPACE),
        &["topic"],
    )
    .expect("Metric created")
});
pub static TOMBSTONES_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tombstones_received", "Null-payload tombstone records received")
            .namespace(NAMESPACE),
        &["topic"],
    )
    .expect("Metric created")
});

// alert egress
pub static ALERTS_SENT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("alerts_sent", "Alerts accepted by the alertmanager").namespace(NAMESPACE),
    )
    .expect("Metric created")
});
pub static ALERTS_FAILED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new("alerts_failed", "Alerts dropped after exhausting retries").namespace(NAMESPACE),
    )
    .expect("Metric created")
});
pub static ALERT_SEND_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("alert_send_duration_seconds", "Alertmanager POST latency")
            .namespace(NAMESPACE)
            .buckets(vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("Metric created")
});

// cache sizes
pub static ACTIVE_ALARMS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("active_alarms", "Entries in the active alarm table").namespace(NAMESPACE),
    )
    .expect("Metric created")
});
pub static CACHED_NODES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("cached_nodes", "Entries in the node cache").namespace(NAMESPACE),
    )
    .expect("Metric created")
});

pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(RECORDS_RECEIVED.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(RECORDS_PARSED.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(RECORD_PARSE_ERRORS.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(TOMBSTONES_RECEIVED.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(ALERTS_SENT.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(ALERTS_FAILED.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(ALERT_SEND_DURATION.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(ACTIVE_ALARMS.clone()))
        .expect("Metric registered");
    registry
        .register(Box::new(CACHED_NODES.clone()))
        .expect("Metric registered");
}

/// Render the registry in the prometheus text exposition format.
pub fn gather() -> String {
    TextEncoder::new()
        .encode_to_string(&REGISTRY.gather())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        RECORDS_RECEIVED.with_label_values(&["alarms"]).inc();
        ALERTS_SENT.inc();
        ACTIVE_ALARMS.set(3);
        let body = gather();
        assert!(body.contains("oab_records_received"));
        assert!(body.contains("oab_alerts_sent"));
        assert!(body.contains("oab_active_alarms 3"));
    }
}
