//! Tracking counters
//!
//! Every counter is kept locally (for snapshots and tests) and mirrored to the
//! `metrics` facade, which is a no-op unless the host installs a recorder.

use metrics::{counter, describe_counter};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for position and route handling
#[derive(Debug, Default)]
pub struct MapMetrics {
    positions_applied: AtomicU64,
    positions_discarded: AtomicU64,
    routes_discarded: AtomicU64,
    reports_failed: AtomicU64,
}

impl MapMetrics {
    pub fn new() -> Self {
        describe_counter!(
            "courier_positions_applied_total",
            "Position samples applied to the courier marker"
        );
        describe_counter!(
            "courier_positions_discarded_total",
            "Position samples discarded as stale"
        );
        describe_counter!(
            "courier_routes_discarded_total",
            "Route responses discarded because a newer request superseded them"
        );
        describe_counter!(
            "courier_position_reports_failed_total",
            "Position reports the sink failed to accept"
        );

        Self::default()
    }

    pub fn record_position_applied(&self) {
        self.positions_applied.fetch_add(1, Ordering::Relaxed);
        counter!("courier_positions_applied_total").increment(1);
    }

    pub fn record_position_discarded(&self) {
        self.positions_discarded.fetch_add(1, Ordering::Relaxed);
        counter!("courier_positions_discarded_total").increment(1);
    }

    pub fn record_route_discarded(&self) {
        self.routes_discarded.fetch_add(1, Ordering::Relaxed);
        counter!("courier_routes_discarded_total").increment(1);
    }

    pub fn record_report_failed(&self) {
        self.reports_failed.fetch_add(1, Ordering::Relaxed);
        counter!("courier_position_reports_failed_total").increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            positions_applied: self.positions_applied.load(Ordering::Relaxed),
            positions_discarded: self.positions_discarded.load(Ordering::Relaxed),
            routes_discarded: self.routes_discarded.load(Ordering::Relaxed),
            reports_failed: self.reports_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub positions_applied: u64,
    pub positions_discarded: u64,
    pub routes_discarded: u64,
    pub reports_failed: u64,
}
