//! Metrics instrumentation for dnssd-topology.
//!
//! All metrics are prefixed with `dnssd_topology.`

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

use crate::query::RecordKind;

/// Record a DNS query.
pub fn record_query(kind: RecordKind, outcome: QueryOutcome, duration: Duration) {
    let outcome_str = match outcome {
        QueryOutcome::Answered => "answered",
        QueryOutcome::Empty => "empty",
        QueryOutcome::Failed => "failed",
    };

    counter!("dnssd_topology.query.count", "kind" => kind.as_str(), "outcome" => outcome_str)
        .increment(1);
    histogram!("dnssd_topology.query.duration.seconds", "kind" => kind.as_str())
        .record(duration.as_secs_f64());
}

/// Query outcome for metrics.
#[derive(Debug, Clone, Copy)]
pub enum QueryOutcome {
    /// At least one matching record.
    Answered,
    /// Completed with no matching data.
    Empty,
    /// Transport failure.
    Failed,
}

/// Record a branch dropped or rendered empty because its query failed or
/// answered outside its parent.
pub fn record_degraded_branch(level: Level) {
    let level_str = match level {
        Level::Routers => "routers",
        Level::Types => "types",
        Level::Instances => "instances",
        Level::Service => "service",
        Level::Addresses => "addresses",
    };

    counter!("dnssd_topology.branch.degraded.count", "level" => level_str).increment(1);
}

/// Cascade levels.
#[derive(Debug, Clone, Copy)]
pub enum Level {
    /// Router enumeration under the browse domain.
    Routers,
    /// Service-type enumeration at a router.
    Types,
    /// Instance enumeration for a type.
    Instances,
    /// SRV lookup for an instance.
    Service,
    /// A/AAAA lookup for a target host.
    Addresses,
}

/// Record a finished traversal and the size of its tree.
pub fn record_traversal(routers: usize, types: usize, instances: usize, duration: Duration) {
    counter!("dnssd_topology.traversal.count", "result" => "ok").increment(1);
    histogram!("dnssd_topology.traversal.duration.seconds").record(duration.as_secs_f64());
    gauge!("dnssd_topology.topology.routers").set(routers as f64);
    gauge!("dnssd_topology.topology.types").set(types as f64);
    gauge!("dnssd_topology.topology.instances").set(instances as f64);
}

/// Record a traversal that produced no tree.
pub fn record_traversal_failure(reason: &'static str) {
    counter!("dnssd_topology.traversal.count", "result" => reason).increment(1);
}

/// Helper for timing operations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed duration since timer start.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
