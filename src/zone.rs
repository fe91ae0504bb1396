//! In-memory DNS-SD record table.
//!
//! [`StaticZone`] answers [`DnsLookup`] queries from records held in memory.
//! It records every query it receives and can inject transport failures and
//! per-name latency, which makes the cascade's side effects observable.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::error::QueryError;
use crate::label;
use crate::query::{router_browse_name, service_types_name, DnsLookup, Record, RecordKind};

/// Thread-safe in-memory record table.
#[derive(Debug, Clone, Default)]
pub struct StaticZone {
    inner: Arc<RwLock<ZoneInner>>,
}

#[derive(Debug, Default)]
struct ZoneInner {
    /// (lowercased name, kind) -> answers in insertion order
    records: HashMap<(String, RecordKind), Vec<Record>>,

    /// (lowercased name, kind) pairs that fail with a transport error
    failures: HashSet<(String, RecordKind)>,

    /// lowercased name -> delay applied before answering any kind
    latency: HashMap<String, Duration>,

    /// Delay for names without an entry in `latency`
    default_latency: Option<Duration>,

    /// Queries currently being answered, and the highest value seen
    in_flight: usize,
    peak_in_flight: usize,

    /// Every query received, in arrival order
    log: Vec<(String, RecordKind)>,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl StaticZone {
    /// Create an empty zone.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an answer for `name`.
    pub fn add_record(&self, name: &str, record: Record) {
        let mut inner = self.inner.write();
        trace!(name, kind = %record.kind(), "adding record");
        inner
            .records
            .entry((key(name), record.kind()))
            .or_default()
            .push(record);
    }

    /// Append a PTR answer.
    pub fn add_ptr(&self, name: &str, target: &str) {
        self.add_record(name, Record::Ptr(target.to_string()));
    }

    /// Append an SRV answer.
    pub fn add_srv(&self, name: &str, target: &str, port: u16) {
        self.add_record(
            name,
            Record::Srv {
                target: target.to_string(),
                port,
            },
        );
    }

    /// Append an A answer.
    pub fn add_a(&self, name: &str, addr: Ipv4Addr) {
        self.add_record(name, Record::A(addr));
    }

    /// Append an AAAA answer.
    pub fn add_aaaa(&self, name: &str, addr: Ipv6Addr) {
        self.add_record(name, Record::Aaaa(addr));
    }

    /// Make queries for (`name`, `kind`) fail with a transport error.
    pub fn fail(&self, name: &str, kind: RecordKind) {
        self.inner.write().failures.insert((key(name), kind));
    }

    /// Delay every answer for `name`.
    pub fn set_latency(&self, name: &str, delay: Duration) {
        self.inner.write().latency.insert(key(name), delay);
    }

    /// Delay every answer for names without their own latency.
    pub fn set_default_latency(&self, delay: Duration) {
        self.inner.write().default_latency = Some(delay);
    }

    /// Highest number of queries answered concurrently so far.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.read().peak_in_flight
    }

    /// Every query received so far, in arrival order.
    pub fn queries(&self) -> Vec<(String, RecordKind)> {
        self.inner.read().log.clone()
    }

    /// Number of queries received so far.
    pub fn query_count(&self) -> usize {
        self.inner.read().log.len()
    }

    /// Number of queries received for `name` of `kind`.
    pub fn queries_for(&self, name: &str, kind: RecordKind) -> usize {
        let name = key(name);
        self.inner
            .read()
            .log
            .iter()
            .filter(|(n, k)| key(n) == name && *k == kind)
            .count()
    }

    /// All records as (lowercased owner name, record), for serving the zone
    /// elsewhere.
    pub fn records(&self) -> Vec<(String, Record)> {
        let inner = self.inner.read();
        inner
            .records
            .iter()
            .flat_map(|((name, _), records)| records.iter().map(|r| (name.clone(), r.clone())))
            .collect()
    }

    /// Forget the query log.
    pub fn clear_log(&self) {
        self.inner.write().log.clear();
    }
}

#[async_trait]
impl DnsLookup for StaticZone {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError> {
        let delay = {
            let mut inner = self.inner.write();
            inner.log.push((name.to_string(), kind));
            inner.in_flight += 1;
            inner.peak_in_flight = inner.peak_in_flight.max(inner.in_flight);
            inner
                .latency
                .get(&key(name))
                .copied()
                .or(inner.default_latency)
        };

        let _in_flight = InFlight(&self.inner);

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.read();
        let k = (key(name), kind);
        if inner.failures.contains(&k) {
            return Err(QueryError::Transport {
                name: name.to_string(),
                kind,
                reason: "injected failure".to_string(),
            });
        }
        Ok(inner.records.get(&k).cloned().unwrap_or_default())
    }
}

/// Leaves the in-flight count when a query completes or is dropped.
struct InFlight<'a>(&'a RwLock<ZoneInner>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.write();
        inner.in_flight = inner.in_flight.saturating_sub(1);
    }
}

/// Populates a [`StaticZone`] with DNS-SD browse structures.
///
/// Instance labels are given as display text and stored presentation-encoded.
#[derive(Debug)]
pub struct ZoneBuilder {
    zone: StaticZone,
    domain: String,
}

impl ZoneBuilder {
    /// Start a zone for the fully-qualified `domain`.
    pub fn new(domain: &str) -> Self {
        Self {
            zone: StaticZone::new(),
            domain: domain.to_string(),
        }
    }

    /// Announce a router; returns its fully-qualified name.
    pub fn router(&mut self, label: &str) -> String {
        let router = format!("{}.{}", label, self.domain);
        self.zone
            .add_ptr(&router_browse_name(&self.domain), &router);
        router
    }

    /// Announce a service type at `router`; returns its fully-qualified name.
    pub fn service_type(&mut self, router: &str, ty: &str) -> String {
        let name = format!("{}.{}", ty, router);
        self.zone.add_ptr(&service_types_name(router), &name);
        name
    }

    /// Announce an instance of `service_type`; returns its escaped name.
    pub fn instance(&mut self, service_type: &str, display: &str) -> String {
        let name = format!("{}.{}", label::encode(display), service_type);
        self.zone.add_ptr(service_type, &name);
        name
    }

    /// Announce an instance with an SRV record and host addresses.
    pub fn resolved_instance(
        &mut self,
        service_type: &str,
        display: &str,
        host: &str,
        port: u16,
        ipv6: &[Ipv6Addr],
        ipv4: &[Ipv4Addr],
    ) -> String {
        let name = self.instance(service_type, display);
        self.zone.add_srv(&name, host, port);
        for addr in ipv6 {
            self.zone.add_aaaa(host, *addr);
        }
        for addr in ipv4 {
            self.zone.add_a(host, *addr);
        }
        name
    }

    /// Access the zone while building (e.g. to inject failures).
    pub fn zone(&self) -> &StaticZone {
        &self.zone
    }

    /// Finish building.
    pub fn build(self) -> StaticZone {
        self.zone
    }
}
