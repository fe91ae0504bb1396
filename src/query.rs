//! DNS query layer.
//!
//! [`DnsLookup`] is the only seam between the topology builder and the
//! network. Implementations must keep "no data" (`Ok(vec![])`) and transport
//! failure (`Err`) apart: only the latter may abort a branch.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::xfer::Protocol;
use hickory_proto::ProtoErrorKind;
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{ResolveError, ResolveErrorKind, TokioResolver};
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::{debug, trace};

use crate::config::DiscoveryConfig;
use crate::error::{QueryError, TopologyError};
use crate::label;
use crate::metrics::{self, QueryOutcome, Timer};

/// Record kinds the discovery cascade needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RecordKind {
    /// Browse / enumeration pointer.
    Ptr,
    /// Instance target host and port.
    Srv,
    /// IPv4 address.
    A,
    /// IPv6 address.
    Aaaa,
}

impl RecordKind {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Ptr => "PTR",
            RecordKind::Srv => "SRV",
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
        }
    }

    fn record_type(&self) -> RecordType {
        match self {
            RecordKind::Ptr => RecordType::PTR,
            RecordKind::Srv => RecordType::SRV,
            RecordKind::A => RecordType::A,
            RecordKind::Aaaa => RecordType::AAAA,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One answer record, reduced to what the cascade consumes.
///
/// Names are fully-qualified and in presentation format (escaped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// PTR target.
    Ptr(String),
    /// SRV target and port.
    Srv {
        /// Target host.
        target: String,
        /// Service port.
        port: u16,
    },
    /// A address.
    A(Ipv4Addr),
    /// AAAA address.
    Aaaa(Ipv6Addr),
}

impl Record {
    /// The kind of query this record answers.
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Ptr(_) => RecordKind::Ptr,
            Record::Srv { .. } => RecordKind::Srv,
            Record::A(_) => RecordKind::A,
            Record::Aaaa(_) => RecordKind::Aaaa,
        }
    }
}

/// A source of DNS answers.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// Query `name` for `kind` records.
    ///
    /// Returns an empty list when the name has no such records (NODATA or
    /// NXDOMAIN). Never caches.
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError>;
}

#[async_trait]
impl<T: DnsLookup + ?Sized> DnsLookup for std::sync::Arc<T> {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError> {
        (**self).lookup(name, kind).await
    }
}

/// Browse name enumerating the routers of `domain`.
pub fn router_browse_name(domain: &str) -> String {
    format!("b._dns-sd._udp.{}", domain)
}

/// Browse name enumerating the service types offered at `router`.
pub fn service_types_name(router: &str) -> String {
    format!("_services._dns-sd._udp.{}", router)
}

/// [`DnsLookup`] backed by hickory's tokio resolver, with caching disabled.
pub struct HickoryLookup {
    resolver: TokioResolver,
}

impl HickoryLookup {
    /// Build a resolver from discovery settings.
    ///
    /// Uses the configured nameservers (UDP with TCP fallback), or the system
    /// resolver configuration when none are given.
    pub fn new(config: &DiscoveryConfig) -> Result<Self, TopologyError> {
        let (resolver_config, mut opts) = if config.nameservers.is_empty() {
            hickory_resolver::system_conf::read_system_conf()?
        } else {
            let servers: Vec<NameServerConfig> = config
                .nameservers
                .iter()
                .flat_map(|addr| {
                    [
                        NameServerConfig::new(*addr, Protocol::Udp),
                        NameServerConfig::new(*addr, Protocol::Tcp),
                    ]
                })
                .collect();
            (
                ResolverConfig::from_parts(None, vec![], servers),
                ResolverOpts::default(),
            )
        };

        opts.cache_size = 0;
        opts.ndots = 0;
        opts.timeout = config.query_timeout();
        opts.attempts = config.attempts;

        debug!(
            nameservers = ?config.nameservers,
            timeout = ?opts.timeout,
            attempts = opts.attempts,
            "building resolver"
        );

        let resolver =
            TokioResolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
                .with_options(opts)
                .build();

        Ok(Self { resolver })
    }

    /// Wrap an already configured resolver.
    pub fn from_resolver(resolver: TokioResolver) -> Self {
        Self { resolver }
    }
}

/// True when the server answered NOERROR/NXDOMAIN without matching data.
/// SERVFAIL, REFUSED and friends also surface as "no records" in hickory and
/// must not be mistaken for an empty answer.
fn is_no_data(err: &ResolveError) -> bool {
    match err.kind() {
        ResolveErrorKind::Proto(proto) => matches!(
            proto.kind(),
            ProtoErrorKind::NoRecordsFound { response_code, .. }
                if matches!(*response_code, ResponseCode::NoError | ResponseCode::NXDomain)
        ),
        _ => false,
    }
}

/// Map a resolver error to "empty" or a transport failure.
fn classify(err: ResolveError, name: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError> {
    if is_no_data(&err) {
        return Ok(Vec::new());
    }
    Err(QueryError::Transport {
        name: name.to_string(),
        kind,
        reason: err.to_string(),
    })
}

/// Parse a presentation-format name into a wire [`Name`].
///
/// Each label is unescaped here (`\DDD` is a decimal octet, `\c` is `c`)
/// and handed to hickory as raw octets, so labels are never reinterpreted
/// as hostnames or IDNA.
pub fn wire_name(name: &str) -> Result<Name, QueryError> {
    let invalid = |reason: String| QueryError::InvalidName {
        name: name.to_string(),
        reason,
    };

    let labels = label::split_labels(name).ok_or_else(|| invalid("empty label".to_string()))?;
    let octets = labels
        .iter()
        .map(|l| label::decode_bytes(l))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| invalid(e.to_string()))?;

    let mut wire = Name::from_labels(octets.iter().map(Vec::as_slice))
        .map_err(|e| invalid(e.to_string()))?;
    wire.set_fqdn(true);
    Ok(wire)
}

/// Presentation form of a wire name, escaped with this crate's encoder so
/// octets always come back as `\DDD` decimal escapes.
fn presentation(name: &Name) -> String {
    if name.is_root() {
        return ".".to_string();
    }
    let mut out = name
        .iter()
        .map(label::encode_bytes)
        .collect::<Vec<_>>()
        .join(".");
    if name.is_fqdn() {
        out.push('.');
    }
    out
}

fn convert(data: &RData, kind: RecordKind) -> Option<Record> {
    match (data, kind) {
        (RData::PTR(ptr), RecordKind::Ptr) => Some(Record::Ptr(presentation(&ptr.0))),
        (RData::SRV(srv), RecordKind::Srv) => Some(Record::Srv {
            target: presentation(srv.target()),
            port: srv.port(),
        }),
        (RData::A(a), RecordKind::A) => Some(Record::A(a.0)),
        (RData::AAAA(aaaa), RecordKind::Aaaa) => Some(Record::Aaaa(aaaa.0)),
        _ => None,
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError> {
        let timer = Timer::start();

        let qname = wire_name(name)?;

        trace!(name, kind = %kind, "DNS query");

        let result = match self.resolver.lookup(qname, kind.record_type()).await {
            Ok(lookup) => Ok(lookup
                .record_iter()
                .filter_map(|r| convert(r.data(), kind))
                .collect::<Vec<_>>()),
            Err(err) => classify(err, name, kind),
        };

        match &result {
            Ok(records) if records.is_empty() => {
                trace!(name, kind = %kind, "no records");
                metrics::record_query(kind, QueryOutcome::Empty, timer.elapsed());
            }
            Ok(records) => {
                trace!(name, kind = %kind, count = records.len(), "answered");
                metrics::record_query(kind, QueryOutcome::Answered, timer.elapsed());
            }
            Err(e) => {
                debug!(name, kind = %kind, error = %e, "query failed");
                metrics::record_query(kind, QueryOutcome::Failed, timer.elapsed());
            }
        }

        result
    }
}
