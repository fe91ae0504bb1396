//! Topology builder: walks routers → service types → instances → endpoints.
//!
//! ```text
//! b._dns-sd._udp.<domain>            PTR  → routers
//! _services._dns-sd._udp.<router>    PTR  → service types
//! <type>                             PTR  → instances
//! <instance>                         SRV  → host, port
//! <host>                             AAAA, A → addresses
//! ```
//!
//! Each level fans out concurrently and is reassembled in PTR answer order,
//! so sequence numbers do not depend on which query finishes first. Only a
//! failure of the router enumeration fails the traversal; deeper failures
//! degrade that branch to empty / unresolved. PTR targets outside the name
//! they were enumerated under are skipped.

use futures::future::join_all;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::address::{aggregate, AddressSet};
use crate::config::DiscoveryConfig;
use crate::error::{QueryError, TopologyError};
use crate::label;
use crate::metrics::{self, Level, Timer};
use crate::names::{fully_qualified, relative_name, strip_parent};
use crate::query::{
    router_browse_name, service_types_name, DnsLookup, HickoryLookup, Record, RecordKind,
};

/// One traversal's result. Self-contained; shares nothing with other calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    /// Fully-qualified browse domain.
    pub domain: String,
    /// Routers in PTR answer order.
    pub routers: Vec<RouterNode>,
}

impl Topology {
    /// Number of routers.
    pub fn router_count(&self) -> usize {
        self.routers.len()
    }

    /// Number of service types across all routers.
    pub fn type_count(&self) -> usize {
        self.routers.iter().map(|r| r.types.len()).sum()
    }

    /// Number of instances across the tree.
    pub fn instance_count(&self) -> usize {
        self.routers
            .iter()
            .flat_map(|r| &r.types)
            .map(|t| t.instances.len())
            .sum()
    }
}

/// A discovered router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouterNode {
    /// Position among routers, from 1.
    pub seq: usize,
    /// Stable address for collapse/expand, e.g. `router-1`.
    pub id: String,
    /// Fully-qualified router name.
    pub name: String,
    /// Router name relative to the domain.
    pub display_name: String,
    /// Service types in PTR answer order.
    pub types: Vec<ServiceTypeNode>,
}

/// A service type offered at one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceTypeNode {
    /// Position within its router, from 1.
    pub seq: usize,
    /// Stable address, e.g. `router-1/type-2`.
    pub id: String,
    /// Fully-qualified type name.
    pub name: String,
    /// Type name relative to the router (`_http._tcp`).
    pub display_name: String,
    /// Instances in PTR answer order.
    pub instances: Vec<InstanceNode>,
}

/// A concrete service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceNode {
    /// Position within its type, from 1.
    pub seq: usize,
    /// Stable address, e.g. `router-1/type-2/instance-3`.
    pub id: String,
    /// Fully-qualified, escaped instance name.
    pub name: String,
    /// Decoded instance label.
    pub display_name: String,
    /// SRV outcome.
    pub endpoint: Endpoint,
    /// Target host relative to the router when it lives under it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_label: Option<String>,
    /// Addresses of the target host; empty when unresolved.
    pub addresses: AddressSet,
}

/// Where an instance can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// First SRV answer.
    Resolved {
        /// Fully-qualified target host.
        host: String,
        /// Target port.
        port: u16,
    },
    /// No SRV record for the instance.
    Unresolved,
}

impl Endpoint {
    /// True for [`Endpoint::Resolved`].
    pub fn is_resolved(&self) -> bool {
        matches!(self, Endpoint::Resolved { .. })
    }
}

impl Serialize for Endpoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Endpoint::Resolved { host, port } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("resolved", &true)?;
                map.serialize_entry("host", host)?;
                map.serialize_entry("port", port)?;
                map.end()
            }
            Endpoint::Unresolved => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("resolved", &false)?;
                map.end()
            }
        }
    }
}

/// Builds [`Topology`] trees from a [`DnsLookup`].
pub struct TopologyBuilder<L> {
    lookup: L,
    max_concurrent_queries: usize,
}

impl TopologyBuilder<HickoryLookup> {
    /// Builder over a hickory resolver configured from `config`.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, TopologyError> {
        config.validate()?;
        Ok(Self::new(HickoryLookup::new(config)?)
            .with_max_concurrent_queries(config.max_concurrent_queries))
    }
}

impl<L: DnsLookup> TopologyBuilder<L> {
    /// Default bound on in-flight queries.
    pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 16;

    /// Create a builder over `lookup`.
    pub fn new(lookup: L) -> Self {
        Self {
            lookup,
            max_concurrent_queries: Self::DEFAULT_MAX_CONCURRENT_QUERIES,
        }
    }

    /// Bound the number of queries in flight during one traversal.
    /// Values below 1 are raised to 1.
    pub fn with_max_concurrent_queries(mut self, limit: usize) -> Self {
        self.max_concurrent_queries = limit.max(1);
        self
    }

    /// The underlying lookup.
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Walk `domain` and assemble its topology. Nothing is cached.
    pub async fn discover(&self, domain: &str) -> Result<Topology, TopologyError> {
        let timer = Timer::start();
        let domain = fully_qualified(domain);
        let traversal = Traversal {
            lookup: &self.lookup,
            permits: Semaphore::new(self.max_concurrent_queries),
        };

        let routers = match traversal
            .ptr_targets(&router_browse_name(&domain), &domain, Level::Routers)
            .await
        {
            Ok(routers) => routers,
            Err(e) => {
                warn!(domain = %domain, error = %e, "router enumeration failed");
                metrics::record_traversal_failure("failed");
                return Err(e.into());
            }
        };
        debug!(domain = %domain, count = routers.len(), "routers enumerated");

        let routers = join_all(
            routers
                .iter()
                .enumerate()
                .map(|(i, name)| traversal.router(i + 1, name, &domain)),
        )
        .await;

        let topology = Topology { domain, routers };
        metrics::record_traversal(
            topology.router_count(),
            topology.type_count(),
            topology.instance_count(),
            timer.elapsed(),
        );
        info!(
            domain = %topology.domain,
            routers = topology.router_count(),
            types = topology.type_count(),
            instances = topology.instance_count(),
            elapsed = ?timer.elapsed(),
            "topology discovered"
        );
        Ok(topology)
    }

    /// [`discover`](Self::discover) bounded by `limit`. On expiry all
    /// in-flight queries are dropped and no partial tree is returned.
    pub async fn discover_with_timeout(
        &self,
        domain: &str,
        limit: Duration,
    ) -> Result<Topology, TopologyError> {
        match tokio::time::timeout(limit, self.discover(domain)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(domain, ?limit, "topology traversal timed out");
                metrics::record_traversal_failure("timed_out");
                Err(TopologyError::TimedOut(limit))
            }
        }
    }
}

/// State of one traversal. Dropped when the traversal ends.
struct Traversal<'a, L> {
    lookup: &'a L,
    permits: Semaphore,
}

impl<L: DnsLookup> Traversal<'_, L> {
    /// One query under the concurrency bound. The permit is released before
    /// the caller fans out, so nested levels never wait on their parents.
    async fn query(&self, name: &str, kind: RecordKind) -> Result<Vec<Record>, QueryError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| QueryError::Transport {
                name: name.to_string(),
                kind,
                reason: e.to_string(),
            })?;
        self.lookup.lookup(name, kind).await
    }

    /// PTR targets of `name` that are proper children of `parent`. Anything
    /// else (the parent itself, a foreign suffix) is skipped.
    async fn ptr_targets(
        &self,
        name: &str,
        parent: &str,
        level: Level,
    ) -> Result<Vec<String>, QueryError> {
        let records = self.query(name, RecordKind::Ptr).await?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r {
                Record::Ptr(target) => Some(target),
                _ => None,
            })
            .filter(|target| {
                let in_scope = strip_parent(target, parent).is_some();
                if !in_scope {
                    warn!(name, target = %target, parent, "PTR target outside its parent, skipping");
                    metrics::record_degraded_branch(level);
                }
                in_scope
            })
            .collect())
    }

    /// PTR enumeration below the root: failures degrade to an empty list.
    async fn children(&self, name: &str, parent: &str, level: Level) -> Vec<String> {
        match self.ptr_targets(name, parent, level).await {
            Ok(children) => children,
            Err(e) => {
                warn!(name, error = %e, "enumeration failed, treating branch as empty");
                metrics::record_degraded_branch(level);
                Vec::new()
            }
        }
    }

    async fn router(&self, seq: usize, name: &str, domain: &str) -> RouterNode {
        let id = format!("router-{}", seq);
        let types = self
            .children(&service_types_name(name), name, Level::Types)
            .await;
        debug!(router = name, count = types.len(), "service types enumerated");

        let types = join_all(
            types
                .iter()
                .enumerate()
                .map(|(i, ty)| self.service_type(i + 1, ty, name, &id)),
        )
        .await;

        RouterNode {
            seq,
            display_name: relative_name(name, domain).to_string(),
            name: name.to_string(),
            id,
            types,
        }
    }

    async fn service_type(
        &self,
        seq: usize,
        name: &str,
        router: &str,
        parent_id: &str,
    ) -> ServiceTypeNode {
        let id = format!("{}/type-{}", parent_id, seq);
        let instances = self.children(name, name, Level::Instances).await;
        debug!(service_type = name, count = instances.len(), "instances enumerated");

        let instances = join_all(
            instances
                .iter()
                .enumerate()
                .map(|(i, instance)| self.instance(i + 1, instance, name, router, &id)),
        )
        .await;

        ServiceTypeNode {
            seq,
            display_name: relative_name(name, router).to_string(),
            name: name.to_string(),
            id,
            instances,
        }
    }

    /// Discovered → HostUnresolved, or Discovered → HostResolved → AddressesKnown.
    async fn instance(
        &self,
        seq: usize,
        name: &str,
        service_type: &str,
        router: &str,
        parent_id: &str,
    ) -> InstanceNode {
        let display_name = label::decode_or_raw(relative_name(name, service_type));
        let mut node = InstanceNode {
            seq,
            id: format!("{}/instance-{}", parent_id, seq),
            name: name.to_string(),
            display_name,
            endpoint: Endpoint::Unresolved,
            host_label: None,
            addresses: AddressSet::empty(),
        };

        let srv = match self.query(name, RecordKind::Srv).await {
            Ok(records) => records,
            Err(e) => {
                warn!(instance = name, error = %e, "SRV lookup failed, leaving unresolved");
                metrics::record_degraded_branch(Level::Service);
                return node;
            }
        };

        let Some((host, port)) = srv.into_iter().find_map(|r| match r {
            Record::Srv { target, port } => Some((target, port)),
            _ => None,
        }) else {
            debug!(instance = name, "no SRV record");
            return node;
        };

        let (ipv6, ipv4) = tokio::join!(
            self.addresses(&host, RecordKind::Aaaa),
            self.addresses(&host, RecordKind::A),
        );
        let v6: Vec<_> = ipv6
            .iter()
            .filter_map(|r| match r {
                Record::Aaaa(ip) => Some(*ip),
                _ => None,
            })
            .collect();
        let v4: Vec<_> = ipv4
            .iter()
            .filter_map(|r| match r {
                Record::A(ip) => Some(*ip),
                _ => None,
            })
            .collect();

        node.addresses = aggregate(&v6, &v4);
        node.host_label = Some(
            strip_parent(&host, router)
                .map(label::decode_or_raw)
                .unwrap_or_else(|| host.clone()),
        );
        debug!(instance = name, host = %host, port, addresses = node.addresses.len(), "instance resolved");
        node.endpoint = Endpoint::Resolved { host, port };
        node
    }

    async fn addresses(&self, host: &str, kind: RecordKind) -> Vec<Record> {
        match self.query(host, kind).await {
            Ok(records) => records,
            Err(e) => {
                warn!(host, kind = %kind, error = %e, "address lookup failed, treating as empty");
                metrics::record_degraded_branch(Level::Addresses);
                Vec::new()
            }
        }
    }
}
