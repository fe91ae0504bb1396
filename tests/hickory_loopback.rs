//! Real UDP/TCP loopback tests for the hickory-backed lookup.
//!
//! A `StaticZone` is served by a hickory `ServerFuture` on 127.0.0.1, and the
//! topology is discovered through `HickoryLookup` so the wire path (escaped
//! labels, NXDOMAIN vs NOERROR, transport failures) is exercised end to end.
//!
//! **Requires:** feature flag `integration-server`.
//!
//! Run with:
//! ```sh
//! cargo test --test hickory_loopback --features integration-server
//! ```

#![cfg(feature = "integration-server")]

mod common;

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA, PTR, SOA, SRV};
use hickory_proto::rr::{DNSClass, LowerName, RData, RecordSet, RecordType};
use hickory_server::authority::{
    Authority, AuthorityObject, Catalog, LookupControlFlow, LookupError, LookupOptions,
    LookupRecords, MessageRequest, UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use hickory_server::ServerFuture;
use tokio::net::{TcpListener, UdpSocket};

use common::*;
use dnssd_topology::query::wire_name;
use dnssd_topology::{
    DiscoveryConfig, DnsLookup, Endpoint, HickoryLookup, QueryError, Record, RecordKind,
    StaticZone, TopologyBuilder,
};

const TTL: u32 = 60;

// =========================================================================
// Infrastructure
// =========================================================================

/// Read-only authority answering from a snapshot of a `StaticZone`.
struct ZoneAuthority {
    origin: LowerName,
    rrsets: HashMap<(LowerName, RecordType), Arc<RecordSet>>,
    names: HashSet<LowerName>,
}

impl ZoneAuthority {
    fn new(origin: &str, zone: &StaticZone) -> Self {
        let origin_name = wire_name(origin).expect("bad origin");
        let mut sets: HashMap<(LowerName, RecordType), RecordSet> = HashMap::new();

        for (owner, record) in zone.records() {
            let name = wire_name(&owner).expect("bad owner name");
            let rdata = to_rdata(&record);
            let rtype = rdata.record_type();
            let mut rr = hickory_proto::rr::Record::from_rdata(name.clone(), TTL, rdata);
            rr.set_dns_class(DNSClass::IN);
            sets.entry((LowerName::from(name.clone()), rtype))
                .or_insert_with(|| RecordSet::new(name.clone(), rtype, 0))
                .insert(rr, 0);
        }

        let soa = SOA::new(
            wire_name("ns.example.com.").expect("bad mname"),
            wire_name("hostmaster.example.com.").expect("bad rname"),
            1,
            3600,
            600,
            86400,
            TTL,
        );
        let mut soa_set = RecordSet::new(origin_name.clone(), RecordType::SOA, 0);
        soa_set.insert(
            hickory_proto::rr::Record::from_rdata(origin_name.clone(), TTL, RData::SOA(soa)),
            0,
        );
        sets.insert((LowerName::from(origin_name.clone()), RecordType::SOA), soa_set);

        let names = sets.keys().map(|(name, _)| name.clone()).collect();
        Self {
            origin: LowerName::from(origin_name.clone()),
            rrsets: sets.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
            names,
        }
    }
}

fn to_rdata(record: &Record) -> RData {
    let name = |s: &str| wire_name(s).expect("bad target name");
    match record {
        Record::Ptr(target) => RData::PTR(PTR(name(target))),
        Record::Srv { target, port } => RData::SRV(SRV::new(0, 0, *port, name(target))),
        Record::A(ip) => RData::A(A::from(*ip)),
        Record::Aaaa(ip) => RData::AAAA(AAAA::from(*ip)),
    }
}

#[async_trait]
impl Authority for ZoneAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        match self.rrsets.get(&(name.clone(), rtype)) {
            Some(set) => LookupControlFlow::Break(Ok(LookupRecords::new(
                lookup_options,
                set.clone(),
            ))),
            None if self.names.contains(name) => {
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
            }
            None => LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NXDomain))),
        }
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        Authority::lookup(
            self,
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        Err(ResponseCode::NotImp)
    }
}

/// A DNS server for one zone on a random loopback port.
struct TestServer {
    addr: SocketAddr,
    _shutdown: tokio::sync::oneshot::Sender<()>,
}

impl TestServer {
    async fn start(zone: &StaticZone) -> Self {
        let authority = ZoneAuthority::new(DOMAIN, zone);
        let origin = Authority::origin(&authority).clone();
        let authority: Arc<dyn AuthorityObject> = Arc::new(authority);
        let mut catalog = Catalog::new();
        catalog.upsert(origin, vec![authority]);

        let udp_socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("failed to bind UDP socket");
        let addr = udp_socket.local_addr().expect("failed to get local addr");
        let tcp_listener = TcpListener::bind(addr)
            .await
            .expect("failed to bind TCP listener");

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let mut server = ServerFuture::new(catalog);
            server.register_socket(udp_socket);
            server.register_listener(tcp_listener, Duration::from_secs(5));

            tokio::select! {
                result = server.block_until_done() => {
                    if let Err(e) = result {
                        eprintln!("server error: {}", e);
                    }
                }
                _ = rx => {}
            }
        });

        // Give the server a moment to start accepting packets.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            addr,
            _shutdown: tx,
        }
    }
}

fn lookup_for(addr: SocketAddr) -> HickoryLookup {
    let config = DiscoveryConfig {
        nameservers: vec![addr],
        query_timeout_ms: 500,
        attempts: 1,
        ..DiscoveryConfig::for_domain(DOMAIN)
    };
    HickoryLookup::new(&config).expect("failed to build resolver")
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn loopback_printer_scenario() {
    let zone = printer_zone();
    let server = TestServer::start(&zone).await;

    let topology = TopologyBuilder::new(lookup_for(server.addr))
        .discover(DOMAIN)
        .await
        .expect("traversal failed");

    let instance = only_instance(&topology);
    assert_eq!(topology.routers[0].display_name, "r1");
    assert_eq!(topology.routers[0].types[0].display_name, "_http._tcp");
    assert_eq!(instance.display_name, "Printer A");
    assert_eq!(instance.name, r"Printer\032A._http._tcp.r1.example.com.");
    assert_eq!(
        instance.endpoint,
        Endpoint::Resolved {
            host: "host1.r1.example.com.".to_string(),
            port: 631
        }
    );
    assert_eq!(instance.host_label.as_deref(), Some("host1"));
    assert_eq!(addresses(instance), ["fe80::1"]);
}

#[tokio::test]
async fn loopback_escaped_instance_names_are_queried_as_octets() {
    let zone = campus_zone();
    let server = TestServer::start(&zone).await;
    let lookup = lookup_for(server.addr);

    let printer = lookup
        .lookup(r"Printer\032A._http._tcp.r1.example.com.", RecordKind::Srv)
        .await;
    // Not in the campus zone: answered NXDOMAIN, not rejected locally.
    assert_eq!(printer, Ok(Vec::new()));

    let ipp = lookup
        .lookup(
            r"Imprimante\032\195\169tage\0322._ipp._tcp.r1.example.com.",
            RecordKind::Srv,
        )
        .await;
    assert_eq!(
        ipp,
        Ok(vec![Record::Srv {
            target: "print.r1.example.com.".to_string(),
            port: 631
        }])
    );

    let instances = lookup
        .lookup("_http._tcp.r1.example.com.", RecordKind::Ptr)
        .await
        .unwrap();
    assert_eq!(
        instances,
        [
            Record::Ptr(r"Web\032Admin._http._tcp.r1.example.com.".to_string()),
            Record::Ptr(r"Stale\032entry._http._tcp.r1.example.com.".to_string()),
        ]
    );
}

#[tokio::test]
async fn loopback_campus_matches_in_memory_tree() {
    let zone = campus_zone();
    let server = TestServer::start(&zone).await;

    let over_wire = TopologyBuilder::new(lookup_for(server.addr))
        .discover(DOMAIN)
        .await
        .expect("traversal failed");
    let in_memory = discover(&zone).await;

    assert_eq!(over_wire, in_memory);
    assert_eq!(
        over_wire.routers[0].types[1].instances[0].display_name,
        "Imprimante étage 2"
    );
}

#[tokio::test]
async fn loopback_nxdomain_and_nodata_are_empty() {
    let zone = printer_zone();
    let server = TestServer::start(&zone).await;
    let lookup = lookup_for(server.addr);

    let nxdomain = lookup
        .lookup("missing.r1.example.com.", RecordKind::Srv)
        .await;
    assert_eq!(nxdomain, Ok(Vec::new()));

    // host1 has AAAA but no A.
    let nodata = lookup.lookup("host1.r1.example.com.", RecordKind::A).await;
    assert_eq!(nodata, Ok(Vec::new()));
}

#[tokio::test]
async fn loopback_unreachable_server_is_transport_error() {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    drop(socket);

    let lookup = lookup_for(addr);
    let result = lookup
        .lookup("b._dns-sd._udp.example.com.", RecordKind::Ptr)
        .await;
    assert!(
        matches!(result, Err(QueryError::Transport { kind: RecordKind::Ptr, .. })),
        "got {:?}",
        result
    );

    let traversal = TopologyBuilder::new(lookup).discover(DOMAIN).await;
    assert!(traversal.is_err());
}
