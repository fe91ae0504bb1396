//! Shared test infrastructure for topology integration tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, Ipv6Addr};

use dnssd_topology::{InstanceNode, StaticZone, Topology, TopologyBuilder, ZoneBuilder};

// --- Constants ---

pub const DOMAIN: &str = "example.com.";

// --- Address helpers ---

pub fn v6(s: &str) -> Ipv6Addr {
    s.parse().unwrap()
}

pub fn v4(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

// --- Zone fixtures ---

/// One router, one type, one resolved instance:
///
/// ```text
/// r1.example.com.
///   _http._tcp.r1.example.com.
///     Printer\032A._http._tcp.r1.example.com.  SRV host1.r1.example.com.:631
///                                               AAAA fe80::1
/// ```
pub fn printer_zone() -> StaticZone {
    let mut builder = ZoneBuilder::new(DOMAIN);
    let router = builder.router("r1");
    let ty = builder.service_type(&router, "_http._tcp");
    builder.resolved_instance(
        &ty,
        "Printer A",
        "host1.r1.example.com.",
        631,
        &[v6("fe80::1")],
        &[],
    );
    builder.build()
}

/// Two routers with two types each and mixed instances, used to compare
/// trees across concurrency settings.
pub fn campus_zone() -> StaticZone {
    let mut builder = ZoneBuilder::new(DOMAIN);

    let r1 = builder.router("r1");
    let http = builder.service_type(&r1, "_http._tcp");
    builder.resolved_instance(
        &http,
        "Web Admin",
        "admin.r1.example.com.",
        80,
        &[v6("2001:db8::10")],
        &[v4("192.0.2.10")],
    );
    builder.instance(&http, "Stale entry");
    let ipp = builder.service_type(&r1, "_ipp._tcp");
    builder.resolved_instance(
        &ipp,
        "Imprimante étage 2",
        "print.r1.example.com.",
        631,
        &[],
        &[v4("192.0.2.20"), v4("192.0.2.21")],
    );

    let r2 = builder.router("r2");
    let ssh = builder.service_type(&r2, "_ssh._tcp");
    builder.resolved_instance(
        &ssh,
        "Bastion",
        "gw.r2.example.com.",
        22,
        &[v6("2001:db8:2::1"), v6("2001:db8:2::2")],
        &[],
    );
    builder.service_type(&r2, "_smb._tcp");

    builder.build()
}

// --- Traversal helpers ---

pub async fn discover(zone: &StaticZone) -> Topology {
    TopologyBuilder::new(zone.clone())
        .discover(DOMAIN)
        .await
        .expect("traversal failed")
}

pub fn only_instance(topology: &Topology) -> &InstanceNode {
    assert_eq!(topology.routers.len(), 1, "expected one router");
    assert_eq!(topology.routers[0].types.len(), 1, "expected one type");
    assert_eq!(
        topology.routers[0].types[0].instances.len(),
        1,
        "expected one instance"
    );
    &topology.routers[0].types[0].instances[0]
}

pub fn addresses(instance: &InstanceNode) -> Vec<String> {
    instance.addresses.iter().map(|a| a.to_string()).collect()
}

/// Sequence numbers of every sibling list, depth first.
pub fn sibling_sequences(topology: &Topology) -> Vec<Vec<usize>> {
    let mut out = vec![topology.routers.iter().map(|r| r.seq).collect()];
    for router in &topology.routers {
        out.push(router.types.iter().map(|t| t.seq).collect());
        for ty in &router.types {
            out.push(ty.instances.iter().map(|i| i.seq).collect());
        }
    }
    out
}
