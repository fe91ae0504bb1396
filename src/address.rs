//! Address aggregation for a resolved SRV target.

use serde::{Serialize, Serializer};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Addresses of one host, IPv6 first, in resolver order.
///
/// Empty means the host resolved to no address, which is not the same as
/// an unresolved endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet(Vec<IpAddr>);

impl AddressSet {
    /// An empty set.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Addresses in display order.
    pub fn as_slice(&self) -> &[IpAddr] {
        &self.0
    }

    /// Number of addresses, duplicates included.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the host resolved to nothing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in display order.
    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.0.iter()
    }
}

impl fmt::Display for AddressSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, addr) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", addr)?;
        }
        Ok(())
    }
}

impl Serialize for AddressSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|a| a.to_string()))
    }
}

/// Concatenate IPv6 then IPv4 literals, each in the order received.
///
/// No sorting and no deduplication: display order mirrors the resolver.
pub fn aggregate(ipv6: &[Ipv6Addr], ipv4: &[Ipv4Addr]) -> AddressSet {
    let addrs = ipv6
        .iter()
        .copied()
        .map(IpAddr::V6)
        .chain(ipv4.iter().copied().map(IpAddr::V4))
        .collect();
    AddressSet(addrs)
}
