//! dnssd-topology - Walks a DNS-SD browse domain and assembles its topology.
//!
//! Given a root domain, the resolver enumerates the routers announced under
//! it, the service types each router offers, the instances of each type and
//! each instance's endpoint, and returns the result as a tree with stable,
//! traversal-ordered node ids.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        dnssd-topology                        │
//! │                                                              │
//! │  ┌─────────────────┐  PTR/SRV/A/AAAA  ┌──────────────────┐   │
//! │  │ TopologyBuilder │─────────────────▶│ DnsLookup        │   │
//! │  │ (fan-out,       │                  │ (hickory or      │   │
//! │  │  reassembly)    │◀─────────────────│  StaticZone)     │   │
//! │  └───────┬─────────┘     records      └──────────────────┘   │
//! │          │ names / hosts                                     │
//! │          ▼                                                   │
//! │  names::relative_name → label::decode   address::aggregate   │
//! │          │                                                   │
//! │          ▼                                                   │
//! │      Topology ──▶ render_text / serde_json                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use dnssd_topology::{render_text, DiscoveryConfig, TopologyBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DiscoveryConfig::for_domain("example.com.");
//!     let builder = TopologyBuilder::from_config(&config).unwrap();
//!     let topology = builder
//!         .discover_with_timeout(&config.domain, config.traversal_timeout())
//!         .await
//!         .unwrap();
//!     print!("{}", render_text(&topology));
//! }
//! ```

#![warn(missing_docs)]

pub mod address;
pub mod config;
pub mod error;
pub mod label;
pub mod metrics;
pub mod names;
pub mod query;
pub mod render;
pub mod telemetry;
pub mod topology;
pub mod zone;

// Re-export main types
pub use address::{aggregate, AddressSet};
pub use config::{Config, DiscoveryConfig, TelemetryConfig};
pub use error::{LabelError, QueryError, TopologyError};
pub use query::{DnsLookup, HickoryLookup, Record, RecordKind};
pub use render::render_text;
pub use topology::{Endpoint, InstanceNode, RouterNode, ServiceTypeNode, Topology, TopologyBuilder};
pub use zone::{StaticZone, ZoneBuilder};
