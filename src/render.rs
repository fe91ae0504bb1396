//! Text rendering of a [`Topology`] for terminal display.

use std::fmt::Write;

use crate::topology::{Endpoint, InstanceNode, Topology};

/// Shown in place of host and port when an instance has no SRV record.
pub const NOT_FOUND: &str = "Not found.";

/// Render the tree as an indented listing.
///
/// Each router and type line carries its node id so a front end can address
/// it for collapse/expand. Empty levels are spelled out rather than omitted.
pub fn render_text(topology: &Topology) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Domain {}", topology.domain);

    if topology.routers.is_empty() {
        out.push_str("  No routers found.\n");
        return out;
    }

    for router in &topology.routers {
        let _ = writeln!(out, "  [{}] {}", router.id, router.display_name);

        if router.types.is_empty() {
            out.push_str("    No types found.\n");
            continue;
        }

        for ty in &router.types {
            let _ = writeln!(out, "    [{}] {}", ty.id, ty.display_name);

            if ty.instances.is_empty() {
                out.push_str("      No services found.\n");
                continue;
            }

            for instance in &ty.instances {
                let _ = writeln!(out, "      {}", instance_line(instance));
            }
        }
    }

    out
}

fn instance_line(instance: &InstanceNode) -> String {
    let (host, port) = match &instance.endpoint {
        Endpoint::Resolved { host, port } => (
            instance.host_label.clone().unwrap_or_else(|| host.clone()),
            port.to_string(),
        ),
        Endpoint::Unresolved => (NOT_FOUND.to_string(), NOT_FOUND.to_string()),
    };
    format!(
        "{} | host: {} | port: {} | addresses: {}",
        instance.display_name, host, port, instance.addresses
    )
}
