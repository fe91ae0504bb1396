//! dnssd-topology binary entry point.

use clap::{Parser, ValueEnum};
use dnssd_topology::{render_text, telemetry, Config, TopologyBuilder};
use std::path::PathBuf;
use tracing::{error, info};

/// Walk a DNS-SD browse domain and print its router / service topology.
#[derive(Parser, Debug)]
#[command(name = "dnssd-topology")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML).
    #[arg(short, long, default_value = "dnssd-topology.toml")]
    config: PathBuf,

    /// Browse domain; overrides `discovery.domain`.
    #[arg(short, long)]
    domain: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // A missing config file is fine when the domain comes from the command line.
    let config_path =
        (args.config.exists() || args.domain.is_none()).then_some(args.config.as_path());
    let config = Config::load(config_path, args.domain.as_deref())?;

    // Initialize telemetry
    telemetry::init(&config.telemetry).map_err(|e| e as Box<dyn std::error::Error>)?;

    info!(
        config_file = %args.config.display(),
        domain = %config.discovery.domain,
        nameservers = ?config.discovery.nameservers,
        "Starting topology discovery"
    );

    let builder = TopologyBuilder::from_config(&config.discovery)?;
    let result = builder
        .discover_with_timeout(&config.discovery.domain, config.discovery.traversal_timeout())
        .await;

    let topology = match result {
        Ok(topology) => topology,
        Err(e) => {
            error!("Topology discovery failed: {}", e);
            return Err(e.into());
        }
    };

    match args.format {
        Format::Text => print!("{}", render_text(&topology)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&topology)?),
    }

    Ok(())
}
