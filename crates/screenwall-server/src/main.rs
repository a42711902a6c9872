//! Screenwall server binary.
//!
//! # Usage
//!
//! ```bash
//! # Default four screens, self-signed certificate (development)
//! screenwall-server --bind 0.0.0.0:4433
//!
//! # Custom screens and TLS certificate (production)
//! screenwall-server --cert cert.pem --key key.pem --screen left --screen right
//! ```

use clap::Parser;
use screenwall_core::{CoordinatorConfig, ScreenRegistry};
use screenwall_server::{DriverConfig, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Screen occupancy server
#[derive(Parser, Debug)]
#[command(name = "screenwall-server")]
#[command(about = "Coordinates who occupies which shared screen")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:4433")]
    bind: String,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Screen id to serve (repeatable)
    #[arg(long = "screen", value_name = "ID", default_values_t = ScreenRegistry::DEFAULT_SCREENS.map(String::from))]
    screens: Vec<String>,

    /// Name shown for claimants that do not give one
    #[arg(long, default_value = CoordinatorConfig::DEFAULT_PLACEHOLDER_NAME)]
    placeholder_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Screenwall server starting");
    tracing::info!("Binding to {}", args.bind);

    if args.cert.is_none() || args.key.is_none() {
        tracing::warn!("No TLS certificate provided - using self-signed certificate");
    }

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        cert_path: args.cert,
        key_path: args.key,
        driver: DriverConfig {
            max_connections: args.max_connections,
            screens: args.screens,
            placeholder_name: args.placeholder_name,
        },
    };

    let server = Server::bind(config)?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
