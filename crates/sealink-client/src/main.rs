// ============================================
// File: crates/sealink-client/src/main.rs
// ============================================
//! # SeaLink Client Entry Point
//!
//! ## Usage
//! ```bash
//! sealink-client send "hello"                      # 127.0.0.1:7300, secure
//! sealink-client send --host 10.0.0.5 --insecure "ping"
//! sealink-client probe --port 7300
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sealink_client::{ClientConfig, ClientConnection};

// ============================================
// CLI Definition
// ============================================

/// SeaLink client
#[derive(Parser, Debug)]
#[command(name = "sealink-client")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send one message and print the reply
    Send {
        #[command(flatten)]
        target: Target,

        /// Send in clear text without a key exchange
        #[arg(long)]
        insecure: bool,

        /// Message body
        message: String,
    },

    /// Check whether the server accepts TCP connections
    Probe {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(&cli.log_level);

    let result = match cli.command {
        Commands::Send {
            target,
            insecure,
            message,
        } => cmd_send(target, insecure, message).await,
        Commands::Probe { target } => cmd_probe(target).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

async fn cmd_send(target: Target, insecure: bool, message: String) -> anyhow::Result<()> {
    let mut config = resolve_config(target).await?;
    if insecure {
        config.secure = false;
    }

    let client = ClientConnection::new(config);
    client.open().await?;
    info!(
        client_id = %client.id(),
        encrypted = client.is_secured_channel(),
        "Connected"
    );

    let reply = client.send(message).await;
    client.close().await?;

    let reply = reply?;
    println!("{}", String::from_utf8_lossy(&reply));
    Ok(())
}

async fn cmd_probe(target: Target) -> anyhow::Result<()> {
    let config = resolve_config(target).await?;
    let client = ClientConnection::new(config);

    if client.is_open().await {
        println!("✅ {} is reachable", client.config().addr());
        Ok(())
    } else {
        anyhow::bail!("{} is unreachable", client.config().addr())
    }
}

// ============================================
// Helper Functions
// ============================================

/// Builds the connection config from an optional file plus CLI overrides.
async fn resolve_config(target: Target) -> anyhow::Result<ClientConfig> {
    let mut config = match &target.config {
        Some(path) => ClientConfig::load(path).await?,
        None => ClientConfig::default(),
    };
    if let Some(host) = target.host {
        config.host = host;
    }
    if let Some(port) = target.port {
        config.port = port;
    }
    config.validate()?;
    Ok(config)
}

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}
