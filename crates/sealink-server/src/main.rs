// ============================================
// File: crates/sealink-server/src/main.rs
// ============================================
//! # SeaLink Server Entry Point
//!
//! ## Creation Reason
//! Main entry point for the SeaLink server binary.
//! Handles CLI parsing, logging setup, and listener startup.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Listener execution until Ctrl-C
//!
//! ## Usage
//! ```bash
//! sealink-server start                         # Run with /etc/sealink/server.toml
//! sealink-server start --config ./server.toml
//! sealink-server validate --config ./server.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The binary registers no application handler; every data message is
//!   acknowledged with "true" (useful as a liveness endpoint)
//! - `RUST_LOG` overrides `logging.level`
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sealink_server::{Listener, ServerConfig};

// ============================================
// CLI Definition
// ============================================

/// SeaLink encrypted message server
#[derive(Parser, Debug)]
#[command(name = "sealink-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the server
    Start {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/sealink/server.toml")]
        config: PathBuf,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/sealink/server.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging("info");

    let result = match cli.command {
        Commands::Start { config } => cmd_start(config).await,
        Commands::Validate { config } => cmd_validate(config).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Starts the listener and runs until Ctrl-C.
async fn cmd_start(config_path: PathBuf) -> anyhow::Result<()> {
    info!("Starting SeaLink server...");

    let config = if config_path.exists() {
        ServerConfig::load(&config_path).await?
    } else {
        info!("Config file not found, using defaults");
        ServerConfig::default()
    };

    // Re-initialize logging with config level
    init_logging(&config.logging.level);

    let listener = Listener::new(config);
    let addr = listener.open().await?;

    if let Some(key) = listener.public_key() {
        info!(addr = %addr, fingerprint = %key, "Server ready");
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C, shutting down"),
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }

    listener.close().await?;
    info!(
        live_sessions = listener.clients_count(),
        "Server stopped"
    );
    Ok(())
}

/// Validates a configuration file and prints a summary.
async fn cmd_validate(config_path: PathBuf) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Server will use default values.");
        return Ok(());
    }

    let config = ServerConfig::load(&config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Network:");
    println!("   Listen:     {}", config.listen_addr());
    println!();
    println!("Keys:");
    println!("   RSA Bits:   {}", config.keys.rsa_bits);
    println!();
    println!("Limits:");
    println!("   Max Sessions:  {}", config.max_sessions());
    println!();
    println!("Logging:");
    println!("   Level:      {}", config.logging.level);
    println!();

    Ok(())
}

// ============================================
// Helper Functions
// ============================================

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
