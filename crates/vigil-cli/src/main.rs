//! Command-line driver for Vigil
//!
//! Runs the SOS flow against host effects: a simulated device, an in-memory
//! store and logging SMS/haptics. Useful for demos and for checking a
//! configuration file before shipping it.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vigil_core::config::ConfigLoad;
use vigil_sos::SosConfig;

mod commands;

use commands::{config, message, share, sos};

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Vigil - emergency SOS coordination", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = ".vigil/config.toml")]
    config: PathBuf,

    /// User raising alerts
    #[arg(short, long, global = true, default_value = "local-user")]
    user: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one SOS trigger end to end
    Sos(sos::SosArgs),

    /// Share live location for a while and follow it
    Share(share::ShareArgs),

    /// Print the alert message for a coordinate
    Message(message::MessageArgs),

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let settings = SosConfig::load(Some(cli.config.as_path()))?;

    match cli.command {
        Commands::Sos(args) => sos::run(settings, &cli.user, args).await?,
        Commands::Share(args) => share::run(settings, &cli.user, args).await?,
        Commands::Message(args) => message::run(&settings, &args)?,
        Commands::Config => config::run(&settings)?,
    }

    Ok(())
}
