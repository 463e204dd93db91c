//! Cablemon - Cable modem monitor
//!
//! Polls the configured modems, detecting each one's parser, logging in,
//! and reporting channel data as JSON or log lines.

mod config;
mod driver;
mod poller;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use cablemon_auth::ReqwestTransport;
use cablemon_parsers::ParserRegistry;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::driver::Driver;
use crate::poller::Output;

#[derive(Parser, Debug)]
#[command(name = "cablemon")]
#[command(about = "Cable modem signal monitor")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "cablemon.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every modem and print JSON reports on stdout
    Poll {
        /// Poll once and exit
        #[arg(long)]
        once: bool,
    },
    /// List the registered parsers
    ListParsers,
    /// Reboot a configured modem
    Restart {
        /// Modem name from the configuration file
        modem: String,
    },
    /// Poll on the configured interval, logging a summary per modem
    Daemon,
    /// Write an example configuration file
    InitConfig,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn list_parsers() -> Result<()> {
    let parsers = ParserRegistry::global().list_parsers()?;
    println!("{} parsers:", parsers.len());
    for parser in parsers {
        let d = parser.descriptor();
        let capabilities: Vec<&str> = d.capabilities.iter().map(|c| c.as_str()).collect();
        println!(
            "  - {} [{}] priority {}{}",
            d.name,
            d.manufacturer,
            d.priority,
            if d.verified { ", verified" } else { "" }
        );
        println!("    Models: {}", d.models.join(", "));
        if let Some(auth) = &d.auth_config {
            println!("    Auth: {}", auth.strategy);
        }
        if !capabilities.is_empty() {
            println!("    Capabilities: {}", capabilities.join(", "));
        }
    }
    Ok(())
}

async fn restart(config: &config::Config, name: &str) -> Result<()> {
    let modem = config
        .modem(name)
        .cloned()
        .ok_or_else(|| anyhow!("no modem named {:?} in configuration", name))?;

    let restarted = tokio::task::spawn_blocking(move || -> Result<bool> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Driver::new(ParserRegistry::global(), transport).restart(&modem)?)
    })
    .await
    .context("restart task did not complete")??;

    if restarted {
        println!("Restart command sent to {}", name);
    } else {
        println!("{} did not accept the restart command", name);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("Cablemon v{}", env!("CARGO_PKG_VERSION"));

    let command = args.command.unwrap_or(Command::Daemon);
    if let Command::InitConfig = command {
        config::save_default_config(&args.config)?;
        println!("Wrote example configuration to {}", args.config.display());
        return Ok(());
    }
    if let Command::ListParsers = command {
        return list_parsers();
    }

    let config = config::load_config(&args.config)
        .with_context(|| format!("invalid configuration in {}", args.config.display()))?;

    match command {
        Command::Poll { once } => poller::run(&config, Output::Json, once, poller::reqwest_transports()).await,
        Command::Daemon => poller::run(&config, Output::Log, false, poller::reqwest_transports()).await,
        Command::Restart { modem } => restart(&config, &modem).await,
        Command::ListParsers | Command::InitConfig => Ok(()),
    }
}
