//! Command-line front end for the module registry.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use dynmod::config::ManagerConfig;
use dynmod::module::{LogEventSink, ManifestProvider, ModuleRegistry};
use dynmod::state::JsonStateStore;

#[derive(Parser)]
#[command(name = "dynmod", about = "Runtime feature-module manager", version)]
struct Cli {
    /// Path to the manager configuration file
    #[arg(long, default_value = "dynmod.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show every known module and its enabled state
    Status,
    /// Enable one or more modules, in the order given
    Enable {
        /// Module names (at most three)
        #[arg(required = true, num_args = 1..=3)]
        names: Vec<String>,
        /// Disable everything else first
        #[arg(long)]
        only: bool,
    },
    /// Disable a module
    Disable { name: String },
    /// Disable every enabled module
    DisableAll,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = if Path::new(&cli.config).exists() {
        ManagerConfig::from_file(&cli.config)
            .with_context(|| format!("failed to load config from {}", cli.config))?
    } else {
        ManagerConfig::default()
    };

    let store = JsonStateStore::open(&config.state_file)
        .with_context(|| format!("failed to open state file {}", config.state_file))?;
    let registry = ModuleRegistry::new(Box::new(store), Arc::new(LogEventSink));

    let mut provider = ManifestProvider::new(&config.modules_dir);
    let discovered = registry.discover(&mut provider).await;
    info!("Module registry ready with {} modules", discovered.len());

    match cli.command {
        Command::Status => {
            for status in registry.status().await {
                println!(
                    "{:<24} {}",
                    status.name,
                    if status.enabled { "enabled" } else { "disabled" }
                );
            }
        }
        Command::Enable { names, only } => {
            if names.len() == 1 && !only {
                registry.enable(&names[0]).await?;
            } else {
                registry.enable_set(&names, only).await?;
            }
        }
        Command::Disable { name } => {
            registry.disable(&name).await?;
        }
        Command::DisableAll => {
            let count = registry.disable_all().await?;
            info!("Disabled {} modules", count);
        }
    }

    registry.unload().await;
    Ok(())
}
