//! mesh-commander CLI entrypoint.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;

use mesh_commander::config::{self, Config, EXAMPLE_CONFIG};
use mesh_commander::dispatch::{ActionTable, Dispatcher};
use mesh_commander::executor::ProcessExecutor;
use mesh_commander::logging::{self, LogMode};
use mesh_commander::mesh::bridge::BridgeTransport;
use mesh_commander::mesh::console::ConsoleTransport;
use mesh_commander::mesh::{EventStream, MeshTransport};

#[derive(Debug, Parser)]
#[command(
    name = "mesh-commander",
    version,
    about = "Keyword-triggered command dispatcher for mesh radio networks"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write a starter config file.
    Init {
        /// Config file to create.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Connect to the mesh and dispatch commands until interrupted.
    Start {
        /// Config file to load.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Use stdin/stdout instead of the mesh bridge.
        #[arg(long)]
        console: bool,
        /// Directory for rotated JSON logs.
        #[arg(long)]
        logs_dir: Option<PathBuf>,
    },
    /// Validate the config and list the keyword table.
    Check {
        /// Config file to load.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Grace period is measured from here.
    let started_at = Utc::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { config, force } => {
            logging::init_cli();
            handle_init(config, force)
        }
        Commands::Start {
            config,
            console,
            logs_dir,
        } => handle_start(started_at, config, console, logs_dir).await,
        Commands::Check { config } => {
            logging::init_cli();
            handle_check(config)
        }
    }
}

fn handle_init(config: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = config::resolve_config_path(config, |key| std::env::var(key).ok())?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn load(config: Option<PathBuf>) -> anyhow::Result<(PathBuf, Config)> {
    let path = config::resolve_config_path(config, |key| std::env::var(key).ok())?;
    let loaded = config::load_config(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;
    Ok((path, loaded))
}

fn handle_check(config: Option<PathBuf>) -> anyhow::Result<()> {
    let (path, config) = load(config)?;
    println!("Config: {} (ok)", path.display());
    println!(
        "Bridge: {}:{}  slot {}  chunk {} bytes",
        config.transport.host,
        config.transport.port,
        config.dispatch.channel_slot,
        config.dispatch.chunk_size
    );
    println!(
        "Admission: grace {} s, max age {} s",
        config.dispatch.startup_grace_secs, config.dispatch.max_msg_age_secs
    );

    let table = ActionTable::new(config.actions.clone());
    if table.is_empty() {
        println!("No actions configured.");
        return Ok(());
    }
    println!("Actions:");
    for (keyword, action) in table.sorted() {
        let marker = if action.is_file() { "" } else { "  (missing)" };
        println!("  {keyword:<16} {}{marker}", action.display());
    }
    Ok(())
}

async fn handle_start(
    started_at: chrono::DateTime<Utc>,
    config: Option<PathBuf>,
    console: bool,
    logs_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let logs_dir = match logs_dir {
        Some(dir) => dir,
        None => config::config_dir()?.join("logs"),
    };
    let mode = if console {
        LogMode::Console
    } else {
        LogMode::Bridge
    };
    let _log_guard = logging::init_production(&logs_dir, mode)?;

    let (path, config) = load(config)?;
    info!(path = %path.display(), actions = config.actions.len(), "configuration loaded");

    let (transport, events): (Arc<dyn MeshTransport>, EventStream) = if console {
        let (transport, events) = ConsoleTransport::stdio(config.dispatch.channel_slot);
        (Arc::new(transport), events)
    } else {
        let (transport, events) =
            BridgeTransport::connect(&config.transport.host, config.transport.port)
                .await
                .context("failed to connect to mesh bridge")?;
        (Arc::new(transport), events)
    };

    let dispatcher = Dispatcher::new(
        &config,
        started_at,
        Arc::new(ProcessExecutor::new()),
        transport,
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    dispatcher.run(events, shutdown).await;

    info!("mesh-commander stopped");
    Ok(())
}
