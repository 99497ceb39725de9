//! # hacluster - corosync and MAAS helpers for the hacluster charm
//!
//! Runs inside the charm's hooks. Two independent jobs:
//!
//! ```text
//! charm config + hanode/ha relations ──► corosync.conf
//! maas-cli login ─► nodes list ─► logout ──► JSON inventory on stdout
//! ```

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hacluster_common::HaclusterError;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod apt;
mod config;
mod corosync;
mod hookenv;
mod maas;
mod network;
mod process;
#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::corosync::{CorosyncRenderer, RendererSettings};
use crate::hookenv::HookTools;
use crate::maas::MaasHelper;
use crate::network::SystemResolver;
use crate::process::{CommandRunner, ProcessRunner};

/// hacluster charm helpers
#[derive(Parser, Debug)]
#[command(name = "hacluster")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/hacluster.toml")]
    config: String,

    /// corosync.conf location (overrides config)
    #[arg(long, env = "COROSYNC_CONF")]
    corosync_conf: Option<PathBuf>,

    /// Timeout in seconds for external commands (overrides config)
    #[arg(long, env = "COMMAND_TIMEOUT")]
    command_timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, default_value = "false")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render corosync.conf and write it to its configured location
    EmitCorosyncConf,

    /// Render corosync.conf to stdout without writing it
    RenderCorosyncConf,

    /// Print the MAAS node inventory as JSON
    MaasNodes {
        /// MAAS API URL
        #[arg(long, env = "MAAS_URL")]
        url: String,

        /// MAAS API key
        #[arg(long, env = "MAAS_CREDENTIALS", hide_env_values = true)]
        credentials: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level, args.json_logs)?;

    if let Err(e) = run(args).await {
        let cause = e.chain().find_map(|c| c.downcast_ref::<HaclusterError>());
        match cause {
            Some(cause) if !cause.is_fatal() => warn!(error = format!("{:#}", e), "hacluster step skipped"),
            _ => error!(error = format!("{:#}", e), "hacluster failed"),
        }
        std::process::exit(cause.map(HaclusterError::exit_code).unwrap_or(1));
    }

    Ok(())
}

async fn run(args: Args) -> Result<()> {
    // Load configuration
    let config = AppConfig::load(&args.config, &args)?;
    info!(path = %args.config, "Configuration loaded");

    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new(Duration::from_secs(
        config.command_timeout_secs,
    )));

    match args.command {
        Command::EmitCorosyncConf => {
            let renderer = corosync_renderer(&config, runner);
            if !renderer.emit().await.context("Failed to render corosync configuration")? {
                bail!(
                    "corosync configuration not written to {}",
                    renderer.conf_path().display()
                );
            }
        }
        Command::RenderCorosyncConf => {
            let renderer = corosync_renderer(&config, runner);
            match renderer.render().await.context("Failed to render corosync configuration")? {
                Some(text) => print!("{}", text),
                None => bail!("corosync configuration is incomplete"),
            }
        }
        Command::MaasNodes { url, credentials } => {
            let maas = MaasHelper::new(url, credentials, config.maas.clone(), runner);
            maas.ensure_client_installed()
                .await
                .context("Failed to install MAAS client")?;

            match maas.list_nodes().await.context("Failed to query MAAS")? {
                Some(nodes) => println!("{}", serde_json::to_string_pretty(&nodes)?),
                None => bail!("could not get node inventory from MAAS"),
            }
        }
    }

    Ok(())
}

fn corosync_renderer(config: &AppConfig, runner: Arc<dyn CommandRunner>) -> CorosyncRenderer {
    let hooks = Arc::new(HookTools::from_env(runner.clone()));
    let resolver = Arc::new(SystemResolver::new(runner));
    CorosyncRenderer::new(hooks.clone(), hooks, resolver, RendererSettings::from(config))
}

/// Initialize structured logging with tracing, on stderr so rendered
/// output on stdout stays clean
fn init_logging(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}
