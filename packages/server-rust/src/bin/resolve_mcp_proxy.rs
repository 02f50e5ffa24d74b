//! `resolve-mcp-proxy`: serve and inspect tool-exposure profiles.
//!
//! - `serve` registers an operation manifest and answers MCP requests over
//!   stdin/stdout until input closes or the process is interrupted
//! - `profiles` lists the configured profiles with their declared estimates
//! - `resolve` loads an operation manifest and prints the exposed set for the
//!   active profile, warning when it had to be truncated
//!
//! Command output goes to stdout; logs go to stderr.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use resolve_mcp_core::{ConfigError, ProxyConfig};
use resolve_mcp_server::protocol::{serve_stdio, McpSurface};
use resolve_mcp_server::service::{
    list_profiles, BridgeService, ExposureController, OperationManifest, OperationRegistry,
    ServerConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "resolve-mcp-proxy", version, about = "Inspect DaVinci Resolve MCP tool exposure")]
struct Cli {
    /// Proxy configuration file (JSON). Built-in defaults when omitted.
    #[arg(long, global = true, env = "RESOLVE_MCP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the active profile.
    #[arg(long, global = true, env = "RESOLVE_MCP_PROFILE")]
    profile: Option<String>,

    /// Override the global tool ceiling.
    #[arg(long, global = true, env = "RESOLVE_MCP_MAX_TOOLS")]
    max_tools: Option<usize>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the MCP tool surface over stdin/stdout.
    Serve {
        /// Operation manifest (JSON).
        #[arg(long)]
        manifest: PathBuf,
    },
    /// List configured profiles.
    Profiles {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resolve the exposed operation set for a manifest.
    Resolve {
        /// Operation manifest (JSON).
        #[arg(long)]
        manifest: PathBuf,
        /// Print the full resolution result as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// File (or defaults) with command-line/env overrides applied, validated.
fn load_config(
    path: Option<&Path>,
    profile: Option<&str>,
    max_tools: Option<usize>,
) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => ProxyConfig::load(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(max_tools) = max_tools {
        config.max_tools = max_tools;
    }
    if let Some(profile) = profile {
        config = config.with_active_profile(profile)?;
    }
    config.validate()?;
    Ok(config)
}

fn print_profiles(config: &ProxyConfig, json: bool) -> Result<()> {
    let rows = list_profiles(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    let width = rows.iter().map(|r| r.name.len()).max().unwrap_or(0);
    for row in rows {
        let marker = if row.active { '*' } else { ' ' };
        let estimate = row
            .estimated_tools
            .map_or_else(|| "    ?".to_string(), |n| format!("~{n:>4}"));
        println!(
            "{marker} {:<width$}  {estimate} tools  {}",
            row.name,
            row.description.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn print_resolution(config: ProxyConfig, manifest: &Path, json: bool) -> Result<()> {
    let manifest = OperationManifest::load(manifest)?;
    let registry = Arc::new(OperationRegistry::new());
    manifest.register_unbound(&registry)?;
    registry.mark_ready();

    let controller = ExposureController::new(registry, config)?;
    let snapshot = controller.current();
    let result = &snapshot.result;

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    for name in &result.names {
        println!("{name}");
    }
    eprintln!(
        "{} of {} operations exposed (profile: {}, mode: {:?})",
        result.len(),
        controller.registry().len(),
        snapshot.profile_label(),
        snapshot.effective_mode(),
    );
    if result.truncated {
        eprintln!(
            "warning: truncated to maxTools={}; {} operations hidden (use search_operations to reach them)",
            result.max_tools.unwrap_or_default(),
            result.dropped_count,
        );
    }
    Ok(())
}

/// Registers the manifest's operations and starts the bridge over them.
fn start_bridge(config: ProxyConfig, manifest: &Path) -> Result<BridgeService> {
    let manifest = OperationManifest::load(manifest)?;
    let registry = Arc::new(OperationRegistry::new());
    let count = manifest.register_unbound(&registry)?;
    tracing::info!(operations = count, "manifest registered");
    Ok(BridgeService::start(registry, config, &ServerConfig::default())?)
}

/// Drives `transport` until input closes or Ctrl-C, then drains the bridge.
async fn serve_until_closed<F>(bridge: &BridgeService, transport: F) -> Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let served = tokio::select! {
        result = transport => result.context("MCP transport failed"),
        result = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted");
            result.context("failed to listen for Ctrl-C")
        }
    };
    bridge.shutdown().await;
    served
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = load_config(cli.config.as_deref(), cli.profile.as_deref(), cli.max_tools)
        .context("failed to load proxy configuration")?;

    match cli.command {
        Command::Serve { manifest } => {
            let bridge = start_bridge(config, &manifest)?;
            let surface = McpSurface::new(&bridge);
            serve_until_closed(&bridge, serve_stdio(&surface)).await
        }
        Command::Profiles { json } => print_profiles(&config, json),
        Command::Resolve { manifest, json } => print_resolution(config, &manifest, json),
    }
}
