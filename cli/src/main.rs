// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # AEGIS Runtime Provisioner CLI
//!
//! The `aegis-provision` binary drives the lifecycle reconciler by hand:
//! it loads a lifecycle event from a JSON file, connects to the configured
//! agent runtime control plane, and prints the resulting physical
//! identifier. In production the reconciler is invoked by the event
//! framework instead; this binary exists for operators and local testing.
//!
//! ## Commands
//!
//! - `aegis-provision apply <EVENT>` - Apply a lifecycle event
//! - `aegis-provision list` - List runtimes known to the control plane

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use aegis_provisioner_core::application::reconciler::RuntimeReconciler;
use aegis_provisioner_core::domain::config::ProvisionerConfig;
use aegis_provisioner_core::domain::event::LifecycleEvent;
use aegis_provisioner_core::domain::runtime::ControlPlane;
use aegis_provisioner_core::infrastructure::control_plane::HttpControlPlane;

/// AEGIS agent runtime provisioner
#[derive(Parser)]
#[command(name = "aegis-provision")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to provisioner configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "AEGIS_PROVISIONER_CONFIG",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "AEGIS_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a lifecycle event from a JSON file
    Apply {
        /// Path to the lifecycle event JSON
        #[arg(value_name = "EVENT")]
        event: PathBuf,
    },

    /// List agent runtimes known to the control plane
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = load_config(cli.config.as_deref())?;
    let control_plane = Arc::new(
        HttpControlPlane::from_config(&config).context("Failed to build control plane client")?,
    );

    match cli.command {
        Commands::Apply { event } => apply(control_plane, &event).await,
        Commands::List => list(control_plane).await,
    }
}

async fn apply(control_plane: Arc<HttpControlPlane>, path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event file {}", path.display()))?;
    let event: LifecycleEvent =
        serde_json::from_str(&raw).context("Failed to parse lifecycle event")?;

    info!(intent = ?event.intent, logical_id = %event.logical_id, "Applying lifecycle event");

    let reconciler = RuntimeReconciler::new(control_plane);
    let physical_id = reconciler.handle(&event).await?;

    println!("{} {}", "✓".green(), physical_id);
    Ok(())
}

async fn list(control_plane: Arc<HttpControlPlane>) -> Result<()> {
    let mut next_token = None;
    let mut total = 0usize;

    loop {
        let page = control_plane.list_runtimes(next_token).await?;
        for runtime in &page.runtimes {
            total += 1;
            println!(
                "{}  {}  {:?}",
                runtime.runtime_id.bold(),
                runtime.arn,
                runtime.status
            );
        }
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    if total == 0 {
        println!("{}", "No agent runtimes found".dimmed());
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ProvisionerConfig> {
    match path {
        Some(path) => ProvisionerConfig::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => ProvisionerConfig::from_env()
            .context("No configuration found; pass --config or set AEGIS_CONTROL_PLANE_URL"),
    }
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
