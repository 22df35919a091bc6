//! Keyward operator CLI.
//!
//! Manages the encryption key kept in a file-backed credential store.
//!
//! # Usage
//!
//! ```bash
//! # Print the current key (creating or rotating it as needed)
//! keyward --store keys.redb key
//!
//! # Inspect without touching the key
//! keyward --store keys.redb info
//!
//! # Rotate now, then wipe everything
//! keyward --store keys.redb rotate
//! keyward --store keys.redb clear
//! ```

#![allow(clippy::print_stdout, reason = "CLI output goes to stdout")]

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand, ValueEnum};
use keyward_core::{
    Deployment, Diagnostics, KeyInfo, KeyManager, KeyManagerConfig, RedbStore, SystemEnv,
    config::{DEFAULT_RETAINED_KEYS, DEFAULT_SERVICE},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Keyward encryption key manager
#[derive(Parser, Debug)]
#[command(name = "keyward")]
#[command(about = "Manage a locally stored symmetric encryption key")]
#[command(version)]
struct Args {
    /// Path to the credential store database
    #[arg(short, long, default_value = "keyward.redb")]
    store: PathBuf,

    /// Credential store namespace
    #[arg(long, default_value = DEFAULT_SERVICE)]
    service: String,

    /// Rotate keys older than this many days
    #[arg(long, default_value = "7")]
    rotation_days: u64,

    /// Number of superseded keys to keep
    #[arg(long, default_value_t = DEFAULT_RETAINED_KEYS)]
    retain: usize,

    /// Runtime classification (simulator keys are never persisted)
    #[arg(long, value_enum)]
    deployment: Option<DeploymentArg>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current key as base64, creating or rotating it as needed
    Key,
    /// Show key version, age and rotation status
    Info,
    /// Rotate the key now regardless of age
    Rotate,
    /// Delete the key and all of its metadata
    Clear,
    /// List retained superseded key versions
    Retained,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DeploymentArg {
    Device,
    Simulator,
}

impl From<DeploymentArg> for Deployment {
    fn from(arg: DeploymentArg) -> Self {
        match arg {
            DeploymentArg::Device => Deployment::Device,
            DeploymentArg::Simulator => Deployment::Simulator,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = KeyManagerConfig {
        service: args.service,
        rotation_interval: Duration::from_secs(args.rotation_days.saturating_mul(24 * 60 * 60)),
        retained_keys: args.retain,
        ..KeyManagerConfig::default()
    };
    let deployment = args.deployment.map_or_else(Deployment::detect, Deployment::from);

    tracing::debug!(
        store = %args.store.display(),
        service = %config.service,
        ?deployment,
        "opening credential store"
    );

    let store = RedbStore::open(&args.store)?;
    let manager = KeyManager::new(SystemEnv::new(), deployment, store, config);
    let diagnostics = Diagnostics::new(&manager);

    match args.command {
        Command::Key => {
            let key = manager.get_or_create_key().await?;
            println!("{}", key.to_base64().as_str());
        },
        Command::Info => print_info(&diagnostics.log_key_info().await),
        Command::Rotate => print_info(&diagnostics.force_rotation().await?),
        Command::Clear => {
            let report = diagnostics.clear_keys().await;
            if report.is_complete() {
                println!("cleared");
            } else {
                println!("partially cleared, failed: {}", report.failed.join(", "));
            }
        },
        Command::Retained => {
            for retired in manager.retained_keys().await {
                println!(
                    "version {} retired_at_millis {}",
                    retired.version, retired.retired_at_millis
                );
            }
        },
    }

    Ok(())
}

fn print_info(info: &KeyInfo) {
    println!("has_key:         {}", info.has_key);
    println!("version:         {}", info.version);
    println!("age_millis:      {}", info.age_millis);
    println!("needs_rotation:  {}", info.needs_rotation);
    println!("retained:        {:?}", info.retained_versions);
}
