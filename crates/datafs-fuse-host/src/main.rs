// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! DataFS FUSE Host
//!
//! Loads a dataset document into an in-memory tree and mounts it with
//! libfuse. Every directory and file under the mount point is backed by the
//! engine for the lifetime of the process; nothing is written back.

#[cfg(all(feature = "fuse", target_os = "linux"))]
mod adapter;
#[cfg(any(test, all(feature = "fuse", target_os = "linux")))]
mod inodes;

#[cfg(all(feature = "fuse", target_os = "linux"))]
use adapter::DataFsFuse;
use anyhow::{Context, Result};
use clap::Parser;
use datafs_core::{Dataset, FsConfig, FsCore, Layout, WriteMode};
use datafs_logging::CliLoggingArgs;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
#[cfg(not(all(feature = "fuse", target_os = "linux")))]
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "datafs", about = "Mount a hierarchical dataset as an in-memory filesystem")]
struct Args {
    /// Dataset document (.json, .yaml, .yml, .toml) or workbook (.xls, .xlsx, .ods)
    dataset: PathBuf,

    /// Mount point for the filesystem
    mount_point: PathBuf,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How the dataset document maps onto directories and files
    #[arg(long, default_value_t = Layout::Tree)]
    layout: Layout,

    /// Write semantics: truncate_append or splice (overrides the config file)
    #[arg(long, env = "DATAFS_WRITE_MODE")]
    write_mode: Option<WriteMode>,

    /// Allow other users to access the filesystem
    #[arg(long)]
    allow_other: bool,

    /// Allow root to access the filesystem
    #[arg(long)]
    allow_root: bool,

    /// Auto unmount on process exit
    #[arg(long)]
    auto_unmount: bool,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

fn load_config(config_path: Option<&Path>) -> Result<FsConfig> {
    match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: FsConfig = serde_json::from_str(&content)
                .with_context(|| format!("invalid config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(FsConfig::default()),
    }
}

/// Resolve configuration and build the populated engine
fn build_core(args: &Args) -> Result<FsCore> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(write_mode) = args.write_mode {
        config.write_mode = write_mode;
    }
    info!(?config, "Configuration loaded");

    let dataset = Dataset::from_path(&args.dataset, args.layout)?;
    let core = FsCore::from_source(config, &dataset)
        .with_context(|| format!("failed to load dataset {}", args.dataset.display()))?;
    info!(
        dataset = %args.dataset.display(),
        layout = %args.layout,
        nodes = core.node_count(),
        "Dataset loaded"
    );
    Ok(core)
}

fn main() -> Result<()> {
    let args = Args::parse();
    args.logging.clone().init("datafs")?;

    info!("Starting DataFS FUSE Host");
    info!("Mount point: {}", args.mount_point.display());

    let core = build_core(&args)?;

    #[cfg(all(feature = "fuse", target_os = "linux"))]
    {
        let mut mount_options = vec![
            fuser::MountOption::FSName("datafs".to_string()),
            fuser::MountOption::Subtype("datafs".to_string()),
        ];
        if args.allow_other {
            mount_options.push(fuser::MountOption::AllowOther);
        }
        if args.allow_root {
            mount_options.push(fuser::MountOption::AllowRoot);
        }
        if args.auto_unmount {
            mount_options.push(fuser::MountOption::AutoUnmount);
        }

        info!("Mounting filesystem...");
        let session = fuser::spawn_mount2(DataFsFuse::new(core), &args.mount_point, &mount_options)
            .with_context(|| format!("failed to mount at {}", args.mount_point.display()))?;
        info!("DataFS mounted; blocking until unmount");
        session.join();
    }

    #[cfg(not(all(feature = "fuse", target_os = "linux")))]
    {
        warn!("FUSE support not compiled in; the dataset was loaded but nothing is mounted.");
        info!(
            nodes = core.node_count(),
            allow_other = args.allow_other,
            allow_root = args.allow_root,
            auto_unmount = args.auto_unmount,
            "To enable FUSE support, compile with: cargo build --features fuse"
        );
    }

    Ok(())
}
