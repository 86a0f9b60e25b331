//! Process bootstrap: argument parsing, logging, and the mount session.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use remapfs::admin;
use remapfs::mount;
use remapfs::overlay::TranslationFs;
use remapfs::store::Store;

/// Republish a directory tree through a runtime-editable translation table.
#[derive(Parser, Debug)]
#[command(name = "remapfs")]
struct Args {
    /// Where the overlay is mounted.
    mountpoint: PathBuf,
    /// Backing directory the overlay republishes.
    root: PathBuf,
    /// SQLite file persisting the translation table.
    store_file: PathBuf,
    /// Directory receiving hourly store snapshots.
    backup_dir: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(err) = std::fs::create_dir_all(&args.backup_dir) {
        error!("cannot create backup directory {}: {err}", args.backup_dir.display());
        return ExitCode::FAILURE;
    }

    if args.store_file.exists() {
        if !Store::check_integrity(&args.store_file) {
            error!("integrity check failed for {}", args.store_file.display());
            return ExitCode::FAILURE;
        }
    } else {
        info!("store {} does not exist yet, a new one will be created", args.store_file.display());
    }

    let fs = match TranslationFs::new(args.root.clone(), args.store_file.clone(), args.backup_dir)
    {
        Ok(fs) => Arc::new(fs),
        Err(err) => {
            error!("cannot open translation store: {err}");
            return ExitCode::FAILURE;
        }
    };

    tokio::spawn({
        let fs = fs.clone();
        async move {
            if let Err(err) = admin::serve(fs).await {
                error!("admin API stopped: {err}");
            }
        }
    });

    info!(
        "mounting at {}, root {}, store {}",
        args.mountpoint.display(),
        args.root.display(),
        args.store_file.display()
    );

    let handle = tokio::runtime::Handle::current();
    let session = tokio::task::spawn_blocking(move || mount::mount(fs, handle, &args.mountpoint));
    match session.await {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!("mount session failed: {err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("mount task failed: {err}");
            ExitCode::FAILURE
        }
    }
}
