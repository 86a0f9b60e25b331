//! Periodic store snapshots with bounded retention.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use filetime::FileTime;
use tokio::sync::Notify;
use tokio::task::{self, JoinHandle};
use tracing::{error, info};

/// Snapshot cadence.
const BACKUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Snapshots kept before the oldest is pruned.
const KEEP_SNAPSHOTS: usize = 24;

/// Prefix shared by every snapshot file in the retention directory.
pub const SNAPSHOT_PREFIX: &str = "translations_backup_";

/// Copies the store into the retention directory once an hour.
pub(crate) struct BackupTask {
    store_path: PathBuf,
    backup_dir: PathBuf,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
}

impl BackupTask {
    pub(crate) fn spawn(
        store_path: PathBuf,
        backup_dir: PathBuf,
        shutdown: Arc<Notify>,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self { store_path, backup_dir, shutdown, running }.run())
    }

    async fn run(self) {
        while self.running.load(Ordering::SeqCst) {
            let store_path = self.store_path.clone();
            let backup_dir = self.backup_dir.clone();
            let outcome =
                task::spawn_blocking(move || snapshot_store(&store_path, &backup_dir)).await;
            match outcome {
                Ok(Ok(snapshot)) => info!("created store snapshot {}", snapshot.display()),
                Ok(Err(err)) => error!("store snapshot failed: {err}"),
                Err(err) => error!("store snapshot task failed: {err}"),
            }
            tokio::select! {
                _ = self.shutdown.notified() => {}
                _ = tokio::time::sleep(BACKUP_INTERVAL) => {}
            }
        }
    }
}

/// Copy the store into the retention directory and prune to the newest
/// [`KEEP_SNAPSHOTS`] copies. Timestamped names sort chronologically, so
/// the lexicographically smallest files are the oldest.
pub fn snapshot_store(store_path: &Path, backup_dir: &Path) -> std::io::Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    let target = backup_dir.join(format!("{SNAPSHOT_PREFIX}{stamp}.db"));
    fs::copy(store_path, &target)?;
    let meta = fs::metadata(store_path)?;
    filetime::set_file_mtime(&target, FileTime::from_last_modification_time(&meta))?;

    let mut snapshots: Vec<PathBuf> = fs::read_dir(backup_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(SNAPSHOT_PREFIX))
        })
        .collect();
    snapshots.sort();
    if snapshots.len() > KEEP_SNAPSHOTS {
        for stale in &snapshots[..snapshots.len() - KEEP_SNAPSHOTS] {
            fs::remove_file(stale)?;
        }
    }
    Ok(target)
}
