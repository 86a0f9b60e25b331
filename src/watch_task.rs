//! Watches the store file for edits made behind the process's back.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{Mutex, Notify};
use tokio::task::{self, JoinHandle};
use tracing::{error, info};

use crate::overlay::fs::State;
use crate::store::Store;

/// How long the watcher dozes between modification-time probes.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Rebuilds the index whenever the store file's modification time advances.
///
/// Internal mutations also wake the watcher; rebuilding right after one is
/// benign because the rebuild reproduces the state the mutation installed.
pub(crate) struct WatchTask {
    store_path: PathBuf,
    state: Arc<Mutex<State>>,
    wake: Arc<Notify>,
    running: Arc<AtomicBool>,
    last_mtime: Option<SystemTime>,
}

impl WatchTask {
    pub(crate) fn spawn(
        store_path: PathBuf,
        state: Arc<Mutex<State>>,
        wake: Arc<Notify>,
        running: Arc<AtomicBool>,
    ) -> JoinHandle<()> {
        tokio::spawn(Self { store_path, state, wake, running, last_mtime: None }.run())
    }

    async fn run(mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.poll_once().await;
            tokio::select! {
                _ = self.wake.notified() => {}
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        }
    }

    /// Compare the store's modification time against the last observed
    /// value and rebuild when it has advanced. Failures are logged and the
    /// loop keeps going.
    async fn poll_once(&mut self) {
        let probed = tokio::fs::metadata(&self.store_path).await.and_then(|meta| meta.modified());
        let mtime = match probed {
            Ok(mtime) => mtime,
            Err(err) => {
                error!("store modification probe failed: {err}");
                return;
            }
        };
        if self.last_mtime.is_some_and(|seen| mtime <= seen) {
            return;
        }
        match self.reload().await {
            Ok(Ok(count)) => {
                info!("store changed on disk, reloaded {count} translations");
                self.last_mtime = Some(mtime);
            }
            Ok(Err(err)) => error!("store reload failed: {err}"),
            Err(err) => error!("store reload task failed: {err}"),
        }
    }

    /// Scan the store on a short-lived connection and swap the rebuilt
    /// index in under the facade lock.
    async fn reload(&self) -> std::result::Result<rusqlite::Result<usize>, task::JoinError> {
        let store_path = self.store_path.clone();
        let state = self.state.clone();
        task::spawn_blocking(move || {
            let rows = Store::open(&store_path)?.load()?;
            let count = rows.len();
            state.blocking_lock().index.rebuild(rows);
            Ok(count)
        })
        .await
    }
}
