//! Facade construction, shared state, mutator API, and teardown.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::info;

use crate::backup_task::BackupTask;
use crate::cache::{self, HandleCache};
use crate::index::Index;
use crate::paths;
use crate::store::Store;
use crate::store_task::{StoreCommand, StoreTask};
use crate::watch_task::WatchTask;

use super::{Error, Result};

/// Index and handle cache, guarded together by the facade lock.
pub(crate) struct State {
    pub(crate) index: Index,
    pub(crate) handles: HandleCache,
}

/// Join handles for the three background workers.
struct Workers {
    store: JoinHandle<()>,
    watch: JoinHandle<()>,
    backup: JoinHandle<()>,
}

/// Read-only overlay over a backing root, republishing translated paths.
///
/// Owns the index, the handle cache, the store connection (through the
/// store worker), and the background workers. All reads resolve through
/// the index under a single lock; all table mutations funnel through the
/// store worker one at a time.
pub struct TranslationFs {
    root: PathBuf,
    pub(crate) state: Arc<Mutex<State>>,
    commands: async_channel::Sender<StoreCommand>,
    wake: Arc<Notify>,
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    workers: Mutex<Option<Workers>>,
}

impl TranslationFs {
    /// Open the store, project it into memory, and start the background
    /// workers. Must be called from within a Tokio runtime.
    pub fn new(
        root: PathBuf,
        store_path: PathBuf,
        backup_dir: PathBuf,
    ) -> crate::store::Result<Self> {
        let store = Store::open(&store_path)?;
        let mut index = Index::new();
        index.rebuild(store.load()?);
        info!("loaded translation table from {}", store_path.display());

        let state = Arc::new(Mutex::new(State {
            index,
            handles: HandleCache::new(cache::DEFAULT_CAPACITY),
        }));
        let wake = Arc::new(Notify::new());
        let shutdown = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(true));
        let (commands, command_recv) = async_channel::unbounded();

        let workers = Workers {
            store: StoreTask::spawn(store, state.clone(), wake.clone(), command_recv),
            watch: WatchTask::spawn(
                store_path.clone(),
                state.clone(),
                wake.clone(),
                running.clone(),
            ),
            backup: BackupTask::spawn(store_path, backup_dir, shutdown.clone(), running.clone()),
        };

        Ok(Self {
            root,
            state,
            commands,
            wake,
            shutdown,
            running,
            workers: Mutex::new(Some(workers)),
        })
    }

    /// Backing directory the overlay republishes.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a presented path against `index` and join it to the root.
    pub(crate) fn backing_for(&self, index: &Index, presented: &str) -> PathBuf {
        paths::backing_path(&self.root, &index.resolve(presented))
    }

    /// Record or replace a translation. Serialized through the store
    /// worker; returns once both the table and the index reflect it.
    pub async fn add_translation(&self, original: &str, translated: &str) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.submit(StoreCommand::Add {
            original: original.to_owned(),
            translated: translated.to_owned(),
            reply,
        })
        .await?;
        outcome.await.unwrap_or(Err(Error::Invalid))
    }

    /// Forget the translation for `original`. Removing an unknown key
    /// still reports success.
    pub async fn remove_translation(&self, original: &str) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.submit(StoreCommand::Remove { original: original.to_owned(), reply }).await?;
        outcome.await.unwrap_or(Err(Error::Invalid))
    }

    /// Drop every translation from the table and the index.
    pub async fn purge_all_translations(&self) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.submit(StoreCommand::Purge { reply }).await?;
        outcome.await.unwrap_or(Err(Error::Invalid))
    }

    /// Every `(original, translated)` row, straight from the store.
    pub async fn list_translations(&self) -> Result<Vec<(String, String)>> {
        let (reply, outcome) = oneshot::channel();
        self.submit(StoreCommand::List { reply }).await?;
        outcome.await.unwrap_or(Err(Error::Invalid))
    }

    async fn submit(&self, command: StoreCommand) -> Result<()> {
        self.commands.send(command).await.map_err(|_| Error::Invalid)
    }

    /// Stop the workers, close the store connection, and drop every cached
    /// handle. Later calls are no-ops.
    pub async fn destroy(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.wake.notify_one();
        self.shutdown.notify_one();
        let _ = self.commands.send(StoreCommand::Shutdown).await;
        self.commands.close();

        let workers = self.workers.lock().await.take();
        if let Some(workers) = workers {
            let _ = workers.store.await;
            let _ = workers.watch.await;
            let _ = workers.backup.await;
        }

        self.state.lock().await.handles.close_all();
        info!("overlay shut down");
    }
}
