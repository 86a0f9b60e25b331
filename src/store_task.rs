//! Mutation serializer: the single worker that owns the store connection.
//!
//! Public mutators enqueue a command and block on its reply slot, giving a
//! synchronous API on top of strictly serialized execution. The store write
//! and the matching index update commit under the facade lock, so observers
//! see either the pre-state or the post-state of a mutation.

use std::sync::Arc;

use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::overlay::fs::State;
use crate::overlay::{Error, Result};
use crate::store::Store;

/// A single serialized table mutation, with its reply slot.
pub(crate) enum StoreCommand {
    Add { original: String, translated: String, reply: oneshot::Sender<Result<()>> },
    Remove { original: String, reply: oneshot::Sender<Result<()>> },
    Purge { reply: oneshot::Sender<Result<()>> },
    List { reply: oneshot::Sender<Result<Vec<(String, String)>>> },
    /// Sentinel that terminates the worker.
    Shutdown,
}

/// Applies table mutations one at a time, keeping the store and the
/// in-memory index in step.
pub(crate) struct StoreTask {
    store: Store,
    state: Arc<Mutex<State>>,
    wake: Arc<Notify>,
    commands: async_channel::Receiver<StoreCommand>,
}

impl StoreTask {
    /// Move the store connection onto a dedicated blocking thread and start
    /// draining the command queue.
    pub(crate) fn spawn(
        store: Store,
        state: Arc<Mutex<State>>,
        wake: Arc<Notify>,
        commands: async_channel::Receiver<StoreCommand>,
    ) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || Self { store, state, wake, commands }.run())
    }

    fn run(self) {
        while let Ok(command) = self.commands.recv_blocking() {
            match command {
                StoreCommand::Add { original, translated, reply } => {
                    let _ = reply.send(self.add(original, translated));
                }
                StoreCommand::Remove { original, reply } => {
                    let _ = reply.send(self.remove(&original));
                }
                StoreCommand::Purge { reply } => {
                    let _ = reply.send(self.purge());
                }
                StoreCommand::List { reply } => {
                    let _ = reply.send(self.list());
                }
                StoreCommand::Shutdown => break,
            }
        }
    }

    fn add(&self, original: String, translated: String) -> Result<()> {
        let mut state = self.state.blocking_lock();
        match self.store.upsert(&original, &translated) {
            Ok(()) => {
                info!("added translation {original} -> {translated}");
                state.index.link(original, translated);
                self.wake.notify_one();
                Ok(())
            }
            Err(err) => {
                error!("failed to add translation {original} -> {translated}: {err}");
                Err(Error::Store(err.to_string()))
            }
        }
    }

    fn remove(&self, original: &str) -> Result<()> {
        let mut state = self.state.blocking_lock();
        match self.store.remove(original) {
            Ok(()) => {
                info!("removed translation {original}");
                state.index.unlink(original);
                self.wake.notify_one();
                Ok(())
            }
            Err(err) => {
                error!("failed to remove translation {original}: {err}");
                Err(Error::Store(err.to_string()))
            }
        }
    }

    fn purge(&self) -> Result<()> {
        let mut state = self.state.blocking_lock();
        match self.store.clear() {
            Ok(()) => {
                info!("purged all translations");
                state.index.clear();
                self.wake.notify_one();
                Ok(())
            }
            Err(err) => {
                error!("failed to purge translations: {err}");
                Err(Error::Store(err.to_string()))
            }
        }
    }

    fn list(&self) -> Result<Vec<(String, String)>> {
        self.store.load().map_err(|err| {
            error!("failed to list translations: {err}");
            Error::Store(err.to_string())
        })
    }
}
