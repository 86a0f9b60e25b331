//! Bounded cache of open backing-file readers.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Default number of simultaneously open backing files.
pub const DEFAULT_CAPACITY: usize = 100;

/// Most-recently-used cache of read handles, keyed by backing path.
///
/// Externally serialized: every call happens under the facade lock. A
/// descriptor closes when the last `Arc` clone of its handle drops, which
/// may be after eviction if a read is still in flight.
pub struct HandleCache {
    handles: HashMap<PathBuf, (Arc<File>, Instant)>,
    capacity: usize,
}

impl HandleCache {
    pub fn new(capacity: usize) -> Self {
        Self { handles: HashMap::new(), capacity }
    }

    /// Fetch the reader for `path`, opening it on first use and refreshing
    /// its last-touch stamp. At capacity the stalest entry is evicted.
    pub fn get(&mut self, path: &Path) -> io::Result<Arc<File>> {
        if let Some((file, touched)) = self.handles.get_mut(path) {
            *touched = Instant::now();
            return Ok(file.clone());
        }
        if self.handles.len() >= self.capacity {
            self.evict_stalest();
        }
        let file = Arc::new(File::open(path)?);
        self.handles.insert(path.to_owned(), (file.clone(), Instant::now()));
        Ok(file)
    }

    /// Drop the entry for `path`.
    pub fn close(&mut self, path: &Path) {
        self.handles.remove(path);
    }

    /// Drop every cached handle.
    pub fn close_all(&mut self) {
        self.handles.clear();
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .handles
            .iter()
            .min_by_key(|(_, (_, touched))| *touched)
            .map(|(path, _)| path.clone());
        if let Some(path) = stalest {
            self.handles.remove(&path);
        }
    }
}
