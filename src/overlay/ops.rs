//! Read-side operations invoked by the kernel binding.
//!
//! Every operation consults the index under the facade lock, answers
//! virtual and compatibility entries from synthesized metadata, and
//! delegates the rest to the backing tree. The lock is released before any
//! blocking file I/O; reads run on the blocking pool against a cached
//! descriptor clone.

use std::collections::BTreeSet;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileExt;
use std::path::Path;

use tokio::task;

use crate::index::Index;
use crate::paths;

use super::fs::TranslationFs;
use super::{is_compat_path, EntryAttr, Error, Result, COMPAT_NAMES};

impl TranslationFs {
    /// Metadata for a presented path, `lstat` semantics.
    pub async fn get_attr(&self, path: &str) -> Result<EntryAttr> {
        if is_compat_path(path) {
            return Ok(EntryAttr::compat_file());
        }
        let backing = {
            let state = self.state.lock().await;
            if state.index.is_shadowed(path) {
                return Err(Error::NoEntry);
            }
            if state.index.is_virtual_dir(path) {
                return Ok(EntryAttr::virtual_dir());
            }
            self.backing_for(&state.index, path)
        };
        let meta = tokio::fs::symlink_metadata(&backing).await.map_err(Error::from)?;
        Ok(EntryAttr::from_metadata(&meta))
    }

    /// Honor `access(2)` against the backing entry; virtual and
    /// compatibility entries always pass.
    pub async fn access(&self, path: &str, mode: i32) -> Result<()> {
        if is_compat_path(path) {
            return Ok(());
        }
        let backing = {
            let state = self.state.lock().await;
            if state.index.is_shadowed(path) {
                return Err(Error::NoEntry);
            }
            if state.index.is_virtual_dir(path) {
                return Ok(());
            }
            self.backing_for(&state.index, path)
        };
        task::spawn_blocking(move || {
            if !backing.exists() {
                return Err(Error::NoEntry);
            }
            if access_granted(&backing, mode) {
                Ok(())
            } else {
                Err(Error::Access)
            }
        })
        .await
        .map_err(|_| Error::Invalid)?
    }

    /// List a presented directory: backing entries not shadowed by a
    /// translation, synthesized virtual children, and the compatibility
    /// names. `.` and `..` lead; the rest is sorted and de-duplicated.
    pub async fn read_dir(&self, path: &str) -> Result<Vec<String>> {
        let backing = {
            let state = self.state.lock().await;
            if state.index.is_shadowed(path) {
                return Err(Error::NoEntry);
            }
            if state.index.is_virtual_dir(path) {
                return Ok(assemble_listing(&state.index, path, Vec::new()));
            }
            self.backing_for(&state.index, path)
        };

        let mut backing_names = Vec::new();
        if tokio::fs::metadata(&backing).await.map(|meta| meta.is_dir()).unwrap_or(false) {
            let mut entries = tokio::fs::read_dir(&backing).await.map_err(Error::from)?;
            while let Some(entry) = entries.next_entry().await.map_err(Error::from)? {
                backing_names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        let state = self.state.lock().await;
        Ok(assemble_listing(&state.index, path, backing_names))
    }

    /// Read up to `size` bytes at `offset`. Compatibility entries read as
    /// empty, and so do backing files that refuse the operation.
    pub async fn read(&self, path: &str, size: u32, offset: u64) -> Result<Vec<u8>> {
        if is_compat_path(path) {
            return Ok(Vec::new());
        }
        let file = {
            let mut state = self.state.lock().await;
            if state.index.is_shadowed(path) {
                return Err(Error::NoEntry);
            }
            let backing = self.backing_for(&state.index, path);
            state.handles.get(&backing).map_err(Error::from)?
        };

        let outcome = task::spawn_blocking(move || {
            let len = file.metadata()?.len();
            let count = if offset >= len { 0 } else { (len - offset).min(u64::from(size)) as usize };
            let mut data = vec![0u8; count];
            if count > 0 {
                file.read_exact_at(&mut data, offset)?;
            }
            Ok::<_, io::Error>(data)
        })
        .await
        .map_err(|_| Error::Invalid)?;

        match outcome {
            Ok(data) => Ok(data),
            Err(err) => match Error::from(err) {
                Error::NotSupported => Ok(Vec::new()),
                other => Err(other),
            },
        }
    }

    /// Prime the handle cache for `path`. Handles are keyed by path, so
    /// the returned number is always `0`.
    pub async fn open(&self, path: &str, _flags: i32) -> Result<u64> {
        if is_compat_path(path) {
            return Ok(0);
        }
        let mut state = self.state.lock().await;
        if state.index.is_shadowed(path) {
            return Err(Error::NoEntry);
        }
        let backing = self.backing_for(&state.index, path);
        state.handles.get(&backing).map_err(Error::from)?;
        Ok(0)
    }

    /// Close and evict the cached handle for `path`.
    pub async fn release(&self, path: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let backing = self.backing_for(&state.index, path);
        state.handles.close(&backing);
        Ok(())
    }

    /// Forward an extended-attribute fetch to the backing entry. Missing
    /// attributes and unsupporting filesystems both read as empty.
    pub async fn get_xattr(&self, path: &str, name: &str) -> Result<Vec<u8>> {
        let backing = {
            let state = self.state.lock().await;
            self.backing_for(&state.index, path)
        };
        let name = name.to_owned();
        let fetched = task::spawn_blocking(move || xattr::get(&backing, &name))
            .await
            .map_err(|_| Error::Invalid)?;
        match fetched {
            Ok(Some(value)) => Ok(value),
            Ok(None) | Err(_) => Ok(Vec::new()),
        }
    }

    /// Advisory-lock stub; every request is granted.
    pub fn lock(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}

/// Merge backing names, translated children, virtual children, and the
/// compatibility names into one listing.
fn assemble_listing(index: &Index, path: &str, backing_names: Vec<String>) -> Vec<String> {
    let mut tail = BTreeSet::new();
    if index.is_virtual_dir(path) {
        if let Some(children) = index.children_of(path) {
            tail.extend(children.iter().cloned());
        }
    } else {
        for name in backing_names {
            if !index.is_shadowed(&paths::join_presented(path, &name)) {
                tail.insert(name);
            }
        }
    }
    tail.extend(index.virtual_children(path).map(str::to_owned));
    tail.extend(COMPAT_NAMES.iter().map(|name| (*name).to_owned()));

    let mut listing = vec![".".to_owned(), "..".to_owned()];
    listing.extend(tail);
    listing
}

fn access_granted(path: &Path, mode: i32) -> bool {
    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    unsafe { libc::access(cpath.as_ptr(), mode) == 0 }
}
