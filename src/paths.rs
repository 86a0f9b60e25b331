//! Pure helpers over the presented path namespace.
//!
//! Presented paths are absolute, forward-slash separated strings naming
//! locations in the overlay; they need not exist on any disk. Backing paths
//! are real filesystem paths obtained by joining the backing root.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Parent directory of a presented path; the root is its own parent.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "/",
    }
}

/// Final component of a presented path; empty for the root.
pub fn basename(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Append a child name to a presented directory path.
pub fn join_presented(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Join a presented path onto the backing root, stripping exactly one
/// leading separator so the result stays inside the root.
pub fn backing_path(root: &Path, presented: &str) -> PathBuf {
    root.join(presented.strip_prefix('/').unwrap_or(presented))
}

/// Whether `path` lies strictly below `dir`.
fn is_under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}

/// Whether a presented path equals, or lies under, a translated original.
///
/// Shadowed paths are suppressed from listings and refuse direct access:
/// their content is republished at the translated location instead.
pub fn is_shadowed(path: &str, originals: &HashMap<String, String>) -> bool {
    originals.contains_key(path) || originals.keys().any(|orig| is_under(path, orig))
}

/// Record `dir` and every proper non-root ancestor as virtual directories.
pub fn insert_virtual_dirs(virtual_dirs: &mut HashSet<String>, dir: &str) {
    let mut cursor = dir;
    while cursor != "/" {
        if !virtual_dirs.contains(cursor) {
            virtual_dirs.insert(cursor.to_owned());
        }
        cursor = parent(cursor);
    }
}

/// Walk upward from `dir`, retiring virtual directories no child entry
/// keeps alive. A level survives if some children-map parent equals it or
/// extends it; once a level is still needed, so are all of its ancestors.
pub fn retract_virtual_dirs(
    virtual_dirs: &mut HashSet<String>,
    children: &HashMap<String, BTreeSet<String>>,
    dir: &str,
) {
    let mut cursor = dir;
    while cursor != "/" {
        let still_needed = children
            .keys()
            .any(|parent_dir| parent_dir == cursor || is_under(parent_dir, cursor));
        if still_needed {
            break;
        }
        virtual_dirs.remove(cursor);
        cursor = parent(cursor);
    }
}
