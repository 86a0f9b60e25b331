//! In-memory projection of the translation table.
//!
//! Four structures are kept in step: the forward map (`original →
//! translated`), its inverse, a per-parent set of translated child names,
//! and the set of synthesized virtual directories. Rebuilds and mutations
//! both run under the facade lock, so readers observe either the pre-state
//! or the post-state of a change, never an intermediate.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::paths;

/// Projection of the `translations` table used to answer path queries.
#[derive(Debug, Default)]
pub struct Index {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
    children: HashMap<String, BTreeSet<String>>,
    virtual_dirs: HashSet<String>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything and repopulate from a fresh row scan.
    pub fn rebuild(&mut self, rows: Vec<(String, String)>) {
        self.clear();
        for (original, translated) in rows {
            self.link(original, translated);
        }
    }

    /// Install a pairing, displacing any previous target of `original`.
    pub fn link(&mut self, original: String, translated: String) {
        if let Some(prior) = self.forward.get(&original).cloned() {
            self.unlink_translated(&prior);
        }
        let dir = paths::parent(&translated).to_owned();
        self.children
            .entry(dir.clone())
            .or_default()
            .insert(paths::basename(&translated).to_owned());
        paths::insert_virtual_dirs(&mut self.virtual_dirs, &dir);
        self.reverse.insert(translated.clone(), original.clone());
        self.forward.insert(original, translated);
    }

    /// Remove the pairing for `original`. Unknown keys are a no-op.
    pub fn unlink(&mut self, original: &str) {
        if let Some(translated) = self.forward.remove(original) {
            self.unlink_translated(&translated);
        }
    }

    /// Drop every pairing.
    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.children.clear();
        self.virtual_dirs.clear();
    }

    /// Retire the reverse, child-name, and virtual-dir records of a
    /// translated path that is going away.
    fn unlink_translated(&mut self, translated: &str) {
        self.reverse.remove(translated);
        let dir = paths::parent(translated);
        let drained = match self.children.get_mut(dir) {
            Some(set) => {
                set.remove(paths::basename(translated));
                set.is_empty()
            }
            None => false,
        };
        if drained {
            self.children.remove(dir);
        }
        paths::retract_virtual_dirs(&mut self.virtual_dirs, &self.children, dir);
    }

    /// Map a presented path to the original-namespace path it serves.
    ///
    /// Exact reverse hits map straight to their original. Otherwise the
    /// nearest translated ancestor contributes its original as a prefix.
    /// Untranslated paths pass through unchanged.
    pub fn resolve(&self, presented: &str) -> String {
        if let Some(original) = self.reverse.get(presented) {
            return original.clone();
        }
        let mut ancestor = paths::parent(presented);
        while ancestor != "/" {
            if let Some(original) = self.reverse.get(ancestor) {
                let suffix = &presented[ancestor.len()..];
                return format!("{original}{suffix}");
            }
            ancestor = paths::parent(ancestor);
        }
        presented.to_owned()
    }

    /// Whether a presented path equals, or lies under, a translated
    /// original and must therefore stay hidden.
    pub fn is_shadowed(&self, path: &str) -> bool {
        paths::is_shadowed(path, &self.forward)
    }

    pub fn is_virtual_dir(&self, path: &str) -> bool {
        self.virtual_dirs.contains(path)
    }

    /// Translated child names recorded directly under `dir`.
    pub fn children_of(&self, dir: &str) -> Option<&BTreeSet<String>> {
        self.children.get(dir)
    }

    /// Basenames of virtual directories sitting directly under `dir`.
    pub fn virtual_children<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = &'a str> {
        self.virtual_dirs
            .iter()
            .filter(move |candidate| candidate.as_str() != dir && paths::parent(candidate) == dir)
            .map(|candidate| paths::basename(candidate))
    }
}
