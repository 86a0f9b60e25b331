//! remapfs - a read-only overlay filesystem that republishes a backing
//! directory tree through a runtime-editable translation table.
//!
//! The [`overlay::TranslationFs`] facade owns the in-memory index, the
//! durable store (through its single-writer worker), the file-handle cache,
//! and the background workers. The [`mount`] module binds the facade to the
//! kernel; the [`admin`] module exposes the mutation API over HTTP.

pub mod admin;
pub mod backup_task;
pub mod cache;
pub mod index;
pub mod mount;
pub mod overlay;
pub mod paths;
pub mod store;
mod store_task;
mod watch_task;
