//! The filesystem facade: read-side operations over the translation index.

pub(crate) mod fs;
mod ops;

pub use fs::TranslationFs;

use std::fmt;
use std::io;
use std::os::unix::fs::MetadataExt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::paths;

/// Result of facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Facade errors, each projecting onto the POSIX errno the kernel binding
/// reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No backing entry exists after resolution.
    NoEntry,
    /// The backing entry refused the requested access mode.
    Access,
    /// The backing filesystem does not provide the requested operation.
    NotSupported,
    /// The persistence layer failed; the in-memory index was left as it
    /// was before the mutation.
    Store(String),
    /// Any other failure, surfaced as `EINVAL`.
    Invalid,
    /// A raw operating-system error, passed through unchanged.
    Os(i32),
}

impl Error {
    /// The errno the kernel binding should report.
    pub fn errno(&self) -> i32 {
        match self {
            Error::NoEntry => libc::ENOENT,
            Error::Access => libc::EACCES,
            Error::NotSupported => libc::ENOTSUP,
            Error::Store(_) | Error::Invalid => libc::EINVAL,
            Error::Os(errno) => *errno,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoEntry => write!(f, "no such entry"),
            Error::Access => write!(f, "access denied"),
            Error::NotSupported => write!(f, "operation not supported"),
            Error::Store(message) => write!(f, "store error: {message}"),
            Error::Invalid => write!(f, "invalid operation"),
            Error::Os(errno) => write!(f, "os error {errno}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.raw_os_error() {
            Some(libc::ENOENT) => Error::NoEntry,
            Some(libc::EACCES) => Error::Access,
            Some(libc::ENOTSUP) => Error::NotSupported,
            Some(errno) => Error::Os(errno),
            None => match err.kind() {
                io::ErrorKind::NotFound => Error::NoEntry,
                io::ErrorKind::PermissionDenied => Error::Access,
                io::ErrorKind::Unsupported => Error::NotSupported,
                _ => Error::Invalid,
            },
        }
    }
}

/// Seconds-and-nanoseconds timestamp as reported by the backing filesystem.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl Timestamp {
    /// The current wall-clock time.
    pub fn now() -> Self {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self { seconds: elapsed.as_secs() as i64, nanos: elapsed.subsec_nanos() }
    }
}

/// Canonical metadata fields returned by [`TranslationFs::get_attr`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EntryAttr {
    pub mode: u32,
    pub nlink: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub atime: Timestamp,
    pub mtime: Timestamp,
    pub ctime: Timestamp,
}

impl EntryAttr {
    /// Metadata of a real backing entry, `lstat` semantics.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        Self {
            mode: meta.mode(),
            nlink: meta.nlink() as u32,
            size: meta.size(),
            uid: meta.uid(),
            gid: meta.gid(),
            atime: Timestamp { seconds: meta.atime(), nanos: meta.atime_nsec() as u32 },
            mtime: Timestamp { seconds: meta.mtime(), nanos: meta.mtime_nsec() as u32 },
            ctime: Timestamp { seconds: meta.ctime(), nanos: meta.ctime_nsec() as u32 },
        }
    }

    /// Synthesized directory entry for a virtual path component.
    pub fn virtual_dir() -> Self {
        let now = Timestamp::now();
        Self {
            mode: (libc::S_IFDIR as u32) | 0o755,
            nlink: 2,
            size: 0,
            uid: process_uid(),
            gid: process_gid(),
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    /// Synthesized empty regular file for a compatibility entry.
    pub fn compat_file() -> Self {
        let now = Timestamp::now();
        Self {
            mode: (libc::S_IFREG as u32) | 0o644,
            nlink: 1,
            size: 0,
            uid: process_uid(),
            gid: process_gid(),
            atime: now,
            mtime: now,
            ctime: now,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.mode & (libc::S_IFMT as u32) == libc::S_IFDIR as u32
    }
}

fn process_uid() -> u32 {
    unsafe { libc::getuid() }
}

fn process_gid() -> u32 {
    unsafe { libc::getgid() }
}

/// Names synthesized in every directory for media-server probes.
pub const COMPAT_NAMES: [&str; 3] = [".grab", ".plexmatch", ".plexignore"];

/// Whether a presented path names a synthesized compatibility entry: one of
/// the [`COMPAT_NAMES`], or any path with a dot-prefixed component.
pub fn is_compat_path(path: &str) -> bool {
    COMPAT_NAMES.contains(&paths::basename(path)) || path.contains("/.")
}
