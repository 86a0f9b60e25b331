//! FUSE binding: adapts kernel callbacks onto the facade.
//!
//! The kernel routes by inode, the facade by presented path, so the
//! binding keeps a bidirectional inode table (root `/` is inode 1). The
//! FUSE session dispatches on a single thread; each callback bridges into
//! the async facade through a runtime handle.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyXattr, Request,
};
use tokio::runtime::Handle;
use tracing::debug;

use crate::overlay::{EntryAttr, Timestamp, TranslationFs};
use crate::paths;

/// Kernel attribute cache lifetime. The table mutates at runtime, so keep
/// it short.
const TTL: Duration = Duration::from_secs(1);

const BLOCK_SIZE: u32 = 512;

/// Bidirectional inode table over presented paths.
struct InodeTable {
    paths: HashMap<u64, String>,
    inodes: HashMap<String, u64>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        let mut paths = HashMap::new();
        let mut inodes = HashMap::new();
        paths.insert(fuser::FUSE_ROOT_ID, "/".to_owned());
        inodes.insert("/".to_owned(), fuser::FUSE_ROOT_ID);
        Self { paths, inodes, next: fuser::FUSE_ROOT_ID + 1 }
    }

    /// The presented path for an inode the kernel handed back.
    fn path(&self, ino: u64) -> Option<&str> {
        self.paths.get(&ino).map(String::as_str)
    }

    /// The inode for a presented path, allocating one on first sight.
    fn ensure(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.inodes.get(path) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.paths.insert(ino, path.to_owned());
        self.inodes.insert(path.to_owned(), ino);
        ino
    }
}

/// The `fuser` adapter over a shared [`TranslationFs`].
pub struct MountFs {
    fs: Arc<TranslationFs>,
    handle: Handle,
    inodes: InodeTable,
}

impl MountFs {
    pub fn new(fs: Arc<TranslationFs>, handle: Handle) -> Self {
        Self { fs, handle, inodes: InodeTable::new() }
    }

    fn attr_for(&self, ino: u64, attr: &EntryAttr) -> FileAttr {
        FileAttr {
            ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: system_time(attr.atime),
            mtime: system_time(attr.mtime),
            ctime: system_time(attr.ctime),
            crtime: UNIX_EPOCH,
            kind: file_type_of(attr.mode),
            perm: (attr.mode & 0o7777) as u16,
            nlink: attr.nlink,
            uid: attr.uid,
            gid: attr.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}

impl Filesystem for MountFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some(parent_path) = self.inodes.path(parent) else {
            reply.error(libc::ENOENT);
            return;
        };
        let path = paths::join_presented(parent_path, &name.to_string_lossy());
        match self.handle.block_on(self.fs.get_attr(&path)) {
            Ok(attr) => {
                let ino = self.inodes.ensure(&path);
                reply.entry(&TTL, &self.attr_for(ino, &attr), 0);
            }
            Err(err) => reply.error(err.errno()),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.handle.block_on(self.fs.get_attr(path)) {
            Ok(attr) => reply.attr(&TTL, &self.attr_for(ino, &attr)),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.handle.block_on(self.fs.access(path, mask)) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let Some(path) = self.inodes.path(ino).map(str::to_owned) else {
            reply.error(libc::ENOENT);
            return;
        };
        let names = match self.handle.block_on(self.fs.read_dir(&path)) {
            Ok(names) => names,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };

        for (position, name) in names.iter().enumerate().skip(offset.max(0) as usize) {
            let (entry_ino, kind) = match name.as_str() {
                "." => (ino, FileType::Directory),
                ".." => (self.inodes.ensure(paths::parent(&path)), FileType::Directory),
                other => {
                    let child = paths::join_presented(&path, other);
                    let kind = match self.handle.block_on(self.fs.get_attr(&child)) {
                        Ok(attr) if attr.is_dir() => FileType::Directory,
                        _ => FileType::RegularFile,
                    };
                    (self.inodes.ensure(&child), kind)
                }
            };
            if reply.add(entry_ino, (position + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.handle.block_on(self.fs.open(path, flags)) {
            Ok(handle) => reply.opened(handle, 0),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        match self.handle.block_on(self.fs.read(path, size, offset.max(0) as u64)) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(err.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        if let Some(path) = self.inodes.path(ino) {
            let _ = self.handle.block_on(self.fs.release(path));
        }
        reply.ok();
    }

    fn getxattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        name: &OsStr,
        size: u32,
        reply: ReplyXattr,
    ) {
        let Some(path) = self.inodes.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };
        let value = match self.handle.block_on(self.fs.get_xattr(path, &name.to_string_lossy())) {
            Ok(value) => value,
            Err(err) => {
                reply.error(err.errno());
                return;
            }
        };
        if size == 0 {
            reply.size(value.len() as u32);
        } else if value.len() <= size as usize {
            reply.data(&value);
        } else {
            reply.error(libc::ERANGE);
        }
    }

    fn setlk(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        _lock_owner: u64,
        _start: u64,
        _end: u64,
        _typ: i32,
        _pid: u32,
        _sleep: bool,
        reply: ReplyEmpty,
    ) {
        debug!("advisory lock granted for inode {ino}");
        match self.inodes.path(ino).map(|path| self.fs.lock(path)) {
            Some(Ok(())) | None => reply.ok(),
            Some(Err(err)) => reply.error(err.errno()),
        }
    }

    fn destroy(&mut self) {
        self.handle.block_on(self.fs.destroy());
    }
}

/// Mount the overlay read-only and serve the kernel until unmounted.
pub fn mount(fs: Arc<TranslationFs>, handle: Handle, mountpoint: &Path) -> std::io::Result<()> {
    let options = [MountOption::RO, MountOption::FSName("remapfs".to_owned())];
    fuser::mount2(MountFs::new(fs, handle), mountpoint, &options)
}

fn system_time(stamp: Timestamp) -> SystemTime {
    if stamp.seconds >= 0 {
        UNIX_EPOCH + Duration::new(stamp.seconds as u64, stamp.nanos)
    } else {
        UNIX_EPOCH - Duration::new(stamp.seconds.unsigned_abs(), 0)
    }
}

fn file_type_of(mode: u32) -> FileType {
    match mode & (libc::S_IFMT as u32) {
        value if value == libc::S_IFDIR as u32 => FileType::Directory,
        value if value == libc::S_IFLNK as u32 => FileType::Symlink,
        value if value == libc::S_IFBLK as u32 => FileType::BlockDevice,
        value if value == libc::S_IFCHR as u32 => FileType::CharDevice,
        value if value == libc::S_IFIFO as u32 => FileType::NamedPipe,
        value if value == libc::S_IFSOCK as u32 => FileType::Socket,
        _ => FileType::RegularFile,
    }
}
