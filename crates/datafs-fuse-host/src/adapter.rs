// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! DataFS FUSE adapter implementation
//!
//! Maps FUSE operations to DataFS Core calls.

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
compile_error!("This module requires the 'fuse' feature on Linux");

use crate::inodes::{child_path, parent_path, InodeTable, ROOT_INODE};
use datafs_core::{Attributes, FileKind, FsCore, FsError};
use fuser::{
    FileAttr, FileType, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow, FUSE_ROOT_ID,
};
use libc::{c_int, EINVAL, ENAMETOOLONG, ENOENT};
use std::ffi::OsStr;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Maximum length of a single path component
const NAME_MAX: usize = 255;

const _: () = assert!(ROOT_INODE == FUSE_ROOT_ID);

/// DataFS FUSE filesystem adapter
pub struct DataFsFuse {
    core: FsCore,
    attr_ttl: Duration,
    entry_ttl: Duration,
    inodes: InodeTable,
}

/// Map an engine error to its errno, logging the failure
fn errno(op: &str, path: &str, err: &FsError) -> c_int {
    debug!(target: "datafs::fuse", op, path, %err, "request failed");
    err.errno()
}

fn file_type(kind: FileKind) -> FileType {
    match kind {
        FileKind::Directory => FileType::Directory,
        FileKind::RegularFile => FileType::RegularFile,
    }
}

fn resolve_time(time: TimeOrNow) -> SystemTime {
    match time {
        TimeOrNow::SpecificTime(t) => t,
        TimeOrNow::Now => SystemTime::now(),
    }
}

impl DataFsFuse {
    pub fn new(core: FsCore) -> Self {
        let attr_ttl = Duration::from_millis(core.config().cache.attr_ttl_ms);
        let entry_ttl = Duration::from_millis(core.config().cache.entry_ttl_ms);
        Self {
            core,
            attr_ttl,
            entry_ttl,
            inodes: InodeTable::new(),
        }
    }

    fn path_of(&self, ino: u64) -> Result<String, c_int> {
        self.inodes.path(ino).map(str::to_string).ok_or(ENOENT)
    }

    /// Full path of `name` inside directory `parent`
    fn entry_path(&self, parent: u64, name: &OsStr) -> Result<String, c_int> {
        let name = name.to_str().ok_or(EINVAL)?;
        if name.len() > NAME_MAX {
            return Err(ENAMETOOLONG);
        }
        Ok(child_path(&self.path_of(parent)?, name))
    }

    /// Owner is not modeled; every node reports the requesting user.
    fn attr_to_fuse(&self, attr: &Attributes, ino: u64, req: &Request) -> FileAttr {
        let size = attr.len();
        FileAttr {
            ino,
            size,
            blocks: size.div_ceil(512),
            atime: attr.times.atime,
            mtime: attr.times.mtime,
            ctime: attr.times.ctime,
            crtime: attr.times.ctime,
            kind: file_type(attr.kind),
            perm: (attr.perm & 0o7777) as u16,
            nlink: attr.nlink,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: self.core.config().statfs.block_size,
            flags: 0,
        }
    }

    /// Stat `path` and reply with a fresh entry for it
    fn reply_entry(&mut self, req: &Request, op: &str, path: &str, reply: ReplyEntry) {
        match self.core.getattr(path) {
            Ok(attr) => {
                let ino = self.inodes.get_or_alloc(path);
                let fuse_attr = self.attr_to_fuse(&attr, ino, req);
                reply.entry(&self.entry_ttl, &fuse_attr, 0);
            }
            Err(err) => reply.error(errno(op, path, &err)),
        }
    }
}

impl fuser::Filesystem for DataFsFuse {
    fn init(&mut self, _req: &Request, _config: &mut fuser::KernelConfig) -> Result<(), c_int> {
        info!(
            target: "datafs::fuse",
            nodes = self.core.node_count(),
            write_mode = %self.core.config().write_mode,
            "DataFS FUSE adapter initialized"
        );
        Ok(())
    }

    fn destroy(&mut self) {
        info!(target: "datafs::fuse", inodes = self.inodes.len(), "DataFS FUSE adapter destroyed");
    }

    fn forget(&mut self, _req: &Request, ino: u64, _nlookup: u64) {
        self.inodes.forget(ino);
    }

    fn lookup(&mut self, req: &Request, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let path = match self.entry_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "lookup", path = path.as_str());
        self.reply_entry(req, "lookup", &path, reply);
    }

    fn getattr(&mut self, req: &Request, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "getattr", ino, path = path.as_str());
        match self.core.getattr(&path) {
            Ok(attr) => reply.attr(&self.attr_ttl, &self.attr_to_fuse(&attr, ino, req)),
            Err(err) => reply.error(errno("getattr", &path, &err)),
        }
    }

    fn setattr(
        &mut self,
        req: &Request,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(
            target: "datafs::fuse",
            op = "setattr",
            path = path.as_str(),
            ?mode,
            ?size,
            has_atime = atime.is_some(),
            has_mtime = mtime.is_some()
        );

        // Refuse unsupported changes before touching anything else.
        let refused = if let Some(mode) = mode {
            self.core.chmod(&path, mode)
        } else if uid.is_some() || gid.is_some() {
            self.core.chown(&path, uid.unwrap_or(u32::MAX), gid.unwrap_or(u32::MAX))
        } else {
            Ok(())
        };
        if let Err(err) = refused {
            return reply.error(errno("setattr", &path, &err));
        }

        if let Some(size) = size {
            if let Err(err) = self.core.truncate(&path, size) {
                return reply.error(errno("setattr", &path, &err));
            }
        }

        if atime.is_some() || mtime.is_some() {
            let current = match self.core.getattr(&path) {
                Ok(attr) => attr.times,
                Err(err) => return reply.error(errno("setattr", &path, &err)),
            };
            let times = (
                atime.map_or(current.atime, resolve_time),
                mtime.map_or(current.mtime, resolve_time),
            );
            if let Err(err) = self.core.utimens(&path, Some(times)) {
                return reply.error(errno("setattr", &path, &err));
            }
        }

        match self.core.getattr(&path) {
            Ok(attr) => reply.attr(&self.attr_ttl, &self.attr_to_fuse(&attr, ino, req)),
            Err(err) => reply.error(errno("setattr", &path, &err)),
        }
    }

    fn statfs(&mut self, _req: &Request, ino: u64, reply: ReplyStatfs) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.core.statfs(&path) {
            Ok(stats) => reply.statfs(
                stats.total_blocks,
                stats.free_blocks,
                stats.free_blocks,
                self.core.node_count() as u64,
                0,
                stats.block_size,
                NAME_MAX as u32,
                stats.block_size,
            ),
            Err(err) => reply.error(errno("statfs", &path, &err)),
        }
    }

    fn open(&mut self, _req: &Request, ino: u64, flags: i32, reply: ReplyOpen) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "open", path = path.as_str(), flags);

        if flags & libc::O_TRUNC != 0 {
            if let Err(err) = self.core.truncate(&path, 0) {
                return reply.error(errno("open", &path, &err));
            }
        }
        match self.core.open(&path, flags) {
            Ok(handle) => reply.opened(handle.0, 0),
            Err(err) => reply.error(errno("open", &path, &err)),
        }
    }

    fn read(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(EINVAL);
        };
        debug!(target: "datafs::fuse", op = "read", path = path.as_str(), offset, size);

        match self.core.read(&path, size as usize, offset) {
            Ok(data) => reply.data(&data),
            Err(err) => reply.error(errno("read", &path, &err)),
        }
    }

    fn write(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let Ok(offset) = u64::try_from(offset) else {
            return reply.error(EINVAL);
        };
        debug!(target: "datafs::fuse", op = "write", path = path.as_str(), offset, len = data.len());

        match self.core.write(&path, data, offset) {
            Ok(written) => reply.written(written as u32),
            Err(err) => reply.error(errno("write", &path, &err)),
        }
    }

    fn release(
        &mut self,
        _req: &Request,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        // Handles carry no state in the engine.
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "readdir", path = path.as_str(), offset);

        let children = match self.core.readdir_entries(&path) {
            Ok(children) => children,
            Err(err) => return reply.error(errno("readdir", &path, &err)),
        };

        let parent_ino = self.inodes.get_or_alloc(parent_path(&path));
        let mut entries = vec![
            (ino, FileType::Directory, ".".to_string()),
            (parent_ino, FileType::Directory, "..".to_string()),
        ];
        for child in children {
            let child_ino = self.inodes.get_or_alloc(&child_path(&path, &child.name));
            entries.push((child_ino, file_type(child.kind), child.name));
        }

        let skip = usize::try_from(offset).unwrap_or(0);
        for (i, (entry_ino, kind, name)) in entries.into_iter().enumerate().skip(skip) {
            if reply.add(entry_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }
        reply.ok();
    }

    fn create(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.entry_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "create", path = path.as_str(), mode);

        let handle = match self.core.create(&path, mode & !umask) {
            Ok(handle) => handle,
            Err(err) => return reply.error(errno("create", &path, &err)),
        };
        match self.core.getattr(&path) {
            Ok(attr) => {
                let ino = self.inodes.get_or_alloc(&path);
                let fuse_attr = self.attr_to_fuse(&attr, ino, req);
                reply.created(&self.entry_ttl, &fuse_attr, 0, handle.0, 0);
            }
            Err(err) => reply.error(errno("create", &path, &err)),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request,
        parent: u64,
        name: &OsStr,
        mode: u32,
        umask: u32,
        reply: ReplyEntry,
    ) {
        let path = match self.entry_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "mkdir", path = path.as_str(), mode);

        if let Err(err) = self.core.mkdir(&path, mode & !umask) {
            return reply.error(errno("mkdir", &path, &err));
        }
        self.reply_entry(req, "mkdir", &path, reply);
    }

    fn unlink(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.entry_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "unlink", path = path.as_str());

        match self.core.unlink(&path) {
            Ok(()) => {
                self.inodes.remove_subtree(&path);
                reply.ok();
            }
            Err(err) => reply.error(errno("unlink", &path, &err)),
        }
    }

    fn rmdir(&mut self, _req: &Request, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.entry_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        debug!(target: "datafs::fuse", op = "rmdir", path = path.as_str());

        match self.core.rmdir(&path) {
            Ok(()) => {
                self.inodes.remove_subtree(&path);
                reply.ok();
            }
            Err(err) => reply.error(errno("rmdir", &path, &err)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        let (old_path, new_path) = match (
            self.entry_path(parent, name),
            self.entry_path(newparent, newname),
        ) {
            (Ok(old), Ok(new)) => (old, new),
            (Err(code), _) | (_, Err(code)) => return reply.error(code),
        };
        debug!(
            target: "datafs::fuse",
            op = "rename",
            old = old_path.as_str(),
            new = new_path.as_str(),
            flags
        );

        // RENAME_EXCHANGE and friends have no engine counterpart.
        if flags != 0 {
            return reply.error(EINVAL);
        }

        match self.core.rename(&old_path, &new_path) {
            Ok(()) => {
                self.inodes.rename_subtree(&old_path, &new_path);
                reply.ok();
            }
            Err(err) => reply.error(errno("rename", &old_path, &err)),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request,
        parent: u64,
        name: &OsStr,
        link: &Path,
        reply: ReplyEntry,
    ) {
        let path = match self.entry_path(parent, name) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let target = link.to_string_lossy();
        let err = self
            .core
            .symlink(&target, &path)
            .err()
            .unwrap_or(FsError::Unsupported);
        reply.error(errno("symlink", &path, &err));
    }

    fn readlink(&mut self, _req: &Request, ino: u64, reply: ReplyData) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.core.readlink(&path) {
            Ok(target) => reply.data(target.as_bytes()),
            Err(err) => reply.error(errno("readlink", &path, &err)),
        }
    }

    fn getxattr(&mut self, _req: &Request, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let name = name.to_string_lossy();
        match self.core.xattr_get(&path, &name) {
            Ok(value) => {
                if size == 0 {
                    reply.size(value.len() as u32);
                } else if value.len() <= size as usize {
                    reply.data(&value);
                } else {
                    reply.error(libc::ERANGE);
                }
            }
            Err(err) => reply.error(errno("getxattr", &path, &err)),
        }
    }

    fn setxattr(
        &mut self,
        _req: &Request,
        ino: u64,
        name: &OsStr,
        value: &[u8],
        _flags: i32,
        _position: u32,
        reply: ReplyEmpty,
    ) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let name = name.to_string_lossy();
        match self.core.xattr_set(&path, &name, value) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno("setxattr", &path, &err)),
        }
    }

    fn listxattr(&mut self, _req: &Request, ino: u64, size: u32, reply: ReplyXattr) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        match self.core.xattr_list(&path) {
            Ok(names) => {
                let mut buffer = Vec::new();
                for name in &names {
                    buffer.extend_from_slice(name.as_bytes());
                    buffer.push(0);
                }

                if size == 0 {
                    reply.size(buffer.len() as u32);
                } else if buffer.len() <= size as usize {
                    reply.data(&buffer);
                } else {
                    reply.error(libc::ERANGE);
                }
            }
            Err(err) => reply.error(errno("listxattr", &path, &err)),
        }
    }

    fn removexattr(&mut self, _req: &Request, ino: u64, name: &OsStr, reply: ReplyEmpty) {
        let path = match self.path_of(ino) {
            Ok(path) => path,
            Err(code) => return reply.error(code),
        };
        let name = name.to_string_lossy();
        match self.core.xattr_remove(&path, &name) {
            Ok(()) => reply.ok(),
            Err(err) => reply.error(errno("removexattr", &path, &err)),
        }
    }
}
