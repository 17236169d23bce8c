// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Core type definitions for DataFS

use std::time::SystemTime;

/// Opaque handle identifier returned by `create` and `open`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

impl HandleId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Node kind, fixed when the node is constructed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

impl FileKind {
    /// File-type bits (`S_IFDIR` / `S_IFREG`) for this kind
    pub fn type_bits(self) -> u32 {
        match self {
            FileKind::Directory => libc::S_IFDIR as u32,
            FileKind::RegularFile => libc::S_IFREG as u32,
        }
    }
}

/// File timestamps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileTimes {
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl FileTimes {
    pub fn now() -> Self {
        let now = SystemTime::now();
        Self {
            atime: now,
            mtime: now,
            ctime: now,
        }
    }
}

/// Attribute snapshot of a node
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub kind: FileKind,
    /// Permission bits only; see [`Attributes::mode`] for the full mode.
    pub perm: u32,
    pub nlink: u32,
    pub times: FileTimes,
    /// Byte length; present for regular files only.
    pub size: Option<u64>,
}

impl Attributes {
    /// Full `st_mode`: type bits or'd with permission bits
    pub fn mode(&self) -> u32 {
        self.kind.type_bits() | (self.perm & 0o7777)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn len(&self) -> u64 {
        self.size.unwrap_or(0)
    }
}

/// Directory entry information
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: FileKind,
}

/// Filesystem statistics reported by `statfs`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatFs {
    pub block_size: u32,
    pub total_blocks: u64,
    pub free_blocks: u64,
}
