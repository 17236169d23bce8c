// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Inode number bookkeeping for the FUSE adapter
//!
//! The engine is path-addressed while the kernel speaks inode numbers. This
//! table hands out a stable number per path and keeps both directions in
//! sync across renames and removals.

use std::collections::HashMap;

/// Inode number of the mount root (`FUSE_ROOT_ID`)
pub const ROOT_INODE: u64 = 1;

#[derive(Debug)]
pub struct InodeTable {
    inodes: HashMap<u64, String>,
    paths: HashMap<String, u64>,
    next_inode: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InodeTable {
    pub fn new() -> Self {
        let mut inodes = HashMap::new();
        let mut paths = HashMap::new();
        inodes.insert(ROOT_INODE, "/".to_string());
        paths.insert("/".to_string(), ROOT_INODE);
        Self {
            inodes,
            paths,
            next_inode: ROOT_INODE + 1,
        }
    }

    pub fn path(&self, ino: u64) -> Option<&str> {
        self.inodes.get(&ino).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.inodes.len()
    }

    /// Existing inode for `path`, or a freshly allocated one
    pub fn get_or_alloc(&mut self, path: &str) -> u64 {
        if let Some(&ino) = self.paths.get(path) {
            return ino;
        }
        let ino = self.next_inode;
        self.next_inode += 1;
        self.paths.insert(path.to_string(), ino);
        self.inodes.insert(ino, path.to_string());
        ino
    }

    /// Drop `path` and everything below it
    pub fn remove_subtree(&mut self, path: &str) {
        let doomed: Vec<String> = self
            .paths
            .keys()
            .filter(|p| is_within(p, path))
            .cloned()
            .collect();
        for p in doomed {
            if let Some(ino) = self.paths.remove(&p) {
                self.inodes.remove(&ino);
            }
        }
    }

    /// Re-key `old` and its descendants under `new`, keeping inode numbers
    pub fn rename_subtree(&mut self, old: &str, new: &str) {
        let moved: Vec<(String, u64)> = self
            .paths
            .iter()
            .filter(|(p, _)| is_within(p, old))
            .map(|(p, &ino)| (p.clone(), ino))
            .collect();
        for (p, _) in &moved {
            self.paths.remove(p);
        }
        for (p, ino) in moved {
            let renamed = format!("{}{}", new, &p[old.len()..]);
            self.paths.insert(renamed.clone(), ino);
            self.inodes.insert(ino, renamed);
        }
    }

    /// Kernel dropped its last reference to `ino`
    pub fn forget(&mut self, ino: u64) {
        if ino == ROOT_INODE {
            return;
        }
        if let Some(path) = self.inodes.remove(&ino) {
            self.paths.remove(&path);
        }
    }
}

/// `path` equals `prefix` or lies below it
fn is_within(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Join a directory path and an entry name
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Directory containing `path`; the root is its own parent
pub fn parent_path(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}
