// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Virtual filesystem implementation for DataFS Core

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use tracing::debug;

use crate::dataset::DatasetSource;
use crate::error::{FsError, FsResult};
use crate::tree::{NodeKind, Tree, split_parent};
use crate::{Attributes, DirEntry, FsConfig, HandleId, StatFs, WriteMode};

/// The main filesystem core implementation
///
/// All state lives behind one mutex that every public operation holds for its
/// full duration, so each call observes the tree exactly as the previous call
/// left it.
pub struct FsCore {
    config: FsConfig,
    tree: Mutex<Tree>,
    next_handle_id: AtomicU64,
}

impl FsCore {
    /// Create an empty filesystem containing only the root directory
    pub fn new(config: FsConfig) -> Self {
        let tree = Tree::new(config.dir_mode);
        Self {
            config,
            tree: Mutex::new(tree),
            next_handle_id: AtomicU64::new(1),
        }
    }

    /// Build a filesystem from a dataset; fails without a partial tree
    pub fn from_source(config: FsConfig, source: &dyn DatasetSource) -> FsResult<Self> {
        let contents = source.load()?;
        let core = Self::new(config);
        crate::bridge::populate(&core, &contents)?;
        Ok(core)
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    /// Number of nodes currently in the tree, root included
    pub fn node_count(&self) -> usize {
        self.tree().len()
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_handle_id(&self) -> HandleId {
        HandleId::new(self.next_handle_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn getattr(&self, path: &str) -> FsResult<Attributes> {
        let tree = self.tree();
        let id = tree.resolve(path).inspect_err(|err| {
            debug!(path, %err, "getattr failed");
        })?;
        Ok(tree.node(id)?.attributes())
    }

    /// List a directory: `.`, `..`, then each child in insertion order
    pub fn readdir(&self, path: &str) -> FsResult<Vec<String>> {
        let entries = self.readdir_entries(path)?;
        let mut names = Vec::with_capacity(entries.len() + 2);
        names.push(".".to_string());
        names.push("..".to_string());
        names.extend(entries.into_iter().map(|e| e.name));
        Ok(names)
    }

    /// Children of a directory with their kinds, without the synthetic entries
    pub fn readdir_entries(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let tree = self.tree();
        let id = tree.resolve(path)?;
        let node = tree.node(id)?;
        if !node.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let entries = node
            .children
            .iter()
            .map(|&child| {
                let child = tree.node(child)?;
                Ok(DirEntry {
                    name: child.name.clone(),
                    kind: child.file_kind(),
                })
            })
            .collect::<FsResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// Create an empty regular file and return a fresh handle
    pub fn create(&self, path: &str, mode: u32) -> FsResult<HandleId> {
        self.make_node(path, NodeKind::File { data: Vec::new() }, mode)?;
        Ok(self.allocate_handle_id())
    }

    pub fn mkdir(&self, path: &str, mode: u32) -> FsResult<()> {
        self.make_node(path, NodeKind::Directory, mode)
    }

    fn make_node(&self, path: &str, kind: NodeKind, mode: u32) -> FsResult<()> {
        let (parent_path, name) = split_parent(path)?;
        let mut tree = self.tree();
        let parent = tree.resolve(parent_path)?;
        tree.create_child(parent, name, kind, mode & 0o7777)
            .inspect_err(|err| debug!(path, %err, "node creation failed"))?;
        Ok(())
    }

    /// Detach and discard the node at `path`, whatever its kind
    pub fn unlink(&self, path: &str) -> FsResult<()> {
        let mut tree = self.tree();
        let id = tree.resolve(path)?;
        tree.remove_from(id)?;
        tree.discard(id);
        Ok(())
    }

    /// Remove an empty directory
    pub fn rmdir(&self, path: &str) -> FsResult<()> {
        let mut tree = self.tree();
        let id = tree.resolve(path)?;
        let node = tree.node(id)?;
        if !node.is_dir() {
            return Err(FsError::NotADirectory);
        }
        if !node.children.is_empty() {
            debug!(path, children = node.children.len(), "rmdir on non-empty directory");
            return Err(FsError::DirectoryNotEmpty);
        }
        tree.remove_from(id)?;
        tree.discard(id);
        Ok(())
    }

    pub fn rename(&self, old: &str, new: &str) -> FsResult<()> {
        let (new_parent_path, new_name) = split_parent(new)?;
        let mut tree = self.tree();
        let id = tree.resolve(old)?;
        let new_parent = tree.resolve(new_parent_path)?;
        tree.rename(id, new_parent, new_name).inspect_err(|err| {
            debug!(old, new, %err, "rename failed");
        })
    }

    /// Read up to `size` bytes at `offset`; short or empty past end of data
    pub fn read(&self, path: &str, size: usize, offset: u64) -> FsResult<Vec<u8>> {
        let tree = self.tree();
        let id = tree.resolve(path)?;
        let NodeKind::File { data } = &tree.node(id)?.kind else {
            return Err(FsError::IsADirectory);
        };

        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        if start >= data.len() {
            return Ok(Vec::new());
        }
        let end = start.saturating_add(size).min(data.len());
        Ok(data[start..end].to_vec())
    }

    /// Write `buf` at `offset` according to the configured [`WriteMode`]
    pub fn write(&self, path: &str, buf: &[u8], offset: u64) -> FsResult<usize> {
        let mut tree = self.tree();
        let id = tree.resolve(path)?;
        let node = tree.node_mut(id)?;
        let NodeKind::File { data } = &mut node.kind else {
            return Err(FsError::IsADirectory);
        };

        match self.config.write_mode {
            WriteMode::TruncateAppend => {
                let keep = usize::try_from(offset).map_or(data.len(), |o| o.min(data.len()));
                self.ensure_fits(path, (keep as u64).saturating_add(buf.len() as u64))?;
                data.truncate(keep);
                data.extend_from_slice(buf);
            }
            WriteMode::Splice => {
                let end = offset.checked_add(buf.len() as u64).ok_or(FsError::FileTooLarge)?;
                self.ensure_fits(path, end)?;
                let end = usize::try_from(end).map_err(|_| FsError::FileTooLarge)?;
                let start = end - buf.len();
                if end > data.len() {
                    data.resize(end, 0);
                }
                data[start..end].copy_from_slice(buf);
            }
        }
        node.touch();
        Ok(buf.len())
    }

    /// Cut or zero-extend the file to exactly `length` bytes
    pub fn truncate(&self, path: &str, length: u64) -> FsResult<()> {
        let mut tree = self.tree();
        let id = tree.resolve(path)?;
        let node = tree.node_mut(id)?;
        let NodeKind::File { data } = &mut node.kind else {
            return Err(FsError::IsADirectory);
        };
        self.ensure_fits(path, length)?;
        let length = usize::try_from(length).map_err(|_| FsError::FileTooLarge)?;
        data.resize(length, 0);
        node.touch();
        Ok(())
    }

    /// Reject a resulting file size above the configured limit before allocating
    fn ensure_fits(&self, path: &str, size: u64) -> FsResult<()> {
        let limit = self.config.limits.max_file_bytes;
        if size > limit {
            debug!(path, size, limit, "file size limit exceeded");
            return Err(FsError::FileTooLarge);
        }
        Ok(())
    }

    /// Set access and modify times; `None` stamps both with the current time
    pub fn utimens(&self, path: &str, times: Option<(SystemTime, SystemTime)>) -> FsResult<()> {
        let (atime, mtime) = times.unwrap_or_else(|| {
            let now = SystemTime::now();
            (now, now)
        });
        let mut tree = self.tree();
        let id = tree.resolve(path)?;
        let node = tree.node_mut(id)?;
        node.times.atime = atime;
        node.times.mtime = mtime;
        Ok(())
    }

    /// Issue a handle for an existing node; reads and writes stay path-based
    pub fn open(&self, path: &str, _flags: i32) -> FsResult<HandleId> {
        self.tree().resolve(path)?;
        Ok(self.allocate_handle_id())
    }

    pub fn statfs(&self, path: &str) -> FsResult<StatFs> {
        self.tree().resolve(path)?;
        let policy = &self.config.statfs;
        Ok(StatFs {
            block_size: policy.block_size,
            total_blocks: policy.total_blocks,
            free_blocks: policy.free_blocks,
        })
    }

    // Capabilities that are not modeled. Each answers truthfully for a
    // node that has none of them rather than pretending to succeed.

    pub fn xattr_list(&self, path: &str) -> FsResult<Vec<String>> {
        self.tree().resolve(path)?;
        Ok(Vec::new())
    }

    pub fn xattr_get(&self, path: &str, _name: &str) -> FsResult<Vec<u8>> {
        self.tree().resolve(path)?;
        Err(FsError::NoAttribute)
    }

    pub fn xattr_set(&self, path: &str, _name: &str, _value: &[u8]) -> FsResult<()> {
        self.tree().resolve(path)?;
        Err(FsError::Unsupported)
    }

    pub fn xattr_remove(&self, path: &str, _name: &str) -> FsResult<()> {
        self.tree().resolve(path)?;
        Err(FsError::Unsupported)
    }

    pub fn chmod(&self, path: &str, _mode: u32) -> FsResult<()> {
        self.tree().resolve(path)?;
        Err(FsError::Unsupported)
    }

    pub fn chown(&self, path: &str, _uid: u32, _gid: u32) -> FsResult<()> {
        self.tree().resolve(path)?;
        Err(FsError::Unsupported)
    }

    pub fn symlink(&self, _target: &str, _linkpath: &str) -> FsResult<()> {
        Err(FsError::Unsupported)
    }

    pub fn readlink(&self, path: &str) -> FsResult<String> {
        self.tree().resolve(path)?;
        Err(FsError::Unsupported)
    }
}

impl Default for FsCore {
    fn default() -> Self {
        Self::new(FsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn create_test_fs() -> FsCore {
        FsCore::new(FsConfig::default())
    }

    fn splice_fs() -> FsCore {
        FsCore::new(FsConfig {
            write_mode: WriteMode::Splice,
            ..FsConfig::default()
        })
    }

    #[test]
    fn test_root_attributes() {
        let fs = create_test_fs();
        let attrs = fs.getattr("/").expect("root getattr");
        assert!(attrs.is_dir());
        assert_eq!(attrs.mode() & libc::S_IFMT as u32, libc::S_IFDIR as u32);
        assert_eq!(attrs.mode() & 0o777, 0o755);
        assert_eq!(attrs.nlink, 2);
        assert_eq!(attrs.size, None);
    }

    #[test]
    fn test_create_reports_regular_file() {
        let fs = create_test_fs();
        fs.create("/test.txt", 0o640).expect("create");

        let attrs = fs.getattr("/test.txt").expect("getattr");
        assert_eq!(attrs.mode(), libc::S_IFREG as u32 | 0o640);
        assert_eq!(attrs.nlink, 1);
        assert_eq!(attrs.size, Some(0));
    }

    #[test]
    fn test_handles_are_unique_and_increasing() {
        let fs = create_test_fs();
        let first = fs.create("/a", 0o644).unwrap();
        let second = fs.open("/a", libc::O_RDONLY).unwrap();
        let third = fs.create("/b", 0o644).unwrap();
        assert!(first.0 < second.0 && second.0 < third.0);
    }

    #[test]
    fn test_open_requires_existing_node() {
        let fs = create_test_fs();
        assert!(matches!(fs.open("/nope", libc::O_RDONLY), Err(FsError::NotFound)));
    }

    #[test]
    fn test_create_under_missing_or_file_parent() {
        let fs = create_test_fs();
        fs.create("/file", 0o644).unwrap();

        assert!(matches!(fs.create("/missing/x", 0o644), Err(FsError::NotFound)));
        assert!(matches!(fs.mkdir("/file/x", 0o755), Err(FsError::NotADirectory)));
        assert!(matches!(fs.create("/dir/", 0o644), Err(FsError::InvalidName)));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let fs = create_test_fs();
        fs.mkdir("/a", 0o755).unwrap();
        assert!(matches!(fs.create("/a", 0o644), Err(FsError::AlreadyExists)));
        assert!(matches!(fs.mkdir("/a", 0o755), Err(FsError::AlreadyExists)));
        assert_eq!(fs.readdir("/").unwrap(), vec![".", "..", "a"]);
    }

    #[test]
    fn test_readdir_keeps_insertion_order() {
        let fs = create_test_fs();
        fs.create("/zeta", 0o644).unwrap();
        fs.mkdir("/alpha", 0o755).unwrap();
        fs.create("/mid", 0o644).unwrap();

        assert_eq!(fs.readdir("/").unwrap(), vec![".", "..", "zeta", "alpha", "mid"]);
        let kinds: Vec<_> = fs.readdir_entries("/").unwrap().into_iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                crate::FileKind::RegularFile,
                crate::FileKind::Directory,
                crate::FileKind::RegularFile
            ]
        );
    }

    #[test]
    fn test_readdir_on_file_fails() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        assert!(matches!(fs.readdir("/f"), Err(FsError::NotADirectory)));
        assert!(matches!(fs.readdir("/nope"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_write_truncates_tail_by_default() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        assert_eq!(fs.write("/f", b"hello world", 0).unwrap(), 11);
        assert_eq!(fs.write("/f", b"XY", 2).unwrap(), 2);

        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"heXY");
        assert_eq!(fs.getattr("/f").unwrap().size, Some(4));
    }

    #[test]
    fn test_write_past_end_appends_without_gap() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        fs.write("/f", b"abc", 0).unwrap();
        fs.write("/f", b"def", 10).unwrap();
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"abcdef");
    }

    #[test]
    fn test_splice_mode_preserves_tail_and_fills_gap() {
        let fs = splice_fs();
        fs.create("/f", 0o644).unwrap();
        fs.write("/f", b"hello world", 0).unwrap();
        fs.write("/f", b"XY", 2).unwrap();
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"heXYo world");

        fs.write("/f", b"!", 13).unwrap();
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"heXYo world\0\0!");
        assert_eq!(fs.getattr("/f").unwrap().size, Some(14));
    }

    #[test]
    fn test_read_windows() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        fs.write("/f", b"0123456789", 0).unwrap();

        assert_eq!(fs.read("/f", 3, 0).unwrap(), b"012");
        assert_eq!(fs.read("/f", 3, 8).unwrap(), b"89");
        assert!(fs.read("/f", 3, 10).unwrap().is_empty());
        assert!(fs.read("/f", 3, u64::MAX).unwrap().is_empty());
        assert_eq!(fs.read("/f", usize::MAX, 5).unwrap(), b"56789");
    }

    #[test]
    fn test_content_operations_on_directory() {
        let fs = create_test_fs();
        fs.mkdir("/d", 0o755).unwrap();
        assert!(matches!(fs.read("/d", 1, 0), Err(FsError::IsADirectory)));
        assert!(matches!(fs.write("/d", b"x", 0), Err(FsError::IsADirectory)));
        assert!(matches!(fs.truncate("/d", 0), Err(FsError::IsADirectory)));
    }

    #[test]
    fn test_truncate_shrinks_and_zero_extends() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        fs.write("/f", b"abcdef", 0).unwrap();

        fs.truncate("/f", 2).unwrap();
        assert_eq!(fs.getattr("/f").unwrap().size, Some(2));
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"ab");

        fs.truncate("/f", 4).unwrap();
        assert_eq!(fs.getattr("/f").unwrap().size, Some(4));
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"ab\0\0");
    }

    #[test]
    fn test_huge_lengths_fail_without_allocating() {
        let fs = splice_fs();
        fs.create("/f", 0o644).unwrap();
        fs.write("/f", b"abc", 0).unwrap();

        assert!(matches!(fs.truncate("/f", u64::MAX), Err(FsError::FileTooLarge)));
        assert!(matches!(
            fs.write("/f", b"x", u64::MAX - 1),
            Err(FsError::FileTooLarge)
        ));
        assert!(matches!(fs.write("/f", b"xy", u64::MAX), Err(FsError::FileTooLarge)));
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"abc");
        assert_eq!(fs.getattr("/f").unwrap().size, Some(3));
    }

    #[test]
    fn test_file_size_limit_applies_to_every_growth_path() {
        let mut config = FsConfig::default();
        config.limits.max_file_bytes = 8;
        let fs = FsCore::new(config.clone());
        fs.create("/f", 0o644).unwrap();

        fs.truncate("/f", 8).unwrap();
        assert!(matches!(fs.truncate("/f", 9), Err(FsError::FileTooLarge)));
        fs.write("/f", b"12345678", 0).unwrap();
        assert!(matches!(fs.write("/f", b"9", 8), Err(FsError::FileTooLarge)));
        assert!(matches!(fs.write("/f", b"abc", u64::MAX), Err(FsError::FileTooLarge)));
        assert_eq!(fs.read("/f", 100, 0).unwrap(), b"12345678");

        config.write_mode = WriteMode::Splice;
        let fs = FsCore::new(config);
        fs.create("/g", 0o644).unwrap();
        fs.write("/g", b"ab", 6).unwrap();
        assert!(matches!(fs.write("/g", b"ab", 7), Err(FsError::FileTooLarge)));
        assert_eq!(fs.getattr("/g").unwrap().size, Some(8));
    }

    #[test]
    fn test_write_stamps_modify_time() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        let past = UNIX_EPOCH + Duration::from_secs(1_000);
        fs.utimens("/f", Some((past, past))).unwrap();

        fs.write("/f", b"x", 0).unwrap();
        let attrs = fs.getattr("/f").unwrap();
        assert!(attrs.times.mtime > past);
        assert_eq!(attrs.times.atime, past);
    }

    #[test]
    fn test_utimens_sets_both_times() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        let atime = UNIX_EPOCH + Duration::from_secs(10);
        let mtime = UNIX_EPOCH + Duration::from_secs(20);
        let before = fs.getattr("/f").unwrap();

        fs.utimens("/f", Some((atime, mtime))).unwrap();
        let attrs = fs.getattr("/f").unwrap();
        assert_eq!(attrs.times.atime, atime);
        assert_eq!(attrs.times.mtime, mtime);
        assert_eq!(attrs.times.ctime, before.times.ctime);

        fs.utimens("/f", None).unwrap();
        let attrs = fs.getattr("/f").unwrap();
        assert!(attrs.times.atime > atime);
        assert_eq!(attrs.times.atime, attrs.times.mtime);
    }

    #[test]
    fn test_unlink_removes_file_and_drops_parent_link() {
        let fs = create_test_fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/f", 0o644).unwrap();
        assert_eq!(fs.getattr("/d").unwrap().nlink, 3);

        fs.unlink("/d/f").unwrap();
        assert_eq!(fs.getattr("/d").unwrap().nlink, 2);
        assert!(matches!(fs.getattr("/d/f"), Err(FsError::NotFound)));
        assert!(matches!(fs.unlink("/d/f"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_unlink_directory_discards_subtree() {
        let fs = create_test_fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/f", 0o644).unwrap();
        assert_eq!(fs.node_count(), 3);

        fs.unlink("/d").unwrap();
        assert_eq!(fs.node_count(), 1);
    }

    #[test]
    fn test_rmdir_requires_empty_directory() {
        let fs = create_test_fs();
        fs.mkdir("/d", 0o755).unwrap();
        fs.create("/d/f", 0o644).unwrap();

        assert!(matches!(fs.rmdir("/d"), Err(FsError::DirectoryNotEmpty)));
        assert!(matches!(fs.rmdir("/d/f"), Err(FsError::NotADirectory)));
        fs.unlink("/d/f").unwrap();
        fs.rmdir("/d").unwrap();
        assert_eq!(fs.readdir("/").unwrap(), vec![".", ".."]);
    }

    #[test]
    fn test_root_cannot_be_removed() {
        let fs = create_test_fs();
        assert!(matches!(fs.rmdir("/"), Err(FsError::InvalidArgument)));
        assert!(matches!(fs.unlink("/"), Err(FsError::InvalidArgument)));
    }

    #[test]
    fn test_rename_across_directories() {
        let fs = create_test_fs();
        fs.mkdir("/src", 0o755).unwrap();
        fs.mkdir("/dst", 0o755).unwrap();
        fs.create("/src/f", 0o644).unwrap();
        fs.write("/src/f", b"payload", 0).unwrap();

        fs.rename("/src/f", "/dst/g").unwrap();
        assert!(matches!(fs.getattr("/src/f"), Err(FsError::NotFound)));
        assert_eq!(fs.read("/dst/g", 100, 0).unwrap(), b"payload");
        assert_eq!(fs.getattr("/src").unwrap().nlink, 2);
        assert_eq!(fs.getattr("/dst").unwrap().nlink, 3);
    }

    #[test]
    fn test_rename_onto_existing_name_fails_untouched() {
        let fs = create_test_fs();
        fs.create("/a", 0o644).unwrap();
        fs.create("/b", 0o644).unwrap();
        fs.write("/a", b"A", 0).unwrap();

        assert!(matches!(fs.rename("/a", "/b"), Err(FsError::AlreadyExists)));
        assert_eq!(fs.read("/a", 10, 0).unwrap(), b"A");
        assert_eq!(fs.readdir("/").unwrap(), vec![".", "..", "a", "b"]);
    }

    #[test]
    fn test_rename_to_same_path_is_noop() {
        let fs = create_test_fs();
        fs.create("/a", 0o644).unwrap();
        fs.create("/b", 0o644).unwrap();
        fs.rename("/a", "/a").unwrap();
        assert_eq!(fs.readdir("/").unwrap(), vec![".", "..", "a", "b"]);
    }

    #[test]
    fn test_rename_into_own_subtree_fails() {
        let fs = create_test_fs();
        fs.mkdir("/a", 0o755).unwrap();
        fs.mkdir("/a/b", 0o755).unwrap();
        assert!(matches!(fs.rename("/a", "/a/b/a"), Err(FsError::IllegalMutation)));
        assert!(fs.getattr("/a/b").is_ok());
    }

    #[test]
    fn test_rename_failures() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();
        assert!(matches!(fs.rename("/missing", "/x"), Err(FsError::NotFound)));
        assert!(matches!(fs.rename("/f", "/missing/x"), Err(FsError::NotFound)));
        assert!(matches!(fs.rename("/f", "/f/x"), Err(FsError::NotADirectory)));
    }

    #[test]
    fn test_statfs_reports_configured_constants() {
        let fs = create_test_fs();
        let stats = fs.statfs("/").unwrap();
        assert_eq!(
            stats,
            StatFs {
                block_size: 512,
                total_blocks: 4096,
                free_blocks: 2048
            }
        );
        assert!(matches!(fs.statfs("/nope"), Err(FsError::NotFound)));
    }

    #[test]
    fn test_unsupported_capabilities_are_explicit() {
        let fs = create_test_fs();
        fs.create("/f", 0o644).unwrap();

        assert!(fs.xattr_list("/f").unwrap().is_empty());
        assert!(matches!(fs.xattr_get("/f", "user.x"), Err(FsError::NoAttribute)));
        assert!(matches!(fs.xattr_set("/f", "user.x", b"1"), Err(FsError::Unsupported)));
        assert!(matches!(fs.xattr_remove("/f", "user.x"), Err(FsError::Unsupported)));
        assert!(matches!(fs.chmod("/f", 0o600), Err(FsError::Unsupported)));
        assert!(matches!(fs.chown("/f", 1, 1), Err(FsError::Unsupported)));
        assert!(matches!(fs.symlink("/f", "/l"), Err(FsError::Unsupported)));
        assert!(matches!(fs.readlink("/f"), Err(FsError::Unsupported)));
        assert!(matches!(fs.xattr_list("/nope"), Err(FsError::NotFound)));

        // Permission bits are untouched by the refused chmod.
        assert_eq!(fs.getattr("/f").unwrap().perm, 0o644);
    }

    #[test]
    fn test_core_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FsCore>();

        let fs = std::sync::Arc::new(create_test_fs());
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let fs = std::sync::Arc::clone(&fs);
                std::thread::spawn(move || {
                    for j in 0..25 {
                        fs.create(&format!("/t{}-{}", i, j), 0o644).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(fs.getattr("/").unwrap().nlink, 2 + 100);
    }
}
