// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Node tree backing the virtual filesystem
//!
//! Nodes live in an arena keyed by [`NodeId`]. Each node keeps a single
//! parent link and an insertion-ordered list of children; all structural
//! changes go through [`Tree::insert_into`] and [`Tree::remove_from`], which
//! keep both sides of the relationship and the directory link counts in sync.

use std::collections::HashMap;

use crate::error::{FsError, FsResult};
use crate::{Attributes, FileKind, FileTimes};

/// Internal node ID for filesystem nodes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(u64);

/// Filesystem node types
#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Directory,
    File { data: Vec<u8> },
}

/// Filesystem node
#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub perm: u32,
    pub nlink: u32,
    pub times: FileTimes,
}

impl Node {
    fn new(name: &str, kind: NodeKind, perm: u32) -> Self {
        let nlink = match kind {
            NodeKind::Directory => 2, // '.' and the entry in the parent
            NodeKind::File { .. } => 1,
        };
        Self {
            name: name.to_string(),
            parent: None,
            children: Vec::new(),
            kind,
            perm,
            nlink,
            times: FileTimes::now(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Directory)
    }

    pub fn file_kind(&self) -> FileKind {
        match self.kind {
            NodeKind::Directory => FileKind::Directory,
            NodeKind::File { .. } => FileKind::RegularFile,
        }
    }

    pub fn attributes(&self) -> Attributes {
        Attributes {
            kind: self.file_kind(),
            perm: self.perm,
            nlink: self.nlink,
            times: self.times,
            size: match &self.kind {
                NodeKind::File { data } => Some(data.len() as u64),
                NodeKind::Directory => None,
            },
        }
    }

    /// Stamp modify and change time after a content or entry change
    pub fn touch(&mut self) {
        let now = std::time::SystemTime::now();
        self.times.mtime = now;
        self.times.ctime = now;
    }
}

/// Split a path into its parent directory path and leaf name.
pub(crate) fn split_parent(path: &str) -> FsResult<(&str, &str)> {
    let (parent, leaf) = path.rsplit_once('/').ok_or(FsError::NotFound)?;
    if leaf.is_empty() || leaf == "." || leaf == ".." {
        return Err(FsError::InvalidName);
    }
    Ok((if parent.is_empty() { "/" } else { parent }, leaf))
}

/// Arena of nodes rooted at a single directory
#[derive(Debug)]
pub(crate) struct Tree {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    next_node_id: u64,
}

impl Tree {
    pub fn new(root_perm: u32) -> Self {
        let root = NodeId(1);
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new("", NodeKind::Directory, root_perm));
        Self {
            nodes,
            root,
            next_node_id: 2,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> FsResult<&Node> {
        self.nodes.get(&id).ok_or(FsError::NotFound)
    }

    pub fn node_mut(&mut self, id: NodeId) -> FsResult<&mut Node> {
        self.nodes.get_mut(&id).ok_or(FsError::NotFound)
    }

    /// Linear search for a child by name; the first match wins
    pub fn child_named(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get(&dir)?;
        node.children
            .iter()
            .copied()
            .find(|child| self.nodes.get(child).is_some_and(|c| c.name == name))
    }

    /// Resolve an absolute, slash-delimited path to a node
    pub fn resolve(&self, path: &str) -> FsResult<NodeId> {
        let rest = path.strip_prefix('/').ok_or(FsError::NotFound)?;
        let mut current = self.root();
        if rest.is_empty() {
            return Ok(current);
        }

        // One trailing slash is tolerated; any other empty segment names nothing.
        let rest = rest.strip_suffix('/').unwrap_or(rest);
        for segment in rest.split('/') {
            current = self.child_named(current, segment).ok_or(FsError::NotFound)?;
        }
        Ok(current)
    }

    /// True when `ancestor` is `node` or appears on `node`'s parent chain
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|n| n.parent);
        }
        false
    }

    fn allocate(&mut self, name: &str, kind: NodeKind, perm: u32) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.nodes.insert(id, Node::new(name, kind, perm));
        id
    }

    /// Add `child` to `parent`'s children and bump the parent's link count
    fn receive(&mut self, parent: NodeId, child: NodeId) -> FsResult<()> {
        let parent_node = self.node_mut(parent)?;
        if !parent_node.is_dir() {
            return Err(FsError::IllegalMutation);
        }
        parent_node.children.push(child);
        parent_node.nlink += 1;
        parent_node.touch();
        Ok(())
    }

    /// Drop `child` from `parent`'s children and decrement the link count
    fn eject(&mut self, parent: NodeId, child: NodeId) -> FsResult<()> {
        let parent_node = self.node_mut(parent)?;
        let pos = parent_node
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or(FsError::IllegalMutation)?;
        parent_node.children.remove(pos);
        parent_node.nlink -= 1;
        parent_node.touch();
        Ok(())
    }

    /// Re-parent `child` under `parent` (eject from the old parent first)
    pub fn insert_into(&mut self, child: NodeId, parent: NodeId) -> FsResult<()> {
        if !self.node(parent)?.is_dir() {
            return Err(FsError::IllegalMutation);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(FsError::IllegalMutation);
        }
        if let Some(old_parent) = self.node(child)?.parent {
            self.eject(old_parent, child)?;
        }
        self.receive(parent, child)?;
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detach `child` from its parent, leaving it parentless
    pub fn remove_from(&mut self, child: NodeId) -> FsResult<()> {
        let parent = self.node(child)?.parent.ok_or(FsError::InvalidArgument)?;
        self.eject(parent, child)?;
        self.node_mut(child)?.parent = None;
        Ok(())
    }

    /// Drop a detached node and everything below it from the arena
    pub fn discard(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
            }
        }
    }

    /// Construct a node under `parent`, rejecting a duplicate sibling name
    pub fn create_child(
        &mut self,
        parent: NodeId,
        name: &str,
        kind: NodeKind,
        perm: u32,
    ) -> FsResult<NodeId> {
        if !self.node(parent)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        if self.child_named(parent, name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let id = self.allocate(name, kind, perm);
        if let Err(err) = self.insert_into(id, parent) {
            self.discard(id);
            return Err(err);
        }
        Ok(id)
    }

    /// Move `node` under `new_parent` with a new name
    pub fn rename(&mut self, node: NodeId, new_parent: NodeId, new_name: &str) -> FsResult<()> {
        if node == self.root {
            return Err(FsError::InvalidArgument);
        }
        if !self.node(new_parent)?.is_dir() {
            return Err(FsError::NotADirectory);
        }
        let current = self.node(node)?;
        if current.parent == Some(new_parent) && current.name == new_name {
            return Ok(());
        }
        if self.child_named(new_parent, new_name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        self.insert_into(node, new_parent)?;
        let moved = self.node_mut(node)?;
        moved.name = new_name.to_string();
        moved.times.ctime = std::time::SystemTime::now();
        Ok(())
    }
}
