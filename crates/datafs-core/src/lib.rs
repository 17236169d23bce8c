// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! DataFS Core: an in-memory virtual filesystem built from a hierarchical
//! dataset.
//!
//! [`FsCore`] owns the node tree and exposes path-based filesystem
//! operations. A [`DatasetSource`] supplies the initial contents, which the
//! loader bridge turns into directories and files.

pub mod bridge;
pub mod config;
pub mod dataset;
pub mod error;
mod tree;
pub mod types;
pub mod vfs;

#[cfg(test)]
mod test_properties;

pub use config::{CachePolicy, FsConfig, FsLimits, StatfsPolicy, WriteMode};
pub use dataset::{Dataset, DatasetSource, DocumentFormat, Layout};
pub use error::{FsError, FsResult};
pub use types::{Attributes, DirEntry, FileKind, FileTimes, HandleId, StatFs};
pub use vfs::FsCore;
