// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration types for DataFS Core

use serde::{Deserialize, Serialize};

/// How `write` treats bytes past the end of the written range
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Keep `data[..offset]`, append the new bytes, drop the old tail.
    #[default]
    TruncateAppend,
    /// Overlay at `offset`, preserve the tail and zero-fill any gap.
    Splice,
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::TruncateAppend => write!(f, "truncate_append"),
            WriteMode::Splice => write!(f, "splice"),
        }
    }
}

impl std::str::FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "truncate_append" => Ok(WriteMode::TruncateAppend),
            "splice" => Ok(WriteMode::Splice),
            _ => Err(format!(
                "Invalid write mode: {}. Use 'truncate_append' or 'splice'",
                s
            )),
        }
    }
}

/// Fixed values reported by `statfs`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatfsPolicy {
    pub block_size: u32,
    pub total_blocks: u64,
    pub free_blocks: u64,
}

impl Default for StatfsPolicy {
    fn default() -> Self {
        Self {
            block_size: 512,
            total_blocks: 4096,
            free_blocks: 2048,
        }
    }
}

/// Resource limits enforced by the engine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsLimits {
    /// Largest size, in bytes, any single file may reach
    pub max_file_bytes: u64,
}

impl Default for FsLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: 256 * 1024 * 1024,
        }
    }
}

/// Kernel cache TTLs used by the FUSE host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    pub attr_ttl_ms: u64,
    pub entry_ttl_ms: u64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            attr_ttl_ms: 1000,
            entry_ttl_ms: 1000,
        }
    }
}

/// Filesystem configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub write_mode: WriteMode,
    /// Permission bits for files created by the loader bridge
    pub file_mode: u32,
    /// Permission bits for directories created by the loader bridge
    pub dir_mode: u32,
    pub statfs: StatfsPolicy,
    pub limits: FsLimits,
    pub cache: CachePolicy,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            write_mode: WriteMode::default(),
            file_mode: 0o644,
            dir_mode: 0o755,
            statfs: StatfsPolicy::default(),
            limits: FsLimits::default(),
            cache: CachePolicy::default(),
        }
    }
}
