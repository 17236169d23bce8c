// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Populates an engine from a nested mapping: one directory per sub-mapping
//! key, one file per text value.

use serde_json::{Map, Value};
use tracing::debug;

use crate::dataset::value_kind;
use crate::error::{FsError, FsResult};
use crate::vfs::FsCore;

/// Walk `contents` depth-first in document order, creating nodes under `/`.
pub fn populate(core: &FsCore, contents: &Map<String, Value>) -> FsResult<()> {
    populate_dir(core, "", contents)
}

fn populate_dir(core: &FsCore, dir: &str, entries: &Map<String, Value>) -> FsResult<()> {
    let config = core.config();
    for (name, value) in entries {
        if name.contains('/') {
            debug!(dir, name = name.as_str(), "dataset key contains a path separator");
            return Err(FsError::InvalidName);
        }
        let path = format!("{}/{}", dir, name);
        match value {
            Value::String(text) => {
                core.create(&path, config.file_mode)?;
                core.write(&path, normalize_text(text).as_bytes(), 0)?;
            }
            Value::Object(children) => {
                core.mkdir(&path, config.dir_mode)?;
                populate_dir(core, &path, children)?;
            }
            other => {
                return Err(FsError::InvalidTreeShape {
                    path,
                    found: value_kind(other),
                })
            }
        }
    }
    Ok(())
}

/// File contents always end with a newline.
fn normalize_text(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{}\n", text)
    }
}
