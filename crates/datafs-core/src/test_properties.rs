// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use serde_json::{json, Map, Value};

use crate::dataset::MockDatasetSource;
use crate::{FsConfig, FsCore, FsError, Layout};

fn mapping(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture must be a mapping"),
    }
}

fn core_from(value: Value) -> FsCore {
    let mut source = MockDatasetSource::new();
    let contents = mapping(value);
    source.expect_load().times(1).returning(move || Ok(contents.clone()));
    FsCore::from_source(FsConfig::default(), &source).unwrap()
}

/// Every directory reachable from `dir` has `nlink == 2 + children`.
fn assert_dir_links(fs: &FsCore, dir: &str) {
    let entries = fs.readdir_entries(dir).unwrap();
    assert_eq!(
        fs.getattr(dir).unwrap().nlink as usize,
        2 + entries.len(),
        "link count of {}",
        dir
    );
    for entry in entries.iter().filter(|e| e.kind == crate::FileKind::Directory) {
        let child = if dir == "/" {
            format!("/{}", entry.name)
        } else {
            format!("{}/{}", dir, entry.name)
        };
        assert_dir_links(fs, &child);
    }
}

#[test]
fn test_readdir_lists_exactly_created_names() {
    let fs = FsCore::default();
    fs.mkdir("/p", 0o755).unwrap();
    let names = ["one", "two", "three"];
    for name in names {
        fs.create(&format!("/p/{}", name), 0o644).unwrap();
    }

    let mut expected = vec![".", ".."];
    expected.extend(names);
    assert_eq!(fs.readdir("/p").unwrap(), expected);
}

#[test]
fn test_link_counts_track_every_mutation() {
    let fs = FsCore::default();
    assert_dir_links(&fs, "/");

    fs.mkdir("/a", 0o755).unwrap();
    fs.mkdir("/a/b", 0o755).unwrap();
    fs.create("/a/f", 0o644).unwrap();
    fs.mkdir("/c", 0o755).unwrap();
    assert_dir_links(&fs, "/");

    fs.rename("/a/b", "/c/b").unwrap();
    assert_dir_links(&fs, "/");

    fs.unlink("/a/f").unwrap();
    assert_dir_links(&fs, "/");

    fs.rmdir("/c/b").unwrap();
    fs.rmdir("/a").unwrap();
    assert_dir_links(&fs, "/");
    assert_eq!(fs.getattr("/").unwrap().nlink, 3);
}

#[test]
fn test_failed_rmdir_leaves_tree_unchanged() {
    let fs = FsCore::default();
    fs.mkdir("/d", 0o755).unwrap();
    fs.create("/d/keep", 0o644).unwrap();
    fs.write("/d/keep", b"data", 0).unwrap();
    let before = fs.getattr("/d").unwrap();

    assert!(matches!(fs.rmdir("/d"), Err(FsError::DirectoryNotEmpty)));
    assert_eq!(fs.getattr("/d").unwrap(), before);
    assert_eq!(fs.readdir("/d").unwrap(), vec![".", "..", "keep"]);
    assert_eq!(fs.read("/d/keep", 10, 0).unwrap(), b"data");
}

#[test]
fn test_read_after_write_returns_prefixes() {
    let fs = FsCore::default();
    fs.create("/f", 0o644).unwrap();
    let data = b"the quick brown fox";
    assert_eq!(fs.write("/f", data, 0).unwrap(), data.len());

    for size in [0, 1, 5, data.len(), data.len() + 10] {
        let got = fs.read("/f", size, 0).unwrap();
        assert_eq!(got, &data[..size.min(data.len())]);
    }
    assert!(fs.read("/f", 10, data.len() as u64 + 1).unwrap().is_empty());
}

#[test]
fn test_truncate_bounds_size_and_reads() {
    let fs = FsCore::default();
    fs.create("/f", 0o644).unwrap();
    fs.write("/f", b"0123456789", 0).unwrap();

    for length in [7u64, 3, 0, 5] {
        fs.truncate("/f", length).unwrap();
        assert_eq!(fs.getattr("/f").unwrap().size, Some(length));
        assert!(fs.read("/f", 100, 0).unwrap().len() as u64 <= length);
    }
}

#[test]
fn test_loader_input_becomes_tree() {
    let fs = core_from(json!({"a": {"b": "hello"}}));

    assert!(fs.readdir("/").unwrap().contains(&"a".to_string()));
    assert!(fs.readdir("/a").unwrap().contains(&"b".to_string()));
    assert_eq!(fs.read("/a/b", 100, 0).unwrap(), b"hello\n");
}

#[test]
fn test_rename_keeps_content_and_size() {
    let fs = core_from(json!({"a": "payload"}));
    let before = fs.getattr("/a").unwrap();

    fs.rename("/a", "/c").unwrap();
    assert!(matches!(fs.getattr("/a"), Err(FsError::NotFound)));
    let after = fs.getattr("/c").unwrap();
    assert_eq!(after.size, before.size);
    assert_eq!(fs.read("/c", 100, 0).unwrap(), b"payload\n");
}

#[test]
fn test_unresolved_paths_fail_without_side_effects() {
    let fs = core_from(json!({"a": {"b": {"c": "x"}}}));
    let root_before = fs.getattr("/").unwrap();
    let count_before = fs.node_count();

    for path in ["/nonexistent", "/nonexistent/path", "/a/nope", "/a/b/c/d", "/a/b/zz/y"] {
        assert!(matches!(fs.getattr(path), Err(FsError::NotFound)), "{}", path);
        assert!(matches!(fs.unlink(path), Err(FsError::NotFound)), "{}", path);
    }
    assert!(matches!(fs.getattr("relative"), Err(FsError::NotFound)));

    assert_eq!(fs.getattr("/").unwrap(), root_before);
    assert_eq!(fs.node_count(), count_before);
}

#[test]
fn test_failed_load_produces_no_engine() {
    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(|| Err(FsError::Dataset("unreadable".to_string())));

    let result = FsCore::from_source(FsConfig::default(), &source);
    assert!(matches!(result, Err(FsError::Dataset(_))));
}

#[test]
fn test_bad_tree_shape_aborts_bootstrap() {
    let mut source = MockDatasetSource::new();
    source
        .expect_load()
        .returning(|| Ok(mapping(json!({"ok": "x", "bad": [1, 2]}))));

    let result = FsCore::from_source(FsConfig::default(), &source);
    assert!(matches!(result, Err(FsError::InvalidTreeShape { found: "array", .. })));
}

#[test]
fn test_sheet_document_mounts_as_cells() {
    let doc = json!({"Budget": [["item", "cost"], ["tea", 2.5]]});
    let shaped = crate::dataset::shape(doc, Layout::Sheets).unwrap();
    let fs = core_from(Value::Object(shaped));

    assert_eq!(fs.readdir("/sheet").unwrap(), vec![".", "..", "Budget"]);
    assert_eq!(fs.readdir("/sheet/Budget/row").unwrap(), vec![".", "..", "0", "1"]);
    assert_eq!(fs.read("/sheet/Budget/row/1/col/0", 100, 0).unwrap(), b"tea\n");
    assert_eq!(fs.read("/sheet/Budget/row/1/col/1", 100, 0).unwrap(), b"2.5\n");
}
