// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Dataset loading: turns a document on disk into the nested mapping the
//! loader bridge walks.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Value};

use crate::error::{FsError, FsResult};

/// How the document is shaped into a tree
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Layout {
    /// The document is already a nested mapping of names to mappings or text.
    #[default]
    Tree,
    /// The document maps sheet names to arrays of rows of scalar cells.
    Sheets,
}

impl std::fmt::Display for Layout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Layout::Tree => write!(f, "tree"),
            Layout::Sheets => write!(f, "sheets"),
        }
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tree" => Ok(Layout::Tree),
            "sheets" => Ok(Layout::Sheets),
            _ => Err(format!("Invalid layout: {}. Use 'tree' or 'sheets'", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
    Toml,
    /// Spreadsheet workbook (`.xls`, `.xlsx`, `.xlsm`, `.xlsb`, `.ods`)
    Workbook,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> FsResult<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            "toml" => Ok(DocumentFormat::Toml),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(DocumentFormat::Workbook),
            _ => Err(FsError::Dataset(format!(
                "unsupported dataset format for {}: expected .json, .yaml, .yml, .toml or a workbook",
                path.display()
            ))),
        }
    }

    /// Parse a text document; workbooks are binary and go through [`read_workbook`].
    pub fn parse(self, text: &str) -> FsResult<Value> {
        let parsed = match self {
            DocumentFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            DocumentFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            DocumentFormat::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            DocumentFormat::Workbook => Err("workbooks are not text documents".to_string()),
        };
        parsed.map_err(FsError::Dataset)
    }
}

/// Source of the initial tree contents
#[cfg_attr(test, mockall::automock)]
pub trait DatasetSource {
    /// Produce the nested mapping; called once at startup.
    fn load(&self) -> FsResult<Map<String, Value>>;
}

/// A dataset document on disk
#[derive(Clone, Debug)]
pub struct Dataset {
    path: PathBuf,
    format: DocumentFormat,
    layout: Layout,
}

impl Dataset {
    /// Fails early when the extension names no supported format; the file
    /// itself is read by [`DatasetSource::load`].
    pub fn from_path(path: impl Into<PathBuf>, layout: Layout) -> FsResult<Self> {
        let path = path.into();
        let format = DocumentFormat::from_path(&path)?;
        Ok(Self {
            path,
            format,
            layout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }
}

impl DatasetSource for Dataset {
    fn load(&self) -> FsResult<Map<String, Value>> {
        // A workbook is always a set of sheets, whatever the requested layout.
        if self.format == DocumentFormat::Workbook {
            return sheets_to_tree(read_workbook(&self.path)?);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let document = self.format.parse(&text)?;
        shape(document, self.layout)
    }
}

/// Read every sheet of a workbook as `{name: [[cell, ...], ...]}` in sheet order
pub fn read_workbook(path: &Path) -> FsResult<Map<String, Value>> {
    if !path.exists() {
        return Err(std::io::Error::from(std::io::ErrorKind::NotFound).into());
    }
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| FsError::Dataset(format!("{}: {}", path.display(), e)))?;

    let mut sheets = Map::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| FsError::Dataset(format!("{}: sheet {}: {}", path.display(), name, e)))?;
        let rows = range
            .rows()
            .map(|row| Value::Array(row.iter().map(workbook_cell).collect()))
            .collect();
        sheets.insert(name, Value::Array(rows));
    }
    Ok(sheets)
}

fn workbook_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Value::String(s.clone()),
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => Value::from(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => Value::from(dt.as_f64()),
        Data::Error(e) => Value::String(e.to_string()),
    }
}

/// Apply `layout` to a parsed document
pub fn shape(document: Value, layout: Layout) -> FsResult<Map<String, Value>> {
    match (document, layout) {
        (Value::Object(map), Layout::Tree) => Ok(map),
        (Value::Object(map), Layout::Sheets) => sheets_to_tree(map),
        (other, _) => Err(FsError::InvalidTreeShape {
            path: "/".to_string(),
            found: value_kind(&other),
        }),
    }
}

/// Reshape `{name: [[cell, ...], ...]}` into `sheet/<name>/row/<r>/col/<c>`
pub fn sheets_to_tree(sheets: Map<String, Value>) -> FsResult<Map<String, Value>> {
    let mut by_name = Map::new();
    for (name, rows) in sheets {
        let rows = match rows {
            Value::Array(rows) => rows,
            other => {
                return Err(FsError::InvalidTreeShape {
                    path: format!("/sheet/{}", name),
                    found: value_kind(&other),
                })
            }
        };

        let width = rows
            .iter()
            .map(|row| row.as_array().map_or(1, Vec::len))
            .max()
            .unwrap_or(0);

        let mut row_map = Map::new();
        for (r, row) in rows.into_iter().enumerate() {
            let cells = match row {
                Value::Array(cells) => cells,
                // A bare scalar is a one-cell row.
                scalar => vec![scalar],
            };
            let mut col_map = Map::new();
            for c in 0..width {
                let path = format!("/sheet/{}/row/{}/col/{}", name, r, c);
                let text = match cells.get(c) {
                    Some(cell) => cell_text(cell, &path)?,
                    None => String::new(),
                };
                col_map.insert(c.to_string(), Value::String(text));
            }
            let mut row_entry = Map::new();
            row_entry.insert("col".to_string(), Value::Object(col_map));
            row_map.insert(r.to_string(), Value::Object(row_entry));
        }

        let mut sheet = Map::new();
        sheet.insert("row".to_string(), Value::Object(row_map));
        by_name.insert(name, Value::Object(sheet));
    }

    let mut root = Map::new();
    root.insert("sheet".to_string(), Value::Object(by_name));
    Ok(root)
}

fn cell_text(cell: &Value, path: &str) -> FsResult<String> {
    match cell {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(FsError::InvalidTreeShape {
            path: path.to_string(),
            found: value_kind(other),
        }),
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "mapping",
    }
}
