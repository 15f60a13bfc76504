//! File-system backed content store.
//!
//! # Layout
//! ```text
//! {base}/apps/site/config/rewriter/         directories are nodes without properties
//! {base}/apps/site/config/rewriter/html.toml   node `html`
//!     order = 1                             scalar and array keys are properties
//!     [transformer-1]                       tables are child nodes
//!     from = "/content/site"
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::store::{join, normalize, ContentStore, Properties, StoreError};

const EXTENSION: &str = "toml";

/// Where a store path resolved to.
enum Location {
    Dir(PathBuf),
    Table(toml::Table),
}

/// Content store reading directories and TOML files below a base directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Map a file-system path below the base to the store path it defines.
    pub fn store_path(&self, fs_path: &Path) -> Option<String> {
        let relative = fs_path.strip_prefix(&self.base).ok()?;
        let mut segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if let Some(last) = segments.last_mut() {
            if let Some(stem) = last.strip_suffix(".toml") {
                *last = stem.to_string();
            }
        }
        Some(normalize(&segments.join("/")))
    }

    /// Map a store path to the directory it names, if any.
    pub fn dir_path(&self, path: &str) -> PathBuf {
        let mut dir = self.base.clone();
        dir.extend(path.split('/').filter(|s| !s.is_empty()));
        dir
    }

    fn resolve(&self, path: &str) -> Result<Option<Location>, StoreError> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut dir = self.base.clone();
        if !dir.is_dir() {
            return Ok(None);
        }
        for (i, segment) in segments.iter().enumerate() {
            let candidate = dir.join(segment);
            if candidate.is_dir() {
                dir = candidate;
                continue;
            }
            let file = dir.join(format!("{segment}.{EXTENSION}"));
            if !file.is_file() {
                return Ok(None);
            }
            let mut table = read_table(&file)?;
            for inner in &segments[i + 1..] {
                match table.remove(*inner) {
                    Some(toml::Value::Table(child)) => table = child,
                    _ => return Ok(None),
                }
            }
            return Ok(Some(Location::Table(table)));
        }
        Ok(Some(Location::Dir(dir)))
    }
}

fn read_table(file: &Path) -> Result<toml::Table, StoreError> {
    let content = fs::read_to_string(file)?;
    Ok(content.parse::<toml::Table>()?)
}

/// Convert a TOML value into the store's property value type.
fn to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => Value::from(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(to_json).collect()),
        toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, to_json(v))).collect())
        }
    }
}

impl ContentStore for FsStore {
    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let path = normalize(path);
        match self.resolve(&path)? {
            None => Err(StoreError::NotFound(path)),
            Some(Location::Table(table)) => Ok(table
                .iter()
                .filter(|(_, v)| v.is_table())
                .map(|(k, _)| join(&path, k))
                .collect()),
            Some(Location::Dir(dir)) => {
                let mut names = BTreeSet::new();
                for entry in fs::read_dir(&dir)? {
                    let entry = entry?;
                    let file_type = entry.file_type()?;
                    let file_name = entry.file_name().to_string_lossy().into_owned();
                    if file_type.is_dir() {
                        names.insert(file_name);
                    } else if let Some(stem) = file_name.strip_suffix(".toml") {
                        names.insert(stem.to_string());
                    }
                }
                Ok(names.into_iter().map(|n| join(&path, &n)).collect())
            }
        }
    }

    fn properties(&self, path: &str) -> Result<Option<Properties>, StoreError> {
        match self.resolve(&normalize(path)) {
            Ok(None) => Ok(None),
            Ok(Some(Location::Dir(_))) => Ok(Some(Properties::new())),
            Ok(Some(Location::Table(table))) => Ok(Some(
                table
                    .into_iter()
                    .filter(|(_, v)| !v.is_table())
                    .map(|(k, v)| (k, to_json(v)))
                    .collect(),
            )),
            // a file removed between the existence check and the read
            Err(StoreError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
