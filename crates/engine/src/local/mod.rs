//! In-memory backend emulating the hosted database
//!
//! The tree is stored in canonical form: arrays become index-keyed objects,
//! nulls and empty objects are never stored. Reads render it back the way
//! the service does (see [`ordering::render`]).
//!
//! Every operation yields to the scheduler first, so callers observe the
//! same suspension points as with the remote backend.

mod ordering;

pub(crate) use ordering::compare_keys;

use crate::backend::Backend;
use crate::path;
use crate::query::Query;
use async_trait::async_trait;
use fireman_core::{Error, KeyGenerator, Result};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Local database backed by an optional JSON file
pub struct LocalBackend {
    root: RwLock<Value>,
    keys: Mutex<KeyGenerator>,
    file: Option<PathBuf>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackend {
    /// Empty database with no backing file
    pub fn new() -> Self {
        Self::from_value(Value::Null)
    }

    /// Database holding `root`
    pub fn from_value(root: Value) -> Self {
        Self {
            root: RwLock::new(canonicalize(root)),
            keys: Mutex::new(KeyGenerator::new()),
            file: None,
        }
    }

    /// Empty database that [`save`](Self::save) will write to `file`.
    /// Nothing is read; an existing file is overwritten on save.
    pub fn create(file: impl Into<PathBuf>) -> Self {
        Self {
            root: RwLock::new(Value::Null),
            keys: Mutex::new(KeyGenerator::new()),
            file: Some(file.into()),
        }
    }

    /// Load the database from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the file does not exist, and an I/O or
    /// serialization error when it cannot be read or parsed.
    pub fn open(file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        let root = read_file(&file)?;
        tracing::debug!(target: "fireman::local", file = %file.display(), "Opened local database");
        Ok(Self {
            root: RwLock::new(root),
            keys: Mutex::new(KeyGenerator::new()),
            file: Some(file),
        })
    }

    /// Backing file, if any
    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Discard in-memory changes and re-read the backing file
    pub fn reload(&self) -> Result<()> {
        let file = self.require_file()?;
        let root = read_file(file)?;
        *self.root.write() = root;
        tracing::debug!(target: "fireman::local", file = %file.display(), "Reloaded local database");
        Ok(())
    }

    /// Write the database to its backing file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the database was not opened from a file.
    pub fn save(&self, pretty: bool) -> Result<()> {
        let file = self.require_file()?;
        self.save_to(file, pretty)
    }

    /// Write the database to `file`; `pretty` indents by one space
    pub fn save_to(&self, file: &Path, pretty: bool) -> Result<()> {
        let root = self.snapshot();
        let bytes = if pretty {
            let mut out = Vec::new();
            let mut serializer =
                serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b" "));
            root.serialize(&mut serializer)?;
            out
        } else {
            serde_json::to_vec(&root)?
        };
        std::fs::write(file, bytes)?;
        tracing::debug!(target: "fireman::local", file = %file.display(), pretty, "Saved local database");
        Ok(())
    }

    /// Copy of the whole database as the service would report it
    pub fn snapshot(&self) -> Value {
        ordering::render(&self.root.read())
    }

    fn require_file(&self) -> Result<&Path> {
        self.file
            .as_deref()
            .ok_or_else(|| Error::Config("local database has no backing file".to_string()))
    }

    fn write(&self, path: &str, value: Value) {
        let segments = path::segments(path);
        write_at(&mut self.root.write(), &segments, canonicalize(value));
    }
}

fn read_file(file: &Path) -> Result<Value> {
    match std::fs::read(file) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Value::Null),
        Ok(bytes) => Ok(canonicalize(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::Config(format!(
            "local database file not found: {}",
            file.display()
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Stored form of a value: arrays keyed by index, no nulls, no empty objects
fn canonicalize(value: Value) -> Value {
    let children: Map<String, Value> = match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(k, v)| (k, canonicalize(v)))
            .filter(|(_, v)| !v.is_null())
            .collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), canonicalize(v)))
            .filter(|(_, v)| !v.is_null())
            .collect(),
        other => return other,
    };
    if children.is_empty() {
        Value::Null
    } else {
        Value::Object(children)
    }
}

/// Store `value` (canonical) at `segments` below `node`, pruning parents
/// left empty
fn write_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };
    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(children) = node {
        let child = children.entry(first.to_string()).or_insert(Value::Null);
        write_at(child, rest, value);
        if child.is_null() {
            children.shift_remove(*first);
        }
        if children.is_empty() {
            *node = Value::Null;
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn get(&self, path: &str, query: &Query) -> Result<Value> {
        tokio::task::yield_now().await;
        query.validate()?;
        let root = self.root.read();
        ordering::evaluate(ordering::descend(&root, path), query)
    }

    async fn put(&self, path: &str, value: Value) -> Result<Value> {
        tokio::task::yield_now().await;
        self.write(path, value.clone());
        Ok(value)
    }

    async fn patch(&self, path: &str, value: Value) -> Result<Value> {
        tokio::task::yield_now().await;
        let Value::Object(children) = &value else {
            return Err(Error::UnexpectedShape(format!(
                "patch requires an object, got {}",
                fireman_core::json::kind_of(&value)
            )));
        };
        for (key, child) in children {
            self.write(&path::child(path, key), child.clone());
        }
        Ok(value)
    }

    async fn post(&self, path: &str, value: Value) -> Result<Value> {
        tokio::task::yield_now().await;
        let key = self.keys.lock().next_key()?;
        self.write(&path::child(path, &key), value);
        Ok(json!({ "name": key }))
    }

    async fn delete(&self, path: &str) -> Result<Value> {
        tokio::task::yield_now().await;
        self.write(path, Value::Null);
        Ok(Value::Null)
    }
}
