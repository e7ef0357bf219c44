/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Loading template and parameter documents.
//!
//! Documents arrive as an in-memory value, a path, or a readable stream.
//! Paths go through a [`DocumentLoader`], so tests and bundled templates can
//! serve documents from memory instead of the disk.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::parameters::{json_type_name, supplied_values};

/// Where a JSON document comes from.
pub enum TemplateSource<'a> {
    /// An already-parsed document.
    Value(Value),
    /// A JSON file, read through the expander's [`DocumentLoader`].
    Path(PathBuf),
    /// A stream of JSON text. It is read to the end before expansion starts.
    Reader(Box<dyn Read + 'a>),
}

impl fmt::Debug for TemplateSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateSource::Value(value) => f.debug_tuple("Value").field(value).finish(),
            TemplateSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            TemplateSource::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Value> for TemplateSource<'_> {
    fn from(value: Value) -> Self {
        TemplateSource::Value(value)
    }
}

impl From<PathBuf> for TemplateSource<'_> {
    fn from(path: PathBuf) -> Self {
        TemplateSource::Path(path)
    }
}

impl From<&Path> for TemplateSource<'_> {
    fn from(path: &Path) -> Self {
        TemplateSource::Path(path.to_path_buf())
    }
}

/// Trait for reading documents by path.
pub trait DocumentLoader {
    /// Read the full text of the document at `path`.
    fn read(&self, path: &Path) -> io::Result<String>;
}

/// Loader that reads documents from the filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader;

impl DocumentLoader for FileSystemLoader {
    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loader that serves documents from an in-memory map.
///
/// Useful for testing and for templates bundled into an application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `path`.
    pub fn add(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> &mut Self {
        self.documents.insert(path.into(), content.into());
        self
    }
}

impl DocumentLoader for MemoryLoader {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.documents.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no document registered for {}", path.display()),
            )
        })
    }
}

/// Load a document and parse it as JSON.
pub fn load_value<L>(source: TemplateSource<'_>, loader: &L) -> TemplateResult<Value>
where
    L: DocumentLoader + ?Sized,
{
    match source {
        TemplateSource::Value(value) => Ok(value),
        TemplateSource::Path(path) => {
            debug!(path = %path.display(), "loading JSON document");
            let text = loader.read(&path).map_err(|e| {
                TemplateError::invalid_template(format!(
                    "Invalid JSON file: {}: {}",
                    path.display(),
                    e
                ))
            })?;
            Ok(serde_json::from_str(&text)?)
        }
        TemplateSource::Reader(mut reader) => {
            let mut text = String::new();
            reader
                .read_to_string(&mut text)
                .map_err(|e| TemplateError::invalid_template(format!("Invalid JSON file: {}", e)))?;
            Ok(serde_json::from_str(&text)?)
        }
    }
}

/// Load a template document. The top level must be a JSON object.
pub fn load_document<L>(source: TemplateSource<'_>, loader: &L) -> TemplateResult<Map<String, Value>>
where
    L: DocumentLoader + ?Sized,
{
    match load_value(source, loader)? {
        Value::Object(map) => Ok(map),
        other => Err(TemplateError::invalid_template(format!(
            "Template must be a JSON object, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Load a parameter-values document. No document means no values.
pub fn load_parameter_values<L>(
    source: Option<TemplateSource<'_>>,
    loader: &L,
) -> TemplateResult<Map<String, Value>>
where
    L: DocumentLoader + ?Sized,
{
    match source {
        None => Ok(Map::new()),
        Some(source) => supplied_values(&load_value(source, loader)?),
    }
}
