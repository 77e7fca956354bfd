/*
 * loader.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Content loading for partials.
//!
//! A partial whose context value is a [`ContentSource::Resource`] is fetched
//! through a [`ContentLoader`] at render time. The renderer never touches the
//! filesystem itself.
//!
//! [`ContentSource::Resource`]: crate::context::ContentSource::Resource

use crate::error::LoadError;
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Trait for fetching the text of a named resource.
pub trait ContentLoader {
    /// Load the full text of `identifier`.
    fn load(&self, identifier: &str) -> Result<String, LoadError>;
}

/// Loader that finds nothing.
///
/// Use this loader when partials are always given inline, or in test
/// scenarios where resource partials should be skipped.
#[derive(Debug, Clone, Default)]
pub struct NullLoader;

impl ContentLoader for NullLoader {
    fn load(&self, identifier: &str) -> Result<String, LoadError> {
        Err(LoadError::NotFound {
            identifier: identifier.to_string(),
        })
    }
}

/// Loader that serves resources from an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    resources: HashMap<String, String>,
}

impl MemoryLoader {
    /// Create a new empty memory loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the loader.
    pub fn add(&mut self, identifier: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.resources.insert(identifier.into(), content.into());
        self
    }

    /// Create a loader with the given resources.
    pub fn with_resources(
        resources: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut loader = Self::new();
        for (identifier, content) in resources {
            loader.add(identifier, content);
        }
        loader
    }
}

impl ContentLoader for MemoryLoader {
    fn load(&self, identifier: &str) -> Result<String, LoadError> {
        self.resources
            .get(identifier)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                identifier: identifier.to_string(),
            })
    }
}

/// Loader that reads resources from the filesystem.
///
/// Identifiers are paths relative to the base directory (absolute paths are
/// used as-is). When a default extension is set, identifiers without an
/// extension get it appended, so `header` resolves to `header.mustache`.
#[derive(Debug, Clone)]
pub struct FileSystemLoader {
    base_dir: PathBuf,
    extension: Option<String>,
}

impl FileSystemLoader {
    /// Create a loader rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: None,
        }
    }

    /// Append `extension` to identifiers that have none.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Create a loader rooted at the directory containing `template_path`.
    pub fn for_template(template_path: &Path) -> Self {
        let base_dir = template_path.parent().unwrap_or(Path::new("."));
        Self::new(base_dir)
    }

    /// The base directory of this loader.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve the path an identifier refers to.
    ///
    /// ```ignore
    /// // base: /templates, extension: "mustache"
    /// // "header"          → /templates/header.mustache
    /// // "header.html"     → /templates/header.html
    /// // "inc/header"      → /templates/inc/header.mustache
    /// ```
    pub fn resolve_path(&self, identifier: &str) -> PathBuf {
        let path = self.base_dir.join(identifier);
        match &self.extension {
            Some(ext) if !ext.is_empty() && Path::new(identifier).extension().is_none() => {
                path.with_extension(ext)
            }
            _ => path,
        }
    }
}

impl ContentLoader for FileSystemLoader {
    fn load(&self, identifier: &str) -> Result<String, LoadError> {
        let path = self.resolve_path(identifier);
        read_contents_from_path(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                LoadError::NotFound {
                    identifier: identifier.to_string(),
                }
            } else {
                LoadError::Io {
                    identifier: identifier.to_string(),
                    source,
                }
            }
        })
    }
}

/// Read a byte stream fully as UTF-8 text.
pub fn read_contents(mut reader: impl Read) -> io::Result<String> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(text)
}

/// Read a file fully as UTF-8 text.
pub fn read_contents_from_path(path: &Path) -> io::Result<String> {
    std::fs::read_to_string(path)
}
