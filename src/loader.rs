//! Template loaders fetch template sources by name.
//!
//! The engine consults its in-memory partials first and then the loader set
//! with [`Engine::set_loader`][crate::Engine::set_loader]. A loader that
//! does not know a template returns an error of kind
//! [`ErrorKind::NotFound`].

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::{Error, ErrorKind, Result};

/// A source of named templates.
pub trait TemplateLoader: Send + Sync {
    /// Loads the source of the template called `name`.
    fn load(&self, name: &str) -> Result<String>;
}

/// Loads templates from memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: BTreeMap<String, String>,
}

/// Loads templates from files in a directory.
///
/// The template `name` is read from `<base>/<name><suffix>`.
#[derive(Debug, Clone)]
pub struct FileLoader {
    base: PathBuf,
    suffix: String,
}

/// Tries several loaders in order.
#[derive(Default)]
pub struct CompositeLoader {
    loaders: Vec<Box<dyn TemplateLoader>>,
}

impl MemoryLoader {
    /// Constructs an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template, replacing any template with the same name.
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    /// Removes a template.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.templates.remove(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(ToOwned::to_owned)
            .ok_or_else(|| Error::not_found(name))
    }
}

impl FileLoader {
    /// Constructs a loader for the given directory using the `.hbs` suffix.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            suffix: String::from(".hbs"),
        }
    }

    /// Sets the file name suffix, e.g. `.mustache`.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        let rel = PathBuf::from(format!("{name}{}", self.suffix));
        // Names must stay within the base directory.
        let normal = Path::new(&rel)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        normal.then(|| self.base.join(rel))
    }
}

impl TemplateLoader for FileLoader {
    fn load(&self, name: &str) -> Result<String> {
        let path = self.path(name).ok_or_else(|| Error::not_found(name))?;
        log::debug!("loading template `{name}` from {}", path.display());
        match fs::read_to_string(&path) {
            Ok(source) => Ok(source),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::not_found(name)),
            Err(err) => Err(Error::from(err)),
        }
    }
}

impl CompositeLoader {
    /// Constructs an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a loader. Loaders are tried in the order they were added.
    pub fn push<L>(&mut self, loader: L)
    where
        L: TemplateLoader + 'static,
    {
        self.loaders.push(Box::new(loader));
    }
}

impl TemplateLoader for CompositeLoader {
    fn load(&self, name: &str) -> Result<String> {
        for loader in &self.loaders {
            match loader.load(name) {
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                result => return result,
            }
        }
        Err(Error::not_found(name))
    }
}
