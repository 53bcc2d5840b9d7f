//! Caches for templates compiled with
//! [`Engine::compile_named`][crate::Engine::compile_named].

use std::collections::HashMap;
use std::sync::RwLock;

use crate::Template;

/// A store of compiled templates keyed by name.
pub trait TemplateCache: Send + Sync {
    /// Returns the cached template called `name`.
    fn get(&self, name: &str) -> Option<Template>;

    /// Stores a compiled template.
    fn put(&self, name: &str, template: Template);

    /// Removes the template called `name`.
    fn evict(&self, name: &str);

    /// Removes every template.
    fn clear(&self);
}

/// A cache that never stores anything, every lookup compiles the template.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

/// A thread safe in-memory cache. This is the default.
#[derive(Default)]
pub struct MemoryCache {
    templates: RwLock<HashMap<String, Template>>,
}

impl TemplateCache for NoCache {
    fn get(&self, _: &str) -> Option<Template> {
        None
    }

    fn put(&self, _: &str, _: Template) {}

    fn evict(&self, _: &str) {}

    fn clear(&self) {}
}

impl MemoryCache {
    /// Constructs an empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateCache for MemoryCache {
    fn get(&self, name: &str) -> Option<Template> {
        self.templates.read().ok()?.get(name).cloned()
    }

    fn put(&self, name: &str, template: Template) {
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(name.to_owned(), template);
        }
    }

    fn evict(&self, name: &str) {
        if let Ok(mut templates) = self.templates.write() {
            templates.remove(name);
        }
    }

    fn clear(&self) {
        if let Ok(mut templates) = self.templates.write() {
            templates.clear();
        }
    }
}
