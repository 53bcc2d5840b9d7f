//! A Mustache and Handlebars compatible template engine.
//!
//! # Features
//!
//! ### Syntax
//!
//! - Variables: `{{ user.name }}`, unescaped with `{{{ user.name }}}` or
//!   `{{& user.name }}`
//! - Sections: `{{# users }} ... {{/ users }}`, inverted with `{{^ users }}`
//! - Helpers: `{{#if user.enabled}} ... {{else}} ... {{/if}}`,
//!   `{{#each users as |user|}} ... {{/each}}`
//! - Partials: `{{> header }}`, `{{> user person title="Admin" }}`
//! - Inline partials: `{{#*inline "nav"}} ... {{/inline}}`,
//!   `{{#partial "body"}} ... {{/partial}}` and
//!   `{{#block "body"}} ... {{/block}}`
//! - Partial blocks: `{{#> layout }} ... {{/layout}}`, rendered by
//!   `{{> @partial-block }}` within the partial
//! - Raw blocks: `{{{{raw}}}} {{ not parsed }} {{{{/raw}}}}`
//! - Comments: `{{! note }}`, `{{!-- may contain }} --}}`
//! - Delimiter changes: `{{=<% %>=}}`
//! - Whitespace control: `{{~ name ~}}`
//!
//! ### Engine
//!
//! - Mustache style scope climbing or strict Handlebars scoping
//! - Custom helpers, value formatters, escaping and value resolvers
//! - Lambdas that receive the raw section text
//! - Load partials from memory or the file system
//! - Render to a [`String`] or any [`std::io::Write`] implementor
//! - Render using any [`serde`] serializable values
//! - Convenient macro for quick rendering:
//!   `whisker::value!{ name: "John", age: 42 }`
//!
//! # Getting started
//!
//! Your entry point is the [`Engine`] struct. The engine stores the syntax
//! config, helpers and partials. Generally, you only need to construct one
//! engine during the lifetime of a program.
//!
//! ```
//! let engine = whisker::Engine::new();
//! ```
//!
//! Next, [`.compile`][Engine::compile] is used to compile a template.
//!
//! ```
//! # let engine = whisker::Engine::new();
//! let template = engine.compile("Hello {{ user.name }}!")?;
//! # Ok::<(), whisker::Error>(())
//! ```
//!
//! Finally, the template is rendered by calling
//! [`.render`][Template::render] and then
//! [`.to_string`][Renderer::to_string].
//!
//! ```
//! # let engine = whisker::Engine::new();
//! # let template = engine.compile("Hello {{ user.name }}!")?;
//! let result = template
//!     .render(&engine, whisker::value!{ user: { name: "John Smith" }})
//!     .to_string()?;
//! assert_eq!(result, "Hello John Smith!");
//! # Ok::<(), whisker::Error>(())
//! ```
//!
//! # Examples
//!
//! ### Render using structured data
//!
//! ```
//! #[derive(serde::Serialize)]
//! struct Context { user: User }
//!
//! #[derive(serde::Serialize)]
//! struct User { name: String }
//!
//! let ctx = Context { user: User { name: "John Smith".into() } };
//!
//! let engine = whisker::Engine::new();
//! let result = engine
//!     .compile("Hello {{ user.name }}")?
//!     .render(&engine, &ctx)
//!     .to_string()?;
//!
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), whisker::Error>(())
//! ```
//!
//! ### Partials
//!
//! Partials are compiled together with the template that includes them.
//!
//! ```
//! let mut engine = whisker::Engine::new();
//! engine.add_partial("user", "<b>{{ name }}</b>");
//!
//! let result = engine
//!     .compile("{{#users}}{{> user}}{{/users}}")?
//!     .render(&engine, whisker::value!{ users: [{ name: "John" }, { name: "Jane" }] })
//!     .to_string()?;
//!
//! assert_eq!(result, "<b>John</b><b>Jane</b>");
//! # Ok::<(), whisker::Error>(())
//! ```
//!
//! ### Render a template using custom delimiters
//!
//! ```
//! let syntax = whisker::Syntax::builder().delimiters("<%", "%>").build();
//! let engine = whisker::Engine::with_syntax(syntax);
//!
//! let result = engine
//!     .compile("Hello <% user.name %>")?
//!     .render(&engine, whisker::value!{ user: { name: "John Smith" }})
//!     .to_string()?;
//!
//! assert_eq!(result, "Hello John Smith");
//! # Ok::<(), whisker::Error>(())
//! ```
//!
//! ### Render a template to an `impl io::Write`
//!
//! ```
//! use std::io;
//!
//! let stdout = io::BufWriter::new(io::stdout());
//!
//! let engine = whisker::Engine::new();
//! engine
//!     .compile("Hello {{ user.name }}")?
//!     .render(&engine, whisker::value! { user: { name: "John Smith" }})
//!     .to_writer(stdout)?;
//! # Ok::<(), whisker::Error>(())
//! ```

mod cache;
mod compile;
mod error;
pub mod fmt;
mod helpers;
mod loader;
mod macros;
mod render;
mod types;
mod value;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use crate::cache::{MemoryCache, NoCache, TemplateCache};
pub use crate::compile::path;
pub use crate::error::{Error, ErrorKind};
pub use crate::helpers::{Helper, Options, Output, TagType};
pub use crate::loader::{CompositeLoader, FileLoader, MemoryLoader, TemplateLoader};
pub use crate::render::{Context, Renderer};
pub use crate::types::syntax::{Syntax, SyntaxBuilder};
#[cfg(feature = "serde")]
pub use crate::value::to_value;
pub use crate::value::resolve::{AccessorResolver, MapResolver, Resolved, ValueResolver};
#[doc(hidden)]
pub use crate::value::__map_key;
pub use crate::value::{Lambda, List, Map, Value, ValueCow};

use crate::fmt::{EscapeFn, FormatFn};
use crate::helpers::builtins;
use crate::types::program::{Program, Source};
use crate::value::resolve::CompositeResolver;

/// A type alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The compilation and rendering engine.
pub struct Engine {
    pub(crate) syntax: Syntax,
    pub(crate) default_formatter: Box<FormatFn>,
    pub(crate) escape_fn: Box<EscapeFn>,
    pub(crate) helpers: BTreeMap<String, Box<dyn Helper>>,
    pub(crate) resolver: CompositeResolver,
    pub(crate) parent_scope_resolution: bool,
    pub(crate) infinite_loops: bool,
    pub(crate) string_params: bool,
    pub(crate) max_partial_depth: usize,
    partials: MemoryLoader,
    loader: Option<Box<dyn TemplateLoader>>,
    cache: Box<dyn TemplateCache>,
}

/// A compiled template.
///
/// A template owns every partial it includes and does not borrow from the
/// engine, so it can be cached and shared between threads.
#[derive(Clone)]
pub struct Template {
    program: Arc<Program>,
}

impl Default for Engine {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Construct a new engine.
    ///
    /// The following helpers are registered:
    /// - `if`, `unless`: render the body if the argument is truthy or falsy.
    /// - `each`: render the body for every item of a list or entry of a map.
    /// - `with`: render the body with the argument as the context.
    /// - `lookup`: look up a member using a dynamic key.
    /// - `log`: log the arguments using the [`log`] crate.
    /// - `partial`, `block`: define and render inline partials.
    #[inline]
    pub fn new() -> Self {
        Self::with_syntax(Syntax::default())
    }

    /// Construct a new engine with custom delimiters.
    ///
    /// # Examples
    ///
    /// ```
    /// use whisker::{Engine, Syntax};
    ///
    /// let syntax = Syntax::builder().delimiters("<%", "%>").build();
    /// let engine = Engine::with_syntax(syntax);
    /// ```
    pub fn with_syntax(syntax: Syntax) -> Self {
        let mut engine = Self {
            syntax,
            default_formatter: Box::new(fmt::default),
            escape_fn: Box::new(fmt::escape_html),
            helpers: BTreeMap::new(),
            resolver: CompositeResolver::default(),
            parent_scope_resolution: true,
            infinite_loops: false,
            string_params: false,
            max_partial_depth: 64,
            partials: MemoryLoader::new(),
            loader: None,
            cache: Box::new(MemoryCache::new()),
        };
        engine.register_helper("if", builtins::if_);
        engine.register_helper("unless", builtins::unless);
        engine.register_helper("each", builtins::each);
        engine.register_helper("with", builtins::with);
        engine.register_helper("lookup", builtins::lookup);
        engine.register_helper("log", builtins::log);
        engine.register_helper("partial", builtins::partial);
        engine.register_helper("block", builtins::block);
        engine
    }

    /// Set the default formatter.
    ///
    /// The formatter is used for every value written by a variable tag,
    /// before escaping.
    #[inline]
    pub fn set_default_formatter<F>(&mut self, f: F)
    where
        F: Fn(&mut fmt::Formatter<'_>, &Value) -> fmt::Result + Sync + Send + 'static,
    {
        self.default_formatter = Box::new(f);
    }

    /// Set the function used to escape `{{ name }}` tags.
    ///
    /// Defaults to [`fmt::escape_html`]. Use [`fmt::escape_none`] to disable
    /// escaping.
    #[inline]
    pub fn set_escape_fn<F>(&mut self, f: F)
    where
        F: Fn(&mut fmt::Formatter<'_>, &str) -> fmt::Result + Sync + Send + 'static,
    {
        self.escape_fn = Box::new(f);
    }

    /// Register a helper, replacing any helper with the same name.
    ///
    /// A helper registered as `helperMissing` receives every call with
    /// arguments that names no helper.
    #[inline]
    pub fn register_helper<H>(&mut self, name: impl Into<String>, helper: H)
    where
        H: Helper + 'static,
    {
        self.helpers.insert(name.into(), Box::new(helper));
    }

    /// Add a partial that can be included with `{{> name}}`.
    ///
    /// Partials added this way take precedence over the loader.
    pub fn add_partial(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.partials.insert(name, source);
        self.cache.clear();
    }

    /// Set the loader used to find partials and named templates.
    pub fn set_loader<L>(&mut self, loader: L)
    where
        L: TemplateLoader + 'static,
    {
        self.loader = Some(Box::new(loader));
        self.cache.clear();
    }

    /// Set the cache used by [`compile_named`][Engine::compile_named].
    ///
    /// Defaults to a [`MemoryCache`].
    pub fn set_cache<C>(&mut self, cache: C)
    where
        C: TemplateCache + 'static,
    {
        self.cache = Box::new(cache);
    }

    /// Append a value resolver to the resolver chain.
    ///
    /// Resolvers are asked in order, the default chain is [`MapResolver`]
    /// then [`AccessorResolver`].
    pub fn add_resolver<R>(&mut self, resolver: R)
    where
        R: ValueResolver + 'static,
    {
        self.resolver.push(Box::new(resolver));
    }

    /// Replace the resolver chain.
    pub fn set_resolvers(&mut self, resolvers: Vec<Box<dyn ValueResolver>>) {
        self.resolver = CompositeResolver::new(resolvers);
    }

    /// Set whether lookups climb to enclosing scopes.
    ///
    /// When enabled, the default, `{{ name }}` inside a section is looked up
    /// in the section value and then in every enclosing value like Mustache.
    /// When disabled it is only looked up in the section value like strict
    /// Handlebars, use `../name` or `@root.name` to reach outer values.
    ///
    /// This only affects templates compiled afterwards.
    pub fn set_parent_scope_resolution(&mut self, enabled: bool) {
        self.parent_scope_resolution = enabled;
        self.cache.clear();
    }

    /// Set whether a partial may include itself.
    ///
    /// Disabled by default, in which case compiling a recursive partial
    /// fails. When enabled, rendering is bounded by the maximum partial depth.
    pub fn set_infinite_loops(&mut self, enabled: bool) {
        self.infinite_loops = enabled;
        self.cache.clear();
    }

    /// Set whether helper arguments that do not resolve evaluate to their own
    /// text instead of an empty value.
    pub fn set_string_params(&mut self, enabled: bool) {
        self.string_params = enabled;
    }

    /// Set the maximum number of nested partials while rendering.
    ///
    /// Defaults to 64.
    pub fn set_max_partial_depth(&mut self, depth: usize) {
        self.max_partial_depth = depth;
    }

    /// Compile a template.
    ///
    /// Partials referenced by the template are loaded and compiled too.
    pub fn compile(&self, source: &str) -> Result<Template> {
        let source = Source {
            name: None,
            text: Arc::from(source),
        };
        let program = compile::template(self, source)?;
        Ok(Template {
            program: Arc::new(program),
        })
    }

    /// Load a template by name and compile it.
    ///
    /// The compiled template is stored in the engine's cache.
    pub fn compile_named(&self, name: &str) -> Result<Template> {
        if let Some(template) = self.cache.get(name) {
            log::debug!("using cached template `{name}`");
            return Ok(template);
        }
        let text = self.load_source(name)?;
        log::debug!("compiling template `{name}`");
        let source = Source {
            name: Some(Arc::from(name)),
            text: Arc::from(text),
        };
        let template = Template {
            program: Arc::new(compile::template(self, source)?),
        };
        self.cache.put(name, template.clone());
        Ok(template)
    }

    /// Returns the source of the named template or partial.
    pub(crate) fn load_source(&self, name: &str) -> Result<String> {
        if let Some(source) = self.partials.get(name) {
            return Ok(source.to_owned());
        }
        match &self.loader {
            Some(loader) => loader.load(name),
            None => Err(Error::not_found(name)),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("syntax", &self.syntax)
            .field("helpers", &self.helpers.keys())
            .field("partials", &self.partials)
            .field("parent_scope_resolution", &self.parent_scope_resolution)
            .field("infinite_loops", &self.infinite_loops)
            .field("string_params", &self.string_params)
            .field("max_partial_depth", &self.max_partial_depth)
            .finish_non_exhaustive()
    }
}

impl Template {
    /// Render the template using the provided value.
    ///
    /// The returned [`Renderer`] must be consumed with
    /// [`.to_string()`][Renderer::to_string] or
    /// [`.to_writer(..)`][Renderer::to_writer].
    #[cfg(feature = "serde")]
    #[inline]
    pub fn render<'render, S>(&'render self, engine: &'render Engine, ctx: S) -> Renderer<'render>
    where
        S: serde::Serialize,
    {
        Renderer::with_serde(engine, &self.program, ctx)
    }

    /// Render the template using the provided [`Value`].
    #[inline]
    pub fn render_from<'render>(
        &'render self,
        engine: &'render Engine,
        ctx: &'render Value,
    ) -> Renderer<'render> {
        Renderer::with_value(engine, &self.program, ctx)
    }

    /// Returns the name of the template, if it was compiled using
    /// [`Engine::compile_named`].
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.program.fragment.source.name.as_deref()
    }

    /// Returns the original template source.
    #[inline]
    pub fn source(&self) -> &str {
        &self.program.fragment.source.text
    }

    pub(crate) fn program(&self) -> &Program {
        &self.program
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("name", &self.name())
            .finish_non_exhaustive()
    }
}
