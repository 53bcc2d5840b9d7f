#![allow(clippy::wrong_self_convention)]

mod context;
mod core;

use std::io;

use crate::fmt::{Formatter, Writer};
pub use crate::render::context::Context;
pub(crate) use crate::render::context::{Inline, Shared};
pub(crate) use crate::render::core::RendererImpl;
use crate::types::program::Program;
use crate::value::{Map, ValueCow};
use crate::{Engine, Error, Result, Value};

fn to_string(
    engine: &Engine,
    program: &Program,
    globals: &Value,
    data: Map<String, Value>,
    max_partial_depth: usize,
) -> Result<String> {
    let fragment = &program.fragment;
    let mut s = String::with_capacity(fragment.source.text.len());
    let mut f = Formatter::with_string(&mut s);
    let shared = Shared::new(data);
    let ctx = Context::root(ValueCow::Borrowed(globals), &shared, &engine.resolver);
    RendererImpl {
        engine,
        max_partial_depth,
    }
    .render(&mut f, &fragment.root, &fragment.source, &ctx)?;
    Ok(s)
}

fn to_writer<W>(
    engine: &Engine,
    program: &Program,
    globals: &Value,
    data: Map<String, Value>,
    max_partial_depth: usize,
    writer: W,
) -> Result<()>
where
    W: io::Write,
{
    let fragment = &program.fragment;
    let mut w = Writer::new(writer);
    let mut f = Formatter::with_writer(&mut w);
    let shared = Shared::new(data);
    let ctx = Context::root(ValueCow::Borrowed(globals), &shared, &engine.resolver);
    RendererImpl {
        engine,
        max_partial_depth,
    }
    .render(&mut f, &fragment.root, &fragment.source, &ctx)
    .map_err(|err| w.take_err().map(Error::from).unwrap_or(err))
}

/// A renderer that interprets a compiled [`Template`][crate::Template].
///
/// This struct is created by one of the following functions:
/// - [`Template::render`][crate::Template::render]
/// - [`Template::render_from`][crate::Template::render_from]
#[must_use = "must call `.to_string()` or `.to_writer(..)` on the renderer"]
pub struct Renderer<'render> {
    engine: &'render Engine,
    program: &'render Program,
    globals: Globals<'render>,
    data: Map<String, Value>,
    max_partial_depth: Option<usize>,
}

enum Globals<'render> {
    Owned(Result<Value>),
    Borrowed(&'render Value),
}

impl<'render> Renderer<'render> {
    fn new(engine: &'render Engine, program: &'render Program, globals: Globals<'render>) -> Self {
        Self {
            engine,
            program,
            globals,
            data: Map::new(),
            max_partial_depth: None,
        }
    }

    #[cfg(feature = "serde")]
    pub(crate) fn with_serde<S>(
        engine: &'render Engine,
        program: &'render Program,
        globals: S,
    ) -> Self
    where
        S: ::serde::Serialize,
    {
        Self::new(engine, program, Globals::Owned(crate::to_value(globals)))
    }

    pub(crate) fn with_value(
        engine: &'render Engine,
        program: &'render Program,
        globals: &'render Value,
    ) -> Self {
        Self::new(engine, program, Globals::Borrowed(globals))
    }

    /// Set a data variable, available in the template as `@name`.
    pub fn with_data(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Set the maximum number of nested partials.
    ///
    /// Defaults to the engine setting.
    pub fn with_max_partial_depth(mut self, depth: usize) -> Self {
        self.max_partial_depth = Some(depth);
        self
    }

    /// Render the template to a string.
    pub fn to_string(self) -> Result<String> {
        let depth = self.max_partial_depth.unwrap_or(self.engine.max_partial_depth);
        match self.globals {
            Globals::Owned(result) => {
                let value = result?;
                to_string(self.engine, self.program, &value, self.data, depth)
            }
            Globals::Borrowed(value) => {
                to_string(self.engine, self.program, value, self.data, depth)
            }
        }
    }

    /// Render the template to the given writer.
    pub fn to_writer<W>(self, w: W) -> Result<()>
    where
        W: io::Write,
    {
        let depth = self.max_partial_depth.unwrap_or(self.engine.max_partial_depth);
        match self.globals {
            Globals::Owned(result) => {
                let value = result?;
                to_writer(self.engine, self.program, &value, self.data, depth, w)
            }
            Globals::Borrowed(value) => {
                to_writer(self.engine, self.program, value, self.data, depth, w)
            }
        }
    }
}
