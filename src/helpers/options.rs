use std::sync::Arc;

use crate::render::{Context, Inline, RendererImpl};
use crate::types::program::{Node, Source};
use crate::value::{Map, ValueCow};
use crate::{Engine, Result, Value};

/// The kind of tag a helper was invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    /// `{{ name }}`, `{{{ name }}}` or `{{& name }}`.
    Variable,
    /// `{{# name }}`.
    Section,
    /// `{{^ name }}`. The blocks are swapped, so [`Options::fn_`] renders
    /// the body of the inverted section.
    InvertedSection,
}

/// The arguments and blocks of a helper call.
///
/// An `Options` value only lives for a single helper call.
pub struct Options<'o> {
    pub(crate) renderer: &'o RendererImpl<'o>,
    pub(crate) ctx: &'o Context<'o>,
    pub(crate) source: &'o Source,
    pub(crate) name: &'o str,
    pub(crate) tag_type: TagType,
    pub(crate) params: Vec<Value>,
    pub(crate) hash: Map<String, Value>,
    pub(crate) body: Option<&'o Arc<Node>>,
    pub(crate) inverse: Option<&'o Arc<Node>>,
    pub(crate) block_params: &'o [String],
}

impl<'o> Options<'o> {
    /// The name of the tag, e.g. `if` for `{{#if cond}}`.
    ///
    /// For `helperMissing` this is the name of the missing helper.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The kind of tag this helper was invoked from.
    pub fn tag_type(&self) -> TagType {
        self.tag_type
    }

    /// The engine that is rendering the template.
    pub fn engine(&self) -> &Engine {
        self.renderer.engine
    }

    /// The current context frame.
    pub fn context(&self) -> &Context<'o> {
        self.ctx
    }

    /// The current context value.
    pub fn this(&self) -> &Value {
        self.ctx.this()
    }

    /// The positional arguments following the first one.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Returns the positional argument at `index`, counting from the second
    /// argument of the tag.
    pub fn param(&self, index: usize) -> Option<&Value> {
        self.params.get(index)
    }

    /// Returns the positional argument at `index` or the given default.
    pub fn param_or(&self, index: usize, default: impl Into<Value>) -> Value {
        match self.params.get(index) {
            Some(v) => v.clone(),
            None => default.into(),
        }
    }

    /// The `key=value` arguments.
    pub fn hash_map(&self) -> &Map<String, Value> {
        &self.hash
    }

    /// Returns the `key=value` argument named `key`.
    pub fn hash(&self, key: &str) -> Option<&Value> {
        self.hash.get(key)
    }

    /// Returns the `key=value` argument named `key` or the given default.
    pub fn hash_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.hash.get(key) {
            Some(v) => v.clone(),
            None => default.into(),
        }
    }

    /// The block parameter names declared with `as |a b|`.
    pub fn block_params(&self) -> &[String] {
        self.block_params
    }

    /// Whether the value is falsy, see [`Value::is_falsy`].
    pub fn is_falsy(&self, value: &Value) -> bool {
        value.is_falsy()
    }

    /// Renders the body of the section in the current context.
    pub fn fn_(&self) -> Result<String> {
        self.render(self.body, self.ctx)
    }

    /// Renders the body of the section with `value` as the context.
    pub fn fn_with(&self, value: &Value) -> Result<String> {
        let frame = self.ctx.child(ValueCow::Borrowed(value));
        self.render(self.body, &frame)
    }

    /// Renders the body of the section in the given frame, binding the
    /// declared block parameters to `values` in order.
    pub fn apply(&self, ctx: &Context<'_>, values: Vec<Value>) -> Result<String> {
        if self.block_params.is_empty() {
            return self.render(self.body, ctx);
        }
        let params = self.block_params.iter().cloned().zip(values).collect();
        let frame = ctx.block_params(params);
        self.render(self.body, &frame)
    }

    /// Renders the `{{else}}` block of the section in the current context.
    pub fn inverse(&self) -> Result<String> {
        self.render(self.inverse, self.ctx)
    }

    /// Renders the `{{else}}` block of the section with `value` as the
    /// context.
    pub fn inverse_with(&self, value: &Value) -> Result<String> {
        let frame = self.ctx.child(ValueCow::Borrowed(value));
        self.render(self.inverse, &frame)
    }

    /// Returns the data variable `@name`.
    pub fn data(&self, name: &str) -> Option<Value> {
        self.ctx.shared().data(name)
    }

    /// Sets the data variable `@name` for the rest of the render.
    pub fn set_data(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.ctx.shared().set_data(name.into(), value.into());
    }

    /// Whether an inline partial named `name` is registered.
    pub fn partial(&self, name: &str) -> bool {
        self.ctx.shared().inline(name).is_some()
    }

    /// Registers the body of the section as an inline partial named `name`
    /// for the rest of the render. The `key=value` arguments are stored
    /// with it and apply whenever the partial is rendered.
    pub fn set_partial(&self, name: impl Into<String>) {
        if let Some(body) = self.body {
            self.ctx.shared().set_inline(
                name.into(),
                Inline {
                    body: body.clone(),
                    source: self.source.clone(),
                    hash: self.hash.clone(),
                },
            );
        }
    }

    fn render(&self, node: Option<&Arc<Node>>, ctx: &Context<'_>) -> Result<String> {
        match node {
            Some(node) => self.renderer.render_to_string(node, self.source, ctx),
            None => Ok(String::new()),
        }
    }

    /// Renders the partial named `name` with the `key=value` arguments of
    /// this call layered over the current context. An inline partial takes
    /// precedence over one the engine can load.
    ///
    /// Returns `None` if there is no such partial.
    pub(crate) fn render_partial(&self, name: &str) -> Result<Option<String>> {
        let shared = self.ctx.shared();
        if let Some(inline) = shared.inline(name) {
            let mut hash = inline.hash;
            hash.extend(self.hash.clone());
            let out = self.renderer.render_partial_body(
                name,
                &inline.body,
                &inline.source,
                self.ctx,
                ValueCow::Borrowed(self.this()),
                hash,
                false,
            )?;
            return Ok(Some(out));
        }
        let template = match self.renderer.engine.compile_named(name) {
            Ok(template) => template,
            Err(err) if err.kind() == crate::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        let fragment = &template.program().fragment;
        let out = self.renderer.render_partial_body(
            name,
            &fragment.root,
            &fragment.source,
            self.ctx,
            ValueCow::Borrowed(self.this()),
            self.hash.clone(),
            false,
        )?;
        Ok(Some(out))
    }
}
