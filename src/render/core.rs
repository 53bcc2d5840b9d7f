use std::fmt::Write;
use std::sync::{Arc, Weak};

use crate::compile;
use crate::compile::{HELPER_MISSING, PARTIAL_BLOCK};
use crate::fmt::Formatter;
use crate::helpers::{builtins, Helper, Options, Output, TagType};
use crate::render::context::{Context, Inline, PartialBlock};
use crate::types::program::{Call, Node, Param, Partial, Section, Source, Variable};
use crate::types::span::Span;
use crate::types::syntax::Syntax;
use crate::value::{Map, ValueCow};
use crate::{Engine, Error, Result, Value};

/// Walks the compiled tree and writes the output.
pub(crate) struct RendererImpl<'render> {
    pub(crate) engine: &'render Engine,
    pub(crate) max_partial_depth: usize,
}

type Builtin = fn(&Value, &Options<'_>) -> Result<Output>;

impl<'render> RendererImpl<'render> {
    pub(crate) fn render(
        &self,
        f: &mut Formatter<'_>,
        node: &Node,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<()> {
        match node {
            Node::Text(text) => {
                // We don't need to enrich this error because it can only
                // fail because of an IO error.
                f.write_str(text)?;
            }
            Node::Sequence(nodes) => {
                for node in nodes {
                    self.render(f, node, source, ctx)?;
                }
            }
            Node::Variable(var) => self.render_variable(f, var, source, ctx)?,
            Node::Section(section) => self.render_section(f, section, source, ctx)?,
            Node::Partial(partial) => self.render_partial(f, partial, source, ctx)?,
            Node::Scoped(scoped) => self.with_inlines(&scoped.partials, source, ctx, || {
                self.render(f, &scoped.body, source, ctx)
            })?,
        }
        Ok(())
    }

    pub(crate) fn render_to_string(
        &self,
        node: &Node,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<String> {
        let mut s = String::new();
        self.render(&mut Formatter::with_string(&mut s), node, source, ctx)?;
        Ok(s)
    }

    fn render_variable(
        &self,
        f: &mut Formatter<'_>,
        var: &Variable,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<()> {
        let call = &var.call;
        if let Some(helper) = self.find_helper(call, ctx) {
            let output = self.call_helper(helper, call, None, source, ctx)?;
            return self.write_output(f, output, var.escape, source, var.span);
        }
        self.check_args(call, source)?;

        let value = ctx.lookup(&call.name);
        match value.as_deref() {
            Some(Value::Lambda(lambda)) => match lambda.call(ctx.this(), "")? {
                Value::String(text) => {
                    let s = self.render_lambda(text, &self.engine.syntax, ctx)?;
                    self.write_text(f, &s, var.escape, source, var.span)
                }
                value => self.write_value(f, &value, false, source, var.span),
            },
            Some(value) => self.write_value(f, value, var.escape, source, var.span),
            None => self.write_value(f, &Value::None, var.escape, source, var.span),
        }
    }

    fn render_section(
        &self,
        f: &mut Formatter<'_>,
        section: &Section,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<()> {
        let call = &section.call;
        if let Some(helper) = self.find_helper(call, ctx) {
            let output = self.call_helper(helper, call, Some(section), source, ctx)?;
            return self.write_output(f, output, false, source, section.span);
        }
        self.check_args(call, source)?;

        let value = ctx
            .lookup(&call.name)
            .unwrap_or(ValueCow::Owned(Value::None));

        let builtin: Builtin = match &*value {
            _ if section.inverted => builtins::unless,
            Value::List(_) => builtins::each,
            Value::Bool(_) => builtins::if_,
            Value::Lambda(lambda) => {
                return match lambda.call(ctx.this(), &section.raw)? {
                    Value::String(text) => {
                        let s = self.render_lambda(text, &section.syntax, ctx)?;
                        f.write_str(&s)?;
                        Ok(())
                    }
                    value => self.write_value(f, &value, false, source, section.span),
                };
            }
            _ => builtins::with,
        };
        let mut options = self.options(call, Some(section), source, ctx, Vec::new(), Map::new());
        if section.inverted {
            std::mem::swap(&mut options.body, &mut options.inverse);
        }
        let output = builtin(&value, &options)?;
        self.write_output(f, output, false, source, section.span)
    }

    fn render_partial(
        &self,
        f: &mut Formatter<'_>,
        partial: &Partial,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<()> {
        if partial.name == PARTIAL_BLOCK {
            return self.render_partial_block(f, partial, source, ctx);
        }
        let hash = self.eval_hash(&partial.hash, ctx);
        let has_context = partial.context.is_some();
        let model = self.partial_model(partial, ctx);
        let locate = |err: Error| err.at(&source.text, partial.span).with_name(source.name.as_deref());

        // Partials defined inline in the block of a partial block call are
        // visible to the partial.
        let block = partial.block.as_ref();
        let defined = match block.map(|b| &**b) {
            Some(Node::Scoped(scoped)) => &scoped.partials[..],
            _ => &[][..],
        };
        self.with_inlines(defined, source, ctx, || {
            let shared = ctx.shared();
            // An inline partial registered during this render takes precedence.
            let inline = shared.inline(&partial.name);
            let slot = partial.template.as_ref().and_then(Weak::upgrade);
            let (node, included, hash) = match (&inline, slot.as_ref().and_then(|s| s.get())) {
                (Some(inline), _) => {
                    let mut merged = inline.hash.clone();
                    merged.extend(hash);
                    (&inline.body, &inline.source, merged)
                }
                (None, Some(fragment)) => (&fragment.root, &fragment.source, hash),
                (None, None) => {
                    return match block {
                        Some(body) => self
                            .with_partial_frame(&partial.name, ctx, model, hash, has_context, |frame| {
                                self.render(f, body, source, frame)
                            })
                            .map_err(locate),
                        None => Err(Error::partial(
                            format!("the partial '{}' could not be found", partial.name),
                            &source.text,
                            partial.span,
                        )
                        .with_name(source.name.as_deref())),
                    };
                }
            };

            let prev = block.map(|body| {
                shared.replace_partial_block(Some(Arc::new(PartialBlock {
                    body: body.clone(),
                    source: source.clone(),
                    parent: shared.partial_block(),
                })))
            });
            let result = self
                .with_partial_frame(&partial.name, ctx, model, hash, has_context, |frame| {
                    self.render(f, node, included, frame)
                })
                .map_err(locate);
            if let Some(prev) = prev {
                shared.replace_partial_block(prev);
            }
            result
        })
    }

    /// Renders the block the current partial was called with.
    ///
    /// The block is rendered in the frame of the `{{> @partial-block}}` tag.
    /// Within it, `@partial-block` refers to the block of the enclosing call.
    fn render_partial_block(
        &self,
        f: &mut Formatter<'_>,
        partial: &Partial,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<()> {
        let shared = ctx.shared();
        let block = match shared.partial_block() {
            Some(block) => block,
            None => {
                return Err(Error::partial(
                    format!("the partial '{PARTIAL_BLOCK}' could not be found"),
                    &source.text,
                    partial.span,
                )
                .with_name(source.name.as_deref()))
            }
        };
        let hash = self.eval_hash(&partial.hash, ctx);
        let model = self.partial_model(partial, ctx);
        let prev = shared.replace_partial_block(block.parent.clone());
        let result = self.with_partial_frame(
            PARTIAL_BLOCK,
            ctx,
            model,
            hash,
            partial.context.is_some(),
            |frame| self.render(f, &block.body, &block.source, frame),
        );
        shared.replace_partial_block(prev);
        result.map_err(|err| err.at(&source.text, partial.span).with_name(source.name.as_deref()))
    }

    /// Registers the inline partials of a block while `render` runs.
    fn with_inlines<R>(
        &self,
        partials: &[(String, Arc<Node>)],
        source: &Source,
        ctx: &Context<'_>,
        render: impl FnOnce() -> Result<R>,
    ) -> Result<R> {
        let shared = ctx.shared();
        let replaced: Vec<_> = partials
            .iter()
            .map(|(name, body)| {
                let inline = Inline {
                    body: body.clone(),
                    source: source.clone(),
                    hash: Map::new(),
                };
                (name, shared.replace_inline(name.clone(), inline))
            })
            .collect();
        let result = render();
        for (name, prev) in replaced.into_iter().rev() {
            shared.restore_inline(name, prev);
        }
        result
    }

    /// The context value of a partial, the caller's unless one is given.
    fn partial_model<'c>(&self, partial: &Partial, ctx: &'c Context<'_>) -> ValueCow<'c> {
        match &partial.context {
            Some(path) => ctx.lookup(path).unwrap_or(ValueCow::Owned(Value::None)),
            None => ValueCow::Borrowed(ctx.this()),
        }
    }

    fn eval_hash(&self, hash: &[(String, Param)], ctx: &Context<'_>) -> Map<String, Value> {
        hash.iter()
            .map(|(k, p)| (k.clone(), self.eval_param(p, ctx)))
            .collect()
    }

    /// Renders a partial body to a string, used by the `block` helper.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn render_partial_body(
        &self,
        name: &str,
        node: &Node,
        source: &Source,
        ctx: &Context<'_>,
        model: ValueCow<'_>,
        hash: Map<String, Value>,
        has_context: bool,
    ) -> Result<String> {
        self.with_partial_frame(name, ctx, model, hash, has_context, |frame| {
            self.render_to_string(node, source, frame)
        })
    }

    /// Pushes the frame a partial is rendered in.
    ///
    /// Hash arguments create a partial frame that shadows the model, an
    /// explicit context creates a plain child frame and otherwise the
    /// partial shares the frame of the caller.
    fn with_partial_frame<R>(
        &self,
        name: &str,
        ctx: &Context<'_>,
        model: ValueCow<'_>,
        hash: Map<String, Value>,
        has_context: bool,
        render: impl FnOnce(&Context<'_>) -> Result<R>,
    ) -> Result<R> {
        let shared = ctx.shared();
        if shared.depth() >= self.max_partial_depth {
            return Err(Error::max_partial_depth(self.max_partial_depth));
        }
        shared.push_partial(name);
        let result = if !hash.is_empty() {
            render(&ctx.partial(model, hash))
        } else if has_context {
            render(&ctx.child(model))
        } else {
            render(ctx)
        };
        shared.pop_partial();
        result
    }

    /// Compiles the text returned by a lambda and renders it in the current
    /// context.
    fn render_lambda(&self, text: String, syntax: &Syntax, ctx: &Context<'_>) -> Result<String> {
        let source = Source {
            name: None,
            text: Arc::from(text),
        };
        let program = compile::template_with_syntax(self.engine, source, syntax)?;
        let fragment = &program.fragment;
        self.render_to_string(&fragment.root, &fragment.source, ctx)
    }

    /// Returns the helper a call dispatches to.
    ///
    /// A block parameter shadows a helper of the same name. Calls with
    /// arguments that name no helper go to `helperMissing` if registered.
    fn find_helper(&self, call: &Call, ctx: &Context<'_>) -> Option<&'render dyn Helper> {
        if let Some(name) = call.name.as_helper_name() {
            if !ctx.has_block_param(name) {
                if let Some(helper) = self.engine.helpers.get(name) {
                    return Some(&**helper);
                }
            }
        }
        if call.has_args() {
            if let Some(helper) = self.engine.helpers.get(HELPER_MISSING) {
                log::warn!("no helper named `{}`, using `{HELPER_MISSING}`", call.name);
                return Some(&**helper);
            }
        }
        None
    }

    /// A call with arguments that does not resolve to a helper.
    fn check_args(&self, call: &Call, source: &Source) -> Result<()> {
        if !call.has_args() {
            return Ok(());
        }
        Err(Error::helper(
            format!("could not find helper: '{}'", call.name),
            &source.text,
            call.span,
        )
        .with_name(source.name.as_deref()))
    }

    fn call_helper(
        &self,
        helper: &dyn Helper,
        call: &Call,
        section: Option<&Section>,
        source: &Source,
        ctx: &Context<'_>,
    ) -> Result<Output> {
        let mut params: Vec<Value> = call.params.iter().map(|p| self.eval_param(p, ctx)).collect();
        let hash = self.eval_hash(&call.hash, ctx);
        let this = match params.is_empty() {
            true => ValueCow::Borrowed(ctx.this()),
            false => ValueCow::Owned(params.remove(0)),
        };
        let options = self.options(call, section, source, ctx, params, hash);
        helper.call(&this, &options)
    }

    fn options<'o>(
        &'o self,
        call: &'o Call,
        section: Option<&'o Section>,
        source: &'o Source,
        ctx: &'o Context<'o>,
        params: Vec<Value>,
        hash: Map<String, Value>,
    ) -> Options<'o> {
        let (tag_type, body, inverse, block_params) = match section {
            None => (TagType::Variable, None, None, &[][..]),
            Some(s) if s.inverted => (
                TagType::InvertedSection,
                s.inverse.as_ref(),
                Some(&s.body),
                &s.block_params[..],
            ),
            Some(s) => (
                TagType::Section,
                Some(&s.body),
                s.inverse.as_ref(),
                &s.block_params[..],
            ),
        };
        Options {
            renderer: self,
            ctx,
            source,
            name: call.name.raw(),
            tag_type,
            params,
            hash,
            body,
            inverse,
            block_params,
        }
    }

    fn eval_param(&self, param: &Param, ctx: &Context<'_>) -> Value {
        match param {
            Param::Literal(value) => value.clone(),
            Param::Path(path) => match ctx.lookup(path) {
                Some(value) => value.into_owned(),
                None if self.engine.string_params => Value::from(path.raw()),
                None => Value::None,
            },
        }
    }

    fn write_output(
        &self,
        f: &mut Formatter<'_>,
        output: Output,
        escape: bool,
        source: &Source,
        span: Span,
    ) -> Result<()> {
        match output {
            Output::Safe(s) => {
                f.write_str(&s)?;
                Ok(())
            }
            Output::Value(value) => self.write_value(f, &value, escape, source, span),
        }
    }

    /// Formats the value using the default formatter and escapes it if
    /// required.
    fn write_value(
        &self,
        f: &mut Formatter<'_>,
        value: &Value,
        escape: bool,
        source: &Source,
        span: Span,
    ) -> Result<()> {
        let err = |e| Error::format(e).at(&source.text, span).with_name(source.name.as_deref());
        if escape {
            let s = crate::fmt::to_string(&*self.engine.default_formatter, value).map_err(err)?;
            (self.engine.escape_fn)(f, &s).map_err(err)
        } else {
            (self.engine.default_formatter)(f, value).map_err(err)
        }
    }

    fn write_text(
        &self,
        f: &mut Formatter<'_>,
        text: &str,
        escape: bool,
        source: &Source,
        span: Span,
    ) -> Result<()> {
        if escape {
            (self.engine.escape_fn)(f, text)
                .map_err(|e| Error::format(e).at(&source.text, span).with_name(source.name.as_deref()))
        } else {
            f.write_str(text)?;
            Ok(())
        }
    }
}
