//! Compile the template into a program that can be executed by the renderer.
//!
//! This process has four stages:
//! - The lexer chunks the template source into tokens.
//! - The parser turns the token stream into a flat list of tags.
//! - Blank lines around standalone tags are removed.
//! - The compiler nests sections into a tree and compiles every partial that
//!   is included.

mod lex;
mod parse;
pub mod path;
mod standalone;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::types::ast;
use crate::types::program::{
    Call, Fragment, Node, Param, Partial, Program, Scoped, Section, Slot, Source,
};
use crate::types::span::Span;
use crate::types::syntax::Syntax;
use crate::{Engine, Error, ErrorKind, Result};

/// The name of the helper that receives calls to unknown helpers.
pub(crate) const HELPER_MISSING: &str = "helperMissing";

/// The name under which a partial renders the block it was called with.
pub(crate) const PARTIAL_BLOCK: &str = "@partial-block";

/// Compile a template into a program.
pub(crate) fn template(engine: &Engine, source: Source) -> Result<Program> {
    template_with_syntax(engine, source, &engine.syntax)
}

/// Compile a template into a program starting with the given delimiters.
pub(crate) fn template_with_syntax(
    engine: &Engine,
    source: Source,
    syntax: &Syntax,
) -> Result<Program> {
    let mut compiler = Compiler::new(engine);

    // A named template may be included by its own partials.
    let this: Arc<Slot> = Arc::new(OnceCell::new());
    if let Some(name) = &source.name {
        compiler.stack.push((name.to_string(), this.clone()));
    }
    let root = Arc::new(compiler.compile_source(&source, syntax)?);
    let mut partials: Vec<_> = compiler.table.into_values().collect();
    if source.name.is_some() {
        let _ = this.set(Fragment {
            source: source.clone(),
            root: root.clone(),
        });
        partials.push(this);
    }
    Ok(Program {
        fragment: Fragment { source, root },
        partials,
    })
}

/// A compiler that nests the parsed tags into a tree.
struct Compiler<'engine> {
    engine: &'engine Engine,

    /// The partials currently being compiled, outermost first.
    stack: Vec<(String, Arc<Slot>)>,

    /// Every compiled partial keyed by its name and indentation.
    table: HashMap<(String, String), Arc<Slot>>,

    /// Names of partials defined inline with `{{#partial "name"}}` or
    /// `{{#*inline "name"}}`.
    inline: HashSet<String>,
}

/// Stores the state of an open block during compilation.
struct State {
    open: Opening,
    /// Whether an `{{else}}` was seen.
    has_else: bool,
    /// Whether this section was opened by an `{{else name}}` chain and must
    /// be closed together with its parent.
    chained: bool,
}

/// The opening tag of a block.
enum Opening {
    Section(ast::Open),
    Inline(ast::Inline),
    Partial(ast::Partial),
}

/// The nodes compiled so far for a block.
#[derive(Default)]
struct Scope {
    nodes: Vec<Node>,
    /// Partials defined with `{{#*inline "name"}}`, in order.
    inlines: Vec<(String, Arc<Node>)>,
}

impl<'engine> Compiler<'engine> {
    fn new(engine: &'engine Engine) -> Self {
        Self {
            engine,
            stack: Vec::new(),
            table: HashMap::new(),
            inline: HashSet::new(),
        }
    }

    fn compile_source(&mut self, source: &Source, syntax: &Syntax) -> Result<Node> {
        let name = source.name.as_deref();
        let text = &*source.text;
        let items = parse::Parser::new(text, syntax, self.engine.parent_scope_resolution)
            .parse_template()
            .map_err(|e| e.with_name(name))?
            .items;
        let items = standalone::strip(text, items);
        self.inline.extend(items.iter().filter_map(inline_partial_name));
        self.build(source, items).map_err(|e| e.with_name(name))
    }

    /// Nests the flat items into a tree.
    ///
    /// This function works using two stacks:
    /// - A stack of open sections e.g. `{{#if cond}} ... {{else}}`.
    /// - A stack of scopes which collect each compiled node.
    fn build(&mut self, source: &Source, items: Vec<ast::Item>) -> Result<Node> {
        let text = &*source.text;
        let mut blocks: Vec<State> = Vec::new();
        let mut scopes: Vec<Scope> = vec![Scope::default()];

        'items: for item in items {
            let node = match item {
                ast::Item::Text(span) => {
                    push_text(&mut current(&mut scopes).nodes, &text[span]);
                    continue;
                }

                ast::Item::Comment(_) | ast::Item::Delimiters(_) => continue,

                ast::Item::Variable(var) => {
                    self.check_helper(text, &var.call)?;
                    Node::Variable(var)
                }

                // A raw block is a section whose body is plain text.
                ast::Item::Raw(raw) => {
                    self.check_helper(text, &raw.call)?;
                    let body = text[raw.body].to_owned();
                    Node::Section(Section {
                        call: raw.call,
                        inverted: false,
                        block_params: Vec::new(),
                        body: Arc::new(Node::Text(body.clone())),
                        inverse: None,
                        raw: body,
                        syntax: raw.syntax,
                        span: raw.span,
                    })
                }

                // The start of a block. We must push a block to the block
                // stack and a scope to the scope stack because a block starts
                // a new scope.
                ast::Item::Open(open) => {
                    self.check_helper(text, &open.call)?;
                    blocks.push(State::new(Opening::Section(open)));
                    scopes.push(Scope::default());
                    continue;
                }
                ast::Item::OpenInline(inline) => {
                    blocks.push(State::new(Opening::Inline(inline)));
                    scopes.push(Scope::default());
                    continue;
                }
                ast::Item::OpenPartial(partial) => {
                    blocks.push(State::new(Opening::Partial(partial)));
                    scopes.push(Scope::default());
                    continue;
                }

                // An `else` clause. We expect that the previous block is a
                // section without an `else` and update it accordingly. A
                // chained `{{else if cond}}` also opens a nested section in
                // the inverse scope so we push two scopes.
                ast::Item::Else(ast::Else {
                    chain,
                    syntax,
                    span,
                }) => {
                    let err = || Error::syntax("unexpected `else` tag", text, span);
                    match blocks.last_mut().ok_or_else(err)? {
                        State {
                            open: Opening::Section(_),
                            has_else: has_else @ false,
                            ..
                        } => *has_else = true,
                        _ => return Err(err()),
                    }
                    scopes.push(Scope::default());
                    if let Some((call, block_params)) = chain {
                        self.check_helper(text, &call)?;
                        blocks.push(State {
                            open: Opening::Section(ast::Open {
                                call,
                                inverted: false,
                                block_params,
                                syntax,
                                span,
                            }),
                            has_else: false,
                            chained: true,
                        });
                        scopes.push(Scope::default());
                    }
                    continue;
                }

                // The end of a block. We have to pop back the scopes until we
                // get to the original block, any chained sections along the
                // way are nested into the inverse of their parent.
                ast::Item::Close(close) => {
                    let err = || Error::syntax("unexpected closing tag", text, close.span);
                    loop {
                        let State {
                            open,
                            has_else,
                            chained,
                        } = blocks.pop().ok_or_else(err)?;
                        if !chained && open.name() != close.name {
                            return Err(Error::syntax(
                                format!(
                                    "closing tag `{}` does not match opening tag `{}`",
                                    close.name,
                                    open.name()
                                ),
                                text,
                                close.span,
                            ));
                        }
                        let inverse = match has_else {
                            true => Some(Arc::new(pop(&mut scopes).finish())),
                            false => None,
                        };
                        let body = Arc::new(pop(&mut scopes).finish());
                        let node = match open {
                            Opening::Section(open) => Node::Section(Section {
                                raw: text[open.span.n..close.span.m].to_owned(),
                                call: open.call,
                                inverted: open.inverted,
                                block_params: open.block_params,
                                body,
                                inverse,
                                syntax: open.syntax,
                                span: open.span,
                            }),
                            Opening::Inline(inline) => {
                                current(&mut scopes).inlines.push((inline.name, body));
                                continue 'items;
                            }
                            Opening::Partial(partial) => {
                                self.compile_partial(source, partial, Some(body))?
                            }
                        };
                        if !chained {
                            break node;
                        }
                        current(&mut scopes).nodes.push(node);
                    }
                }

                ast::Item::Partial(partial) => self.compile_partial(source, partial, None)?,
            };
            current(&mut scopes).nodes.push(node);
        }

        if let Some(State { open, .. }) = blocks.first() {
            let msg = format!("unclosed section `{}`", open.name());
            return Err(Error::syntax(msg, text, open.span()));
        }

        Ok(pop(&mut scopes).finish())
    }

    /// Compiles the partial source and links it to the partial node.
    ///
    /// The slot for a partial is registered before its source is compiled so
    /// that recursive references find it instead of compiling the same source
    /// over and over.
    ///
    /// A partial block falls back to its body if there is no such partial,
    /// so it may name a partial that is only defined while rendering.
    fn compile_partial(
        &mut self,
        source: &Source,
        partial: ast::Partial,
        block: Option<Arc<Node>>,
    ) -> Result<Node> {
        let ast::Partial {
            name,
            context,
            hash,
            indent,
            span,
        } = partial;
        if name == PARTIAL_BLOCK {
            return Ok(Node::Partial(Partial {
                name,
                template: None,
                context,
                hash,
                block,
                span,
            }));
        }
        let indent = indent.unwrap_or_default();
        let key = (name.clone(), indent.clone());

        let slot = if let Some((_, slot)) = self.stack.iter().find(|(n, _)| *n == name) {
            if !self.engine.infinite_loops {
                return Err(Error::partial(
                    format!("an infinite loop was detected, partial '{name}' was loaded previously"),
                    &source.text,
                    span,
                ));
            }
            Some(slot.clone())
        } else if let Some(slot) = self.table.get(&key) {
            Some(slot.clone())
        } else {
            match self.engine.load_source(&name) {
                Ok(text) => {
                    log::debug!("compiling partial `{name}`");
                    let slot: Arc<Slot> = Arc::new(OnceCell::new());
                    self.table.insert(key, slot.clone());
                    self.stack.push((name.clone(), slot.clone()));
                    let included = Source {
                        name: Some(Arc::from(name.as_str())),
                        text: Arc::from(indent_lines(&text, &indent)),
                    };
                    let engine = self.engine;
                    let result = self.compile_source(&included, &engine.syntax);
                    self.stack.pop();
                    let root = result.map_err(|e| {
                        e.included_from(source.name.as_deref(), &source.text, span)
                    })?;
                    // The slot is only ever filled here, right after it was
                    // created.
                    let _ = slot.set(Fragment {
                        source: included,
                        root: Arc::new(root),
                    });
                    Some(slot)
                }
                Err(err)
                    if err.kind() == ErrorKind::NotFound
                        && (block.is_some() || self.inline.contains(&name)) =>
                {
                    None
                }
                Err(err) if err.kind() == ErrorKind::NotFound => {
                    return Err(Error::partial(
                        format!("the partial '{name}' could not be found"),
                        &source.text,
                        span,
                    ));
                }
                Err(err) => return Err(err.at(&source.text, span)),
            }
        };

        Ok(Node::Partial(Partial {
            name,
            template: slot.as_ref().map(Arc::downgrade),
            context,
            hash,
            block,
            span,
        }))
    }

    /// Checks that a tag with arguments names a helper.
    fn check_helper(&self, text: &str, call: &Call) -> Result<()> {
        if !call.has_args() || self.engine.helpers.contains_key(HELPER_MISSING) {
            return Ok(());
        }
        let name = call.name.raw();
        match call.name.as_helper_name() {
            Some(name) if self.engine.helpers.contains_key(name) => Ok(()),
            _ => Err(Error::helper(
                format!("could not find helper: '{name}'"),
                text,
                call.name_span(),
            )),
        }
    }
}

impl State {
    fn new(open: Opening) -> Self {
        Self {
            open,
            has_else: false,
            chained: false,
        }
    }
}

impl Opening {
    /// The name a closing tag must repeat.
    fn name(&self) -> &str {
        match self {
            Self::Section(open) => open.call.name.raw(),
            Self::Inline(_) => "inline",
            Self::Partial(partial) => &partial.name,
        }
    }

    fn span(&self) -> Span {
        match self {
            Self::Section(open) => open.span,
            Self::Inline(inline) => inline.span,
            Self::Partial(partial) => partial.span,
        }
    }
}

impl Scope {
    fn finish(self) -> Node {
        let body = Node::sequence(self.nodes);
        if self.inlines.is_empty() {
            return body;
        }
        Node::Scoped(Scoped {
            partials: self.inlines,
            body: Box::new(body),
        })
    }
}

fn current(scopes: &mut [Scope]) -> &mut Scope {
    match scopes.last_mut() {
        Some(scope) => scope,
        None => unreachable!("compiler bug: we should always have a scope"),
    }
}

fn pop(scopes: &mut Vec<Scope>) -> Scope {
    scopes.pop().unwrap_or_default()
}

/// Appends text, merging it with the previous node if that is text too.
fn push_text(scope: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    match scope.last_mut() {
        Some(Node::Text(prev)) => prev.push_str(text),
        _ => scope.push(Node::Text(text.to_owned())),
    }
}

/// Returns the name of an inline partial definition, i.e.
/// `{{#partial "name"}}` or `{{#*inline "name"}}`.
fn inline_partial_name(item: &ast::Item) -> Option<String> {
    match item {
        ast::Item::OpenInline(inline) => Some(inline.name.clone()),
        ast::Item::Open(open) if open.call.name.raw() == "partial" => {
            match open.call.params.first() {
                Some(Param::Literal(value)) => value.as_str().map(ToOwned::to_owned),
                Some(Param::Path(path)) => Some(path.raw().to_owned()),
                None => None,
            }
        }
        _ => None,
    }
}

/// Indents every line of the partial source, except for the empty remainder
/// after a trailing newline.
fn indent_lines(text: &str, indent: &str) -> String {
    if indent.is_empty() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        out.push_str(indent);
        out.push_str(line);
    }
    out
}

impl Call {
    /// The span of the tag name.
    fn name_span(&self) -> Span {
        Span::from(self.span.m..self.span.m + self.name.raw().len())
    }
}
