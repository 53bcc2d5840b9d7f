//! The compiled template tree walked by the renderer.

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::compile::path::Path;
use crate::types::span::Span;
use crate::types::syntax::Syntax;
use crate::Value;

/// A compiled template together with every partial it includes.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Program {
    pub fragment: Fragment,
    /// Owns the compiled partials. Partial nodes only hold weak references
    /// so that recursive partials do not leak.
    pub partials: Vec<Arc<Slot>>,
}

/// A compiled partial, filled in once its source has been compiled.
pub type Slot = OnceCell<Fragment>;

/// A compiled template source.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Fragment {
    pub source: Source,
    pub root: Arc<Node>,
}

/// The name and text of a template source, used for error reporting.
#[derive(Clone)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Source {
    pub name: Option<Arc<str>>,
    pub text: Arc<str>,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub enum Node {
    Text(String),
    Variable(Variable),
    Section(Section),
    Partial(Partial),
    Sequence(Vec<Node>),
    Scoped(Scoped),
}

/// A tag name followed by positional and `key=value` parameters.
#[derive(Clone)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Call {
    pub name: Path,
    pub params: Vec<Param>,
    pub hash: Vec<(String, Param)>,
    pub span: Span,
}

#[derive(Clone)]
#[cfg_attr(internal_debug, derive(Debug))]
pub enum Param {
    Literal(Value),
    Path(Path),
}

/// `{{ name }}`, `{{{ name }}}` or `{{& name }}`.
#[derive(Clone)]
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Variable {
    pub call: Call,
    pub escape: bool,
    pub span: Span,
}

/// `{{# name }} ... {{ else }} ... {{/ name }}` or `{{^ name }} ... {{/ name }}`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Section {
    pub call: Call,
    pub inverted: bool,
    pub block_params: Vec<String>,
    pub body: Arc<Node>,
    pub inverse: Option<Arc<Node>>,
    /// The unrendered body text, passed to lambdas.
    pub raw: String,
    /// The delimiters that were active at the opening tag.
    pub syntax: Syntax,
    pub span: Span,
}

/// `{{> name context key=value }}`
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Partial {
    pub name: String,
    /// `None` if the partial is expected to be registered inline while
    /// rendering.
    pub template: Option<Weak<Slot>>,
    pub context: Option<Path>,
    pub hash: Vec<(String, Param)>,
    /// The body of a `{{#> name }} ... {{/ name }}` partial block.
    pub block: Option<Arc<Node>>,
    pub span: Span,
}

/// A block that defines partials with `{{#*inline "name" }}`. The partials
/// are only visible while the body is rendered.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Scoped {
    pub partials: Vec<(String, Arc<Node>)>,
    pub body: Box<Node>,
}

impl Node {
    /// Builds a sequence, collapsing it if it holds a single node.
    pub fn sequence(mut nodes: Vec<Node>) -> Self {
        if nodes.len() == 1 {
            if let Some(node) = nodes.pop() {
                return node;
            }
        }
        Node::Sequence(nodes)
    }
}

impl Call {
    /// Whether the tag passes any arguments.
    pub fn has_args(&self) -> bool {
        !self.params.is_empty() || !self.hash.is_empty()
    }
}
