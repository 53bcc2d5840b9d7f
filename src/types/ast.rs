//! The flat tag stream produced by the parser.
//!
//! Tags are kept flat until blank lines around standalone tags have been
//! removed, the compiler then nests them into a [`Node`][super::program::Node]
//! tree.

use crate::compile::path::Path;
use crate::types::program::{Call, Param};
use crate::types::span::Span;
use crate::types::syntax::Syntax;

#[cfg_attr(internal_debug, derive(Debug))]
pub struct Template {
    pub items: Vec<Item>,
}

#[cfg_attr(internal_debug, derive(Debug))]
pub enum Item {
    Text(Span),
    Variable(crate::types::program::Variable),
    Open(Open),
    OpenInline(Inline),
    OpenPartial(Partial),
    Else(Else),
    Close(Close),
    Partial(Partial),
    Raw(Raw),
    Comment(Span),
    Delimiters(Span),
}

/// `{{# name params as |a b| }}`
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Open {
    pub call: Call,
    pub inverted: bool,
    pub block_params: Vec<String>,
    pub syntax: Syntax,
    pub span: Span,
}

/// `{{#*inline "name" }}`
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Inline {
    pub name: String,
    pub span: Span,
}

/// `{{{{ name params }}}} body {{{{/ name }}}}`
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Raw {
    pub call: Call,
    /// The text between the tags.
    pub body: Span,
    pub syntax: Syntax,
    pub span: Span,
}

/// `{{ else }}`, `{{^}}` or a chained `{{ else if cond }}`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Else {
    pub chain: Option<(Call, Vec<String>)>,
    pub syntax: Syntax,
    pub span: Span,
}

/// `{{/ name }}`
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Close {
    pub name: String,
    pub span: Span,
}

/// `{{> name context key=value }}`, also the opening tag of a partial block
/// `{{#> name }}`.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Partial {
    pub name: String,
    pub context: Option<Path>,
    pub hash: Vec<(String, Param)>,
    /// Set when the tag stands alone on its line.
    pub indent: Option<String>,
    pub span: Span,
}

impl Item {
    /// Whether this tag may stand alone on a line and be removed together
    /// with the line's whitespace.
    pub fn is_standalone_kind(&self) -> bool {
        !matches!(self, Item::Text(_) | Item::Variable(_) | Item::Raw(_))
    }
}
