//! The chain of frames that variable lookups are resolved against.
//!
//! Every section and partial pushes a new frame that points to its parent
//! frame. A lookup starts at the innermost frame and climbs outwards until
//! the path is found, unless the path is local or an enclosing frame
//! resolves it to an empty value.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use crate::compile::path::{Path, PathExpr};
use crate::types::program::{Node, Source};
use crate::value::resolve::{CompositeResolver, Lookup};
use crate::value::{Map, ValueCow};
use crate::Value;

/// A single frame of the render context.
///
/// Helpers receive a reference to the current frame through
/// [`Options::context`][crate::Options::context].
pub struct Context<'a> {
    model: ValueCow<'a>,
    parent: Option<&'a Context<'a>>,
    /// Values layered on top of the model, e.g. `@index` within a loop or
    /// the hash arguments of a partial.
    extended: Map<String, Value>,
    kind: Kind,
    shared: &'a Shared,
    resolver: &'a CompositeResolver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Plain,
    /// Only answers for the block parameter names it binds.
    BlockParams,
    /// Consulted only after every enclosing frame failed.
    ParentFirst,
    /// The hash arguments shadow the model.
    Partial,
}

/// State shared by every frame of a single render.
pub(crate) struct Shared {
    data: RefCell<Map<String, Value>>,
    partials: RefCell<HashMap<String, Inline>>,
    stack: RefCell<Vec<String>>,
    partial_block: RefCell<Option<Arc<PartialBlock>>>,
}

/// A partial registered while rendering with `{{#partial "name"}}` or
/// `{{#*inline "name"}}`.
#[derive(Clone)]
pub(crate) struct Inline {
    pub body: Arc<Node>,
    pub source: Source,
    pub hash: Map<String, Value>,
}

/// The block of a `{{#> name }} ... {{/ name }}` call, rendered by
/// `{{> @partial-block }}` within the partial.
pub(crate) struct PartialBlock {
    pub body: Arc<Node>,
    pub source: Source,
    /// The block that was current when this one was called.
    pub parent: Option<Arc<PartialBlock>>,
}

impl Shared {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data: RefCell::new(data),
            partials: RefCell::new(HashMap::new()),
            stack: RefCell::new(Vec::new()),
            partial_block: RefCell::new(None),
        }
    }

    pub fn data(&self, name: &str) -> Option<Value> {
        self.data.borrow().get(name).cloned()
    }

    pub fn set_data(&self, name: String, value: Value) {
        self.data.borrow_mut().insert(name, value);
    }

    pub fn inline(&self, name: &str) -> Option<Inline> {
        self.partials.borrow().get(name).cloned()
    }

    pub fn set_inline(&self, name: String, inline: Inline) {
        self.partials.borrow_mut().insert(name, inline);
    }

    pub fn remove_inline(&self, name: &str) {
        self.partials.borrow_mut().remove(name);
    }

    /// Registers an inline partial, returning the one it replaced.
    pub fn replace_inline(&self, name: String, inline: Inline) -> Option<Inline> {
        self.partials.borrow_mut().insert(name, inline)
    }

    /// Undoes [`replace_inline`][Self::replace_inline].
    pub fn restore_inline(&self, name: &str, prev: Option<Inline>) {
        match prev {
            Some(inline) => self.set_inline(name.to_owned(), inline),
            None => self.remove_inline(name),
        }
    }

    pub fn partial_block(&self) -> Option<Arc<PartialBlock>> {
        self.partial_block.borrow().clone()
    }

    /// Sets the current partial block, returning the previous one.
    pub fn replace_partial_block(
        &self,
        block: Option<Arc<PartialBlock>>,
    ) -> Option<Arc<PartialBlock>> {
        self.partial_block.replace(block)
    }

    /// The number of partials currently being rendered.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    pub fn push_partial(&self, name: &str) {
        self.stack.borrow_mut().push(name.to_owned());
    }

    pub fn pop_partial(&self) {
        self.stack.borrow_mut().pop();
    }
}

impl<'a> Context<'a> {
    pub(crate) fn root(model: ValueCow<'a>, shared: &'a Shared, resolver: &'a CompositeResolver) -> Self {
        Self {
            model,
            parent: None,
            extended: Map::new(),
            kind: Kind::Plain,
            shared,
            resolver,
        }
    }

    fn with_kind(&'a self, model: ValueCow<'a>, kind: Kind) -> Self {
        Self {
            model,
            parent: Some(self),
            extended: Map::new(),
            kind,
            shared: self.shared,
            resolver: self.resolver,
        }
    }

    /// Creates a child frame with a new model.
    pub fn child(&'a self, model: ValueCow<'a>) -> Self {
        self.with_kind(model, Kind::Plain)
    }

    /// Creates a frame that binds the given block parameters and otherwise
    /// defers to this frame.
    pub fn block_params(&'a self, params: Map<String, Value>) -> Self {
        let mut frame = self.with_kind(ValueCow::Owned(Value::None), Kind::BlockParams);
        frame.extended = params;
        frame
    }

    /// Creates a child frame that is searched after all of its ancestors.
    pub fn parent_first(&'a self, model: ValueCow<'a>) -> Self {
        self.with_kind(model, Kind::ParentFirst)
    }

    /// Creates a frame for a partial invoked with hash arguments.
    pub fn partial(&'a self, model: ValueCow<'a>, hash: Map<String, Value>) -> Self {
        let mut frame = self.with_kind(model, Kind::Partial);
        frame.extended = hash;
        frame
    }

    /// Layers a value on top of the model of this frame.
    pub fn combine(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.extended.insert(name.into(), value.into());
    }

    /// The current value, i.e. what `this` refers to.
    pub fn this(&self) -> &Value {
        &self.this_frame().model
    }

    /// The root value passed to the render call.
    pub fn root_value(&self) -> &Value {
        let mut frame = self;
        while let Some(parent) = frame.parent {
            frame = parent;
        }
        &frame.model
    }

    pub(crate) fn shared(&self) -> &'a Shared {
        self.shared
    }

    pub(crate) fn resolver(&self) -> &'a CompositeResolver {
        self.resolver
    }

    /// Whether `name` is bound as a block parameter in this frame or an
    /// enclosing one.
    pub(crate) fn has_block_param(&self, name: &str) -> bool {
        self.frames()
            .any(|f| f.kind == Kind::BlockParams && f.extended.contains_key(name))
    }

    fn frames(&self) -> impl Iterator<Item = &Context<'a>> {
        std::iter::successors(Some(self), |f| f.parent)
    }

    /// The innermost frame that has a model of its own.
    fn this_frame(&self) -> &Context<'a> {
        let mut frame = self;
        while frame.kind == Kind::BlockParams {
            match frame.parent {
                Some(parent) => frame = parent,
                None => break,
            }
        }
        frame
    }

    /// Looks up a path, returning `None` if it is absent or resolves to an
    /// empty value.
    pub fn lookup(&self, path: &Path) -> Option<ValueCow<'_>> {
        match self.lookup_impl(path) {
            Lookup::Found(v) => Some(v),
            Lookup::Null | Lookup::Missing => None,
        }
    }

    fn lookup_impl(&self, path: &Path) -> Lookup<'_> {
        let exprs = path.exprs();
        match exprs {
            [PathExpr::This] => Lookup::Found(ValueCow::Borrowed(self.this())),

            [PathExpr::Parent, ..] => {
                let mut frame = self.this_frame();
                let mut rest = exprs;
                while let [PathExpr::Parent, tail @ ..] = rest {
                    frame = match frame.parent {
                        Some(parent) => parent.this_frame(),
                        None => return Lookup::Missing,
                    };
                    rest = tail;
                }
                match rest {
                    [PathExpr::This] => Lookup::Found(ValueCow::Borrowed(&frame.model)),
                    _ => frame.lookup_frame(rest),
                }
            }

            [PathExpr::Data(name), rest @ ..] if name == "root" => {
                self.steps(ValueCow::Borrowed(self.root_value()), rest)
            }

            [PathExpr::Data(name), rest @ ..] => {
                let key = format!("@{name}");
                for frame in self.frames() {
                    if let Some(v) = frame.extended.get(&key) {
                        return self.steps(ValueCow::Borrowed(v), rest);
                    }
                }
                match self.shared.data(name) {
                    Some(v) => self.steps(ValueCow::Owned(v), rest),
                    None => Lookup::Missing,
                }
            }

            [PathExpr::Property { name, .. }, rest @ ..] => {
                if !path.is_explicit() {
                    for frame in self.frames() {
                        if frame.kind != Kind::BlockParams {
                            continue;
                        }
                        if let Some(v) = frame.extended.get(name) {
                            return self.steps(ValueCow::Borrowed(v), rest);
                        }
                    }
                }
                if path.is_local() {
                    return match self.this_frame().lookup_frame(exprs) {
                        Lookup::Missing => self.lookup_shared(exprs),
                        result => result,
                    };
                }
                self.climb(exprs)
            }

            _ => self.this_frame().lookup_frame(exprs),
        }
    }

    /// Climbs the frame chain. Frames created with
    /// [`parent_first`][Self::parent_first] are deferred until the chain is
    /// exhausted.
    fn climb(&self, exprs: &[PathExpr]) -> Lookup<'_> {
        let mut deferred = Vec::new();
        for (i, frame) in self.frames().filter(|f| f.kind != Kind::BlockParams).enumerate() {
            if frame.kind == Kind::ParentFirst {
                deferred.push(frame);
                continue;
            }
            match frame.lookup_frame(exprs) {
                Lookup::Missing => {}
                result => return result,
            }
            if i == 0 {
                match self.lookup_shared(exprs) {
                    Lookup::Missing => {}
                    result => return result,
                }
            }
        }
        for frame in deferred {
            match frame.lookup_frame(exprs) {
                Lookup::Missing => {}
                result => return result,
            }
        }
        self.lookup_shared(exprs)
    }

    fn lookup_shared(&self, exprs: &[PathExpr]) -> Lookup<'_> {
        match exprs {
            [PathExpr::Property { name, .. }, rest @ ..] => match self.shared.data(name) {
                Some(v) => self.steps(ValueCow::Owned(v), rest),
                None => Lookup::Missing,
            },
            _ => Lookup::Missing,
        }
    }

    /// Looks up the path in this frame only.
    fn lookup_frame(&self, exprs: &[PathExpr]) -> Lookup<'_> {
        let hash_first = self.kind == Kind::Partial;
        let first = match hash_first {
            true => self.lookup_extended(exprs),
            false => self.steps(ValueCow::Borrowed(&self.model), exprs),
        };
        match first {
            Lookup::Missing if hash_first => self.steps(ValueCow::Borrowed(&self.model), exprs),
            Lookup::Missing => self.lookup_extended(exprs),
            result => result,
        }
    }

    fn lookup_extended(&self, exprs: &[PathExpr]) -> Lookup<'_> {
        match exprs {
            [PathExpr::Property { name, .. }, rest @ ..] => match self.extended.get(name) {
                Some(v) => self.steps(ValueCow::Borrowed(v), rest),
                None => Lookup::Missing,
            },
            _ => Lookup::Missing,
        }
    }

    /// Evaluates the remaining path steps starting at `start`.
    ///
    /// A failed intermediate step makes the whole path missing. A failed
    /// final step under a value that was found is empty, which stops the
    /// lookup from climbing any further.
    fn steps<'s>(&'s self, start: ValueCow<'s>, exprs: &[PathExpr]) -> Lookup<'s> {
        if exprs.is_empty() {
            return match *start {
                Value::None => Lookup::Null,
                _ => Lookup::Found(start),
            };
        }
        let mut cursor = start;
        let last = exprs.len() - 1;
        for (i, expr) in exprs.iter().enumerate() {
            let next = match &cursor {
                ValueCow::Borrowed(v) => step(self.resolver, *v, expr),
                ValueCow::Owned(v) => step(self.resolver, v, expr).into_owned(),
            };
            cursor = match next {
                Lookup::Found(v) => v,
                Lookup::Null if i == 0 && last == 0 => return Lookup::Null,
                _ if i == last && i > 0 => return Lookup::Null,
                _ => return Lookup::Missing,
            };
        }
        Lookup::Found(cursor)
    }
}

fn step<'v>(resolver: &CompositeResolver, value: &'v Value, expr: &PathExpr) -> Lookup<'v> {
    match (expr, value) {
        (PathExpr::This, _) => Lookup::Found(ValueCow::Borrowed(value)),
        (PathExpr::Property { name, .. }, _) => resolver.lookup(value, name),
        (PathExpr::Indexed { index, .. }, Value::List(list)) => match list.get(*index) {
            Some(Value::None) => Lookup::Null,
            Some(v) => Lookup::Found(ValueCow::Borrowed(v)),
            None => Lookup::Missing,
        },
        (PathExpr::Indexed { raw, .. }, _) => resolver.lookup(value, raw),
        (PathExpr::Data(name), _) => resolver.lookup(value, &format!("@{name}")),
        (PathExpr::Parent, _) => Lookup::Missing,
    }
}
