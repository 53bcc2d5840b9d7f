//! Value resolvers look up named members of a [`Value`].
//!
//! The engine never inspects render data directly. Each path step asks the
//! resolver chain for a member and the first resolver that knows how to
//! answer wins. Custom resolvers can be added to the engine using
//! [`Engine::add_resolver`][crate::Engine::add_resolver].

use std::borrow::Cow;

use crate::value::ValueCow;
use crate::Value;

/// The result of asking a single resolver for a member.
#[derive(Debug)]
pub enum Resolved<'a> {
    /// The member was found. This may be [`Value::None`] if the member
    /// exists but is empty.
    Found(ValueCow<'a>),
    /// This resolver does not know how to look up the member.
    Unresolved,
}

/// A strategy for resolving members of a value.
///
/// # Examples
///
/// Expose the length of strings as `chars`.
///
/// ```
/// use whisker::{Resolved, Value, ValueResolver};
///
/// struct CharCount;
///
/// impl ValueResolver for CharCount {
///     fn resolve<'a>(&self, value: &'a Value, name: &str) -> Resolved<'a> {
///         match (value, name) {
///             (Value::String(s), "chars") => {
///                 Resolved::Found(Value::from(s.chars().count()).into())
///             }
///             _ => Resolved::Unresolved,
///         }
///     }
/// }
/// ```
pub trait ValueResolver: Send + Sync {
    /// Resolve the member `name` of `value`.
    fn resolve<'a>(&self, value: &'a Value, name: &str) -> Resolved<'a>;

    /// Returns the named members of `value` in iteration order, or `None` if
    /// this resolver cannot enumerate the value.
    fn property_set<'a>(&self, value: &'a Value) -> Option<Vec<(Cow<'a, str>, ValueCow<'a>)>> {
        let _ = value;
        None
    }
}

/// Resolves map entries by key.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapResolver;

/// Resolves computed accessors.
///
/// - `length` of a string (in characters), list or map.
/// - `first` and `last` of a list.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessorResolver;

impl ValueResolver for MapResolver {
    fn resolve<'a>(&self, value: &'a Value, name: &str) -> Resolved<'a> {
        match value {
            Value::Map(map) => match map.get(name) {
                Some(v) => Resolved::Found(ValueCow::Borrowed(v)),
                None => Resolved::Unresolved,
            },
            _ => Resolved::Unresolved,
        }
    }

    fn property_set<'a>(&self, value: &'a Value) -> Option<Vec<(Cow<'a, str>, ValueCow<'a>)>> {
        match value {
            Value::Map(map) => Some(
                map.iter()
                    .map(|(k, v)| (Cow::Borrowed(k.as_str()), ValueCow::Borrowed(v)))
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl ValueResolver for AccessorResolver {
    fn resolve<'a>(&self, value: &'a Value, name: &str) -> Resolved<'a> {
        match (value, name) {
            (Value::String(s), "length") => Resolved::Found(Value::from(s.chars().count()).into()),
            (Value::List(l), "length") => Resolved::Found(Value::from(l.len()).into()),
            (Value::Map(m), "length") => Resolved::Found(Value::from(m.len()).into()),
            (Value::List(l), "first") => Resolved::Found(found_or_none(l.first())),
            (Value::List(l), "last") => Resolved::Found(found_or_none(l.last())),
            _ => Resolved::Unresolved,
        }
    }
}

fn found_or_none(v: Option<&Value>) -> ValueCow<'_> {
    match v {
        Some(v) => ValueCow::Borrowed(v),
        None => ValueCow::Owned(Value::None),
    }
}

/// The outcome of a chain lookup.
#[cfg_attr(internal_debug, derive(Debug))]
pub(crate) enum Lookup<'a> {
    /// A non-empty value.
    Found(ValueCow<'a>),
    /// The member was resolved but is empty. Scope climbing stops here.
    Null,
    /// No resolver could answer. Scope climbing may continue.
    Missing,
}

impl<'a> Lookup<'a> {
    /// Detaches the result from the borrowed input.
    pub fn into_owned<'b>(self) -> Lookup<'b> {
        match self {
            Lookup::Found(v) => Lookup::Found(ValueCow::Owned(v.into_owned())),
            Lookup::Null => Lookup::Null,
            Lookup::Missing => Lookup::Missing,
        }
    }
}

/// An ordered chain of resolvers.
pub(crate) struct CompositeResolver {
    resolvers: Vec<Box<dyn ValueResolver>>,
}

impl Default for CompositeResolver {
    fn default() -> Self {
        Self {
            resolvers: vec![Box::new(MapResolver), Box::new(AccessorResolver)],
        }
    }
}

impl CompositeResolver {
    pub fn new(resolvers: Vec<Box<dyn ValueResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn push(&mut self, resolver: Box<dyn ValueResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn lookup<'a>(&self, value: &'a Value, name: &str) -> Lookup<'a> {
        for resolver in &self.resolvers {
            if let Resolved::Found(v) = resolver.resolve(value, name) {
                return match *v {
                    Value::None => Lookup::Null,
                    _ => Lookup::Found(v),
                };
            }
        }
        Lookup::Missing
    }

    pub fn property_set<'a>(&self, value: &'a Value) -> Option<Vec<(Cow<'a, str>, ValueCow<'a>)>> {
        self.resolvers.iter().find_map(|r| r.property_set(value))
    }
}
