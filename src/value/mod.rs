//! Defines the [`Value`] enum, representing any valid renderable data.

mod cow;
mod from;
pub(crate) mod resolve;
#[cfg(feature = "serde")]
mod ser;

pub use std::collections::btree_map;
pub use std::collections::BTreeMap as Map;
use std::fmt;
use std::mem;
use std::sync::Arc;
pub use std::vec::Vec as List;

pub use crate::value::cow::ValueCow;
#[cfg(feature = "serde")]
pub use crate::value::ser::to_value;
use crate::Result;

/// Data to be rendered represented as a recursive enum.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(List<Value>),
    Map(Map<String, Value>),
    /// A deferred computation, evaluated when a tag references it.
    Lambda(Lambda),
}

/// A function evaluated lazily during rendering.
///
/// The function receives the current context value and, when referenced by a
/// section, the unrendered text of that section. If it returns a string, the
/// string is compiled as a template and rendered in place of the tag.
/// Any other value is written out as is.
///
/// # Examples
///
/// ```
/// use whisker::{Lambda, Value};
///
/// let bold = Lambda::new(|_, text| Ok(Value::from(format!("<b>{text}</b>"))));
/// ```
#[derive(Clone)]
pub struct Lambda(Arc<LambdaFn>);

type LambdaFn = dyn Fn(&Value, &str) -> Result<Value> + Send + Sync + 'static;

impl Lambda {
    /// Wrap a function or closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &str) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, this: &Value, text: &str) -> Result<Value> {
        (self.0)(this, text)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Lambda")
    }
}

impl PartialEq for Lambda {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(s), Self::Bool(o)) => s == o,
            (Self::Integer(s), Self::Integer(o)) => s == o,
            (Self::Float(s), Self::Float(o)) => s == o,
            (Self::String(s), Self::String(o)) => s == o,
            (Self::List(s), Self::List(o)) => s == o,
            (Self::Map(s), Self::Map(o)) => s == o,
            (Self::Lambda(s), Self::Lambda(o)) => s == o,
            _ => mem::discriminant(self) == mem::discriminant(other),
        }
    }
}

impl Eq for Value {}

impl Default for Value {
    fn default() -> Self {
        Self::None
    }
}

impl Value {
    /// A human readable name for the type of this value.
    pub(crate) fn human(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Lambda(_) => "lambda",
        }
    }

    /// Whether this value is falsy.
    ///
    /// Absent values, `false`, zero, empty strings and empty lists are falsy.
    /// Everything else, including empty maps, is truthy.
    pub fn is_falsy(&self) -> bool {
        match self {
            Value::None => true,
            Value::Bool(b) => !b,
            Value::Integer(n) => *n == 0,
            Value::Float(n) => *n == 0.0,
            Value::String(s) => s.is_empty(),
            Value::List(l) => l.is_empty(),
            Value::Map(_) | Value::Lambda(_) => false,
        }
    }

    /// Returns the string if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalizes a key captured by the `value!` macro.
#[doc(hidden)]
pub fn __map_key(raw: &str) -> String {
    raw.strip_prefix('"')
        .and_then(|k| k.strip_suffix('"'))
        .unwrap_or(raw)
        .to_owned()
}
