//! Defines a clone-on-write [`Value`].

use std::ops::Deref;

use crate::Value;

/// A borrowed or owned [`Value`].
///
/// Value resolvers return this so that lookups into the render data do not
/// need to clone, while computed values can still be returned.
#[derive(Debug, Clone)]
pub enum ValueCow<'a> {
    Borrowed(&'a Value),
    Owned(Value),
}

impl Deref for ValueCow<'_> {
    type Target = Value;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(v) => v,
            Self::Owned(v) => v,
        }
    }
}

impl<'a> ValueCow<'a> {
    /// Extracts the owned value, cloning if borrowed.
    pub fn into_owned(self) -> Value {
        match self {
            Self::Borrowed(v) => v.clone(),
            Self::Owned(v) => v,
        }
    }
}

impl From<Value> for ValueCow<'_> {
    fn from(value: Value) -> Self {
        Self::Owned(value)
    }
}

impl<'a> From<&'a Value> for ValueCow<'a> {
    fn from(value: &'a Value) -> Self {
        Self::Borrowed(value)
    }
}
