//! Helpers are named functions invoked from a template tag.
//!
//! A helper is called when a variable or section tag names it, e.g.
//! `{{ upper name }}` or `{{#if cond}} ... {{/if}}`. It receives the first
//! argument (or the current context value if there are no arguments) and
//! an [`Options`] value that exposes the rest of the arguments and the
//! blocks of the section.
//!
//! The control flow of the engine is itself implemented as helpers, see
//! [`Engine::new`][crate::Engine::new] for the list of built-in helpers.
//!
//! # Examples
//!
//! ### Uppercase
//!
//! ```
//! use whisker::{Engine, Options, Output, Result, Value};
//!
//! let mut engine = Engine::new();
//! engine.register_helper("upper", |this: &Value, _: &Options<'_>| -> Result<Output> {
//!     Ok(this.as_str().unwrap_or_default().to_uppercase().into())
//! });
//! let result = engine
//!     .compile("{{ upper name }}")?
//!     .render(&engine, whisker::value! { name: "john" })
//!     .to_string()?;
//! assert_eq!(result, "JOHN");
//! # Ok::<(), whisker::Error>(())
//! ```
//!
//! ### Block helper
//!
//! Block helpers render their body using [`Options::fn_`].
//!
//! ```
//! use whisker::{Engine, Options, Output, Result, Value};
//!
//! let mut engine = Engine::new();
//! engine.register_helper("bold", |_: &Value, options: &Options<'_>| -> Result<Output> {
//!     Ok(Output::Safe(format!("<b>{}</b>", options.fn_()?)))
//! });
//! let result = engine
//!     .compile("{{#bold}}{{ name }}{{/bold}}")?
//!     .render(&engine, whisker::value! { name: "john" })
//!     .to_string()?;
//! assert_eq!(result, "<b>john</b>");
//! # Ok::<(), whisker::Error>(())
//! ```

pub(crate) mod builtins;
mod options;

pub use crate::helpers::options::{Options, TagType};
use crate::{Result, Value};

/// A function that can be invoked from a template tag.
///
/// This is implemented for all functions and closures with the signature
/// `Fn(&Value, &Options<'_>) -> Result<Output>`.
pub trait Helper: Send + Sync {
    /// Invokes the helper.
    ///
    /// `this` is the first positional argument of the tag or, if there is
    /// none, the current context value.
    fn call(&self, this: &Value, options: &Options<'_>) -> Result<Output>;
}

impl<F> Helper for F
where
    F: Fn(&Value, &Options<'_>) -> Result<Output> + Send + Sync,
{
    #[inline]
    fn call(&self, this: &Value, options: &Options<'_>) -> Result<Output> {
        self(this, options)
    }
}

/// The result of a helper call.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Text that is written out as is, it is never escaped.
    Safe(String),
    /// A value that is formatted and, in a `{{ name }}` tag, escaped.
    Value(Value),
}

impl Output {
    /// An empty safe string.
    pub fn empty() -> Self {
        Self::Safe(String::new())
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<String> for Output {
    fn from(s: String) -> Self {
        Self::Value(Value::String(s))
    }
}

impl From<&str> for Output {
    fn from(s: &str) -> Self {
        Self::Value(Value::from(s))
    }
}
