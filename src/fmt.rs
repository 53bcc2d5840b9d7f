//! Types for value formatters and escaping.
//!
//! Value formatters control how a [`Value`] is written to the rendered
//! template. The engine has a single default formatter which can be replaced
//! using [`set_default_formatter`][crate::Engine::set_default_formatter].
//! Escaping of `{{ name }}` tags happens after formatting and is configured
//! separately using [`set_escape_fn`][crate::Engine::set_escape_fn].
//!
//! This module defines a [`Formatter`] type that is similar to
//! [`std::fmt::Formatter`] so it should be a familiar API. A mutable reference
//! to this struct is passed to formatter functions and writing to it will
//! update the underlying buffer, be it a [`String`] or an arbitrary
//! [`std::io::Write`] buffer.
//!
//! # Examples
//!
//! ### Format lists
//!
//! The [`default`] formatter refuses to format lists. This formatter joins
//! them with a comma instead.
//!
//! ```
//! use std::fmt::Write;
//! use whisker::{fmt, Engine, Value};
//!
//! fn join_lists(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
//!     match value {
//!         Value::List(list) => {
//!             for (i, item) in list.iter().enumerate() {
//!                 if i > 0 {
//!                     f.write_char(',')?;
//!                 }
//!                 fmt::default(f, item)?;
//!             }
//!             Ok(())
//!         }
//!         v => fmt::default(f, v),
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! engine.set_default_formatter(join_lists);
//! ```

use std::fmt;
use std::fmt::Write;
use std::io;

use crate::Value;

/// A formatter function or closure.
pub(crate) type FormatFn = dyn Fn(&mut Formatter<'_>, &Value) -> Result + Sync + Send + 'static;

/// An escape function or closure.
pub(crate) type EscapeFn = dyn Fn(&mut Formatter<'_>, &str) -> Result + Sync + Send + 'static;

/// A [`std::fmt::Write`] façade.
pub struct Formatter<'a> {
    buf: &'a mut (dyn fmt::Write + 'a),
}

/// The result type returned from a formatter function.
pub type Result = std::result::Result<(), Error>;

/// The error type returned from a formatter function.
#[derive(Debug, Clone)]
pub struct Error(Option<String>);

pub(crate) struct Writer<W> {
    writer: W,
    err: Option<io::Error>,
}

impl<'a> Formatter<'a> {
    pub(crate) fn with_string(buf: &'a mut String) -> Self {
        Self { buf }
    }

    pub(crate) fn with_writer<W>(buf: &'a mut Writer<W>) -> Self
    where
        W: io::Write,
    {
        Self { buf }
    }
}

impl fmt::Write for Formatter<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        fmt::Write::write_str(self.buf, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> fmt::Result {
        fmt::Write::write_char(self.buf, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        fmt::Write::write_fmt(self.buf, args)
    }
}

impl Error {
    pub(crate) fn message(self) -> Option<String> {
        self.0
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(msg) => write!(f, "{msg}"),
            None => write!(f, "format error"),
        }
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Self(Some(msg.to_owned()))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Self(Some(msg))
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self(None)
    }
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(writer: W) -> Self {
        Self { writer, err: None }
    }

    pub fn take_err(&mut self) -> Option<io::Error> {
        self.err.take()
    }
}

impl<W> fmt::Write for Writer<W>
where
    W: io::Write,
{
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.writer.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }
}

/// The default value formatter.
///
/// Values are formatted as follows:
/// - [`Value::None`]: empty string
/// - [`Value::Bool`]: `true` or `false`
/// - [`Value::Integer`]: the integer formatted using [`Display`][std::fmt::Display]
/// - [`Value::Float`]: the float formatted using [`Display`][std::fmt::Display]
/// - [`Value::String`]: the string, unescaped
///
/// Errors if the value is a [`Value::List`], [`Value::Map`] or
/// [`Value::Lambda`].
#[inline]
pub fn default(f: &mut Formatter<'_>, value: &Value) -> Result {
    match value {
        Value::None => {}
        Value::Bool(b) => write!(f, "{b}")?,
        Value::Integer(n) => write!(f, "{n}")?,
        Value::Float(n) => write!(f, "{n}")?,
        Value::String(s) => write!(f, "{s}")?,
        value => {
            return Err(Error::from(format!(
                "expression evaluated to unformattable type {}",
                value.human()
            )));
        }
    }
    Ok(())
}

/// Escapes HTML special characters.
///
/// The characters `<`, `>`, `&`, `"`, `'` and `` ` `` are replaced by their
/// entities. This is the default escape function.
pub fn escape_html(f: &mut Formatter<'_>, s: &str) -> Result {
    let mut last = 0;
    for (i, c) in s.char_indices() {
        let entity = match c {
            '<' => "&lt;",
            '>' => "&gt;",
            '&' => "&amp;",
            '"' => "&quot;",
            '\'' => "&#x27;",
            '`' => "&#x60;",
            _ => continue,
        };
        f.write_str(&s[last..i])?;
        f.write_str(entity)?;
        last = i + 1;
    }
    f.write_str(&s[last..])?;
    Ok(())
}

/// An escape function that writes the text unchanged.
pub fn escape_none(f: &mut Formatter<'_>, s: &str) -> Result {
    f.write_str(s)?;
    Ok(())
}

/// Formats a value to a string using the given formatter function.
pub(crate) fn to_string(formatter: &FormatFn, value: &Value) -> std::result::Result<String, Error> {
    let mut s = String::new();
    formatter(&mut Formatter::with_string(&mut s), value)?;
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_html_all_specials() {
        let mut s = String::new();
        escape_html(&mut Formatter::with_string(&mut s), "<a href=\"x\">'&`</a>").unwrap();
        assert_eq!(
            s,
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x60;&lt;/a&gt;"
        );
    }

    #[test]
    fn escape_html_passthrough() {
        let mut s = String::new();
        escape_html(&mut Formatter::with_string(&mut s), "plain ünïcode").unwrap();
        assert_eq!(s, "plain ünïcode");
    }

    #[test]
    fn default_errors_on_map() {
        let mut s = String::new();
        let err = default(&mut Formatter::with_string(&mut s), &Value::Map(Default::default()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "expression evaluated to unformattable type map"
        );
    }
}
