use std::cmp::max;
use std::fmt;
use std::io;
use std::sync::Arc;

use crate::types::span::Span;

/// The kind of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The template source is malformed.
    Syntax,
    /// A template or partial could not be found by the loader.
    NotFound,
    /// A partial could not be included, e.g. it includes itself.
    Partial,
    /// A helper is missing or a helper returned an error.
    Helper,
    /// The template could not be rendered.
    Render,
    /// Writing the rendered output failed.
    Io,
    /// A value could not be converted using serde.
    Serialize,
}

/// An error that can occur during template compilation or rendering.
#[derive(Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
    /// The name of the template the error occurred in.
    name: Option<String>,
    /// The template source and the span of the offending text.
    pretty: Option<(Arc<str>, Span)>,
    /// The partial tags that led to this error, innermost first.
    trace: Vec<Inclusion>,
    reason: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
    /// Raised by user code, never located by the engine.
    custom: bool,
}

#[derive(Clone)]
struct Inclusion {
    name: Option<String>,
    line: usize,
    col: usize,
}

impl Error {
    /// Construct a new error raised by a helper.
    ///
    /// Helper errors are propagated out of the render call unchanged.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self {
            custom: true,
            ..Self::new(ErrorKind::Helper, msg)
        }
    }

    pub(crate) fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            name: None,
            pretty: None,
            trace: Vec::new(),
            reason: None,
            custom: false,
        }
    }

    /// Constructs a new syntax error.
    pub(crate) fn syntax(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::new(ErrorKind::Syntax, msg).at(source, span)
    }

    /// Constructs an error for a template the loader does not know about.
    pub(crate) fn not_found(name: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("the template `{name}` could not be found"),
        )
    }

    pub(crate) fn helper(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::new(ErrorKind::Helper, msg).at(source, span)
    }

    pub(crate) fn partial(msg: impl Into<String>, source: &str, span: impl Into<Span>) -> Self {
        Self::new(ErrorKind::Partial, msg).at(source, span)
    }

    pub(crate) fn render(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Render, msg)
    }

    pub(crate) fn max_partial_depth(max: usize) -> Self {
        Self::new(
            ErrorKind::Render,
            format!("reached maximum partial depth ({max})"),
        )
    }

    /// Converts a formatter error into a render error.
    pub(crate) fn format(err: crate::fmt::Error) -> Self {
        match err.message() {
            Some(msg) => Self::render(msg),
            None => Self::render("format error"),
        }
    }

    /// Attaches a location to the error, unless it already has one.
    pub(crate) fn at(mut self, source: &str, span: impl Into<Span>) -> Self {
        if self.pretty.is_none() && !self.custom {
            self.pretty = Some((Arc::from(source), span.into()));
        }
        self
    }

    /// Attaches the template name to the error, unless it already has one.
    pub(crate) fn with_name(mut self, name: Option<&str>) -> Self {
        if self.name.is_none() && !self.custom {
            self.name = name.map(ToOwned::to_owned);
        }
        self
    }

    /// Records the partial tag through which the failing template was
    /// reached.
    pub(crate) fn included_from(mut self, name: Option<&str>, source: &str, span: Span) -> Self {
        let (line, col) = to_line_col(source, span.m);
        self.trace.push(Inclusion {
            name: name.map(ToOwned::to_owned),
            line: line + 1,
            col: col + 1,
        });
        self
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name of the template this error occurred in, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the one-based line and column this error points at.
    pub fn line_col(&self) -> Option<(usize, usize)> {
        self.pretty.as_ref().map(|(source, span)| {
            let (line, col) = to_line_col(source, span.m);
            (line + 1, col + 1)
        })
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self {
            reason: Some(Arc::new(err)),
            ..Self::new(ErrorKind::Io, "failed to write rendered output")
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self::render("format error")
    }
}

#[cfg(feature = "serde")]
impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::new(ErrorKind::Serialize, msg.to_string())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.reason
            .as_ref()
            .map(|r| &**r as &(dyn std::error::Error + 'static))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pretty {
            Some((source, span)) => {
                fmt_pretty(&self.msg, self.name.as_deref(), source, *span, f)?;
                fmt_trace(&self.trace, f)
            }
            None => write!(f, "{:?}: {}", self.kind, self.msg),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pretty {
            Some((source, span)) if f.alternate() => {
                fmt_pretty(&self.msg, self.name.as_deref(), source, *span, f)?;
                fmt_trace(&self.trace, f)
            }
            Some((source, span)) => {
                let (line, col) = to_line_col(source, span.m);
                let (line, col) = (line + 1, col + 1);
                match &self.name {
                    Some(name) => write!(f, "{} at {name}:{line}:{col}", self.msg)?,
                    None => write!(f, "{} at line {line} column {col}", self.msg)?,
                }
                for inc in &self.trace {
                    match &inc.name {
                        Some(name) => write!(f, ", included from {name}:{}:{}", inc.line, inc.col)?,
                        None => write!(f, ", included from line {} column {}", inc.line, inc.col)?,
                    }
                }
                Ok(())
            }
            None => {
                write!(f, "{}", self.msg)?;
                if let Some(name) = &self.name {
                    write!(f, " in template `{name}`")?;
                }
                Ok(())
            }
        }
    }
}

fn fmt_pretty(
    msg: &str,
    name: Option<&str>,
    source: &str,
    span: Span,
    f: &mut fmt::Formatter<'_>,
) -> fmt::Result {
    let lines: Vec<_> = source.split_terminator('\n').collect();
    let (line, col) = to_line_col(source, span.m);
    let width = max(1, str_width(&source[span]));
    let code = lines
        .get(line)
        .or_else(|| lines.last())
        .map(|l| l.trim_end_matches('\r'))
        .unwrap_or_default();

    let num = (line + 1).to_string();
    let pad = str_width(&num);
    let pipe = "|";
    let underline = "^".repeat(width);

    if let Some(name) = name {
        write!(f, "\n {0:pad$}--> {name}:{1}:{2}", "", line + 1, col + 1)?;
    }

    write!(
        f,
        "\n \
        {0:pad$} {pipe}\n \
        {num:>} {pipe} {code}\n \
        {0:pad$} {pipe} {underline:>width$} {msg}\n",
        "",
        pad = pad,
        pipe = pipe,
        num = num,
        code = code,
        underline = underline,
        width = col + width,
        msg = msg
    )
}

fn fmt_trace(trace: &[Inclusion], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for inc in trace {
        match &inc.name {
            Some(name) => writeln!(f, "   = included from {name}:{}:{}", inc.line, inc.col)?,
            None => writeln!(f, "   = included from line {} column {}", inc.line, inc.col)?,
        }
    }
    Ok(())
}

/// Returns the zero-based line and display column of the given byte offset.
fn to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.matches('\n').count();
    let start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    (line, str_width(&source[start..offset]))
}

#[cfg(feature = "unicode")]
fn str_width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}

#[cfg(not(feature = "unicode"))]
fn str_width(s: &str) -> usize {
    s.chars().count()
}
