//! Compiles dotted and bracketed path strings into path expressions.
//!
//! Compiled paths are cached process wide, keyed by the raw path and whether
//! parent scope climbing is enabled.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

/// A single step of a compiled path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathExpr {
    /// The current value, e.g. `this` or `.`.
    This,
    /// Climb one frame, e.g. `../`.
    Parent,
    /// A named member. When `local` is set the lookup never climbs to a
    /// parent frame.
    Property { name: String, local: bool },
    /// A list index, e.g. `items.0`. The raw token is kept so that it can
    /// also be used as a map key.
    Indexed { index: usize, raw: String },
    /// A data variable, e.g. `@index`.
    Data(String),
}

/// A compiled path.
#[derive(Clone, PartialEq, Eq)]
pub struct Path {
    raw: Arc<str>,
    exprs: Arc<[PathExpr]>,
    /// Whether the path starts with `this` or `./`.
    explicit: bool,
}

static CACHE: Lazy<RwLock<HashMap<(String, bool), Path>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Compiles a path, returning a cached copy if it was compiled before.
///
/// If `climb` is `false` then property lookups are local, they only look at
/// the current frame.
pub fn compile(raw: &str, climb: bool) -> Path {
    let key = (raw.to_owned(), climb);
    if let Ok(cache) = CACHE.read() {
        if let Some(path) = cache.get(&key) {
            return path.clone();
        }
    }
    log::trace!("compiling path `{raw}`");
    let explicit = matches!(raw, "this" | "." | "./")
        || ["this.", "this/", "./"].iter().any(|p| raw.starts_with(p));
    let path = Path {
        raw: Arc::from(raw),
        exprs: Arc::from(parse(raw, climb)),
        explicit,
    };
    if let Ok(mut cache) = CACHE.write() {
        cache.insert(key, path.clone());
    }
    path
}

impl Path {
    /// The path as written in the template.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The compiled steps.
    pub fn exprs(&self) -> &[PathExpr] {
        &self.exprs
    }

    /// Whether this path resolves within the current frame only.
    pub(crate) fn is_local(&self) -> bool {
        match self.exprs.first() {
            Some(PathExpr::Property { local, .. }) => *local,
            Some(PathExpr::This) => true,
            _ => false,
        }
    }

    /// Whether this path starts with `this` or `./` and therefore never
    /// refers to a block parameter.
    pub(crate) fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Whether this path is exactly `this`.
    pub(crate) fn is_this(&self) -> bool {
        matches!(&*self.exprs, [PathExpr::This])
    }

    /// Returns the name if this path is a single plain identifier. Only such
    /// paths can name a helper.
    pub(crate) fn as_helper_name(&self) -> Option<&str> {
        match &*self.exprs {
            [PathExpr::Property { name, .. }] => Some(name),
            _ => None,
        }
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Path").field(&self.raw).finish()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse(raw: &str, climb: bool) -> Vec<PathExpr> {
    match raw {
        "this" | "." | "./" => return vec![PathExpr::This],
        ".." => return vec![PathExpr::Parent, PathExpr::This],
        _ => {}
    }
    if let Some(rest) = raw.strip_prefix("../") {
        let mut exprs = vec![PathExpr::Parent];
        if rest.is_empty() {
            exprs.push(PathExpr::This);
        } else {
            exprs.extend(parse(rest, climb));
        }
        return exprs;
    }
    let (raw, mut local) = match raw.strip_prefix("./") {
        Some(rest) => (rest, true),
        None => (raw, !climb),
    };

    let mut exprs = Vec::new();
    let mut data = false;
    for (i, token) in tokenize(raw).into_iter().enumerate() {
        match token {
            Token::Literal(name) => {
                exprs.push(property(name, local, data));
                data = false;
            }
            Token::Bare(name) if i == 0 && name == "this" => {
                local = true;
            }
            Token::Bare("@") => {
                data = true;
            }
            Token::Bare(name) => {
                if let Some(name) = name.strip_prefix('@') {
                    exprs.push(PathExpr::Data(name.to_owned()));
                } else if data {
                    exprs.push(PathExpr::Data(name.to_owned()));
                } else if let Ok(index) = name.parse::<usize>() {
                    exprs.push(PathExpr::Indexed {
                        index,
                        raw: name.to_owned(),
                    });
                } else {
                    exprs.push(property(name.to_owned(), local, false));
                }
                data = false;
            }
        }
    }
    if exprs.is_empty() {
        exprs.push(PathExpr::This);
    }
    exprs
}

fn property(name: String, local: bool, data: bool) -> PathExpr {
    if data {
        PathExpr::Data(name)
    } else {
        PathExpr::Property { name, local }
    }
}

enum Token<'a> {
    /// A bracket-quoted segment with escapes removed.
    Literal(String),
    Bare(&'a str),
}

fn tokenize(raw: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = raw;
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix('[') {
            let (segment, len) = bracketed(inner);
            tokens.push(match segment.parse::<usize>() {
                Ok(_) => Token::Bare(&inner[..segment.len()]),
                Err(_) => Token::Literal(segment),
            });
            rest = &inner[len..];
        } else {
            let end = rest.find(['.', '/']).unwrap_or(rest.len());
            if end > 0 {
                tokens.push(Token::Bare(&rest[..end]));
            }
            rest = &rest[end..];
        }
        rest = rest.strip_prefix(['.', '/']).unwrap_or(rest);
    }
    tokens
}

/// Reads a bracket segment, `inner` starts just after the `[`. Returns the
/// unescaped segment and the number of bytes consumed, including the `]`.
fn bracketed(inner: &str) -> (String, usize) {
    let mut segment = String::new();
    let mut chars = inner.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' if inner[i + 1..].starts_with(']') => {
                segment.push(']');
                chars.next();
            }
            ']' => return (segment, i + 1),
            c => segment.push(c),
        }
    }
    (segment, inner.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(name: &str, local: bool) -> PathExpr {
        PathExpr::Property {
            name: name.to_owned(),
            local,
        }
    }

    #[test]
    fn compile_this_forms() {
        for raw in ["this", ".", "./"] {
            assert_eq!(compile(raw, true).exprs(), [PathExpr::This]);
        }
        assert_eq!(
            compile("..", true).exprs(),
            [PathExpr::Parent, PathExpr::This]
        );
    }

    #[test]
    fn compile_parent_chain() {
        assert_eq!(
            compile("../../name", true).exprs(),
            [PathExpr::Parent, PathExpr::Parent, prop("name", false)]
        );
    }

    #[test]
    fn compile_dotted_and_slashed() {
        let expected = [prop("a", false), prop("b", false)];
        assert_eq!(compile("a.b", true).exprs(), expected);
        assert_eq!(compile("a/b", true).exprs(), expected);
    }

    #[test]
    fn compile_this_prefix_is_local() {
        assert_eq!(compile("this.name", true).exprs(), [prop("name", true)]);
        assert_eq!(compile("./name", true).exprs(), [prop("name", true)]);
        assert!(compile("this.name", true).is_local());
        assert!(!compile("name", true).is_local());
    }

    #[test]
    fn compile_strict_is_local() {
        assert_eq!(compile("name", false).exprs(), [prop("name", true)]);
        assert!(compile("name", false).is_local());
    }

    #[test]
    fn compile_index() {
        assert_eq!(
            compile("items.1", true).exprs(),
            [
                prop("items", false),
                PathExpr::Indexed {
                    index: 1,
                    raw: "1".into()
                }
            ]
        );
        assert_eq!(
            compile("items.[0]", true).exprs()[1],
            PathExpr::Indexed {
                index: 0,
                raw: "0".into()
            }
        );
    }

    #[test]
    fn compile_data_variables() {
        assert_eq!(
            compile("@index", true).exprs(),
            [PathExpr::Data("index".into())]
        );
        assert_eq!(
            compile("@root.name", true).exprs(),
            [PathExpr::Data("root".into()), prop("name", false)]
        );
    }

    #[test]
    fn compile_bracket_literal() {
        assert_eq!(
            compile("[foo bar].[a.b]", true).exprs(),
            [prop("foo bar", false), prop("a.b", false)]
        );
    }

    #[test]
    fn compile_bracket_escaped_close() {
        assert_eq!(compile(r"[a\]b].c", true).exprs(), [prop("a]b", false), prop("c", false)]);
    }

    #[test]
    fn compile_is_cached_per_mode() {
        let a = compile("cached.path", true);
        let b = compile("cached.path", true);
        assert!(Arc::ptr_eq(&a.exprs, &b.exprs));
        let c = compile("cached.path", false);
        assert_ne!(a, c);
    }
}
