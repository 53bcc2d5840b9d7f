use crate::types::span::Span;
use crate::types::syntax::Syntax;
use crate::{Error, Result};

/// A lexer that tokenizes the template source into distinct chunks so that the
/// parser doesn't have to operate on raw text.
///
/// The lexer is implemented as a fallible iterator. The parser should
/// repeatedly call the [`.next()?`][Lexer::next] method to return the next
/// non-whitespace token until [`None`] is returned.
///
/// The delimiters can change in the middle of a template, the parser must call
/// [`.set_delimiters()`][Lexer::set_delimiters] right after the end tag of a
/// `{{=<% %>=}}` tag and before asking for the next token.
#[cfg_attr(internal_debug, derive(Debug))]
pub struct Lexer<'source> {
    /// The original template source.
    pub source: &'source str,

    /// The current start delimiter, e.g. `{{`.
    start: String,

    /// The current end delimiter, e.g. `}}`.
    end: String,

    /// A cursor over the template source.
    cursor: usize,

    /// The current state of the lexer.
    state: State,

    /// Whether to left trim the next raw token.
    left_trim: bool,

    /// A buffer to store the next token.
    next: Option<(Token, Span)>,
}

/// The state of the lexer.
///
/// Tokenization differs between raw template, the inside of a tag, a comment
/// and a delimiter tag.
#[derive(Clone, Copy)]
#[cfg_attr(internal_debug, derive(Debug))]
enum State {
    /// Within raw template.
    Template,

    /// Between the delimiters of a tag.
    Tag {
        /// The span of the begin tag.
        begin: Span,
        /// Whether nothing has been lexed since the begin tag.
        fresh: bool,
        /// Whether this is a `{{{ triple }}}` tag.
        triple: bool,
        /// Set for the `{{{{raw}}}}` tags around a raw block.
        raw: Option<RawTag>,
    },

    /// After the opening tag of a raw block, up to its closing tag.
    RawBody {
        /// The span of the opening tag.
        begin: Span,
    },

    /// After the `{{` of a `{{! comment }}` or `{{!-- comment --}}`.
    Comment {
        /// The span of the begin tag.
        begin: Span,
        /// Whether this is a `{{!-- long form --}}` comment.
        long: bool,
    },

    /// After the `{{` of a `{{=<% %>=}}` tag.
    Delimiters {
        /// The span of the begin tag.
        begin: Span,
    },
}

#[derive(Clone, Copy, PartialEq, Eq)]
#[cfg_attr(internal_debug, derive(Debug))]
enum RawTag {
    Open,
    Close,
}

/// The unit yielded by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// Raw template
    Raw,
    /// Begin tag, e.g. `{{` or `{{~`
    BeginTag,
    /// End tag, e.g. `}}` or `~}}`
    EndTag,
    /// Begin tag of a raw block, e.g. `{{{{`
    BeginRaw,
    /// End tag of a raw block, e.g. `}}}}`
    EndRaw,
    /// The contents of a comment tag including the `!`
    Comment,
    /// The new delimiters in a `{{=<% %>=}}` tag
    Delimiters,
    /// `#`
    Hash,
    /// `^`
    Caret,
    /// `/`
    Slash,
    /// `>`
    Gt,
    /// `&`
    Amp,
    /// `{`
    OpenBrace,
    /// `}`
    CloseBrace,
    /// `=`
    Equals,
    /// `|`
    Pipe,
    /// Sequence of whitespace, tags may span multiple lines
    Whitespace,
    /// A path like `user.name`, `../name`, `@index` or `[odd name]`
    Path,
    /// A string literal, e.g. `"Hello World!\n"` or `'single'`.
    String,
}

impl<'source> Lexer<'source> {
    /// Construct a new lexer.
    pub fn new(source: &'source str, syntax: &Syntax) -> Self {
        Self {
            source,
            start: syntax.start.clone(),
            end: syntax.end.clone(),
            cursor: 0,
            state: State::Template,
            left_trim: false,
            next: None,
        }
    }

    /// Changes the delimiters for the rest of the template.
    pub fn set_delimiters(&mut self, start: &str, end: &str) {
        self.start = start.to_owned();
        self.end = end.to_owned();
    }

    /// Returns the current delimiters.
    pub fn syntax(&self) -> Syntax {
        Syntax {
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// Returns the next non-whitespace token and its span.
    pub fn next(&mut self) -> Result<Option<(Token, Span)>> {
        loop {
            match self.lex()? {
                Some((tk, sp)) if !tk.is_whitespace() => return Ok(Some((tk, sp))),
                None => return Ok(None),
                _ => continue,
            }
        }
    }

    /// Returns the next token and span.
    fn lex(&mut self) -> Result<Option<(Token, Span)>> {
        if let Some(next) = self.next.take() {
            return Ok(Some(next));
        }

        let i = self.cursor;

        if self.source[i..].is_empty() {
            return match self.state {
                State::Template => Ok(None),
                State::Tag { begin, .. }
                | State::Comment { begin, .. }
                | State::Delimiters { begin }
                | State::RawBody { begin } => Err(self.err_unclosed(begin)),
            };
        }

        match self.state {
            State::Template => self.lex_template(i),
            State::Tag {
                begin,
                fresh,
                triple,
                raw,
            } => self.lex_tag(begin, fresh, triple, raw, i),
            State::Comment { begin, long } => self.lex_comment(begin, long, i),
            State::Delimiters { begin } => self.lex_delimiters(begin, i),
            State::RawBody { begin } => self.lex_raw_body(begin, i),
        }
    }

    fn lex_template(&mut self, i: usize) -> Result<Option<(Token, Span)>> {
        // We are within raw template, that means all we have to do is
        // find the next begin tag from `i` and and any relevant cursor
        // indexes. The following diagram helps describe the variable
        // naming.
        //
        // xxxxxxx{{~xxxxxxxx
        //    ^   ^  ^
        //    i   j  k

        match self.source[i..].find(&*self.start).map(|d| i + d) {
            // A doubled begin tag starts one of the tags around a raw block.
            Some(j) if self.source[j + self.start.len()..].starts_with(&*self.start) => {
                let k = j + 2 * self.start.len();
                let begin = Span::from(j..k);
                let raw = match self.source[k..].starts_with('/') {
                    true => RawTag::Close,
                    false => RawTag::Open,
                };
                self.cursor = k;
                self.state = State::Tag {
                    begin,
                    fresh: true,
                    triple: false,
                    raw: Some(raw),
                };
                Ok(Some(self.begin_tag(Token::BeginRaw, begin, i, j, false)))
            }
            Some(j) => {
                let mut k = j + self.start.len();
                let trim = self.source[k..].starts_with('~');
                if trim {
                    k += 1;
                }
                let begin = Span::from(j..k);
                let rest = &self.source[k..];
                self.cursor = k;
                self.state = if rest.starts_with('!') {
                    State::Comment {
                        begin,
                        long: rest.starts_with("!--"),
                    }
                } else if rest.starts_with('=') {
                    State::Delimiters { begin }
                } else {
                    State::Tag {
                        begin,
                        fresh: true,
                        triple: false,
                        raw: None,
                    }
                };
                Ok(Some(self.begin_tag(Token::BeginTag, begin, i, j, trim)))
            }
            None => {
                let j = self.source.len();
                self.cursor = j;
                Ok(Some(self.trim_raw_token(i, j, false)))
            }
        }
    }

    /// Emits the raw template before a begin tag at `j`, or the begin tag
    /// itself if there is none.
    fn begin_tag(&mut self, tk: Token, begin: Span, i: usize, j: usize, trim: bool) -> (Token, Span) {
        if i == j {
            // The current cursor is exactly at the token.
            self.left_trim = false;
            (tk, begin)
        } else {
            // We must first emit the raw token, so we store the begin tag
            // token in the `next` buffer.
            self.next = Some((tk, begin));
            self.trim_raw_token(i, j, trim)
        }
    }

    fn trim_raw_token(&mut self, mut i: usize, mut j: usize, right_trim: bool) -> (Token, Span) {
        if right_trim {
            j = i + self.source[i..j].trim_end().len();
        }
        if self.left_trim {
            self.left_trim = false;
            let s = &self.source[i..j];
            i += s.len() - s.trim_start().len();
        }
        (Token::Raw, Span::from(i..j))
    }

    fn lex_tag(
        &mut self,
        begin: Span,
        fresh: bool,
        triple: bool,
        raw: Option<RawTag>,
        i: usize,
    ) -> Result<Option<(Token, Span)>> {
        // We are between two delimiters {{ ... }} that means we must parse
        // template syntax relevant tokens and also lookout for the end
        // delimiter.

        if let Some(tag) = raw {
            let end = self.end.repeat(2);
            if self.source[i..].starts_with(&*end) {
                let j = i + end.len();
                self.left_trim = false;
                self.state = match tag {
                    RawTag::Open => State::RawBody { begin },
                    RawTag::Close => State::Template,
                };
                self.cursor = j;
                return Ok(Some((Token::EndRaw, Span::from(i..j))));
            }
        }

        if triple && self.source[i..].starts_with('}') && self.end_at(i + 1).is_some() {
            self.state = State::Tag {
                begin,
                fresh: false,
                triple,
                raw,
            };
            self.cursor = i + 1;
            return Ok(Some((Token::CloseBrace, Span::from(i..i + 1))));
        }

        if let Some(j) = self.end_at(i) {
            // A matching end tag! Update the state and return the token.
            self.left_trim = self.source[i..].starts_with('~');
            self.state = State::Template;
            self.cursor = j;
            return Ok(Some((Token::EndTag, Span::from(i..j))));
        }

        if !fresh && self.source[i..].starts_with(&*self.start) {
            return Err(self.err_unclosed(begin));
        }

        // We iterate over chars because that is nicer than operating on raw
        // bytes. The map call here fixes the index to be relative to the
        // actual template source.
        let mut iter = self.source[i..].char_indices().map(|(d, c)| (i + d, c));

        // We've already checked that there is more text remaining.
        let c = match iter.next() {
            Some((_, c)) => c,
            None => return Err(self.err_unclosed(begin)),
        };

        let mut triple = triple;
        let (tk, j) = match c {
            // Single character to token mappings.
            '#' => (Token::Hash, i + 1),
            '^' => (Token::Caret, i + 1),
            '/' if fresh => (Token::Slash, i + 1),
            '>' => (Token::Gt, i + 1),
            '&' => (Token::Amp, i + 1),
            '=' => (Token::Equals, i + 1),
            '|' => (Token::Pipe, i + 1),
            '{' if fresh => {
                triple = true;
                (Token::OpenBrace, i + 1)
            }

            // Multi-character tokens with a distinct start character.
            '"' | '\'' => self.lex_string(iter, i, c)?,
            c if c.is_whitespace() => self.lex_whitespace(iter),
            c if is_path_start(c) => self.lex_path(i, triple),

            // Any other character...
            _ => {
                return Err(self.err_unexpected_character(i..(i + c.len_utf8())));
            }
        };

        self.state = State::Tag {
            begin,
            fresh: false,
            triple,
            raw,
        };

        // Finally, we need to update the cursor.
        self.cursor = j;

        Ok(Some((tk, Span::from(i..j))))
    }

    fn lex_comment(&mut self, begin: Span, long: bool, i: usize) -> Result<Option<(Token, Span)>> {
        // We are after the begin tag of a comment, all we have to do is find
        // the corresponding end tag. The following diagram helps describe
        // the variable naming.
        //
        // x{{!cccccc~}}xxxxxx
        //    ^      ^  ^
        //    i      m  k

        let (m, k) = if long {
            let mut from = i + 3;
            loop {
                match self.source[from..].find("--").map(|d| from + d) {
                    Some(m) => match self.end_at(m + 2) {
                        Some(k) => break (m, k),
                        None => from = m + 1,
                    },
                    None => return Err(self.err_unclosed(begin)),
                }
            }
        } else {
            match self.source[i..].find(&*self.end).map(|d| i + d) {
                Some(n) if n - 1 > i && self.source[..n].ends_with('~') => (n - 1, n + self.end.len()),
                Some(n) => (n, n + self.end.len()),
                None => return Err(self.err_unclosed(begin)),
            }
        };

        self.left_trim = self.source[m..k].contains('~');
        self.cursor = k;
        self.state = State::Template;
        self.next = Some((Token::EndTag, Span::from(m..k)));
        Ok(Some((Token::Comment, Span::from(i..m))))
    }

    fn lex_delimiters(&mut self, begin: Span, i: usize) -> Result<Option<(Token, Span)>> {
        // x{{=<% %>=}}xxxxxx
        //    ^     ^  ^
        //    i     j  k
        let mut from = i + 1;
        let j = loop {
            match self.source[from..].find('=').map(|d| from + d) {
                Some(j) if self.source[j + 1..].starts_with(&*self.end) => break j,
                Some(j) => from = j + 1,
                None => return Err(self.err_unclosed(begin)),
            }
        };
        let k = j + 1 + self.end.len();
        self.cursor = k;
        self.state = State::Template;
        self.next = Some((Token::EndTag, Span::from(j..k)));
        Ok(Some((Token::Delimiters, Span::from(i + 1..j))))
    }

    fn lex_raw_body(&mut self, begin: Span, i: usize) -> Result<Option<(Token, Span)>> {
        // Everything up to the closing tag is emitted as is.
        //
        // {{{{raw}}}}xxxxxx{{{{/raw}}}}
        //            ^     ^
        //            i     m
        let close = format!("{0}{0}/", self.start);
        let m = match self.source[i..].find(&close) {
            Some(d) => i + d,
            None => return Err(self.err_unclosed(begin)),
        };
        self.state = State::Template;
        self.cursor = m;
        if m == i {
            return self.lex_template(i);
        }
        Ok(Some((Token::Raw, Span::from(i..m))))
    }

    /// Returns the end of the end delimiter if one starts at `i`, including
    /// an optional leading `~`.
    fn end_at(&self, i: usize) -> Option<usize> {
        let rest = &self.source[i..];
        let (rest, d) = match rest.strip_prefix('~') {
            Some(rest) => (rest, 1),
            None => (rest, 0),
        };
        rest.starts_with(&*self.end)
            .then(|| i + d + self.end.len())
    }

    fn lex_string<I>(&mut self, mut iter: I, i: usize, quote: char) -> Result<(Token, usize)>
    where
        I: Iterator<Item = (usize, char)>,
    {
        let mut escaped = false;
        loop {
            match iter.next() {
                None => {
                    return Err(self.err_undelimited_string(i..self.source.len()));
                }
                Some((j, '\r' | '\n')) => {
                    return Err(self.err_undelimited_string(i..j));
                }
                Some((j, c)) if c == quote && !escaped => {
                    return Ok((Token::String, j + 1));
                }
                Some((_, c)) => {
                    escaped = c == '\\' && !escaped;
                }
            }
        }
    }

    fn lex_whitespace<I>(&mut self, iter: I) -> (Token, usize)
    where
        I: Iterator<Item = (usize, char)> + Clone,
    {
        (Token::Whitespace, self.lex_while(iter, char::is_whitespace))
    }

    /// Lexes a path, stopping at whitespace, at an end delimiter or at a
    /// character that can not be part of a path. Bracketed segments may
    /// contain anything except an unescaped `]`.
    fn lex_path(&mut self, i: usize, triple: bool) -> (Token, usize) {
        let mut iter = self.source[i..].char_indices().map(|(d, c)| (i + d, c));
        while let Some((k, c)) = iter.next() {
            if k > i && (self.end_at(k).is_some() || (triple && c == '}')) {
                return (Token::Path, k);
            }
            match c {
                '[' => {
                    let mut escaped = false;
                    for (_, c) in iter.by_ref() {
                        match c {
                            ']' if !escaped => break,
                            c => escaped = c == '\\' && !escaped,
                        }
                    }
                }
                c if is_path(c) => {}
                _ => return (Token::Path, k),
            }
        }
        (Token::Path, self.source.len())
    }

    fn lex_while<I, P>(&mut self, mut iter: I, pred: P) -> usize
    where
        I: Iterator<Item = (usize, char)> + Clone,
        P: Fn(char) -> bool,
    {
        loop {
            match iter.clone().next() {
                Some((_, c)) if pred(c) => {
                    iter.next();
                }
                Some((j, _)) => return j,
                None => return self.source.len(),
            }
        }
    }

    fn err_unclosed(&self, begin: Span) -> Error {
        Error::syntax("unclosed tag", self.source, begin)
    }

    fn err_unexpected_character(&self, span: impl Into<Span>) -> Error {
        Error::syntax("unexpected character", self.source, span)
    }

    fn err_undelimited_string(&self, span: impl Into<Span>) -> Error {
        Error::syntax("undelimited string", self.source, span)
    }
}

impl Token {
    pub fn human(&self) -> &'static str {
        match self {
            Self::Raw => "raw template",
            Self::BeginTag => "begin tag",
            Self::EndTag => "end tag",
            Self::BeginRaw => "raw begin tag",
            Self::EndRaw => "raw end tag",
            Self::Comment => "comment",
            Self::Delimiters => "delimiters",
            Self::Hash => "`#`",
            Self::Caret => "`^`",
            Self::Slash => "`/`",
            Self::Gt => "`>`",
            Self::Amp => "`&`",
            Self::OpenBrace => "`{`",
            Self::CloseBrace => "`}`",
            Self::Equals => "`=`",
            Self::Pipe => "`|`",
            Self::Whitespace => "whitespace",
            Self::Path => "path",
            Self::String => "string",
        }
    }

    fn is_whitespace(&self) -> bool {
        matches!(self, Self::Whitespace)
    }
}

fn is_path_start(c: char) -> bool {
    c == '[' || is_path(c)
}

fn is_path(c: char) -> bool {
    is_ident(c) || matches!(c, '.' | '/' | '@' | '-' | '$' | '_' | ':' | '?' | '+' | '*')
}

#[cfg(feature = "unicode")]
fn is_ident(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

#[cfg(not(feature = "unicode"))]
fn is_ident(c: char) -> bool {
    matches!(c, '0'..='9' | 'A'..='Z' | 'a'..='z' | '_')
}
