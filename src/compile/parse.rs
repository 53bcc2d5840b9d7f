use std::fmt::Display;

use crate::compile::lex::{Lexer, Token};
use crate::compile::path;
use crate::types::ast;
use crate::types::program::{Call, Param, Variable};
use crate::types::span::Span;
use crate::types::syntax::{is_valid_delimiter, Syntax};
use crate::{Error, Result, Value};

/// A parser that turns a token stream into a flat list of tags.
///
/// Each tag is parsed completely, sections are nested later once blank lines
/// around standalone tags have been removed. The parser sometimes needs to
/// peek at the next token to know how to proceed and uses the `peeked`
/// buffer to do this.
pub struct Parser<'source> {
    /// A lexer that tokenizes the template source.
    tokens: Lexer<'source>,

    /// Whether paths may climb to parent scopes.
    climb: bool,

    /// Remember a peeked value, even if it was `None`
    peeked: Option<Option<(Token, Span)>>,
}

/// Parameters and block parameters parsed from the inside of a tag.
struct Args {
    params: Vec<Param>,
    hash: Vec<(String, Param)>,
    block_params: Option<(Vec<String>, Span)>,
    span: Option<Span>,
}

impl<'source> Parser<'source> {
    /// Construct a new parser.
    pub fn new(source: &'source str, syntax: &Syntax, climb: bool) -> Self {
        Self {
            tokens: Lexer::new(source, syntax),
            climb,
            peeked: None,
        }
    }

    /// Parses a template into a flat list of items.
    pub fn parse_template(mut self) -> Result<ast::Template> {
        let mut items = Vec::new();
        while let Some(next) = self.next()? {
            let item = match next {
                // Simply raw template, emit a single item for it.
                (Token::Raw, span) => ast::Item::Text(span),

                // The start of a tag, e.g. `{{ user.name }}`
                (Token::BeginTag, begin) => self.parse_tag(begin)?,

                // The start of a raw block, e.g. `{{{{raw}}}}`
                (Token::BeginRaw, begin) => self.parse_raw_block(begin)?,

                (tk, span) => {
                    unreachable!("lexer bug: received token `{tk:?}` at {span:?}");
                }
            };
            items.push(item);
        }
        Ok(ast::Template { items })
    }

    /// Parses everything after the begin tag up to and including the end
    /// tag.
    fn parse_tag(&mut self, begin: Span) -> Result<ast::Item> {
        match self.parse()? {
            // A comment, e.g. `{{! ... }}`
            (Token::Comment, _) => {
                let end = self.expect(Token::EndTag)?;
                Ok(ast::Item::Comment(begin.combine(end)))
            }

            // A delimiter change, e.g. `{{=<% %>=}}`
            //
            // The new delimiters apply to the tokens following the end tag so
            // they must be set before the next token is lexed.
            (Token::Delimiters, span) => {
                let end = self.expect(Token::EndTag)?;
                let (start, stop) = self.parse_delimiters(span)?;
                self.tokens.set_delimiters(start, stop);
                Ok(ast::Item::Delimiters(begin.combine(end)))
            }

            // A section `{{# list }}`, a partial block `{{#> layout }}` or
            // an inline partial `{{#*inline "name"}}`
            (Token::Hash, _) => match self.peek()? {
                Some((Token::Gt, _)) => {
                    self.expect(Token::Gt)?;
                    self.parse_partial(begin).map(ast::Item::OpenPartial)
                }
                Some((Token::Path, span)) if self.source()[span].starts_with('*') => {
                    self.parse_decorator(begin)
                }
                _ => self.parse_open(begin, false),
            },

            // An inverted section `{{^ list }}` or an inverse marker `{{^}}`
            (Token::Caret, _) => {
                if self.is_next(Token::EndTag)? {
                    let end = self.expect(Token::EndTag)?;
                    return Ok(ast::Item::Else(ast::Else {
                        chain: None,
                        syntax: self.tokens.syntax(),
                        span: begin.combine(end),
                    }));
                }
                self.parse_open(begin, true)
            }

            // The end of a section, e.g. `{{/ list }}`
            (Token::Slash, _) => {
                let span = self.expect(Token::Path)?;
                let end = self.expect(Token::EndTag)?;
                Ok(ast::Item::Close(ast::Close {
                    name: self.source()[span].to_owned(),
                    span: begin.combine(end),
                }))
            }

            // A partial, e.g. `{{> user }}`
            (Token::Gt, _) => self.parse_partial(begin).map(ast::Item::Partial),

            // An unescaped variable, e.g. `{{& html }}`
            (Token::Amp, _) => self.parse_variable(begin, false),

            // An unescaped variable, e.g. `{{{ html }}}`
            (Token::OpenBrace, _) => {
                let name = self.expect(Token::Path)?;
                let call = self.parse_call(name, false)?.0;
                self.expect(Token::CloseBrace)?;
                let end = self.expect(Token::EndTag)?;
                Ok(ast::Item::Variable(Variable {
                    call,
                    escape: false,
                    span: begin.combine(end),
                }))
            }

            // The inverse marker `{{ else }}` or a chained `{{ else if cond }}`
            (Token::Path, span) if &self.source()[span] == "else" => {
                let syntax = self.tokens.syntax();
                if self.is_next(Token::EndTag)? {
                    let end = self.expect(Token::EndTag)?;
                    return Ok(ast::Item::Else(ast::Else {
                        chain: None,
                        syntax,
                        span: begin.combine(end),
                    }));
                }
                let name = self.expect(Token::Path)?;
                let (call, block_params) = self.parse_call(name, true)?;
                let end = self.expect(Token::EndTag)?;
                Ok(ast::Item::Else(ast::Else {
                    chain: Some((call, block_params)),
                    syntax,
                    span: begin.combine(end),
                }))
            }

            // A variable, e.g. `{{ user.name }}` or `{{ helper arg }}`
            (Token::Path, name) => {
                let call = self.parse_call(name, false)?.0;
                let end = self.expect(Token::EndTag)?;
                Ok(ast::Item::Variable(Variable {
                    call,
                    escape: true,
                    span: begin.combine(end),
                }))
            }

            (tk, span) => Err(self.err_unexpected_token("tag name", tk, span)),
        }
    }

    /// Parses a variable after its `&` marker.
    fn parse_variable(&mut self, begin: Span, escape: bool) -> Result<ast::Item> {
        let name = self.expect(Token::Path)?;
        let call = self.parse_call(name, false)?.0;
        let end = self.expect(Token::EndTag)?;
        Ok(ast::Item::Variable(Variable {
            call,
            escape,
            span: begin.combine(end),
        }))
    }

    /// Parses the opening tag of a section after its `#` or `^` marker.
    ///
    ///   # each users as |user index|
    ///
    fn parse_open(&mut self, begin: Span, inverted: bool) -> Result<ast::Item> {
        let syntax = self.tokens.syntax();
        let name = self.expect(Token::Path)?;
        let (call, block_params) = self.parse_call(name, true)?;
        let end = self.expect(Token::EndTag)?;
        Ok(ast::Item::Open(ast::Open {
            call,
            inverted,
            block_params,
            syntax,
            span: begin.combine(end),
        }))
    }

    /// Parses a decorator after the `#` marker. Only `*inline` is known.
    ///
    ///   #*inline "name"
    ///
    fn parse_decorator(&mut self, begin: Span) -> Result<ast::Item> {
        let span = self.expect(Token::Path)?;
        let decorator = &self.source()[span];
        if decorator != "*inline" {
            return Err(Error::syntax(
                format!("unknown decorator `{decorator}`"),
                self.source(),
                span,
            ));
        }
        let name = match self.parse()? {
            (Token::String, span) => self.parse_string(span)?,
            (Token::Path, span) => self.source()[span].to_owned(),
            (tk, span) => return Err(self.err_unexpected_token("partial name", tk, span)),
        };
        let end = self.expect(Token::EndTag)?;
        Ok(ast::Item::OpenInline(ast::Inline {
            name,
            span: begin.combine(end),
        }))
    }

    /// Parses a raw block after its opening `{{{{`, the body is kept as is.
    ///
    ///   {{{{raw args}}}} body {{{{/raw}}}}
    ///
    fn parse_raw_block(&mut self, begin: Span) -> Result<ast::Item> {
        let syntax = self.tokens.syntax();
        let name = self.expect(Token::Path)?;
        let call = self.parse_call(name, false)?.0;
        let open = self.expect(Token::EndRaw)?;
        let body = match self.parse()? {
            (Token::Raw, span) => {
                self.expect(Token::BeginRaw)?;
                span
            }
            (Token::BeginRaw, _) => Span::from(open.n..open.n),
            (tk, span) => return Err(self.err_unexpected_token("raw block", tk, span)),
        };
        self.expect(Token::Slash)?;
        let close = self.expect(Token::Path)?;
        let end = self.expect(Token::EndRaw)?;
        if self.source()[close] != *call.name.raw() {
            return Err(Error::syntax(
                format!(
                    "closing tag `{}` does not match opening tag `{}`",
                    &self.source()[close],
                    call.name.raw()
                ),
                self.source(),
                close,
            ));
        }
        Ok(ast::Item::Raw(ast::Raw {
            call,
            body,
            syntax,
            span: begin.combine(end),
        }))
    }

    /// Parses a partial tag after its `>` marker.
    ///
    ///   > user
    ///
    ///   > "user card" people.0 title="Mr"
    ///
    fn parse_partial(&mut self, begin: Span) -> Result<ast::Partial> {
        let name = match self.parse()? {
            (Token::Path, span) => {
                let name = &self.source()[span];
                if name.starts_with('/') {
                    return Err(Error::syntax(
                        "partial names must not start with `/`",
                        self.source(),
                        span,
                    ));
                }
                name.to_owned()
            }
            (Token::String, span) => self.parse_string(span)?,
            (tk, span) => return Err(self.err_unexpected_token("partial name", tk, span)),
        };
        let args = self.parse_args()?;
        let end = self.expect(Token::EndTag)?;
        if let Some((_, span)) = args.block_params {
            return Err(self.err_block_params(span));
        }
        let mut params = args.params.into_iter();
        let context = match params.next() {
            Some(Param::Path(path)) => Some(path),
            Some(Param::Literal(_)) => {
                return Err(Error::syntax(
                    "expected partial context path, found literal",
                    self.source(),
                    args.span.unwrap_or(begin),
                ));
            }
            None => None,
        };
        if params.next().is_some() {
            return Err(Error::syntax(
                "a partial accepts at most one context parameter",
                self.source(),
                args.span.unwrap_or(begin),
            ));
        }
        Ok(ast::Partial {
            name,
            context,
            hash: args.hash,
            indent: None,
            span: begin.combine(end),
        })
    }

    /// Parses a tag name and its arguments.
    fn parse_call(&mut self, name: Span, allow_block_params: bool) -> Result<(Call, Vec<String>)> {
        let args = self.parse_args()?;
        let block_params = match args.block_params {
            Some((_, span)) if !allow_block_params => return Err(self.err_block_params(span)),
            Some((params, _)) => params,
            None => Vec::new(),
        };
        let call = Call {
            name: path::compile(&self.source()[name], self.climb),
            params: args.params,
            hash: args.hash,
            span: args.span.map_or(name, |s| name.combine(s)),
        };
        Ok((call, block_params))
    }

    /// Parses positional parameters, `key=value` parameters and block
    /// parameters. Positional parameters must come first.
    ///
    ///   users.0 "literal" 42 key=value as |a b|
    ///
    fn parse_args(&mut self) -> Result<Args> {
        let mut params = Vec::new();
        let mut hash: Vec<(String, Param)> = Vec::new();
        let mut block_params = None;
        let mut span: Option<Span> = None;
        let mut extend = |sp: Span| {
            span = Some(span.map_or(sp, |s| s.combine(sp)));
        };
        loop {
            match self.peek()? {
                Some((Token::Path, sp)) => {
                    self.next()?;
                    extend(sp);
                    let raw = &self.source()[sp];
                    if self.is_next(Token::Equals)? {
                        self.expect(Token::Equals)?;
                        let (value, vsp) = self.parse_param()?;
                        extend(vsp);
                        hash.push((raw.to_owned(), value));
                    } else if raw == "as" && self.is_next(Token::Pipe)? {
                        let names = self.parse_block_params()?;
                        extend(names.1);
                        block_params = Some(names);
                        break;
                    } else {
                        if !hash.is_empty() {
                            return Err(self.err_out_of_order(sp));
                        }
                        params.push(self.param_from_path(sp));
                    }
                }
                Some((Token::String, sp)) => {
                    self.next()?;
                    extend(sp);
                    if !hash.is_empty() {
                        return Err(self.err_out_of_order(sp));
                    }
                    params.push(Param::Literal(Value::String(self.parse_string(sp)?)));
                }
                _ => break,
            }
        }
        Ok(Args {
            params,
            hash,
            block_params,
            span,
        })
    }

    /// Parses the value of a `key=value` parameter.
    fn parse_param(&mut self) -> Result<(Param, Span)> {
        match self.parse()? {
            (Token::Path, span) => Ok((self.param_from_path(span), span)),
            (Token::String, span) => {
                let value = Value::String(self.parse_string(span)?);
                Ok((Param::Literal(value), span))
            }
            (tk, span) => Err(self.err_unexpected_token("parameter value", tk, span)),
        }
    }

    /// Parses block parameters, the `as` has already been consumed.
    ///
    ///   |item index|
    ///
    fn parse_block_params(&mut self) -> Result<(Vec<String>, Span)> {
        let begin = self.expect(Token::Pipe)?;
        let mut names = Vec::new();
        loop {
            match self.parse()? {
                (Token::Path, span) => names.push(self.source()[span].to_owned()),
                (Token::Pipe, end) if !names.is_empty() => return Ok((names, begin.combine(end))),
                (tk, span) => return Err(self.err_unexpected_token("block parameter", tk, span)),
            }
        }
    }

    /// Interprets a path token as a literal if it looks like one.
    fn param_from_path(&self, span: Span) -> Param {
        let raw = &self.source()[span];
        let lit = match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            "null" | "undefined" => Some(Value::None),
            _ => parse_number(raw),
        };
        match lit {
            Some(value) => Param::Literal(value),
            None => Param::Path(path::compile(raw, self.climb)),
        }
    }

    /// Parses the inside of a delimiter tag, e.g. `<% %>`.
    fn parse_delimiters(&self, span: Span) -> Result<(&'source str, &'source str)> {
        let source = self.tokens.source;
        let mut parts = source[span].split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(start), Some(end), None)
                if is_valid_delimiter(start) && is_valid_delimiter(end) =>
            {
                if start.len() != end.len() {
                    return Err(Error::syntax("unbalanced delimiters", source, span));
                }
                Ok((start, end))
            }
            _ => Err(Error::syntax(
                "expected a start and end delimiter separated by whitespace",
                source,
                span,
            )),
        }
    }

    /// Parses a string and handles escape characters.
    fn parse_string(&self, span: Span) -> Result<String> {
        let raw = &self.source()[span];
        let inner = &raw[1..raw.len() - 1];
        if !inner.contains('\\') {
            return Ok(inner.to_owned());
        }
        let mut iter = inner.char_indices().map(|(i, c)| (span.m + 1 + i, c));
        let mut string = String::new();
        while let Some((i, c)) = iter.next() {
            match c {
                '\\' => {
                    let c = match iter.next() {
                        Some((_, 'n')) => '\n',
                        Some((_, 'r')) => '\r',
                        Some((_, 't')) => '\t',
                        Some((_, c @ ('\\' | '"' | '\''))) => c,
                        Some((j, c)) => {
                            return Err(Error::syntax(
                                "unknown escape character",
                                self.source(),
                                i..j + c.len_utf8(),
                            ));
                        }
                        None => '\\',
                    };
                    string.push(c);
                }
                c => string.push(c),
            }
        }
        Ok(string)
    }

    /// Parses any token.
    fn parse(&mut self) -> Result<(Token, Span)> {
        match self.next()? {
            Some((tk, sp)) => Ok((tk, sp)),
            None => Err(self.err_unexpected_eof("token")),
        }
    }

    /// Parses the specified token and returns its span.
    fn expect(&mut self, exp: Token) -> Result<Span> {
        match self.next()? {
            Some((tk, span)) if tk == exp => Ok(span),
            Some((tk, span)) => Err(self.err_unexpected_token(exp.human(), tk, span)),
            None => Err(self.err_unexpected_eof(exp.human())),
        }
    }

    /// Returns `true` if the next token is equal to the provided one.
    fn is_next(&mut self, token: Token) -> Result<bool> {
        Ok(self.peek()?.map(|(tk, _)| tk == token).unwrap_or(false))
    }

    /// Returns a copy of the next token without affecting the result of the
    /// following `.next()` call.
    fn peek(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked {
            Some(peeked) => Ok(peeked),
            None => {
                let next = self.tokens.next()?;
                self.peeked = Some(next);
                Ok(next)
            }
        }
    }

    /// Returns the next token and span in the stream.
    fn next(&mut self) -> Result<Option<(Token, Span)>> {
        match self.peeked.take() {
            Some(v) => Ok(v),
            None => self.tokens.next(),
        }
    }

    fn source(&self) -> &'source str {
        self.tokens.source
    }

    fn err_unexpected_eof(&self, exp: impl Display) -> Error {
        let n = self.source().len();
        Error::syntax(format!("expected {exp}, found EOF"), self.source(), n..n)
    }

    fn err_unexpected_token(&self, exp: impl Display, got: Token, span: Span) -> Error {
        let got = got.human();
        Error::syntax(format!("expected {exp}, found {got}"), self.source(), span)
    }

    fn err_out_of_order(&self, span: Span) -> Error {
        Error::syntax(
            "parameter is out of order, a `key=value` was found previously",
            self.source(),
            span,
        )
    }

    fn err_block_params(&self, span: Span) -> Error {
        Error::syntax(
            "block parameters are only allowed on sections",
            self.source(),
            span,
        )
    }
}

/// Parses an integer or float literal.
fn parse_number(raw: &str) -> Option<Value> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Some(Value::Integer(int));
    }
    if digits.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return raw.parse::<f64>().ok().map(Value::Float);
    }
    None
}
