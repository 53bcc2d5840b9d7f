//! Removes the whitespace around tags that stand alone on their line.
//!
//! A line is standalone if it holds exactly one section, inverse, closing,
//! partial, comment or delimiter tag and otherwise only spaces and tabs. The
//! whole line including its line ending is dropped from the output and only
//! the tag remains. Standalone partials remember the indentation of their
//! line so that every line of the partial can be indented with it.

use crate::types::ast::Item;
use crate::types::span::Span;

/// Strips standalone lines from the items of a template.
pub fn strip(source: &str, items: Vec<Item>) -> Vec<Item> {
    let mut out = Vec::with_capacity(items.len());
    let mut line = Vec::new();
    for item in split_lines(source, items) {
        let eol = matches!(&item, Item::Text(span) if source[*span].ends_with('\n'));
        line.push(item);
        if eol {
            flush(source, &mut line, &mut out);
        }
    }
    flush(source, &mut line, &mut out);
    out
}

/// Splits text items so that each one ends at the latest at a newline.
fn split_lines(source: &str, items: Vec<Item>) -> Vec<Item> {
    let mut pieces = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Text(span) => {
                let mut m = span.m;
                for (i, _) in source[span].match_indices('\n') {
                    let n = span.m + i + 1;
                    pieces.push(Item::Text(Span::from(m..n)));
                    m = n;
                }
                if m < span.n {
                    pieces.push(Item::Text(Span::from(m..span.n)));
                }
            }
            item => pieces.push(item),
        }
    }
    pieces
}

fn flush(source: &str, line: &mut Vec<Item>, out: &mut Vec<Item>) {
    let mut tags = 0;
    let mut blank = true;
    for item in line.iter() {
        match item {
            Item::Text(span) => {
                blank &= source[*span]
                    .chars()
                    .all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
            }
            item if item.is_standalone_kind() => tags += 1,
            _ => blank = false,
        }
    }

    if !(blank && tags == 1) {
        out.append(line);
        return;
    }

    let mut indent = String::new();
    for item in line.drain(..) {
        match item {
            Item::Text(span) => {
                let text = &source[span];
                if !text.ends_with('\n') {
                    indent.push_str(text);
                }
            }
            Item::Partial(mut partial) => {
                partial.indent = Some(indent.clone());
                out.push(Item::Partial(partial));
            }
            item => out.push(item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::parse::Parser;
    use crate::types::syntax::Syntax;

    fn texts(source: &str) -> Vec<String> {
        let items = Parser::new(source, &Syntax::default(), true)
            .parse_template()
            .unwrap()
            .items;
        strip(source, items)
            .into_iter()
            .map(|item| match item {
                Item::Text(span) => source[span].to_owned(),
                Item::Partial(p) => format!("partial({:?})", p.indent),
                _ => String::from("tag"),
            })
            .collect()
    }

    #[test]
    fn strip_standalone_section() {
        assert_eq!(
            texts("a\n  {{#x}}\nb\n{{/x}}\n"),
            ["a\n", "tag", "b\n", "tag"]
        );
    }

    #[test]
    fn strip_keeps_inline_tags() {
        assert_eq!(texts("a {{#x}}\n"), ["a ", "tag", "\n"]);
    }

    #[test]
    fn strip_variable_line_is_not_standalone() {
        assert_eq!(texts("{{#x}}{{y}}\n"), ["tag", "tag", "\n"]);
    }

    #[test]
    fn strip_two_tags_is_not_standalone() {
        assert_eq!(texts("{{#x}}{{/x}}\n"), ["tag", "tag", "\n"]);
    }

    #[test]
    fn strip_at_eof_without_newline() {
        assert_eq!(texts("a\n  {{! note }}"), ["a\n", "tag"]);
    }

    #[test]
    fn strip_crlf() {
        assert_eq!(texts("{{#x}}\r\nb"), ["tag", "b"]);
    }

    #[test]
    fn strip_block_tags() {
        assert_eq!(
            texts("{{#> layout}}\n  {{#*inline \"p\"}}\nx\n  {{/inline}}\n{{/layout}}\n"),
            ["tag", "tag", "x\n", "tag", "tag"]
        );
        assert_eq!(texts("{{{{raw}}}}{{{{/raw}}}}\n"), ["tag", "\n"]);
    }

    #[test]
    fn strip_records_partial_indent() {
        assert_eq!(
            texts("  {{> p}}\n"),
            ["partial(Some(\"  \"))"]
        );
        assert_eq!(texts("a {{> p}}\n"), ["a ", "partial(None)", "\n"]);
    }
}
