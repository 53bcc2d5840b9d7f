use whisker::{Engine, Error, ErrorKind};

#[track_caller]
fn compile_err(engine: &Engine, tmpl: &str) -> Error {
    engine.compile(tmpl).unwrap_err()
}

#[test]
fn compile_empty() {
    let engine = Engine::new();
    let template = engine.compile("").unwrap();
    let result = template
        .render_from(&engine, &whisker::value! {})
        .to_string()
        .unwrap();
    assert_eq!(result, "");
}

#[test]
fn compile_err_unclosed_tag() {
    let err = compile_err(&Engine::new(), "lorem {{ ipsum");
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.to_string(), "unclosed tag at line 1 column 7");
    assert_eq!(err.line_col(), Some((1, 7)));
}

#[test]
fn compile_err_unclosed_section() {
    let err = compile_err(&Engine::new(), "{{#a}}x");
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.to_string(), "unclosed section `a` at line 1 column 1");
    assert_eq!(
        format!("{err:#}"),
        "
   |
 1 | {{#a}}x
   | ^^^^^^ unclosed section `a`
"
    );
}

#[test]
fn compile_err_unclosed_section_multiline() {
    let err = compile_err(&Engine::new(), "a\nb {{#x}}\n");
    assert_eq!(err.to_string(), "unclosed section `x` at line 2 column 3");
    assert_eq!(
        format!("{err:#}"),
        "
   |
 2 | b {{#x}}
   |   ^^^^^^ unclosed section `x`
"
    );
}

#[test]
fn compile_err_mismatched_close() {
    let err = compile_err(&Engine::new(), "{{#a}}{{/b}}");
    assert_eq!(
        err.to_string(),
        "closing tag `b` does not match opening tag `a` at line 1 column 7"
    );
}

#[test]
fn compile_err_unexpected_close() {
    let err = compile_err(&Engine::new(), "lorem {{/a}}");
    assert_eq!(err.to_string(), "unexpected closing tag at line 1 column 7");
}

#[test]
fn compile_err_unexpected_else() {
    let engine = Engine::new();
    let err = compile_err(&engine, "{{else}}");
    assert_eq!(err.to_string(), "unexpected `else` tag at line 1 column 1");

    let err = compile_err(&engine, "{{#if a}}{{else}}{{else}}{{/if}}");
    assert_eq!(err.to_string(), "unexpected `else` tag at line 1 column 18");
}

#[test]
fn compile_err_unbalanced_delimiters() {
    let err = compile_err(&Engine::new(), "{{=<%% %>=}}");
    assert_eq!(err.to_string(), "unbalanced delimiters at line 1 column 4");
}

#[test]
fn compile_err_missing_helper() {
    let err = compile_err(&Engine::new(), "{{foo bar}}");
    assert_eq!(err.kind(), ErrorKind::Helper);
    assert_eq!(
        err.to_string(),
        "could not find helper: 'foo' at line 1 column 3"
    );
}

#[test]
fn compile_err_partial_literal_context() {
    let mut engine = Engine::new();
    engine.add_partial("user", "{{name}}");
    let err = compile_err(&engine, "{{> user 1}}");
    assert_eq!(
        err.to_string(),
        "expected partial context path, found literal at line 1 column 10"
    );
}

#[test]
fn compile_err_missing_partial() {
    let err = compile_err(&Engine::new(), "lorem {{> missing}}");
    assert_eq!(err.kind(), ErrorKind::Partial);
    assert_eq!(
        err.to_string(),
        "the partial 'missing' could not be found at line 1 column 7"
    );
}

#[test]
fn compile_err_recursive_partial() {
    let mut engine = Engine::new();
    engine.add_partial("p", "{{> p}}");
    let err = compile_err(&engine, "{{> p}}");
    assert_eq!(err.kind(), ErrorKind::Partial);
    assert_eq!(
        err.to_string(),
        "an infinite loop was detected, partial 'p' was loaded previously at p:1:1, \
         included from line 1 column 1"
    );
}

#[test]
fn compile_err_in_partial_is_traced() {
    let mut engine = Engine::new();
    engine.add_partial("broken", "{{#a}}");
    let err = compile_err(&engine, "x\n{{> broken}}");
    assert_eq!(err.name(), Some("broken"));
    assert_eq!(
        err.to_string(),
        "unclosed section `a` at broken:1:1, included from line 2 column 1"
    );
    assert_eq!(
        format!("{err:#}"),
        "
  --> broken:1:1
   |
 1 | {{#a}}
   | ^^^^^^ unclosed section `a`
   = included from line 2 column 1
"
    );
}

#[test]
fn compile_err_named_template() {
    let mut engine = Engine::new();
    engine.add_partial("page", "ok\n{{/a}}");
    let err = engine.compile_named("page").unwrap_err();
    assert_eq!(err.name(), Some("page"));
    assert_eq!(err.to_string(), "unexpected closing tag at page:2:1");
}
