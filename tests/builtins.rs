use whisker::{value, Engine, ErrorKind, Value};

fn render(engine: &Engine, tmpl: &str, ctx: Value) -> String {
    engine
        .compile(tmpl)
        .unwrap()
        .render_from(engine, &ctx)
        .to_string()
        .unwrap()
}

#[test]
fn builtin_if() {
    let engine = Engine::new();
    let tmpl = "{{#if a}}A{{else}}B{{/if}}";
    assert_eq!(render(&engine, tmpl, value! { a: true }), "A");
    assert_eq!(render(&engine, tmpl, value! { a: "x" }), "A");
    assert_eq!(render(&engine, tmpl, value! { a: [] }), "B");
    assert_eq!(render(&engine, tmpl, value! {}), "B");
}

#[test]
fn builtin_if_include_zero() {
    let engine = Engine::new();
    assert_eq!(
        render(&engine, "{{#if n}}yes{{else}}no{{/if}}", value! { n: 0 }),
        "no"
    );
    assert_eq!(
        render(
            &engine,
            "{{#if n includeZero=true}}yes{{else}}no{{/if}}",
            value! { n: 0 }
        ),
        "yes"
    );
}

#[test]
fn builtin_if_does_not_push_context() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#if user}}{{user.name}}{{/if}}",
        value! { user: { name: "John" } },
    );
    assert_eq!(result, "John");
}

#[test]
fn builtin_else_if_chain() {
    let engine = Engine::new();
    let tmpl = "{{#if a}}A{{else if b}}B{{else}}C{{/if}}";
    assert_eq!(render(&engine, tmpl, value! { a: true, b: true }), "A");
    assert_eq!(render(&engine, tmpl, value! { a: false, b: true }), "B");
    assert_eq!(render(&engine, tmpl, value! { a: false, b: false }), "C");
}

#[test]
fn builtin_unless() {
    let engine = Engine::new();
    let tmpl = "{{#unless flag}}off{{else}}on{{/unless}}";
    assert_eq!(render(&engine, tmpl, value! { flag: false }), "off");
    assert_eq!(render(&engine, tmpl, value! { flag: true }), "on");
}

#[test]
fn builtin_with() {
    let engine = Engine::new();
    let ctx = value! { person: { first: "John", last: "Smith" } };
    assert_eq!(
        render(&engine, "{{#with person}}{{first}} {{last}}{{/with}}", ctx.clone()),
        "John Smith"
    );
    assert_eq!(
        render(&engine, "{{#with person as |p|}}{{p.first}}{{/with}}", ctx),
        "John"
    );
    assert_eq!(
        render(&engine, "{{#with missing}}x{{else}}none{{/with}}", value! {}),
        "none"
    );
}

#[test]
fn builtin_each_list() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items}}{{@index}}:{{this}} {{/each}}",
        value! { items: ["a", "b", "c"] },
    );
    assert_eq!(result, "0:a 1:b 2:c ");
}

#[test]
fn builtin_each_first_last() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items}}{{#if @first}}[{{/if}}{{this}}{{#if @last}}]{{else}},{{/if}}{{/each}}",
        value! { items: ["a", "b", "c"] },
    );
    assert_eq!(result, "[a,b,c]");
}

#[test]
fn builtin_each_odd_even() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items}}{{#if @even}}e{{/if}}{{#if @odd}}o{{/if}}{{@index_1}}{{/each}}",
        value! { items: [1, 2, 3] },
    );
    assert_eq!(result, "e1o2e3");
}

#[test]
fn builtin_each_base() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items base=10}}{{@index}} {{/each}}",
        value! { items: ["a", "b"] },
    );
    assert_eq!(result, "10 11 ");
}

#[test]
fn builtin_each_block_params() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items as |item i|}}{{i}}={{item}};{{/each}}",
        value! { items: ["a", "b"] },
    );
    assert_eq!(result, "0=a;1=b;");
}

#[test]
fn builtin_each_nested_block_params() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each rows as |row|}}{{#each row.cells as |cell|}}{{row.id}}{{cell}} {{/each}}{{/each}}",
        value! { rows: [{ id: "a", cells: [1, 2] }, { id: "b", cells: [3] }] },
    );
    assert_eq!(result, "a1 a2 b3 ");
}

#[test]
fn builtin_each_map() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each map}}{{@key}}={{this}},{{/each}}",
        value! { map: { a: 1, b: 2 } },
    );
    assert_eq!(result, "a=1,b=2,");

    let result = render(
        &engine,
        "{{#each map as |value key|}}{{key}}:{{value}} {{/each}}",
        value! { map: { a: 1, b: 2 } },
    );
    assert_eq!(result, "a:1 b:2 ");
}

#[test]
fn builtin_each_empty_renders_else() {
    let engine = Engine::new();
    let tmpl = "{{#each items}}x{{else}}empty{{/each}}";
    assert_eq!(render(&engine, tmpl, value! { items: [] }), "empty");
    assert_eq!(render(&engine, tmpl, value! { items: {} }), "empty");
    assert_eq!(render(&engine, tmpl, value! {}), "empty");
}

#[test]
fn builtin_each_parent_access() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items}}{{../sep}}{{this}}{{/each}}",
        value! { sep: "-", items: [1, 2] },
    );
    assert_eq!(result, "-1-2");
}

#[test]
fn builtin_each_err_bad_base() {
    let engine = Engine::new();
    let err = engine
        .compile("{{#each items base=\"x\"}}{{/each}}")
        .unwrap()
        .render_from(&engine, &value! { items: [1] })
        .to_string()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Helper);
    assert_eq!(
        err.to_string(),
        "expected `base` to be an integer, found string"
    );
}

#[test]
fn builtin_each_base_near_max() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each items base=9223372036854775806}}{{@index}}{{/each}}",
        value! { items: [1] },
    );
    assert_eq!(result, "9223372036854775806");

    for tmpl in [
        "{{#each items base=9223372036854775807}}{{@index}}{{/each}}",
        "{{#each items base=9223372036854775806}}{{@index}}{{/each}}",
    ] {
        let err = engine
            .compile(tmpl)
            .unwrap()
            .render_from(&engine, &value! { items: [1, 2] })
            .to_string()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Helper);
        assert_eq!(err.to_string(), "`base` is out of range");
    }
}

#[test]
fn builtin_lookup() {
    let engine = Engine::new();
    let ctx = value! { map: { a: "x", b: "y" }, key: "b", items: ["p", "q"] };
    assert_eq!(
        render(&engine, "{{lookup map key}} {{lookup map \"a\"}} {{lookup items 1}}", ctx),
        "y x q"
    );
}

#[test]
fn builtin_lookup_in_each() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#each keys}}{{lookup ../names this}} {{/each}}",
        value! { keys: ["a", "b"], names: { a: "Ann", b: "Bob" } },
    );
    assert_eq!(result, "Ann Bob ");
}

#[test]
fn builtin_log_renders_nothing() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "a{{log \"hello\" name level=\"warn\"}}b",
        value! { name: "John" },
    );
    assert_eq!(result, "ab");
}

#[test]
fn builtin_inline_partial() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#partial \"greet\"}}Hi {{name}}{{/partial}}{{> greet}}",
        value! { name: "John" },
    );
    assert_eq!(result, "Hi John");
}

#[test]
fn builtin_block_uses_inline_partial() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#partial \"content\"}}Custom{{/partial}}<{{#block \"content\"}}Default{{/block}}>",
        value! {},
    );
    assert_eq!(result, "<Custom>");
}

#[test]
fn builtin_block_default() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "<{{#block \"content\"}}Default {{name}}{{/block}}>",
        value! { name: "body" },
    );
    assert_eq!(result, "<Default body>");
}

#[test]
fn builtin_block_uses_engine_partial() {
    let mut engine = Engine::new();
    engine.add_partial("content", "From {{name}}");
    let result = render(
        &engine,
        "<{{#block \"content\"}}Default{{/block}}>",
        value! { name: "engine" },
    );
    assert_eq!(result, "<From engine>");
}

#[test]
fn builtin_layout_with_inline_partials() {
    let mut engine = Engine::new();
    engine.add_partial(
        "layout",
        "<h1>{{#block \"title\"}}Untitled{{/block}}</h1><p>{{#block \"body\"}}{{/block}}</p>",
    );
    let result = render(
        &engine,
        "{{#partial \"body\"}}Hello {{name}}{{/partial}}{{> layout}}",
        value! { name: "John" },
    );
    assert_eq!(result, "<h1>Untitled</h1><p>Hello John</p>");
}
