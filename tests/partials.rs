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
fn partial_uses_current_context() {
    let mut engine = Engine::new();
    engine.add_partial("user", "<b>{{name}}</b>");
    let result = render(
        &engine,
        "{{#users}}{{> user}}{{/users}}",
        value! { users: [{ name: "John" }, { name: "Jane" }] },
    );
    assert_eq!(result, "<b>John</b><b>Jane</b>");
}

#[test]
fn partial_quoted_name() {
    let mut engine = Engine::new();
    engine.add_partial("user card", "[{{name}}]");
    assert_eq!(
        render(&engine, "{{> \"user card\"}}", value! { name: "Ann" }),
        "[Ann]"
    );
}

#[test]
fn partial_with_context() {
    let mut engine = Engine::new();
    engine.add_partial("user", "{{name}}");
    let result = render(
        &engine,
        "{{> user person}}",
        value! { name: "root", person: { name: "Ann" } },
    );
    assert_eq!(result, "Ann");
}

#[test]
fn partial_with_hash() {
    let mut engine = Engine::new();
    engine.add_partial("user", "{{title}} {{name}}");
    let ctx = value! { name: "Who", title: "Mr" };
    assert_eq!(render(&engine, "{{> user}}", ctx.clone()), "Mr Who");
    assert_eq!(render(&engine, "{{> user title=\"Dr\"}}", ctx.clone()), "Dr Who");
    assert_eq!(
        render(&engine, "{{> user name=title title=\"Dr\"}}", ctx),
        "Dr Mr"
    );
}

#[test]
fn partial_standalone_indentation() {
    let mut engine = Engine::new();
    engine.add_partial("p", "a\nb\n");
    let result = render(&engine, "x\n  {{> p}}\ny", value! {});
    assert_eq!(result, "x\n  a\n  b\ny");
}

#[test]
fn partial_inline_is_not_indented() {
    let mut engine = Engine::new();
    engine.add_partial("p", "a\nb");
    let result = render(&engine, "x {{> p}} y", value! {});
    assert_eq!(result, "x a\nb y");
}

#[test]
fn partial_nested() {
    let mut engine = Engine::new();
    engine.add_partial("outer", "<{{> inner}}>");
    engine.add_partial("inner", "{{name}}");
    assert_eq!(
        render(&engine, "{{> outer}}", value! { name: "x" }),
        "<x>"
    );
}

#[test]
fn partial_recursive_with_infinite_loops() {
    let mut engine = Engine::new();
    engine.set_infinite_loops(true);
    engine.add_partial("p", "{{#next}}[{{> p}}]{{/next}}");
    let result = render(
        &engine,
        "{{> p}}",
        value! { next: { next: { next: None } } },
    );
    assert_eq!(result, "[[]]");
}

#[test]
fn partial_recursive_tree() {
    let mut engine = Engine::new();
    engine.set_infinite_loops(true);
    engine.add_partial("node", "{{name}}({{#children}}{{> node}}{{/children}})");
    let result = render(
        &engine,
        "{{> node}}",
        value! {
            name: "a",
            children: [
                { name: "b", children: [] },
                { name: "c", children: [{ name: "d", children: [] }] },
            ],
        },
    );
    assert_eq!(result, "a(b()c(d()))");
}

#[test]
fn partial_err_max_depth() {
    let mut engine = Engine::new();
    engine.set_infinite_loops(true);
    engine.add_partial("p", "{{> p}}");
    let template = engine.compile("{{> p}}").unwrap();

    let err = template
        .render_from(&engine, &value! {})
        .to_string()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.to_string(), "reached maximum partial depth (64) at p:1:1");

    let err = template
        .render_from(&engine, &value! {})
        .with_max_partial_depth(3)
        .to_string()
        .unwrap_err();
    assert_eq!(err.to_string(), "reached maximum partial depth (3) at p:1:1");
}

#[test]
fn partial_engine_max_depth() {
    let mut engine = Engine::new();
    engine.set_max_partial_depth(1);
    engine.add_partial("outer", "<{{> inner}}>");
    engine.add_partial("inner", "x");
    assert_eq!(render(&engine, "{{> inner}}", value! {}), "x");
    let err = engine
        .compile("{{> outer}}")
        .unwrap()
        .render_from(&engine, &value! {})
        .to_string()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "reached maximum partial depth (1) at outer:1:2"
    );
}

#[test]
fn partial_inline_overrides_engine_partial() {
    let mut engine = Engine::new();
    engine.add_partial("x", "engine");
    let result = render(
        &engine,
        "{{> x}}|{{#partial \"x\"}}inline{{/partial}}{{> x}}",
        value! {},
    );
    assert_eq!(result, "engine|inline");
}

#[test]
fn partial_inline_with_hash() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#partial \"greet\" greeting=\"Hi\"}}{{greeting}} {{name}}{{/partial}}\
         {{> greet}}, {{> greet greeting=\"Bye\"}}",
        value! { name: "John" },
    );
    assert_eq!(result, "Hi John, Bye John");
}

#[test]
fn partial_template_from_engine_is_shared() {
    let mut engine = Engine::new();
    engine.add_partial("user", "{{name}}");
    let a = engine.compile_named("user").unwrap();
    let b = engine.compile_named("user").unwrap();
    let ctx = value! { name: "x" };
    assert_eq!(a.render_from(&engine, &ctx).to_string().unwrap(), "x");
    assert_eq!(b.render_from(&engine, &ctx).to_string().unwrap(), "x");
}

#[test]
fn inline_decorator_defines_partial() {
    let engine = Engine::new();
    assert_eq!(
        render(
            &engine,
            "{{#*inline \"myPartial\"}}success{{/inline}}{{> myPartial}}",
            value! {}
        ),
        "success"
    );
    assert_eq!(
        render(
            &engine,
            "{{#*inline \"p\"}}fail{{/inline}}{{#*inline \"p\"}}success{{/inline}}{{> p}}",
            value! {}
        ),
        "success"
    );
}

#[test]
fn inline_decorator_is_scoped_to_block() {
    let engine = Engine::new();
    let ctx = value! { a: 1 };
    assert_eq!(
        render(
            &engine,
            "{{#with .}}{{#*inline \"p\"}}success{{/inline}}{{#with .}}{{> p}}{{/with}}{{/with}}",
            ctx.clone()
        ),
        "success"
    );
    assert_eq!(
        render(
            &engine,
            "{{#*inline \"p\"}}fail{{/inline}}{{#with .}}{{#*inline \"p\"}}success{{/inline}}{{> p}}{{/with}}{{> p}}",
            ctx.clone()
        ),
        "successfail"
    );
    let err = engine
        .compile("{{#with .}}{{#*inline \"p\"}}success{{/inline}}{{/with}}{{> p}}")
        .unwrap()
        .render_from(&engine, &ctx)
        .to_string()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Partial);
    assert_eq!(
        err.to_string(),
        "the partial 'p' could not be found at line 1 column 55"
    );
}

#[test]
fn inline_decorator_overrides_engine_partial() {
    let mut engine = Engine::new();
    engine.add_partial("myPartial", "fail");
    engine.add_partial("dude", "{{> myPartial}}");
    assert_eq!(
        render(
            &engine,
            "{{#*inline \"myPartial\"}}success{{/inline}}{{> myPartial}} {{> dude}}",
            value! {}
        ),
        "success success"
    );
}

#[test]
fn partial_block_renders_block_without_partial() {
    let engine = Engine::new();
    assert_eq!(
        render(&engine, "{{#> dude}}success{{/dude}}", value! {}),
        "success"
    );
    assert_eq!(
        render(
            &engine,
            "{{#> dude context}}{{value}}{{/dude}}",
            value! { context: { value: "success" } }
        ),
        "success"
    );
    assert_eq!(
        render(
            &engine,
            "{{#with context as |me|}}{{#> dude}}{{me.value}}{{/dude}}{{/with}}",
            value! { context: { value: "success" } }
        ),
        "success"
    );
}

#[test]
fn partial_block_prefers_partial() {
    let mut engine = Engine::new();
    engine.add_partial("dude", "success");
    assert_eq!(
        render(&engine, "{{#> dude}}fail{{/dude}}", value! {}),
        "success"
    );
}

#[test]
fn partial_block_rendered_by_partial() {
    let mut engine = Engine::new();
    engine.add_partial("dude", "[{{> @partial-block }}]");
    engine.add_partial("within", "{{#with context}}{{> @partial-block }}{{/with}}");
    let ctx = value! { context: { value: "success" } };
    assert_eq!(
        render(&engine, "{{#> dude}}success{{/dude}}", ctx.clone()),
        "[success]"
    );
    assert_eq!(
        render(&engine, "{{#> within}}{{value}}{{/within}}", ctx.clone()),
        "success"
    );
    assert_eq!(
        render(&engine, "{{#> within}}{{../context/value}}{{/within}}", ctx.clone()),
        "success"
    );
    assert_eq!(
        render(
            &engine,
            "{{#with context as |me|}}{{#> within}}{{me.value}}{{/within}}{{/with}}",
            ctx
        ),
        "success"
    );
}

#[test]
fn partial_block_nested_hash() {
    let mut engine = Engine::new();
    engine.add_partial("dude", "<div {{#if x}}x={{x}}{{/if}}>{{> @partial-block}}</div>");
    assert_eq!(
        render(
            &engine,
            "{{#> dude x=23}}{{#> dude x=12}}{{/dude}}{{/dude}}",
            value! {}
        ),
        "<div x=23><div x=12></div></div>"
    );
    assert_eq!(
        render(
            &engine,
            "{{#> dude x=23}}{{#> dude x=false}}{{/dude}}{{/dude}}",
            value! {}
        ),
        "<div x=23><div ></div></div>"
    );
}

#[test]
fn partial_block_forwarded_through_partials() {
    let mut engine = Engine::new();
    engine.add_partial("outer", "{{#> middle}}{{> @partial-block}}{{/middle}}");
    engine.add_partial(
        "middle",
        "A{{#> inner}}{{> @partial-block}}{{/inner}}B",
    );
    engine.add_partial("inner", "I{{> @partial-block}}I");
    assert_eq!(
        render(&engine, "C{{#> outer}}hello{{/outer}}D", value! {}),
        "CAIhelloIBD"
    );
}

#[test]
fn partial_block_defines_inline_partials() {
    let mut engine = Engine::new();
    engine.add_partial("plain", "{{> myPartial}}");
    engine.add_partial("block", "{{#> myPartial}}fail{{/myPartial}}");
    engine.add_partial("forward", "{{> @partial-block}}{{> myPartial}}");
    for name in ["plain", "block", "forward"] {
        let tmpl = format!("{{{{#> {name}}}}}{{{{#*inline \"myPartial\"}}}}success{{{{/inline}}}}{{{{/{name}}}}}");
        assert_eq!(render(&engine, &tmpl, value! {}), "success");
    }
}

#[test]
fn partial_block_err_outside_block() {
    let engine = Engine::new();
    let err = engine
        .compile("{{> @partial-block}}")
        .unwrap()
        .render_from(&engine, &value! {})
        .to_string()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Partial);
    assert_eq!(
        err.to_string(),
        "the partial '@partial-block' could not be found at line 1 column 1"
    );
}
