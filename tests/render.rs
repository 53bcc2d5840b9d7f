mod helpers;

use std::fmt::Write;

use whisker::{value, Engine, ErrorKind, Lambda, Value};

use crate::helpers::Writer;

fn render(engine: &Engine, tmpl: &str, ctx: Value) -> String {
    engine
        .compile(tmpl)
        .unwrap()
        .render_from(engine, &ctx)
        .to_string()
        .unwrap()
}

#[test]
fn render_variable_scalars() {
    let engine = Engine::new();
    let tests = [
        (value! { ipsum: true }, "lorem true"),
        (value! { ipsum: 123_i32 }, "lorem 123"),
        (value! { ipsum: 123.4_f64 }, "lorem 123.4"),
        (value! { ipsum: "dolor" }, "lorem dolor"),
        (value! { ipsum: None }, "lorem "),
        (value! {}, "lorem "),
    ];
    for (ctx, exp) in tests {
        assert_eq!(render(&engine, "lorem {{ ipsum }}", ctx), exp);
    }
}

#[test]
fn render_variable_dotted_names() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{ ipsum.dolor }} {{ list.1 }} {{ list.length }}",
        value! { ipsum: { dolor: "sit" }, list: ["a", "b", "c"] },
    );
    assert_eq!(result, "sit b 3");
}

#[test]
fn render_variable_escaped() {
    let engine = Engine::new();
    let ctx = value! { html: "<a href=\"x\">Tom & 'Jerry'</a>" };
    assert_eq!(
        render(&engine, "{{html}}", ctx.clone()),
        "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
    );
    assert_eq!(
        render(&engine, "{{{html}}}", ctx.clone()),
        "<a href=\"x\">Tom & 'Jerry'</a>"
    );
    assert_eq!(
        render(&engine, "{{& html }}", ctx),
        "<a href=\"x\">Tom & 'Jerry'</a>"
    );
}

#[test]
fn render_variable_custom_escape() {
    let mut engine = Engine::new();
    engine.set_escape_fn(whisker::fmt::escape_none);
    assert_eq!(render(&engine, "{{x}}", value! { x: "<b>" }), "<b>");
}

#[test]
fn render_variable_custom_formatter() {
    let mut engine = Engine::new();
    engine.set_default_formatter(|f, value| match value {
        Value::List(list) => {
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                whisker::fmt::default(f, item)?;
            }
            Ok(())
        }
        value => whisker::fmt::default(f, value),
    });
    assert_eq!(
        render(&engine, "{{items}}", value! { items: [1, "<b>", true] }),
        "1, &lt;b&gt;, true"
    );
}

#[test]
fn render_variable_err_unformattable() {
    let engine = Engine::new();
    let err = engine
        .compile("lorem {{ ipsum }}")
        .unwrap()
        .render_from(&engine, &value! { ipsum: { dolor: 1 } })
        .to_string()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(
        err.to_string(),
        "expression evaluated to unformattable type map at line 1 column 7"
    );
}

#[test]
fn render_section_list() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#items}}{{.}},{{/items}}",
        value! { items: [1, 2, 3] },
    );
    assert_eq!(result, "1,2,3,");
}

#[test]
fn render_section_list_of_maps() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#users}}<{{name}}>{{/users}}",
        value! { users: [{ name: "John" }, { name: "Jane" }] },
    );
    assert_eq!(result, "<John><Jane>");
}

#[test]
fn render_section_truthiness() {
    let engine = Engine::new();
    let tmpl = "{{#x}}yes{{/x}}";
    let tests = [
        (value! { x: true }, "yes"),
        (value! { x: false }, ""),
        (value! { x: None }, ""),
        (value! {}, ""),
        (value! { x: 0 }, ""),
        (value! { x: 1 }, "yes"),
        (value! { x: "" }, ""),
        (value! { x: "a" }, "yes"),
        (value! { x: [] }, ""),
        (value! { x: {} }, "yes"),
    ];
    for (ctx, exp) in tests {
        assert_eq!(render(&engine, tmpl, ctx), exp);
    }
}

#[test]
fn render_section_map_pushes_context() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#person}}{{name}} is {{age}}{{/person}}",
        value! { person: { name: "John", age: 42 } },
    );
    assert_eq!(result, "John is 42");
}

#[test]
fn render_section_string_pushes_context() {
    let engine = Engine::new();
    let result = render(&engine, "{{#name}}Hi {{.}}{{/name}}", value! { name: "John" });
    assert_eq!(result, "Hi John");
}

#[test]
fn render_inverted_section() {
    let engine = Engine::new();
    let tmpl = "{{^items}}none{{/items}}";
    assert_eq!(render(&engine, tmpl, value! { items: [] }), "none");
    assert_eq!(render(&engine, tmpl, value! { items: [1] }), "");
    assert_eq!(render(&engine, tmpl, value! {}), "none");
}

#[test]
fn render_section_else() {
    let engine = Engine::new();
    let tmpl = "{{#a}}yes{{else}}no{{/a}}|{{#a}}yes{{^}}no{{/a}}";
    assert_eq!(render(&engine, tmpl, value! { a: true }), "yes|yes");
    assert_eq!(render(&engine, tmpl, value! { a: false }), "no|no");
}

#[test]
fn render_scope_climbing() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#person}}Hello {{first}}{{last}}{{/person}}",
        value! { first: "Brett", person: { last: "Favre" } },
    );
    assert_eq!(result, "Hello BrettFavre");
}

#[test]
fn render_scope_strict() {
    let mut engine = Engine::new();
    engine.set_parent_scope_resolution(false);
    let ctx = value! { first: "Brett", title: "Mr", person: { last: "Favre" } };
    assert_eq!(
        render(
            &engine,
            "{{#person}}Hello {{first}}{{last}}{{/person}}",
            ctx.clone()
        ),
        "Hello Favre"
    );
    assert_eq!(
        render(
            &engine,
            "{{#with person}}{{../title}} {{@root.first}} {{last}}{{/with}}",
            ctx
        ),
        "Mr Brett Favre"
    );
}

#[test]
fn render_null_stops_climbing() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#inner}}[{{name}}]{{/inner}}",
        value! { name: "outer", inner: { name: None } },
    );
    assert_eq!(result, "[]");
}

#[test]
fn render_dotted_name_climbing() {
    let engine = Engine::new();
    // The first segment is not found so the lookup climbs.
    let result = render(
        &engine,
        "{{#a}}{{b.c}}{{/a}}",
        value! { b: { c: "root" }, a: { x: 1 } },
    );
    assert_eq!(result, "root");

    // The first segment is found so the lookup stops.
    let result = render(
        &engine,
        "{{#a}}{{b.c}}{{/a}}",
        value! { b: { c: "root" }, a: { b: { d: 1 } } },
    );
    assert_eq!(result, "");
}

#[test]
fn render_parent_path() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#items}}{{../prefix}}{{name}} {{/items}}",
        value! { prefix: "#", items: [{ name: "a" }, { name: "b" }] },
    );
    assert_eq!(result, "#a #b ");
}

#[test]
fn render_this_path_does_not_climb() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{#a}}[{{this.name}}][{{./name}}][{{name}}]{{/a}}",
        value! { name: "root", a: { x: 1 } },
    );
    assert_eq!(result, "[][][root]");
}

#[test]
fn render_data_variables() {
    let engine = Engine::new();
    let result = engine
        .compile("v{{@version}} {{#items}}{{@version}}{{/items}}")
        .unwrap()
        .render_from(&engine, &value! { items: [1, 2] })
        .with_data("version", "1.0")
        .to_string()
        .unwrap();
    assert_eq!(result, "v1.0 1.01.0");
}

#[test]
fn render_variable_lambda() {
    let engine = Engine::new();
    let ctx = value! {
        name: "<world>",
        greet: Lambda::new(|_, _| Ok(Value::from("Hello {{{name}}}"))),
        answer: Lambda::new(|_, _| Ok(Value::from(42))),
    };
    assert_eq!(
        render(&engine, "{{greet}} {{answer}}", ctx),
        "Hello &lt;world&gt; 42"
    );
}

#[test]
fn render_section_lambda_receives_raw_text() {
    let engine = Engine::new();
    let ctx = value! {
        name: "world",
        wrap: Lambda::new(|_, text| Ok(Value::from(format!("<b>{text}</b>")))),
    };
    assert_eq!(
        render(&engine, "{{#wrap}}Hi {{name}}{{/wrap}}", ctx),
        "<b>Hi world</b>"
    );
}

#[test]
fn render_section_lambda_uses_section_delimiters() {
    let engine = Engine::new();
    let ctx = value! {
        name: "world",
        lambda: Lambda::new(|_, text| Ok(Value::from(format!("{text}<%name%>")))),
    };
    assert_eq!(
        render(&engine, "{{=<% %>=}}<%#lambda%>-<%/lambda%>", ctx),
        "-world"
    );
}

#[test]
fn render_lambda_error() {
    let engine = Engine::new();
    let ctx = value! {
        fail: Lambda::new(|_, _| Err(whisker::Error::custom("boom"))),
    };
    let err = engine
        .compile("{{fail}}")
        .unwrap()
        .render_from(&engine, &ctx)
        .to_string()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Helper);
    assert_eq!(err.to_string(), "boom");
}

#[test]
fn render_set_delimiters() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{=<% %>=}}<% name %> {{name}} <%={{ }}=%>{{name}}",
        value! { name: "x" },
    );
    assert_eq!(result, "x {{name}} x");
}

#[test]
fn render_comments() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "a{{! one }}b{{!-- two }} --}}c",
        value! {},
    );
    assert_eq!(result, "abc");
}

#[test]
fn render_standalone_lines() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "Begin.\n{{#flag}}\nYes\n{{/flag}}\n  {{! note }}\nEnd.",
        value! { flag: true },
    );
    assert_eq!(result, "Begin.\nYes\nEnd.");
}

#[test]
fn render_inline_tags_keep_whitespace() {
    let engine = Engine::new();
    let result = render(
        &engine,
        " {{#flag}}yes{{/flag}}\n",
        value! { flag: true },
    );
    assert_eq!(result, " yes\n");
}

#[test]
fn render_whitespace_control() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "a  \n {{~name~}} \n  b",
        value! { name: "x" },
    );
    assert_eq!(result, "axb");
}

#[test]
fn render_to_writer() {
    let engine = Engine::new();
    let mut w = Writer::new();
    engine
        .compile("lorem {{ ipsum }}")
        .unwrap()
        .render_from(&engine, &value! { ipsum: "dolor" })
        .to_writer(&mut w)
        .unwrap();
    assert_eq!(w.into_string(), "lorem dolor");
}

#[test]
fn render_to_writer_err() {
    let engine = Engine::new();
    let mut w = Writer::with_max(1);
    let err = engine
        .compile("lorem {{ ipsum }} dolor")
        .unwrap()
        .render_from(&engine, &value! { ipsum: "sit" })
        .to_writer(&mut w)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(err.to_string(), "failed to write rendered output");
}

#[test]
fn render_accessors() {
    let engine = Engine::new();
    let result = render(
        &engine,
        "{{name.length}} {{items.first}} {{items.last}} {{map.length}}",
        value! { name: "héllo", items: [1, 2, 3], map: { a: 1 } },
    );
    assert_eq!(result, "5 1 3 1");
}

#[test]
fn render_custom_resolver() {
    struct Upper;

    impl whisker::ValueResolver for Upper {
        fn resolve<'a>(&self, value: &'a Value, name: &str) -> whisker::Resolved<'a> {
            match (value, name) {
                (Value::String(s), "upper") => {
                    whisker::Resolved::Found(Value::from(s.to_uppercase()).into())
                }
                _ => whisker::Resolved::Unresolved,
            }
        }
    }

    let mut engine = Engine::new();
    engine.add_resolver(Upper);
    assert_eq!(
        render(&engine, "{{name.upper}}", value! { name: "john" }),
        "JOHN"
    );
}

#[test]
fn render_template_is_reusable() {
    let engine = Engine::new();
    let template = engine.compile("Hello {{name}}!").unwrap();
    for name in ["John", "Jane"] {
        let result = template
            .render_from(&engine, &value! { name: name })
            .to_string()
            .unwrap();
        assert_eq!(result, format!("Hello {name}!"));
    }
    assert_eq!(template.source(), "Hello {{name}}!");
    assert_eq!(template.name(), None);
}

#[cfg(feature = "serde")]
#[test]
fn render_serde_struct() {
    #[derive(serde::Serialize)]
    struct User {
        name: &'static str,
        admin: bool,
        tags: Vec<&'static str>,
    }

    let engine = Engine::new();
    let user = User {
        name: "John",
        admin: true,
        tags: vec!["a", "b"],
    };
    let result = engine
        .compile("{{name}}{{#admin}} (admin){{/admin}}:{{#tags}} {{.}}{{/tags}}")
        .unwrap()
        .render(&engine, &user)
        .to_string()
        .unwrap();
    assert_eq!(result, "John (admin): a b");
}
