//! The built-in helpers.
//!
//! Sections that do not name a helper dispatch to `if`, `unless`, `each`
//! and `with` implicitly, depending on the type of the resolved value.

use crate::helpers::{Options, Output};
use crate::render::Context;
use crate::value::resolve::Lookup;
use crate::value::ValueCow;
use crate::{Error, Result, Value};

/// `{{#if cond}} ... {{else}} ... {{/if}}`
///
/// With `includeZero=true` the number zero is truthy.
pub fn if_(this: &Value, options: &Options<'_>) -> Result<Output> {
    let out = match is_truthy(this, options) {
        true => options.fn_()?,
        false => options.inverse()?,
    };
    Ok(Output::Safe(out))
}

/// `{{#unless cond}} ... {{else}} ... {{/unless}}`
pub fn unless(this: &Value, options: &Options<'_>) -> Result<Output> {
    let out = match is_truthy(this, options) {
        true => options.inverse()?,
        false => options.fn_()?,
    };
    Ok(Output::Safe(out))
}

fn is_truthy(this: &Value, options: &Options<'_>) -> bool {
    let include_zero = options.hash("includeZero").map_or(false, |v| !v.is_falsy());
    match this {
        Value::Integer(0) if include_zero => true,
        Value::Float(n) if include_zero && *n == 0.0 => true,
        v => !v.is_falsy(),
    }
}

/// `{{#with value as |v|}} ... {{else}} ... {{/with}}`
pub fn with(this: &Value, options: &Options<'_>) -> Result<Output> {
    if this.is_falsy() {
        return options.inverse().map(Output::Safe);
    }
    let frame = options.context().child(ValueCow::Borrowed(this));
    options.apply(&frame, vec![this.clone()]).map(Output::Safe)
}

/// `{{#each items as |item index|}} ... {{else}} ... {{/each}}`
///
/// Lists bind `@index`, `@first`, `@last`, `@odd`, `@even` and `@index_1`
/// in each iteration. Maps bind the same plus `@key`. The hash argument
/// `base` offsets `@index`.
pub fn each(this: &Value, options: &Options<'_>) -> Result<Output> {
    let base = match options.hash("base") {
        None => 0,
        Some(Value::Integer(n)) => *n,
        Some(v) => {
            return Err(Error::custom(format!(
                "expected `base` to be an integer, found {}",
                v.human()
            )))
        }
    };
    let mut out = String::new();
    let ctx = options.context();

    if let Value::List(list) = this {
        if list.is_empty() {
            return options.inverse().map(Output::Safe);
        }
        let len = list.len();
        for (i, item) in list.iter().enumerate() {
            let mut frame = ctx.child(ValueCow::Borrowed(item));
            let index = bind_loop_data(&mut frame, i, len, base)?;
            out.push_str(&options.apply(&frame, vec![item.clone(), Value::from(index)])?);
        }
        return Ok(Output::Safe(out));
    }

    let entries = match this {
        Value::None => None,
        v => ctx.resolver().property_set(v),
    };
    match entries {
        Some(entries) if !entries.is_empty() => {
            let len = entries.len();
            for (i, (key, item)) in entries.into_iter().enumerate() {
                let block_params = vec![item.clone().into_owned(), Value::from(key.clone())];
                let mut frame = ctx.child(item);
                bind_loop_data(&mut frame, i, len, base)?;
                frame.combine("@key", key);
                out.push_str(&options.apply(&frame, block_params)?);
            }
            Ok(Output::Safe(out))
        }
        Some(_) => options.inverse().map(Output::Safe),
        None => with(this, options),
    }
}

/// Binds the iteration variables and returns `@index`.
fn bind_loop_data(frame: &mut Context<'_>, i: usize, len: usize, base: i64) -> Result<i64> {
    let (index, index_1) = i64::try_from(i)
        .ok()
        .and_then(|i| base.checked_add(i))
        .and_then(|index| Some((index, index.checked_add(1)?)))
        .ok_or_else(|| Error::custom("`base` is out of range"))?;
    frame.combine("@index", index);
    frame.combine("@index_1", index_1);
    frame.combine("@first", i == 0);
    frame.combine("@last", i + 1 == len);
    frame.combine("@odd", index % 2 != 0);
    frame.combine("@even", index % 2 == 0);
    Ok(index)
}

/// `{{lookup map key}}`
///
/// Looks up a member of a value using a dynamic key. Integer keys index
/// into lists.
pub fn lookup(this: &Value, options: &Options<'_>) -> Result<Output> {
    let key = match options.param(0) {
        Some(key) => key,
        None => return Err(Error::custom("`lookup` expects two arguments")),
    };
    let found = match (this, key) {
        (Value::List(list), Value::Integer(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| list.get(i))
            .cloned()
            .unwrap_or_default(),
        (value, Value::String(name)) => {
            match options.context().resolver().lookup(value, name) {
                Lookup::Found(v) => v.into_owned(),
                _ => Value::None,
            }
        }
        (value, Value::Integer(i)) => match options.context().resolver().lookup(value, &i.to_string()) {
            Lookup::Found(v) => v.into_owned(),
            _ => Value::None,
        },
        _ => Value::None,
    };
    Ok(Output::Value(found))
}

/// `{{log "message" value level="warn"}}`
///
/// Writes the arguments to the [`log`] facade, separated by spaces. The
/// level defaults to `info`.
pub fn log(this: &Value, options: &Options<'_>) -> Result<Output> {
    let mut parts = Vec::with_capacity(options.params().len() + 1);
    for value in std::iter::once(this).chain(options.params()) {
        parts.push(match value {
            Value::String(s) => s.clone(),
            Value::None => String::from("null"),
            Value::Bool(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            v => format!("{v:?}"),
        });
    }
    let msg = parts.join(" ");
    let level = options
        .hash("level")
        .and_then(Value::as_str)
        .unwrap_or("info");
    match level {
        "error" => log::error!("{msg}"),
        "warn" => log::warn!("{msg}"),
        "debug" => log::debug!("{msg}"),
        "trace" => log::trace!("{msg}"),
        _ => log::info!("{msg}"),
    }
    Ok(Output::empty())
}

/// `{{#partial "name"}} ... {{/partial}}`
///
/// Registers the body as an inline partial for the rest of the render.
pub fn partial(this: &Value, options: &Options<'_>) -> Result<Output> {
    match this {
        Value::String(name) => {
            options.set_partial(name.clone());
            Ok(Output::empty())
        }
        v => Err(Error::custom(format!(
            "expected partial name to be a string, found {}",
            v.human()
        ))),
    }
}

/// `{{#block "name"}} default {{/block}}`
///
/// Renders the partial named `name` if there is one, otherwise the body.
/// With `delete-after-merge=true` an inline partial is removed once it has
/// been rendered.
pub fn block(this: &Value, options: &Options<'_>) -> Result<Output> {
    let name = match this {
        Value::String(name) => name,
        v => {
            return Err(Error::custom(format!(
                "expected block name to be a string, found {}",
                v.human()
            )))
        }
    };
    let out = match options.render_partial(name)? {
        Some(out) => out,
        None => options.fn_()?,
    };
    if options
        .hash("delete-after-merge")
        .map_or(false, |v| !v.is_falsy())
    {
        options.context().shared().remove_inline(name);
    }
    Ok(Output::Safe(out))
}
