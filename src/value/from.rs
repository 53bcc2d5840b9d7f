//! Conversions into [`Value`], used by the `value!` macro and by
//! `Template::render_from` callers that build their data by hand.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::value::{Lambda, List, Map};
use crate::Value;

macro_rules! impl_from {
    ($($ty:ty => |$v:pat_param| $body:expr;)+) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

impl_from! {
    () => |_| Value::None;
    bool => |b| Value::Bool(b);
    u8 => |i| Value::Integer(i.into());
    u16 => |i| Value::Integer(i.into());
    u32 => |i| Value::Integer(i.into());
    i8 => |i| Value::Integer(i.into());
    i16 => |i| Value::Integer(i.into());
    i32 => |i| Value::Integer(i.into());
    i64 => |i| Value::Integer(i);
    // Saturates at `i64::MAX`.
    u64 => |i| Value::Integer(i64::try_from(i).unwrap_or(i64::MAX));
    usize => |i| Value::Integer(i64::try_from(i).unwrap_or(i64::MAX));
    f32 => |f| Value::Float(f.into());
    f64 => |f| Value::Float(f);
    char => |c| Value::String(c.to_string());
    String => |s| Value::String(s);
    &str => |s| Value::String(s.to_owned());
    Cow<'_, str> => |s| Value::String(s.into_owned());
    Lambda => |l| Value::Lambda(l);
}

fn list<I>(iter: I) -> Value
where
    I: IntoIterator,
    I::Item: Into<Value>,
{
    Value::List(iter.into_iter().map(Into::into).collect::<List<_>>())
}

fn map<I, K, V>(iter: I) -> Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    Value::Map(
        iter.into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect::<Map<_, _>>(),
    )
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(v: Vec<V>) -> Self {
        list(v)
    }
}

impl<V: Into<Value>, const N: usize> From<[V; N]> for Value {
    fn from(v: [V; N]) -> Self {
        list(v)
    }
}

impl<K: Into<String>, V: Into<Value>> From<BTreeMap<K, V>> for Value {
    fn from(m: BTreeMap<K, V>) -> Self {
        map(m)
    }
}

impl<K: Into<String>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(m: HashMap<K, V>) -> Self {
        map(m)
    }
}

impl<V: Into<Value>> From<Option<V>> for Value {
    fn from(opt: Option<V>) -> Self {
        opt.map_or(Value::None, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        list(iter)
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        map(iter)
    }
}
