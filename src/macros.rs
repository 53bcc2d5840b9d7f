/// Construct a [`Value`][crate::Value] using a JSON-like literal syntax.
///
/// Map keys are identifiers or string literals. `None` is the empty value,
/// lists use `[...]` and anything else is converted using `Value::from`.
///
/// # Examples
///
/// ```
/// let value = whisker::value! {
///     user: {
///         name: "John Smith",
///         "favourite-colour": None,
///     },
///     tags: ["admin", 42, true],
/// };
/// ```
#[macro_export]
macro_rules! value {
    ($($tt:tt)*) => {
        $crate::_value!({ $($tt)* })
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! _value {
    (None) => {
        $crate::Value::None
    };

    ([]) => {
        $crate::Value::List($crate::List::new())
    };

    ([ $($tt:tt)+ ]) => {{
        let mut list = $crate::List::new();
        $crate::_value_list!(list $($tt)+);
        $crate::Value::List(list)
    }};

    ({}) => {
        $crate::Value::Map($crate::Map::new())
    };

    ({ $($tt:tt)+ }) => {{
        let mut map = $crate::Map::new();
        $crate::_value_map!(map $($tt)+);
        $crate::Value::Map(map)
    }};

    // Default to `From` implementation.
    ($other:expr) => {
        $crate::Value::from($other)
    };
}

// Munches list elements, pushing each one onto `$list`.
#[macro_export]
#[doc(hidden)]
macro_rules! _value_list {
    ($list:ident) => {};

    ($list:ident , $($rest:tt)*) => {
        $crate::_value_list!($list $($rest)*);
    };

    ($list:ident None $($rest:tt)*) => {
        $list.push($crate::Value::None);
        $crate::_value_list!($list $($rest)*);
    };

    ($list:ident [ $($inner:tt)* ] $($rest:tt)*) => {
        $list.push($crate::_value!([ $($inner)* ]));
        $crate::_value_list!($list $($rest)*);
    };

    ($list:ident { $($inner:tt)* } $($rest:tt)*) => {
        $list.push($crate::_value!({ $($inner)* }));
        $crate::_value_list!($list $($rest)*);
    };

    ($list:ident $next:expr , $($rest:tt)*) => {
        $list.push($crate::Value::from($next));
        $crate::_value_list!($list $($rest)*);
    };

    ($list:ident $last:expr) => {
        $list.push($crate::Value::from($last));
    };
}

// Munches `key: value` entries, inserting each one into `$map`.
#[macro_export]
#[doc(hidden)]
macro_rules! _value_map {
    ($map:ident) => {};

    ($map:ident , $($rest:tt)*) => {
        $crate::_value_map!($map $($rest)*);
    };

    ($map:ident $key:tt : None $($rest:tt)*) => {
        $map.insert($crate::__map_key(stringify!($key)), $crate::Value::None);
        $crate::_value_map!($map $($rest)*);
    };

    ($map:ident $key:tt : [ $($inner:tt)* ] $($rest:tt)*) => {
        $map.insert($crate::__map_key(stringify!($key)), $crate::_value!([ $($inner)* ]));
        $crate::_value_map!($map $($rest)*);
    };

    ($map:ident $key:tt : { $($inner:tt)* } $($rest:tt)*) => {
        $map.insert($crate::__map_key(stringify!($key)), $crate::_value!({ $($inner)* }));
        $crate::_value_map!($map $($rest)*);
    };

    ($map:ident $key:tt : $value:expr , $($rest:tt)*) => {
        $map.insert($crate::__map_key(stringify!($key)), $crate::Value::from($value));
        $crate::_value_map!($map $($rest)*);
    };

    ($map:ident $key:tt : $value:expr) => {
        $map.insert($crate::__map_key(stringify!($key)), $crate::Value::from($value));
    };
}
