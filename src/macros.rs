// ============================================================================
// ripple-reactive - Ergonomic Macros
// ============================================================================

/// Build a [`Value::Record`](crate::Value::Record) from literal entries.
///
/// Values go through `Value::from`, so scalars, strings, and nested
/// `record!`/`list!` invocations all work.
///
/// # Usage
///
/// ```rust
/// use ripple_reactive::{list, record, Value};
///
/// let user = record! {
///     "name" => "alice",
///     "age" => 30,
///     "tags" => list!["admin", "ops"],
/// };
///
/// let rec = user.as_record().unwrap();
/// assert_eq!(rec.get("name"), Some(Value::from("alice")));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::Value::Record($crate::ReactiveRecord::new())
    };
    ($($key:expr => $val:expr),+ $(,)?) => {
        $crate::Value::Record($crate::ReactiveRecord::from_entries([
            $(($key.to_string(), $crate::Value::from($val))),+
        ]))
    };
}

/// Build a [`Value::List`](crate::Value::List) from literal elements.
///
/// # Usage
///
/// ```rust
/// use ripple_reactive::{list, Value};
///
/// let items = list![1, 2, 3];
/// assert_eq!(items.as_list().unwrap().len(), 3);
/// ```
#[macro_export]
macro_rules! list {
    () => {
        $crate::Value::List($crate::ReactiveList::new())
    };
    ($($val:expr),+ $(,)?) => {
        $crate::Value::List($crate::ReactiveList::from_values(vec![
            $($crate::Value::from($val)),+
        ]))
    };
}
