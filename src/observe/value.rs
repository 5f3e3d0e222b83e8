// ============================================================================
// ripple-reactive - Value
// The dynamic data model: what the engine knows how to observe
// ============================================================================
//
// The engine works on tagged dynamic values rather than arbitrary user
// structs: every variant has defined behavior at the make_reactive boundary
// (primitive: no-op; record/list: wrap; opaque: warn and skip). Containers
// are Rc-shared handles, so aliased and cyclic graphs are expressible and
// cloning a Value clones the handle, never the data.
// ============================================================================

use std::any::Any;
use std::rc::Rc;

use super::list::ReactiveList;
use super::record::ReactiveRecord;
use crate::reactivity::equality::safe_equals_f64;

// =============================================================================
// VALUE
// =============================================================================

/// A dynamic value: scalar, observable container, or opaque payload.
#[derive(Clone)]
pub enum Value {
    /// Absent / unset
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Float scalar
    Float(f64),
    /// Immutable string scalar
    Str(Rc<str>),
    /// Keyed record container (shared handle)
    Record(ReactiveRecord),
    /// Sequence container (shared handle)
    List(ReactiveList),
    /// A payload the engine cannot intercept; observed as a unit, never
    /// walked into
    Opaque(Rc<dyn Any>),
}

impl Value {
    /// Wrap an arbitrary payload the engine cannot intercept
    pub fn opaque<T: Any>(payload: T) -> Self {
        Value::Opaque(Rc::new(payload))
    }

    /// True for the two observable container variants
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Record(_) | Value::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&ReactiveRecord> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ReactiveList> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }
}

// =============================================================================
// IDENTITY / EQUALITY
// =============================================================================

/// The write-path "did anything change" check.
///
/// Scalars compare by value, with NaN considered equal to NaN so that
/// re-storing NaN does not notify forever. Containers and opaques compare
/// by handle identity: a different record with equal contents is still a
/// different value and must notify.
pub fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => safe_equals_f64(a, b),
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Record(a), Value::Record(b)) => a.ptr_eq(b),
        (Value::List(a), Value::List(b)) => a.ptr_eq(b),
        (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        same_value(self, other)
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Record(r) => write!(f, "Record(#{})", r.dep_id()),
            Value::List(l) => write!(f, "List(#{})", l.dep_id()),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

// =============================================================================
// CONVERSIONS
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(Rc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(Rc::from(v.as_str()))
    }
}

impl From<ReactiveRecord> for Value {
    fn from(v: ReactiveRecord) -> Self {
        Value::Record(v)
    }
}

impl From<ReactiveList> for Value {
    fn from(v: ReactiveList) -> Self {
        Value::List(v)
    }
}

// =============================================================================
// TESTS
// =============================================================================
