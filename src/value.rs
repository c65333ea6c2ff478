//! Runtime values and the typed-accessor outcome.
//!
//! `Value` is the generic (tagged) representation every node can produce.
//! The typed entry points of the engine hand out raw `i64`, `bool`, big
//! integers and strings instead, and report a kind disagreement through
//! [`Narrow::Retry`] carrying the value that was actually produced.

use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::Serialize;

// ─── Kinds ─────────────────────────────────────────────────────────

/// The static kind of a raw value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Null,
    Int,
    Bool,
    Big,
    Str,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Null => "null",
            Kind::Int => "int",
            Kind::Bool => "bool",
            Kind::Big => "big",
            Kind::Str => "string",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Values ────────────────────────────────────────────────────────

/// A generic runtime value.
///
/// Heap payloads sit behind `Rc` so cloning a value out of a frame slot or
/// a literal is cheap. This also keeps trees `!Send`, which is what the
/// single-threaded execution model wants.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Int(i64),
    Bool(bool),
    Big(Rc<BigInt>),
    Str(Rc<str>),
}

impl Value {
    pub fn big(n: impl Into<BigInt>) -> Self {
        Value::Big(Rc::new(n.into()))
    }

    /// Result of big-integer arithmetic: values that fit in `i64` come
    /// back as `Int`, so a node on a big case and the generic path agree
    /// on the kind of every result.
    pub fn from_big(n: BigInt) -> Self {
        match n.to_i64() {
            Some(small) => Value::Int(small),
            None => Value::big(n),
        }
    }

    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Int(_) => Kind::Int,
            Value::Bool(_) => Kind::Bool,
            Value::Big(_) => Kind::Big,
            Value::Str(_) => Kind::Str,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Big-integer view; integers widen implicitly.
    pub fn as_big(&self) -> Option<BigInt> {
        match self {
            Value::Int(n) => Some(BigInt::from(*n)),
            Value::Big(n) => Some(n.as_ref().clone()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Big(_))
    }

    /// Rendering used in traces and the CLI: strings are quoted and big
    /// integers carry an `n` suffix, so the kind is visible.
    pub fn describe(&self) -> String {
        match self {
            Value::Str(s) => format!("{:?}", s.as_ref()),
            Value::Big(n) => format!("{}n", n),
            other => other.to_string(),
        }
    }
}

/// Numbers compare by value across the int/big split; everything else
/// compares only within its own kind.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Big(a), Value::Big(b)) => a == b,
            (Value::Int(a), Value::Big(b)) | (Value::Big(b), Value::Int(a)) => {
                b.to_i64() == Some(*a)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Big(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Unsuffixed integer literals default to `i32`.
impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::big(n)
    }
}

// ─── Typed access ──────────────────────────────────────────────────

/// Outcome of a typed accessor: the raw value, or the value that was
/// actually produced when it has a different kind.
///
/// `Retry` is routine control flow. The caller falls back to the generic
/// path with the carried value; nothing is re-evaluated.
#[derive(Clone, Debug, PartialEq)]
pub enum Narrow<T> {
    Value(T),
    Retry(Value),
}

impl<T> Narrow<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Narrow::Value(v) => Some(v),
            Narrow::Retry(_) => None,
        }
    }

    pub fn is_retry(&self) -> bool {
        matches!(self, Narrow::Retry(_))
    }
}

impl<T: Primitive> Narrow<T> {
    /// Collapse back to a generic value regardless of outcome.
    pub fn into_generic(self) -> Value {
        match self {
            Narrow::Value(v) => v.widen(),
            Narrow::Retry(v) => v,
        }
    }
}

/// A raw representation a typed entry point can produce.
pub trait Primitive: Sized {
    fn narrow(value: Value) -> Narrow<Self>;

    fn widen(self) -> Value;
}

impl Primitive for i64 {
    fn narrow(value: Value) -> Narrow<Self> {
        match value {
            Value::Int(n) => Narrow::Value(n),
            other => Narrow::Retry(other),
        }
    }

    fn widen(self) -> Value {
        Value::Int(self)
    }
}

impl Primitive for bool {
    fn narrow(value: Value) -> Narrow<Self> {
        match value {
            Value::Bool(b) => Narrow::Value(b),
            other => Narrow::Retry(other),
        }
    }

    fn widen(self) -> Value {
        Value::Bool(self)
    }
}

/// Big integers accept plain integers by widening.
impl Primitive for Rc<BigInt> {
    fn narrow(value: Value) -> Narrow<Self> {
        match value {
            Value::Big(n) => Narrow::Value(n),
            Value::Int(n) => Narrow::Value(Rc::new(BigInt::from(n))),
            other => Narrow::Retry(other),
        }
    }

    fn widen(self) -> Value {
        Value::Big(self)
    }
}

impl Primitive for Rc<str> {
    fn narrow(value: Value) -> Narrow<Self> {
        match value {
            Value::Str(s) => Narrow::Value(s),
            other => Narrow::Retry(other),
        }
    }

    fn widen(self) -> Value {
        Value::Str(self)
    }
}
