//! This module defines [`Value`], the single tagged type shared by syntax trees and
//! runtime data, together with the callable payloads ([`Lambda`] for closures and
//! macros, [`Native`] for host primitives). Helper functions such as [`val`], [`sym`]
//! and [`nil`] keep tree construction short in code and tests. Equality, truthiness
//! and display follow the contract language rather than Rust conventions: strings
//! are raw bytes, `True` is the integer 1 and `False` is the empty list.

use std::fmt;
use std::rc::Rc;

use crate::builtinops::Arity;
use crate::evaluator::{EvalResult, Frame, Scope};

/// Signature shared by every native primitive
///
/// Natives receive their arguments unevaluated plus the calling frame and decide
/// themselves which arguments to evaluate and in what order.
pub type NativeFn = dyn Fn(&[Value], &Frame<'_>) -> EvalResult;

/// A host-provided callable
#[derive(Clone)]
pub struct Native {
    name: Rc<str>,
    arity: Arity,
    func: Rc<NativeFn>,
}

impl Native {
    pub fn new<F>(name: &str, arity: Arity, func: F) -> Self
    where
        F: Fn(&[Value], &Frame<'_>) -> EvalResult + 'static,
    {
        Native {
            name: Rc::from(name),
            arity,
            func: Rc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub(crate) fn call(&self, args: &[Value], frame: &Frame<'_>) -> EvalResult {
        (self.func)(args, frame)
    }
}

/// User-defined callable: the payload of closures and macros
pub struct Lambda {
    /// Bound to the call scope's label, so `return-from NAME` reaches the call
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Value>,
    /// Defining scope; calls open a child of this scope
    pub scope: Scope,
}

/// Core value type of the contract language
///
/// To build trees, use the helper functions:
/// - `val(42)`, `val(2.5)`, `val("text")` for literals
/// - `sym("name")` for symbols, `nil()` for the empty list
/// - `val(vec![sym("+"), val(1), val(2)])` for mixed lists
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value (missing else branch, `clear`, ...)
    #[default]
    Nothing,
    Integer(i64),
    Float(f64),
    /// Byte string; contract data is not required to be UTF-8
    String(Vec<u8>),
    /// Literal list written with `'(`; evaluates to a List without running its elements
    QuasiList(Vec<Value>),
    /// Ordinary list; executed as a call when evaluated
    List(Vec<Value>),
    Native(Native),
    Macro(Rc<Lambda>),
    Closure(Rc<Lambda>),
    Symbol(String),
}

impl Value {
    pub const TRUE: Value = Value::Integer(1);
    pub const FALSE: Value = Value::List(Vec::new());

    /// Build a string value from raw bytes
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Value::String(bytes.into())
    }

    /// Truthiness: nothing, zero, empty string and empty list are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Integer(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            _ => true,
        }
    }

    /// Short name of the value's kind, used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nothing => "nothing",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::QuasiList(_) => "quasi list",
            Value::List(_) => "list",
            Value::Native(_) => "native",
            Value::Macro(_) => "macro",
            Value::Closure(_) => "closure",
            Value::Symbol(_) => "symbol",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::List(items) if items.is_empty())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        if b { Value::TRUE } else { Value::FALSE }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into_bytes())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(n as i64)
            }
        }
    };
}

impl_from_integer!(i32);
impl_from_integer!(i64);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::List(arr.into_iter().map(Into::into).collect())
    }
}

/// Helper for creating symbols
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper for creating values from Rust literals
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// The empty list, which doubles as `False`
#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn nil() -> Value {
    Value::FALSE
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => Ok(()),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{}", String::from_utf8_lossy(s)),
            Value::QuasiList(items) => {
                write!(f, "'(")?;
                write_items(f, items)?;
                write!(f, ")")
            }
            Value::List(items) => {
                write!(f, "(")?;
                write_items(f, items)?;
                write!(f, ")")
            }
            Value::Native(native) => write!(f, "#<native:{}>", native.name()),
            Value::Macro(lambda) => write!(f, "#<macro:{}>", lambda.name),
            Value::Closure(lambda) => write!(f, "#<closure:{}>", lambda.name),
            Value::Symbol(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nothing => write!(f, "Nothing"),
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Float(x) => write!(f, "Float({x:?})"),
            Value::String(s) => write!(f, "String({:?})", String::from_utf8_lossy(s)),
            Value::QuasiList(items) => write!(f, "QuasiList({items:?})"),
            Value::List(items) => write!(f, "List({items:?})"),
            Value::Native(native) => write!(f, "Native({})", native.name()),
            Value::Macro(lambda) => {
                write!(f, "Macro({}, params={:?})", lambda.name, lambda.params)
            }
            Value::Closure(lambda) => {
                write!(f, "Closure({}, params={:?})", lambda.name, lambda.params)
            }
            Value::Symbol(name) => write!(f, "Symbol({name})"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::QuasiList(a), Value::QuasiList(b)) => {
                a == b
            }
            // Closures are the same function only when they share a defining scope
            (Value::Closure(a), Value::Closure(b)) => {
                a.scope.ptr_eq(&b.scope) && a.params == b.params && a.body == b.body
            }
            (Value::Macro(a), Value::Macro(b)) => a.params == b.params && a.body == b.body,
            // Natives never compare equal, not even to themselves
            _ => false,
        }
    }
}
