//! Built-in primitive registry.
//!
//! Every primitive the contract language offers outside the ledger bindings is
//! described once here as a [`BuiltinOp`]: its identifier, its accepted argument
//! count and a plain function pointer. Interpreters copy the registry into their
//! own root scope at construction, so two interpreters never share natives.
//!
//! ## Natives control evaluation
//!
//! There is no separate notion of special form. Each primitive receives its
//! arguments unevaluated together with the calling [`Frame`] and evaluates them
//! itself, which is how `quote`, `if`, `and` and the loop forms are expressed:
//!
//! ```scheme
//! (quote (+ 1 2))       ; => (+ 1 2), never evaluated
//! (and 1 0 (raise "x")) ; => (), stops at the first false value
//! ```
//!
//! ## Families
//!
//! - `arith`: `+ - * / % mod`
//! - `compare`: `> >= < <= = == != /=`
//! - `logic`: `and or xor not` and the bitwise `log*` family
//! - `lists`: `atom eq car cdr cons list length quote eval progn each`
//! - `binding`: `define setq update defun defmacro lambda remove present context clear builtin`
//! - `flow`: `if cond block loop while until for return return-from`
//! - `conv`: `Int Float Str2List List2Str`
//! - `errors`: `raise catch error`
//! - `io`: `print println scan load`
//! - `math`: trigonometric, exponential and power functions
//!
//! Host-specific primitives (crypto, ledger) are described by [`HostOp`] tables
//! that close over shared host state when installed.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::{Native, Value};
use crate::evaluator::{EvalResult, Frame, Scope};

mod arith;
mod binding;
mod compare;
mod conv;
mod errors;
mod flow;
mod io;
mod lists;
mod logic;
mod math;

/// Accepted argument counts of a callable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive bounds
    Range(usize, usize),
    Any,
}

impl Arity {
    pub fn validate(&self, got: usize) -> Result<(), Error> {
        let ok = match *self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&got),
            Arity::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::arity_error(*self, got))
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "exactly {n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Range(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::Any => write!(f, "any number of"),
        }
    }
}

/// Signature of a common primitive
pub type BuiltinFn = fn(&[Value], &Frame<'_>) -> EvalResult;

/// Definition of a built-in operation
#[derive(Clone, Copy)]
pub struct BuiltinOp {
    /// The identifier programs call this operation by
    pub id: &'static str,
    pub func: BuiltinFn,
    /// Checked by the evaluator before `func` runs
    pub arity: Arity,
}

impl fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("id", &self.id)
            .field("arity", &self.arity)
            .finish()
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    pub fn native(&self) -> Native {
        Native::new(self.id, self.arity, self.func)
    }
}

/// Primitive that needs host state of type `C` (crypto providers, ledger context)
pub struct HostOp<C: 'static> {
    pub id: &'static str,
    pub arity: Arity,
    pub func: fn(&[Value], &Frame<'_>, &C) -> EvalResult,
}

impl<C: 'static> fmt::Debug for HostOp<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostOp")
            .field("id", &self.id)
            .field("arity", &self.arity)
            .finish()
    }
}

/// Bind every op of a host table into `scope`, each closing over `host`
pub fn install_host_ops<C: 'static>(scope: &Scope, ops: &[HostOp<C>], host: &Rc<C>) -> usize {
    for op in ops {
        let func = op.func;
        let host = Rc::clone(host);
        let native = Native::new(op.id, op.arity, move |args, frame| func(args, frame, &host));
        scope.define(op.id, Value::Native(native));
    }
    ops.len()
}

/// Global registry of all common primitives.
///
/// Family tables are concatenated once; the order only matters for listing.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    [
        arith::OPS,
        compare::OPS,
        logic::OPS,
        lists::OPS,
        binding::OPS,
        flow::OPS,
        conv::OPS,
        errors::OPS,
        io::OPS,
        math::OPS,
    ]
    .concat()
});

/// Lazy static map from id to BuiltinOp (private - use find_builtin_op)
static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.id, op)).collect()
});

/// Get all builtin operations
pub fn builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by its identifier
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(id).copied()
}

/// Populate a root scope with every common primitive
pub(crate) fn install_builtins(root: &Scope) -> usize {
    for op in builtin_ops() {
        root.define(op.id, Value::Native(op.native()));
    }
    BUILTIN_OPS.len()
}

//
// Argument helpers shared by the families
//

/// The name held by a syntactic symbol
pub(crate) fn symbol_name(expr: &Value) -> Result<&str, Error> {
    expr.as_symbol()
        .ok_or_else(|| Error::NotAName(format!("expected a symbol, got {expr}")))
}

/// Names of a parameter list such as `(a b c)`
pub(crate) fn param_names(expr: &Value) -> Result<Vec<String>, Error> {
    let items = expr
        .as_list()
        .ok_or_else(|| Error::type_error(format!("parameter list expected, got {expr}")))?;
    items
        .iter()
        .map(|item| symbol_name(item).map(str::to_owned))
        .collect()
}

/// Evaluate an argument that must produce a list
pub(crate) fn eval_list(frame: &Frame<'_>, expr: &Value, op: &str) -> EvalResult<Vec<Value>> {
    match frame.eval(expr)? {
        Value::List(items) => Ok(items),
        other => Err(Error::type_error(format!(
            "{op} expects a list, got {}",
            other.kind_name()
        ))
        .into()),
    }
}
