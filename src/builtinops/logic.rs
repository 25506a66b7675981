//! Logical and bitwise primitives.
//!
//! `and`/`or` short-circuit on truthiness and yield the deciding value. The `log*`
//! family folds integer operands only.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp};
use crate::evaluator::{EvalResult, Frame};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "and",
        func: builtin_and,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "or",
        func: builtin_or,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "xor",
        func: builtin_xor,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "not",
        func: builtin_not,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "logand",
        func: builtin_logand,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "logior",
        func: builtin_logior,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "logxor",
        func: builtin_logxor,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "lognor",
        func: builtin_lognor,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "logeqv",
        func: builtin_logeqv,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "lognot",
        func: builtin_lognot,
        arity: Arity::Exact(1),
    },
];

/// Last value when every argument is truthy, False otherwise (and for no arguments)
fn builtin_and(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let mut last = Value::FALSE;
    for arg in args {
        let value = frame.eval(arg)?;
        if !value.is_truthy() {
            return Ok(Value::FALSE);
        }
        last = value;
    }
    Ok(last)
}

/// First truthy value, False when there is none
fn builtin_or(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    for arg in args {
        let value = frame.eval(arg)?;
        if value.is_truthy() {
            return Ok(value);
        }
    }
    Ok(Value::FALSE)
}

fn builtin_xor(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let a = frame.eval(&args[0])?.is_truthy();
    let b = frame.eval(&args[1])?.is_truthy();
    Ok(Value::from(a != b))
}

fn builtin_not(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    Ok(Value::from(!frame.eval(&args[0])?.is_truthy()))
}

fn integer_operand(op: &str, value: &Value) -> Result<i64, Error> {
    value.as_integer().ok_or_else(|| {
        Error::type_error(format!("{op} needs integers, got {}", value.kind_name()))
    })
}

fn bit_fold(args: &[Value], frame: &Frame<'_>, op: &str, step: fn(i64, i64) -> i64) -> EvalResult {
    let mut acc: Option<i64> = None;
    for arg in args {
        let n = integer_operand(op, &frame.eval(arg)?)?;
        acc = Some(match acc {
            None => n,
            Some(lhs) => step(lhs, n),
        });
    }
    Ok(acc.map(Value::Integer).unwrap_or_default())
}

// Macro to generate the bitwise folds
macro_rules! bitwise_fold {
    ($name:ident, $op:literal, $step:expr) => {
        fn $name(args: &[Value], frame: &Frame<'_>) -> EvalResult {
            bit_fold(args, frame, $op, $step)
        }
    };
}

bitwise_fold!(builtin_logand, "logand", |a, b| a & b);
bitwise_fold!(builtin_logior, "logior", |a, b| a | b);
bitwise_fold!(builtin_logxor, "logxor", |a, b| a ^ b);
bitwise_fold!(builtin_lognor, "lognor", |a, b| !(a | b));
bitwise_fold!(builtin_logeqv, "logeqv", |a, b| !(a ^ b));

fn builtin_lognot(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let n = integer_operand("lognot", &frame.eval(&args[0])?)?;
    Ok(Value::Integer(!n))
}
