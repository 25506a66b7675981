//! List, data and sequencing primitives.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp, eval_list};
use crate::evaluator::{EvalResult, Frame};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "atom",
        func: builtin_atom,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "eq",
        func: builtin_eq,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "car",
        func: builtin_car,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "cdr",
        func: builtin_cdr,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "cons",
        func: builtin_cons,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "list",
        func: builtin_list,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "length",
        func: builtin_length,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "quote",
        func: builtin_quote,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "eval",
        func: builtin_eval,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "progn",
        func: builtin_progn,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "each",
        func: builtin_each,
        arity: Arity::AtLeast(1),
    },
];

/// True for anything but a non-empty list
fn builtin_atom(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let value = frame.eval(&args[0])?;
    Ok(Value::from(!matches!(value, Value::List(ref items) if !items.is_empty())))
}

fn builtin_eq(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let x = frame.eval(&args[0])?;
    let y = frame.eval(&args[1])?;
    if matches!(x, Value::Native(_)) || matches!(y, Value::Native(_)) {
        return Err(Error::type_error("eq cannot compare natives").into());
    }
    Ok(Value::from(x == y))
}

fn builtin_car(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let items = eval_list(frame, &args[0], "car")?;
    items
        .into_iter()
        .next()
        .ok_or_else(|| Error::EmptyList("car".to_owned()).into())
}

fn builtin_cdr(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let mut items = eval_list(frame, &args[0], "cdr")?;
    if items.is_empty() {
        return Err(Error::EmptyList("cdr".to_owned()).into());
    }
    items.remove(0);
    Ok(Value::List(items))
}

fn builtin_cons(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let head = frame.eval(&args[0])?;
    let tail = eval_list(frame, &args[1], "cons")?;
    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(head);
    items.extend(tail);
    Ok(Value::List(items))
}

fn builtin_list(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    Ok(Value::List(frame.eval_all(args)?))
}

/// Element count of a list, byte count of a string
fn builtin_length(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match frame.eval(&args[0])? {
        Value::List(items) => Ok(Value::Integer(items.len() as i64)),
        Value::String(bytes) => Ok(Value::Integer(bytes.len() as i64)),
        other => Err(Error::type_error(format!(
            "length expects a list or string, got {}",
            other.kind_name()
        ))
        .into()),
    }
}

fn builtin_quote(args: &[Value], _frame: &Frame<'_>) -> EvalResult {
    Ok(args[0].clone())
}

/// Evaluate the argument, then evaluate the resulting value once more
fn builtin_eval(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let code = frame.eval(&args[0])?;
    frame.eval(&code)
}

fn builtin_progn(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    if args.is_empty() {
        return Ok(Value::FALSE);
    }
    frame.run_body(args, frame.scope())
}

fn builtin_each(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    frame.run_body(args, frame.scope())
}
