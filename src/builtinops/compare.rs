//! Comparison primitives.
//!
//! Ordering operators chain over adjacent pairs and stop evaluating at the first
//! pair that fails. Numbers compare across int and float; strings compare
//! bytewise; any other kind is a type error.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp};
use crate::evaluator::{EvalResult, Frame};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: ">",
        func: builtin_gt,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: ">=",
        func: builtin_ge,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "<",
        func: builtin_lt,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "<=",
        func: builtin_le,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "=",
        func: builtin_eq,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "==",
        func: builtin_eq,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "!=",
        func: builtin_distinct,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "/=",
        func: builtin_distinct,
        arity: Arity::AtLeast(2),
    },
];

/// Order two comparable values; `None` when a float operand is NaN
fn compare(lhs: &Value, rhs: &Value) -> Result<Option<Ordering>, Error> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Some(a.cmp(b))),
        (Value::Integer(a), Value::Float(b)) => Ok((*a as f64).partial_cmp(b)),
        (Value::Float(a), Value::Integer(b)) => Ok(a.partial_cmp(&(*b as f64))),
        (Value::Float(a), Value::Float(b)) => Ok(a.partial_cmp(b)),
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        _ => Err(Error::type_error(format!(
            "cannot compare {} with {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn chain(args: &[Value], frame: &Frame<'_>, holds: fn(Ordering) -> bool) -> EvalResult {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Value::FALSE);
    };
    let mut prev = frame.eval(first)?;
    for arg in rest {
        let next = frame.eval(arg)?;
        if !compare(&prev, &next)?.is_some_and(holds) {
            return Ok(Value::FALSE);
        }
        prev = next;
    }
    Ok(Value::TRUE)
}

// Macro to generate the chained comparison functions
macro_rules! chained_comparison {
    ($name:ident, $holds:expr) => {
        fn $name(args: &[Value], frame: &Frame<'_>) -> EvalResult {
            chain(args, frame, $holds)
        }
    };
}

chained_comparison!(builtin_gt, Ordering::is_gt);
chained_comparison!(builtin_ge, Ordering::is_ge);
chained_comparison!(builtin_lt, Ordering::is_lt);
chained_comparison!(builtin_le, Ordering::is_le);
chained_comparison!(builtin_eq, Ordering::is_eq);

/// True only when no two arguments are equal, not just adjacent ones
fn builtin_distinct(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let mut numbers: Vec<f64> = Vec::with_capacity(args.len());
    let mut strings: HashSet<Vec<u8>> = HashSet::new();

    for arg in args {
        let fresh = match frame.eval(arg)? {
            Value::Integer(n) => record_number(&mut numbers, n as f64),
            Value::Float(x) => record_number(&mut numbers, x),
            Value::String(s) => strings.insert(s),
            other => {
                return Err(Error::type_error(format!(
                    "cannot compare {} for distinctness",
                    other.kind_name()
                ))
                .into());
            }
        };
        if !fresh {
            return Ok(Value::FALSE);
        }
    }
    Ok(Value::TRUE)
}

fn record_number(seen: &mut Vec<f64>, x: f64) -> bool {
    if seen.contains(&x) {
        return false;
    }
    seen.push(x);
    true
}

#[cfg(test)]
mod tests {
    use crate::ast::nil;
    use crate::test_support::*;

    #[test]
    fn test_comparison_data_driven() {
        let test_cases = vec![
            // Chained ordering
            ("(> 3 2 1)", success(1)),
            ("(> 3 3 1)", EvalResult(nil())),
            ("(>= 3 3 1)", success(1)),
            ("(< 1 2 3)", success(1)),
            ("(< 1 3 2)", EvalResult(nil())),
            ("(<= 1 1 2)", success(1)),
            ("(< 1 2.5)", success(1)),
            ("(> 2.5 2)", success(1)),
            ("(< \"abc\" \"abd\")", success(1)),
            ("(> \"b\" \"abc\")", success(1)),
            ("(< 1 \"a\")", SpecificError("lisp type is wrong")),
            ("(< '(1) '(2))", SpecificError("lisp type is wrong")),
            ("(< 1)", SpecificError("wrong parameter number")),
            // Evaluation stops at the first failing pair
            ("(< 2 1 (raise \"unreached\"))", EvalResult(nil())),
            // Equality chains against neighbours
            ("(= 1 1 1)", success(1)),
            ("(== 1 1.0)", success(1)),
            ("(= 1 1 2)", EvalResult(nil())),
            ("(= \"x\" \"x\")", success(1)),
            ("(= \"1\" 1)", SpecificError("lisp type is wrong")),
            // Distinctness is pairwise over every argument
            ("(!= 1 2 3)", success(1)),
            ("(!= 1 2 1)", EvalResult(nil())),
            ("(/= 1 1.0)", EvalResult(nil())),
            ("(/= \"a\" \"b\" \"a\")", EvalResult(nil())),
            ("(/= 1 \"1\")", success(1)),
            ("(!= 1 '(1))", SpecificError("lisp type is wrong")),
            ("(!= 1)", SpecificError("wrong parameter number")),
        ];

        run_comprehensive_tests(test_cases);
    }
}
