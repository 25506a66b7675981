//! Arithmetic primitives.
//!
//! Each operator evaluates its arguments once, left to right, and folds them from
//! the left. Integer pairs stay integers (wrapping on overflow); a float on either
//! side promotes the step to float. `+` additionally concatenates strings and lists.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp};
use crate::evaluator::{EvalResult, Frame};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "+",
        func: builtin_add,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "-",
        func: builtin_sub,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "*",
        func: builtin_mul,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "/",
        func: builtin_div,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "%",
        func: builtin_mod,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "mod",
        func: builtin_mod,
        arity: Arity::Any,
    },
];

/// Evaluate every argument and combine them from the left
///
/// No arguments gives Nothing; a single argument is returned as evaluated.
fn fold(
    args: &[Value],
    frame: &Frame<'_>,
    step: fn(Value, Value) -> Result<Value, Error>,
) -> EvalResult {
    let mut acc: Option<Value> = None;
    for arg in args {
        let value = frame.eval(arg)?;
        acc = Some(match acc {
            None => value,
            Some(lhs) => step(lhs, value)?,
        });
    }
    Ok(acc.unwrap_or_default())
}

/// Both operands as floats when at least one of them is a float
fn float_pair(op: &str, lhs: &Value, rhs: &Value) -> Result<(f64, f64), Error> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Float(b)) => Ok((*a as f64, *b)),
        (Value::Float(a), Value::Integer(b)) => Ok((*a, *b as f64)),
        (Value::Float(a), Value::Float(b)) => Ok((*a, *b)),
        _ => Err(Error::type_error(format!(
            "{op} cannot combine {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn add(lhs: Value, rhs: Value) -> Result<Value, Error> {
    match (lhs, rhs) {
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_add(b))),
        (Value::String(mut a), Value::String(b)) => {
            a.extend(b);
            Ok(Value::String(a))
        }
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Ok(Value::List(a))
        }
        (lhs, rhs) => float_pair("+", &lhs, &rhs).map(|(a, b)| Value::Float(a + b)),
    }
}

// Generates the numeric-only steps that differ solely in their operator
macro_rules! numeric_step {
    ($name:ident, $op:literal, $int:expr, $float:expr) => {
        fn $name(lhs: Value, rhs: Value) -> Result<Value, Error> {
            match (&lhs, &rhs) {
                (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer($int(*a, *b))),
                _ => float_pair($op, &lhs, &rhs).map(|(a, b)| Value::Float($float(a, b))),
            }
        }
    };
}

numeric_step!(sub, "-", i64::wrapping_sub, |a: f64, b: f64| a - b);
numeric_step!(mul, "*", i64::wrapping_mul, |a: f64, b: f64| a * b);

fn div(lhs: Value, rhs: Value) -> Result<Value, Error> {
    match (&lhs, &rhs) {
        (Value::Integer(_), Value::Integer(0)) => Err(Error::DivideByZero),
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_div(*b))),
        _ => {
            let (a, b) = float_pair("/", &lhs, &rhs)?;
            if b == 0.0 {
                return Err(Error::DivideByZero);
            }
            Ok(Value::Float(a / b))
        }
    }
}

fn rem(lhs: Value, rhs: Value) -> Result<Value, Error> {
    match (lhs, rhs) {
        (Value::Integer(_), Value::Integer(0)) => Err(Error::ModByZero),
        (Value::Integer(a), Value::Integer(b)) => Ok(Value::Integer(a.wrapping_rem(b))),
        (lhs, rhs) => Err(Error::type_error(format!(
            "mod needs integers, got {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn builtin_add(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    fold(args, frame, add)
}

fn builtin_sub(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    fold(args, frame, sub)
}

fn builtin_mul(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    fold(args, frame, mul)
}

fn builtin_div(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    fold(args, frame, div)
}

fn builtin_mod(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    fold(args, frame, rem)
}

#[cfg(test)]
mod tests {
    use crate::Value;
    use crate::ast::nil;
    use crate::test_support::*;

    #[test]
    fn test_arithmetic_data_driven() {
        let test_cases = vec![
            // Addition
            ("(+ 5 3)", success(8)),
            ("(+ 5 3 4)", success(12)),
            ("(+ 5 1 1.2 1.7 2)", success(10.9)),
            ("(+ 12.5 13.7)", success(26.2)),
            ("(+ \"haha\" \"hoho\")", success("hahahoho")),
            ("(+ '(1 2) '(3 4))", success([1, 2, 3, 4])),
            ("(+ 7)", success(7)),
            ("(+ (+ 1 1))", success(2)),
            ("(+)", EvalResult(Value::Nothing)),
            ("(* 4294967296 4294967296)", success(0)),
            ("(+ 3 ng)", SpecificError("not found")),
            ("(+ ng 3)", SpecificError("not found")),
            ("(+ + 3)", SpecificError("lisp type is wrong")),
            ("(+ \"a\" 1)", SpecificError("lisp type is wrong")),
            ("(+ '(1) \"a\")", SpecificError("lisp type is wrong")),
            // Subtraction
            ("(- 10 3 2)", success(5)),
            ("(- 10 2.5)", success(7.5)),
            ("(- 1.5 1)", success(0.5)),
            ("(- 5)", success(5)),
            ("(- \"a\" \"b\")", SpecificError("lisp type is wrong")),
            // Multiplication
            ("(* 2 3 4)", success(24)),
            ("(* 2 0.5)", success(1.0)),
            ("(* '(1) 2)", Error),
            // Division truncates integers
            ("(/ 5 3)", success(1)),
            ("(/ -7 2)", success(-3)),
            ("(/ 5 2.0)", success(2.5)),
            ("(/ 100 5 2)", success(10)),
            ("(/ 5 0)", SpecificError("cannot divide zero")),
            ("(/ 5.0 0)", SpecificError("cannot divide zero")),
            ("(/ 5 0.0)", SpecificError("cannot divide zero")),
            ("(/ 0 5)", success(0)),
            ("(/ \"a\" 0)", SpecificError("lisp type is wrong")),
            ("(/ -7 -2)", success(3)),
            // Modulo is integer-only
            ("(% 7 3)", success(1)),
            ("(mod -7 3)", success(-1)),
            ("(mod 7 0)", SpecificError("cannot mod zero")),
            ("(% 7.0 2)", SpecificError("lisp type is wrong")),
            // Quasi lists evaluate to data, so they add like lists
            ("(+ '() '())", EvalResult(nil())),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_arguments_evaluated_once() {
        let environments = vec![TestEnvironment(vec![
            ("(setq n 0)", success(0)),
            ("(+ (setq n (+ n 1)) (setq n (+ n 1)) (setq n (+ n 1)))", success(6)),
            ("n", success(3)),
        ])];

        run_tests_in_environment(environments);
    }
}
