//! Error raising and recovery primitives.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp};
use crate::evaluator::{EvalResult, Frame, Unwind};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "raise",
        func: builtin_raise,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "catch",
        func: builtin_catch,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "error",
        func: builtin_error,
        arity: Arity::Exact(1),
    },
];

/// `(raise "message")`: fail with a user error
fn builtin_raise(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match frame.eval(&args[0])? {
        Value::String(message) => {
            Err(Error::Raised(String::from_utf8_lossy(&message).into_owned()).into())
        }
        other => Err(Error::type_error(format!(
            "raise needs a string message, got {}",
            other.kind_name()
        ))
        .into()),
    }
}

/// `(catch expr)`: the error message as a string, Nothing when `expr` succeeds
///
/// Returns in flight are not errors and keep unwinding.
fn builtin_catch(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match frame.eval(&args[0]) {
        Ok(_) => Ok(Value::Nothing),
        Err(Unwind::Error(err)) => Ok(Value::from(err.to_string())),
        Err(unwind) => Err(unwind),
    }
}

fn builtin_error(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    frame.eval(&args[0])
}

#[cfg(test)]
mod tests {
    use crate::Value;
    use crate::test_support::*;

    #[test]
    fn test_errors_data_driven() {
        let test_cases = vec![
            ("(raise \"boom\")", SpecificError("boom")),
            ("(raise 1)", SpecificError("lisp type is wrong")),
            ("(raise)", SpecificError("wrong parameter number")),
            ("(catch (raise \"boom\"))", success("boom")),
            ("(catch (/ 1 0))", success("cannot divide zero")),
            ("(catch (car '()))", success("fold is empty: car of an empty list")),
            ("(catch (+ 1 2))", EvalResult(Value::Nothing)),
            ("(catch undefined-name)", success("not found: undefined-name")),
            ("(error (+ 1 2))", success(3)),
            ("(error (raise \"again\"))", SpecificError("again")),
            ("(if (catch (raise \"x\")) \"recovered\" \"clean\")", success("recovered")),
        ];

        run_comprehensive_tests(test_cases);
    }
}
