//! Flow control primitives.
//!
//! Loops and blocks open a child scope and own it: a `return` or `return-from`
//! aimed at that scope ends the construct with the carried value. Every other
//! unwind passes through untouched.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp, symbol_name};
use crate::evaluator::{EvalResult, Frame, LOOP_LABEL, Scope, Unwind, settle};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "if",
        func: builtin_if,
        arity: Arity::Range(2, 3),
    },
    BuiltinOp {
        id: "cond",
        func: builtin_cond,
        arity: Arity::AtLeast(1),
    },
    BuiltinOp {
        id: "block",
        func: builtin_block,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "loop",
        func: builtin_loop,
        arity: Arity::Exact(3),
    },
    BuiltinOp {
        id: "while",
        func: builtin_while,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "until",
        func: builtin_until,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "for",
        func: builtin_for,
        arity: Arity::Exact(3),
    },
    BuiltinOp {
        id: "return",
        func: builtin_return,
        arity: Arity::Range(0, 1),
    },
    BuiltinOp {
        id: "return-from",
        func: builtin_return_from,
        arity: Arity::Range(1, 2),
    },
];

fn builtin_if(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    if frame.eval(&args[0])?.is_truthy() {
        frame.eval(&args[1])
    } else {
        args.get(2)
            .map_or(Ok(Value::Nothing), |otherwise| frame.eval(otherwise))
    }
}

/// `(cond (test expr) ...)`: the expression of the first truthy test
fn builtin_cond(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    for clause in args {
        let Value::List(parts) = clause else {
            return Err(Error::type_error(format!(
                "cond clause must be a list, got {}",
                clause.kind_name()
            ))
            .into());
        };
        let [test, expr] = parts.as_slice() else {
            return Err(Error::arity_error_with_expr(
                Arity::Exact(2),
                parts.len(),
                "cond clause".to_owned(),
            )
            .into());
        };
        if frame.eval(test)?.is_truthy() {
            return frame.eval(expr);
        }
    }
    Ok(Value::Nothing)
}

/// `(block NAME body...)`: a named scope that `return-from NAME` can leave
fn builtin_block(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let label = symbol_name(&args[0])?;
    let scope = frame.scope().child(label);
    settle(&scope, frame.run_body(&args[1..], &scope))
}

/// Run `body` while `cond` has the wanted truthiness; the last body value wins
fn repeat(frame: &Frame<'_>, scope: &Scope, cond: &Value, body: &Value, until: bool) -> EvalResult {
    let mut last = Value::Nothing;
    while frame.eval_in(cond, scope)?.is_truthy() != until {
        last = frame.eval_in(body, scope)?;
    }
    Ok(last)
}

/// `(loop init cond body)`
fn builtin_loop(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let scope = frame.scope().child(LOOP_LABEL);
    let result = frame
        .eval_in(&args[0], &scope)
        .and_then(|_| repeat(frame, &scope, &args[1], &args[2], false));
    settle(&scope, result)
}

fn builtin_while(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let scope = frame.scope().child(LOOP_LABEL);
    settle(&scope, repeat(frame, &scope, &args[0], &args[1], false))
}

fn builtin_until(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let scope = frame.scope().child(LOOP_LABEL);
    settle(&scope, repeat(frame, &scope, &args[0], &args[1], true))
}

/// `(for name list body)`
///
/// The variable is bound in the enclosing scope, so the last element stays
/// visible after the loop. The body runs in the loop's own scope.
fn builtin_for(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let name = symbol_name(&args[0])?;
    let scope = frame.scope().child(LOOP_LABEL);
    let iterate = || -> EvalResult {
        let items = match frame.eval_in(&args[1], &scope)? {
            Value::List(items) => items,
            other => {
                return Err(Error::type_error(format!(
                    "for expects a list, got {}",
                    other.kind_name()
                ))
                .into());
            }
        };
        let mut last = Value::Nothing;
        for item in items {
            frame.scope().define(name, item);
            last = frame.eval_in(&args[2], &scope)?;
        }
        Ok(last)
    };
    settle(&scope, iterate())
}

fn return_value(arg: Option<&Value>, frame: &Frame<'_>) -> EvalResult {
    arg.map_or(Ok(Value::FALSE), |expr| frame.eval(expr))
}

/// Leave the innermost enclosing loop
fn builtin_return(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let value = return_value(args.first(), frame)?;
    let target = frame
        .scope()
        .find_label(LOOP_LABEL)
        .ok_or_else(|| Error::UnboundVariable("enclosing loop for return".to_owned()))?;
    Err(Unwind::Return {
        target: target.id(),
        value,
    })
}

/// Leave the nearest enclosing function or block called NAME
fn builtin_return_from(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let label = symbol_name(&args[0])?;
    let value = return_value(args.get(1), frame)?;
    let target = frame
        .scope()
        .find_label(label)
        .ok_or_else(|| Error::UnboundVariable(format!("return target {label}")))?;
    Err(Unwind::Return {
        target: target.id(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use crate::Value;
    use crate::ast::nil;
    use crate::test_support::*;

    #[test]
    fn test_conditionals_data_driven() {
        let test_cases = vec![
            ("(if 1 \"yes\" \"no\")", success("yes")),
            ("(if () \"yes\" \"no\")", success("no")),
            ("(if 0 \"yes\")", EvalResult(Value::Nothing)),
            ("(if 1 2 (raise \"unreached\"))", success(2)),
            ("(if 1)", SpecificError("wrong parameter number")),
            ("(if 1 2 3 4)", SpecificError("wrong parameter number")),
            ("(cond (0 1) (2 3))", success(3)),
            ("(cond ((= 1 2) \"a\") ((= 1 1) \"b\"))", success("b")),
            ("(cond (0 1))", EvalResult(Value::Nothing)),
            ("(cond 5)", SpecificError("lisp type is wrong")),
            ("(cond (1 2 3))", SpecificError("wrong parameter number")),
            ("(cond)", SpecificError("wrong parameter number")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_loops_data_driven() {
        let test_cases = vec![
            // loop: init, cond, body; value of the last body run
            ("(loop (setq i 0) (< i 5) (setq i (+ i 1)))", success(5)),
            ("(loop (setq i 0) (< i 0) (setq i (+ i 1)))", EvalResult(Value::Nothing)),
            ("(loop (setq i 0) (< i 5) (setq i (+ i 1))) i", success(5)),
            // while and until
            ("(setq n 3) (while (> n 0) (setq n (- n 1)))", success(0)),
            ("(setq n 0) (until (= n 4) (setq n (+ n 1)))", success(4)),
            ("(until 1 (raise \"unreached\"))", EvalResult(Value::Nothing)),
            // for binds each element in turn
            ("(setq sum 0) (for x '(1 2 3) (setq sum (+ sum x))) sum", success(6)),
            ("(for x '(1 2 3) x)", success(3)),
            ("(for x '() x)", EvalResult(Value::Nothing)),
            ("(for x '(1 2) x) x", success(2)),
            ("(setq x 9) (for x '() x) x", success(9)),
            ("(defun last-of (lst) (for item lst 0) item) (last-of '(4 5 6))", success(6)),
            ("(for x 5 x)", SpecificError("lisp type is wrong")),
            ("(for 1 '(1) 1)", SpecificError("not a name")),
            // return leaves the loop with a value
            ("(while 1 (return 9))", success(9)),
            ("(for x '(1 2 3 4) (if (= x 3) (return (* x 10))))", success(30)),
            ("(loop (setq i 0) 1 (if (> i 2) (return i) (setq i (+ i 1))))", success(3)),
            ("(until 0 (return))", EvalResult(nil())),
            // block and return-from
            ("(block b 1 2)", success(2)),
            ("(block b (return-from b 5) 6)", success(5)),
            ("(block b (return-from b))", EvalResult(nil())),
            ("(block outer (block inner (return-from outer 1)) 2)", success(1)),
            ("(block 5 1)", SpecificError("not a name")),
            ("(block b)", SpecificError("wrong parameter number")),
            ("(return-from 5 1)", SpecificError("not a name")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_return_from_function_inside_loops() {
        let environments = vec![TestEnvironment(vec![
            (
                "(defun first-over (lst limit)
                    (for x lst
                        (while 1
                            (if (> x limit) (return-from first-over x) (return))))
                    -1)",
                Ignore,
            ),
            ("(first-over '(1 5 9 12) 6)", success(9)),
            ("(first-over '(1 2) 6)", success(-1)),
        ])];

        run_tests_in_environment(environments);
    }
}
