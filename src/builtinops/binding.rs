//! Binding and definition primitives.
//!
//! `define` always binds in the current scope. `setq`, `defun` and `defmacro` walk
//! up to the nearest scope that already owns the name, stopping at the program
//! scope (the root's direct child). `update` and `remove` only touch an existing
//! binding below the root; natives in the root scope are refused. The value an
//! `update` assigns is evaluated in the scope that owns the binding.

use std::rc::Rc;

use crate::Error;
use crate::ast::{Lambda, Value};
use crate::builtinops::{Arity, BuiltinOp, param_names, symbol_name};
use crate::evaluator::{EvalResult, Frame, LAMBDA_LABEL, Scope};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "define",
        func: builtin_define,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "setq",
        func: builtin_setq,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "update",
        func: builtin_update,
        arity: Arity::Exact(2),
    },
    BuiltinOp {
        id: "defun",
        func: builtin_defun,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "defmacro",
        func: builtin_defmacro,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "lambda",
        func: builtin_lambda,
        arity: Arity::AtLeast(2),
    },
    BuiltinOp {
        id: "remove",
        func: builtin_remove,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "present",
        func: builtin_present,
        arity: Arity::Exact(0),
    },
    BuiltinOp {
        id: "context",
        func: builtin_context,
        arity: Arity::Exact(0),
    },
    BuiltinOp {
        id: "clear",
        func: builtin_clear,
        arity: Arity::Exact(0),
    },
    BuiltinOp {
        id: "builtin",
        func: builtin_builtin,
        arity: Arity::Exact(1),
    },
];

fn lambda(name: &str, params: Vec<String>, body: &[Value], scope: &Scope) -> Rc<Lambda> {
    Rc::new(Lambda {
        name: name.to_owned(),
        params,
        body: body.to_vec(),
        scope: scope.clone(),
    })
}

/// Error for a name that no scope below the root binds
fn missing_binding(frame: &Frame<'_>, name: &str) -> Error {
    if frame.interpreter().root().owns(name) {
        Error::Refused(name.to_owned())
    } else {
        Error::UnboundVariable(name.to_owned())
    }
}

/// `(define name expr)` or `(define (name params...) body...)`
fn builtin_define(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match &args[0] {
        Value::Symbol(name) => {
            if args.len() != 2 {
                return Err(Error::arity_error_with_expr(
                    Arity::Exact(2),
                    args.len(),
                    "define".to_owned(),
                )
                .into());
            }
            let value = frame.eval(&args[1])?;
            frame.scope().define(name.clone(), value.clone());
            Ok(value)
        }
        signature @ Value::List(items) => {
            if items.is_empty() {
                return Err(Error::NotAName("define needs a function name".to_owned()).into());
            }
            let mut names = param_names(signature)?;
            let name = names.remove(0);
            let closure = Value::Closure(lambda(&name, names, &args[1..], frame.scope()));
            frame.scope().define(name, closure.clone());
            Ok(closure)
        }
        other => Err(Error::type_error(format!(
            "define expects a symbol or a signature, got {}",
            other.kind_name()
        ))
        .into()),
    }
}

fn builtin_setq(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let name = symbol_name(&args[0])?;
    let value = frame.eval(&args[1])?;
    frame
        .scope()
        .binding_target(name)
        .define(name, value.clone());
    Ok(value)
}

/// `(update name expr)` or `(update (name params...) (body...))`
fn builtin_update(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match &args[0] {
        Value::Symbol(name) => {
            let owner = frame
                .scope()
                .owner_below_root(name)
                .ok_or_else(|| missing_binding(frame, name))?;
            // the new value is computed where the binding lives
            let value = frame.eval_in(&args[1], &owner)?;
            owner.define(name.clone(), value.clone());
            Ok(value)
        }
        signature @ Value::List(items) => {
            let Value::List(body) = &args[1] else {
                return Err(Error::type_error("update of a function needs a body list").into());
            };
            if items.is_empty() {
                return Err(Error::NotAName("update needs a function name".to_owned()).into());
            }
            let mut names = param_names(signature)?;
            let name = names.remove(0);
            let owner = frame
                .scope()
                .owner_below_root(&name)
                .ok_or_else(|| missing_binding(frame, &name))?;
            let closure = Value::Closure(lambda(&name, names, body, &owner));
            owner.define(name, closure.clone());
            Ok(closure)
        }
        other => Err(Error::type_error(format!(
            "update expects a symbol or a signature, got {}",
            other.kind_name()
        ))
        .into()),
    }
}

fn define_named(args: &[Value], frame: &Frame<'_>, make: fn(Rc<Lambda>) -> Value) -> EvalResult {
    let name = symbol_name(&args[0])?;
    let params = param_names(&args[1])?;
    let value = make(lambda(name, params, &args[2..], frame.scope()));
    frame
        .scope()
        .binding_target(name)
        .define(name, value.clone());
    Ok(value)
}

fn builtin_defun(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    define_named(args, frame, Value::Closure)
}

fn builtin_defmacro(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    define_named(args, frame, Value::Macro)
}

/// `(lambda (params...) body...)`: an anonymous closure over the current scope
fn builtin_lambda(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let params = param_names(&args[0])?;
    Ok(Value::Closure(lambda(
        LAMBDA_LABEL,
        params,
        &args[1..],
        frame.scope(),
    )))
}

fn builtin_remove(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let name = symbol_name(&args[0])?;
    let owner = frame
        .scope()
        .owner_below_root(name)
        .ok_or_else(|| missing_binding(frame, name))?;
    owner.remove(name);
    Ok(Value::Nothing)
}

fn symbols(names: Vec<String>) -> Value {
    Value::List(names.into_iter().map(Value::Symbol).collect())
}

/// Names bound directly in the current scope
fn builtin_present(_args: &[Value], frame: &Frame<'_>) -> EvalResult {
    Ok(symbols(frame.scope().names()))
}

/// Every name visible from the current scope, innermost scope first
fn builtin_context(_args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let names = frame.scope().ancestors().flat_map(Scope::names).collect();
    Ok(symbols(names))
}

fn builtin_clear(_args: &[Value], frame: &Frame<'_>) -> EvalResult {
    frame.scope().clear();
    Ok(Value::Nothing)
}

/// Look a name up in the root scope only, ignoring user shadowing
fn builtin_builtin(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let name = symbol_name(&args[0])?;
    frame
        .interpreter()
        .root()
        .lookup(name)
        .ok_or_else(|| Error::UnboundVariable(name.to_owned()).into())
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use crate::Interpreter;
    use crate::Value;
    use crate::ast::{nil, sym, val};
    use crate::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_define_data_driven() {
        let test_cases = vec![
            ("(define x 10) x", success(10)),
            ("(define x (+ 1 2))", success(3)),
            ("(define x 1 2)", SpecificError("wrong parameter number")),
            ("(define (sq n) (* n n)) (sq 9)", success(81)),
            ("(define (zero) 0) (zero)", success(0)),
            ("(define (nobody) (quote x)) (nobody)", EvalResult(sym("x"))),
            ("(define () 1)", SpecificError("not a name")),
            ("(define (f 1) 1)", SpecificError("not a name")),
            ("(define 5 1)", SpecificError("lisp type is wrong")),
            ("(define x)", SpecificError("wrong parameter number")),
            ("(lambda (x))", SpecificError("wrong parameter number")),
            ("(lambda x x)", SpecificError("lisp type is wrong")),
            ("((lambda (a b) (- a b)) 10 4)", success(6)),
            ("(defun f x 1)", SpecificError("lisp type is wrong")),
            ("(defun 1 (x) 1)", SpecificError("not a name")),
            ("(setq 1 2)", SpecificError("not a name")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_binding_walks() {
        let environments = vec![
            // setq inside a function creates the binding at program level
            TestEnvironment(vec![
                ("(defun set-g () (setq g 5))", Ignore),
                ("(set-g)", success(5)),
                ("g", success(5)),
            ]),
            // setq inside a function updates an existing outer binding
            TestEnvironment(vec![
                ("(setq counter 0)", success(0)),
                ("(defun inc () (setq counter (+ counter 1)))", Ignore),
                ("(inc) (inc) counter", success(2)),
            ]),
            // define inside a block stays local to it
            TestEnvironment(vec![
                ("(block b (define local 1) local)", success(1)),
                ("local", SpecificError("not found")),
            ]),
            // defun inside a function lands at program level
            TestEnvironment(vec![
                ("(defun outer () (defun inner () 7))", Ignore),
                ("(outer)", Ignore),
                ("(inner)", success(7)),
            ]),
            // update rewrites the owning binding
            TestEnvironment(vec![
                ("(setq v 1)", success(1)),
                ("(block b (update v 2))", success(2)),
                ("v", success(2)),
                ("(update never 1)", SpecificError("not found")),
                ("(update car 1)", SpecificError("refused")),
            ]),
            // update evaluates its value in the owning scope
            TestEnvironment(vec![
                ("(setq base 1)", success(1)),
                ("(setq w 0)", success(0)),
                ("(block b (define base 50) (update w base))", success(1)),
                ("w", success(1)),
                ("(defun bump (k) (update w (+ w k)))", Ignore),
                ("(bump 5)", SpecificError("not found")),
                ("w", success(1)),
            ]),
            // update of a function keeps the owner and replaces the closure
            TestEnvironment(vec![
                ("(defun f (x) x)", Ignore),
                ("(update (f x) ((* x 10)))", Ignore),
                ("(f 4)", success(40)),
                ("(update (f x) (* x 10))", Ignore),
                ("(update (g x) ((* x 10)))", SpecificError("not found")),
                ("(update (f x) 5)", SpecificError("lisp type is wrong")),
            ]),
            // remove
            TestEnvironment(vec![
                ("(setq gone 1)", success(1)),
                ("(remove gone)", EvalResult(Value::Nothing)),
                ("gone", SpecificError("not found")),
                ("(remove gone)", SpecificError("not found")),
                ("(remove car)", SpecificError("refused")),
                ("(car '(1))", success(1)),
            ]),
            // builtin ignores user shadowing
            TestEnvironment(vec![
                ("(define car 5)", success(5)),
                ("car", success(5)),
                ("((builtin car) '(9 8))", success(9)),
                ("(builtin nothing-here)", SpecificError("not found")),
                ("(builtin 1)", SpecificError("not a name")),
            ]),
        ];

        run_tests_in_environment(environments);
    }

    #[test]
    fn test_introspection() {
        let interp = Interpreter::new();
        interp.eval(b"(setq b 2) (setq a 1)").unwrap();

        assert_eq!(interp.eval(b"(present)").unwrap(), val([sym("a"), sym("b")]));
        assert_eq!(
            interp.eval(b"(block blk (define z 0) (present))").unwrap(),
            val([sym("z")])
        );

        let context = interp.eval(b"(context)").unwrap();
        let names = context.as_list().unwrap();
        assert_eq!(&names[..2], &[sym("a"), sym("b")]);
        assert!(names.contains(&sym("car")));
        assert!(names.contains(&sym("setq")));

        assert_eq!(interp.eval(b"(clear)").unwrap(), Value::Nothing);
        assert_eq!(interp.eval(b"(present)").unwrap(), nil());
        assert!(interp.eval(b"a").is_err());
        assert_eq!(interp.eval(b"(+ 1 1)").unwrap(), val(2));
    }
}
