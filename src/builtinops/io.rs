//! Console and file primitives.
//!
//! These are the only primitives that touch the process: `print`/`println` write
//! to stdout, `scan` blocks on stdin and `load` reads a source file.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp};
use crate::evaluator::{EvalResult, Frame, read_source};
use crate::section::Section;

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "print",
        func: builtin_print,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "println",
        func: builtin_println,
        arity: Arity::Any,
    },
    BuiltinOp {
        id: "scan",
        func: builtin_scan,
        arity: Arity::Exact(0),
    },
    BuiltinOp {
        id: "load",
        func: builtin_load,
        arity: Arity::Exact(1),
    },
];

fn io_error(op: &str, err: std::io::Error) -> Error {
    Error::EvalError(format!("{op}: {err}"))
}

fn print_each(args: &[Value], frame: &Frame<'_>, newline: bool) -> EvalResult {
    let mut last = Value::Nothing;
    for arg in args {
        let value = frame.eval(arg)?;
        let mut out = std::io::stdout().lock();
        if newline {
            writeln!(out, "{value}")
        } else {
            write!(out, "{value}")
        }
        .map_err(|err| io_error("print", err))?;
        last = value;
    }
    std::io::stdout()
        .flush()
        .map_err(|err| io_error("print", err))?;
    Ok(last)
}

/// Display each argument in turn; the last value is the result
fn builtin_print(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    print_each(args, frame, false)
}

fn builtin_println(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    print_each(args, frame, true)
}

/// Read stdin until one balanced expression is complete and evaluate it here
fn builtin_scan(_args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut section = Section::new();
    loop {
        let mut line = Vec::new();
        let read = input
            .read_until(b'\n', &mut line)
            .map_err(|err| io_error("scan", err))?;
        if read == 0 {
            return Err(
                Error::EvalError("scan: input ended before the expression".to_owned()).into(),
            );
        }
        section.feed(&line)?;
        if section.is_complete() && !section.is_empty() {
            break;
        }
    }
    frame.eval_source(&section.into_source())
}

/// `(load "path")`: evaluate a file in the current scope, trying `path.lsp` too
fn builtin_load(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let path = match frame.eval(&args[0])? {
        Value::String(path) => path,
        other => {
            return Err(Error::type_error(format!(
                "load needs a string path, got {}",
                other.kind_name()
            ))
            .into());
        }
    };
    let path = String::from_utf8_lossy(&path);
    let source = read_source(Path::new(path.as_ref()))?;
    frame.eval_source(&source)
}
