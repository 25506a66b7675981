//! Numeric and string conversion primitives.
//!
//! `Int` and `Float` read a numeric prefix out of a string using the same rules as
//! the lexer, so `(Int "15.62")` is 15 and `(Float "15.62")` is 15.62.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp, eval_list};
use crate::evaluator::{EvalResult, Frame};
use crate::lexer::{parse_float, parse_int};

pub(super) const OPS: &[BuiltinOp] = &[
    BuiltinOp {
        id: "Int",
        func: builtin_int,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "Float",
        func: builtin_float,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "Str2List",
        func: builtin_str2list,
        arity: Arity::Exact(1),
    },
    BuiltinOp {
        id: "List2Str",
        func: builtin_list2str,
        arity: Arity::Exact(1),
    },
];

fn untranslatable(bytes: &[u8], target: &str) -> Error {
    Error::Conversion(format!(
        "\"{}\" to {target}",
        String::from_utf8_lossy(bytes)
    ))
}

/// Integer from an integer, a truncated float or a decimal string prefix
fn builtin_int(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match frame.eval(&args[0])? {
        value @ Value::Integer(_) => Ok(value),
        Value::Float(x) => Ok(Value::Integer(x as i64)),
        Value::String(bytes) => parse_int(&bytes)
            .map(|(n, _)| Value::Integer(n))
            .ok_or_else(|| untranslatable(&bytes, "int").into()),
        other => Err(Error::type_error(format!("Int of {}", other.kind_name())).into()),
    }
}

fn builtin_float(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match frame.eval(&args[0])? {
        Value::Integer(n) => Ok(Value::Float(n as f64)),
        value @ Value::Float(_) => Ok(value),
        Value::String(bytes) => parse_float(&bytes)
            .map(|(x, _)| Value::Float(x))
            .ok_or_else(|| untranslatable(&bytes, "float").into()),
        other => Err(Error::type_error(format!("Float of {}", other.kind_name())).into()),
    }
}

/// String to the list of its code points
fn builtin_str2list(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match frame.eval(&args[0])? {
        Value::String(bytes) => Ok(Value::List(
            String::from_utf8_lossy(&bytes)
                .chars()
                .map(|c| Value::Integer(i64::from(u32::from(c))))
                .collect(),
        )),
        other => Err(Error::type_error(format!("Str2List of {}", other.kind_name())).into()),
    }
}

/// List of code points to a string; invalid code points become U+FFFD
fn builtin_list2str(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    let items = eval_list(frame, &args[0], "List2Str")?;
    let mut text = String::with_capacity(items.len());
    for item in &items {
        let Value::Integer(n) = item else {
            return Err(Error::type_error(format!(
                "List2Str needs integer code points, got {}",
                item.kind_name()
            ))
            .into());
        };
        let c = u32::try_from(*n)
            .ok()
            .and_then(char::from_u32)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        text.push(c);
    }
    Ok(Value::from(text))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;

    #[test]
    fn test_conversions_data_driven() {
        let test_cases = vec![
            // Int
            ("(Int 2)", success(2)),
            ("(Int 2.5)", success(2)),
            ("(Int -3.2)", success(-3)),
            ("(Int \"12\")", success(12)),
            ("(Int \"15.62\")", success(15)),
            ("(Int \"-7 apples\")", success(-7)),
            ("(Int \"haha\")", SpecificError("cannot translate")),
            ("(Int \"\")", SpecificError("cannot translate")),
            ("(Int '(a b))", SpecificError("lisp type is wrong")),
            ("(Int 1 2)", SpecificError("wrong parameter number")),
            // Float
            ("(Float 2)", success(2.0)),
            ("(Float 2.4e3)", success(2400.0)),
            ("(Float \"15.62\")", success(15.62)),
            ("(Float \".5\")", success(0.5)),
            ("(Float \"x1\")", SpecificError("cannot translate")),
            ("(Float '())", SpecificError("lisp type is wrong")),
            // code points
            ("(Str2List \"go\")", success([103, 111])),
            ("(Str2List \"\")", success(Vec::<i64>::new())),
            ("(Str2List \"é\")", success([233])),
            ("(Str2List 5)", SpecificError("lisp type is wrong")),
            ("(List2Str '(104 97 104 97))", success("haha")),
            ("(List2Str '(233))", success("é")),
            ("(List2Str '(-1))", success("\u{FFFD}")),
            ("(List2Str '(100.5 2))", SpecificError("lisp type is wrong")),
            ("(List2Str \"ab\")", SpecificError("lisp type is wrong")),
            ("(List2Str (Str2List \"round\"))", success("round")),
        ];

        run_comprehensive_tests(test_cases);
    }
}
