//! Floating-point math primitives.

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, BuiltinOp};
use crate::evaluator::{EvalResult, Frame};

fn real_operand(op: &str, value: &Value) -> Result<f64, Error> {
    match value {
        Value::Integer(n) => Ok(*n as f64),
        Value::Float(x) => Ok(*x),
        other => Err(Error::type_error(format!(
            "{op} needs a number, got {}",
            other.kind_name()
        ))),
    }
}

// Macro to generate the unary float functions and their table entries
macro_rules! unary_math {
    ($($name:ident => $id:literal, $f:path;)*) => {
        $(
            fn $name(args: &[Value], frame: &Frame<'_>) -> EvalResult {
                let x = real_operand($id, &frame.eval(&args[0])?)?;
                Ok(Value::Float($f(x)))
            }
        )*

        pub(super) const OPS: &[BuiltinOp] = &[
            $(
                BuiltinOp {
                    id: $id,
                    func: $name,
                    arity: Arity::Exact(1),
                },
            )*
            BuiltinOp {
                id: "pow",
                func: builtin_pow,
                arity: Arity::Exact(2),
            },
        ];
    };
}

unary_math! {
    builtin_sin => "sin", f64::sin;
    builtin_sinh => "sinh", f64::sinh;
    builtin_asin => "asin", f64::asin;
    builtin_asinh => "asinh", f64::asinh;
    builtin_cos => "cos", f64::cos;
    builtin_cosh => "cosh", f64::cosh;
    builtin_acos => "acos", f64::acos;
    builtin_acosh => "acosh", f64::acosh;
    builtin_tan => "tan", f64::tan;
    builtin_tanh => "tanh", f64::tanh;
    builtin_atan => "atan", f64::atan;
    builtin_atanh => "atanh", f64::atanh;
    builtin_exp => "exp", f64::exp;
    builtin_log => "log", f64::ln;
    builtin_sqrt => "sqrt", f64::sqrt;
}

/// `(pow base exponent)`, both floats
fn builtin_pow(args: &[Value], frame: &Frame<'_>) -> EvalResult {
    match (frame.eval(&args[0])?, frame.eval(&args[1])?) {
        (Value::Float(base), Value::Float(exponent)) => Ok(Value::Float(base.powf(exponent))),
        (base, exponent) => Err(Error::type_error(format!(
            "pow needs two floats, got {} and {}",
            base.kind_name(),
            exponent.kind_name()
        ))
        .into()),
    }
}
