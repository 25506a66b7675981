//! ContractVM - Lisp-dialect smart-contract interpreter
//!
//! This crate runs contract programs written in a small Lisp dialect against the
//! transaction they are attached to. A program is scanned into tokens, grouped into
//! an expression tree and executed against a chain of lexical scopes. The value of
//! the last top-level form decides the verdict: a truthy value accepts the
//! transaction, anything else (including an error) rejects it.
//!
//! ```scheme
//! (defun add (a b) (+ a b))
//! (add 12.5 13.7)              ; => 26.2
//! (cons 1 '(2 3))              ; => (1 2 3)
//! (block outer
//!   (loop (setq i 0) (< i 10)
//!     (if (= i 3) (return-from outer i) (setq i (+ i 1)))))
//! ```
//!
//! ## Language
//!
//! - Values are dynamically typed: integers, floats, byte strings, lists, quasi
//!   lists (`'(...)`, data that is never executed), natives, closures and macros.
//! - Natives receive their arguments unevaluated and decide evaluation order
//!   themselves, so `if`, `and`, `quote` and friends are ordinary natives.
//! - Truthiness: nothing, `0`, `0.0`, `""` and the empty list are false.
//!   `True` is the integer 1 and `False` is the empty list.
//! - `return` and `return-from` unwind to the nearest enclosing loop or to a named
//!   scope (function or `block`); unwinding is carried by the evaluator's result
//!   type, never by mutable scope state.
//!
//! ## Host integration
//!
//! [`vm::LispVm`] binds an interpreter to one [`ledger::VmContext`]. In contract
//! mode the program sees the invoking message's inputs, outputs, global parameters
//! and asset metadata; in restrict mode it sees exactly one input and the previous
//! output it spends. Signature checks go through host-provided key schemes
//! ([`crypto::CryptoSuite`]).
//!
//! ## Modules
//!
//! - `lexer`: byte-level tokenizer
//! - `parser`: token grouping into expression trees
//! - `section`: multi-line input accumulator with comment stripping
//! - `evaluator`: scopes, unwinding and the execution loop
//! - `builtinops`: the common primitive library
//! - `crypto`: signature verification and hashing primitives
//! - `params`: parameter dictionaries and the length-prefixed list codec
//! - `ledger`: host-supplied transaction, asset and contract records
//! - `bindings`: ledger primitives for contract and restrict mode
//! - `vm`: configuration and the host facade

use std::fmt;

use crate::builtinops::Arity;

/// Maximum nesting of parenthesized groups accepted by the tree builder
pub const MAX_PARSE_DEPTH: usize = 64;

/// Default bound on nested evaluations (function calls, nested forms)
///
/// The evaluator grows its stack on demand, so this only stops runaway recursion
/// before the step budget does.
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Default bound on evaluation steps for a single host call
pub const DEFAULT_MAX_STEPS: u64 = 100_000;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Bytes left over that no token rule accepts
    TrailingContent,
    /// Unbalanced parentheses, or an open string or character literal
    Unbalanced,
    /// Group nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 40 bytes)
    pub context: Option<String>,
    /// The problematic token, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a ParseError with a snippet of `input` starting at `offset`
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &[u8],
        offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 40;

        let start = offset.min(input.len());
        let end = (start + MAX_CONTEXT).min(input.len());
        let mut context = String::from_utf8_lossy(&input[start..end]).into_owned();
        if end < input.len() {
            context.push_str("[...]");
        }
        let context = context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(context), None)
    }

    /// "cannot scan to the end"
    pub fn trailing(input: &[u8], offset: usize) -> Self {
        Self::with_context(
            ParseErrorKind::TrailingContent,
            "cannot scan to the end",
            input,
            offset,
        )
    }

    /// "quote is unfold"
    pub fn unbalanced() -> Self {
        Self::from_message(ParseErrorKind::Unbalanced, "quote is unfold")
    }
}

/// Error types for the interpreter and its bindings
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    /// Evaluator limits and host I/O failures
    EvalError(String),
    /// Operand kind mismatch
    TypeError(String),
    UnboundVariable(String),
    NotAFunction(String),
    /// A position that requires a symbol held something else
    NotAName(String),
    ArityError {
        expected: Arity,
        got: usize,
        expression: Option<String>,
    },
    /// `car`/`cdr` of an empty list
    EmptyList(String),
    Conversion(String),
    /// Attempt to update or remove a binding owned by the root scope
    Refused(String),
    DivideByZero,
    ModByZero,
    /// Malformed parameter lists and wire data
    EncodingError(String),
    CryptoError(String),
    LedgerError(String),
    /// User error produced by `raise`
    Raised(String),
}

impl Error {
    /// Create an ArityError without expression context
    pub fn arity_error(expected: Arity, got: usize) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: None,
        }
    }

    /// Create an ArityError naming the callee
    pub fn arity_error_with_expr(expected: Arity, got: usize, expression: String) -> Self {
        Error::ArityError {
            expected,
            got,
            expression: Some(expression),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Error::TypeError(message.into())
    }

    pub fn ledger(message: impl Into<String>) -> Self {
        Error::LedgerError(message.into())
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Error::CryptoError(message.into())
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::ParseError(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "{}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::EvalError(msg) => write!(f, "evaluation error: {msg}"),
            Error::TypeError(msg) => write!(f, "lisp type is wrong: {msg}"),
            Error::UnboundVariable(name) => write!(f, "not found: {name}"),
            Error::NotAFunction(head) => write!(f, "not a function: {head}"),
            Error::NotAName(msg) => write!(f, "not a name: {msg}"),
            Error::ArityError {
                expected,
                got,
                expression,
            } => match expression {
                Some(expr) => write!(
                    f,
                    "wrong parameter number: {expr} expects {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "wrong parameter number: expected {expected} arguments, got {got}"
                ),
            },
            Error::EmptyList(op) => write!(f, "fold is empty: {op} of an empty list"),
            Error::Conversion(msg) => write!(f, "cannot translate {msg}"),
            Error::Refused(name) => write!(f, "refused: {name} is bound in the root scope"),
            Error::DivideByZero => write!(f, "cannot divide zero"),
            Error::ModByZero => write!(f, "cannot mod zero"),
            Error::EncodingError(msg) => write!(f, "encoding error: {msg}"),
            Error::CryptoError(msg) | Error::LedgerError(msg) | Error::Raised(msg) => {
                write!(f, "{msg}")
            }
        }
    }
}

impl std::error::Error for Error {}

pub mod ast;
pub mod bindings;
pub mod builtinops;
pub mod crypto;
pub mod evaluator;
pub mod ledger;
pub mod lexer;
pub mod params;
pub mod parser;
pub mod section;
pub mod vm;

#[cfg(test)]
mod test_support;

pub use ast::Value;
pub use evaluator::Interpreter;
pub use vm::{ExecMode, LispVm, VmConfig};
