use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use crate::ast::{Lambda, Native, Value};
use crate::builtinops::install_builtins;
use crate::parser::parse;
use crate::section::Section;
use crate::vm::VmConfig;
use crate::{Error, ParseError};

/// Label of the scopes opened by `loop`, `while`, `until` and `for`; the target of `return`
pub const LOOP_LABEL: &str = "0";

/// Function name given to closures created by `lambda`
pub const LAMBDA_LABEL: &str = "1";

/// Process-unique scope identity, used as the target of an unwinding `return`
pub type ScopeId = u64;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

struct ScopeData {
    id: ScopeId,
    label: String,
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Scope>,
}

/// Lexical scope: a binding table chained to its parent
///
/// Scopes are shared handles. Closures keep their defining scope alive after the
/// call that created it has returned.
#[derive(Clone)]
pub struct Scope(Rc<ScopeData>);

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.0.id)
            .field("label", &self.0.label)
            .field("bindings", &self.0.bindings.borrow().len())
            .finish()
    }
}

impl Scope {
    /// A scope with no parent
    pub fn root() -> Self {
        Self::with_parent(None, "")
    }

    fn with_parent(parent: Option<Scope>, label: &str) -> Self {
        Scope(Rc::new(ScopeData {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            label: label.to_owned(),
            bindings: RefCell::new(HashMap::new()),
            parent,
        }))
    }

    pub fn child(&self, label: &str) -> Scope {
        Self::with_parent(Some(self.clone()), label)
    }

    pub fn id(&self) -> ScopeId {
        self.0.id
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.0.parent.is_none()
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// This scope followed by every enclosing scope up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = &Scope> {
        std::iter::successors(Some(self), |scope| scope.parent())
    }

    /// Resolve a name through the scope chain
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.ancestors()
            .find_map(|scope| scope.0.bindings.borrow().get(name).cloned())
    }

    /// Whether this scope itself binds `name`
    pub fn owns(&self, name: &str) -> bool {
        self.0.bindings.borrow().contains_key(name)
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.0.bindings.borrow_mut().remove(name)
    }

    pub fn clear(&self) {
        self.0.bindings.borrow_mut().clear();
    }

    /// Names bound directly in this scope, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.bindings.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Scope that `setq`, `defun` and `defmacro` bind into: the nearest scope that
    /// already owns `name`, or the direct child of the root when none does
    pub(crate) fn binding_target(&self, name: &str) -> Scope {
        self.ancestors()
            .find(|scope| scope.owns(name) || scope.parent().is_some_and(Scope::is_root))
            .unwrap_or(self)
            .clone()
    }

    /// Nearest non-root scope that owns `name`
    pub(crate) fn owner_below_root(&self, name: &str) -> Option<Scope> {
        self.ancestors()
            .take_while(|scope| !scope.is_root())
            .find(|scope| scope.owns(name))
            .cloned()
    }

    /// Nearest scope (this one included) whose label is `label`, never the root
    pub(crate) fn find_label(&self, label: &str) -> Option<&Scope> {
        self.ancestors()
            .take_while(|scope| !scope.is_root())
            .find(|scope| scope.label() == label)
    }
}

/// Non-local outcome of an evaluation step
///
/// `Return` carries a value to the frame that owns the target scope; every frame in
/// between passes it upward unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Unwind {
    Error(Error),
    Return { target: ScopeId, value: Value },
}

impl From<Error> for Unwind {
    fn from(err: Error) -> Self {
        Unwind::Error(err)
    }
}

impl From<ParseError> for Unwind {
    fn from(err: ParseError) -> Self {
        Unwind::Error(Error::ParseError(err))
    }
}

pub type EvalResult<T = Value> = Result<T, Unwind>;

/// Turn a return aimed at `scope` into that scope's value
pub(crate) fn settle(scope: &Scope, result: EvalResult) -> EvalResult {
    match result {
        Err(Unwind::Return { target, value }) if target == scope.id() => Ok(value),
        other => other,
    }
}

/// Calling context handed to natives
pub struct Frame<'a> {
    interp: &'a Interpreter,
    scope: &'a Scope,
    depth: usize,
}

impl<'a> Frame<'a> {
    pub fn scope(&self) -> &Scope {
        self.scope
    }

    pub fn interpreter(&self) -> &Interpreter {
        self.interp
    }

    /// Evaluate one argument in the caller's scope
    pub fn eval(&self, expr: &Value) -> EvalResult {
        self.interp.exec_in(expr, self.scope, self.depth + 1)
    }

    /// Evaluate every argument in order, stopping at the first failure
    pub fn eval_all(&self, exprs: &[Value]) -> EvalResult<Vec<Value>> {
        exprs.iter().map(|expr| self.eval(expr)).collect()
    }

    /// Evaluate one expression in another scope at this frame's depth
    pub fn eval_in(&self, expr: &Value, scope: &Scope) -> EvalResult {
        self.interp.exec_in(expr, scope, self.depth + 1)
    }

    /// Run a body in `scope`, yielding the last value (Nothing for an empty body)
    pub fn run_body(&self, body: &[Value], scope: &Scope) -> EvalResult {
        self.interp.run_body(body, scope, self.depth + 1)
    }

    /// Scan, parse and execute source text in the caller's scope
    pub fn eval_source(&self, source: &[u8]) -> EvalResult {
        let forms = parse(source)?;
        self.run_body(&forms, self.scope)
    }
}

/// Keep at least this much stack free before descending (100KB)
const RED_ZONE: usize = 100 * 1024;

/// Stack allocated each time the red zone is reached (1MB)
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f` on a stack with room for another level of evaluation
#[inline]
#[cfg(not(target_arch = "wasm32"))]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// A contract-language interpreter instance
///
/// Every instance owns its root scope (natives) and a program scope below it where
/// top-level definitions live, so interpreters never share mutable state.
pub struct Interpreter {
    root: Scope,
    program: Scope,
    max_steps: u64,
    max_depth: usize,
    debug: bool,
    steps: Cell<u64>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(&VmConfig::default())
    }

    /// Interpreter with the common primitives and the limits from `config`
    pub fn with_config(config: &VmConfig) -> Self {
        let root = Scope::root();
        let count = install_builtins(&root);
        let program = root.child("");
        debug!(
            natives = count,
            mode = ?config.mode,
            max_steps = config.max_steps,
            max_depth = config.max_depth,
            "created interpreter"
        );
        Interpreter {
            root,
            program,
            max_steps: config.max_steps,
            max_depth: config.max_depth,
            debug: config.debug,
            steps: Cell::new(0),
        }
    }

    /// Scope holding the natives
    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Scope holding top-level definitions
    pub fn program(&self) -> &Scope {
        &self.program
    }

    /// Add or replace a native in this instance's root scope
    pub fn register(&self, native: Native) {
        self.root
            .define(native.name().to_owned(), Value::Native(native));
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.program.define(name, value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.program.lookup(name)
    }

    /// Steps charged since the last top-level call
    pub fn steps_used(&self) -> u64 {
        self.steps.get()
    }

    /// Scan, parse and execute a program, returning the value of its last form
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
    pub fn eval(&self, source: &[u8]) -> Result<Value, Error> {
        self.steps.set(0);
        let forms = parse(source)?;
        self.run_top_level(&forms)
    }

    /// Execute a single already-parsed expression in the program scope
    pub fn exec(&self, expr: &Value) -> Result<Value, Error> {
        self.steps.set(0);
        self.run_top_level(std::slice::from_ref(expr))
    }

    /// Read a program from `path` (or `path.lsp`) and evaluate it
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Value, Error> {
        let source = read_source(path.as_ref())?;
        self.eval(&source)
    }

    fn run_top_level(&self, forms: &[Value]) -> Result<Value, Error> {
        let mut last = Value::Nothing;
        for form in forms {
            if self.debug {
                debug!(form = %form, "executing top-level form");
            }
            last = match self.exec_in(form, &self.program, 0) {
                Ok(value) => value,
                // A return whose target frame already finished ends only this form
                Err(Unwind::Return { value, .. }) => value,
                Err(Unwind::Error(err)) => return Err(err),
            };
        }
        Ok(last)
    }

    fn run_body(&self, body: &[Value], scope: &Scope, depth: usize) -> EvalResult {
        let mut last = Value::Nothing;
        for expr in body {
            last = self.exec_in(expr, scope, depth)?;
        }
        Ok(last)
    }

    fn charge_step(&self) -> Result<(), Error> {
        let used = self.steps.get() + 1;
        self.steps.set(used);
        if used > self.max_steps {
            warn!(max_steps = self.max_steps, "step limit exceeded");
            return Err(Error::EvalError(format!(
                "step limit exceeded (max: {})",
                self.max_steps
            )));
        }
        Ok(())
    }

    pub(crate) fn exec_in(&self, expr: &Value, scope: &Scope, depth: usize) -> EvalResult {
        if depth > self.max_depth {
            warn!(depth, "evaluation depth limit exceeded");
            return Err(Error::EvalError(format!(
                "evaluation depth limit exceeded (max: {})",
                self.max_depth
            ))
            .into());
        }
        self.charge_step()?;
        ensure_sufficient_stack(|| self.dispatch(expr, scope, depth))
    }

    fn dispatch(&self, expr: &Value, scope: &Scope, depth: usize) -> EvalResult {

        match expr {
            // Quasi lists are data: their elements are never executed
            Value::QuasiList(items) => Ok(Value::List(items.clone())),
            Value::Symbol(name) => scope
                .lookup(name)
                .ok_or_else(|| Error::UnboundVariable(name.clone()).into()),
            Value::List(items) => self.apply(items, scope, depth),
            other => Ok(other.clone()),
        }
    }

    fn apply(&self, items: &[Value], scope: &Scope, depth: usize) -> EvalResult {
        let Some((head, args)) = items.split_first() else {
            return Ok(Value::FALSE);
        };

        let callee = match head {
            Value::Symbol(name) => scope
                .lookup(name)
                .ok_or_else(|| Error::UnboundVariable(name.clone()))?,
            Value::List(_) => self.exec_in(head, scope, depth + 1)?,
            other => other.clone(),
        };

        match &callee {
            Value::Native(native) => {
                native.arity().validate(args.len()).map_err(|_| {
                    Error::arity_error_with_expr(
                        native.arity(),
                        args.len(),
                        native.name().to_owned(),
                    )
                })?;
                let frame = Frame {
                    interp: self,
                    scope,
                    depth,
                };
                native.call(args, &frame)
            }
            Value::Closure(lambda) => {
                let call = self.open_call(lambda, &callee, args.len())?;
                for (param, arg) in lambda.params.iter().zip(args) {
                    let value = self.exec_in(arg, scope, depth + 1)?;
                    call.define(param.clone(), value);
                }
                settle(&call, self.run_body(&lambda.body, &call, depth + 1))
            }
            Value::Macro(lambda) => {
                let call = self.open_call(lambda, &callee, args.len())?;
                for (param, arg) in lambda.params.iter().zip(args) {
                    call.define(param.clone(), arg.clone());
                }
                let expansion = settle(&call, self.run_body(&lambda.body, &call, depth + 1))?;
                self.exec_in(&expansion, scope, depth + 1)
            }
            other => Err(Error::NotAFunction(other.to_string()).into()),
        }
    }

    /// Check the argument count and open the call scope with `self` bound
    fn open_call(&self, lambda: &Lambda, callee: &Value, argc: usize) -> Result<Scope, Error> {
        if lambda.params.len() != argc {
            return Err(Error::arity_error_with_expr(
                crate::builtinops::Arity::Exact(lambda.params.len()),
                argc,
                lambda.name.clone(),
            ));
        }
        let call = lambda.scope.child(&lambda.name);
        call.define("self", callee.clone());
        Ok(call)
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        // Closures stored in the program scope capture it; clearing breaks the cycle
        self.program.clear();
        self.root.clear();
    }
}

/// Read a source file, retrying with a `.lsp` suffix, and strip comments line by line
pub(crate) fn read_source(path: &Path) -> Result<Vec<u8>, Error> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(_) => {
            let mut fallback = path.as_os_str().to_owned();
            fallback.push(".lsp");
            std::fs::read(&fallback).map_err(|err| {
                Error::EvalError(format!("cannot load {}: {err}", path.display()))
            })?
        }
    };

    let mut section = Section::new();
    for line in data.split_inclusive(|&b| b == b'\n') {
        section.feed(line)?;
    }
    if !section.is_complete() {
        return Err(ParseError::unbalanced().into());
    }
    Ok(section.into_source())
}
