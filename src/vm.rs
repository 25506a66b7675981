//! Host facade
//!
//! A [`LispVm`] binds one [`Interpreter`] to a [`VmContext`] and a [`CryptoSuite`]
//! and turns contract execution into a yes/no verdict. Errors and panics raised
//! while a contract runs never leave [`LispVm::exec`]; they reject the contract
//! and are logged.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::builtinops::install_host_ops;
use crate::crypto::{CRYPTO_OPS, CryptoSuite};
use crate::ledger::{Contract, VmContext};
use crate::{DEFAULT_MAX_STEPS, Error, Interpreter, MAX_EVAL_DEPTH, bindings};

pub const LISP_VM_ID: u32 = 0;
pub const LISP_VM_VERSION: u16 = 1;
pub const LISP_SCRIPT_CODE: u8 = 1;

/// Which ledger primitives a VM exposes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ExecMode {
    /// Validating an invoke message against an asset's contracts
    #[default]
    Contract = 0,
    /// Validating whether one previous output may be spent
    Restrict = 1,
}

impl TryFrom<u8> for ExecMode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Error> {
        match byte {
            0 => Ok(ExecMode::Contract),
            1 => Ok(ExecMode::Restrict),
            other => Err(Error::EncodingError(format!("unknown VM mode {other}"))),
        }
    }
}

impl From<ExecMode> for u8 {
    fn from(mode: ExecMode) -> u8 {
        mode as u8
    }
}

/// Execution settings for one VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Log every top-level form before it runs
    pub debug: bool,
    /// Evaluation steps allowed per program
    pub max_steps: u64,
    /// Nested evaluations allowed, bounding recursion
    pub max_depth: usize,
    pub mode: ExecMode,
}

impl Default for VmConfig {
    fn default() -> Self {
        VmConfig {
            debug: false,
            max_steps: DEFAULT_MAX_STEPS,
            max_depth: MAX_EVAL_DEPTH,
            mode: ExecMode::Contract,
        }
    }
}

impl VmConfig {
    pub fn new(debug: bool, max_steps: u64) -> Self {
        VmConfig {
            debug,
            max_steps,
            ..VmConfig::default()
        }
    }

    pub fn with_mode(mut self, mode: ExecMode) -> Self {
        self.mode = mode;
        self
    }

    /// Parse a JSON object; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json)
            .map_err(|err| Error::EncodingError(format!("invalid VM config: {err}")))
    }
}

/// Contract executor bound to one ledger context
pub struct LispVm {
    config: VmConfig,
    context: Rc<VmContext>,
    crypto: Rc<CryptoSuite>,
    interp: Interpreter,
}

impl LispVm {
    pub fn new(context: VmContext, config: VmConfig, crypto: CryptoSuite) -> Self {
        let context = Rc::new(context);
        let crypto = Rc::new(crypto);
        let interp = bind(&context, &config, &crypto);
        LispVm {
            config,
            context,
            crypto,
            interp,
        }
    }

    pub fn id(&self) -> u32 {
        LISP_VM_ID
    }

    pub fn version(&self) -> u16 {
        LISP_VM_VERSION
    }

    pub fn script_code(&self) -> u8 {
        LISP_SCRIPT_CODE
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn context(&self) -> &VmContext {
        &self.context
    }

    /// The bound interpreter, for hosts that register extra natives
    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    /// Replace context and config
    ///
    /// The interpreter is rebuilt, so definitions left by earlier contracts are
    /// dropped and the primitive set of the new mode is installed.
    pub fn set_env(&mut self, context: VmContext, config: VmConfig) {
        self.context = Rc::new(context);
        self.config = config;
        self.interp = bind(&self.context, &self.config, &self.crypto);
    }

    /// Run a contract; true when its final value is truthy
    #[tracing::instrument(level = "debug", skip_all, fields(contract = %contract.name))]
    pub fn exec(&self, contract: &Contract) -> bool {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.interp.eval(&contract.code)));
        match outcome {
            Ok(Ok(value)) => {
                let verdict = value.is_truthy();
                info!(
                    verdict,
                    steps = self.interp.steps_used(),
                    "contract executed"
                );
                verdict
            }
            Ok(Err(err)) => {
                warn!(error = %err, "execute the contract failed");
                false
            }
            Err(payload) => {
                error!(
                    panic = %panic_message(payload.as_ref()),
                    "contract VM recovered from a panic"
                );
                false
            }
        }
    }
}

/// Fresh interpreter with the crypto primitives and the ledger primitives of the mode
fn bind(context: &Rc<VmContext>, config: &VmConfig, crypto: &Rc<CryptoSuite>) -> Interpreter {
    let interp = Interpreter::with_config(config);
    let count = install_host_ops(interp.root(), CRYPTO_OPS, crypto)
        + bindings::install(interp.root(), context, config.mode);
    debug!(mode = ?config.mode, primitives = count, "bound ledger primitives");
    interp
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_owned()
    }
}
