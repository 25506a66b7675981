//! Ledger records supplied by the host
//!
//! The interpreter never builds these itself: the host hands a [`VmContext`] to
//! [`crate::vm::LispVm`] for each validation attempt and drops it afterwards.
//! Every lookup the bindings perform goes through the accessors here, which
//! report a missing message, index or previous output as [`Error::LedgerError`].

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::Error;
use crate::params::ParamDict;

/// One signer of a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub address: Vec<u8>,
    /// Header-prefixed public key
    pub definition: Vec<u8>,
    /// Signature over the unit's signable hash
    pub authentifiers: Vec<u8>,
}

/// Input of an invoke message, naming the output it spends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInput {
    pub source_unit: Vec<u8>,
    pub source_message: u32,
    pub source_output: u32,
    pub params: ParamDict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractOutput {
    pub amount: u64,
    pub params: ParamDict,
    /// Free-text extension data
    pub extends: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeMessage {
    pub global_params: ParamDict,
    pub inputs: Vec<ContractInput>,
    pub outputs: Vec<ContractOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageBody {
    Invoke(InvokeMessage),
    /// Any message kind contracts cannot inspect
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub payload_hash: Vec<u8>,
    pub body: MessageBody,
}

impl Message {
    pub fn invoke(payload_hash: impl Into<Vec<u8>>, body: InvokeMessage) -> Self {
        Message {
            payload_hash: payload_hash.into(),
            body: MessageBody::Invoke(body),
        }
    }
}

/// The transaction a contract is validated against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub authors: Vec<Author>,
    pub messages: Vec<Message>,
    pub hash: Vec<u8>,
    pub hash_to_sign: Vec<u8>,
}

/// Asset issuance record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueMessage {
    pub cap: i64,
    pub fixed_denominations: bool,
    pub denominations: Vec<u64>,
    pub contracts: Vec<ContractDef>,
    /// Parallel to `allocation_amount`
    pub allocation_addr: Vec<Vec<u8>>,
    pub allocation_amount: Vec<u64>,
    pub note: Vec<u8>,
    pub publisher_address: Vec<u8>,
}

impl IssueMessage {
    /// Initial allocation of `address`, zero when it received none
    pub fn allocation(&self, address: &[u8]) -> u64 {
        self.allocation_addr
            .iter()
            .position(|addr| addr == address)
            .and_then(|index| self.allocation_amount.get(index).copied())
            .unwrap_or(0)
    }
}

/// A deployed contract program
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub name: String,
    pub version: u16,
    pub script_code: u8,
    pub is_restrict: bool,
    pub code: Vec<u8>,
    pub params: ParamDict,
}

impl Contract {
    pub fn new(name: impl Into<String>, code: impl Into<Vec<u8>>) -> Self {
        Contract {
            name: name.into(),
            version: crate::vm::LISP_VM_VERSION,
            script_code: crate::vm::LISP_SCRIPT_CODE,
            code: code.into(),
            ..Contract::default()
        }
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.params.add(key, value);
    }

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(encoding_error)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        bincode::deserialize(bytes).map_err(encoding_error)
    }

    /// SHA-256 of the serialized contract
    pub fn address(&self) -> Result<[u8; 32], Error> {
        Ok(Sha256::digest(self.serialize()?).into())
    }
}

/// A contract bound to an asset with its parameter values
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDef {
    pub address: Vec<u8>,
    pub params: ParamDict,
}

impl ContractDef {
    pub fn new(address: impl Into<Vec<u8>>) -> Self {
        ContractDef {
            address: address.into(),
            params: ParamDict::new(),
        }
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.params.add(key, value);
    }

    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        bincode::serialize(self).map_err(encoding_error)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        bincode::deserialize(bytes).map_err(encoding_error)
    }
}

fn encoding_error(err: bincode::Error) -> Error {
    Error::EncodingError(err.to_string())
}

/// Host callback resolving an input to the output it spends
pub type PrevOutResolver = Rc<dyn Fn(&ContractInput) -> Option<ContractOutput>>;

/// Everything one contract execution may read
#[derive(Clone, Default)]
pub struct VmContext {
    pub unit: Unit,
    /// Index of the invoking message within `unit.messages`
    pub msg_index: usize,
    pub asset: IssueMessage,
    pub mci: u64,
    pub fetch_prev_out: Option<PrevOutResolver>,
    pub contract_def: ContractDef,
    /// Restrict mode only: the input being validated
    pub input: Option<ContractInput>,
    /// Restrict mode only: the output `input` spends
    pub prev_out: Option<ContractOutput>,
}

impl fmt::Debug for VmContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VmContext")
            .field("unit", &self.unit)
            .field("msg_index", &self.msg_index)
            .field("asset", &self.asset)
            .field("mci", &self.mci)
            .field("fetch_prev_out", &self.fetch_prev_out.is_some())
            .field("contract_def", &self.contract_def)
            .field("input", &self.input)
            .field("prev_out", &self.prev_out)
            .finish()
    }
}

/// Element `index` of `items`, or a ledger error naming `what`
pub(crate) fn nth<'a, T>(items: &'a [T], index: i64, what: &str) -> Result<&'a T, Error> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or_else(|| {
            Error::ledger(format!(
                "{what} index {index} out of range ({} available)",
                items.len()
            ))
        })
}

impl VmContext {
    pub fn new(unit: Unit, msg_index: usize, asset: IssueMessage, mci: u64) -> Self {
        VmContext {
            unit,
            msg_index,
            asset,
            mci,
            ..VmContext::default()
        }
    }

    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&ContractInput) -> Option<ContractOutput> + 'static,
    {
        self.fetch_prev_out = Some(Rc::new(resolver));
        self
    }

    pub fn with_contract_def(mut self, contract_def: ContractDef) -> Self {
        self.contract_def = contract_def;
        self
    }

    /// Scope the context to one input and the output it spends
    pub fn with_restrict(mut self, input: ContractInput, prev_out: ContractOutput) -> Self {
        self.input = Some(input);
        self.prev_out = Some(prev_out);
        self
    }

    /// The message that invoked the contract
    pub fn current_message(&self) -> Result<&Message, Error> {
        self.unit.messages.get(self.msg_index).ok_or_else(|| {
            Error::ledger(format!(
                "message index {} out of range ({} messages)",
                self.msg_index,
                self.unit.messages.len()
            ))
        })
    }

    pub fn invoke_message(&self) -> Result<&InvokeMessage, Error> {
        match &self.current_message()?.body {
            MessageBody::Invoke(invoke) => Ok(invoke),
            MessageBody::Other => Err(Error::ledger(format!(
                "message {} is not an invoke message",
                self.msg_index
            ))),
        }
    }

    pub fn author(&self, index: i64) -> Result<&Author, Error> {
        nth(&self.unit.authors, index, "author")
    }

    pub fn input_at(&self, index: i64) -> Result<&ContractInput, Error> {
        nth(&self.invoke_message()?.inputs, index, "input")
    }

    pub fn output_at(&self, index: i64) -> Result<&ContractOutput, Error> {
        nth(&self.invoke_message()?.outputs, index, "output")
    }

    /// Resolve the output an input spends through the host callback
    pub fn prev_out_of(&self, input: &ContractInput) -> Result<ContractOutput, Error> {
        let resolver = self
            .fetch_prev_out
            .as_ref()
            .ok_or_else(|| Error::ledger("no previous output resolver"))?;
        resolver(input).ok_or_else(|| Error::ledger("previous output not found"))
    }

    pub fn restrict_input(&self) -> Result<&ContractInput, Error> {
        self.input
            .as_ref()
            .ok_or_else(|| Error::ledger("no input in restrict context"))
    }

    pub fn restrict_prev_out(&self) -> Result<&ContractOutput, Error> {
        self.prev_out
            .as_ref()
            .ok_or_else(|| Error::ledger("no previous output in restrict context"))
    }
}
