//! Ledger primitives
//!
//! Three [`HostOp`] tables expose a [`VmContext`] to contract programs:
//!
//! - [`SHARED_OPS`]: authors, signatures and hashes of the enclosing unit
//! - [`CONTRACT_OPS`]: the invoking message's inputs, outputs and global
//!   parameters, the resolved previous outputs, the asset record and the bound
//!   contract definition
//! - [`RESTRICT_OPS`]: exactly one input and the previous output it spends
//!
//! Indices must be integers and parameter keys non-empty strings. Byte data is
//! returned as strings; amounts are unsigned on the ledger and reinterpreted as
//! signed integers.
//!
//! ```scheme
//! (> (calcBalance) 0)
//! (= (getCurPrevOutParam "owner") (getAuthorAddr 0))
//! ```

use std::rc::Rc;

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, HostOp, install_host_ops};
use crate::evaluator::{EvalResult, Frame, Scope};
use crate::ledger::{ContractOutput, VmContext, nth};
use crate::params::{ParamDict, decode_param_list};
use crate::vm::ExecMode;

macro_rules! host_ops {
    ($($id:literal / $arity:literal => $func:ident,)*) => {
        &[$(
            HostOp {
                id: $id,
                arity: Arity::Exact($arity),
                func: $func,
            },
        )*]
    };
}

/// Primitives available in both modes
pub const SHARED_OPS: &[HostOp<VmContext>] = host_ops![
    "sigCount" / 0 => sig_count,
    "getPK" / 1 => get_pk,
    "getPKByAddr" / 1 => get_pk_by_addr,
    "getSig" / 1 => get_sig,
    "hasPKByAddr" / 1 => has_pk_by_addr,
    "getAuthorSig" / 1 => get_author_sig,
    "getAuthorAddr" / 1 => get_author_addr,
    "getCurUnitHash" / 0 => get_cur_unit_hash,
    "getCurUnitHashToSign" / 0 => get_cur_unit_hash_to_sign,
    "getCurMsgHash" / 0 => get_cur_msg_hash,
    "getCurrentMCI" / 0 => get_current_mci,
];

pub const CONTRACT_OPS: &[HostOp<VmContext>] = host_ops![
    "inputCount" / 0 => input_count,
    "getInputUnit" / 1 => get_input_unit,
    "getInputMsg" / 1 => get_input_msg,
    "getInputParam" / 2 => get_input_param,
    "getInputParamList" / 2 => get_input_param_list,
    "hasInputParam" / 2 => has_input_param,
    "getInputPreOut" / 1 => get_input_pre_out,
    "getPrevOutAmount" / 1 => get_prev_out_amount,
    "getPrevOutParam" / 2 => get_prev_out_param,
    "getPrevOutParamList" / 2 => get_prev_out_param_list,
    "hasPrevOutParam" / 2 => has_prev_out_param,
    "getPreOutExtends" / 1 => get_pre_out_extends,
    "getOutputAmount" / 1 => get_output_amount,
    "getOutputParam" / 2 => get_output_param,
    "getOutputParamList" / 2 => get_output_param_list,
    "getOutputExtends" / 1 => get_output_extends,
    "globalParamCount" / 0 => global_param_count,
    "getGlobalParam" / 1 => get_global_param,
    "getGlobalParamList" / 1 => get_global_param_list,
    "isExistAtGlobalParam" / 1 => is_exist_at_global_param,
    "isExistAtOutputParam" / 1 => is_exist_at_output_param,
    "isExistAtInputParam" / 1 => is_exist_at_input_param,
    "calcOutputAmount" / 0 => calc_output_amount,
    "calcInputAmount" / 0 => calc_input_amount,
    "calcBalance" / 0 => calc_balance,
    "cap" / 0 => cap,
    "isDenominations" / 0 => is_denominations,
    "getDenominationCount" / 0 => get_denomination_count,
    "getDenomination" / 1 => get_denomination,
    "getAssetContractCount" / 0 => get_asset_contract_count,
    "getAssetContract" / 1 => get_asset_contract,
    "getAllocationsCount" / 0 => get_allocations_count,
    "getAllocationsAddr" / 1 => get_allocations_addr,
    "getAllocationsAmount" / 1 => get_allocations_amount,
    "getAssetExtends" / 0 => get_asset_extends,
    "getPublisherAddr" / 0 => get_publisher_addr,
    "getPublisherUnitMCI" / 0 => get_publisher_unit_mci,
    "getContractParamCount" / 1 => get_contract_param_count,
    "getContractParamName" / 2 => get_contract_param_name,
    "getContractParamByIndex" / 2 => get_contract_param_by_index,
    "getContractParam" / 2 => get_contract_param,
    "getCurContractDefParamCount" / 0 => get_cur_contract_def_param_count,
    "getCurContractDefParamName" / 1 => get_cur_contract_def_param_name,
    "getCurContractDefParam" / 1 => get_cur_contract_def_param,
    "getCurContractDefParamList" / 1 => get_cur_contract_def_param_list,
];

pub const RESTRICT_OPS: &[HostOp<VmContext>] = host_ops![
    "hasCurPrevOutParam" / 1 => has_cur_prev_out_param,
    "getCurPrevOutParam" / 1 => get_cur_prev_out_param,
    "getCurPrevOutParamList" / 1 => get_cur_prev_out_param_list,
    "getCurPrevOutAmount" / 0 => get_cur_prev_out_amount,
    "getCurPrevOutExtends" / 0 => get_cur_prev_out_extends,
    "getCurInputParam" / 1 => get_cur_input_param,
    "hasCurInputParam" / 1 => has_cur_input_param,
    "getCurInputParamsCount" / 0 => get_cur_input_params_count,
    "getCurInputUnit" / 0 => get_cur_input_unit,
    "getCurInputMsg" / 0 => get_cur_input_msg,
    "getCurInputOutput" / 0 => get_cur_input_output,
];

/// The ledger primitives of `mode`
pub fn mode_ops(mode: ExecMode) -> &'static [HostOp<VmContext>] {
    match mode {
        ExecMode::Contract => CONTRACT_OPS,
        ExecMode::Restrict => RESTRICT_OPS,
    }
}

/// Bind the shared primitives and those of `mode` into `scope`
pub fn install(scope: &Scope, context: &Rc<VmContext>, mode: ExecMode) -> usize {
    install_host_ops(scope, SHARED_OPS, context) + install_host_ops(scope, mode_ops(mode), context)
}

//
// Argument and result helpers
//

const INPUT_PARAM_INT_ERROR: &str = "input param is not int";
const CONTENT_INT_ERROR: &str = "content is not int";
const CONTENT_STRING_ERROR: &str = "content is not string";
const AUTHOR_INDEX_ERROR: &str = "the author index is not int";
const CONTRACT_INDEX_ERROR: &str = "input smart contract index is not integer";
const PARAM_KEY_STRING_ERROR: &str = "input paramKey is not string";
const PARAM_KEY_EMPTY_ERROR: &str = "input paramKey is empty";

fn int_arg(frame: &Frame<'_>, expr: &Value, not_int: &str) -> EvalResult<i64> {
    match frame.eval(expr)? {
        Value::Integer(n) => Ok(n),
        _ => Err(Error::type_error(not_int).into()),
    }
}

fn bytes_arg(frame: &Frame<'_>, expr: &Value, not_string: &str, empty: &str) -> EvalResult<Vec<u8>> {
    match frame.eval(expr)? {
        Value::String(bytes) if bytes.is_empty() => Err(Error::ledger(empty).into()),
        Value::String(bytes) => Ok(bytes),
        _ => Err(Error::type_error(not_string).into()),
    }
}

/// A parameter key: a non-empty string
fn key_arg(frame: &Frame<'_>, expr: &Value, not_string: &str, empty: &str) -> EvalResult<String> {
    let bytes = bytes_arg(frame, expr, not_string, empty)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn bytes(data: &[u8]) -> Value {
    Value::string(data.to_vec())
}

fn count(n: usize) -> Value {
    Value::Integer(n as i64)
}

/// Ledger amounts are unsigned; contracts see the same bits as a signed integer
fn amount(value: u64) -> Value {
    Value::Integer(value as i64)
}

fn param_list(packed: &[u8]) -> EvalResult {
    let items = decode_param_list(packed)?;
    Ok(Value::List(items.into_iter().map(Value::String).collect()))
}

fn param_of(params: &ParamDict, key: &str, missing: &str) -> Result<Vec<u8>, Error> {
    params
        .find(key)
        .and_then(|index| params.value_at(index))
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::ledger(missing))
}

//
// Shared
//

fn sig_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.unit.authors.len()))
}

fn get_pk(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], AUTHOR_INDEX_ERROR)?;
    Ok(bytes(&ctx.author(index)?.definition))
}

fn get_pk_by_addr(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let address = bytes_arg(
        frame,
        &args[0],
        "get pk by address is not string",
        "get pk by address is empty",
    )?;
    ctx.unit
        .authors
        .iter()
        .find(|author| author.address == address)
        .map(|author| bytes(&author.definition))
        .ok_or_else(|| Error::ledger("getPKByAddr failed").into())
}

fn get_sig(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let public_key = bytes_arg(frame, &args[0], "getSig is not string", "getSig is empty")?;
    ctx.unit
        .authors
        .iter()
        .find(|author| author.definition == public_key)
        .map(|author| bytes(&author.authentifiers))
        .ok_or_else(|| Error::ledger("not find the PK in the unit").into())
}

fn has_pk_by_addr(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let address = bytes_arg(
        frame,
        &args[0],
        "pk by address is not string",
        "get pk by address empty",
    )?;
    let found = ctx.unit.authors.iter().any(|author| author.address == address);
    Ok(Value::from(found))
}

fn get_author_sig(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], AUTHOR_INDEX_ERROR)?;
    Ok(bytes(&ctx.author(index)?.authentifiers))
}

fn get_author_addr(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], AUTHOR_INDEX_ERROR)?;
    Ok(bytes(&ctx.author(index)?.address))
}

fn get_cur_unit_hash(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.unit.hash))
}

fn get_cur_unit_hash_to_sign(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.unit.hash_to_sign))
}

fn get_cur_msg_hash(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.current_message()?.payload_hash))
}

fn get_current_mci(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(amount(ctx.mci))
}

//
// Contract mode: inputs and the outputs they spend
//

fn input_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.invoke_message()?.inputs.len()))
}

fn get_input_unit(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], "getInputUnit is not int")?;
    Ok(bytes(&ctx.input_at(index)?.source_unit))
}

fn get_input_msg(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], INPUT_PARAM_INT_ERROR)?;
    Ok(Value::from(ctx.input_at(index)?.source_message))
}

/// `(index key)` arguments of the per-input parameter lookups
fn input_key_args(args: &[Value], frame: &Frame<'_>) -> EvalResult<(i64, String)> {
    let index = int_arg(frame, &args[0], INPUT_PARAM_INT_ERROR)?;
    let key = key_arg(frame, &args[1], "input name is not string", "input name is empty")?;
    Ok((index, key))
}

fn get_input_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = input_key_args(args, frame)?;
    Ok(bytes(ctx.input_at(index)?.params.get(&key)))
}

fn get_input_param_list(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = input_key_args(args, frame)?;
    param_list(ctx.input_at(index)?.params.get(&key))
}

/// `(index key)` arguments of the existence checks
fn has_param_args(args: &[Value], frame: &Frame<'_>) -> EvalResult<(i64, String)> {
    let index = int_arg(frame, &args[0], "param is not int")?;
    let key = key_arg(frame, &args[1], "param is not string", "param is empty")?;
    Ok((index, key))
}

fn has_input_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = has_param_args(args, frame)?;
    Ok(Value::from(ctx.input_at(index)?.params.contains(&key)))
}

fn get_input_pre_out(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    Ok(Value::from(ctx.input_at(index)?.source_output))
}

/// The previous output spent by input `index`
fn prev_out(ctx: &VmContext, index: i64) -> Result<ContractOutput, Error> {
    ctx.prev_out_of(ctx.input_at(index)?)
}

fn get_prev_out_amount(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    Ok(amount(prev_out(ctx, index)?.amount))
}

fn prev_out_key_args(args: &[Value], frame: &Frame<'_>) -> EvalResult<(i64, String)> {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    let key = key_arg(frame, &args[1], CONTENT_STRING_ERROR, "pre index is empty")?;
    Ok((index, key))
}

fn get_prev_out_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = prev_out_key_args(args, frame)?;
    Ok(bytes(prev_out(ctx, index)?.params.get(&key)))
}

fn get_prev_out_param_list(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = prev_out_key_args(args, frame)?;
    param_list(prev_out(ctx, index)?.params.get(&key))
}

fn has_prev_out_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = has_param_args(args, frame)?;
    Ok(Value::from(prev_out(ctx, index)?.params.contains(&key)))
}

fn get_pre_out_extends(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    Ok(bytes(&prev_out(ctx, index)?.extends))
}

//
// Contract mode: outputs and global parameters
//

fn get_output_amount(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    Ok(amount(ctx.output_at(index)?.amount))
}

fn output_key_args(args: &[Value], frame: &Frame<'_>) -> EvalResult<(i64, String)> {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    let key = key_arg(frame, &args[1], CONTENT_STRING_ERROR, "pre index is nil")?;
    Ok((index, key))
}

fn get_output_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = output_key_args(args, frame)?;
    Ok(bytes(ctx.output_at(index)?.params.get(&key)))
}

fn get_output_param_list(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let (index, key) = output_key_args(args, frame)?;
    param_list(ctx.output_at(index)?.params.get(&key))
}

fn get_output_extends(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], CONTENT_INT_ERROR)?;
    Ok(bytes(&ctx.output_at(index)?.extends))
}

fn global_param_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.invoke_message()?.global_params.len()))
}

fn global_key_arg(args: &[Value], frame: &Frame<'_>) -> EvalResult<String> {
    key_arg(
        frame,
        &args[0],
        "getGlobalParam is not string",
        "getGlobalParam is empty",
    )
}

fn get_global_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = global_key_arg(args, frame)?;
    Ok(bytes(ctx.invoke_message()?.global_params.get(&key)))
}

fn get_global_param_list(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = global_key_arg(args, frame)?;
    param_list(ctx.invoke_message()?.global_params.get(&key))
}

fn is_exist_at_global_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = key_arg(
        frame,
        &args[0],
        "input key index is not a string",
        "the key is nil",
    )?;
    Ok(Value::from(ctx.invoke_message()?.global_params.contains(&key)))
}

fn is_exist_at_output_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = key_arg(
        frame,
        &args[0],
        "isExistAtOutputParam: key is not string",
        "isExistAtOutputParam: key is empty",
    )?;
    let outputs = &ctx.invoke_message()?.outputs;
    Ok(Value::from(outputs.iter().any(|output| output.params.contains(&key))))
}

fn is_exist_at_input_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = key_arg(
        frame,
        &args[0],
        "isExistAtInputParam: key is not string",
        "isExistAtInputParam: key is empty",
    )?;
    let inputs = &ctx.invoke_message()?.inputs;
    Ok(Value::from(inputs.iter().any(|input| input.params.contains(&key))))
}

//
// Contract mode: amount totals
//

fn total_output(ctx: &VmContext) -> Result<u64, Error> {
    let outputs = &ctx.invoke_message()?.outputs;
    Ok(outputs
        .iter()
        .fold(0u64, |total, output| total.wrapping_add(output.amount)))
}

fn total_input(ctx: &VmContext) -> Result<u64, Error> {
    ctx.invoke_message()?
        .inputs
        .iter()
        .try_fold(0u64, |total, input| {
            Ok(total.wrapping_add(ctx.prev_out_of(input)?.amount))
        })
}

fn calc_output_amount(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(amount(total_output(ctx)?))
}

fn calc_input_amount(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(amount(total_input(ctx)?))
}

/// Inputs minus outputs; negative when the message spends more than it consumes
fn calc_balance(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let balance = total_input(ctx)?.wrapping_sub(total_output(ctx)?);
    Ok(amount(balance))
}

//
// Contract mode: asset record
//

fn cap(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(Value::Integer(ctx.asset.cap))
}

fn is_denominations(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(Value::from(ctx.asset.fixed_denominations))
}

fn get_denomination_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.asset.denominations.len()))
}

fn get_denomination(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], "input asset index is not a Integer")?;
    Ok(amount(*nth(&ctx.asset.denominations, index, "denomination")?))
}

fn get_asset_contract_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.asset.contracts.len()))
}

fn get_asset_contract(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], CONTRACT_INDEX_ERROR)?;
    Ok(bytes(&nth(&ctx.asset.contracts, index, "asset contract")?.address))
}

fn get_allocations_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.asset.allocation_amount.len()))
}

fn get_allocations_addr(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(frame, &args[0], "input AllocationAddr index is not a Integer")?;
    Ok(bytes(nth(&ctx.asset.allocation_addr, index, "allocation")?))
}

fn get_allocations_amount(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let address = bytes_arg(
        frame,
        &args[0],
        "get allocation amount: input param(allocation address) is not string",
        "the address is nil",
    )?;
    Ok(amount(ctx.asset.allocation(&address)))
}

fn get_asset_extends(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.asset.note))
}

fn get_publisher_addr(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.asset.publisher_address))
}

fn get_publisher_unit_mci(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(amount(ctx.mci))
}

//
// Contract mode: contracts bound to the asset
//

fn asset_contract_params<'a>(
    args: &[Value],
    frame: &Frame<'_>,
    ctx: &'a VmContext,
) -> EvalResult<&'a ParamDict> {
    let index = int_arg(frame, &args[0], CONTRACT_INDEX_ERROR)?;
    Ok(&nth(&ctx.asset.contracts, index, "asset contract")?.params)
}

fn get_contract_param_count(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(asset_contract_params(args, frame, ctx)?.len()))
}

fn get_contract_param_name(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let params = asset_contract_params(args, frame, ctx)?;
    let index = int_arg(
        frame,
        &args[1],
        "input smart contract ParamsKey index is not a Integer",
    )?;
    let key = usize::try_from(index).ok().and_then(|i| params.key_at(i));
    key.map(Value::from)
        .ok_or_else(|| Error::ledger(format!("parameter index {index} out of range")).into())
}

fn get_contract_param_by_index(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let params = asset_contract_params(args, frame, ctx)?;
    let index = int_arg(
        frame,
        &args[1],
        "input smart contract ParamsValue index is not a Integer",
    )?;
    let value = usize::try_from(index).ok().and_then(|i| params.value_at(i));
    value
        .map(bytes)
        .ok_or_else(|| Error::ledger(format!("parameter index {index} out of range")).into())
}

fn get_contract_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let params = asset_contract_params(args, frame, ctx)?;
    let key = key_arg(
        frame,
        &args[1],
        "input smart contract ParamsKey is not a string",
        "the ParamsKey is nil",
    )?;
    Ok(bytes(params.get(&key)))
}

//
// Contract mode: the contract definition being executed
//

fn get_cur_contract_def_param_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.contract_def.params.len()))
}

fn get_cur_contract_def_param_name(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let index = int_arg(
        frame,
        &args[0],
        "get asset parameter name the index is not int",
    )?;
    let key = usize::try_from(index)
        .ok()
        .and_then(|i| ctx.contract_def.params.key_at(i));
    key.map(Value::from)
        .ok_or_else(|| Error::ledger(format!("parameter index {index} out of range")).into())
}

fn contract_def_key_arg(args: &[Value], frame: &Frame<'_>) -> EvalResult<String> {
    key_arg(
        frame,
        &args[0],
        "input smart contract index is not a string",
        "the name is nil",
    )
}

fn get_cur_contract_def_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = contract_def_key_arg(args, frame)?;
    Ok(bytes(ctx.contract_def.params.get(&key)))
}

fn get_cur_contract_def_param_list(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = contract_def_key_arg(args, frame)?;
    param_list(ctx.contract_def.params.get(&key))
}

//
// Restrict mode
//

fn restrict_key_arg(args: &[Value], frame: &Frame<'_>) -> EvalResult<String> {
    key_arg(frame, &args[0], PARAM_KEY_STRING_ERROR, PARAM_KEY_EMPTY_ERROR)
}

fn has_cur_prev_out_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = restrict_key_arg(args, frame)?;
    Ok(Value::from(ctx.restrict_prev_out()?.params.contains(&key)))
}

fn get_cur_prev_out_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = restrict_key_arg(args, frame)?;
    let value = param_of(&ctx.restrict_prev_out()?.params, &key, "getCurPrevOutParam failed")?;
    Ok(Value::String(value))
}

fn get_cur_prev_out_param_list(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = restrict_key_arg(args, frame)?;
    let value = param_of(&ctx.restrict_prev_out()?.params, &key, "getCurPrevOutParam failed")?;
    param_list(&value)
}

fn get_cur_prev_out_amount(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(amount(ctx.restrict_prev_out()?.amount))
}

fn get_cur_prev_out_extends(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.restrict_prev_out()?.extends))
}

fn get_cur_input_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = restrict_key_arg(args, frame)?;
    let value = param_of(&ctx.restrict_input()?.params, &key, "getCurInputParam failed")?;
    Ok(Value::String(value))
}

fn has_cur_input_param(args: &[Value], frame: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    let key = restrict_key_arg(args, frame)?;
    Ok(Value::from(ctx.restrict_input()?.params.contains(&key)))
}

fn get_cur_input_params_count(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(count(ctx.restrict_input()?.params.len()))
}

fn get_cur_input_unit(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(bytes(&ctx.restrict_input()?.source_unit))
}

fn get_cur_input_msg(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(Value::from(ctx.restrict_input()?.source_message))
}

fn get_cur_input_output(_: &[Value], _: &Frame<'_>, ctx: &VmContext) -> EvalResult {
    Ok(Value::from(ctx.restrict_input()?.source_output))
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::Interpreter;
    use crate::ast::val;
    use crate::ledger::{IssueMessage, Unit};
    use crate::test_support::*;
    use pretty_assertions::assert_eq;

    fn interpreter(ctx: VmContext, mode: ExecMode) -> Interpreter {
        let interp = Interpreter::new();
        install(interp.root(), &Rc::new(ctx), mode);
        interp
    }

    fn run_cases(interp: &Interpreter, label: &str, cases: Vec<(&str, TestResult)>) {
        for (i, (input, expected)) in cases.iter().enumerate() {
            execute_test_case(input, expected, interp, &format!("{label} #{}", i + 1));
        }
    }

    #[test]
    fn test_tables() {
        let mut ids: Vec<&str> = [SHARED_OPS, CONTRACT_OPS, RESTRICT_OPS]
            .iter()
            .flat_map(|ops| ops.iter().map(|op| op.id))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
        assert_eq!(mode_ops(ExecMode::Restrict).len(), 11);

        let interp = Interpreter::new();
        let ctx = Rc::new(sample_context());
        assert_eq!(
            install(interp.root(), &ctx, ExecMode::Contract),
            SHARED_OPS.len() + CONTRACT_OPS.len()
        );
    }

    #[test]
    fn test_shared_primitives() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        let alice_key = encoded_key(0, b"alice");
        let bob_sig = sign(b"bob", b"unit-sign-hash");

        assert_eq!(interp.eval(b"(getPK 0)").unwrap(), Value::string(alice_key.clone()));
        assert_eq!(
            interp.eval(b"(getPKByAddr \"addr1\")").unwrap(),
            Value::string(alice_key)
        );
        assert_eq!(interp.eval(b"(getSig (getPK 1))").unwrap(), Value::string(bob_sig.clone()));
        assert_eq!(interp.eval(b"(getAuthorSig 1)").unwrap(), Value::string(bob_sig));

        run_cases(
            &interp,
            "shared",
            vec![
                ("(sigCount)", success(2)),
                ("(getAuthorAddr 1)", success("addr2")),
                ("(hasPKByAddr \"addr2\")", success(1)),
                ("(hasPKByAddr \"nobody\")", success(Value::FALSE)),
                ("(getCurUnitHash)", success("unit-hash")),
                ("(getCurUnitHashToSign)", success("unit-sign-hash")),
                ("(getCurMsgHash)", success("m1")),
                ("(getCurrentMCI)", success(42)),
                ("(getPK \"0\")", SpecificError("the author index is not int")),
                ("(getPK 2)", SpecificError("author index 2 out of range")),
                ("(getPK -1)", SpecificError("out of range")),
                ("(getPKByAddr 1)", SpecificError("get pk by address is not string")),
                ("(getPKByAddr \"\")", SpecificError("get pk by address is empty")),
                ("(getPKByAddr \"nobody\")", SpecificError("getPKByAddr failed")),
                ("(getSig \"\")", SpecificError("getSig is empty")),
                ("(getSig \"junk\")", SpecificError("not find the PK in the unit")),
                ("(hasPKByAddr \"\")", SpecificError("get pk by address empty")),
                ("(getAuthorAddr \"x\")", SpecificError("the author index is not int")),
                ("(sigCount 1)", SpecificError("wrong parameter number")),
                ("(getPK)", SpecificError("wrong parameter number")),
            ],
        );
    }

    #[test]
    fn test_input_primitives() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        run_cases(
            &interp,
            "inputs",
            vec![
                ("(inputCount)", success(2)),
                ("(getInputUnit 1)", success("u1")),
                ("(getInputMsg 0)", success(2)),
                ("(getInputPreOut 0)", success(3)),
                ("(getInputParam 1 \"memo\")", success("hi")),
                ("(getInputParam 1 \"absent\")", success("")),
                ("(hasInputParam 0 \"sig\")", success(1)),
                ("(hasInputParam 0 \"memo\")", success(Value::FALSE)),
                ("(getInputParamList 1 \"bad\")", SpecificError("paramLen is too long")),
                ("(getInputParamList 1 \"absent\")", success(Value::FALSE)),
                ("(getInputUnit \"1\")", SpecificError("getInputUnit is not int")),
                ("(getInputMsg \"0\")", SpecificError("input param is not int")),
                ("(getInputParam 0 5)", SpecificError("input name is not string")),
                ("(getInputParam 0 \"\")", SpecificError("input name is empty")),
                ("(getInputParam 5 \"sig\")", SpecificError("input index 5 out of range")),
                ("(hasInputParam \"0\" \"sig\")", SpecificError("param is not int")),
                ("(hasInputParam 0 1)", SpecificError("param is not string")),
                ("(hasInputParam 0 \"\")", SpecificError("param is empty")),
                ("(getInputPreOut \"0\")", SpecificError("content is not int")),
            ],
        );
    }

    #[test]
    fn test_prev_out_primitives() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        assert_eq!(
            interp.eval(b"(getPrevOutParamList 0 \"hops\")").unwrap(),
            val(["p", "q"])
        );
        run_cases(
            &interp,
            "prevout",
            vec![
                ("(getPrevOutAmount 0)", success(60)),
                ("(getPrevOutAmount 1)", success(40)),
                ("(getPrevOutParam 1 \"owner\")", success("bob")),
                ("(hasPrevOutParam 0 \"hops\")", success(1)),
                ("(hasPrevOutParam 1 \"hops\")", success(Value::FALSE)),
                ("(getPreOutExtends 1)", success("pe1")),
                ("(getPrevOutParam 0 1)", SpecificError("content is not string")),
                ("(getPrevOutParam 0 \"\")", SpecificError("pre index is empty")),
                ("(getPrevOutParam \"0\" \"owner\")", SpecificError("content is not int")),
                ("(getPrevOutAmount 9)", SpecificError("out of range")),
            ],
        );

        // a resolver that knows nothing
        let ctx = sample_context().with_resolver(|_| None);
        let interp = interpreter(ctx, ExecMode::Contract);
        run_cases(
            &interp,
            "unresolved",
            vec![
                ("(getPrevOutAmount 0)", SpecificError("previous output not found")),
                ("(calcInputAmount)", SpecificError("previous output not found")),
            ],
        );
    }

    #[test]
    fn test_output_and_global_primitives() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        assert_eq!(
            interp.eval(b"(getGlobalParamList \"tags\")").unwrap(),
            val(["a", "bc"])
        );
        assert_eq!(
            interp.eval(b"(getOutputParamList 0 \"path\")").unwrap(),
            val(["x", "yz"])
        );
        run_cases(
            &interp,
            "outputs",
            vec![
                ("(getOutputAmount 0)", success(70)),
                ("(getOutputParam 0 \"to\")", success("addr2")),
                ("(getOutputExtends 1)", success("e1")),
                ("(getOutputParamList 1 \"bad\")", SpecificError("paramLen is too long")),
                ("(getOutputParam 0 \"\")", SpecificError("pre index is nil")),
                ("(getOutputAmount 2)", SpecificError("output index 2 out of range")),
                ("(globalParamCount)", success(2)),
                ("(getGlobalParam \"fee\")", success("10")),
                ("(getGlobalParam \"\")", SpecificError("getGlobalParam is empty")),
                ("(getGlobalParam 1)", SpecificError("getGlobalParam is not string")),
                ("(isExistAtGlobalParam \"fee\")", success(1)),
                ("(isExistAtGlobalParam \"to\")", success(Value::FALSE)),
                ("(isExistAtGlobalParam \"\")", SpecificError("the key is nil")),
                ("(isExistAtOutputParam \"path\")", success(1)),
                ("(isExistAtOutputParam \"memo\")", success(Value::FALSE)),
                ("(isExistAtInputParam \"memo\")", success(1)),
                ("(isExistAtInputParam 1)", SpecificError("key is not string")),
            ],
        );
    }

    #[test]
    fn test_amount_totals() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        run_cases(
            &interp,
            "totals",
            vec![
                ("(calcInputAmount)", success(100)),
                ("(calcOutputAmount)", success(90)),
                ("(calcBalance)", success(10)),
                ("(> (calcBalance) 0)", success(1)),
            ],
        );

        // outputs exceeding inputs give a negative balance
        let mut ctx = sample_context();
        if let crate::ledger::MessageBody::Invoke(invoke) = &mut ctx.unit.messages[1].body {
            invoke.outputs[0].amount = 200;
        }
        let interp = interpreter(ctx, ExecMode::Contract);
        assert_eq!(interp.eval(b"(calcBalance)").unwrap(), val(-120));
    }

    #[test]
    fn test_asset_primitives() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        run_cases(
            &interp,
            "asset",
            vec![
                ("(cap)", success(1000)),
                ("(isDenominations)", success(1)),
                ("(getDenominationCount)", success(3)),
                ("(getDenomination 2)", success(10)),
                ("(getDenomination 3)", SpecificError("out of range")),
                ("(getDenomination \"2\")", SpecificError("input asset index is not a Integer")),
                ("(getAssetContractCount)", success(1)),
                ("(getAssetContract 0)", success("c0")),
                ("(getAssetContract \"0\")", SpecificError("input smart contract index is not integer")),
                ("(getAllocationsCount)", success(2)),
                ("(getAllocationsAddr 1)", success("addr2")),
                ("(getAllocationsAddr \"1\")", SpecificError("input AllocationAddr index is not a Integer")),
                ("(getAllocationsAmount \"addr2\")", success(400)),
                ("(getAllocationsAmount \"nobody\")", success(0)),
                ("(getAllocationsAmount \"\")", SpecificError("the address is nil")),
                ("(getAllocationsAmount 1)", SpecificError("allocation address) is not string")),
                ("(getAssetExtends)", success("gold")),
                ("(getPublisherAddr)", success("addr1")),
                ("(getPublisherUnitMCI)", success(42)),
            ],
        );
    }

    #[test]
    fn test_contract_param_primitives() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        assert_eq!(
            interp.eval(b"(getCurContractDefParamList \"owners\")").unwrap(),
            val(["a", "b"])
        );
        run_cases(
            &interp,
            "contract params",
            vec![
                ("(getContractParamCount 0)", success(2)),
                ("(getContractParamCount 1)", SpecificError("out of range")),
                ("(getContractParamName 0 1)", success("owners")),
                ("(getContractParamName 0 2)", SpecificError("parameter index 2 out of range")),
                ("(getContractParamName 0 \"1\")", SpecificError("ParamsKey index is not a Integer")),
                ("(getContractParamByIndex 0 0)", success("5")),
                ("(getContractParamByIndex 0 \"0\")", SpecificError("ParamsValue index is not a Integer")),
                ("(getContractParam 0 \"rate\")", success("5")),
                ("(getContractParam 0 \"\")", SpecificError("the ParamsKey is nil")),
                ("(getContractParam 0 1)", SpecificError("ParamsKey is not a string")),
                ("(getCurContractDefParamCount)", success(2)),
                ("(getCurContractDefParamName 0)", success("rate")),
                ("(getCurContractDefParamName \"0\")", SpecificError("get asset parameter name the index is not int")),
                ("(getCurContractDefParam \"rate\")", success("5")),
                ("(getCurContractDefParam \"absent\")", success("")),
                ("(getCurContractDefParam \"\")", SpecificError("the name is nil")),
                ("(getCurContractDefParam 0)", SpecificError("input smart contract index is not a string")),
            ],
        );
    }

    #[test]
    fn test_restrict_primitives() {
        let interp = interpreter(sample_restrict_context(), ExecMode::Restrict);
        assert_eq!(
            interp.eval(b"(getCurPrevOutParamList \"hops\")").unwrap(),
            val(["p", "q"])
        );
        run_cases(
            &interp,
            "restrict",
            vec![
                ("(getCurPrevOutAmount)", success(60)),
                ("(getCurPrevOutExtends)", success("pe0")),
                ("(getCurPrevOutParam \"owner\")", success("alice")),
                ("(getCurPrevOutParam \"absent\")", SpecificError("getCurPrevOutParam failed")),
                ("(getCurPrevOutParamList \"absent\")", SpecificError("getCurPrevOutParam failed")),
                ("(hasCurPrevOutParam \"owner\")", success(1)),
                ("(hasCurPrevOutParam \"memo\")", success(Value::FALSE)),
                ("(getCurInputParam \"sig\")", success("s0")),
                ("(getCurInputParam \"absent\")", SpecificError("getCurInputParam failed")),
                ("(getCurInputParam 1)", SpecificError("input paramKey is not string")),
                ("(getCurInputParam \"\")", SpecificError("input paramKey is empty")),
                ("(hasCurInputParam \"sig\")", success(1)),
                ("(getCurInputParamsCount)", success(1)),
                ("(getCurInputUnit)", success("u0")),
                ("(getCurInputMsg)", success(2)),
                ("(getCurInputOutput)", success(3)),
                // shared primitives stay available
                ("(sigCount)", success(2)),
                // contract-mode primitives are not registered
                ("(calcBalance)", SpecificError("not found")),
            ],
        );

        // restrict primitives without a restrict input
        let interp = interpreter(sample_context(), ExecMode::Restrict);
        run_cases(
            &interp,
            "no input",
            vec![
                ("(getCurInputUnit)", SpecificError("no input in restrict context")),
                ("(getCurPrevOutAmount)", SpecificError("no previous output")),
            ],
        );
    }

    #[test]
    fn test_mode_isolation() {
        let interp = interpreter(sample_context(), ExecMode::Contract);
        let err = interp.eval(b"(getCurInputParam \"sig\")").unwrap_err();
        assert!(matches!(err, crate::Error::UnboundVariable(_)));
    }

    #[test]
    fn test_non_invoke_message() {
        let mut ctx = VmContext::new(Unit::default(), 0, IssueMessage::default(), 0);
        ctx.unit.messages.push(crate::ledger::Message {
            payload_hash: b"p".to_vec(),
            body: crate::ledger::MessageBody::Other,
        });
        let interp = interpreter(ctx, ExecMode::Contract);
        run_cases(
            &interp,
            "other message",
            vec![
                ("(getCurMsgHash)", success("p")),
                ("(inputCount)", SpecificError("not an invoke message")),
                ("(sigCount)", success(0)),
                ("(getPK 0)", SpecificError("out of range")),
            ],
        );
    }
}
