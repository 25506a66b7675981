//! Data-driven test harness shared by the evaluator and primitive tests

use crate::Interpreter;
use crate::ast::{Value, val};

/// Test result variants for comprehensive testing
pub(crate) enum TestResult {
    EvalResult(Value),           // Evaluation should succeed with this value
    SpecificError(&'static str), // Evaluation should fail with error containing this string
    Error,                       // Evaluation should fail (any error)
    Ignore,                      // Evaluation should succeed, value not checked
}
pub(crate) use TestResult::*;

/// Test environment containing test cases that share state
pub(crate) struct TestEnvironment(pub(crate) Vec<(&'static str, TestResult)>);

/// Micro-helper for success cases in comprehensive tests
pub(crate) fn success<T: Into<Value>>(value: T) -> TestResult {
    EvalResult(val(value))
}

/// Run tests in isolated environments with shared state
pub(crate) fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
    for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
        let interp = Interpreter::new();

        for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
            let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
            execute_test_case(input, expected, &interp, &test_id);
        }
    }
}

/// Execute a single test case with detailed error reporting
pub(crate) fn execute_test_case(
    input: &str,
    expected: &TestResult,
    interp: &Interpreter,
    test_id: &str,
) {
    match (interp.eval(input.as_bytes()), expected) {
        (Ok(actual), EvalResult(expected_val)) => {
            assert!(
                actual == *expected_val,
                "{test_id}: '{input}' expected {expected_val:?}, got {actual:?}"
            );
        }
        (Ok(_), Ignore) | (Err(_), Error) => {}
        (Err(e), SpecificError(expected_text)) => {
            let error_msg = format!("{e}");
            assert!(
                error_msg.contains(expected_text),
                "{test_id}: '{input}' error should contain '{expected_text}', got: {error_msg}"
            );
        }
        (Ok(actual), Error) => {
            panic!("{test_id}: '{input}' expected error, got {actual:?}");
        }
        (Ok(actual), SpecificError(expected_text)) => {
            panic!("{test_id}: '{input}' expected error containing '{expected_text}', got {actual:?}");
        }
        (Err(err), EvalResult(expected_val)) => {
            panic!("{test_id}: '{input}' expected {expected_val:?}, got error {err:?}");
        }
        (Err(err), Ignore) => {
            panic!("{test_id}: '{input}' expected success, got error {err:?}");
        }
    }
}

/// Run each case against a fresh interpreter
pub(crate) fn run_comprehensive_tests(test_cases: Vec<(&str, TestResult)>) {
    for (i, (input, expected)) in test_cases.iter().enumerate() {
        let interp = Interpreter::new();
        let test_id = format!("#{}", i + 1);
        execute_test_case(input, expected, &interp, &test_id);
    }
}

/// Key scheme for tests: a "signature" is the SHA-256 of key body and message
pub(crate) struct DigestScheme;

struct DigestKey(Vec<u8>);

impl crate::crypto::PublicKey for DigestKey {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        sign(&self.0, message) == signature
    }
}

impl crate::crypto::KeyScheme for DigestScheme {
    fn name(&self) -> &str {
        "digest"
    }

    fn unmarshal(&self, body: &[u8]) -> Result<Box<dyn crate::crypto::PublicKey>, crate::Error> {
        if body.is_empty() {
            return Err(crate::Error::crypto("empty key body"));
        }
        Ok(Box::new(DigestKey(body.to_vec())))
    }
}

/// Signature of `message` under the key with body `key_body`
pub(crate) fn sign(key_body: &[u8], message: &[u8]) -> Vec<u8> {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(key_body);
    hasher.update(message);
    hasher.finalize().to_vec()
}

/// Header-prefixed public key as contracts see it
pub(crate) fn encoded_key(header: u8, key_body: &[u8]) -> Vec<u8> {
    let mut key = vec![header];
    key.extend_from_slice(key_body);
    key
}

/// Ledger fixture: two authors, an invoke message with two inputs and two outputs,
/// a resolver for both inputs and a fixed-denomination asset
pub(crate) fn sample_context() -> crate::ledger::VmContext {
    use crate::ledger::*;
    use crate::params::{ParamDict, encode_param_list};

    fn dict(entries: &[(&str, &[u8])]) -> ParamDict {
        entries.iter().map(|(k, v)| (*k, v.to_vec())).collect()
    }
    #[expect(clippy::unwrap_used)] // test code OK
    fn packed(items: &[&str]) -> Vec<u8> {
        encode_param_list(items).unwrap()
    }

    let hash_to_sign = b"unit-sign-hash";
    let authors = vec![
        Author {
            address: b"addr1".to_vec(),
            definition: encoded_key(0, b"alice"),
            authentifiers: sign(b"alice", hash_to_sign),
        },
        Author {
            address: b"addr2".to_vec(),
            definition: encoded_key(1, b"bob"),
            authentifiers: sign(b"bob", hash_to_sign),
        },
    ];
    let invoke = InvokeMessage {
        global_params: dict(&[("fee", b"10"), ("tags", &packed(&["a", "bc"]))]),
        inputs: vec![
            ContractInput {
                source_unit: b"u0".to_vec(),
                source_message: 2,
                source_output: 3,
                params: dict(&[("sig", b"s0")]),
            },
            ContractInput {
                source_unit: b"u1".to_vec(),
                source_message: 0,
                source_output: 1,
                params: dict(&[("memo", b"hi"), ("bad", b"\x05ab")]),
            },
        ],
        outputs: vec![
            ContractOutput {
                amount: 70,
                params: dict(&[("to", b"addr2"), ("path", &packed(&["x", "yz"]))]),
                extends: b"e0".to_vec(),
            },
            ContractOutput {
                amount: 20,
                params: dict(&[("bad", b"\x05ab")]),
                extends: b"e1".to_vec(),
            },
        ],
    };
    let unit = Unit {
        authors,
        messages: vec![
            Message {
                payload_hash: b"m0".to_vec(),
                body: MessageBody::Other,
            },
            Message::invoke("m1", invoke),
        ],
        hash: b"unit-hash".to_vec(),
        hash_to_sign: hash_to_sign.to_vec(),
    };

    let mut contract_def = ContractDef::new("c0");
    contract_def.add_param("rate", "5");
    contract_def.add_param("owners", packed(&["a", "b"]));
    let asset = IssueMessage {
        cap: 1000,
        fixed_denominations: true,
        denominations: vec![1, 5, 10],
        contracts: vec![contract_def.clone()],
        allocation_addr: vec![b"addr1".to_vec(), b"addr2".to_vec()],
        allocation_amount: vec![600, 400],
        note: b"gold".to_vec(),
        publisher_address: b"addr1".to_vec(),
    };

    VmContext::new(unit, 1, asset, 42)
        .with_contract_def(contract_def)
        .with_resolver(|input: &ContractInput| match input.source_unit.as_slice() {
            b"u0" => Some(ContractOutput {
                amount: 60,
                params: dict(&[("owner", b"alice"), ("hops", &packed(&["p", "q"]))]),
                extends: b"pe0".to_vec(),
            }),
            b"u1" => Some(ContractOutput {
                amount: 40,
                params: dict(&[("owner", b"bob")]),
                extends: b"pe1".to_vec(),
            }),
            _ => None,
        })
}

/// [`sample_context`] scoped to its first input
#[expect(clippy::unwrap_used)] // test code OK
pub(crate) fn sample_restrict_context() -> crate::ledger::VmContext {
    let ctx = sample_context();
    let input = ctx.input_at(0).unwrap().clone();
    let prev_out = ctx.prev_out_of(&input).unwrap();
    ctx.with_restrict(input, prev_out)
}
