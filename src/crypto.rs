//! Signature verification and hashing primitives
//!
//! Public keys travel as byte strings whose first byte selects the key scheme:
//! `0` is the classical elliptic-curve scheme, anything else the lattice scheme.
//! [`CryptoSuite::new`] fills the classical slot with [`Secp256k1Scheme`] when the
//! `secp256k1` feature is enabled; the lattice scheme is supplied by the host.
//! This module decodes keys, dispatches verification and implements the greedy
//! multi-signature count.

use std::fmt;

use sha2::{Digest, Sha256};
use tracing::{debug, trace};

use crate::Error;
use crate::ast::Value;
use crate::builtinops::{Arity, HostOp};
use crate::evaluator::{EvalResult, Frame};

/// Header byte of a classical elliptic-curve key
pub const CLASSICAL_KEY_HEADER: u8 = 0;

/// A decoded public key able to check signatures
pub trait PublicKey {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool;
}

/// Decoder for one family of serialized public keys
pub trait KeyScheme {
    fn name(&self) -> &str;

    /// Decode the scheme-specific key body (the bytes after the header)
    fn unmarshal(&self, body: &[u8]) -> Result<Box<dyn PublicKey>, Error>;
}

/// The key schemes available to contracts
pub struct CryptoSuite {
    classical: Option<Box<dyn KeyScheme>>,
    lattice: Option<Box<dyn KeyScheme>>,
}

impl fmt::Debug for CryptoSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoSuite")
            .field("classical", &self.classical.as_ref().map(|s| s.name()))
            .field("lattice", &self.lattice.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl Default for CryptoSuite {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoSuite {
    /// The built-in providers: secp256k1 for classical keys, no lattice scheme
    pub fn new() -> Self {
        #[cfg(feature = "secp256k1")]
        {
            Self::empty().with_classical(Secp256k1Scheme)
        }
        #[cfg(not(feature = "secp256k1"))]
        {
            Self::empty()
        }
    }

    /// A suite without providers; every key fails to decode
    pub fn empty() -> Self {
        CryptoSuite {
            classical: None,
            lattice: None,
        }
    }

    pub fn with_classical(mut self, scheme: impl KeyScheme + 'static) -> Self {
        self.classical = Some(Box::new(scheme));
        self
    }

    pub fn with_lattice(mut self, scheme: impl KeyScheme + 'static) -> Self {
        self.lattice = Some(Box::new(scheme));
        self
    }

    fn scheme_for(&self, header: u8) -> Option<&dyn KeyScheme> {
        if header == CLASSICAL_KEY_HEADER {
            self.classical.as_deref()
        } else {
            self.lattice.as_deref()
        }
    }

    /// Decode a header-prefixed public key
    pub fn decode_public_key(&self, encoded: &[u8]) -> Result<Box<dyn PublicKey>, Error> {
        self.decode(encoded, "unmarshal public key failed")
    }

    fn decode(&self, encoded: &[u8], failure: &str) -> Result<Box<dyn PublicKey>, Error> {
        let (&header, body) = encoded
            .split_first()
            .ok_or_else(|| Error::crypto("public key is empty"))?;
        debug!(header, "verify public key header");
        self.scheme_for(header)
            .ok_or_else(|| Error::crypto(failure))?
            .unmarshal(body)
            .map_err(|_| Error::crypto(failure))
    }

    /// Check one signature; a signature that does not verify is an error
    pub fn verify(&self, public_key: &[u8], content: &[u8], signature: &[u8]) -> Result<(), Error> {
        let key = self.decode_public_key(public_key)?;
        if content.is_empty() {
            return Err(Error::crypto("contents is empty"));
        }
        if signature.is_empty() {
            return Err(Error::crypto("sign is empty"));
        }
        if !key.verify(content, signature) {
            return Err(Error::crypto("Verify sign failed"));
        }
        Ok(())
    }

    /// Count signatures against a pool of keys and compare with `threshold`
    ///
    /// Each signature is matched greedily against the remaining keys; the first key
    /// it verifies under leaves the pool, so one key is never counted twice. Keys
    /// listed twice stay two separate pool entries.
    pub fn verify_multi_sign<K, S>(
        &self,
        public_keys: &[K],
        content: &[u8],
        signatures: &[S],
        threshold: i64,
    ) -> Result<bool, Error>
    where
        K: AsRef<[u8]>,
        S: AsRef<[u8]>,
    {
        let mut pool = public_keys
            .iter()
            .map(|encoded| self.decode(encoded.as_ref(), "unmarshal pubKey failed"))
            .collect::<Result<Vec<_>, _>>()?;
        if content.is_empty() {
            return Err(Error::crypto("contents is empty"));
        }

        let mut remaining = threshold;
        for (index, signature) in signatures.iter().enumerate() {
            let signature = signature.as_ref();
            if let Some(pos) = pool.iter().position(|key| key.verify(content, signature)) {
                trace!(signature = index, "multisig match");
                pool.remove(pos);
                remaining = remaining.saturating_sub(1);
            }
        }
        Ok(remaining <= 0)
    }
}

/// Lowercase hex SHA-256 of `content`, the ledger's content hash
pub fn content_hash(content: &[u8]) -> String {
    format!("{:x}", Sha256::digest(content))
}

/// ECDSA over secp256k1
///
/// Keys are SEC1 points, compressed or not. Signatures are DER or the 64-byte
/// `r || s` form and are checked against the content as an already hashed digest.
#[cfg(feature = "secp256k1")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Scheme;

#[cfg(feature = "secp256k1")]
impl KeyScheme for Secp256k1Scheme {
    fn name(&self) -> &str {
        "secp256k1"
    }

    fn unmarshal(&self, body: &[u8]) -> Result<Box<dyn PublicKey>, Error> {
        let key = k256::ecdsa::VerifyingKey::from_sec1_bytes(body)
            .map_err(|err| Error::crypto(format!("invalid secp256k1 key: {err}")))?;
        Ok(Box::new(key))
    }
}

#[cfg(feature = "secp256k1")]
impl PublicKey for k256::ecdsa::VerifyingKey {
    fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        use k256::ecdsa::Signature;
        use k256::ecdsa::signature::hazmat::PrehashVerifier;

        let signature = Signature::from_der(signature).or_else(|_| Signature::from_slice(signature));
        match signature {
            Ok(signature) => self.verify_prehash(message, &signature).is_ok(),
            Err(_) => {
                trace!("malformed secp256k1 signature");
                false
            }
        }
    }
}

/// Contract primitives backed by a [`CryptoSuite`]
pub const CRYPTO_OPS: &[HostOp<CryptoSuite>] = &[
    HostOp {
        id: "verify",
        arity: Arity::Exact(3),
        func: op_verify,
    },
    HostOp {
        id: "hash",
        arity: Arity::Exact(1),
        func: op_hash,
    },
    HostOp {
        id: "verifyMultiSign",
        arity: Arity::Exact(4),
        func: op_verify_multi_sign,
    },
    HostOp {
        id: "countBytes",
        arity: Arity::Exact(1),
        func: op_count_bytes,
    },
];

/// A non-empty string operand, with the caller's messages for the failure cases
fn byte_string(value: Value, not_string: &str, empty: &str) -> Result<Vec<u8>, Error> {
    match value {
        Value::String(bytes) if bytes.is_empty() => Err(Error::crypto(empty)),
        Value::String(bytes) => Ok(bytes),
        _ => Err(Error::crypto(not_string)),
    }
}

fn list_operand(value: Value, what: &str) -> Result<Vec<Value>, Error> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(Error::type_error(format!(
            "{what} must be a list, got {}",
            other.kind_name()
        ))),
    }
}

/// `(verify pubkey contentHash signature)`
fn op_verify(args: &[Value], frame: &Frame<'_>, suite: &CryptoSuite) -> EvalResult {
    let public_key = byte_string(
        frame.eval(&args[0])?,
        "public key is not string",
        "public key is empty",
    )?;
    let key = suite.decode_public_key(&public_key)?;
    let content = byte_string(frame.eval(&args[1])?, "contents is not string", "contents is empty")?;
    let signature = byte_string(frame.eval(&args[2])?, "Sign is not string", "sign is empty")?;
    if !key.verify(&content, &signature) {
        return Err(Error::crypto("Verify sign failed").into());
    }
    Ok(Value::TRUE)
}

/// `(hash content)`: hex content hash of a string
fn op_hash(args: &[Value], frame: &Frame<'_>, _suite: &CryptoSuite) -> EvalResult {
    let content = byte_string(
        frame.eval(&args[0])?,
        "Contents is not string",
        "Contents is empty",
    )?;
    Ok(Value::from(content_hash(&content)))
}

/// `(verifyMultiSign pubkeys contentHash signatures threshold)`
fn op_verify_multi_sign(args: &[Value], frame: &Frame<'_>, suite: &CryptoSuite) -> EvalResult {
    let Value::Integer(threshold) = frame.eval(&args[3])? else {
        return Err(Error::type_error("multisig threshold must be an integer").into());
    };
    let public_keys = list_operand(frame.eval(&args[0])?, "public key list")?
        .into_iter()
        .map(|key| byte_string(key, "public key is not string", "public key is empty"))
        .collect::<Result<Vec<_>, _>>()?;
    let content = byte_string(frame.eval(&args[1])?, "contents is not string", "contents is empty")?;
    let signatures = list_operand(frame.eval(&args[2])?, "signature list")?
        .into_iter()
        .map(|sig| byte_string(sig, "Sig is not string", "Sig is empty"))
        .collect::<Result<Vec<_>, _>>()?;

    let passed = suite.verify_multi_sign(&public_keys, &content, &signatures, threshold)?;
    Ok(Value::from(passed))
}

/// `(countBytes content)`: byte length of a string
fn op_count_bytes(args: &[Value], frame: &Frame<'_>, _suite: &CryptoSuite) -> EvalResult {
    match frame.eval(&args[0])? {
        Value::String(bytes) => Ok(Value::Integer(bytes.len() as i64)),
        other => Err(Error::type_error(format!(
            "countBytes needs a string, got {}",
            other.kind_name()
        ))
        .into()),
    }
}
