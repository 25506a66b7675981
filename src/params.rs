//! Parameter dictionaries and the length-prefixed parameter-list codec.
//!
//! Ledger records carry parameters as ordered `(key, value)` pairs. Keys may repeat;
//! lookups by key always see the first entry. A value can itself pack a list of
//! byte strings: each element is one length byte followed by that many bytes.
//!
//! ```text
//! 03 'a' 'b' 'c' 00 02 'x' 'y'   =>   ["abc", "", "xy"]
//! ```

use serde::{Deserialize, Serialize};

use crate::Error;

/// Longest element a packed parameter list can hold
pub const MAX_PARAM_LEN: usize = u8::MAX as usize;

/// Ordered, duplicate-tolerant parameter set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDict {
    entries: Vec<(String, Vec<u8>)>,
}

impl ParamDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry; an existing entry with the same key is kept
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Value of the first entry named `key`, empty when there is none
    pub fn get(&self, key: &str) -> &[u8] {
        self.find(key)
            .map(|index| self.entries[index].1.as_slice())
            .unwrap_or_default()
    }

    /// Position of the first entry named `key`
    pub fn find(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(name, _)| name == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn key_at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(name, _)| name.as_str())
    }

    pub fn value_at(&self, index: usize) -> Option<&[u8]> {
        self.entries.get(index).map(|(_, value)| value.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_slice()))
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for ParamDict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dict = ParamDict::new();
        for (key, value) in iter {
            dict.add(key, value);
        }
        dict
    }
}

/// Split a packed parameter list into its elements
///
/// A length byte that claims more bytes than remain is an error, never a
/// truncated element. An empty buffer is an empty list.
pub fn decode_param_list(buf: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let mut items = Vec::new();
    let mut rest = buf;
    while let Some((&len, tail)) = rest.split_first() {
        let len = usize::from(len);
        if len > tail.len() {
            return Err(Error::EncodingError("paramLen is too long".to_owned()));
        }
        let (item, next) = tail.split_at(len);
        items.push(item.to_vec());
        rest = next;
    }
    Ok(items)
}

/// Pack elements into a parameter list
pub fn encode_param_list<T: AsRef<[u8]>>(items: &[T]) -> Result<Vec<u8>, Error> {
    let mut buf = Vec::new();
    for item in items {
        let item = item.as_ref();
        let len = u8::try_from(item.len()).map_err(|_| {
            Error::EncodingError(format!(
                "parameter of {} bytes exceeds {MAX_PARAM_LEN}",
                item.len()
            ))
        })?;
        buf.push(len);
        buf.extend_from_slice(item);
    }
    Ok(buf)
}
