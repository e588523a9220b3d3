//! The `AmpBox` data model: an AMP packet's key/value pairs.
//!
//! Named `AmpBox` rather than `Box` to avoid colliding with
//! `std::boxed::Box`. Backed by a plain `HashMap` rather than the original
//! library's hand-rolled hash table — the wire contract only requires a
//! deterministic-per-instance iteration order, which `HashMap` already gives
//! for an unmutated map, and nothing in the protocol depends on a specific
//! hash function.

use amp_core::constants::{MAX_KEY_LENGTH, MAX_VALUE_LENGTH, MIN_KEY_LENGTH, TERMINATOR};
use amp_core::error::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use std::collections::HashMap;

/// A single AMP packet: an unordered mapping from key to value bytes.
///
/// Both requests and responses are `AmpBox`es; the special `_command`,
/// `_ask`, `_answer`, `_error`, `_error_code` and `_error_description` keys
/// carry protocol meaning but are otherwise ordinary entries as far as this
/// type is concerned.
#[derive(Debug, Clone, Default)]
pub struct AmpBox {
    entries: HashMap<Bytes, Bytes>,
}

impl AmpBox {
    /// Create an empty box.
    pub fn new() -> Self {
        AmpBox {
            entries: HashMap::new(),
        }
    }

    /// Insert or replace a key's value.
    ///
    /// # Errors
    /// Returns [`Error::BadKeySize`] if `key` is empty or longer than 255
    /// bytes, or [`Error::BadValueSize`] if `value` is longer than 65535
    /// bytes.
    pub fn put_bytes(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<()> {
        let key = key.into();
        let value = value.into();

        if key.len() < MIN_KEY_LENGTH || key.len() > MAX_KEY_LENGTH {
            return Err(Error::BadKeySize);
        }
        if value.len() > MAX_VALUE_LENGTH {
            return Err(Error::BadValueSize);
        }

        self.entries.insert(key, value);
        Ok(())
    }

    /// Borrow the raw bytes stored under `key`.
    ///
    /// # Errors
    /// Returns [`Error::KeyNotFound`] if the key is absent.
    pub fn get_bytes(&self, key: &[u8]) -> Result<&[u8]> {
        self.entries
            .get(key)
            .map(|v| v.as_ref())
            .ok_or(Error::KeyNotFound)
    }

    pub fn has_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    pub fn num_keys(&self) -> usize {
        self.entries.len()
    }

    /// Remove `key`, returning `true` if it was present.
    pub fn del_key(&mut self, key: &[u8]) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Two boxes are equal iff they carry the same set of keys and every
    /// key's value bytes are identical.
    pub fn equals(&self, other: &AmpBox) -> bool {
        if self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(k, v)| other.entries.get(k).is_some_and(|ov| ov == v))
    }

    /// Encode this box to its wire representation.
    ///
    /// # Errors
    /// Returns [`Error::BoxEmpty`] if the box has no entries — an empty box
    /// has no valid wire encoding other than the bare terminator, which is
    /// reserved for framing, not content.
    pub fn serialize(&self) -> Result<Bytes> {
        if self.entries.is_empty() {
            return Err(Error::BoxEmpty);
        }

        let capacity: usize = self
            .entries
            .iter()
            .map(|(k, v)| 4 + k.len() + v.len())
            .sum::<usize>()
            + TERMINATOR.len();

        let mut buf = BytesMut::with_capacity(capacity);
        for (key, value) in &self.entries {
            buf.put_u8(0);
            buf.put_u8(key.len() as u8);
            buf.put_slice(key);
            buf.put_u16(value.len() as u16);
            buf.put_slice(value);
        }
        buf.put_slice(&TERMINATOR);

        Ok(buf.freeze())
    }
}

impl PartialEq for AmpBox {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}
