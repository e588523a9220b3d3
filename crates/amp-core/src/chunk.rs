//! A sized, reference-counted byte span.
//!
//! `Chunk` is the Rust realization of `AMP_Chunk_T`: a buffer that may have
//! been copied out of an incoming box, or may borrow the caller's own buffer
//! for the lifetime of a single outgoing call. `bytes::Bytes` already gives
//! cheap, shareable, clone-without-copy byte spans, which is the safe-Rust
//! equivalent of the original's "owns it or doesn't" distinction — so `Chunk`
//! is a thin wrapper rather than a lifetime-parameterized enum.

use bytes::Bytes;
use std::fmt;

/// A byte span carried around the protocol engine: command names, ask-ids,
/// error codes/descriptions, and raw key/value bytes are all `Chunk`s.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Chunk(Bytes);

impl Chunk {
    /// Build a chunk that owns a copy of `bytes`.
    pub fn copy_from(bytes: &[u8]) -> Self {
        Chunk(Bytes::copy_from_slice(bytes))
    }

    /// Build a chunk from an already-owned buffer without copying.
    pub fn from_owned(bytes: Bytes) -> Self {
        Chunk(bytes)
    }

    /// Borrow the chunk's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the chunk.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consume the chunk, returning the underlying `Bytes`.
    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Chunk {
    fn from(bytes: Bytes) -> Self {
        Chunk(bytes)
    }
}

impl From<&[u8]> for Chunk {
    fn from(bytes: &[u8]) -> Self {
        Chunk::copy_from(bytes)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(bytes: Vec<u8>) -> Self {
        Chunk(Bytes::from(bytes))
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Chunk({s:?})"),
            Err(_) => write!(f, "Chunk({:?})", self.0.as_ref()),
        }
    }
}
