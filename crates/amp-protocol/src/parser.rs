//! The incremental wire-format parser: a four-state machine that consumes
//! arbitrary byte fragments and reconstructs whole [`AmpBox`]es.
//!
//! Grounded on `amp_parse_box`/`amp_consume_bytes` in the original `amp.c`,
//! realized as small single-purpose transition methods the way the teacher
//! workspace's `stream_parser.rs` decomposes its own state machine.

use crate::amp_box::AmpBox;
use amp_core::error::{Error, Result};
use bytes::{Bytes, BytesMut};

/// One step of the key/value record parse. Mirrors `enum amp_protocol_state`
/// in `amp_internal.h`, with the single `KEY_LEN_READ` state split into two
/// named variants since it reads two distinct bytes with different meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the key-length high byte, which must always be zero.
    ReadKeyLenHi,
    /// Waiting for the key-length low byte (or a zero, the box terminator).
    ReadKeyLoOrTerminator,
    /// Accumulating `key_len` bytes of key data.
    ReadKey,
    /// Waiting for the value-length high byte.
    ReadValLenHi,
    /// Waiting for the value-length low byte.
    ReadValLenLo,
    /// Accumulating `val_len` bytes of value data.
    ReadVal,
}

/// What happened after feeding a chunk of bytes to the parser.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The terminator was reached; a box is ready to be taken with
    /// [`Parser::take_box`].
    BoxReady,
    /// All bytes were consumed but no box is complete yet.
    NeedMore,
}

/// Streaming parser for one connection's worth of AMP traffic.
///
/// Owns the scratch state for the box currently being assembled. Once
/// `fatal` is set (by a malformed key-length byte or a failed insert), the
/// parser refuses to make further progress until [`Parser::reset`] is
/// called — matching `proto->error` poisoning `amp_consume_bytes` in the
/// original engine.
pub struct Parser {
    state: State,
    key_len: usize,
    key_buf: BytesMut,
    val_len: usize,
    val_buf: BytesMut,
    current_box: AmpBox,
    fatal: bool,
}

impl Parser {
    pub fn new() -> Self {
        Parser {
            state: State::ReadKeyLenHi,
            key_len: 0,
            key_buf: BytesMut::new(),
            val_len: 0,
            val_buf: BytesMut::new(),
            current_box: AmpBox::new(),
            fatal: false,
        }
    }

    /// Reset to a freshly-constructed state: clears any partial-box scratch,
    /// installs a fresh empty box, and clears the fatal flag.
    pub fn reset(&mut self) {
        self.state = State::ReadKeyLenHi;
        self.key_len = 0;
        self.key_buf.clear();
        self.val_len = 0;
        self.val_buf.clear();
        self.current_box = AmpBox::new();
        self.fatal = false;
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Feed `buf` into the parser, advancing the state machine byte by
    /// byte. Returns [`ParseOutcome::BoxReady`] as soon as a terminator is
    /// seen, with `consumed` set to however many bytes of `buf` were used —
    /// any bytes after the terminator belong to the *next* box and are left
    /// unconsumed for the caller to feed back in.
    ///
    /// # Errors
    /// Returns [`Error::ProtocolInFatalState`] immediately if a previous
    /// call already set the fatal flag. Other errors ([`Error::BadKeySize`],
    /// [`Error::OutOfMemory`] surfaced by a failed insert) set the fatal
    /// flag before returning.
    pub fn feed(&mut self, buf: &[u8]) -> Result<(usize, ParseOutcome)> {
        if self.fatal {
            return Err(Error::ProtocolInFatalState);
        }

        let mut idx = 0;
        while idx < buf.len() {
            match self.state {
                State::ReadKeyLenHi => {
                    if buf[idx] != 0 {
                        self.fatal = true;
                        return Err(Error::BadKeySize);
                    }
                    idx += 1;
                    self.state = State::ReadKeyLoOrTerminator;
                }
                State::ReadKeyLoOrTerminator => {
                    let len = buf[idx];
                    idx += 1;
                    if len == 0 {
                        self.state = State::ReadKeyLenHi;
                        return Ok((idx, ParseOutcome::BoxReady));
                    }
                    self.key_len = len as usize;
                    self.key_buf.clear();
                    self.state = State::ReadKey;
                }
                State::ReadKey => {
                    let needed = self.key_len - self.key_buf.len();
                    let available = buf.len() - idx;
                    let take = needed.min(available);
                    self.key_buf.extend_from_slice(&buf[idx..idx + take]);
                    idx += take;
                    if self.key_buf.len() == self.key_len {
                        self.state = State::ReadValLenHi;
                    }
                }
                State::ReadValLenHi => {
                    self.val_len = (buf[idx] as usize) << 8;
                    idx += 1;
                    self.state = State::ReadValLenLo;
                }
                State::ReadValLenLo => {
                    self.val_len |= buf[idx] as usize;
                    idx += 1;
                    self.val_buf.clear();
                    self.state = State::ReadVal;
                }
                State::ReadVal => {
                    let needed = self.val_len - self.val_buf.len();
                    let available = buf.len() - idx;
                    let take = needed.min(available);
                    self.val_buf.extend_from_slice(&buf[idx..idx + take]);
                    idx += take;
                    if self.val_buf.len() == self.val_len {
                        let key = Bytes::copy_from_slice(&self.key_buf);
                        let value = Bytes::copy_from_slice(&self.val_buf);
                        if let Err(e) = self.current_box.put_bytes(key, value) {
                            self.fatal = true;
                            return Err(e);
                        }
                        self.state = State::ReadKeyLenHi;
                    }
                }
            }
        }

        Ok((idx, ParseOutcome::NeedMore))
    }

    /// Remove the box assembled so far, installing a fresh empty one in its
    /// place. Call this after [`ParseOutcome::BoxReady`].
    pub fn take_box(&mut self) -> AmpBox {
        std::mem::take(&mut self.current_box)
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
