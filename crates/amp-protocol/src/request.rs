//! Request/Response/ErrorReply: the typed views the dispatcher derives from
//! a parsed [`AmpBox`] once it knows which reserved key is present.

use crate::amp_box::AmpBox;
use crate::codecs;
use amp_core::constants::{ANSWER, ASK, COMMAND, ERROR, ERROR_CODE, ERROR_DESCRIPTION};
use amp_core::error::Result;
use amp_core::Chunk;

/// A decoded `_command` box: a request for a named operation, optionally
/// expecting a reply if `ask_key` is present.
///
/// Owns the command name, the caller's opaque ask-key bytes (if any), and
/// the argument box with the engine's own reserved keys already stripped.
#[derive(Debug)]
pub struct Request {
    pub command: Chunk,
    pub ask_key: Option<Chunk>,
    pub args: AmpBox,
}

impl Request {
    pub(crate) fn from_box(mut box_: AmpBox) -> Result<Self> {
        let command = Chunk::copy_from(box_.get_bytes(COMMAND.as_bytes())?);
        let ask_key = box_
            .get_bytes(ASK.as_bytes())
            .ok()
            .map(Chunk::copy_from);
        box_.del_key(COMMAND.as_bytes());
        box_.del_key(ASK.as_bytes());
        Ok(Request {
            command,
            ask_key,
            args: box_,
        })
    }
}

/// A decoded `_answer` box: a successful reply to a prior call.
#[derive(Debug)]
pub struct Response {
    pub ask_id: u32,
    pub args: AmpBox,
}

impl Response {
    pub(crate) fn from_box(mut box_: AmpBox) -> Result<Self> {
        let ask_id = codecs::get_uint(&box_, ANSWER)?;
        box_.del_key(ANSWER.as_bytes());
        Ok(Response { ask_id, args: box_ })
    }
}

/// A decoded `_error` box: a failed reply to a prior call.
///
/// The ask-id is decoded as a signed 64-bit integer (matching the wire
/// contract's `_error` semantics) and truncated to the `u32` the pending
/// table is keyed by.
#[derive(Debug)]
pub struct ErrorReply {
    pub ask_id: u32,
    pub error_code: Option<Chunk>,
    pub error_description: Option<Chunk>,
}

impl ErrorReply {
    pub(crate) fn from_box(mut box_: AmpBox) -> Result<Self> {
        let ask_id = codecs::get_long_long(&box_, ERROR)? as u32;
        let error_code = box_
            .get_bytes(ERROR_CODE.as_bytes())
            .ok()
            .map(Chunk::copy_from);
        let error_description = box_
            .get_bytes(ERROR_DESCRIPTION.as_bytes())
            .ok()
            .map(Chunk::copy_from);
        box_.del_key(ERROR.as_bytes());
        box_.del_key(ERROR_CODE.as_bytes());
        box_.del_key(ERROR_DESCRIPTION.as_bytes());
        Ok(ErrorReply {
            ask_id,
            error_code,
            error_description,
        })
    }
}

/// The outcome delivered to a pending call's [`Completion`](crate::callbacks::Completion).
#[derive(Debug)]
pub enum CallOutcome {
    Success(Response),
    Error(ErrorReply),
    Cancelled,
}
