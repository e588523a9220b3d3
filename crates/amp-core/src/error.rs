use thiserror::Error;

/// Stable error taxonomy shared by every layer of the protocol engine.
///
/// Each variant corresponds one-to-one with a numeric `AMP_*` code from the
/// original C library; the `#[error(...)]` text reproduces that library's
/// `amp_strerror()` description so `Error::to_string()` matches it verbatim.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid AMP key length")]
    BadKeySize,

    #[error("Invalid AMP value length")]
    BadValueSize,

    #[error("AMP box contains no key/value pairs")]
    BoxEmpty,

    #[error("AMP box did not contain a special key required by the wire-protocol")]
    RequiredKeyMissing,

    #[error("protocol engine is in fatal error state due to a previously encountered error")]
    ProtocolInFatalState,

    #[error("the requested key was not found in the AMP box")]
    KeyNotFound,

    #[error("the value failed to decode to the requested type")]
    DecodeError,

    #[error("the value failed to encode as the specified type")]
    EncodeError,

    #[error("the decoded value falls outside the representable range of the requested type")]
    OutOfRange,

    #[error("libamp encountered an internal error: {0}")]
    InternalError(String),

    #[error("cancel() could not find the requested ask-id")]
    NoSuchAskKey,

    #[error("allocation failed")]
    OutOfMemory,

    #[error("write handler rejected the outgoing bytes: {0}")]
    WriteFailed(#[from] std::io::Error),
}

/// Crate-wide `Result` alias, matching the teacher workspace's convention of
/// exposing one alias per crate rather than spelling out `Result<T, Error>`
/// at every call site.
pub type Result<T> = std::result::Result<T, Error>;

// `std::io::Error` is neither `PartialEq` nor `Clone`, so these are hand-rolled
// rather than derived. Two `WriteFailed` errors compare equal when their
// `ErrorKind`s match; exact OS error codes/messages are not part of the
// stable taxonomy.
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;
        match (self, other) {
            (BadKeySize, BadKeySize)
            | (BadValueSize, BadValueSize)
            | (BoxEmpty, BoxEmpty)
            | (RequiredKeyMissing, RequiredKeyMissing)
            | (ProtocolInFatalState, ProtocolInFatalState)
            | (KeyNotFound, KeyNotFound)
            | (DecodeError, DecodeError)
            | (EncodeError, EncodeError)
            | (OutOfRange, OutOfRange)
            | (NoSuchAskKey, NoSuchAskKey)
            | (OutOfMemory, OutOfMemory) => true,
            (InternalError(a), InternalError(b)) => a == b,
            (WriteFailed(a), WriteFailed(b)) => a.kind() == b.kind(),
            _ => false,
        }
    }
}

impl Eq for Error {}

impl Clone for Error {
    fn clone(&self) -> Self {
        use Error::*;
        match self {
            BadKeySize => BadKeySize,
            BadValueSize => BadValueSize,
            BoxEmpty => BoxEmpty,
            RequiredKeyMissing => RequiredKeyMissing,
            ProtocolInFatalState => ProtocolInFatalState,
            KeyNotFound => KeyNotFound,
            DecodeError => DecodeError,
            EncodeError => EncodeError,
            OutOfRange => OutOfRange,
            InternalError(s) => InternalError(s.clone()),
            NoSuchAskKey => NoSuchAskKey,
            OutOfMemory => OutOfMemory,
            WriteFailed(e) => WriteFailed(std::io::Error::new(e.kind(), e.to_string())),
        }
    }
}
