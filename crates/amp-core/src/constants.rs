//! Wire-format constants shared by the parser, serializer and engine.
//!
//! AMP boxes are a flat sequence of `(key-length, key, value-length, value)`
//! records terminated by a zero-length key. These constants pin down the
//! exact limits and reserved names that give the wire format its meaning.
//!
//! ```text
//! [00][len][key bytes][len-hi][len-lo][value bytes] ... [00][00]
//!  ^^^ key length high byte, always zero      ^^ terminator
//! ```

// ============================================================================
// Key / Value size limits
// ============================================================================

/// Maximum length of a box key, in bytes.
///
/// Keys are encoded as a two-byte big-endian length whose high byte must
/// always be zero, which is what caps a key at one byte's worth of length.
///
/// # Value: 255
pub const MAX_KEY_LENGTH: usize = 0xff;

/// Minimum length of a box key, in bytes. A zero-length key on the wire is
/// the box terminator, not a key/value pair, so real keys start at 1.
pub const MIN_KEY_LENGTH: usize = 1;

/// Maximum length of a box value, in bytes (a full 16-bit length field).
///
/// # Value: 65535
pub const MAX_VALUE_LENGTH: usize = 0xffff;

// ============================================================================
// Wire format
// ============================================================================

/// The two-byte sequence that terminates a box on the wire: a key-length
/// field of zero, with no key or value bytes following.
pub const TERMINATOR: [u8; 2] = [0x00, 0x00];

/// Number of bytes used to encode a key length or a value length field.
pub const LENGTH_FIELD_SIZE: usize = 2;

// ============================================================================
// Reserved keys
// ============================================================================

/// Names a box as a request: the value is the command name.
///
/// # Examples
/// ```
/// use amp_core::constants::COMMAND;
/// assert_eq!(COMMAND, "_command");
/// ```
pub const COMMAND: &str = "_command";

/// Carries the caller-chosen identifier used to correlate a response with
/// the call that produced it. Present on requests that expect a reply.
pub const ASK: &str = "_ask";

/// Names a box as a successful reply: the value is the ask-id being
/// answered, echoed verbatim from the originating request's `_ask` key.
pub const ANSWER: &str = "_answer";

/// Names a box as an error reply: the value is the ask-id being answered.
pub const ERROR: &str = "_error";

/// Machine-readable error code accompanying an `_error` box.
pub const ERROR_CODE: &str = "_error_code";

/// Human-readable error description accompanying an `_error` box.
pub const ERROR_DESCRIPTION: &str = "_error_description";

// ============================================================================
// Standard error code strings
// ============================================================================

/// Sent as `_error_code` when a request names a command with no registered
/// responder.
///
/// # Examples
/// ```
/// use amp_core::constants::ERROR_CODE_UNHANDLED;
/// assert_eq!(ERROR_CODE_UNHANDLED, "UNHANDLED");
/// ```
pub const ERROR_CODE_UNHANDLED: &str = "UNHANDLED";

/// Generic fallback error code string for conditions with no more specific
/// standard code.
pub const ERROR_CODE_UNKNOWN: &str = "UNKNOWN";

// ============================================================================
// Date-time wire format
// ============================================================================

/// Fixed byte length of an encoded `AmpDateTime`: `YYYY-MM-DDTHH:MM:SS.uuuuuu±HH:MM`.
///
/// # Examples
/// ```
/// use amp_core::constants::DATETIME_WIRE_LENGTH;
/// assert_eq!(DATETIME_WIRE_LENGTH, "2024-01-02T03:04:05.123456+00:00".len());
/// ```
pub const DATETIME_WIRE_LENGTH: usize = 32;
