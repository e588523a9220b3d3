//! Value-type codecs: encode/decode the standard AMP types against an
//! [`AmpBox`](crate::amp_box::AmpBox).
//!
//! Every decoder here is hand-rolled against the exact grammar the original
//! C library accepts rather than delegated to `str::parse`, which is looser
//! than the wire format in several places (`f64::from_str` accepts `"3e10"`,
//! `"inf"` case-insensitively, leading whitespace, none of which AMP allows).

use crate::amp_box::AmpBox;
use amp_core::error::{Error, Result};
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, TimeZone, Timelike, Utc};

/// Store a raw byte string. Identity encoding: no transformation applied.
pub fn put_bytes(box_: &mut AmpBox, key: &str, value: impl Into<Bytes>) -> Result<()> {
    box_.put_bytes(Bytes::copy_from_slice(key.as_bytes()), value)
}

/// Retrieve a raw byte string.
pub fn get_bytes<'a>(box_: &'a AmpBox, key: &str) -> Result<&'a [u8]> {
    box_.get_bytes(key.as_bytes())
}

/// Store a NUL-free string's bytes (a "cstring" in the original library's
/// terms: a string with no embedded NUL, but no NUL is placed on the wire —
/// AMP values always carry an explicit length).
pub fn put_cstring(box_: &mut AmpBox, key: &str, value: &str) -> Result<()> {
    put_bytes(box_, key, Bytes::copy_from_slice(value.as_bytes()))
}

/// Retrieve a byte string as UTF-8. Invalid UTF-8 is a [`Error::DecodeError`].
pub fn get_cstring<'a>(box_: &'a AmpBox, key: &str) -> Result<&'a str> {
    std::str::from_utf8(get_bytes(box_, key)?).map_err(|_| Error::DecodeError)
}

// ===========================================================================
// Boolean
// ===========================================================================

const TRUE_LITERAL: &[u8] = b"True";
const FALSE_LITERAL: &[u8] = b"False";

/// Encode as the exact ASCII literal `True` or `False`.
pub fn put_bool(box_: &mut AmpBox, key: &str, value: bool) -> Result<()> {
    let literal = if value { TRUE_LITERAL } else { FALSE_LITERAL };
    put_bytes(box_, key, Bytes::from_static(literal))
}

/// Decode `True`/`False`, exact length and byte match required. Anything
/// else (including `"true"`, `"TRUE"`, `" True"`) is [`Error::DecodeError`].
pub fn get_bool(box_: &AmpBox, key: &str) -> Result<bool> {
    let buf = get_bytes(box_, key)?;
    if buf == TRUE_LITERAL {
        Ok(true)
    } else if buf == FALSE_LITERAL {
        Ok(false)
    } else {
        Err(Error::DecodeError)
    }
}

// ===========================================================================
// Integers
// ===========================================================================

/// Port of `buftoll`: a cutoff-based overflow-safe base-10 parser for
/// `i64`. Never overflows during parsing — the accumulator is checked
/// against a precomputed cutoff before each digit is folded in, exactly as
/// the original C implementation (itself derived from OpenBSD's `strtoll`)
/// does it.
fn buftoll(buf: &[u8]) -> Result<i64> {
    if buf.is_empty() {
        return Err(Error::DecodeError);
    }

    let mut idx = 0;
    let neg = match buf[0] {
        b'-' => {
            idx += 1;
            true
        }
        b'+' => {
            idx += 1;
            false
        }
        _ => false,
    };

    let base: i64 = 10;
    // Accumulate in the negative direction throughout, even for positive
    // input: `i64::MIN`'s magnitude has no positive `i64` representation, so
    // building a positive accumulator and negating at the end would overflow
    // on exactly that boundary value. The original C implementation avoids
    // this the same way.
    let cutoff: i64 = if neg { i64::MIN / base } else { -(i64::MAX / base) };
    let cutlim: i64 = if neg {
        -(i64::MIN % base)
    } else {
        i64::MAX % base
    };

    let mut acc: i64 = 0;
    let mut any = false;

    for &byte in &buf[idx..] {
        if !byte.is_ascii_digit() {
            return Err(Error::DecodeError);
        }
        let digit = (byte - b'0') as i64;

        if acc < cutoff || (acc == cutoff && digit > cutlim) {
            return Err(Error::OutOfRange);
        }

        any = true;
        acc = acc * base - digit;
    }

    if !any {
        return Err(Error::DecodeError);
    }

    Ok(if neg { acc } else { -acc })
}

/// Parse as `i64` then range-check against `[min, max]`. Mirrors
/// `buftoll_range` layering a range check on top of the 64-bit parse.
fn buftoll_range(buf: &[u8], min: i64, max: i64) -> Result<i64> {
    let value = buftoll(buf)?;
    if value < min || value > max {
        return Err(Error::OutOfRange);
    }
    Ok(value)
}

/// Encode a signed 64-bit integer as ASCII base-10 digits.
pub fn put_long_long(box_: &mut AmpBox, key: &str, value: i64) -> Result<()> {
    put_bytes(box_, key, Bytes::from(value.to_string().into_bytes()))
}

/// Decode a signed 64-bit integer.
pub fn get_long_long(box_: &AmpBox, key: &str) -> Result<i64> {
    buftoll(get_bytes(box_, key)?)
}

/// Encode a signed 32-bit integer.
pub fn put_int(box_: &mut AmpBox, key: &str, value: i32) -> Result<()> {
    put_long_long(box_, key, value as i64)
}

/// Decode a signed 32-bit integer: parse as `i64`, then range-check against
/// `i32::MIN..=i32::MAX`.
pub fn get_int(box_: &AmpBox, key: &str) -> Result<i32> {
    let value = buftoll_range(get_bytes(box_, key)?, i32::MIN as i64, i32::MAX as i64)?;
    Ok(value as i32)
}

/// Encode an unsigned 32-bit integer.
pub fn put_uint(box_: &mut AmpBox, key: &str, value: u32) -> Result<()> {
    put_long_long(box_, key, value as i64)
}

/// Decode an unsigned 32-bit integer: parse as `i64` (accepting an optional
/// leading `+`), then range-check against `[0, u32::MAX]`. Negative values
/// decode successfully as `i64` but fail range-checking here.
pub fn get_uint(box_: &AmpBox, key: &str) -> Result<u32> {
    let value = buftoll_range(get_bytes(box_, key)?, 0, u32::MAX as i64)?;
    Ok(value as u32)
}

// ===========================================================================
// Float
// ===========================================================================

const POS_INF: &[u8] = b"inf";
const NEG_INF: &[u8] = b"-inf";
const NAN: &[u8] = b"nan";

/// Encode a `f64`. Special IEEE values become the literal tokens `inf`,
/// `-inf`, `nan`; everything else is formatted with 17 digits of fractional
/// precision, matching `amp_put_double`'s `"%.17f"`.
pub fn put_double(box_: &mut AmpBox, key: &str, value: f64) -> Result<()> {
    let encoded = if value.is_nan() {
        NAN.to_vec()
    } else if value.is_infinite() {
        if value.is_sign_negative() {
            NEG_INF.to_vec()
        } else {
            POS_INF.to_vec()
        }
    } else {
        format!("{value:.17}").into_bytes()
    };
    put_bytes(box_, key, Bytes::from(encoded))
}

/// Decode a `f64`. Recognizes the three special tokens exactly, then falls
/// back to a hand-rolled sign/digits/dot/digits accumulator — ported from
/// `amp_get_double`'s character-at-a-time loop rather than `str::parse`.
pub fn get_double(box_: &AmpBox, key: &str) -> Result<f64> {
    let buf = get_bytes(box_, key)?;

    if buf.is_empty() {
        return Err(Error::DecodeError);
    }

    if buf == POS_INF {
        return Ok(f64::INFINITY);
    }
    if buf == NAN {
        return Ok(f64::NAN);
    }
    if buf == NEG_INF {
        return Ok(f64::NEG_INFINITY);
    }

    let mut idx = 0;
    let neg = match buf[0] {
        b'-' => {
            idx += 1;
            true
        }
        b'+' => {
            idx += 1;
            false
        }
        _ => false,
    };

    let mut acc: f64 = 0.0;
    let mut any = false;
    let mut got_dot = false;
    let mut fraction_factor = 0.1_f64;

    for &byte in &buf[idx..] {
        if byte.is_ascii_digit() {
            let digit = (byte - b'0') as f64;
            any = true;
            if !got_dot {
                acc = acc * 10.0 + digit;
            } else {
                acc += digit * fraction_factor;
                fraction_factor /= 10.0;
            }
        } else if byte == b'.' && !got_dot && any {
            got_dot = true;
        } else {
            return Err(Error::DecodeError);
        }
    }

    if !any {
        return Err(Error::DecodeError);
    }

    Ok(if neg { -acc } else { acc })
}

// ===========================================================================
// Date-time
// ===========================================================================

/// The raw fields of a wire date-time, exactly as `AMP_DateTime_T` lays
/// them out in the original library: independent `year`/`month`/`day`/etc.
/// integers plus a UTC offset in minutes, with no cross-field calendar
/// check. A `chrono::DateTime` cannot represent this type's contract —
/// `spec.md` §4.4 documents the day field as "1..31 (no calendar validation
/// beyond this)", so e.g. `day = 30, month = 2` is a perfectly valid decode
/// result even though no such calendar date exists. Calendar validity is
/// only checked by callers who opt into it via [`AmpDateTime::to_chrono`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmpDateTime {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
    /// Offset from UTC, in minutes. Range `-1439..=1439`.
    pub utc_offset_minutes: i32,
}

impl AmpDateTime {
    /// Decompose a real `chrono` instant into its local calendar fields and
    /// fixed offset, the way `amp_put_datetime`'s caller would fill in an
    /// `AMP_DateTime_T` from a known-good timestamp.
    pub fn from_chrono(value: &DateTime<FixedOffset>) -> Self {
        use chrono::Datelike;

        AmpDateTime {
            year: value.year(),
            month: value.month(),
            day: value.day(),
            hour: value.hour(),
            minute: value.minute(),
            second: value.second(),
            microsecond: value.nanosecond() / 1_000,
            utc_offset_minutes: value.offset().local_minus_utc() / 60,
        }
    }

    /// Attempt to reconstruct the calendar instant these fields name.
    /// Returns `None` if they don't form a valid Gregorian date (e.g. day 30
    /// in February) — the wire decoder itself never performs this check;
    /// this is purely an opt-in convenience for callers who know their
    /// fields are calendar-valid and want a real `chrono` value.
    pub fn to_chrono(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60)?;
        let naive = offset
            .with_ymd_and_hms(
                self.year,
                self.month,
                self.day,
                self.hour,
                self.minute,
                self.second,
            )
            .single()?;
        naive.with_nanosecond(self.microsecond * 1_000)
    }
}

/// Encode an `AmpDateTime`'s fields directly, matching `amp_put_datetime`'s
/// range checks and fixed layout.
pub fn put_datetime(box_: &mut AmpBox, key: &str, value: &AmpDateTime) -> Result<()> {
    if !(1..=9999).contains(&value.year)
        || !(1..=12).contains(&value.month)
        || !(1..=31).contains(&value.day)
        || value.hour > 23
        || value.minute > 59
        || value.second > 59
        || value.microsecond > 999_999
        || !(-1439..=1439).contains(&value.utc_offset_minutes)
    {
        return Err(Error::EncodeError);
    }

    let sign = if value.utc_offset_minutes >= 0 { '+' } else { '-' };
    let offset_hour = value.utc_offset_minutes.abs() / 60;
    let offset_min = value.utc_offset_minutes.abs() % 60;

    let encoded = format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:06}{}{:02}:{:02}",
        value.year,
        value.month,
        value.day,
        value.hour,
        value.minute,
        value.second,
        value.microsecond,
        sign,
        offset_hour,
        offset_min,
    );

    put_bytes(box_, key, Bytes::from(encoded.into_bytes()))
}

/// Decode a 32-byte `YYYY-MM-DDTHH:MM:SS.uuuuuu±HH:MM` datetime, field by
/// field, matching `amp_get_datetime`'s fixed-offset parsing exactly — no
/// calendar validation is performed beyond each field's own documented
/// range, matching `AMP_DateTime_T`'s plain-fields shape.
pub fn get_datetime(box_: &AmpBox, key: &str) -> Result<AmpDateTime> {
    let buf = get_bytes(box_, key)?;
    if buf.len() != 32 {
        return Err(Error::DecodeError);
    }

    let field = |start: usize, len: usize, min: i64, max: i64| -> Result<i64> {
        buftoll_range(&buf[start..start + len], min, max)
    };

    let year = field(0, 4, 1, 9999)?;
    if buf[4] != b'-' {
        return Err(Error::DecodeError);
    }
    let month = field(5, 2, 1, 12)?;
    if buf[7] != b'-' {
        return Err(Error::DecodeError);
    }
    let day = field(8, 2, 1, 31)?;
    if buf[10] != b'T' {
        return Err(Error::DecodeError);
    }
    let hour = field(11, 2, 0, 23)?;
    if buf[13] != b':' {
        return Err(Error::DecodeError);
    }
    let minute = field(14, 2, 0, 59)?;
    if buf[16] != b':' {
        return Err(Error::DecodeError);
    }
    let second = field(17, 2, 0, 59)?;
    if buf[19] != b'.' {
        return Err(Error::DecodeError);
    }
    let micros = field(20, 6, 0, 999_999)?;

    let sign = match buf[26] {
        b'+' => 1i64,
        b'-' => -1i64,
        _ => return Err(Error::DecodeError),
    };
    let offset_hour = field(27, 2, 0, 23)?;
    if buf[29] != b':' {
        return Err(Error::DecodeError);
    }
    let offset_min = field(30, 2, 0, 59)?;

    let offset_total_minutes = sign * (offset_hour * 60 + offset_min);
    if !(-1439..=1439).contains(&offset_total_minutes) {
        return Err(Error::OutOfRange);
    }

    Ok(AmpDateTime {
        year: year as i32,
        month: month as u32,
        day: day as u32,
        hour: hour as u32,
        minute: minute as u32,
        second: second as u32,
        microsecond: micros as u32,
        utc_offset_minutes: offset_total_minutes as i32,
    })
}
