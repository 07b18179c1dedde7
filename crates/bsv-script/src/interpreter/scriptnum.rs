//! Script numbers.
//!
//! Numbers on the stack are little-endian sign-magnitude byte strings: the
//! top bit of the last byte is the sign, the remaining bits are the
//! magnitude. Zero is the empty string. Arithmetic happens on [`BigInt`], so
//! intermediate results never overflow; only the operand length is limited.

use num_bigint::{BigInt, Sign};
use num_traits::{Signed, ToPrimitive, Zero};

use super::error::{InterpreterError, InterpreterErrorCode};

/// Encode an integer as a minimal script number.
///
/// # Arguments
/// * `n` - The value to encode.
///
/// # Returns
/// The minimal sign-magnitude encoding. Zero encodes as an empty vector.
pub fn encode_num(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }

    let (_, mut bytes) = n.abs().to_bytes_le();
    let negative = n.is_negative();
    let last = bytes.len() - 1;
    if bytes[last] & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        bytes[last] |= 0x80;
    }
    bytes
}

/// Decode a sign-magnitude byte string without any length or minimality check.
pub fn decode_num(bytes: &[u8]) -> BigInt {
    let Some((&last, _)) = bytes.split_last() else {
        return BigInt::zero();
    };

    let mut magnitude = bytes.to_vec();
    let top = magnitude.len() - 1;
    magnitude[top] = last & 0x7f;
    let value = BigInt::from_bytes_le(Sign::Plus, &magnitude);
    if last & 0x80 != 0 {
        -value
    } else {
        value
    }
}

/// A decoded stack number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScriptNumber {
    pub val: BigInt,
}

impl ScriptNumber {
    pub fn new(val: impl Into<BigInt>) -> Self {
        ScriptNumber { val: val.into() }
    }

    /// Decode a stack element as a number.
    ///
    /// # Arguments
    /// * `bytes` - The stack element.
    /// * `max_len` - The longest encoding accepted.
    /// * `require_minimal` - Reject encodings with redundant trailing bytes.
    ///
    /// # Returns
    /// The decoded number, or `NumberTooBig` / `MinimalData`.
    pub fn from_bytes(
        bytes: &[u8],
        max_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bytes.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {} is {} bytes which exceeds the max allowed of {}",
                    hex::encode(bytes),
                    bytes.len(),
                    max_len
                ),
            ));
        }
        if require_minimal {
            check_minimal_data_encoding(bytes)?;
        }
        Ok(ScriptNumber { val: decode_num(bytes) })
    }

    /// Minimal encoding of this number.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode_num(&self.val)
    }

    /// Convert to `i32`, saturating at the bounds.
    pub fn to_i32(&self) -> i32 {
        self.val.to_i32().unwrap_or(if self.val.is_negative() { i32::MIN } else { i32::MAX })
    }

    /// Convert to `i64`, saturating at the bounds.
    pub fn to_i64(&self) -> i64 {
        self.val.to_i64().unwrap_or(if self.val.is_negative() { i64::MIN } else { i64::MAX })
    }

    pub fn is_zero(&self) -> bool {
        self.val.is_zero()
    }
}

impl From<i64> for ScriptNumber {
    fn from(v: i64) -> Self {
        ScriptNumber::new(v)
    }
}

impl From<BigInt> for ScriptNumber {
    fn from(val: BigInt) -> Self {
        ScriptNumber { val }
    }
}

/// Strip redundant trailing bytes from a number encoding (`OP_BIN2NUM`).
pub fn minimally_encode(data: &[u8]) -> Vec<u8> {
    let Some((&last, rest)) = data.split_last() else {
        return Vec::new();
    };

    if last & 0x7f != 0 {
        return data.to_vec();
    }

    // The last byte only carries a sign. Find the last magnitude byte.
    match rest.iter().rposition(|&b| b != 0) {
        None => Vec::new(),
        Some(i) if rest[i] & 0x80 != 0 => {
            let mut out = rest[..=i].to_vec();
            out.push(last);
            out
        }
        Some(i) => {
            let mut out = rest[..=i].to_vec();
            out[i] |= last;
            out
        }
    }
}

/// Fail with `MinimalData` if `v` has a redundant trailing byte.
pub fn check_minimal_data_encoding(v: &[u8]) -> Result<(), InterpreterError> {
    let Some((&last, rest)) = v.split_last() else {
        return Ok(());
    };

    let sign_only = last & 0x7f == 0;
    let needed_for_sign = rest.last().is_some_and(|b| b & 0x80 != 0);
    if sign_only && !needed_for_sign {
        return Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!("numeric value encoded as {} is not minimally encoded", hex::encode(v)),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    #[test]
    fn test_encode_num() {
        let cases: Vec<(i64, &str)> = vec![
            (0, ""),
            (1, "01"),
            (-1, "81"),
            (127, "7f"),
            (-127, "ff"),
            (128, "8000"),
            (-128, "8080"),
            (255, "ff00"),
            (256, "0001"),
            (-256, "0081"),
            (32767, "ff7f"),
            (-32768, "008080"),
            (65535, "ffff00"),
            (8388608, "00008000"),
            (2147483647, "ffffff7f"),
            (-2147483647, "ffffffff"),
            (2147483648, "0000008000"),
            (4294967296, "0000000001"),
            (-4294967296, "0000000081"),
            (9223372036854775807, "ffffffffffffff7f"),
            (-9223372036854775807, "ffffffffffffffff"),
        ];
        for (n, want) in cases {
            assert_eq!(hex::encode(encode_num(&BigInt::from(n))), want, "encode {n}");
            assert_eq!(decode_num(&h(want)), BigInt::from(n), "decode {want}");
        }
    }

    #[test]
    fn test_from_bytes_limits_and_minimality() {
        // (bytes, max_len, minimal, expected)
        let cases: Vec<(&str, usize, bool, Option<i64>)> = vec![
            ("", 4, true, Some(0)),
            ("80", 4, true, None),
            ("00", 4, true, None),
            ("0100", 4, true, None),
            ("00", 4, false, Some(0)),
            ("0100", 4, false, Some(1)),
            ("8000", 4, true, Some(128)),
            ("ffffff7f", 4, true, Some(2147483647)),
            ("0000008000", 4, true, None),
            ("ffffffff7f", 5, true, Some(549755813887)),
            ("ffffffffff", 5, true, Some(-549755813887)),
        ];
        for (bytes, max_len, minimal, want) in cases {
            let got = ScriptNumber::from_bytes(&h(bytes), max_len, minimal);
            match want {
                Some(n) => assert_eq!(got.unwrap().to_i64(), n, "{bytes}"),
                None => assert!(got.is_err(), "{bytes} should be rejected"),
            }
        }
    }

    #[test]
    fn test_from_bytes_error_codes() {
        let err = ScriptNumber::from_bytes(&h("0000008000"), 4, false).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::NumberTooBig);
        let err = ScriptNumber::from_bytes(&h("0100"), 4, true).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::MinimalData);
    }

    #[test]
    fn test_saturating_conversions() {
        assert_eq!(ScriptNumber::new(2147483648i64).to_i32(), i32::MAX);
        assert_eq!(ScriptNumber::new(-2147483649i64).to_i32(), i32::MIN);
        assert_eq!(ScriptNumber::new(-5).to_i32(), -5);
        let huge = ScriptNumber::new(BigInt::from(i64::MAX) * 2);
        assert_eq!(huge.to_i64(), i64::MAX);
        assert_eq!(ScriptNumber::new(-huge.val).to_i64(), i64::MIN);
    }

    #[test]
    fn test_minimally_encode() {
        assert_eq!(minimally_encode(&[]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x7f]), vec![0x7f]);
        assert_eq!(minimally_encode(&[0x00]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x80]), Vec::<u8>::new());
        assert_eq!(minimally_encode(&[0x01, 0x00, 0x00]), vec![0x01]);
        assert_eq!(minimally_encode(&[0x01, 0x00, 0x80]), vec![0x81]);
        assert_eq!(minimally_encode(&[0xff, 0x00, 0x00]), vec![0xff, 0x00]);
        assert_eq!(minimally_encode(&[0xff, 0x00, 0x80]), vec![0xff, 0x80]);
    }
}
