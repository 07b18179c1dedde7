//! Script literals: booleans, integers and byte strings.
//!
//! A [`Literal`] is a constructor or function argument on its way into a
//! script. It renders as a single assembly token and encodes to the bytes of
//! a single push. Integers `-1` and `0..=16` take the one-byte opcode forms,
//! all other integers the minimal sign-magnitude little-endian form.

use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde_json::Value;

use crate::chunk::push_data_prefix;
use crate::interpreter::scriptnum::encode_num;
use crate::interpreter::stack::as_bool;
use crate::opcodes::*;
use crate::ScriptError;

/// A value that can be pushed onto the script stack.
///
/// `Bool(false)` and `Int(0)` are distinct literals: they render as
/// `OP_FALSE` and `OP_0` respectively, though both assemble to `0x00`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Literal {
    Bool(bool),
    Int(BigInt),
    Bytes(Vec<u8>),
}

impl Literal {
    /// Render as a single assembly token.
    pub fn to_asm(&self) -> String {
        match self {
            Literal::Bool(false) => "OP_FALSE".to_string(),
            Literal::Bool(true) => "OP_TRUE".to_string(),
            Literal::Int(n) => int_to_asm(n),
            Literal::Bytes(b) if b.is_empty() => opcode_to_string(OP_0).to_string(),
            Literal::Bytes(b) => hex::encode(b),
        }
    }

    /// Encode as the script bytes of one push.
    ///
    /// # Returns
    /// The opcode (fast path) or length-prefixed payload, or `DataTooBig`
    /// if a byte string cannot be prefixed.
    pub fn encode(&self) -> Result<Vec<u8>, ScriptError> {
        let payload = match self {
            Literal::Bool(b) => return Ok(vec![if *b { OP_TRUE } else { OP_FALSE }]),
            Literal::Int(n) => match small_int_opcode(n) {
                Some(op) => return Ok(vec![op]),
                None => encode_num(n),
            },
            Literal::Bytes(b) => b.clone(),
        };
        let mut out = push_data_prefix(payload.len())?;
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Convert a JSON argument into a literal.
    ///
    /// Booleans and integer numbers map directly; strings are hex byte
    /// strings with an optional `0x` prefix.
    ///
    /// # Returns
    /// The literal, or `Encoding` for null, floats, arrays, objects and
    /// strings that are not hex.
    pub fn from_json(value: &Value) -> Result<Self, ScriptError> {
        match value {
            Value::Bool(b) => Ok(Literal::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Literal::Int(BigInt::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Ok(Literal::Int(BigInt::from(u)))
                } else {
                    Err(ScriptError::Encoding(format!("non-integer number {n}")))
                }
            }
            Value::String(s) => {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                parse_hex(digits).map(Literal::Bytes)
            }
            other => Err(ScriptError::Encoding(format!(
                "unsupported literal type: {}",
                json_type_name(other)
            ))),
        }
    }

    /// Return true for literals every verifier treats as false: `false`,
    /// zero and byte strings that decode to (negative) zero.
    pub fn is_falsy(&self) -> bool {
        match self {
            Literal::Bool(b) => !b,
            Literal::Int(n) => n.is_zero(),
            Literal::Bytes(b) => !as_bool(b),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn parse_hex(digits: &str) -> Result<Vec<u8>, ScriptError> {
    if digits.len() % 2 != 0 {
        return Err(ScriptError::Encoding(format!("odd-length hex string {digits:?}")));
    }
    hex::decode(digits).map_err(|_| ScriptError::Encoding(format!("not a hex string: {digits:?}")))
}

pub(crate) fn small_int_opcode(n: &BigInt) -> Option<u8> {
    match n.to_i64()? {
        -1 => Some(OP_1NEGATE),
        0 => Some(OP_0),
        v @ 1..=16 => Some(OP_1 + (v as u8) - 1),
        _ => None,
    }
}

/// Render an integer as its assembly token.
///
/// `-1` and `0..=16` use their opcode mnemonics; any other value is the hex
/// of its minimal script-number encoding.
pub fn int_to_asm(n: &BigInt) -> String {
    match small_int_opcode(n) {
        Some(op) => opcode_to_string(op).to_string(),
        None => hex::encode(encode_num(n)),
    }
}

/// Render any literal as its assembly token.
pub fn literal_to_asm(literal: &Literal) -> String {
    literal.to_asm()
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_asm())
    }
}

impl FromStr for Literal {
    type Err = ScriptError;

    /// Parse `true`, `false`, a decimal integer or `0x`-prefixed hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "true" => return Ok(Literal::Bool(true)),
            "false" => return Ok(Literal::Bool(false)),
            _ => {}
        }
        if let Some(digits) = s.strip_prefix("0x") {
            return parse_hex(digits).map(Literal::Bytes);
        }
        let unsigned = s.strip_prefix('-').unwrap_or(s);
        if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ScriptError::Encoding(format!("unsupported literal {s:?}")));
        }
        BigInt::from_str(s)
            .map(Literal::Int)
            .map_err(|e| ScriptError::Encoding(format!("{s:?}: {e}")))
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Int(BigInt::from(n))
    }
}

impl From<BigInt> for Literal {
    fn from(n: BigInt) -> Self {
        Literal::Int(n)
    }
}

impl From<Vec<u8>> for Literal {
    fn from(b: Vec<u8>) -> Self {
        Literal::Bytes(b)
    }
}

impl From<&[u8]> for Literal {
    fn from(b: &[u8]) -> Self {
        Literal::Bytes(b.to_vec())
    }
}
