//! Numeric and shift opcodes.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::opcodes::*;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::thread::Thread;

fn from_bool(v: bool) -> BigInt {
    if v {
        BigInt::one()
    } else {
        BigInt::zero()
    }
}

impl<'a> Thread<'a> {
    pub(crate) fn op_unary(&mut self, opcode: u8) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?.val;
        let result = match opcode {
            OP_1ADD => n + 1,
            OP_1SUB => n - 1,
            OP_NEGATE => -n,
            OP_ABS => n.abs(),
            OP_NOT => from_bool(n.is_zero()),
            OP_0NOTEQUAL => from_bool(!n.is_zero()),
            _ => unreachable!("not a unary numeric opcode: {opcode:#04x}"),
        };
        self.dstack.push_num(&result);
        Ok(())
    }

    /// Binary numeric opcodes. The second-from-top element is the left operand.
    pub(crate) fn op_binary(&mut self, opcode: u8) -> Result<(), InterpreterError> {
        let b = self.dstack.pop_num()?.val;
        let a = self.dstack.pop_num()?.val;

        if matches!(opcode, OP_DIV | OP_MOD) && b.is_zero() {
            return Err(InterpreterError::new(InterpreterErrorCode::DivideByZero, "divide by zero"));
        }

        let result = match opcode {
            OP_ADD => a + b,
            OP_SUB => a - b,
            OP_MUL => a * b,
            // Truncating division: the remainder takes the dividend's sign.
            OP_DIV => a.div_rem(&b).0,
            OP_MOD => a.div_rem(&b).1,
            OP_BOOLAND => from_bool(!a.is_zero() && !b.is_zero()),
            OP_BOOLOR => from_bool(!a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => from_bool(a == b),
            OP_NUMNOTEQUAL => from_bool(a != b),
            OP_LESSTHAN => from_bool(a < b),
            OP_GREATERTHAN => from_bool(a > b),
            OP_LESSTHANOREQUAL => from_bool(a <= b),
            OP_GREATERTHANOREQUAL => from_bool(a >= b),
            OP_MIN => a.min(b),
            OP_MAX => a.max(b),
            _ => unreachable!("not a binary numeric opcode: {opcode:#04x}"),
        };
        self.dstack.push_num(&result);
        Ok(())
    }

    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max = self.dstack.pop_num()?.val;
        let min = self.dstack.pop_num()?.val;
        let x = self.dstack.pop_num()?.val;
        self.dstack.push_num(&from_bool(min <= x && x < max));
        Ok(())
    }

    /// `OP_LSHIFT` / `OP_RSHIFT`: a logical shift of the whole byte string,
    /// keeping its length. Bits shifted past either end are lost.
    pub(crate) fn op_shift(&mut self, left: bool) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?;
        if n.val.is_negative() {
            return Err(InterpreterError::new(InterpreterErrorCode::NumberTooSmall, "n less than 0"));
        }
        let data = self.dstack.pop()?;
        let bits = n.val.to_usize().unwrap_or(usize::MAX);
        self.dstack.push(shift_bytes(&data, bits, left));
        Ok(())
    }
}

/// Shift a big-endian bit string by `bits`, preserving its length.
fn shift_bytes(data: &[u8], bits: usize, left: bool) -> Vec<u8> {
    let len = data.len();
    let mut out = vec![0u8; len];
    let byte_shift = bits / 8;
    if byte_shift >= len {
        return out;
    }
    let bit_shift = (bits % 8) as u32;

    for (i, slot) in out.iter_mut().enumerate() {
        let (hi, lo) = if left {
            let src = i + byte_shift;
            (data.get(src).copied(), data.get(src + 1).copied())
        } else {
            match i.checked_sub(byte_shift) {
                Some(src) => (
                    data.get(src).copied(),
                    src.checked_sub(1).and_then(|p| data.get(p).copied()),
                ),
                None => (None, None),
            }
        };
        let hi = u16::from(hi.unwrap_or(0));
        let lo = u16::from(lo.unwrap_or(0));
        *slot = if left {
            (((hi << 8) | lo) << bit_shift >> 8) as u8
        } else {
            (((lo << 8) | hi) >> bit_shift) as u8
        };
    }
    out
}
