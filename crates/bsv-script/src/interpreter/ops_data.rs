//! Splice, bitwise and equality opcodes.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive};

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::{decode_num, encode_num, minimally_encode};
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_cat(&mut self) -> Result<(), InterpreterError> {
        let b = self.dstack.pop()?;
        let mut a = self.dstack.pop()?;
        if a.len() + b.len() > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "concatenated size {} exceeds max allowed size {}",
                    a.len() + b.len(),
                    self.cfg.max_script_element_size
                ),
            ));
        }
        a.extend_from_slice(&b);
        self.dstack.push(a);
        Ok(())
    }

    pub(crate) fn op_split(&mut self) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?;
        let mut data = self.dstack.pop()?;
        if n.val.is_negative() {
            return Err(InterpreterError::new(InterpreterErrorCode::NumberTooSmall, "n is negative"));
        }
        let pos = n
            .val
            .to_usize()
            .filter(|&p| p <= data.len())
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::NumberTooBig,
                    "n is larger than length of array",
                )
            })?;
        let tail = data.split_off(pos);
        self.dstack.push(data);
        self.dstack.push(tail);
        Ok(())
    }

    pub(crate) fn op_num2bin(&mut self) -> Result<(), InterpreterError> {
        let size = self.dstack.pop_num()?;
        let value = self.dstack.pop()?;

        let size = size
            .val
            .to_usize()
            .filter(|&s| s <= self.cfg.max_script_element_size)
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::NumberTooBig,
                    format!("n must be between 0 and {}", self.cfg.max_script_element_size),
                )
            })?;

        let mut bytes = encode_num(&decode_num(&value));
        if bytes.len() > size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooSmall,
                format!("cannot fit {} bytes into {} bytes", bytes.len(), size),
            ));
        }
        if bytes.len() < size {
            let sign = bytes.last_mut().map_or(0, |last| {
                let sign = *last & 0x80;
                *last &= 0x7f;
                sign
            });
            bytes.resize(size - 1, 0x00);
            bytes.push(sign);
        }
        self.dstack.push(bytes);
        Ok(())
    }

    pub(crate) fn op_bin2num(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop()?;
        let num = minimally_encode(&data);
        if num.len() > self.cfg.max_script_number_length {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!("script numbers are limited to {} bytes", self.cfg.max_script_number_length),
            ));
        }
        self.dstack.push(num);
        Ok(())
    }

    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let len = self.dstack.peek(0)?.len();
        self.dstack.push_num(&BigInt::from(len));
        Ok(())
    }

    pub(crate) fn op_invert(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop()?;
        self.dstack.push(data.iter().map(|b| !b).collect());
        Ok(())
    }

    pub(crate) fn op_bitwise(&mut self, f: fn(u8, u8) -> u8) -> Result<(), InterpreterError> {
        let a = self.dstack.pop()?;
        let b = self.dstack.pop()?;
        if a.len() != b.len() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidInputLength,
                "byte arrays are not the same length",
            ));
        }
        self.dstack.push(a.iter().zip(&b).map(|(&x, &y)| f(x, y)).collect());
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop()?;
        let b = self.dstack.pop()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }
}
