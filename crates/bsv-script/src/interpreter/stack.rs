//! The interpreter's data and alt stacks.

use num_bigint::BigInt;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::{encode_num, ScriptNumber};

/// Interpret a stack element as a boolean.
///
/// Any non-zero byte makes the element true, except a lone sign bit in the
/// last byte (negative zero).
pub fn as_bool(t: &[u8]) -> bool {
    match t.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last & 0x7f) != 0,
    }
}

/// Canonical element for a boolean: `[1]` or empty.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        Vec::new()
    }
}

fn invalid_index(idx: i64, depth: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::InvalidStackOperation,
        format!("index {} is invalid for stack size {}", idx, depth),
    )
}

/// A stack of byte strings. Index 0 is the top.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Vec<u8>>,
    max_num_length: usize,
    require_minimal: bool,
}

impl Stack {
    /// Create an empty stack.
    ///
    /// # Arguments
    /// * `max_num_length` - Longest element accepted as a number operand.
    /// * `require_minimal` - Reject non-minimal number operands.
    pub fn new(max_num_length: usize, require_minimal: bool) -> Self {
        Stack { items: Vec::new(), max_num_length, require_minimal }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn require_minimal(&self) -> bool {
        self.require_minimal
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn push_num(&mut self, n: &BigInt) {
        self.push(encode_num(n));
    }

    pub fn push_int(&mut self, n: i64) {
        self.push_num(&BigInt::from(n));
    }

    pub fn push_bool(&mut self, v: bool) {
        self.push(from_bool(v));
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.items.pop().ok_or_else(|| invalid_index(0, 0))
    }

    /// Pop the top element and decode it as a number.
    pub fn pop_num(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop()?;
        ScriptNumber::from_bytes(&data, self.max_num_length, self.require_minimal)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    fn position(&self, idx: i64) -> Result<usize, InterpreterError> {
        let depth = self.items.len();
        usize::try_from(idx)
            .ok()
            .filter(|&i| i < depth)
            .map(|i| depth - i - 1)
            .ok_or_else(|| invalid_index(idx, depth))
    }

    /// Borrow the element `idx` positions below the top.
    pub fn peek(&self, idx: i64) -> Result<&[u8], InterpreterError> {
        let pos = self.position(idx)?;
        Ok(&self.items[pos])
    }

    /// Remove and return the element `idx` positions below the top.
    pub fn remove(&mut self, idx: i64) -> Result<Vec<u8>, InterpreterError> {
        let pos = self.position(idx)?;
        Ok(self.items.remove(pos))
    }

    /// Copy the element at `idx` to the top (`OP_PICK`).
    pub fn pick(&mut self, idx: i64) -> Result<(), InterpreterError> {
        let item = self.peek(idx)?.to_vec();
        self.push(item);
        Ok(())
    }

    /// Move the element at `idx` to the top (`OP_ROLL`).
    pub fn roll(&mut self, idx: i64) -> Result<(), InterpreterError> {
        let item = self.remove(idx)?;
        self.push(item);
        Ok(())
    }

    /// Drop the top `n` elements.
    pub fn drop_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n > self.depth() {
            return Err(invalid_index(n as i64 - 1, self.depth()));
        }
        self.items.truncate(self.depth() - n);
        Ok(())
    }

    /// Duplicate the top `n` elements, keeping their order.
    pub fn dup_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        for _ in 0..n {
            self.pick(n as i64 - 1)?;
        }
        Ok(())
    }

    /// Copy the `n` elements below the top `n` onto the top.
    pub fn over_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n as i64 - 1;
        for _ in 0..n {
            self.pick(entry)?;
        }
        Ok(())
    }

    /// Rotate the third group of `n` elements to the top.
    pub fn rot_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 3 * n as i64 - 1;
        for _ in 0..n {
            self.roll(entry)?;
        }
        Ok(())
    }

    /// Swap the top two groups of `n` elements.
    pub fn swap_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n as i64 - 1;
        for _ in 0..n {
            self.roll(entry)?;
        }
        Ok(())
    }

    /// Copy the top element below the second one (`OP_TUCK`).
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let top = self.peek(0)?.to_vec();
        let pos = self.position(1)?;
        self.items.insert(pos, top);
        Ok(())
    }

    /// Elements from bottom to top.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn set_items(&mut self, items: Vec<Vec<u8>>) {
        self.items = items;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
