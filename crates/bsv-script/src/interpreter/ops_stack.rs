//! Stack opcodes that need more than a single [`Stack`](super::stack::Stack) call.

use super::error::InterpreterError;
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let top = self.dstack.peek(0)?;
        if as_bool(top) {
            self.dstack.dup_n(1)?;
        }
        Ok(())
    }

    /// `OP_PICK`, or `OP_ROLL` when `remove` is set.
    pub(crate) fn op_pick(&mut self, remove: bool) -> Result<(), InterpreterError> {
        let n = self.dstack.pop_num()?.to_i64();
        if remove {
            self.dstack.roll(n)
        } else {
            self.dstack.pick(n)
        }
    }
}
