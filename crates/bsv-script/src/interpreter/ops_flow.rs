//! Flow control and lock-time opcodes.

use num_traits::Signed;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::stack::as_bool;
use super::thread::{Cond, Thread};

/// Lock times below this are block heights, above are timestamps.
const LOCK_TIME_THRESHOLD: i64 = 500_000_000;
const MAX_TX_IN_SEQUENCE_NUM: u32 = 0xffff_ffff;
const SEQUENCE_LOCK_TIME_DISABLED: i64 = 1 << 31;
const SEQUENCE_LOCK_TIME_IS_SECONDS: i64 = 1 << 22;
const SEQUENCE_LOCK_TIME_MASK: i64 = 0x0000_ffff;

/// Lock-time operands may be 5 bytes long regardless of the number limit.
const LOCK_TIME_OPERAND_LEN: usize = 5;

fn unbalanced(pop: &ParsedOpcode) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::UnbalancedConditional,
        format!(
            "encountered opcode {} with no matching opcode to begin conditional execution",
            pop.name()
        ),
    )
}

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", pop.name()),
        ))
    }

    pub(crate) fn op_ver_conditional(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.after_genesis() && !self.should_exec(pop) {
            return Ok(());
        }
        self.op_reserved(pop)
    }

    pub(crate) fn op_upgradable_nop(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.flags.discourage_upgradable_nops {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", pop.name()),
            ));
        }
        Ok(())
    }

    fn pop_if_bool(&mut self) -> Result<bool, InterpreterError> {
        if !self.flags.minimal_if {
            return self.dstack.pop_bool();
        }
        let b = self.dstack.pop()?;
        if b.len() > 1 || (b.len() == 1 && b[0] != 1) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalIf,
                format!("conditional argument {} is not minimal", hex::encode(&b)),
            ));
        }
        Ok(as_bool(&b))
    }

    /// `OP_IF` (or `OP_NOTIF` when `negate`).
    pub(crate) fn op_if(&mut self, pop: &ParsedOpcode, negate: bool) -> Result<(), InterpreterError> {
        let cond = if !self.should_exec(pop) {
            Cond::False
        } else if self.is_branch_executing() {
            if self.pop_if_bool()? != negate {
                Cond::True
            } else {
                Cond::False
            }
        } else {
            Cond::Skip
        };
        self.cond_stack.push(cond);
        self.else_stack.push(false);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        let seen_else = self.else_stack.pop().ok_or_else(|| unbalanced(pop))?;
        if seen_else {
            return Err(unbalanced(pop));
        }
        let top = self.cond_stack.last_mut().ok_or_else(|| unbalanced(pop))?;
        *top = match *top {
            Cond::True => Cond::False,
            Cond::False => Cond::True,
            Cond::Skip => Cond::Skip,
        };
        self.else_stack.push(true);
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.cond_stack.pop().ok_or_else(|| unbalanced(pop))?;
        self.else_stack.pop().ok_or_else(|| unbalanced(pop))?;
        Ok(())
    }

    /// Pop the top element and fail with `code` unless it is true.
    pub(crate) fn verify_top(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(code, format!("{} failed", pop.name())));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        if !self.after_genesis() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EarlyReturn,
                "script returned early",
            ));
        }
        self.early_return = true;
        if self.cond_stack.is_empty() {
            self.script_done = true;
        }
        Ok(())
    }

    fn lock_time_operand(&self) -> Result<ScriptNumber, InterpreterError> {
        let top = self.dstack.peek(0)?;
        let n = ScriptNumber::from_bytes(top, LOCK_TIME_OPERAND_LEN, self.dstack.require_minimal())?;
        if n.val.is_negative() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", n.val),
            ));
        }
        Ok(n)
    }

    fn missing_context(opcode: &str) -> InterpreterError {
        InterpreterError::new(
            InterpreterErrorCode::InvalidParams,
            format!("{opcode} requires a transaction context"),
        )
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.flags.check_locktime || self.after_genesis() {
            if self.flags.discourage_upgradable_nops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::DiscourageUpgradableNOPs,
                    "OP_NOP2 reserved for soft-fork upgrades",
                ));
            }
            return Ok(());
        }

        let ctx = self
            .tx_context
            .ok_or_else(|| Self::missing_context("OP_CHECKLOCKTIMEVERIFY"))?;
        let lock_time = self.lock_time_operand()?.to_i64();

        verify_lock_time(i64::from(ctx.lock_time()), LOCK_TIME_THRESHOLD, lock_time)?;

        if ctx.input_sequence(self.input_idx) == MAX_TX_IN_SEQUENCE_NUM {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized",
            ));
        }
        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.flags.check_sequence || self.after_genesis() {
            if self.flags.discourage_upgradable_nops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::DiscourageUpgradableNOPs,
                    "OP_NOP3 reserved for soft-fork upgrades",
                ));
            }
            return Ok(());
        }

        let ctx = self
            .tx_context
            .ok_or_else(|| Self::missing_context("OP_CHECKSEQUENCEVERIFY"))?;
        let sequence = self.lock_time_operand()?.to_i64();

        if sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Ok(());
        }

        if ctx.tx_version() < 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("invalid transaction version: {}", ctx.tx_version()),
            ));
        }

        let tx_sequence = i64::from(ctx.input_sequence(self.input_idx));
        if tx_sequence & SEQUENCE_LOCK_TIME_DISABLED != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("transaction sequence 0x{:x} has the lock time disabled bit set", tx_sequence),
            ));
        }

        let mask = SEQUENCE_LOCK_TIME_IS_SECONDS | SEQUENCE_LOCK_TIME_MASK;
        verify_lock_time(tx_sequence & mask, SEQUENCE_LOCK_TIME_IS_SECONDS, sequence & mask)
    }
}

/// Compare a required lock time against the transaction's.
///
/// Both values must be on the same side of `threshold` (heights vs
/// timestamps) and the requirement must not exceed the transaction value.
pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold) != (lock_time < threshold) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!("mismatched locktime types: tx locktime {tx_lock_time}, stack locktime {lock_time}"),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!("locktime requirement not satisfied: {lock_time} > {tx_lock_time}"),
        ));
    }
    Ok(())
}
