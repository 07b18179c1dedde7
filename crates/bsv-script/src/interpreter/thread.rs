//! A single script evaluation: program counter, stacks and dispatch.

use tracing::trace;

use crate::opcodes::*;
use crate::Script;

use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::VerificationFlags;
use super::ops_crypto::HashKind;
use super::parsed_opcode::*;
use super::stack::Stack;
use super::TxContext;

/// State of one `OP_IF` / `OP_NOTIF` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Cond {
    True,
    False,
    /// Nested inside a branch that is not executing.
    Skip,
}

/// Execution state for an unlocking/locking script pair.
pub struct Thread<'a> {
    pub(crate) dstack: Stack,
    pub(crate) astack: Stack,
    /// One entry per open conditional: whether its `OP_ELSE` was seen.
    pub(crate) else_stack: Vec<bool>,
    pub(crate) cond_stack: Vec<Cond>,
    pub(crate) cfg: Config,
    pub(crate) flags: VerificationFlags,
    pub(crate) scripts: Vec<ParsedScript>,
    saved_first_stack: Vec<Vec<u8>>,
    pub(crate) script_idx: usize,
    pub(crate) script_off: usize,
    /// Offset just past the last executed `OP_CODESEPARATOR`, zero if none ran.
    pub(crate) script_code_start: usize,
    pub(crate) num_ops: usize,
    p2sh: bool,
    /// An `OP_RETURN` ran after genesis; only conditionals execute until the script ends.
    pub(crate) early_return: bool,
    /// A top-level `OP_RETURN` ran after genesis; the current script is finished.
    pub(crate) script_done: bool,
    pub(crate) tx_context: Option<&'a dyn TxContext>,
    pub(crate) input_idx: usize,
}

fn script_too_big(which: &str, size: usize, max: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::ScriptTooBig,
        format!("{which} script size {size} is larger than the max allowed size {max}"),
    )
}

impl<'a> Thread<'a> {
    /// Prepare an evaluation.
    ///
    /// # Arguments
    /// * `unlocking_script` - Runs first; its stack feeds the locking script.
    /// * `locking_script` - The script being satisfied.
    /// * `flags` - Policy switches.
    /// * `cfg` - Limits; derived from `flags.after_genesis` when `None`.
    /// * `tx_context` - Spending transaction, needed by signature and lock-time opcodes.
    /// * `input_idx` - Index of the input being verified.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: &VerificationFlags,
        cfg: Option<Config>,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        let flags = flags.normalized();
        let cfg = cfg.unwrap_or_else(|| Config::for_genesis(flags.after_genesis));

        if flags.clean_stack && !flags.p2sh && !flags.after_genesis {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "clean stack requires p2sh evaluation before genesis",
            ));
        }

        if unlocking_script.len() > cfg.max_script_size {
            return Err(script_too_big("unlocking", unlocking_script.len(), cfg.max_script_size));
        }
        if locking_script.len() > cfg.max_script_size {
            return Err(script_too_big("locking", locking_script.len(), cfg.max_script_size));
        }

        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }

        let unlock = parse_script(unlocking_script)?;
        let lock = parse_script(locking_script)?;

        if flags.sig_push_only && !is_push_only(&unlock) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "unlocking script is not push only",
            ));
        }

        let p2sh = flags.p2sh && !flags.after_genesis && locking_script.is_p2sh();
        if p2sh && !is_push_only(&unlock) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash is not push only",
            ));
        }

        let script_idx = if unlock.is_empty() { 1 } else { 0 };
        let max_num_len = cfg.max_script_number_length;

        Ok(Thread {
            dstack: Stack::new(max_num_len, flags.minimal_data),
            astack: Stack::new(max_num_len, flags.minimal_data),
            else_stack: Vec::new(),
            cond_stack: Vec::new(),
            cfg,
            flags,
            scripts: vec![unlock, lock],
            saved_first_stack: Vec::new(),
            script_idx,
            script_off: 0,
            script_code_start: 0,
            num_ops: 0,
            p2sh,
            early_return: false,
            script_done: false,
            tx_context,
            input_idx,
        })
    }

    pub(crate) fn after_genesis(&self) -> bool {
        self.flags.after_genesis
    }

    /// True when the innermost conditional (if any) is taking its branch.
    pub(crate) fn is_branch_executing(&self) -> bool {
        self.cond_stack.last().map_or(true, |c| *c == Cond::True)
    }

    /// Genesis rules: every open conditional is true and no `OP_RETURN` has run.
    pub(crate) fn should_exec(&self, pop: &ParsedOpcode) -> bool {
        if !self.after_genesis() {
            return true;
        }
        let all_true = self.cond_stack.iter().all(|&c| c == Cond::True);
        all_true && (!self.early_return || pop.opcode == OP_RETURN)
    }

    /// Run to completion and check the final stack.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        while !self.step()? {}
        self.check_final_stack(true)
    }

    /// Execute one instruction. Returns `true` once every script has run.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        let pop = self
            .scripts
            .get(self.script_idx)
            .and_then(|s| s.get(self.script_off))
            .cloned()
            .ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidParams,
                    format!("program counter {}:{} is past the end", self.script_idx, self.script_off),
                )
            })?;

        self.execute_opcode(&pop)?;

        if self.script_done {
            self.script_done = false;
            self.script_off = self.scripts[self.script_idx].len();
        } else {
            self.script_off += 1;
        }

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > self.cfg.max_stack_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!("combined stack size {} > max allowed {}", combined, self.cfg.max_stack_size),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }

        self.finish_script()
    }

    fn finish_script(&mut self) -> Result<bool, InterpreterError> {
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution",
            ));
        }

        self.astack.clear();
        self.num_ops = 0;
        self.script_off = 0;
        self.script_code_start = 0;
        self.early_return = false;
        self.script_idx += 1;

        if self.p2sh {
            match self.script_idx {
                1 => self.saved_first_stack = self.dstack.items().to_vec(),
                2 => {
                    self.check_final_stack(false)?;
                    let mut saved = std::mem::take(&mut self.saved_first_stack);
                    let redeem = Script::from(saved.pop().unwrap_or_default());
                    trace!(redeem = %redeem, "evaluating p2sh redeem script");
                    self.scripts.push(parse_script(&redeem)?);
                    self.dstack.set_items(saved);
                }
                _ => {}
            }
        }

        while self.script_idx < self.scripts.len() && self.scripts[self.script_idx].is_empty() {
            self.script_idx += 1;
        }

        Ok(self.script_idx >= self.scripts.len())
    }

    fn check_final_stack(&mut self, final_script: bool) -> Result<(), InterpreterError> {
        if self.dstack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution",
            ));
        }

        if final_script && self.flags.clean_stack && self.dstack.depth() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", self.dstack.depth() - 1),
            ));
        }

        if !self.dstack.pop_bool()? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution",
            ));
        }
        Ok(())
    }

    fn opcode_set_enabled(&self, set: OpcodeSet) -> bool {
        match set {
            OpcodeSet::Monolith => self.flags.monolith_enabled(),
            OpcodeSet::Magnetic => self.flags.magnetic_enabled(),
        }
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if pop.opcode != OP_RETURN && pop.data.len() > self.cfg.max_script_element_size {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    self.cfg.max_script_element_size
                ),
            ));
        }

        let exec = self.should_exec(pop);

        let gated_off = pop.opcode_set().is_some_and(|set| !self.opcode_set_enabled(set));
        if (pop.is_disabled() || gated_off) && (!self.after_genesis() || exec) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        if pop.always_illegal() && !self.after_genesis() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            ));
        }

        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops),
                ));
            }
        }

        if !self.is_branch_executing() && !pop.is_conditional() {
            return Ok(());
        }

        if self.flags.minimal_data && pop.opcode <= OP_PUSHDATA4 && exec {
            pop.enforce_minimal_push()?;
        }

        if !exec && !pop.is_conditional() {
            return Ok(());
        }

        trace!(opcode = pop.name(), depth = self.dstack.depth(), "exec");
        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_0..=OP_PUSHDATA4 => {
                self.dstack.push(pop.data.clone());
                Ok(())
            }
            OP_1NEGATE => {
                self.dstack.push_int(-1);
                Ok(())
            }
            OP_1..=OP_16 => {
                self.dstack.push_int(i64::from(pop.opcode - (OP_1 - 1)));
                Ok(())
            }

            OP_NOP => Ok(()),
            OP_RESERVED | OP_VER | OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),
            OP_IF => self.op_if(pop, false),
            OP_NOTIF => self.op_if(pop, true),
            OP_VERIF | OP_VERNOTIF => self.op_ver_conditional(pop),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.verify_top(pop, InterpreterErrorCode::Verify),
            OP_RETURN => self.op_return(),
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(),
            OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(),

            OP_TOALTSTACK => {
                let item = self.dstack.pop()?;
                self.astack.push(item);
                Ok(())
            }
            OP_FROMALTSTACK => {
                let item = self.astack.pop()?;
                self.dstack.push(item);
                Ok(())
            }
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let depth = self.dstack.depth() as i64;
                self.dstack.push_int(depth);
                Ok(())
            }
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.remove(1).map(drop),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(false),
            OP_ROLL => self.op_pick(true),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            OP_CAT => self.op_cat(),
            OP_SPLIT => self.op_split(),
            OP_NUM2BIN => self.op_num2bin(),
            OP_BIN2NUM => self.op_bin2num(),
            OP_SIZE => self.op_size(),

            OP_INVERT => self.op_invert(),
            OP_AND => self.op_bitwise(|a, b| a & b),
            OP_OR => self.op_bitwise(|a, b| a | b),
            OP_XOR => self.op_bitwise(|a, b| a ^ b),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => {
                self.op_equal()?;
                self.verify_top(pop, InterpreterErrorCode::EqualVerify)
            }

            OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
                self.op_unary(pop.opcode)
            }
            OP_ADD | OP_SUB | OP_MUL | OP_DIV | OP_MOD | OP_BOOLAND | OP_BOOLOR | OP_NUMEQUAL
            | OP_NUMNOTEQUAL | OP_LESSTHAN | OP_GREATERTHAN | OP_LESSTHANOREQUAL
            | OP_GREATERTHANOREQUAL | OP_MIN | OP_MAX => self.op_binary(pop.opcode),
            OP_NUMEQUALVERIFY => {
                self.op_binary(OP_NUMEQUAL)?;
                self.verify_top(pop, InterpreterErrorCode::NumEqualVerify)
            }
            OP_WITHIN => self.op_within(),
            OP_LSHIFT => self.op_shift(true),
            OP_RSHIFT => self.op_shift(false),

            OP_RIPEMD160 => self.op_hash(HashKind::Ripemd160),
            OP_SHA1 => self.op_hash(HashKind::Sha1),
            OP_SHA256 => self.op_hash(HashKind::Sha256),
            OP_HASH160 => self.op_hash(HashKind::Hash160),
            OP_HASH256 => self.op_hash(HashKind::Hash256),
            OP_CODESEPARATOR => {
                self.script_code_start = self.script_off + 1;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => {
                self.op_checksig()?;
                self.verify_top(pop, InterpreterErrorCode::CheckSigVerify)
            }
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => {
                self.op_checkmultisig()?;
                self.verify_top(pop, InterpreterErrorCode::CheckMultiSigVerify)
            }

            OP_NOP1 | OP_NOP4..=OP_NOP10 => self.op_upgradable_nop(pop),

            _ => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute invalid opcode {}", pop.name()),
            )),
        }
    }
}
