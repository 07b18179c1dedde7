//! Stack-machine script interpreter.
//!
//! Runs an unlocking script followed by the locking script it spends and
//! decides whether the pair succeeds under a set of [`VerificationFlags`].
//!
//! The interpreter does not know about transactions. Signature and lock-time
//! opcodes ask a caller-supplied [`TxContext`] instead, so the transaction
//! crate can depend on this one without a cycle.
//!
//! # Example
//!
//! ```
//! use bsv_script::interpreter::{Engine, VerificationFlags};
//! use bsv_script::Script;
//!
//! let unlock = Script::from_asm("OP_11").unwrap();
//! let lock = Script::from_asm("OP_4 OP_7 OP_ADD OP_EQUAL").unwrap();
//! let result = Engine::new().verify(&unlock, &lock, &VerificationFlags::contract(), None, 0);
//! assert!(result.success);
//! ```

pub mod config;
pub mod error;
pub mod flags;
mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

pub use config::Config;
pub use error::{InterpreterError, InterpreterErrorCode};
pub use flags::VerificationFlags;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Script;
use thread::Thread;

/// Access to the spending transaction for signature and lock-time opcodes.
pub trait TxContext {
    /// Check a signature over the input being verified.
    ///
    /// # Arguments
    /// * `full_sig` - DER signature followed by the sighash type byte.
    /// * `pub_key` - Encoded public key.
    /// * `sub_script` - Script code committed to by the sighash.
    /// * `input_idx` - Index of the input being verified.
    /// * `sighash_flag` - The sighash type byte.
    /// * `forkid` - Digest with the fork-id algorithm. Set only when the
    ///   type carries FORKID and the flags enable fork-id hashing.
    ///
    /// # Returns
    /// `Ok(true)` for a valid signature, `Ok(false)` for an invalid one.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
        forkid: bool,
    ) -> Result<bool, InterpreterError>;

    fn lock_time(&self) -> u32;

    fn tx_version(&self) -> u32;

    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// Outcome of a verification that is not allowed to fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub success: bool,
    /// Why verification failed. `None` on success.
    pub reason: Option<String>,
}

impl VerificationResult {
    pub fn ok() -> Self {
        VerificationResult { success: true, reason: None }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        VerificationResult { success: false, reason: Some(reason.into()) }
    }
}

impl From<Result<(), InterpreterError>> for VerificationResult {
    fn from(result: Result<(), InterpreterError>) -> Self {
        match result {
            Ok(()) => VerificationResult::ok(),
            Err(e) => VerificationResult::failed(e.to_string()),
        }
    }
}

/// Entry point for script evaluation.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: Option<Config>,
}

impl Engine {
    /// An engine that derives its limits from each run's flags.
    pub fn new() -> Self {
        Engine { config: None }
    }

    /// An engine with fixed limits, ignoring `after_genesis` for limit selection.
    pub fn with_config(config: Config) -> Self {
        Engine { config: Some(config) }
    }

    /// Execute an unlocking script followed by the locking script.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking script.
    /// * `locking_script` - The previous output's locking script.
    /// * `flags` - Policy switches for this run.
    /// * `tx_context` - The spending transaction; required only by signature and lock-time opcodes.
    /// * `input_idx` - The input being verified.
    ///
    /// # Returns
    /// `Ok(())` when the final stack top is true, otherwise the first failure.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: &VerificationFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread =
            Thread::new(unlocking_script, locking_script, flags, self.config, tx_context, input_idx)?;
        thread.execute()
    }

    /// Like [`execute`](Self::execute), folding any failure into the result.
    pub fn verify(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: &VerificationFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> VerificationResult {
        let result = self.execute(unlocking_script, locking_script, flags, tx_context, input_idx);
        if let Err(e) = &result {
            debug!(input = input_idx, code = %e.code, "script verification failed: {}", e.description);
        }
        result.into()
    }
}
