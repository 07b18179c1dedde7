//! Script verification against a real transaction.
//!
//! [`TransactionContext`] answers the interpreter's signature and lock-time
//! questions from a borrowed transaction, so `OP_CHECKSIG` checks ECDSA
//! signatures over the same sighash that [`sign_input`](crate::sighash::sign_input)
//! produces.

use bsv_primitives::ec::{PublicKey, Signature};
use bsv_script::interpreter::{
    Engine, InterpreterError, TxContext, VerificationFlags, VerificationResult,
};
use bsv_script::Script;
use tracing::trace;

use crate::sighash::signature_hash_for;
use crate::transaction::Transaction;

/// Verification context for one input of a transaction.
#[derive(Clone, Copy, Debug)]
pub struct TransactionContext<'a> {
    tx: &'a Transaction,
    /// Amount of the output spent by the input under verification.
    input_amount: u64,
}

impl<'a> TransactionContext<'a> {
    pub fn new(tx: &'a Transaction, input_amount: u64) -> Self {
        TransactionContext { tx, input_amount }
    }
}

impl TxContext for TransactionContext<'_> {
    /// Malformed signatures and keys count as invalid, not as errors.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        sub_script: &Script,
        input_idx: usize,
        sighash_flag: u32,
        forkid: bool,
    ) -> Result<bool, InterpreterError> {
        let Some((_, der)) = full_sig.split_last() else {
            return Ok(false);
        };
        let (Ok(sig), Ok(key)) = (Signature::from_der(der), PublicKey::from_bytes(pub_key)) else {
            trace!(input = input_idx, "unparseable signature or public key");
            return Ok(false);
        };
        let Ok(digest) =
            signature_hash_for(self.tx, input_idx, sub_script, self.input_amount, sighash_flag, forkid)
        else {
            return Ok(false);
        };
        Ok(key.verify(&digest, &sig))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn tx_version(&self) -> u32 {
        self.tx.version
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx.inputs.get(input_idx).map_or(0, |i| i.sequence_number)
    }
}

/// Verify one input's unlocking script against the output it spends.
///
/// # Arguments
/// * `tx` - The spending transaction.
/// * `input_index` - The input to verify.
/// * `prev_script` - Locking script of the spent output.
/// * `prev_amount` - Amount of the spent output.
/// * `flags` - Interpreter policy.
///
/// # Returns
/// A result with `success == false` and a reason on any failure.
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_amount: u64,
    flags: &VerificationFlags,
) -> VerificationResult {
    let Some(input) = tx.inputs.get(input_index) else {
        return VerificationResult::failed(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        ));
    };
    let ctx = TransactionContext::new(tx, prev_amount);
    Engine::new().verify(&input.unlocking_script, prev_script, flags, Some(&ctx), input_index)
}

/// Verify every input that knows its source output.
///
/// # Returns
/// The first failure, tagged with its input index, or success.
pub fn verify_all(tx: &Transaction, flags: &VerificationFlags) -> VerificationResult {
    for (i, input) in tx.inputs.iter().enumerate() {
        let Some(source) = input.source_output() else {
            return VerificationResult::failed(format!("missing source output on input {}", i));
        };
        let result = verify_input(tx, i, &source.locking_script, source.satoshis, flags);
        if !result.success {
            let reason = result.reason.unwrap_or_default();
            return VerificationResult::failed(format!("input {}: {}", i, reason));
        }
    }
    VerificationResult::ok()
}
