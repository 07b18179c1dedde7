//! Unlocking script templates.
//!
//! A template knows how to produce the unlocking script for one input of a
//! transaction, and how long that script will be before it exists so the
//! builder can charge for it.

pub mod p2pkh;

use bsv_script::Script;

use crate::transaction::Transaction;
use crate::TransactionError;

pub trait UnlockingScriptTemplate {
    /// Produce the unlocking script for `input_index`.
    ///
    /// # Returns
    /// The script, or an error if the input cannot be signed.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError>;

    /// Upper estimate of the unlocking script length in bytes, used for fees.
    fn estimate_length(&self, tx: &Transaction, input_index: usize) -> usize;
}
