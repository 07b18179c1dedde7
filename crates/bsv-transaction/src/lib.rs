//! Transactions for locking funds into contracts and spending them.
//!
//! Provides the wire-format [`Transaction`] type, signature hashing, the
//! P2PKH template, verification of inputs through the script interpreter,
//! and builders for lock, unlock and funded unlock transactions.

pub mod builder;
pub mod input;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;
pub mod verify;

mod error;
pub use builder::{FeePolicy, FundedPreimage, TransactionBuilder, Utxo};
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
pub use verify::{verify_all, verify_input, TransactionContext};

#[cfg(test)]
mod tests;
