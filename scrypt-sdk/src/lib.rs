#![deny(missing_docs)]

//! sCrypt SDK for Rust.
//!
//! Re-exports the contract toolchain for single-crate usage: primitives,
//! script and interpreter, transactions and builders, compiled contracts,
//! and the WhatsOnChain client.

pub use bsv_contract as contract;
pub use bsv_primitives as primitives;
pub use bsv_script as script;
pub use bsv_transaction as transaction;
pub use bsv_woc as woc;

/// The types most programs need.
pub mod prelude {
    pub use bsv_contract::{Compiler, CompilerConfig, Contract, ContractClass, ContractError, SpendContext};
    pub use bsv_primitives::chainhash::Hash;
    pub use bsv_primitives::ec::PrivateKey;
    pub use bsv_script::interpreter::VerificationFlags;
    pub use bsv_script::{Literal, Network, Script};
    pub use bsv_transaction::{FeePolicy, Transaction, TransactionBuilder, Utxo};
    pub use bsv_woc::{RemoteFlows, WocClient, WocConfig, WocError};
}
