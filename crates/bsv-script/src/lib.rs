//! Script layer of the SDK.
//!
//! Provides the [`Script`] byte type with its assembly form, contract
//! argument [`Literal`]s, placeholder-aware [`Assembly`] templates, address
//! handling and a stack-machine [`interpreter`] for verifying script pairs.

pub mod address;
pub mod asm;
pub mod chunk;
pub mod interpreter;
pub mod literal;
pub mod opcodes;
pub mod script;

mod error;
pub use address::{Address, Network};
pub use asm::{Assembly, Bindings, Token};
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use literal::Literal;
pub use script::Script;
