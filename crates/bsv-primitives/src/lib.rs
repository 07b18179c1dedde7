/// Cryptographic primitives for script evaluation and transaction signing.
///
/// This crate provides the low-level building blocks used by the script
/// interpreter and the transaction builder:
/// - Digest functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - The 32-byte chain hash used for transaction ids
/// - Varint encoding with a cursor reader and a byte writer
/// - secp256k1 keys, WIF import/export and low-S DER signatures

pub mod hash;
pub mod chainhash;
pub mod util;
pub mod ec;

mod error;
pub use error::PrimitivesError;
