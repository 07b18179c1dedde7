/// secp256k1 keys and ECDSA signatures.
///
/// Only single-key signing is supported: a private key produces low-S DER
/// signatures over a 32-byte sighash, and a public key verifies them.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
