//! Digest functions used by the hashing opcodes and by transaction ids.
//!
//! The interpreter maps `OP_SHA1`, `OP_SHA256`, `OP_RIPEMD160`,
//! `OP_HASH160` and `OP_HASH256` directly onto these functions, and the
//! sighash and txid code relies on [`sha256d`].

use ripemd::Ripemd160;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// SHA-1 digest, only reachable through `OP_SHA1`.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    Sha1::digest(data).into()
}

/// Compute the SHA-256 digest of `data`.
///
/// # Arguments
/// * `data` - Bytes to hash.
///
/// # Returns
/// The 32-byte digest.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Compute SHA-256(SHA-256(data)).
///
/// Transaction ids and signature hashes are both double SHA-256.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute the RIPEMD-160 digest of `data`.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(data).into()
}

/// Compute RIPEMD-160(SHA-256(data)), the public key hash behind P2PKH.
///
/// # Arguments
/// * `data` - Usually a compressed SEC1 public key.
///
/// # Returns
/// The 20-byte Hash160 digest.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Empty-input digests match the published constants.
    #[test]
    fn test_empty_input_digests() {
        assert_eq!(
            hex::encode(sha256(b"")),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            hex::encode(sha1(b"")),
            "da39a3ee5e6b4b0d3255bfef95601890afd80709"
        );
        assert_eq!(
            hex::encode(ripemd160(b"")),
            "9c1185a5c5e9fc54612808977ee8f548b2258d31"
        );
    }

    /// sha256d of "hello" is the second round applied to the first.
    #[test]
    fn test_sha256d_is_two_rounds() {
        let once = sha256(b"hello");
        assert_eq!(sha256d(b"hello"), sha256(&once));
        assert_eq!(
            hex::encode(sha256d(b"hello")),
            "9595c9df90075148eb06860365df33584b75bff782a510c6cd4883a419833d50"
        );
    }

    /// Hash160 of the generator point, the key behind the well-known
    /// `751e76e8...` public key hash.
    #[test]
    fn test_hash160_of_generator() {
        let g = hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
            .unwrap();
        assert_eq!(
            hex::encode(hash160(&g)),
            "751e76e8199196d454941c45d1b3a323f1433bd6"
        );
    }
}
