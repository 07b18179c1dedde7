//! ECDSA signatures in the DER form carried by `OP_CHECKSIG` pushes.
//!
//! Signatures are always produced in low-S form, and `to_der` normalises S
//! again on output so that a hand-built signature also satisfies the
//! low-S policy check in the interpreter.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa;

use crate::ec::private_key::PrivateKey;
use crate::ec::public_key::PublicKey;
use crate::PrimitivesError;

/// The secp256k1 group order N, big-endian.
pub const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// N / 2, the largest S value accepted by the low-S rule.
pub const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// An (R, S) pair, each stored as a 32-byte big-endian integer.
///
/// Fixed-width big-endian arrays compare lexicographically in the same
/// order as the integers they hold, which the range checks rely on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    /// Build a signature from raw components.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// The R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// True when S is in the lower half of the order.
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_ORDER
    }

    /// Parse `0x30 len 0x02 rlen R 0x02 slen S`.
    ///
    /// # Arguments
    /// * `bytes` - DER bytes without the trailing sighash byte.
    ///
    /// # Returns
    /// The signature, or `InvalidSignature` describing the first structural
    /// problem found. R and S must both be in `1..N`.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let malformed = |why: &str| PrimitivesError::InvalidSignature(format!("malformed signature: {}", why));

        if bytes.len() < 8 {
            return Err(malformed("too short"));
        }
        if bytes[0] != 0x30 {
            return Err(malformed("no sequence header"));
        }
        let seq_len = bytes[1] as usize;
        if seq_len + 2 != bytes.len() {
            return Err(malformed("sequence length mismatch"));
        }

        let (r, rest) = read_der_int(&bytes[2..]).map_err(|e| malformed(&format!("R {}", e)))?;
        let (s, rest) = read_der_int(rest).map_err(|e| malformed(&format!("S {}", e)))?;
        if !rest.is_empty() {
            return Err(malformed("trailing bytes"));
        }

        for (name, v) in [("R", &r), ("S", &s)] {
            if v.iter().all(|&b| b == 0) {
                return Err(PrimitivesError::InvalidSignature(format!("signature {} is zero", name)));
            }
            if *v >= CURVE_ORDER {
                return Err(PrimitivesError::InvalidSignature(format!(
                    "signature {} is not below the curve order",
                    name
                )));
            }
        }
        Ok(Signature { r, s })
    }

    /// Serialise as DER with S forced into the lower half.
    pub fn to_der(&self) -> Vec<u8> {
        let s = if self.is_low_s() { self.s } else { negate_mod_order(&self.s) };
        let rb = der_int_bytes(&self.r);
        let sb = der_int_bytes(&s);

        let mut out = Vec::with_capacity(6 + rb.len() + sb.len());
        out.push(0x30);
        out.push((4 + rb.len() + sb.len()) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Sign a digest with RFC6979 nonces and return the low-S form.
    ///
    /// Digests shorter than 32 bytes are left-padded with zeros.
    pub fn sign(hash: &[u8], priv_key: &PrivateKey) -> Result<Self, PrimitivesError> {
        let digest = to_digest(hash);
        let (sig, _) = priv_key
            .signing_key()
            .sign_prehash_recoverable(&digest)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;

        let (r_bytes, s_bytes) = sig.split_bytes();
        let r: [u8; 32] = r_bytes.into();
        let mut s: [u8; 32] = s_bytes.into();
        if s > HALF_ORDER {
            s = negate_mod_order(&s);
        }
        Ok(Signature { r, s })
    }

    /// Verify against a digest and key. Any malformed component yields `false`.
    pub fn verify(&self, hash: &[u8], pub_key: &PublicKey) -> bool {
        let sig = match ecdsa::Signature::from_scalars(
            k256::FieldBytes::from(self.r),
            k256::FieldBytes::from(self.s),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        pub_key
            .verifying_key()
            .verify_prehash(&to_digest(hash), &sig)
            .is_ok()
    }
}

fn to_digest(hash: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    if hash.len() >= 32 {
        out.copy_from_slice(&hash[..32]);
    } else {
        out[32 - hash.len()..].copy_from_slice(hash);
    }
    out
}

/// Read one `0x02 len value` element, returning the value left-padded to 32
/// bytes and the unread tail.
fn read_der_int(data: &[u8]) -> Result<([u8; 32], &[u8]), &'static str> {
    if data.len() < 2 || data[0] != 0x02 {
        return Err("missing integer marker");
    }
    let len = data[1] as usize;
    if len == 0 || 2 + len > data.len() {
        return Err("bad length");
    }
    let mut value = &data[2..2 + len];
    if value[0] & 0x80 != 0 {
        return Err("is negative");
    }
    while value.len() > 1 && value[0] == 0 {
        value = &value[1..];
    }
    if value.len() > 32 {
        return Err("too large");
    }
    let mut out = [0u8; 32];
    out[32 - value.len()..].copy_from_slice(value);
    Ok((out, &data[2 + len..]))
}

/// Minimal big-endian encoding with a 0x00 pad when the high bit is set.
fn der_int_bytes(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// N - val.
fn negate_mod_order(val: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = CURVE_ORDER[i] as i16 - val[i] as i16 - borrow;
        borrow = 0;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        }
        out[i] = diff as u8;
    }
    out
}
