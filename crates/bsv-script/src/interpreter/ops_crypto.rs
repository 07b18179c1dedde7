//! Hashing and signature opcodes.
//!
//! Signature checks delegate to the [`TxContext`](super::TxContext) the
//! thread was created with; this module only enforces encodings and prepares
//! the script code that gets hashed.

use bsv_primitives::ec::signature::HALF_ORDER;
use bsv_primitives::hash;
use num_traits::ToPrimitive;

use crate::opcodes::OP_CODESEPARATOR;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::*;
use super::thread::Thread;

const SIGHASH_FORKID: u32 = 0x40;
const SIGHASH_ANYONECANPAY: u32 = 0x80;

pub(crate) enum HashKind {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

fn sig_error(code: InterpreterErrorCode, detail: impl Into<String>) -> InterpreterError {
    InterpreterError::new(code, format!("malformed signature: {}", detail.into()))
}

/// True if the big-endian integer `s` exceeds half the curve order.
fn is_high_s(s: &[u8]) -> bool {
    let start = s.iter().position(|&b| b != 0).unwrap_or(s.len());
    let s = &s[start..];
    if s.len() != HALF_ORDER.len() {
        return s.len() > HALF_ORDER.len();
    }
    s > &HALF_ORDER[..]
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, kind: HashKind) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop()?;
        let digest = match kind {
            HashKind::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            HashKind::Sha1 => hash::sha1(&buf).to_vec(),
            HashKind::Sha256 => hash::sha256(&buf).to_vec(),
            HashKind::Hash160 => hash::hash160(&buf).to_vec(),
            HashKind::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push(digest);
        Ok(())
    }

    /// The executing script from just after the last `OP_CODESEPARATOR`.
    fn sub_script(&self) -> ParsedScript {
        self.scripts[self.script_idx]
            .get(self.script_code_start..)
            .unwrap_or_default()
            .to_vec()
    }

    fn uses_forkid(&self, hash_type: u32) -> bool {
        self.flags.sighash_forkid && hash_type & SIGHASH_FORKID != 0
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pub_key = self.dstack.pop()?;
        let full_sig = self.dstack.pop()?;

        let Some((&hash_type, sig)) = full_sig.split_last() else {
            self.dstack.push_bool(false);
            return Ok(());
        };
        let hash_type = u32::from(hash_type);

        self.check_hash_type_encoding(hash_type)?;
        self.check_signature_encoding(sig)?;
        self.check_pub_key_encoding(&pub_key)?;

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "OP_CHECKSIG requires a transaction context",
            )
        })?;

        let forkid = self.uses_forkid(hash_type);
        let mut script_code = self.sub_script();
        if !forkid {
            script_code = remove_opcode_by_data(&script_code, &full_sig);
            script_code = remove_opcode(&script_code, OP_CODESEPARATOR);
        }

        let valid = ctx
            .verify_signature(&full_sig, &pub_key, &unparse(&script_code), self.input_idx, hash_type, forkid)
            .unwrap_or(false);

        if !valid && self.flags.null_fail && !sig.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig",
            ));
        }
        self.dstack.push_bool(valid);
        Ok(())
    }

    fn pop_count(&mut self, code: InterpreterErrorCode, what: &str) -> Result<usize, InterpreterError> {
        let n = self.dstack.pop_num()?;
        n.val.to_usize().ok_or_else(|| {
            InterpreterError::new(code, format!("number of {} {} is negative", what, n.val))
        })
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.pop_count(InterpreterErrorCode::InvalidPubKeyCount, "pubkeys")?;
        if num_keys > self.cfg.max_pub_keys_per_multisig {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!("too many pubkeys: {} > {}", num_keys, self.cfg.max_pub_keys_per_multisig),
            ));
        }

        self.num_ops += num_keys;
        if self.num_ops > self.cfg.max_ops {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", self.cfg.max_ops),
            ));
        }

        let pub_keys = (0..num_keys).map(|_| self.dstack.pop()).collect::<Result<Vec<_>, _>>()?;

        let num_sigs = self.pop_count(InterpreterErrorCode::InvalidSignatureCount, "signatures")?;
        if num_sigs > num_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("more signatures than pubkeys: {} > {}", num_sigs, num_keys),
            ));
        }
        let signatures = (0..num_sigs).map(|_| self.dstack.pop()).collect::<Result<Vec<_>, _>>()?;

        let dummy = self.dstack.pop()?;
        if self.flags.null_dummy && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy argument has length {} instead of 0", dummy.len()),
            ));
        }

        let mut script_code = self.sub_script();
        for sig in &signatures {
            script_code = remove_opcode_by_data(&script_code, sig);
            script_code = remove_opcode(&script_code, OP_CODESEPARATOR);
        }
        let script_code = unparse(&script_code);

        // Signatures must match keys in order; each key is tried once.
        let mut success = true;
        let mut keys = pub_keys.iter();
        let mut remaining_keys = num_keys;
        for (i, full_sig) in signatures.iter().enumerate() {
            let Some((&hash_type, sig)) = full_sig.split_last() else {
                success = false;
                break;
            };
            let hash_type = u32::from(hash_type);
            self.check_hash_type_encoding(hash_type)?;
            self.check_signature_encoding(sig)?;

            let ctx = self.tx_context.ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidParams,
                    "OP_CHECKMULTISIG requires a transaction context",
                )
            })?;

            let mut matched = false;
            while num_sigs - i <= remaining_keys {
                let Some(pub_key) = keys.next() else { break };
                remaining_keys -= 1;
                self.check_pub_key_encoding(pub_key)?;
                if ctx
                    .verify_signature(
                        full_sig,
                        pub_key,
                        &script_code,
                        self.input_idx,
                        hash_type,
                        self.uses_forkid(hash_type),
                    )
                    .unwrap_or(false)
                {
                    matched = true;
                    break;
                }
            }
            if !matched {
                success = false;
                break;
            }
        }

        if !success && self.flags.null_fail && signatures.iter().any(|s| !s.is_empty()) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "not all signatures empty on failed checkmultisig",
            ));
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    fn check_hash_type_encoding(&self, hash_type: u32) -> Result<(), InterpreterError> {
        if !self.flags.strict_encoding {
            return Ok(());
        }

        let base = hash_type & !(SIGHASH_ANYONECANPAY | SIGHASH_FORKID);
        if !(1..=3).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("invalid hash type 0x{:x}", hash_type),
            ));
        }

        let has_forkid = hash_type & SIGHASH_FORKID != 0;
        if has_forkid != self.flags.sighash_forkid {
            let detail = if has_forkid { "set without" } else { "not set with" };
            return Err(InterpreterError::new(
                InterpreterErrorCode::IllegalForkID,
                format!("fork id sighash {detail} the fork id flag"),
            ));
        }
        Ok(())
    }

    fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.flags.strict_encoding {
            return Ok(());
        }
        match (pub_key.len(), pub_key.first()) {
            (33, Some(0x02 | 0x03)) | (65, Some(0x04)) => Ok(()),
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::PubKeyType,
                "unsupported public key type",
            )),
        }
    }

    /// Strict DER layout: `0x30 len 0x02 rlen R 0x02 slen S`.
    fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        if !self.flags.checks_signature_encoding() || sig.is_empty() {
            return Ok(());
        }

        use InterpreterErrorCode as C;

        let len = sig.len();
        if len < 8 {
            return Err(sig_error(C::SigTooShort, format!("too short: {} < 8", len)));
        }
        if len > 72 {
            return Err(sig_error(C::SigTooLong, format!("too long: {} > 72", len)));
        }
        if sig[0] != 0x30 {
            return Err(sig_error(C::SigInvalidSeqID, format!("wrong type: {:#x}", sig[0])));
        }
        if sig[1] as usize != len - 2 {
            return Err(sig_error(C::SigInvalidDataLen, format!("bad length: {} != {}", sig[1], len - 2)));
        }

        let r_len = sig[3] as usize;
        let s_type_offset = 4 + r_len;
        if s_type_offset >= len {
            return Err(sig_error(C::SigMissingSTypeID, "S type indicator missing"));
        }
        let s_len_offset = s_type_offset + 1;
        if s_len_offset >= len {
            return Err(sig_error(C::SigMissingSLen, "S length missing"));
        }
        let s_offset = s_len_offset + 1;
        let s_len = sig[s_len_offset] as usize;
        if s_offset + s_len != len {
            return Err(sig_error(C::SigInvalidSLen, "invalid S length"));
        }

        if sig[2] != 0x02 {
            return Err(sig_error(C::SigInvalidRIntID, format!("R integer marker {:#x} != 0x02", sig[2])));
        }
        if r_len == 0 {
            return Err(sig_error(C::SigZeroRLen, "R length is zero"));
        }
        if sig[4] & 0x80 != 0 {
            return Err(sig_error(C::SigNegativeR, "R is negative"));
        }
        if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
            return Err(sig_error(C::SigTooMuchRPadding, "R value has too much padding"));
        }

        if sig[s_type_offset] != 0x02 {
            return Err(sig_error(
                C::SigInvalidSIntID,
                format!("S integer marker {:#x} != 0x02", sig[s_type_offset]),
            ));
        }
        if s_len == 0 {
            return Err(sig_error(C::SigZeroSLen, "S length is zero"));
        }
        if sig[s_offset] & 0x80 != 0 {
            return Err(sig_error(C::SigNegativeS, "S is negative"));
        }
        if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
            return Err(sig_error(C::SigTooMuchSPadding, "S value has too much padding"));
        }

        if self.flags.low_s && is_high_s(&sig[s_offset..]) {
            return Err(InterpreterError::new(
                C::SigHighS,
                "signature is not canonical due to unnecessarily high S value",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_high_s() {
        assert!(!is_high_s(&HALF_ORDER));
        let mut above = HALF_ORDER;
        above[31] += 1;
        assert!(is_high_s(&above));
        let mut padded = vec![0x00];
        padded.extend_from_slice(&HALF_ORDER);
        assert!(!is_high_s(&padded));
        assert!(!is_high_s(&[0x01]));
        assert!(is_high_s(&[0xff; 32]));
    }
}
