//! Signature hash computation.
//!
//! Two preimage algorithms exist. With `SIGHASH_FORKID` set the replay
//! protected algorithm commits to the spent amount and hashes the prevouts,
//! sequences and outputs once each. Without it the legacy algorithm
//! serializes a modified copy of the whole transaction.
//!
//! See <https://github.com/bitcoin-sv/bitcoin-sv/blob/master/doc/abc/replay-protected-sighash.md#digest-algorithm>

use bsv_primitives::ec::PrivateKey;
use bsv_primitives::hash::sha256d;
use bsv_primitives::util::BsvWriter;
use bsv_script::interpreter::parsed_opcode::{parse_script, remove_opcode, unparse};
use bsv_script::opcodes::OP_CODESEPARATOR;
use bsv_script::Script;
use tracing::trace;

use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs.
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs and no outputs.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and the output with the same index as the signed input.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Sign only the current input; others may be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Replay-protected digest algorithm.
pub const SIGHASH_FORKID: u32 = 0x40;

pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

pub const SIGHASH_ALL_ANYONECANPAY_FORKID: u32 = SIGHASH_ALL | SIGHASH_ANYONECANPAY | SIGHASH_FORKID;

/// Mask extracting the base type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// Digest signed for legacy `SINGLE` when the input has no matching output.
const SIGHASH_SINGLE_BUG: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 0x01;
    one
};

fn check_index(tx: &Transaction, input_index: usize) -> Result<(), TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }
    Ok(())
}

fn is_single_without_output(tx: &Transaction, input_index: usize, sighash_type: u32) -> bool {
    sighash_type & SIGHASH_MASK == SIGHASH_SINGLE && input_index >= tx.outputs.len()
}

/// Build the bytes that are double-hashed and signed for one input.
///
/// # Arguments
/// * `tx` - The spending transaction.
/// * `input_index` - Index of the input being signed.
/// * `prev_script` - Locking script of the spent output (the script code).
/// * `prev_amount` - Amount of the spent output; only the fork-id algorithm commits to it.
/// * `sighash_type` - Combined sighash flags.
///
/// # Returns
/// The preimage, or `InvalidTransaction` for an out-of-range input or a
/// legacy `SINGLE` input without a matching output.
pub fn sighash_preimage(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_amount: u64,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    preimage_for(tx, input_index, prev_script, prev_amount, sighash_type, sighash_type & SIGHASH_FORKID != 0)
}

fn preimage_for(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_amount: u64,
    sighash_type: u32,
    forkid: bool,
) -> Result<Vec<u8>, TransactionError> {
    check_index(tx, input_index)?;
    if forkid {
        Ok(forkid_preimage(tx, input_index, prev_script.to_bytes(), prev_amount, sighash_type))
    } else {
        if is_single_without_output(tx, input_index, sighash_type) {
            return Err(TransactionError::InvalidTransaction(format!(
                "SIGHASH_SINGLE input {} has no matching output",
                input_index
            )));
        }
        legacy_preimage(tx, input_index, prev_script, sighash_type)
    }
}

/// Double SHA-256 of [`sighash_preimage`].
///
/// Legacy `SINGLE` without a matching output yields the digest `0x01 00..00`
/// instead of an error.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_amount: u64,
    sighash_type: u32,
) -> Result<[u8; 32], TransactionError> {
    signature_hash_for(tx, input_index, prev_script, prev_amount, sighash_type, sighash_type & SIGHASH_FORKID != 0)
}

/// [`signature_hash`] with the algorithm picked by `forkid` instead of the
/// type's FORKID bit.
///
/// A verifier with fork-id hashing disabled digests every signature the
/// legacy way, keeping the full type byte, so FORKID-typed signatures made
/// by a fork-id signer no longer match.
pub fn signature_hash_for(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_amount: u64,
    sighash_type: u32,
    forkid: bool,
) -> Result<[u8; 32], TransactionError> {
    check_index(tx, input_index)?;
    if !forkid && is_single_without_output(tx, input_index, sighash_type) {
        return Ok(SIGHASH_SINGLE_BUG);
    }
    let preimage = preimage_for(tx, input_index, prev_script, prev_amount, sighash_type, forkid)?;
    trace!(input = input_index, sighash_type, forkid, len = preimage.len(), "computed sighash preimage");
    Ok(sha256d(&preimage))
}

/// Sign one input.
///
/// # Returns
/// A low-S DER signature followed by the sighash type byte, ready to push
/// in an unlocking script.
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    key: &PrivateKey,
    prev_script: &Script,
    prev_amount: u64,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    let digest = signature_hash(tx, input_index, prev_script, prev_amount, sighash_type)?;
    let mut sig = key.sign(&digest)?.to_der();
    sig.push(sighash_type as u8);
    Ok(sig)
}

/// The fork-id preimage:
///
/// 1. nVersion (4 bytes LE)
/// 2. hashPrevouts (32 bytes)
/// 3. hashSequence (32 bytes)
/// 4. outpoint (32+4 bytes)
/// 5. scriptCode (varint + script)
/// 6. value (8 bytes LE)
/// 7. nSequence (4 bytes LE)
/// 8. hashOutputs (32 bytes)
/// 9. nLocktime (4 bytes LE)
/// 10. sighashType (4 bytes LE)
fn forkid_preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    prev_amount: u64,
    sighash_type: u32,
) -> Vec<u8> {
    let input = &tx.inputs[input_index];
    let base_type = sighash_type & SIGHASH_MASK;
    let anyone_can_pay = sighash_type & SIGHASH_ANYONECANPAY != 0;

    let hash_prevouts = if anyone_can_pay { [0u8; 32] } else { prevouts_hash(tx) };

    let hash_sequence = if !anyone_can_pay && base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        sequence_hash(tx)
    } else {
        [0u8; 32]
    };

    let hash_outputs = if base_type != SIGHASH_SINGLE && base_type != SIGHASH_NONE {
        outputs_hash(tx, None)
    } else if base_type == SIGHASH_SINGLE && input_index < tx.outputs.len() {
        outputs_hash(tx, Some(input_index))
    } else {
        [0u8; 32]
    };

    let mut writer = BsvWriter::with_capacity(160 + script_code.len());
    writer.write_u32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.write_outpoint(&mut writer);
    writer.write_var_bytes(script_code);
    writer.write_u64_le(prev_amount);
    writer.write_u32_le(input.sequence_number);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type);
    writer.into_bytes()
}

/// The legacy preimage: a modified copy of the transaction followed by the
/// sighash type.
fn legacy_preimage(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    sighash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    let script_code = unparse(&remove_opcode(&parse_script(prev_script)?, OP_CODESEPARATOR));
    let base_type = sighash_type & SIGHASH_MASK;

    let mut copy = tx.clone();
    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.unlocking_script = if i == input_index { script_code.clone() } else { Script::new() };
    }

    match base_type {
        SIGHASH_NONE => {
            copy.outputs.clear();
            zero_other_sequences(&mut copy, input_index);
        }
        SIGHASH_SINGLE => {
            copy.outputs.truncate(input_index + 1);
            for output in copy.outputs.iter_mut().take(input_index) {
                output.satoshis = u64::MAX;
                output.locking_script = Script::new();
            }
            zero_other_sequences(&mut copy, input_index);
        }
        _ => {}
    }

    if sighash_type & SIGHASH_ANYONECANPAY != 0 {
        let signed = copy.inputs.swap_remove(input_index);
        copy.inputs = vec![signed];
    }

    let mut writer = BsvWriter::with_capacity(256);
    copy.write_to(&mut writer);
    writer.write_u32_le(sighash_type);
    Ok(writer.into_bytes())
}

fn zero_other_sequences(tx: &mut Transaction, input_index: usize) {
    for (i, input) in tx.inputs.iter_mut().enumerate() {
        if i != input_index {
            input.sequence_number = 0;
        }
    }
}

fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        input.write_outpoint(&mut writer);
    }
    sha256d(&writer.into_bytes())
}

fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = BsvWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence_number);
    }
    sha256d(&writer.into_bytes())
}

/// Hash all outputs, or only the one at `only`.
fn outputs_hash(tx: &Transaction, only: Option<usize>) -> [u8; 32] {
    let mut writer = BsvWriter::new();
    match only {
        Some(n) => tx.outputs[n].write_to(&mut writer),
        None => tx.outputs.iter().for_each(|o| o.write_to(&mut writer)),
    }
    sha256d(&writer.into_bytes())
}
