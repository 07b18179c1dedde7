//! Pay-to-public-key-hash template.
//!
//! Locking: `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
//! Unlocking: `<sig> <pubkey>`.

use bsv_primitives::ec::PrivateKey;
use bsv_script::{Address, Network, Script};

use crate::sighash::{sign_input, SIGHASH_ALL_FORKID};
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Estimated unlocking script length: a 70-byte DER signature plus its
/// sighash byte and a 33-byte compressed key, each behind a one-byte push.
pub const UNLOCKING_SCRIPT_ESTIMATE: usize = 106;

/// Locking script paying to `address`.
pub fn lock(address: &Address) -> Script {
    address.locking_script()
}

/// Locking script paying to the key's compressed public key hash.
pub fn lock_to_key(key: &PrivateKey, network: Network) -> Script {
    lock(&Address::from_public_key(&key.pub_key(), network))
}

/// Signer for P2PKH inputs.
///
/// # Arguments
/// * `private_key` - The key owning the spent outputs.
/// * `sighash_flag` - Defaults to `SIGHASH_ALL_FORKID`.
pub fn unlock(private_key: PrivateKey, sighash_flag: Option<u32>) -> P2PKH {
    P2PKH {
        private_key,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL_FORKID),
    }
}

/// Assemble `<sig> <pubkey>`.
pub fn unlocking_script(signature: &[u8], public_key: &[u8]) -> Result<Script, TransactionError> {
    let mut script = Script::new();
    script.append_push_data(signature)?;
    script.append_push_data(public_key)?;
    Ok(script)
}

pub struct P2PKH {
    private_key: PrivateKey,
    sighash_flag: u32,
}

impl UnlockingScriptTemplate for P2PKH {
    /// Sign the input against its stored source output.
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<Script, TransactionError> {
        let source = tx
            .inputs
            .get(input_index)
            .ok_or_else(|| {
                TransactionError::SigningError(format!(
                    "input index {} out of range (tx has {} inputs)",
                    input_index,
                    tx.inputs.len()
                ))
            })?
            .source_output()
            .ok_or_else(|| {
                TransactionError::SigningError(format!(
                    "missing source output on input {}",
                    input_index
                ))
            })?;

        let sig = sign_input(
            tx,
            input_index,
            &self.private_key,
            &source.locking_script,
            source.satoshis,
            self.sighash_flag,
        )?;
        unlocking_script(&sig, &self.private_key.pub_key().to_compressed())
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        UNLOCKING_SCRIPT_ESTIMATE
    }
}
