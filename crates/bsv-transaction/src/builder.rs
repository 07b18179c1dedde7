//! Builders for the transactions that lock funds into a contract and spend
//! them out again.
//!
//! Three shapes are supported:
//!
//! - lock: P2PKH UTXOs fund one contract output, with change back to the key;
//! - unlock: one contract output is spent into one new output, the unlocking
//!   script is attached afterwards;
//! - funded unlock: as unlock, plus one P2PKH funding input and a change
//!   output, so the contract amount does not have to pay the fee.
//!
//! Fees follow a [`FeePolicy`]. The size estimate counts each unsigned P2PKH
//! input at [`UNLOCKING_SCRIPT_ESTIMATE`] bytes of unlocking script.

use std::collections::HashSet;

use bsv_primitives::chainhash::Hash;
use bsv_primitives::ec::PrivateKey;
use bsv_script::{Network, Script};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash::{sighash_preimage, sign_input, SIGHASH_ALL_ANYONECANPAY_FORKID, SIGHASH_ALL_FORKID};
use crate::template::p2pkh::{self, UNLOCKING_SCRIPT_ESTIMATE};
use crate::template::UnlockingScriptTemplate;
use crate::transaction::Transaction;
use crate::TransactionError;

/// An unspent output available for funding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub tx_id: Hash,
    pub output_index: u32,
    pub satoshis: u64,
    /// Locking script of the output.
    pub script: Script,
}

impl Utxo {
    fn to_input(&self) -> TransactionInput {
        TransactionInput::new(self.tx_id, self.output_index)
            .with_source_output(TransactionOutput::new(self.satoshis, self.script.clone()))
    }
}

/// Fee rules applied by the builders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeePolicy {
    /// Satoshis per 1000 bytes of estimated size.
    pub fee_per_kb: u64,
    /// Absolute floor on the fee of any built transaction.
    pub min_fee: u64,
    /// Change at or below this amount is left to the fee instead.
    pub dust_threshold: u64,
}

impl Default for FeePolicy {
    fn default() -> Self {
        FeePolicy {
            fee_per_kb: 500,
            min_fee: 546,
            dust_threshold: 546,
        }
    }
}

impl FeePolicy {
    /// Fee for a transaction of `size` bytes: the size-based estimate,
    /// raised to `min_fee`.
    pub fn fee_for_size(&self, size: usize) -> u64 {
        let estimate = (size as u64).saturating_mul(self.fee_per_kb) / 1000;
        estimate.max(self.min_fee)
    }
}

/// Serialized size of `tx` once its unsigned P2PKH inputs are signed.
pub fn estimated_size(tx: &Transaction) -> usize {
    let pending: usize = tx
        .inputs
        .iter()
        .filter(|i| i.unlocking_script.is_empty() && i.source_script().is_some_and(Script::is_p2pkh))
        .map(|_| UNLOCKING_SCRIPT_ESTIMATE)
        .sum();
    tx.size() + pending
}

/// Sighash preimage of a funded unlock, with the amounts that went into it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundedPreimage {
    pub preimage: Vec<u8>,
    /// Amount of the change output, zero when none was added.
    pub change: u64,
    pub fee: u64,
}

/// Builds lock and unlock transactions under one fee policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransactionBuilder {
    pub fee_policy: FeePolicy,
    /// Network of the change addresses.
    pub network: Network,
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        TransactionBuilder {
            fee_policy: FeePolicy::default(),
            network: Network::Testnet,
        }
    }
}

fn check_unique(utxos: &[Utxo]) -> Result<(), TransactionError> {
    let mut seen = HashSet::with_capacity(utxos.len());
    for utxo in utxos {
        if !seen.insert((utxo.tx_id, utxo.output_index)) {
            return Err(TransactionError::InvalidTransaction(format!(
                "utxo {}:{} supplied more than once",
                utxo.tx_id, utxo.output_index
            )));
        }
    }
    Ok(())
}

fn check_owned(utxos: &[Utxo], owner_script: &Script) -> Result<(), TransactionError> {
    match utxos.iter().find(|u| u.script != *owner_script) {
        Some(utxo) => Err(TransactionError::InvalidTransaction(format!(
            "utxo {}:{} is not locked to the change key",
            utxo.tx_id, utxo.output_index
        ))),
        None => Ok(()),
    }
}

impl TransactionBuilder {
    pub fn new(fee_policy: FeePolicy, network: Network) -> Self {
        TransactionBuilder { fee_policy, network }
    }

    /// Add a change output for whatever exceeds `spent` plus the fee, when
    /// it is above the dust threshold.
    ///
    /// # Returns
    /// The fee, or `InsufficientFunds` if the inputs do not even cover
    /// `spent` plus the fee without change.
    fn add_change(&self, tx: &mut Transaction, change_script: Script) -> Result<u64, TransactionError> {
        let available = tx.total_input_satoshis()?;
        let spent = tx.total_output_satoshis();

        let fee = self.fee_policy.fee_for_size(estimated_size(tx));
        let required = spent.saturating_add(fee);
        if available < required {
            return Err(TransactionError::InsufficientFunds { required, available });
        }

        tx.add_output(TransactionOutput::new(0, change_script));
        let fee_with_change = self.fee_policy.fee_for_size(estimated_size(tx));
        let change = available.saturating_sub(spent).saturating_sub(fee_with_change);
        if change > self.fee_policy.dust_threshold {
            if let Some(out) = tx.outputs.last_mut() {
                out.satoshis = change;
            }
            debug!(fee = fee_with_change, change, "added change output");
            Ok(fee_with_change)
        } else {
            tx.outputs.pop();
            debug!(fee = available - spent, "leftover below dust threshold, no change output");
            Ok(available - spent)
        }
    }

    fn sign_p2pkh_input(tx: &mut Transaction, index: usize, key: &PrivateKey) -> Result<(), TransactionError> {
        let script = p2pkh::unlock(key.clone(), Some(SIGHASH_ALL_FORKID)).sign(tx, index)?;
        tx.set_unlocking_script(index, script)
    }

    /// Fund a contract output from P2PKH UTXOs.
    ///
    /// UTXOs are taken in order until the amount plus fee is covered. The
    /// leftover goes to a change output paying `change_key` when it exceeds
    /// the dust threshold. Every P2PKH input is signed with `ALL|FORKID`.
    ///
    /// # Arguments
    /// * `utxos` - Candidate inputs, each spent at most once.
    /// * `locking_script` - The contract's locking script.
    /// * `amount` - Satoshis to lock.
    /// * `change_key` - Owner of the UTXOs and receiver of the change.
    ///
    /// # Returns
    /// The signed transaction, `InsufficientFunds` if the UTXOs total less
    /// than the amount plus fee, or `InvalidTransaction` for duplicate UTXOs
    /// and for UTXOs not locked to `change_key`'s P2PKH script.
    pub fn build_lock_tx(
        &self,
        utxos: &[Utxo],
        locking_script: &Script,
        amount: u64,
        change_key: &PrivateKey,
    ) -> Result<Transaction, TransactionError> {
        check_unique(utxos)?;
        let change_script = p2pkh::lock_to_key(change_key, self.network);
        check_owned(utxos, &change_script)?;
        let available: u64 = utxos.iter().map(|u| u.satoshis).sum();
        let floor = amount.saturating_add(self.fee_policy.min_fee);
        if available < floor {
            return Err(TransactionError::InsufficientFunds { required: floor, available });
        }

        let mut tx = Transaction::new();
        tx.add_output(TransactionOutput::new(amount, locking_script.clone()));

        let mut selected = 0u64;
        for utxo in utxos {
            tx.add_input(utxo.to_input());
            selected += utxo.satoshis;
            let fee = self.fee_policy.fee_for_size(estimated_size(&tx));
            if selected >= amount.saturating_add(fee) {
                break;
            }
        }

        let fee = self.add_change(&mut tx, change_script).map_err(|e| match e {
            TransactionError::InsufficientFunds { required, .. } => {
                TransactionError::InsufficientFunds { required, available }
            }
            other => other,
        })?;

        for i in 0..tx.inputs.len() {
            Self::sign_p2pkh_input(&mut tx, i, change_key)?;
        }

        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            fee,
            amount,
            "built lock transaction"
        );
        Ok(tx)
    }

    /// Spend output 0 of `prev_txid` into one new output.
    ///
    /// The unlocking script is left empty; attach it with
    /// [`Transaction::set_unlocking_script`].
    ///
    /// # Returns
    /// The transaction, or `InsufficientFunds` if `output_amount` exceeds
    /// `input_amount`.
    pub fn build_unlock_tx(
        &self,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<Transaction, TransactionError> {
        if output_amount > input_amount {
            return Err(TransactionError::InsufficientFunds {
                required: output_amount,
                available: input_amount,
            });
        }
        let mut tx = Transaction::new();
        tx.add_input(
            TransactionInput::new(prev_txid, 0)
                .with_source_output(TransactionOutput::new(input_amount, locking_script.clone())),
        );
        tx.add_output(TransactionOutput::new(output_amount, new_locking_script.clone()));
        Ok(tx)
    }

    /// Like [`build_unlock_tx`](Self::build_unlock_tx), with `utxos[0]` as
    /// an extra P2PKH funding input and change back to `key`.
    ///
    /// Input 0 is the contract input and stays unsigned. Input 1 is the
    /// funding input, signed with `ALL|FORKID`, which does not commit to
    /// the contract input's unlocking script.
    ///
    /// # Returns
    /// The transaction, or `InsufficientFunds` if the two inputs cannot
    /// cover the new output plus fee.
    #[allow(clippy::too_many_arguments)]
    pub fn build_funded_unlock_tx(
        &self,
        utxos: &[Utxo],
        key: &PrivateKey,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<Transaction, TransactionError> {
        let funding = utxos.first().ok_or(TransactionError::InsufficientFunds {
            required: output_amount.saturating_add(self.fee_policy.min_fee),
            available: input_amount,
        })?;

        let mut tx = Transaction::new();
        tx.add_input(
            TransactionInput::new(prev_txid, 0)
                .with_source_output(TransactionOutput::new(input_amount, locking_script.clone())),
        );
        tx.add_input(funding.to_input());
        tx.add_output(TransactionOutput::new(output_amount, new_locking_script.clone()));

        let fee = self.add_change(&mut tx, p2pkh::lock_to_key(key, self.network))?;
        Self::sign_p2pkh_input(&mut tx, 1, key)?;

        debug!(fee, outputs = tx.outputs.len(), "built funded unlock transaction");
        Ok(tx)
    }

    /// Preimage a contract checks when spent by [`build_unlock_tx`](Self::build_unlock_tx),
    /// using `ALL|FORKID`.
    pub fn unlock_sighash_preimage(
        &self,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<Vec<u8>, TransactionError> {
        let tx = self.build_unlock_tx(prev_txid, locking_script, input_amount, new_locking_script, output_amount)?;
        sighash_preimage(&tx, 0, locking_script, input_amount, SIGHASH_ALL_FORKID)
    }

    /// `ALL|FORKID` signature of the contract input of an unlock transaction.
    pub fn unlock_signature(
        &self,
        prev_txid: Hash,
        key: &PrivateKey,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<Vec<u8>, TransactionError> {
        let tx = self.build_unlock_tx(prev_txid, locking_script, input_amount, new_locking_script, output_amount)?;
        sign_input(&tx, 0, key, locking_script, input_amount, SIGHASH_ALL_FORKID)
    }

    /// Preimage of the contract input of a funded unlock, using
    /// `ALL|ANYONECANPAY|FORKID` so the funding input can change freely.
    #[allow(clippy::too_many_arguments)]
    pub fn funded_sighash_preimage(
        &self,
        utxos: &[Utxo],
        key: &PrivateKey,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<FundedPreimage, TransactionError> {
        let tx = self.build_funded_unlock_tx(
            utxos,
            key,
            prev_txid,
            locking_script,
            input_amount,
            new_locking_script,
            output_amount,
        )?;
        let preimage = sighash_preimage(&tx, 0, locking_script, input_amount, SIGHASH_ALL_ANYONECANPAY_FORKID)?;
        Ok(FundedPreimage {
            preimage,
            change: tx.outputs.get(1).map_or(0, |o| o.satoshis),
            fee: tx.fee()?,
        })
    }
}
