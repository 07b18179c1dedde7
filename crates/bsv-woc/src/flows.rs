//! Lock and unlock flows that fetch funding, build, sign and broadcast in
//! one call.
//!
//! Every flow makes at most one lookup and one broadcast. Failures are
//! returned as they are; callers decide whether to retry using
//! [`WocError::is_retryable`].

use bsv_primitives::chainhash::Hash;
use bsv_primitives::ec::PrivateKey;
use bsv_script::{Address, Script};
use bsv_transaction::{FundedPreimage, TransactionBuilder, Utxo};
use tracing::info;

use crate::client::{Broadcaster, UtxoProvider, WocClient};
use crate::error::WocError;

/// Remote lock/unlock operations over a UTXO source and a broadcaster.
#[derive(Debug, Clone)]
pub struct RemoteFlows<P, B> {
    provider: P,
    broadcaster: B,
    builder: TransactionBuilder,
}

impl RemoteFlows<WocClient, WocClient> {
    /// Flows that both look up and broadcast through one WhatsOnChain client.
    pub fn woc(client: WocClient) -> Self {
        Self::new(client.clone(), client)
    }
}

impl<P: UtxoProvider, B: Broadcaster> RemoteFlows<P, B> {
    /// Flows using the default builder, which sends change to testnet
    /// addresses.
    pub fn new(provider: P, broadcaster: B) -> Self {
        Self {
            provider,
            broadcaster,
            builder: TransactionBuilder::default(),
        }
    }

    /// Replace the builder, e.g. to change the fee policy or network.
    pub fn with_builder(mut self, builder: TransactionBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// The builder used for every flow.
    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }

    async fn funding(&self, key: &PrivateKey) -> Result<Vec<Utxo>, WocError> {
        let address = Address::from_public_key(&key.pub_key(), self.builder.network);
        self.provider.fetch_utxos(&address).await
    }

    /// Lock `amount` satoshis into `locking_script`, funded by the key's
    /// UTXOs.
    ///
    /// # Returns
    /// The txid of the lock transaction. The contract output is output 0.
    pub async fn lock_script_tx(
        &self,
        locking_script: &Script,
        key: &PrivateKey,
        amount: u64,
    ) -> Result<String, WocError> {
        let utxos = self.funding(key).await?;
        let tx = self.builder.build_lock_tx(&utxos, locking_script, amount, key)?;
        let txid = self.broadcaster.broadcast(&tx).await?;
        info!(%txid, amount, inputs = tx.inputs.len(), "locked funds into contract");
        Ok(txid)
    }

    /// Spend output 0 of `prev_txid` with `unlocking_script` into a new
    /// output. The fee comes out of the contract amount.
    ///
    /// # Arguments
    /// * `unlocking_script` - The contract call.
    /// * `prev_txid` - Transaction holding the contract output.
    /// * `locking_script` - The contract output's script.
    /// * `input_amount` - The contract output's amount.
    /// * `new_locking_script` - Script of the new output.
    /// * `output_amount` - Amount of the new output.
    pub async fn unlock_script_tx(
        &self,
        unlocking_script: &Script,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<String, WocError> {
        let mut tx =
            self.builder
                .build_unlock_tx(prev_txid, locking_script, input_amount, new_locking_script, output_amount)?;
        tx.set_unlocking_script(0, unlocking_script.clone())?;
        let txid = self.broadcaster.broadcast(&tx).await?;
        info!(%txid, %prev_txid, output_amount, "unlocked contract");
        Ok(txid)
    }

    /// As [`unlock_script_tx`](Self::unlock_script_tx), with the fee paid by
    /// the key's first UTXO and change returned to the key.
    #[allow(clippy::too_many_arguments)]
    pub async fn unlock_funded_script_tx(
        &self,
        key: &PrivateKey,
        unlocking_script: &Script,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<String, WocError> {
        let utxos = self.funding(key).await?;
        let mut tx = self.builder.build_funded_unlock_tx(
            &utxos,
            key,
            prev_txid,
            locking_script,
            input_amount,
            new_locking_script,
            output_amount,
        )?;
        tx.set_unlocking_script(0, unlocking_script.clone())?;
        let txid = self.broadcaster.broadcast(&tx).await?;
        info!(%txid, %prev_txid, output_amount, "unlocked contract with funding input");
        Ok(txid)
    }

    /// Preimage the contract input of a funded unlock will be checked
    /// against, built from the same UTXO lookup the funded unlock makes.
    ///
    /// Nothing is broadcast.
    pub async fn funded_sighash_preimage(
        &self,
        key: &PrivateKey,
        prev_txid: Hash,
        locking_script: &Script,
        input_amount: u64,
        new_locking_script: &Script,
        output_amount: u64,
    ) -> Result<FundedPreimage, WocError> {
        let utxos = self.funding(key).await?;
        Ok(self.builder.funded_sighash_preimage(
            &utxos,
            key,
            prev_txid,
            locking_script,
            input_amount,
            new_locking_script,
            output_amount,
        )?)
    }
}
