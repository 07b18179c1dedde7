//! WhatsOnChain configuration and wire types.

use std::time::Duration;

use bsv_primitives::chainhash::Hash;
use bsv_script::{Address, Network};
use bsv_transaction::template::p2pkh;
use bsv_transaction::Utxo;
use serde::{Deserialize, Serialize};

use crate::error::WocError;

/// Configuration for a [`WocClient`](crate::WocClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WocConfig {
    /// API root without the network segment.
    pub base_url: String,
    /// Network path segment, `main` or `test`.
    pub network: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for WocConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.whatsonchain.com/v1/bsv".to_string(),
            network: "test".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl WocConfig {
    /// Default configuration pointed at `network`.
    pub fn for_network(network: Network) -> Self {
        let segment = match network {
            Network::Mainnet => "main",
            Network::Testnet => "test",
        };
        Self {
            network: segment.to_string(),
            ..Default::default()
        }
    }

    /// `{base_url}/{network}`, the prefix of every endpoint.
    pub(crate) fn api_root(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.network)
    }
}

/// One entry of the `address/{addr}/unspent` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WocUtxo {
    /// Funding txid in display order.
    pub tx_hash: String,
    /// Output index within the funding transaction.
    pub tx_pos: u32,
    /// Amount in satoshis.
    pub value: u64,
    /// Confirmation height, zero or absent while unconfirmed.
    #[serde(default)]
    pub height: Option<u64>,
}

impl WocUtxo {
    /// Convert to a builder [`Utxo`] locked to `address`.
    ///
    /// The endpoint does not return scripts, so the output is assumed to be
    /// the address's P2PKH output.
    pub fn into_utxo(self, address: &Address) -> Result<Utxo, WocError> {
        let tx_id = Hash::from_hex(&self.tx_hash)
            .map_err(|e| WocError::InvalidResponse(format!("bad tx_hash {:?}: {}", self.tx_hash, e)))?;
        Ok(Utxo {
            tx_id,
            output_index: self.tx_pos,
            satoshis: self.value,
            script: p2pkh::lock(address),
        })
    }
}

/// Body of `POST tx/raw`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RawTxRequest<'a> {
    pub txhex: &'a str,
}
