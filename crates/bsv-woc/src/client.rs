//! WhatsOnChain HTTP client for UTXO lookup and broadcasting.

use std::future::Future;

use bsv_script::Address;
use bsv_transaction::{Transaction, Utxo};
use tracing::{debug, info, warn};

use crate::error::WocError;
use crate::types::{RawTxRequest, WocConfig, WocUtxo};

/// Source of spendable outputs for an address.
pub trait UtxoProvider {
    /// Unspent outputs of `address`, each with its P2PKH locking script.
    fn fetch_utxos(&self, address: &Address) -> impl Future<Output = Result<Vec<Utxo>, WocError>> + Send;
}

/// Sink for finished transactions.
pub trait Broadcaster {
    /// Submit `tx` and return the txid the network reports.
    fn broadcast(&self, tx: &Transaction) -> impl Future<Output = Result<String, WocError>> + Send;
}

/// HTTP client for the WhatsOnChain API.
#[derive(Debug, Clone)]
pub struct WocClient {
    config: WocConfig,
    client: reqwest::Client,
}

impl WocClient {
    /// Create a client with the given configuration.
    ///
    /// # Returns
    /// The client, or `Transport` if the HTTP stack cannot be initialised.
    pub fn new(config: WocConfig) -> Result<Self, WocError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// The active configuration.
    pub fn config(&self) -> &WocConfig {
        &self.config
    }

    /// Read a response body, turning non-success statuses into `Rejected`.
    async fn body(resp: reqwest::Response) -> Result<String, WocError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(WocError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Fetch the raw unspent entries for `address`.
    pub async fn unspent(&self, address: &Address) -> Result<Vec<WocUtxo>, WocError> {
        let url = format!("{}/address/{}/unspent", self.config.api_root(), address);
        let resp = self.client.get(&url).send().await?;
        let body = Self::body(resp).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Broadcast raw transaction hex.
    ///
    /// # Returns
    /// The txid echoed by the service, or `Rejected` carrying the node's
    /// reject reason.
    pub async fn broadcast_hex(&self, tx_hex: &str) -> Result<String, WocError> {
        let url = format!("{}/tx/raw", self.config.api_root());
        let resp = self
            .client
            .post(&url)
            .json(&RawTxRequest { txhex: tx_hex })
            .send()
            .await?;

        let body = match Self::body(resp).await {
            Ok(body) => body,
            Err(WocError::Rejected { status, body }) => {
                warn!(status, reason = %body.trim(), "broadcast rejected");
                return Err(WocError::Rejected { status, body });
            }
            Err(e) => return Err(e),
        };
        let txid: String = serde_json::from_str(&body)?;
        info!(%txid, bytes = tx_hex.len() / 2, "broadcast transaction");
        Ok(txid)
    }
}

impl UtxoProvider for WocClient {
    async fn fetch_utxos(&self, address: &Address) -> Result<Vec<Utxo>, WocError> {
        let utxos = self
            .unspent(address)
            .await?
            .into_iter()
            .map(|u| u.into_utxo(address))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(%address, count = utxos.len(), "fetched utxos");
        Ok(utxos)
    }
}

impl Broadcaster for WocClient {
    async fn broadcast(&self, tx: &Transaction) -> Result<String, WocError> {
        self.broadcast_hex(&tx.to_hex()).await
    }
}
