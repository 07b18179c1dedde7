//! Error types for WhatsOnChain operations.

use bsv_transaction::TransactionError;

/// Errors that can occur when talking to WhatsOnChain or building the
/// transactions sent to it.
#[derive(Debug, thiserror::Error)]
pub enum WocError {
    /// The request did not complete.
    #[error("HTTP error: {0}")]
    Transport(reqwest::Error),

    /// The request ran past the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("request rejected ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, usually the node's reject reason.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The response parsed but carried unusable values.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Building or signing the transaction failed.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl WocError {
    /// Whether repeating the same request may succeed.
    ///
    /// Only transport failures and timeouts qualify. Rejections and bad
    /// payloads will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WocError::Transport(_) | WocError::Timeout)
    }
}

impl From<reqwest::Error> for WocError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            WocError::Timeout
        } else {
            WocError::Transport(e)
        }
    }
}
