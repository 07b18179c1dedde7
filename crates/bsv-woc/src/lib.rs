#![deny(missing_docs)]

//! # bsv-woc
//!
//! WhatsOnChain HTTP client for looking up spendable outputs and
//! broadcasting transactions, plus the remote flows that lock funds into a
//! contract and spend them out again.
//!
//! The client implements the async [`UtxoProvider`] and [`Broadcaster`]
//! traits, so the flows can also run against other backends.
//!
//! # Example
//!
//! ```no_run
//! use bsv_woc::{RemoteFlows, WocClient, WocConfig};
//!
//! # fn main() -> Result<(), bsv_woc::WocError> {
//! let client = WocClient::new(WocConfig {
//!     network: "main".to_string(),
//!     ..Default::default()
//! })?;
//! let flows = RemoteFlows::woc(client);
//! # let _ = flows;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod flows;
pub mod types;


pub use client::{Broadcaster, UtxoProvider, WocClient};
pub use error::WocError;
pub use flows::RemoteFlows;
pub use types::{WocConfig, WocUtxo};
