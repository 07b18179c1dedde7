/// Pay-to-public-key-hash addresses.
///
/// An address is the Base58Check form of a 20-byte public key hash with a
/// network version byte. Change outputs and UTXO lookups are keyed by it.

use std::fmt;
use std::str::FromStr;

use bsv_primitives::ec::PublicKey;
use bsv_primitives::hash::sha256d;

use crate::{Script, ScriptError};

/// Network an address belongs to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Mainnet (version byte 0x00, addresses start with '1').
    Mainnet,
    /// Testnet (version byte 0x6f, addresses start with 'm' or 'n').
    #[default]
    Testnet,
}

impl Network {
    /// P2PKH version byte for this network.
    pub fn p2pkh_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x00,
            Network::Testnet => 0x6f,
        }
    }

    fn from_p2pkh_version(version: u8) -> Option<Self> {
        match version {
            0x00 => Some(Network::Mainnet),
            0x6f => Some(Network::Testnet),
            _ => None,
        }
    }
}

/// A P2PKH address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    /// The 20-byte RIPEMD-160(SHA-256(pubkey)) hash.
    pub public_key_hash: [u8; 20],
    /// The network this address belongs to.
    pub network: Network,
}

impl Address {
    /// Parse a Base58Check address string.
    ///
    /// # Arguments
    /// * `addr` - The Base58Check address string.
    ///
    /// # Returns
    /// The decoded `Address`, or an error for bad characters, a wrong length,
    /// a checksum mismatch or an unknown version byte.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|e| ScriptError::InvalidAddress(format!("{addr}: {e}")))?;

        if decoded.len() != 25 {
            return Err(ScriptError::InvalidAddress(format!(
                "{addr}: decoded length {} != 25",
                decoded.len()
            )));
        }

        let checksum = sha256d(&decoded[..21]);
        if decoded[21..] != checksum[..4] {
            return Err(ScriptError::InvalidAddress(format!("{addr}: checksum mismatch")));
        }

        let network = Network::from_p2pkh_version(decoded[0])
            .ok_or_else(|| ScriptError::UnsupportedAddress(addr.to_string()))?;

        let mut public_key_hash = [0u8; 20];
        public_key_hash.copy_from_slice(&decoded[1..21]);
        Ok(Address { public_key_hash, network })
    }

    /// Create an address from a public key hash.
    pub fn from_public_key_hash(hash: &[u8; 20], network: Network) -> Self {
        Address { public_key_hash: *hash, network }
    }

    /// Create an address for a public key (hash of its compressed encoding).
    pub fn from_public_key(pub_key: &PublicKey, network: Network) -> Self {
        Self::from_public_key_hash(&pub_key.hash160(), network)
    }

    /// Return the P2PKH locking script paying to this address.
    pub fn locking_script(&self) -> Script {
        Script::p2pkh(&self.public_key_hash)
    }
}

impl fmt::Display for Address {
    /// Display the address as its Base58Check string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(25);
        payload.push(self.network.p2pkh_version());
        payload.extend_from_slice(&self.public_key_hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        f.write_str(&bs58::encode(payload).into_string())
    }
}

impl FromStr for Address {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_string(s)
    }
}
