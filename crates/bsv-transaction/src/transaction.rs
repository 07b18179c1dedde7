//! The transaction type: version, inputs, outputs and lock time.
//!
//! Supports wire (de)serialization, txid computation, fee accounting from
//! the inputs' source outputs and per-input signature hashes.

use std::fmt;

use bsv_primitives::chainhash::Hash;
use bsv_primitives::util::{BsvReader, BsvWriter, VarInt};
use bsv_script::Script;

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::sighash;
use crate::TransactionError;

/// A transaction.
///
/// # Wire format
///
/// | Field        | Size                      |
/// |--------------|---------------------------|
/// | version      | 4 bytes (LE)              |
/// | input count  | VarInt                    |
/// | inputs       | variable (per input)      |
/// | output count | VarInt                    |
/// | outputs      | variable (per output)     |
/// | lock_time    | 4 bytes (LE)              |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    /// Block height or Unix timestamp before which the transaction is not final.
    pub lock_time: u32,
}

impl Transaction {
    /// An empty version 1 transaction with lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Parse a transaction from hex.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str).map_err(|e| {
            TransactionError::SerializationError(format!("invalid hex: {}", e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parse exactly one transaction from `bytes`.
    ///
    /// # Returns
    /// The transaction, or `SerializationError` if the data is truncated,
    /// malformed or followed by trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = BsvReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;
        // Every input takes at least 41 bytes; cap the preallocation accordingly.
        let mut inputs = Vec::with_capacity((input_count.value() as usize).min(reader.remaining() / 41));
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;
        let mut outputs = Vec::with_capacity((output_count.value() as usize).min(reader.remaining() / 9));
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction { version, inputs, outputs, lock_time })
    }

    pub fn write_to(&self, writer: &mut BsvWriter) {
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }

        writer.write_u32_le(self.lock_time);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BsvWriter::with_capacity(256);
        self.write_to(&mut writer);
        writer.into_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Double SHA-256 of the serialized transaction.
    ///
    /// Any change to the serialized bytes, unlocking scripts included,
    /// changes the id.
    pub fn tx_id(&self) -> Hash {
        Hash::digest(&self.to_bytes())
    }

    /// The txid in display (byte-reversed) hex.
    pub fn tx_id_hex(&self) -> String {
        self.tx_id().to_string()
    }

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    /// Add an input spending `prev_tx_id:vout` and remember the spent output.
    ///
    /// # Arguments
    /// * `prev_tx_id` - Display-order hex txid.
    /// * `vout` - Index of the spent output.
    /// * `prev_locking_script` - Locking script of the spent output.
    /// * `satoshis` - Amount of the spent output.
    ///
    /// # Returns
    /// `Ok(())`, or an error if the txid is not 64 hex characters.
    pub fn add_input_from(
        &mut self,
        prev_tx_id: &str,
        vout: u32,
        prev_locking_script: Script,
        satoshis: u64,
    ) -> Result<(), TransactionError> {
        let txid = Hash::from_hex(prev_tx_id)?;
        let input = TransactionInput::new(txid, vout)
            .with_source_output(TransactionOutput::new(satoshis, prev_locking_script));
        self.inputs.push(input);
        Ok(())
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    /// Replace the unlocking script of one input.
    ///
    /// Fork-id signatures on other inputs stay valid because they do not
    /// commit to unlocking scripts.
    pub fn set_unlocking_script(&mut self, index: usize, script: Script) -> Result<(), TransactionError> {
        let len = self.inputs.len();
        let input = self.inputs.get_mut(index).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "input index {} out of range (tx has {} inputs)",
                index, len
            ))
        })?;
        input.unlocking_script = script;
        Ok(())
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn total_output_satoshis(&self) -> u64 {
        self.outputs.iter().map(|o| o.satoshis).sum()
    }

    /// Sum of the amounts of the spent outputs.
    ///
    /// # Returns
    /// The total, or `InvalidTransaction` if an input has no source output.
    pub fn total_input_satoshis(&self) -> Result<u64, TransactionError> {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| {
                input.source_satoshis().ok_or_else(|| {
                    TransactionError::InvalidTransaction(format!(
                        "missing source output on input {}",
                        i
                    ))
                })
            })
            .sum()
    }

    /// Inputs minus outputs.
    ///
    /// # Returns
    /// The fee, or `InvalidTransaction` if it would be negative or an input
    /// has no source output.
    pub fn fee(&self) -> Result<u64, TransactionError> {
        let inputs = self.total_input_satoshis()?;
        let outputs = self.total_output_satoshis();
        inputs.checked_sub(outputs).ok_or_else(|| {
            TransactionError::InvalidTransaction(format!(
                "outputs ({}) exceed inputs ({})",
                outputs, inputs
            ))
        })
    }

    /// Serialized size in bytes.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Signature hash for an input, using its stored source output.
    ///
    /// # Returns
    /// The 32-byte digest, or `SigningError` if the input's source output is unknown.
    pub fn input_signature_hash(&self, index: usize, sighash_type: u32) -> Result<[u8; 32], TransactionError> {
        let source = self
            .inputs
            .get(index)
            .ok_or_else(|| {
                TransactionError::InvalidTransaction(format!(
                    "input index {} out of range (tx has {} inputs)",
                    index,
                    self.inputs.len()
                ))
            })?
            .source_output()
            .ok_or_else(|| {
                TransactionError::SigningError(format!("missing source output on input {}", index))
            })?;

        sighash::signature_hash(self, index, &source.locking_script, source.satoshis, sighash_type)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
