//! Transaction input: an outpoint, its unlocking script and a sequence number.
//!
//! An input may also carry the output it spends. Signing and fee accounting
//! need that output's amount and locking script, which are not part of the
//! wire format.

use bsv_primitives::chainhash::Hash;
use bsv_primitives::util::{BsvReader, BsvWriter, VarInt};
use bsv_script::Script;

use crate::output::TransactionOutput;
use crate::TransactionError;

/// Sequence number of a finalized input.
pub const DEFAULT_SEQUENCE_NUMBER: u32 = 0xFFFF_FFFF;

/// A single input in a transaction.
///
/// # Wire format
///
/// | Field               | Size             |
/// |---------------------|------------------|
/// | source_txid         | 32 bytes         |
/// | source_tx_out_index | 4 bytes (LE)     |
/// | script length       | VarInt           |
/// | unlocking_script    | variable         |
/// | sequence_number     | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// Id of the transaction holding the spent output.
    pub source_txid: Hash,

    /// Index of the spent output within that transaction.
    pub source_tx_out_index: u32,

    pub sequence_number: u32,

    /// Proof satisfying the spent output's locking script. Empty until the
    /// input is signed or a contract proof is attached.
    pub unlocking_script: Script,

    source_output: Option<TransactionOutput>,
}

impl TransactionInput {
    /// Create an unsigned input spending `source_txid:vout`.
    pub fn new(source_txid: Hash, vout: u32) -> Self {
        TransactionInput {
            source_txid,
            source_tx_out_index: vout,
            sequence_number: DEFAULT_SEQUENCE_NUMBER,
            unlocking_script: Script::new(),
            source_output: None,
        }
    }

    /// Builder form of [`set_source_output`](Self::set_source_output).
    pub fn with_source_output(mut self, output: TransactionOutput) -> Self {
        self.source_output = Some(output);
        self
    }

    /// Deserialize an input from a `BsvReader`.
    ///
    /// # Returns
    /// The input without source output information, or `SerializationError`
    /// if the data is truncated.
    pub fn read_from(reader: &mut BsvReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading source txid: {}", e))
        })?;
        let source_txid = Hash::from_bytes(txid_bytes)?;

        let source_tx_out_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading output index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;

        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence_number = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            source_txid,
            source_tx_out_index,
            sequence_number,
            unlocking_script: Script::from_bytes(script_bytes),
            source_output: None,
        })
    }

    pub fn write_to(&self, writer: &mut BsvWriter) {
        self.write_outpoint(writer);
        writer.write_var_bytes(self.unlocking_script.to_bytes());
        writer.write_u32_le(self.sequence_number);
    }

    /// Write the 36-byte outpoint (txid then output index).
    pub fn write_outpoint(&self, writer: &mut BsvWriter) {
        writer.write_bytes(self.source_txid.as_bytes());
        writer.write_u32_le(self.source_tx_out_index);
    }

    /// Serialized size, counting `unlocking_len` bytes of unlocking script.
    pub(crate) fn size_with_unlocking_len(unlocking_len: usize) -> usize {
        32 + 4 + VarInt::from(unlocking_len).length() + unlocking_len + 4
    }

    pub fn set_source_output(&mut self, output: Option<TransactionOutput>) {
        self.source_output = output;
    }

    /// The output this input spends, if known.
    pub fn source_output(&self) -> Option<&TransactionOutput> {
        self.source_output.as_ref()
    }

    pub fn source_satoshis(&self) -> Option<u64> {
        self.source_output.as_ref().map(|o| o.satoshis)
    }

    pub fn source_script(&self) -> Option<&Script> {
        self.source_output.as_ref().map(|o| &o.locking_script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TXID: &str = "e2fa2ae1e9a45b72ff180c2a41a06eea293e1a046426bbc363b0ff141cc6c738";

    #[test]
    fn test_new_input_is_unsigned_and_final() {
        let input = TransactionInput::new(Hash::from_hex(TXID).unwrap(), 3);
        assert!(input.unlocking_script.is_empty());
        assert_eq!(input.sequence_number, DEFAULT_SEQUENCE_NUMBER);
        assert!(input.source_output().is_none());

        let mut writer = BsvWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), TransactionInput::size_with_unlocking_len(0));
        // Txids are written in internal order, the reverse of the display form.
        assert_eq!(hex::encode(&bytes[..4]), "38c7c61c");
        assert_eq!(&bytes[32..36], &[3, 0, 0, 0]);
    }

    #[test]
    fn test_read_back() {
        let mut input = TransactionInput::new(Hash::from_hex(TXID).unwrap(), 1);
        input.unlocking_script = Script::from_asm("OP_11").unwrap();
        input.sequence_number = 7;
        let mut writer = BsvWriter::new();
        input.write_to(&mut writer);
        let bytes = writer.into_bytes();

        let mut reader = BsvReader::new(&bytes);
        assert_eq!(TransactionInput::read_from(&mut reader).unwrap(), input);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_source_output() {
        let spent = TransactionOutput::new(5000, Script::from_asm("OP_1").unwrap());
        let input = TransactionInput::new(Hash::default(), 0).with_source_output(spent.clone());
        assert_eq!(input.source_satoshis(), Some(5000));
        assert_eq!(input.source_script(), Some(&spent.locking_script));
    }
}
