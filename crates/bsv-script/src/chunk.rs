//! Script chunk decoding and push-data prefixes.
//!
//! A chunk is either a bare opcode or a data push together with its payload.
//! Decoding walks the raw bytes with a [`BsvReader`], so truncated pushes
//! surface as [`ScriptError::DataTooSmall`] instead of panicking.

use bsv_primitives::util::BsvReader;
use bsv_primitives::PrimitivesError;

use crate::opcodes::*;
use crate::ScriptError;

/// A single decoded element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The payload, present only for push opcodes `OP_DATA_1..=OP_PUSHDATA4`.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Render this chunk as a single assembly token.
    ///
    /// Pushes are rendered as lowercase hex. A zero-length push has no hex
    /// form and is rendered as `OP_0`, which executes identically.
    pub fn to_asm_string(&self) -> String {
        match &self.data {
            Some(data) if data.is_empty() => opcode_to_string(OP_0).to_string(),
            Some(data) => hex::encode(data),
            None => opcode_to_string(self.op).to_string(),
        }
    }

    /// Return true if this chunk pushes data (including `OP_0`..`OP_16`).
    pub fn is_push(&self) -> bool {
        is_push_opcode(self.op)
    }
}

fn truncated(_: PrimitivesError) -> ScriptError {
    ScriptError::DataTooSmall
}

/// Decode raw script bytes into chunks.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// The chunks in script order, or `DataTooSmall` if a push runs past the end.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut reader = BsvReader::new(bytes);
    let mut chunks = Vec::new();

    while reader.remaining() > 0 {
        let op = reader.read_u8().map_err(truncated)?;
        let len = match op {
            OP_DATA_1..=OP_DATA_75 => Some(op as usize),
            OP_PUSHDATA1 => Some(reader.read_u8().map_err(truncated)? as usize),
            OP_PUSHDATA2 => Some(reader.read_u16_le().map_err(truncated)? as usize),
            OP_PUSHDATA4 => Some(reader.read_u32_le().map_err(truncated)? as usize),
            _ => None,
        };
        let data = match len {
            Some(n) => Some(reader.read_bytes(n).map_err(truncated)?.to_vec()),
            None => None,
        };
        chunks.push(ScriptChunk { op, data });
    }

    Ok(chunks)
}

/// Compute the minimal push prefix for a payload of `data_len` bytes.
///
/// # Returns
/// The opcode (and little-endian length, where needed) that must precede the
/// payload, or `DataTooBig` above 4 GiB.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}
