//! Decoded opcodes as the interpreter sees them.

use bsv_primitives::util::BsvReader;

use crate::opcodes::*;
use crate::Script;

use super::error::{InterpreterError, InterpreterErrorCode};

/// Opcode groups that can be switched on by verification flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeSet {
    /// Splice, bitwise and division opcodes re-enabled by the monolith upgrade.
    Monolith,
    /// Multiplication, shifts and `OP_INVERT` re-enabled by the magnetic upgrade.
    Magnetic,
}

/// One instruction together with its push payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpcode {
    pub opcode: u8,
    /// Push payload. For a top-level `OP_RETURN` this holds the unparsed tail.
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn name(&self) -> &'static str {
        opcode_to_string(self.opcode)
    }

    /// `OP_2MUL` and `OP_2DIV` are never executable.
    pub fn is_disabled(&self) -> bool {
        matches!(self.opcode, OP_2MUL | OP_2DIV)
    }

    /// `OP_VERIF` and `OP_VERNOTIF` fail even in unexecuted branches before genesis.
    pub fn always_illegal(&self) -> bool {
        matches!(self.opcode, OP_VERIF | OP_VERNOTIF)
    }

    pub fn is_conditional(&self) -> bool {
        matches!(self.opcode, OP_IF | OP_NOTIF | OP_ELSE | OP_ENDIF | OP_VERIF | OP_VERNOTIF)
    }

    /// The flag-gated group this opcode belongs to, if any.
    pub fn opcode_set(&self) -> Option<OpcodeSet> {
        match self.opcode {
            OP_CAT | OP_SPLIT | OP_NUM2BIN | OP_BIN2NUM | OP_AND | OP_OR | OP_XOR | OP_DIV
            | OP_MOD => Some(OpcodeSet::Monolith),
            OP_MUL | OP_LSHIFT | OP_RSHIFT | OP_INVERT => Some(OpcodeSet::Magnetic),
            _ => None,
        }
    }

    /// Fail with `MinimalData` unless this push uses the shortest encoding.
    pub fn enforce_minimal_push(&self) -> Result<(), InterpreterError> {
        let len = self.data.len();
        let expected = match len {
            0 => OP_0,
            1 if (1..=16).contains(&self.data[0]) => OP_1 + self.data[0] - 1,
            1 if self.data[0] == 0x81 => OP_1NEGATE,
            n if n <= OP_DATA_75 as usize => n as u8,
            n if n <= 0xff => OP_PUSHDATA1,
            n if n <= 0xffff => OP_PUSHDATA2,
            _ => OP_PUSHDATA4,
        };
        if self.opcode != expected {
            return Err(InterpreterError::new(
                InterpreterErrorCode::MinimalData,
                format!(
                    "data push of {} bytes encoded with opcode {} instead of {}",
                    len,
                    self.name(),
                    opcode_to_string(expected)
                ),
            ));
        }
        Ok(())
    }

    /// True unless a push could have used a shorter form.
    pub fn canonical_push(&self) -> bool {
        let len = self.data.len();
        match self.opcode {
            op if op > OP_16 => true,
            OP_DATA_1 if self.data.first().is_some_and(|&b| b <= 16) => false,
            OP_PUSHDATA1 => len >= OP_PUSHDATA1 as usize,
            OP_PUSHDATA2 => len > 0xff,
            OP_PUSHDATA4 => len > 0xffff,
            _ => true,
        }
    }

    /// Re-serialize this instruction.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![self.opcode];
        match self.opcode {
            OP_PUSHDATA1 => out.push(self.data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(self.data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(self.data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(&self.data);
        out
    }
}

/// A script decoded into instructions.
pub type ParsedScript = Vec<ParsedOpcode>;

pub fn is_push_only(script: &[ParsedOpcode]) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Drop canonical pushes whose payload contains `data` (signature removal).
pub fn remove_opcode_by_data(script: &[ParsedOpcode], data: &[u8]) -> ParsedScript {
    script
        .iter()
        .filter(|pop| {
            !pop.canonical_push() || data.is_empty() || !pop.data.windows(data.len()).any(|w| w == data)
        })
        .cloned()
        .collect()
}

pub fn remove_opcode(script: &[ParsedOpcode], opcode: u8) -> ParsedScript {
    script.iter().filter(|pop| pop.opcode != opcode).cloned().collect()
}

pub fn unparse(script: &[ParsedOpcode]) -> Script {
    Script::from(script.iter().flat_map(ParsedOpcode::to_bytes).collect::<Vec<u8>>())
}

fn malformed(offset: usize) -> impl Fn(bsv_primitives::PrimitivesError) -> InterpreterError {
    move |_| {
        InterpreterError::new(
            InterpreterErrorCode::MalformedPush,
            format!("push at offset {} runs past the end of the script", offset),
        )
    }
}

/// Decode a script into instructions.
///
/// An `OP_RETURN` outside any conditional swallows the rest of the script
/// as its payload, so trailing bytes after it need not parse.
pub fn parse_script(script: &Script) -> Result<ParsedScript, InterpreterError> {
    let bytes = script.to_bytes();
    let mut reader = BsvReader::new(bytes);
    let mut parsed = Vec::new();
    let mut depth = 0usize;

    while reader.remaining() > 0 {
        let offset = bytes.len() - reader.remaining();
        let opcode = reader.read_u8().map_err(malformed(offset))?;

        match opcode {
            OP_IF | OP_NOTIF | OP_VERIF | OP_VERNOTIF => depth += 1,
            OP_ENDIF => depth = depth.saturating_sub(1),
            OP_RETURN if depth == 0 => {
                let rest = reader.read_bytes(reader.remaining()).map_err(malformed(offset))?;
                parsed.push(ParsedOpcode { opcode, data: rest.to_vec() });
                return Ok(parsed);
            }
            _ => {}
        }

        let len = match opcode {
            OP_DATA_1..=OP_DATA_75 => opcode as usize,
            OP_PUSHDATA1 => reader.read_u8().map_err(malformed(offset))? as usize,
            OP_PUSHDATA2 => reader.read_u16_le().map_err(malformed(offset))? as usize,
            OP_PUSHDATA4 => reader.read_u32_le().map_err(malformed(offset))? as usize,
            _ => 0,
        };
        let data = reader.read_bytes(len).map_err(malformed(offset))?.to_vec();
        parsed.push(ParsedOpcode { opcode, data });
    }

    Ok(parsed)
}
