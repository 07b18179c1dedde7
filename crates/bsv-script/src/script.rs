/// Script bytes type with assembly conversion and classification helpers.
///
/// A `Script` owns its serialized bytes. Locking scripts guard outputs and
/// unlocking scripts prove the right to spend them; both share this type.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// A serialized script.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Assemble a script from whitespace-separated assembly text.
    ///
    /// Mnemonics (aliases such as `OP_FALSE` included) become their opcode
    /// byte. Any other token must be even-length hex and becomes a minimal
    /// data push. Push opcodes cannot be named directly, since their payload
    /// length would be ambiguous.
    ///
    /// # Arguments
    /// * `asm` - Assembly text, e.g. `"OP_DUP OP_HASH160 <hex> OP_EQUALVERIFY OP_CHECKSIG"`.
    ///
    /// # Returns
    /// The assembled `Script`, or `InvalidOpcodeType` for the first bad token.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            script.append_asm_token(token)?;
        }
        Ok(script)
    }

    pub(crate) fn append_asm_token(&mut self, token: &str) -> Result<(), ScriptError> {
        if let Some(op) = string_to_opcode(token) {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(token.to_string()));
            }
            self.0.push(op);
            return Ok(());
        }
        let data = decode_hex_token(token)?;
        self.append_push_data(&data)
    }

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Disassemble into canonical assembly text.
    ///
    /// Opcodes use their canonical mnemonic and pushes are rendered as hex, so
    /// `Script::from_asm(&s.to_asm()?)` reproduces `s` for any minimally
    /// pushed script.
    ///
    /// # Returns
    /// Space-separated tokens, or `DataTooSmall` for a truncated push.
    pub fn to_asm(&self) -> Result<String, ScriptError> {
        let tokens: Vec<String> = self
            .chunks()?
            .iter()
            .map(ScriptChunk::to_asm_string)
            .collect();
        Ok(tokens.join(" "))
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return true if the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build the standard pay-to-public-key-hash locking script.
    ///
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
    pub fn p2pkh(public_key_hash: &[u8; 20]) -> Self {
        let mut bytes = Vec::with_capacity(25);
        bytes.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
        bytes.extend_from_slice(public_key_hash);
        bytes.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
        Script(bytes)
    }

    /// Return true if this is a P2PKH locking script.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Return true if this is a legacy pay-to-script-hash script.
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Return true if the script is a data carrier (`OP_RETURN` or `OP_FALSE OP_RETURN`).
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN)
            || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Extract the 20-byte public key hash from a P2PKH script.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2PKH);
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&self.0[3..23]);
        Ok(hash)
    }

    /// Parse the script into decoded chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Append data with the minimal push prefix.
    ///
    /// # Returns
    /// `Ok(())` on success, or `DataTooBig` if the payload cannot be prefixed.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append non-push opcodes.
    ///
    /// Rejects `OP_DATA_1..=OP_PUSHDATA4`, which need a payload; use
    /// [`Script::append_push_data`] for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        if let Some(&op) = opcodes
            .iter()
            .find(|op| (OP_DATA_1..=OP_PUSHDATA4).contains(*op))
        {
            return Err(ScriptError::PushOpcode(opcode_to_string(op).to_string()));
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append the raw bytes of another script.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }
}

/// Decode a bare assembly token as push data.
pub(crate) fn decode_hex_token(token: &str) -> Result<Vec<u8>, ScriptError> {
    if token.is_empty() || token.len() % 2 != 0 {
        return Err(ScriptError::InvalidOpcodeType(token.to_string()));
    }
    hex::decode(token).map_err(|_| ScriptError::InvalidOpcodeType(token.to_string()))
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const P2PKH_HEX: &str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";
    const P2PKH_ASM: &str =
        "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG";

    #[test]
    fn test_hex_roundtrip() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert_eq!(script.len(), 25);
        assert!(Script::from_hex("zz").is_err());
    }

    #[test]
    fn test_to_asm_p2pkh() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(script.to_asm().unwrap(), P2PKH_ASM);
    }

    #[test]
    fn test_from_asm_p2pkh() {
        let script = Script::from_asm(P2PKH_ASM).unwrap();
        assert_eq!(script.to_hex(), P2PKH_HEX);
    }

    #[test]
    fn test_empty_asm() {
        assert!(Script::from_asm("").unwrap().is_empty());
        assert_eq!(Script::new().to_asm().unwrap(), "");
    }

    #[test]
    fn test_aliases_assemble_to_canonical_bytes() {
        let script = Script::from_asm("OP_FALSE OP_TRUE OP_NOP2 OP_NOP3").unwrap();
        assert_eq!(script.to_bytes(), &[OP_0, OP_1, 0xb1, 0xb2]);
        assert_eq!(
            script.to_asm().unwrap(),
            "OP_0 OP_1 OP_CHECKLOCKTIMEVERIFY OP_CHECKSEQUENCEVERIFY"
        );
    }

    #[test]
    fn test_from_asm_rejects_bad_tokens() {
        for bad in ["OP_BOGUS", "abc", "zz", "OP_PUSHDATA1", "OP_DATA_3"] {
            assert!(
                matches!(Script::from_asm(bad), Err(ScriptError::InvalidOpcodeType(ref t)) if t == bad),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_single_byte_hex_is_a_push() {
        let script = Script::from_asm("05 OP_ADD").unwrap();
        assert_eq!(script.to_bytes(), &[0x01, 0x05, OP_ADD]);
        assert_eq!(script.to_asm().unwrap(), "05 OP_ADD");
    }

    #[test]
    fn test_large_push_roundtrip() {
        let payload = "ab".repeat(300);
        let asm = format!("{payload} OP_DROP");
        let script = Script::from_asm(&asm).unwrap();
        assert_eq!(script.to_bytes()[0], OP_PUSHDATA2);
        assert_eq!(script.to_asm().unwrap(), asm);
    }

    #[test]
    fn test_classification() {
        let p2pkh = Script::from_hex(P2PKH_HEX).unwrap();
        assert!(p2pkh.is_p2pkh());
        assert!(!p2pkh.is_p2sh());
        assert!(!p2pkh.is_data());

        let p2sh = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87").unwrap();
        assert!(p2sh.is_p2sh());
        assert!(!p2sh.is_p2pkh());

        assert!(Script::from_asm("OP_FALSE OP_RETURN 68656c6c6f").unwrap().is_data());
        assert!(Script::from_asm("OP_RETURN").unwrap().is_data());
    }

    #[test]
    fn test_p2pkh_builder_and_hash() {
        let hash: [u8; 20] = hex::decode("e2a623699e81b291c0327f408fea765d534baa2a")
            .unwrap()
            .try_into()
            .unwrap();
        let script = Script::p2pkh(&hash);
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert_eq!(script.public_key_hash().unwrap(), hash);
        assert!(matches!(
            Script::from_asm("OP_1").unwrap().public_key_hash(),
            Err(ScriptError::NotP2PKH)
        ));
    }

    #[test]
    fn test_append_opcodes_rejects_push_opcodes() {
        let mut script = Script::new();
        assert!(script.append_opcodes(&[OP_DUP, OP_HASH160]).is_ok());
        assert!(matches!(
            script.append_opcodes(&[OP_PUSHDATA1]),
            Err(ScriptError::PushOpcode(_))
        ));
        assert_eq!(script.len(), 2);
    }

    #[test]
    fn test_append_script() {
        let mut a = Script::from_asm("OP_1").unwrap();
        a.append_script(&Script::from_asm("OP_2 OP_ADD").unwrap());
        assert_eq!(a.to_asm().unwrap(), "OP_1 OP_2 OP_ADD");
    }

    #[test]
    fn test_serde_as_hex_string() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(json, format!("\"{P2PKH_HEX}\""));
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
    }

    #[test]
    fn test_display_and_debug() {
        let script = Script::from_hex("51").unwrap();
        assert_eq!(script.to_string(), "51");
        assert_eq!(format!("{script:?}"), "Script(51)");
    }
}
