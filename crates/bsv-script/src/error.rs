/// Error types for script construction, assembly and addresses.
///
/// Interpreter failures have their own type in
/// [`crate::interpreter::InterpreterError`]; this enum covers everything that
/// happens before a script is executed.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// A token in assembly text is neither a mnemonic nor even-length hex.
    #[error("invalid opcode type: {0}")]
    InvalidOpcodeType(String),

    /// A push opcode was handed to an API that only takes plain opcodes.
    #[error("use append_push_data for push data opcodes: {0}")]
    PushOpcode(String),

    /// Not enough bytes in the script to complete a push.
    #[error("not enough data")]
    DataTooSmall,

    /// Push payload exceeds the 4-byte length prefix.
    #[error("data too big")]
    DataTooBig,

    /// Script is not a pay-to-public-key-hash script.
    #[error("not a P2PKH")]
    NotP2PKH,

    /// Address string failed Base58Check decoding.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Address version byte is neither mainnet nor testnet P2PKH.
    #[error("address not supported: {0}")]
    UnsupportedAddress(String),

    /// A value cannot be expressed as a script literal.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A `$name` placeholder could not be bound to exactly one parameter.
    #[error("template binding error: {0}")]
    TemplateBinding(String),

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Error from primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] bsv_primitives::PrimitivesError),
}
