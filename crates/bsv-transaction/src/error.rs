/// Error types for transaction construction, signing and serialization.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (bad index, duplicate outpoint, missing input).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Signing an input failed (e.g. its source output is unknown).
    #[error("signing error: {0}")]
    SigningError(String),

    /// Binary or hex (de)serialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// The supplied UTXOs cannot cover the requested amount plus fee.
    #[error("insufficient funds: need {required} satoshis, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("script error: {0}")]
    Script(#[from] bsv_script::ScriptError),

    /// A script could not be parsed while preparing a sighash preimage.
    #[error("interpreter error: {0}")]
    Interpreter(#[from] bsv_script::interpreter::InterpreterError),

    #[error("primitives error: {0}")]
    Primitives(#[from] bsv_primitives::PrimitivesError),
}
