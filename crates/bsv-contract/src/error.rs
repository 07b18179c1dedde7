//! Error types for contract operations.

use bsv_script::ScriptError;
use bsv_transaction::TransactionError;

/// Errors that can occur while compiling, instantiating or calling a contract.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    /// The external compiler failed, timed out or could not be started.
    #[error("compilation error: {0}")]
    Compilation(String),

    /// Wrong number of constructor or function arguments.
    #[error("{0}")]
    Arity(String),

    /// A placeholder could not be bound to a constructor argument.
    #[error("template binding error: {0}")]
    TemplateBinding(String),

    /// The contract has no public function with this name.
    #[error("unknown public function '{0}'")]
    UnknownFunction(String),

    /// An argument could not be encoded as a script literal.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The compiler output is malformed.
    #[error("invalid artifact: {0}")]
    Artifact(String),

    /// Reading compiler output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Script error.
    #[error(transparent)]
    Script(ScriptError),

    /// Transaction error.
    #[error(transparent)]
    Transaction(#[from] TransactionError),
}

impl From<ScriptError> for ContractError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::TemplateBinding(msg) => ContractError::TemplateBinding(msg),
            ScriptError::Encoding(msg) => ContractError::Encoding(msg),
            other => ContractError::Script(other),
        }
    }
}

impl From<serde_json::Error> for ContractError {
    fn from(err: serde_json::Error) -> Self {
        ContractError::Artifact(err.to_string())
    }
}
