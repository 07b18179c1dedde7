//! Interpreter resource limits.
//!
//! Two rule sets exist: the conservative pre-genesis limits and the relaxed
//! post-genesis ones. The thread picks one from the `after_genesis` flag
//! unless the engine was given an explicit [`Config`].

use serde::{Deserialize, Serialize};

pub const MAX_OPS_BEFORE_GENESIS: usize = 500;
pub const MAX_STACK_SIZE_BEFORE_GENESIS: usize = 1000;
pub const MAX_SCRIPT_SIZE_BEFORE_GENESIS: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE_BEFORE_GENESIS: usize = 520;
pub const MAX_SCRIPT_NUMBER_LENGTH_BEFORE_GENESIS: usize = 4;
pub const MAX_PUB_KEYS_PER_MULTISIG_BEFORE_GENESIS: usize = 20;

/// Script numbers may grow to this many bytes once genesis rules apply.
pub const MAX_SCRIPT_NUMBER_LENGTH_AFTER_GENESIS: usize = 750_000;

const UNLIMITED: usize = i32::MAX as usize;

/// Execution limits enforced by the interpreter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum count of non-push opcodes per script.
    pub max_ops: usize,
    /// Maximum combined depth of the main and alt stacks.
    pub max_stack_size: usize,
    /// Maximum serialized size of either script.
    pub max_script_size: usize,
    /// Maximum size of a single stack element.
    pub max_script_element_size: usize,
    /// Maximum byte length of a number operand.
    pub max_script_number_length: usize,
    /// Maximum key count for `OP_CHECKMULTISIG`.
    pub max_pub_keys_per_multisig: usize,
}

impl Config {
    /// Limits in force before the genesis upgrade.
    pub fn before_genesis() -> Self {
        Config {
            max_ops: MAX_OPS_BEFORE_GENESIS,
            max_stack_size: MAX_STACK_SIZE_BEFORE_GENESIS,
            max_script_size: MAX_SCRIPT_SIZE_BEFORE_GENESIS,
            max_script_element_size: MAX_SCRIPT_ELEMENT_SIZE_BEFORE_GENESIS,
            max_script_number_length: MAX_SCRIPT_NUMBER_LENGTH_BEFORE_GENESIS,
            max_pub_keys_per_multisig: MAX_PUB_KEYS_PER_MULTISIG_BEFORE_GENESIS,
        }
    }

    /// Limits in force after the genesis upgrade.
    pub fn after_genesis() -> Self {
        Config {
            max_ops: UNLIMITED,
            max_stack_size: UNLIMITED,
            max_script_size: UNLIMITED,
            max_script_element_size: UNLIMITED,
            max_script_number_length: MAX_SCRIPT_NUMBER_LENGTH_AFTER_GENESIS,
            max_pub_keys_per_multisig: UNLIMITED,
        }
    }

    /// Select the rule set matching the `after_genesis` flag.
    pub fn for_genesis(after_genesis: bool) -> Self {
        if after_genesis {
            Self::after_genesis()
        } else {
            Self::before_genesis()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::before_genesis()
    }
}
