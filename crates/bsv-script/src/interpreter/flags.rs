//! Verification policy switches.

use serde::{Deserialize, Serialize};

/// The set of policy switches passed into every interpreter run.
///
/// Every field defaults to `false`. Use one of the presets as a starting
/// point and toggle individual fields with struct update syntax.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationFlags {
    /// Require minimal push encodings and minimally encoded numbers.
    pub minimal_data: bool,
    /// Enable fork-id signature hashing. Implies `strict_encoding`.
    pub sighash_forkid: bool,
    /// Apply genesis rules: relaxed limits, `OP_RETURN` terminates with success.
    pub after_genesis: bool,
    /// Require exactly one stack element after execution.
    pub clean_stack: bool,
    /// Require well-formed signatures, hash types and public keys.
    pub strict_encoding: bool,
    /// Require strict DER signatures.
    pub der_signatures: bool,
    /// Reject signatures with an S value above half the curve order.
    pub low_s: bool,
    /// A failed signature check must have been given an empty signature.
    pub null_fail: bool,
    /// The extra `OP_CHECKMULTISIG` argument must be empty.
    pub null_dummy: bool,
    /// `OP_IF` / `OP_NOTIF` arguments must be empty or exactly `0x01`.
    pub minimal_if: bool,
    /// The unlocking script may contain only pushes.
    pub sig_push_only: bool,
    /// Evaluate pay-to-script-hash redeem scripts (pre-genesis only).
    pub p2sh: bool,
    /// Fail on the reserved `OP_NOPn` opcodes.
    pub discourage_upgradable_nops: bool,
    /// Enforce `OP_CHECKLOCKTIMEVERIFY` (pre-genesis only).
    pub check_locktime: bool,
    /// Enforce `OP_CHECKSEQUENCEVERIFY` (pre-genesis only).
    pub check_sequence: bool,
    /// Enable `OP_CAT OP_SPLIT OP_NUM2BIN OP_BIN2NUM OP_AND OP_OR OP_XOR OP_DIV OP_MOD`.
    pub monolith_opcodes: bool,
    /// Enable `OP_MUL OP_LSHIFT OP_RSHIFT OP_INVERT`.
    pub magnetic_opcodes: bool,
}

impl VerificationFlags {
    /// The policy used to verify contract calls.
    pub fn contract() -> Self {
        VerificationFlags {
            minimal_data: true,
            sighash_forkid: true,
            monolith_opcodes: true,
            magnetic_opcodes: true,
            ..Default::default()
        }
    }

    /// Post-genesis relay policy.
    pub fn standard() -> Self {
        VerificationFlags {
            minimal_data: true,
            sighash_forkid: true,
            after_genesis: true,
            clean_stack: true,
            strict_encoding: true,
            der_signatures: true,
            low_s: true,
            null_fail: true,
            null_dummy: true,
            sig_push_only: true,
            discourage_upgradable_nops: true,
            monolith_opcodes: true,
            magnetic_opcodes: true,
            ..Default::default()
        }
    }

    /// Apply implied switches: fork-id hashing needs strict encoding.
    pub(crate) fn normalized(mut self) -> Self {
        if self.sighash_forkid {
            self.strict_encoding = true;
        }
        self
    }

    /// True when any signature-encoding rule is active.
    pub(crate) fn checks_signature_encoding(&self) -> bool {
        self.der_signatures || self.low_s || self.strict_encoding
    }

    pub(crate) fn monolith_enabled(&self) -> bool {
        self.monolith_opcodes || self.after_genesis
    }

    pub(crate) fn magnetic_enabled(&self) -> bool {
        self.magnetic_opcodes || self.after_genesis
    }
}
