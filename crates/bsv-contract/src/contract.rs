//! Contract classes and instances.
//!
//! A [`ContractClass`] pairs the compiled locking-script template with the
//! contract's interface. Instantiating it binds constructor arguments to the
//! template's `$name` placeholders by name, giving a [`Contract`] whose
//! public functions can be turned into unlocking scripts and verified
//! locally through the interpreter.

use std::sync::Arc;

use bsv_script::asm::Token;
use bsv_script::interpreter::{Engine, TxContext, VerificationFlags, VerificationResult};
use bsv_script::{Assembly, Bindings, Literal, Script};
use bsv_transaction::{Transaction, TransactionContext};
use tracing::debug;

use crate::artifact::{Artifacts, AstContract};
use crate::interface::{ContractInterface, PublicFunction};
use crate::ContractError;

/// The transaction a contract call is verified in.
///
/// Needed by contracts that check signatures or the sighash preimage.
#[derive(Clone, Copy, Debug)]
pub struct SpendContext<'a> {
    pub tx: &'a Transaction,
    pub input_index: usize,
    /// Amount of the output locked by the contract.
    pub input_amount: u64,
}

/// A compiled contract, ready to be instantiated.
#[derive(Clone, Debug)]
pub struct ContractClass {
    template: Assembly,
    interface: Arc<ContractInterface>,
}

impl ContractClass {
    /// Build a class from the locking-script template and its AST.
    ///
    /// # Returns
    /// The class, or `TemplateBinding` if the template refers to a name
    /// that is not a constructor parameter or a parameter is declared twice.
    pub fn from_artifacts(asm: Assembly, ast: &AstContract) -> Result<Self, ContractError> {
        let interface = ContractInterface::from_ast(ast)?;
        Bindings::new(interface.constructor_params.iter().cloned())?;
        if let Some(name) = asm
            .placeholders()
            .find(|p| !interface.constructor_params.iter().any(|c| c == p))
        {
            return Err(ContractError::TemplateBinding(format!(
                "'${}' in compiled script is not a constructor parameter of {}",
                name, interface.name
            )));
        }
        debug!(
            contract = %interface.name,
            params = interface.constructor_params.len(),
            functions = interface.functions.len(),
            "loaded contract class"
        );
        Ok(ContractClass {
            template: asm,
            interface: Arc::new(interface),
        })
    }

    /// Build a class from parsed compiler output.
    pub fn from_compiled(artifacts: Artifacts) -> Result<Self, ContractError> {
        Self::from_artifacts(artifacts.asm, &artifacts.contract)
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    /// The unbound locking-script template.
    pub fn template(&self) -> &Assembly {
        &self.template
    }

    /// Bind constructor arguments, in declaration order.
    ///
    /// # Returns
    /// The instance, or `Arity` when the argument count differs from the
    /// constructor's.
    pub fn instantiate(&self, args: Vec<Literal>) -> Result<Contract, ContractError> {
        let params = &self.interface.constructor_params;
        if args.len() != params.len() {
            return Err(ContractError::Arity(format!(
                "Expected {} constructor arguments, but got {}",
                params.len(),
                args.len()
            )));
        }
        let bindings = Bindings::from_args(params, args)?;
        let locking = self.template.bind(&bindings)?;
        Ok(Contract {
            locking,
            interface: Arc::clone(&self.interface),
        })
    }
}

/// An instantiated contract.
#[derive(Clone, Debug)]
pub struct Contract {
    locking: Assembly,
    interface: Arc<ContractInterface>,
}

impl Contract {
    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    pub fn locking_script(&self) -> Result<Script, ContractError> {
        Ok(self.locking.to_script()?)
    }

    pub fn locking_asm(&self) -> String {
        self.locking.to_string()
    }

    /// Replace the locking script, e.g. with one read back from a chain.
    pub fn set_locking_asm(&mut self, text: &str) -> Result<(), ContractError> {
        self.locking = Assembly::parse(text)?;
        Ok(())
    }

    fn resolve(&self, function: &str, arg_count: usize) -> Result<&PublicFunction, ContractError> {
        let func = self
            .interface
            .function(function)
            .ok_or_else(|| ContractError::UnknownFunction(function.to_string()))?;
        if func.params.len() != arg_count {
            return Err(ContractError::Arity(format!(
                "Expected {} arguments for {}, but got {}",
                func.params.len(),
                function,
                arg_count
            )));
        }
        Ok(func)
    }

    /// Assembly of the unlocking script calling `function`.
    ///
    /// With more than one public function the selector `index + 1` follows
    /// the arguments.
    pub fn unlocking_asm(&self, function: &str, args: &[Literal]) -> Result<Assembly, ContractError> {
        let func = self.resolve(function, args.len())?;
        let mut tokens: Vec<Token> = args.iter().map(Token::from_literal).collect();
        if self.interface.has_selector() {
            tokens.push(Token::from_literal(&Literal::from(func.index as i64 + 1)));
        }
        Ok(Assembly::from_tokens(tokens))
    }

    /// Unlocking script calling `function` with `args`.
    ///
    /// # Returns
    /// The script, `UnknownFunction` if there is no such public function,
    /// or `Arity` if the argument count is wrong.
    pub fn unlocking_script(&self, function: &str, args: &[Literal]) -> Result<Script, ContractError> {
        Ok(self.unlocking_asm(function, args)?.to_script()?)
    }

    /// Run a call through the interpreter under the contract flags.
    ///
    /// # Arguments
    /// * `function` - Public function to call.
    /// * `args` - Its arguments.
    /// * `spend` - Transaction context for signature and preimage checks.
    ///
    /// # Returns
    /// The verification outcome. Errors are reserved for calls that cannot
    /// be assembled at all.
    pub fn verify(
        &self,
        function: &str,
        args: &[Literal],
        spend: Option<SpendContext<'_>>,
    ) -> Result<VerificationResult, ContractError> {
        let unlocking = self.unlocking_script(function, args)?;
        let locking = self.locking_script()?;
        let flags = VerificationFlags::contract();

        let engine = Engine::new();
        let result = match spend {
            Some(spend) => {
                let ctx = TransactionContext::new(spend.tx, spend.input_amount);
                engine.verify(&unlocking, &locking, &flags, Some(&ctx as &dyn TxContext), spend.input_index)
            }
            None => engine.verify(&unlocking, &locking, &flags, None, 0),
        };
        debug!(
            contract = %self.interface.name,
            function,
            success = result.success,
            "verified contract call"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn class(asm: &str, ast: serde_json::Value) -> ContractClass {
        let ast: AstContract = serde_json::from_value(ast).unwrap();
        ContractClass::from_artifacts(Assembly::parse(asm).unwrap(), &ast).unwrap()
    }

    fn demo() -> ContractClass {
        class(
            "$x $y OP_ADD OP_EQUAL",
            json!({
                "name": "Demo",
                "constructor": { "params": [ { "name": "x" }, { "name": "y" } ] },
                "functions": [ { "name": "unlock", "visibility": "Public", "params": [ { "name": "z" } ] } ]
            }),
        )
    }

    #[test]
    fn test_instantiate_binds_by_name() {
        // y appears before x in the template.
        let c = class(
            "$y OP_SUB $x OP_EQUAL",
            json!({
                "name": "Sub",
                "constructor": { "params": [ { "name": "x" }, { "name": "y" } ] },
                "functions": [ { "name": "unlock", "visibility": "Public", "params": [ { "name": "z" } ] } ]
            }),
        );
        let contract = c.instantiate(vec![Literal::from(3i64), Literal::from(20i64)]).unwrap();
        assert_eq!(contract.locking_asm(), "14 OP_SUB OP_3 OP_EQUAL");
        assert!(contract.verify("unlock", &[Literal::from(23i64)], None).unwrap().success);
    }

    #[test]
    fn test_arity_errors() {
        let err = demo().instantiate(vec![Literal::from(1i64)]).unwrap_err();
        assert_eq!(err.to_string(), "Expected 2 constructor arguments, but got 1");

        let contract = demo().instantiate(vec![Literal::from(4i64), Literal::from(7i64)]).unwrap();
        let err = contract.unlocking_script("unlock", &[]).unwrap_err();
        assert!(matches!(err, ContractError::Arity(_)));
        let err = contract.unlocking_script("lock", &[Literal::from(1i64)]).unwrap_err();
        assert!(matches!(err, ContractError::UnknownFunction(ref f) if f == "lock"));
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        let ast: AstContract = serde_json::from_value(json!({
            "name": "Demo",
            "constructor": { "params": [ { "name": "x" } ] },
            "functions": []
        }))
        .unwrap();
        let err = ContractClass::from_artifacts(Assembly::parse("$x $w OP_ADD").unwrap(), &ast).unwrap_err();
        assert!(matches!(err, ContractError::TemplateBinding(_)));
    }

    #[test]
    fn test_selector_appended_with_multiple_functions() {
        let c = class(
            "OP_DUP OP_1 OP_EQUAL OP_IF OP_DROP $x OP_EQUAL OP_ELSE OP_2 OP_EQUALVERIFY $x OP_NUMNOTEQUAL OP_ENDIF",
            json!({
                "name": "Pick",
                "constructor": { "params": [ { "name": "x" } ] },
                "functions": [
                    { "name": "same", "visibility": "Public", "params": [ { "name": "v" } ] },
                    { "name": "differ", "visibility": "Public", "params": [ { "name": "v" } ] }
                ]
            }),
        );
        let contract = c.instantiate(vec![Literal::from(5i64)]).unwrap();
        assert_eq!(contract.unlocking_asm("same", &[Literal::from(5i64)]).unwrap().to_string(), "OP_5 OP_1");
        assert_eq!(contract.unlocking_asm("differ", &[Literal::from(6i64)]).unwrap().to_string(), "OP_6 OP_2");

        assert!(contract.verify("same", &[Literal::from(5i64)], None).unwrap().success);
        assert!(!contract.verify("same", &[Literal::from(6i64)], None).unwrap().success);
        assert!(contract.verify("differ", &[Literal::from(6i64)], None).unwrap().success);
        assert!(!contract.verify("differ", &[Literal::from(5i64)], None).unwrap().success);
    }

    #[test]
    fn test_set_locking_asm() {
        let mut contract = demo().instantiate(vec![Literal::from(4i64), Literal::from(7i64)]).unwrap();
        assert_eq!(contract.locking_asm(), "OP_4 OP_7 OP_ADD OP_EQUAL");
        contract.set_locking_asm("OP_5 OP_7 OP_ADD OP_EQUAL").unwrap();
        assert!(contract.verify("unlock", &[Literal::from(12i64)], None).unwrap().success);
        assert!(contract.set_locking_asm("OP_BOGUS").is_err());

        contract.set_locking_asm("$x OP_EQUAL").unwrap();
        assert!(matches!(contract.locking_script(), Err(ContractError::TemplateBinding(_))));
    }
}
