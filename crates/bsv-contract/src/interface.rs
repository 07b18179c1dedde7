//! The callable surface of a compiled contract.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::artifact::{AstContract, AstParam};
use crate::ContractError;

/// Visibility of externally callable functions.
pub const PUBLIC: &str = "Public";

/// Prefix the AST puts on property names.
const PROPERTY_PREFIX: &str = "this.";

/// A public function and its position among the public functions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicFunction {
    pub name: String,
    /// Zero-based index; the unlocking selector is `index + 1`.
    pub index: usize,
    pub params: Vec<String>,
}

/// Constructor parameters and public functions of a contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InterfaceFields")]
pub struct ContractInterface {
    pub name: String,
    pub constructor_params: Vec<String>,
    pub functions: Vec<PublicFunction>,
    /// Function name to position in `functions`.
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct InterfaceFields {
    name: String,
    constructor_params: Vec<String>,
    functions: Vec<PublicFunction>,
}

impl From<InterfaceFields> for ContractInterface {
    fn from(fields: InterfaceFields) -> Self {
        let by_name = fields
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        ContractInterface {
            name: fields.name,
            constructor_params: fields.constructor_params,
            functions: fields.functions,
            by_name,
        }
    }
}

fn param_names(params: &[AstParam]) -> Vec<String> {
    params
        .iter()
        .map(|p| p.name.strip_prefix(PROPERTY_PREFIX).unwrap_or(&p.name).to_string())
        .collect()
}

impl ContractInterface {
    /// Resolve the interface of one contract declaration.
    ///
    /// Constructor parameters come from the explicit constructor, or from
    /// the properties when there is none.
    ///
    /// # Returns
    /// The interface, or `Artifact` if two public functions share a name.
    pub fn from_ast(contract: &AstContract) -> Result<Self, ContractError> {
        let constructor_params = match &contract.constructor {
            Some(ctor) => param_names(&ctor.params),
            None => param_names(&contract.properties),
        };

        let mut functions: Vec<PublicFunction> = Vec::new();
        let mut by_name = HashMap::new();
        for func in contract.functions.iter().filter(|f| f.visibility == PUBLIC) {
            if by_name.insert(func.name.clone(), functions.len()).is_some() {
                return Err(ContractError::Artifact(format!(
                    "public function '{}' declared more than once in {}",
                    func.name, contract.name
                )));
            }
            functions.push(PublicFunction {
                name: func.name.clone(),
                index: functions.len(),
                params: param_names(&func.params),
            });
        }

        Ok(ContractInterface {
            name: contract.name.clone(),
            constructor_params,
            functions,
            by_name,
        })
    }

    pub fn function(&self, name: &str) -> Option<&PublicFunction> {
        self.by_name.get(name).and_then(|&i| self.functions.get(i))
    }

    /// Return true if unlocking scripts carry a function selector.
    pub fn has_selector(&self) -> bool {
        self.functions.len() > 1
    }
}
