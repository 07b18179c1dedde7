//! Contracts compiled to locking-script templates.
//!
//! The external compiler turns a contract source into an assembly template
//! with `$name` placeholders and an AST describing the constructor and the
//! public functions. This crate loads that output, binds constructor
//! arguments by name, builds unlocking scripts for public function calls and
//! verifies calls locally through the script interpreter.
//!
//! # Example
//!
//! ```
//! use bsv_contract::{AstContract, ContractClass};
//! use bsv_script::{Assembly, Literal};
//!
//! let ast: AstContract = serde_json::from_value(serde_json::json!({
//!     "name": "Demo",
//!     "constructor": { "params": [ { "name": "x" }, { "name": "y" } ] },
//!     "functions": [ { "name": "unlock", "visibility": "Public", "params": [ { "name": "z" } ] } ]
//! }))
//! .unwrap();
//! let asm = Assembly::parse("$x $y OP_ADD OP_EQUAL").unwrap();
//!
//! let demo = ContractClass::from_artifacts(asm, &ast)
//!     .unwrap()
//!     .instantiate(vec![Literal::from(4i64), Literal::from(7i64)])
//!     .unwrap();
//! assert!(demo.verify("unlock", &[Literal::from(11i64)], None).unwrap().success);
//! assert!(!demo.verify("unlock", &[Literal::from(0i64)], None).unwrap().success);
//! ```

pub mod artifact;
pub mod compiler;
pub mod contract;
pub mod interface;

mod error;
pub use artifact::{Artifacts, AstContract};
pub use compiler::{Compiler, CompilerConfig};
pub use contract::{Contract, ContractClass, SpendContext};
pub use error::ContractError;
pub use interface::{ContractInterface, PublicFunction};
