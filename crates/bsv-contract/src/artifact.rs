//! Compiler output: the locking-script assembly and the contract AST.
//!
//! The compiler writes two files next to the source, `<stem>_asm.json` and
//! `<stem>_ast.json`. The ASM file is plain space-separated assembly, or in
//! debug mode a JSON document `{ "output": [ { "opcode": ... }, ... ] }`.
//! The AST file is a JSON object keyed by source path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bsv_script::Assembly;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Suffix of the assembly file written by the compiler.
pub const ASM_SUFFIX: &str = "_asm.json";

/// Suffix of the AST file written by the compiler.
pub const AST_SUFFIX: &str = "_ast.json";

/// A declared parameter or property.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstParam {
    pub name: String,
    #[serde(rename = "type", default)]
    pub ty: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstConstructor {
    #[serde(default)]
    pub params: Vec<AstParam>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstFunction {
    pub name: String,
    /// `Public` for externally callable functions.
    #[serde(default)]
    pub visibility: String,
    #[serde(default)]
    pub params: Vec<AstParam>,
}

/// One contract declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstContract {
    pub name: String,
    #[serde(default)]
    pub constructor: Option<AstConstructor>,
    /// Declared properties, used as constructor parameters when no
    /// explicit constructor exists.
    #[serde(default)]
    pub properties: Vec<AstParam>,
    #[serde(default)]
    pub functions: Vec<AstFunction>,
}

/// The AST of one source file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AstFile {
    #[serde(default)]
    pub contracts: Vec<AstContract>,
}

#[derive(Deserialize)]
struct DebugAsm {
    output: Vec<DebugOp>,
}

#[derive(Deserialize)]
struct DebugOp {
    opcode: String,
}

/// Parsed compiler output for the main contract of a source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifacts {
    /// Locking-script template with `$name` placeholders.
    pub asm: Assembly,
    /// The last contract declared in the source.
    pub contract: AstContract,
}

impl Artifacts {
    /// Parse the contents of the two artifact files.
    ///
    /// # Arguments
    /// * `asm_text` - Contents of the ASM file.
    /// * `ast_text` - Contents of the AST file.
    /// * `source_key` - Source path the AST document is keyed by.
    /// * `debug` - Whether the ASM file uses the debug JSON layout.
    pub fn parse(asm_text: &str, ast_text: &str, source_key: &str, debug: bool) -> Result<Self, ContractError> {
        let asm = parse_asm(asm_text, debug)?;
        let contract = main_contract(ast_text, source_key)?;
        Ok(Artifacts { asm, contract })
    }
}

/// Parse the ASM file in either layout.
pub fn parse_asm(text: &str, debug: bool) -> Result<Assembly, ContractError> {
    if !debug {
        return Ok(Assembly::parse(text)?);
    }
    let doc: DebugAsm = serde_json::from_str(text)?;
    let mut asm = Assembly::default();
    for op in &doc.output {
        asm.extend(Assembly::parse(&op.opcode)?);
    }
    Ok(asm)
}

/// Select the last contract of the source file from an AST document.
///
/// A document with a single entry is accepted under any key, since
/// compilers differ in how they spell the source path.
pub fn main_contract(ast_text: &str, source_key: &str) -> Result<AstContract, ContractError> {
    let mut doc: HashMap<String, AstFile> = serde_json::from_str(ast_text)?;
    let file = match doc.remove(source_key) {
        Some(file) => file,
        None if doc.len() == 1 => doc.into_values().next().ok_or_else(|| missing(source_key))?,
        None => return Err(missing(source_key)),
    };
    file.contracts
        .into_iter()
        .last()
        .ok_or_else(|| ContractError::Artifact(format!("no contract declared in '{}'", source_key)))
}

fn missing(source_key: &str) -> ContractError {
    ContractError::Artifact(format!("AST has no entry for '{}'", source_key))
}

/// Paths of the ASM and AST files for a source file, in that order.
pub fn artifact_paths(source: &Path) -> Result<(PathBuf, PathBuf), ContractError> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ContractError::Compilation(format!("invalid source path {}", source.display())))?;
    let dir = source.parent().unwrap_or_else(|| Path::new(""));
    Ok((
        dir.join(format!("{stem}{ASM_SUFFIX}")),
        dir.join(format!("{stem}{AST_SUFFIX}")),
    ))
}
