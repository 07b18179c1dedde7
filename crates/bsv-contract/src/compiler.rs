//! Invocation of the external contract compiler.
//!
//! The compiler is run as `<program> [args..] compile <source> --asm --ast
//! [--debug]` in the source's directory. It writes its artifacts next to the
//! source; they are read, parsed and removed again whatever the outcome.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::artifact::{artifact_paths, Artifacts};
use crate::contract::ContractClass;
use crate::ContractError;

/// Settings for [`Compiler`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments placed before the `compile` subcommand, e.g. a script
    /// path when `program` is an interpreter.
    pub args: Vec<String>,
    /// Upper bound on one compilation.
    pub timeout: Duration,
    /// Request the JSON debug layout for the ASM file.
    pub debug: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            program: PathBuf::from("scryptc"),
            args: Vec::new(),
            timeout: Duration::from_secs(30),
            debug: true,
        }
    }
}

/// Runs the compiler and loads its output.
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(config: CompilerConfig) -> Self {
        Compiler { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile one source file.
    ///
    /// # Returns
    /// The parsed artifacts, or `Compilation` when the compiler cannot be
    /// started, exits unsuccessfully, reports an error or runs past the
    /// timeout.
    pub async fn compile(&self, source: impl AsRef<Path>) -> Result<Artifacts, ContractError> {
        let source = tokio::fs::canonicalize(source.as_ref()).await.map_err(|e| {
            ContractError::Compilation(format!("cannot open {}: {}", source.as_ref().display(), e))
        })?;
        let (asm_path, ast_path) = artifact_paths(&source)?;

        let result = self.run(&source, &asm_path, &ast_path).await;

        for path in [&asm_path, &ast_path] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove compiler artifact"),
            }
        }
        result
    }

    /// Compile a source file straight into a contract class.
    pub async fn build_contract_class(&self, source: impl AsRef<Path>) -> Result<ContractClass, ContractError> {
        ContractClass::from_compiled(self.compile(source).await?)
    }

    async fn run(&self, source: &Path, asm_path: &Path, ast_path: &Path) -> Result<Artifacts, ContractError> {
        let dir = source.parent().unwrap_or_else(|| Path::new("."));
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg("compile")
            .arg(source)
            .arg("--asm")
            .arg("--ast");
        if self.config.debug {
            cmd.arg("--debug");
        }
        cmd.current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        debug!(
            program = %self.config.program.display(),
            source = %source.display(),
            "invoking contract compiler"
        );

        let output = match tokio::time::timeout(self.config.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(error = %e, "contract compiler could not be started");
                return Err(ContractError::Compilation(format!(
                    "failed to run {}: {}",
                    self.config.program.display(),
                    e
                )));
            }
            Err(_) => {
                warn!(timeout = ?self.config.timeout, "contract compiler timed out");
                return Err(ContractError::Compilation(format!(
                    "compilation timed out after {:?}",
                    self.config.timeout
                )));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() || stdout.contains("Error") || stderr.contains("Error") {
            let report = format!("{}{}", stdout, stderr);
            warn!(status = %output.status, "contract compilation failed");
            return Err(ContractError::Compilation(format!(
                "compilation fails ({}): {}",
                output.status,
                report.trim()
            )));
        }

        let asm_text = tokio::fs::read_to_string(asm_path).await?;
        let ast_text = tokio::fs::read_to_string(ast_path).await?;
        Artifacts::parse(&asm_text, &ast_text, &source.to_string_lossy(), self.config.debug)
    }
}
