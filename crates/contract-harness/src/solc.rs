//! Compiles Solidity sources into [`ContractArtifact`]s with `solc --standard-json`.
use std::{
    collections::BTreeMap,
    io::Write,
    process::{Command, Stdio},
};

use camino::Utf8Path;
use ethers_core::abi::Abi;
use serde::Deserialize;
use serde_json::json;

use crate::{ContractArtifact, HarnessError};

/// Environment variable naming the `solc` binary.
pub const SOLC_PATH_ENV: &str = "MDOT_SOLC_PATH";

const OPTIMIZER_RUNS: u32 = 200;

#[derive(Debug, Clone)]
pub struct SolcCompiler {
    path: String,
    optimize: bool,
}

impl Default for SolcCompiler {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SolcCompiler {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            optimize: false,
        }
    }

    /// Uses `$MDOT_SOLC_PATH`, falling back to `solc` on the `PATH`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(SOLC_PATH_ENV).unwrap_or_else(|_| "solc".to_string()))
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the configured binary runs at all.
    pub fn is_available(&self) -> bool {
        Command::new(&self.path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub fn compile_file(&self, path: &Utf8Path) -> Result<Vec<ContractArtifact>, HarnessError> {
        let source = std::fs::read_to_string(path)?;
        let source_name = path.file_name().unwrap_or(path.as_str());
        self.compile_source(source_name, &source)
    }

    /// Compiles one source unit and returns an artifact per contract it
    /// defines, sorted by contract name.
    pub fn compile_source(
        &self,
        source_name: &str,
        source: &str,
    ) -> Result<Vec<ContractArtifact>, HarnessError> {
        let settings = json!({
            "optimizer": { "enabled": self.optimize, "runs": OPTIMIZER_RUNS },
            "outputSelection": {
                "*": { "*": ["abi", "evm.bytecode.object", "evm.deployedBytecode.object"] }
            }
        });
        let input = json!({
            "language": "Solidity",
            "sources": { source_name: { "content": source } },
            "settings": settings,
        });

        tracing::debug!(target: "solc", "Compiling {source_name} with {}", self.path);
        let stdout = self.run(&serde_json::to_vec(&input)?)?;
        let output: StandardJsonOutput = serde_json::from_slice(&stdout)?;
        artifacts_from_output(source_name, output)
    }

    fn run(&self, input: &[u8]) -> Result<Vec<u8>, HarnessError> {
        let mut child = Command::new(&self.path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| {
                HarnessError::Solc(format!(
                    "failed to run `{}`: {err} (install solc or set {SOLC_PATH_ENV})",
                    self.path
                ))
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input)?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(HarnessError::Solc(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct StandardJsonOutput {
    #[serde(default)]
    errors: Vec<Diagnostic>,
    #[serde(default)]
    contracts: BTreeMap<String, BTreeMap<String, CompiledContract>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Diagnostic {
    severity: String,
    message: String,
    formatted_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompiledContract {
    abi: Abi,
    evm: EvmOutput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvmOutput {
    bytecode: BytecodeOutput,
    deployed_bytecode: BytecodeOutput,
}

#[derive(Debug, Deserialize)]
struct BytecodeOutput {
    object: String,
}

fn artifacts_from_output(
    source_name: &str,
    output: StandardJsonOutput,
) -> Result<Vec<ContractArtifact>, HarnessError> {
    let errors: Vec<String> = output
        .errors
        .iter()
        .filter(|diagnostic| diagnostic.severity == "error")
        .map(|diagnostic| {
            diagnostic
                .formatted_message
                .clone()
                .unwrap_or_else(|| diagnostic.message.clone())
                .trim()
                .to_string()
        })
        .collect();
    if !errors.is_empty() {
        return Err(HarnessError::Solc(errors.join("\n")));
    }
    for warning in output.errors.iter().filter(|d| d.severity != "error") {
        tracing::warn!(target: "solc", "{}", warning.message);
    }

    // BTreeMap iteration keeps the result sorted by contract name.
    Ok(output
        .contracts
        .into_iter()
        .filter(|(source, _)| source == source_name)
        .flat_map(|(source, contracts)| {
            contracts.into_iter().map(move |(name, contract)| {
                ContractArtifact::new(
                    name,
                    source.clone(),
                    contract.abi,
                    contract.evm.bytecode.object,
                    contract.evm.deployed_bytecode.object,
                )
            })
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::print_stderr)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn error_diagnostics_fail_the_build() {
        let output: StandardJsonOutput = serde_json::from_str(
            r#"{"errors":[
                {"severity":"warning","message":"unused variable","formattedMessage":"Warning: unused variable"},
                {"severity":"error","message":"Undeclared identifier.","formattedMessage":"DeclarationError: Undeclared identifier.\n"}
            ]}"#,
        )
        .unwrap();
        let err = artifacts_from_output("Token.sol", output).unwrap_err();
        assert_eq!(
            err.to_string(),
            "solc error: DeclarationError: Undeclared identifier."
        );
    }

    #[test]
    fn contracts_become_artifacts() {
        let output: StandardJsonOutput = serde_json::from_str(
            r#"{
                "errors":[{"severity":"warning","message":"SPDX license identifier not provided"}],
                "contracts":{"Token.sol":{
                    "Token":{"abi":[],"evm":{"bytecode":{"object":"6000"},"deployedBytecode":{"object":"6001"}}},
                    "Base":{"abi":[],"evm":{"bytecode":{"object":""},"deployedBytecode":{"object":""}}}
                }}
            }"#,
        )
        .unwrap();
        let artifacts = artifacts_from_output("Token.sol", output).unwrap();
        let names: Vec<_> = artifacts.iter().map(|a| a.contract_name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Token"]);
        assert_eq!(artifacts[1].source_name, "Token.sol");
        assert_eq!(artifacts[1].bytecode, "0x6000");
        assert_eq!(artifacts[1].init_code().unwrap(), vec![0x60, 0x00]);
    }

    #[test]
    fn missing_binary_is_reported() {
        let compiler = SolcCompiler::new("/nonexistent/solc-binary");
        assert!(!compiler.is_available());
        let err = compiler
            .compile_source("A.sol", "contract A {}")
            .unwrap_err();
        assert!(matches!(err, HarnessError::Solc(ref msg) if msg.contains(SOLC_PATH_ENV)));
    }

    #[test]
    fn compiles_a_minimal_contract() {
        let compiler = SolcCompiler::from_env();
        if !compiler.is_available() {
            eprintln!("skipping compiles_a_minimal_contract because solc is missing");
            return;
        }
        let artifacts = compiler
            .compile_source(
                "Answer.sol",
                "// SPDX-License-Identifier: MIT\npragma solidity >=0.8.0;\ncontract Answer { function answer() external pure returns (uint256) { return 42; } }",
            )
            .expect("solc compilation should succeed");
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].contract_name, "Answer");
        assert!(artifacts[0].abi.function("answer").is_ok());
        assert!(!artifacts[0].init_code().unwrap().is_empty());
    }
}
