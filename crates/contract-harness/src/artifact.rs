use camino::{Utf8Path, Utf8PathBuf};
use ethers_core::abi::Abi;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{factory::ContractFactory, hex_to_bytes, HarnessError};

const ARTIFACT_FORMAT: &str = "hh-sol-artifact-1";

/// Compiled contract in the Hardhat artifact layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    #[serde(rename = "_format", default = "artifact_format")]
    pub format: String,
    pub contract_name: String,
    #[serde(default)]
    pub source_name: String,
    pub abi: Abi,
    /// Hex encoded init code.
    pub bytecode: String,
    /// Hex encoded runtime code.
    #[serde(default)]
    pub deployed_bytecode: String,
}

fn artifact_format() -> String {
    ARTIFACT_FORMAT.to_string()
}

impl ContractArtifact {
    pub fn new(
        contract_name: impl Into<String>,
        source_name: impl Into<String>,
        abi: Abi,
        bytecode: impl Into<String>,
        deployed_bytecode: impl Into<String>,
    ) -> Self {
        Self {
            format: artifact_format(),
            contract_name: contract_name.into(),
            source_name: source_name.into(),
            abi,
            bytecode: with_hex_prefix(bytecode.into()),
            deployed_bytecode: with_hex_prefix(deployed_bytecode.into()),
        }
    }

    pub fn from_file(path: &Utf8Path) -> Result<Self, HarnessError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Decoded init code, refusing bytecode that still needs library linking.
    pub fn init_code(&self) -> Result<Vec<u8>, HarnessError> {
        if self.bytecode.contains("__$") {
            return Err(HarnessError::UnlinkedBytecode(self.contract_name.clone()));
        }
        hex_to_bytes(&self.bytecode)
    }
}

fn with_hex_prefix(hex: String) -> String {
    if hex.starts_with("0x") || hex.is_empty() {
        hex
    } else {
        format!("0x{hex}")
    }
}

/// Directory of artifacts laid out as `<root>/<source>/<Contract>.json`.
#[derive(Debug, Clone)]
pub struct Artifacts {
    root: Utf8PathBuf,
}

impl Artifacts {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Finds the artifact file of contract `name` anywhere below the root.
    pub fn find(&self, name: &str) -> Result<Utf8PathBuf, HarnessError> {
        let file_name = format!("{name}.json");
        let mut matches: Vec<Utf8PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_str() == Some(file_name.as_str()))
            .filter(|entry| {
                !entry
                    .path()
                    .components()
                    .any(|component| component.as_os_str() == "build-info")
            })
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
            .collect();
        matches.sort();

        match matches.len() {
            0 => Err(HarnessError::ArtifactNotFound {
                name: name.to_string(),
                root: self.root.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => Err(HarnessError::AmbiguousArtifact {
                name: name.to_string(),
                candidates: matches
                    .iter()
                    .map(|path| path.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    pub fn load(&self, name: &str) -> Result<ContractArtifact, HarnessError> {
        let path = self.find(name)?;
        tracing::debug!(target: "artifacts", "Loading {name} from {path}");
        ContractArtifact::from_file(&path)
    }

    /// Resolves a contract template by name, like `getContractFactory`.
    pub fn factory(&self, name: &str) -> Result<ContractFactory, HarnessError> {
        ContractFactory::from_artifact(&self.load(name)?)
    }

    /// Writes `artifact` to `<root>/<source name>/<contract>.json` and returns
    /// the path.
    pub fn write(&self, artifact: &ContractArtifact) -> Result<Utf8PathBuf, HarnessError> {
        let source_dir = if artifact.source_name.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&artifact.source_name)
        };
        std::fs::create_dir_all(&source_dir)?;
        let path = source_dir.join(format!("{}.json", artifact.contract_name));
        std::fs::write(&path, serde_json::to_string_pretty(artifact)?)?;
        Ok(path)
    }
}
