//! `mdot.toml`: named networks plus the constructor arguments used by the
//! deployment driver.

use std::{collections::BTreeMap, fmt::Display};

use camino::{Utf8Path, Utf8PathBuf};
use ethers_core::types::{Address, U256};
use serde::Deserialize;
use thiserror::Error;

use crate::amount::{self, AmountError, DEFAULT_DECIMALS};

/// File name looked up in the working directory when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "mdot.toml";

/// Name of the built-in in-process network.
pub const IN_PROCESS_NETWORK: &str = "hardhat";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unknown network \"{name}\" (available: {available})")]
    UnknownNetwork { name: String, available: String },
    #[error("invalid config:\n{0}")]
    Invalid(ConfigDiagnostics),
    #[error("invalid deploy amount: {0}")]
    Amount(#[from] AmountError),
}

/// Validation problems collected over the whole file, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDiagnostics(pub Vec<ConfigDiagnostic>);

impl Display for ConfigDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lines: Vec<_> = self.0.iter().map(|diag| format!("  {diag}")).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigDiagnostic {
    MissingDefaultNetwork(String),
    ZeroAccounts { network: String },
    ZeroTimeout { network: String },
    ZeroConfirmations { network: String },
    InvalidUrl { network: String, url: String },
    EmptyContractName,
}

impl Display for ConfigDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDefaultNetwork(name) => {
                write!(f, "Default network \"{name}\" is not defined")
            }
            Self::ZeroAccounts { network } => {
                write!(f, "Network \"{network}\" must create at least one account")
            }
            Self::ZeroTimeout { network } => {
                write!(f, "Network \"{network}\" has a zero confirmation timeout")
            }
            Self::ZeroConfirmations { network } => {
                write!(
                    f,
                    "Network \"{network}\" must wait for at least one confirmation"
                )
            }
            Self::InvalidUrl { network, url } => {
                write!(f, "Network \"{network}\" has a non-http url \"{url}\"")
            }
            Self::EmptyContractName => write!(f, "Deploy contract name is empty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NetworkConfig {
    /// Ephemeral revm chain living inside the process.
    InProcess(InProcessConfig),
    /// Remote node reached over HTTP JSON-RPC.
    JsonRpc(JsonRpcConfig),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct InProcessConfig {
    #[serde(default = "default_accounts")]
    pub accounts: usize,
}

impl Default for InProcessConfig {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct JsonRpcConfig {
    pub url: String,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_accounts() -> usize {
    20
}

fn default_confirmations() -> usize {
    1
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Template name and constructor arguments for the deployment driver.
///
/// Amounts are decimal strings in whole tokens and are scaled by
/// `10^decimals` on use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct DeployConfig {
    pub contract: String,
    pub artifacts: Utf8PathBuf,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub initial_supply: String,
    pub cap: String,
    pub beneficiary: Address,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            contract: "MillionDotToken".to_string(),
            artifacts: Utf8PathBuf::from("artifacts"),
            name: "TokenName".to_string(),
            symbol: "TKS".to_string(),
            decimals: DEFAULT_DECIMALS,
            initial_supply: "10000".to_string(),
            cap: "1000000".to_string(),
            beneficiary: default_beneficiary(),
        }
    }
}

fn default_beneficiary() -> Address {
    Address::from([
        0x90, 0xdc, 0x10, 0xe2, 0x8f, 0x4c, 0x07, 0x9d, 0x9b, 0x65, 0x37, 0xe1, 0x0c, 0xb2, 0xde,
        0xe2, 0x2f, 0x72, 0x1c, 0xbb,
    ])
}

impl DeployConfig {
    pub fn scaled_initial_supply(&self) -> Result<U256, ConfigError> {
        Ok(amount::parse_scaled(&self.initial_supply, self.decimals)?)
    }

    pub fn scaled_cap(&self) -> Result<U256, ConfigError> {
        Ok(amount::parse_scaled(&self.cap, self.decimals)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    default_network: Option<String>,
    #[serde(default)]
    networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    deploy: DeployConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub default_network: String,
    pub networks: BTreeMap<String, NetworkConfig>,
    pub deploy: DeployConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = BTreeMap::new();
        networks.insert(
            IN_PROCESS_NETWORK.to_string(),
            NetworkConfig::InProcess(InProcessConfig::default()),
        );
        Self {
            default_network: IN_PROCESS_NETWORK.to_string(),
            networks,
            deploy: DeployConfig::default(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        let mut networks = raw.networks;
        networks
            .entry(IN_PROCESS_NETWORK.to_string())
            .or_insert_with(|| NetworkConfig::InProcess(InProcessConfig::default()));

        let config = Config {
            default_network: raw
                .default_network
                .unwrap_or_else(|| IN_PROCESS_NETWORK.to_string()),
            networks,
            deploy: raw.deploy,
        };

        let diagnostics = config.diagnostics();
        if diagnostics.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(ConfigDiagnostics(diagnostics)))
        }
    }

    /// Loads the config at `path`. A missing file means "use the defaults".
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(target: "config", "No config at {path}, using defaults");
            return Ok(Config::default());
        }
        tracing::debug!(target: "config", "Loading config from {path}");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Resolves `name`, or the default network when `None`.
    pub fn network(&self, name: Option<&str>) -> Result<(&str, &NetworkConfig), ConfigError> {
        let name = name.unwrap_or(self.default_network.as_str());
        self.networks
            .get_key_value(name)
            .map(|(name, network)| (name.as_str(), network))
            .ok_or_else(|| ConfigError::UnknownNetwork {
                name: name.to_string(),
                available: self
                    .networks
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    fn diagnostics(&self) -> Vec<ConfigDiagnostic> {
        let mut diagnostics = Vec::new();

        if !self.networks.contains_key(&self.default_network) {
            diagnostics.push(ConfigDiagnostic::MissingDefaultNetwork(
                self.default_network.clone(),
            ));
        }

        for (name, network) in &self.networks {
            match network {
                NetworkConfig::InProcess(config) => {
                    if config.accounts == 0 {
                        diagnostics.push(ConfigDiagnostic::ZeroAccounts {
                            network: name.clone(),
                        });
                    }
                }
                NetworkConfig::JsonRpc(config) => {
                    if !(config.url.starts_with("http://") || config.url.starts_with("https://"))
                    {
                        diagnostics.push(ConfigDiagnostic::InvalidUrl {
                            network: name.clone(),
                            url: config.url.clone(),
                        });
                    }
                    if config.timeout_secs == 0 {
                        diagnostics.push(ConfigDiagnostic::ZeroTimeout {
                            network: name.clone(),
                        });
                    }
                    if config.confirmations == 0 {
                        diagnostics.push(ConfigDiagnostic::ZeroConfirmations {
                            network: name.clone(),
                        });
                    }
                }
            }
        }

        if self.deploy.contract.trim().is_empty() {
            diagnostics.push(ConfigDiagnostic::EmptyContractName);
        }

        diagnostics
    }
}
