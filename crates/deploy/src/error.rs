use camino::Utf8PathBuf;
use common::{AmountError, ConfigError};
use contract_harness::HarnessError;
use ethers_core::types::H256;
use ethers_providers::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Amount(#[from] AmountError),
    #[error(transparent)]
    Harness(#[from] HarnessError),
    #[error("json-rpc request failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("invalid node url {url}: {reason}")]
    Url { url: String, reason: String },
    #[error("invalid beneficiary address \"{0}\"")]
    InvalidAddress(String),
    #[error("the node at {url} did not answer within {secs}s")]
    Unresponsive { url: String, secs: u64 },
    #[error("the node at {0} has no unlocked accounts")]
    NoAccounts(String),
    #[error("transaction {tx_hash:?} was not confirmed within {secs}s")]
    Timeout { tx_hash: H256, secs: u64 },
    #[error("transaction {0:?} was dropped before it was mined")]
    Dropped(H256),
    #[error("deployment transaction {0:?} reverted")]
    Reverted(H256),
    #[error("`{function}` returned an unexpected value")]
    UnexpectedReturn { function: String },
    #[error("{0} defines no contracts")]
    NoContracts(Utf8PathBuf),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
