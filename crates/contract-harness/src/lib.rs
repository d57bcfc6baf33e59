//! Deploys contract artifacts onto an in-process `revm` chain and exercises
//! them through their ABI.
mod artifact;
mod chain;
mod erc20;
mod factory;
pub mod solc;

pub use artifact::{Artifacts, ContractArtifact};
pub use chain::{CallResult, Chain, EmittedLog, ExecutionOptions, Receipt};
pub use erc20::Erc20;
pub use factory::{ContractFactory, ContractInstance, PendingDeployment};

use ethers_core::abi::{self, AbiParser, ParamType, ParseError as AbiParseError, Token};
use hex::FromHex;
use revm::context::result::HaltReason;
use std::fmt;
use thiserror::Error;

/// Selector of the standard `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Error type returned by the harness.
#[derive(Error)]
pub enum HarnessError {
    #[error("solc error: {0}")]
    Solc(String),
    #[error("abi encoding failed: {0}")]
    Abi(#[from] abi::Error),
    #[error("failed to parse function signature: {0}")]
    AbiSignature(#[from] AbiParseError),
    #[error("`{function}` expects {expected} argument(s), got {found}")]
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },
    #[error("`{function}` returned an unexpected value: {found}")]
    UnexpectedReturn { function: String, found: String },
    #[error("`{0}` returned false")]
    Rejected(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("runtime reverted with data {0}")]
    Revert(RevertData),
    #[error("runtime halted: {reason:?} (gas_used={gas_used})")]
    Halted { reason: HaltReason, gas_used: u64 },
    #[error("unexpected output variant from runtime")]
    UnexpectedOutput,
    #[error("no signer at index {index} ({available} available)")]
    UnknownSigner { index: usize, available: usize },
    #[error(
        "stale transaction from {address:?}: built for nonce {expected}, account is at {found}"
    )]
    NonceMismatch {
        address: ethers_core::types::Address,
        expected: u64,
        found: u64,
    },
    #[error("no artifact named `{name}` under {root}")]
    ArtifactNotFound { name: String, root: String },
    #[error("artifact name `{name}` is ambiguous: {candidates}")]
    AmbiguousArtifact { name: String, candidates: String },
    #[error("bytecode of `{0}` has unlinked library references")]
    UnlinkedBytecode(String),
    #[error("invalid hex string: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl fmt::Debug for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Captures raw revert data and provides a nicer `Display` implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertData(pub Vec<u8>);

impl RevertData {
    /// Decodes a `require(cond, "reason")` style payload.
    pub fn reason(&self) -> Option<String> {
        let payload = self.0.strip_prefix(&ERROR_STRING_SELECTOR)?;
        abi::decode(&[ParamType::String], payload)
            .ok()?
            .into_iter()
            .next()?
            .into_string()
    }
}

impl fmt::Display for RevertData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "0x{} (\"{reason}\")", hex::encode(&self.0)),
            None => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

/// ABI-encodes a function call according to the provided signature.
pub fn encode_function_call(signature: &str, args: &[Token]) -> Result<Vec<u8>, HarnessError> {
    let function = AbiParser::default().parse_function(signature)?;
    let encoded = function.encode_input(args)?;
    Ok(encoded)
}

/// Parses a hex string (with or without `0x` prefix) into raw bytes.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, HarnessError> {
    let trimmed = hex.trim().strip_prefix("0x").unwrap_or(hex.trim());
    Vec::from_hex(trimmed).map_err(HarnessError::Hex)
}
