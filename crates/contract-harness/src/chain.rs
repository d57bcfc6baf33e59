use ethers_core::{
    abi::RawLog,
    types::{Address, H256, U256},
};
use revm::{
    bytecode::Bytecode,
    context::{
        result::{ExecutionResult, Output},
        Context, TxEnv,
    },
    database::InMemoryDB,
    handler::{
        ExecuteCommitEvm, ExecuteEvm, MainBuilder, MainContext, MainnetContext, MainnetEvm,
    },
    primitives::{
        keccak256, Address as EvmAddress, Bytes as EvmBytes, Log, TxKind, U256 as EvmU256,
    },
    state::AccountInfo,
};
use std::collections::HashMap;

use crate::{HarnessError, RevertData};

/// Balance given to every generated signer: 10,000 ether.
const SIGNER_BALANCE_WEI: u128 = 10_000 * 1_000_000_000_000_000_000;

/// Gas limit used for contract creation unless overridden.
const CREATE_GAS_LIMIT: u64 = 10_000_000;

/// Options that control the execution context fed into `revm`.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionOptions {
    pub caller: Address,
    pub gas_limit: u64,
    pub gas_price: u128,
    pub value: U256,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            caller: Address::zero(),
            gas_limit: 1_000_000,
            gas_price: 0,
            value: U256::zero(),
        }
    }
}

impl ExecutionOptions {
    pub fn from_caller(caller: Address) -> Self {
        Self {
            caller,
            ..Self::default()
        }
    }
}

/// Output of a read-only call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResult {
    pub return_data: Vec<u8>,
    pub gas_used: u64,
}

/// A log entry together with the contract that emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedLog {
    pub address: Address,
    pub raw: RawLog,
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub tx_hash: H256,
    pub gas_used: u64,
    pub return_data: Vec<u8>,
    /// Address of the created contract, for creation transactions.
    pub contract_address: Option<Address>,
    pub logs: Vec<EmittedLog>,
}

/// Ephemeral chain backed by an in-memory `revm` database.
///
/// Every transaction is mined as soon as it is submitted. Signers are plain
/// funded addresses; nothing is signed.
pub struct Chain {
    evm: MainnetEvm<MainnetContext<InMemoryDB>>,
    signers: Vec<Address>,
    next_nonce_by_caller: HashMap<Address, u64>,
}

impl Chain {
    /// Creates a chain with `accounts` funded signers.
    pub fn new(accounts: usize) -> Self {
        let signers: Vec<Address> = (0..accounts).map(signer_address).collect();

        let mut db = InMemoryDB::default();
        for signer in &signers {
            db.insert_account_info(
                to_evm_address(*signer),
                AccountInfo::new(
                    EvmU256::from(SIGNER_BALANCE_WEI),
                    0,
                    Default::default(),
                    Bytecode::default(),
                ),
            );
        }

        let ctx = Context::mainnet().with_db(db);
        let evm = ctx.build_mainnet();
        tracing::debug!(target: "chain", "Created in-process chain with {accounts} signers");
        Self {
            evm,
            signers,
            next_nonce_by_caller: HashMap::new(),
        }
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn signer(&self, index: usize) -> Result<Address, HarnessError> {
        self.signers
            .get(index)
            .copied()
            .ok_or(HarnessError::UnknownSigner {
                index,
                available: self.signers.len(),
            })
    }

    /// Nonce the next transaction from `address` will carry.
    pub fn nonce(&self, address: Address) -> u64 {
        self.next_nonce_by_caller
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Address a contract created by `deployer`'s next transaction will get.
    pub fn predict_create_address(&self, deployer: Address) -> Address {
        from_evm_address(to_evm_address(deployer).create(self.nonce(deployer)))
    }

    /// Executes a creation transaction built for `nonce` and returns its
    /// receipt.
    pub fn create(
        &mut self,
        init_code: &[u8],
        nonce: u64,
        options: ExecutionOptions,
    ) -> Result<Receipt, HarnessError> {
        let found = self.nonce(options.caller);
        if found != nonce {
            return Err(HarnessError::NonceMismatch {
                address: options.caller,
                expected: nonce,
                found,
            });
        }

        let tx_hash = transaction_hash(options.caller, nonce, None, init_code);
        let options = ExecutionOptions {
            gas_limit: options.gas_limit.max(CREATE_GAS_LIMIT),
            ..options
        };
        let result = self.transact(TxKind::Create, init_code, options, nonce)?;
        match result {
            ExecutionResult::Success {
                output: Output::Create(bytes, Some(deployed_address)),
                gas_used,
                logs,
                ..
            } => {
                let address = from_evm_address(deployed_address);
                tracing::debug!(
                    target: "chain",
                    "Created {address:?} in {tx_hash:?} (gas_used={gas_used})"
                );
                Ok(Receipt {
                    tx_hash,
                    gas_used,
                    return_data: bytes.to_vec(),
                    contract_address: Some(address),
                    logs: convert_logs(logs),
                })
            }
            ExecutionResult::Success { output, .. } => Err(HarnessError::Execution(format!(
                "deployment returned unexpected output: {output:?}"
            ))),
            other => Err(failure(other)),
        }
    }

    /// Executes a read-only call like `eth_call`: state changes are
    /// discarded and the caller's nonce is left untouched.
    pub fn call(
        &mut self,
        to: Address,
        calldata: &[u8],
        options: ExecutionOptions,
    ) -> Result<CallResult, HarnessError> {
        let tx = tx_env(
            TxKind::Call(to_evm_address(to)),
            calldata,
            options,
            self.nonce(options.caller),
        )?;
        let result = self
            .evm
            .transact(tx)
            .map_err(|err| HarnessError::Execution(err.to_string()))?
            .result;
        match result {
            ExecutionResult::Success {
                output: Output::Call(bytes),
                gas_used,
                ..
            } => Ok(CallResult {
                return_data: bytes.to_vec(),
                gas_used,
            }),
            ExecutionResult::Success {
                output: Output::Create(..),
                ..
            } => Err(HarnessError::UnexpectedOutput),
            other => Err(failure(other)),
        }
    }

    /// Executes a state-changing call and returns its receipt.
    pub fn send(
        &mut self,
        to: Address,
        calldata: &[u8],
        options: ExecutionOptions,
    ) -> Result<Receipt, HarnessError> {
        let nonce = self.nonce(options.caller);
        let tx_hash = transaction_hash(options.caller, nonce, Some(to), calldata);
        let result = self.transact(TxKind::Call(to_evm_address(to)), calldata, options, nonce)?;
        match result {
            ExecutionResult::Success {
                output: Output::Call(bytes),
                gas_used,
                logs,
                ..
            } => {
                tracing::debug!(target: "chain", "Mined {tx_hash:?} (gas_used={gas_used})");
                Ok(Receipt {
                    tx_hash,
                    gas_used,
                    return_data: bytes.to_vec(),
                    contract_address: None,
                    logs: convert_logs(logs),
                })
            }
            ExecutionResult::Success {
                output: Output::Create(..),
                ..
            } => Err(HarnessError::UnexpectedOutput),
            other => Err(failure(other)),
        }
    }

    fn transact(
        &mut self,
        kind: TxKind,
        data: &[u8],
        options: ExecutionOptions,
        nonce: u64,
    ) -> Result<ExecutionResult, HarnessError> {
        let tx = tx_env(kind, data, options, nonce)?;
        let result = self
            .evm
            .transact_commit(tx)
            .map_err(|err| HarnessError::Execution(err.to_string()))?;

        // Reverted and halted transactions are still mined and consume the nonce.
        self.next_nonce_by_caller.insert(options.caller, nonce + 1);
        Ok(result)
    }
}

fn tx_env(
    kind: TxKind,
    data: &[u8],
    options: ExecutionOptions,
    nonce: u64,
) -> Result<TxEnv, HarnessError> {
    TxEnv::builder()
        .caller(to_evm_address(options.caller))
        .gas_limit(options.gas_limit)
        .gas_price(options.gas_price)
        .kind(kind)
        .value(EvmU256::from_limbs(options.value.0))
        .data(EvmBytes::copy_from_slice(data))
        .nonce(nonce)
        .build()
        .map_err(|err| HarnessError::Execution(format!("{err:?}")))
}

fn failure(result: ExecutionResult) -> HarnessError {
    match result {
        ExecutionResult::Revert { output, .. } => HarnessError::Revert(RevertData(output.to_vec())),
        ExecutionResult::Halt { reason, gas_used } => HarnessError::Halted { reason, gas_used },
        ExecutionResult::Success { .. } => HarnessError::UnexpectedOutput,
    }
}

fn convert_logs(logs: Vec<Log>) -> Vec<EmittedLog> {
    logs.into_iter()
        .map(|log| EmittedLog {
            address: from_evm_address(log.address),
            raw: RawLog {
                topics: log
                    .data
                    .topics()
                    .iter()
                    .map(|topic| H256::from(topic.0))
                    .collect(),
                data: log.data.data.to_vec(),
            },
        })
        .collect()
}

/// Deterministic signer address for `index`, stable across runs.
fn signer_address(index: usize) -> Address {
    let digest = keccak256(format!("mdot-signer-{index}"));
    Address::from_slice(&digest[12..])
}

/// Identifier of an in-process transaction.
///
/// `(caller, nonce)` is unique per mined transaction, so the hash is too.
pub(crate) fn transaction_hash(
    caller: Address,
    nonce: u64,
    to: Option<Address>,
    data: &[u8],
) -> H256 {
    let mut preimage = Vec::with_capacity(20 + 8 + 20 + data.len());
    preimage.extend_from_slice(caller.as_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    if let Some(to) = to {
        preimage.extend_from_slice(to.as_bytes());
    }
    preimage.extend_from_slice(data);
    H256::from(keccak256(&preimage).0)
}

pub(crate) fn to_evm_address(address: Address) -> EvmAddress {
    EvmAddress::from(address.0)
}

pub(crate) fn from_evm_address(address: EvmAddress) -> Address {
    Address::from(address.0 .0)
}
