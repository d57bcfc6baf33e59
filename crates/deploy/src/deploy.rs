use std::io::Write;

use camino::Utf8PathBuf;
use clap::Args;
use common::{amount, DeployConfig, InProcessConfig};
use contract_harness::{Artifacts, Chain, ContractFactory, ContractInstance, Erc20};
use ethers_core::{
    abi::Token,
    types::{Address, H256, U256},
    utils::to_checksum,
};

use crate::error::DeployError;

/// Command line overrides for the `[deploy]` table of the config.
#[derive(Debug, Clone, Default, Args)]
pub struct DeployOverrides {
    /// Contract artifact to deploy.
    #[arg(long)]
    pub contract: Option<String>,
    /// Directory holding the compiled artifacts.
    #[arg(long)]
    pub artifacts: Option<Utf8PathBuf>,
    /// Token name passed to the constructor.
    #[arg(long)]
    pub name: Option<String>,
    /// Token symbol passed to the constructor.
    #[arg(long)]
    pub symbol: Option<String>,
    /// Initial supply in whole tokens.
    #[arg(long)]
    pub supply: Option<String>,
    /// Supply cap in whole tokens.
    #[arg(long)]
    pub cap: Option<String>,
    /// Account receiving the initial supply.
    #[arg(long)]
    pub beneficiary: Option<String>,
    /// Seconds to wait for confirmation on a JSON-RPC network.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

/// Fully resolved constructor arguments, amounts already scaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployArgs {
    pub contract: String,
    pub artifacts: Utf8PathBuf,
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    pub initial_supply: U256,
    pub cap: U256,
    pub beneficiary: Address,
}

impl DeployArgs {
    pub fn resolve(
        config: &DeployConfig,
        overrides: &DeployOverrides,
    ) -> Result<Self, DeployError> {
        let mut deploy = config.clone();
        if let Some(contract) = &overrides.contract {
            deploy.contract = contract.clone();
        }
        if let Some(artifacts) = &overrides.artifacts {
            deploy.artifacts = artifacts.clone();
        }
        if let Some(name) = &overrides.name {
            deploy.name = name.clone();
        }
        if let Some(symbol) = &overrides.symbol {
            deploy.symbol = symbol.clone();
        }
        if let Some(supply) = &overrides.supply {
            deploy.initial_supply = supply.clone();
        }
        if let Some(cap) = &overrides.cap {
            deploy.cap = cap.clone();
        }
        if let Some(beneficiary) = &overrides.beneficiary {
            deploy.beneficiary = beneficiary
                .parse()
                .map_err(|_| DeployError::InvalidAddress(beneficiary.clone()))?;
        }

        Ok(Self {
            initial_supply: deploy.scaled_initial_supply()?,
            cap: deploy.scaled_cap()?,
            contract: deploy.contract,
            artifacts: deploy.artifacts,
            name: deploy.name,
            symbol: deploy.symbol,
            decimals: deploy.decimals,
            beneficiary: deploy.beneficiary,
        })
    }

    /// `(name, symbol, initialSupply, cap, beneficiary)`, in constructor order.
    pub fn constructor_args(&self) -> Vec<Token> {
        vec![
            Token::String(self.name.clone()),
            Token::String(self.symbol.clone()),
            Token::Uint(self.initial_supply),
            Token::Uint(self.cap),
            Token::Address(self.beneficiary),
        ]
    }

    pub fn factory(&self) -> Result<ContractFactory, DeployError> {
        Ok(Artifacts::new(self.artifacts.clone()).factory(&self.contract)?)
    }
}

/// Token state read back after the deployment is confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub name: String,
    pub symbol: String,
    pub total_supply: U256,
    pub beneficiary: Address,
    pub beneficiary_balance: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub address: Address,
    pub tx_hash: H256,
    pub token: TokenSnapshot,
}

/// Prints the address and transaction hash of a submitted deployment.
pub fn print_submitted<W: Write>(
    out: &mut W,
    address: Address,
    tx_hash: H256,
) -> Result<(), DeployError> {
    writeln!(out, "{}", to_checksum(&address, None))?;
    writeln!(out, "{tx_hash:?}")?;
    out.flush()?;
    Ok(())
}

pub fn print_snapshot<W: Write>(
    out: &mut W,
    snapshot: &TokenSnapshot,
    decimals: u32,
) -> Result<(), DeployError> {
    let symbol = &snapshot.symbol;
    writeln!(out, "Deployed {} ({symbol})", snapshot.name)?;
    writeln!(
        out,
        "  total supply: {} {symbol}",
        amount::display_units(snapshot.total_supply, decimals)?
    )?;
    writeln!(
        out,
        "  balance of {}: {} {symbol}",
        to_checksum(&snapshot.beneficiary, None),
        amount::display_units(snapshot.beneficiary_balance, decimals)?
    )?;
    Ok(())
}

/// Deploys on a fresh in-process chain from its first signer.
pub fn deploy_in_process<W: Write>(
    network: &InProcessConfig,
    args: &DeployArgs,
    out: &mut W,
) -> Result<DeploymentReport, DeployError> {
    let factory = args.factory()?;
    let mut chain = Chain::new(network.accounts);
    let (instance, tx_hash) = submit_in_process(&mut chain, &factory, args, out)?;
    let token = read_snapshot(&mut chain, &Erc20::new(instance.clone()), args.beneficiary)?;
    print_snapshot(out, &token, args.decimals)?;

    Ok(DeploymentReport {
        address: instance.address(),
        tx_hash,
        token,
    })
}

/// Submits the creation transaction, printing its address and hash before
/// it is mined.
pub fn submit_in_process<W: Write>(
    chain: &mut Chain,
    factory: &ContractFactory,
    args: &DeployArgs,
    out: &mut W,
) -> Result<(ContractInstance, H256), DeployError> {
    let deployer = chain.signer(0)?;
    let pending = factory.deploy(chain, deployer, &args.constructor_args())?;
    let tx_hash = pending.tx_hash;
    print_submitted(out, pending.address, tx_hash)?;
    Ok((pending.deployed(chain)?, tx_hash))
}

fn read_snapshot(
    chain: &mut Chain,
    token: &Erc20,
    beneficiary: Address,
) -> Result<TokenSnapshot, DeployError> {
    Ok(TokenSnapshot {
        name: token.name(chain)?,
        symbol: token.symbol(chain)?,
        total_supply: token.total_supply(chain)?,
        beneficiary,
        beneficiary_balance: token.balance_of(chain, beneficiary)?,
    })
}
