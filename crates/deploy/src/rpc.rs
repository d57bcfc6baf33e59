//! Deployment against a remote node through its unlocked accounts.
use std::{future::Future, io::Write, time::Duration};

use common::JsonRpcConfig;
use ethers_core::{
    abi::{Abi, Token},
    types::{transaction::eip2718::TypedTransaction, Address, TransactionRequest, U256, U64},
    utils::get_contract_address,
};
use ethers_providers::{Http, Middleware, Provider, ProviderError};
use tokio::time::{timeout_at, Instant};

use crate::{
    deploy::{print_snapshot, print_submitted, DeployArgs, DeploymentReport, TokenSnapshot},
    error::DeployError,
};

pub fn connect(network: &JsonRpcConfig) -> Result<Provider<Http>, DeployError> {
    let provider = Provider::<Http>::try_from(network.url.as_str()).map_err(|err| {
        DeployError::Url {
            url: network.url.clone(),
            reason: err.to_string(),
        }
    })?;
    Ok(provider.interval(Duration::from_millis(network.poll_interval_ms)))
}

/// Shared `timeout-secs` budget of one command. Every request to the node
/// runs against it, so a node that accepts connections but never answers
/// cannot stall the command.
struct Deadline<'a> {
    network: &'a JsonRpcConfig,
    at: Instant,
}

impl<'a> Deadline<'a> {
    fn start(network: &'a JsonRpcConfig) -> Self {
        Self {
            network,
            at: Instant::now() + Duration::from_secs(network.timeout_secs),
        }
    }

    async fn request<T>(
        &self,
        request: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, DeployError> {
        Ok(timeout_at(self.at, request)
            .await
            .map_err(|_| DeployError::Unresponsive {
                url: self.network.url.clone(),
                secs: self.network.timeout_secs,
            })??)
    }
}

/// Unlocked accounts of the node, in the order it reports them.
pub async fn accounts(network: &JsonRpcConfig) -> Result<Vec<Address>, DeployError> {
    let provider = connect(network)?;
    Deadline::start(network)
        .request(provider.get_accounts())
        .await
}

/// Sends the creation transaction from the node's first account and waits
/// for it to be confirmed.
pub async fn deploy<W: Write>(
    network: &JsonRpcConfig,
    args: &DeployArgs,
    out: &mut W,
) -> Result<DeploymentReport, DeployError> {
    let provider = connect(network)?;
    deploy_with(&provider, network, args, out).await
}

pub async fn deploy_with<M, W>(
    provider: &M,
    network: &JsonRpcConfig,
    args: &DeployArgs,
    out: &mut W,
) -> Result<DeploymentReport, DeployError>
where
    M: Middleware<Error = ProviderError>,
    W: Write,
{
    let factory = args.factory()?;
    let data = factory.deployment_data(&args.constructor_args())?;
    let deadline = Deadline::start(network);

    let deployer = deadline
        .request(provider.get_accounts())
        .await?
        .first()
        .copied()
        .ok_or_else(|| DeployError::NoAccounts(network.url.clone()))?;
    let nonce = deadline
        .request(provider.get_transaction_count(deployer, None))
        .await?;
    let predicted = get_contract_address(deployer, nonce);

    let request = TransactionRequest::new().from(deployer).data(data);
    let pending = deadline
        .request(provider.send_transaction(request, None))
        .await?;
    let tx_hash = pending.tx_hash();
    print_submitted(out, predicted, tx_hash)?;
    tracing::info!(
        target: "rpc",
        "Submitted {} deployment {tx_hash:?}, waiting for {} confirmation(s)",
        args.contract,
        network.confirmations
    );

    let receipt = timeout_at(deadline.at, pending.confirmations(network.confirmations))
        .await
        .map_err(|_| DeployError::Timeout {
            tx_hash,
            secs: network.timeout_secs,
        })??
        .ok_or(DeployError::Dropped(tx_hash))?;

    if receipt.status == Some(U64::zero()) {
        return Err(DeployError::Reverted(tx_hash));
    }
    let address = receipt.contract_address.unwrap_or(predicted);
    if address != predicted {
        tracing::warn!(
            target: "rpc",
            "Contract landed at {address:?} instead of the predicted {predicted:?}"
        );
    }

    let reader = Reader {
        provider,
        deadline: &deadline,
        abi: factory.abi(),
        address,
    };
    let token = reader.snapshot(args.beneficiary).await?;
    print_snapshot(out, &token, args.decimals)?;
    Ok(DeploymentReport {
        address,
        tx_hash,
        token,
    })
}

/// `eth_call` reads against a deployed token.
struct Reader<'a, M> {
    provider: &'a M,
    deadline: &'a Deadline<'a>,
    abi: &'a Abi,
    address: Address,
}

impl<M> Reader<'_, M>
where
    M: Middleware<Error = ProviderError>,
{
    async fn snapshot(&self, beneficiary: Address) -> Result<TokenSnapshot, DeployError> {
        Ok(TokenSnapshot {
            name: self.string("name").await?,
            symbol: self.string("symbol").await?,
            total_supply: self.uint("totalSupply", &[]).await?,
            beneficiary,
            beneficiary_balance: self
                .uint("balanceOf", &[Token::Address(beneficiary)])
                .await?,
        })
    }

    async fn read(&self, function: &str, args: &[Token]) -> Result<Token, DeployError> {
        let function_abi = self
            .abi
            .function(function)
            .map_err(contract_harness::HarnessError::from)?;
        let calldata = function_abi
            .encode_input(args)
            .map_err(contract_harness::HarnessError::from)?;
        let tx: TypedTransaction = TransactionRequest::new()
            .to(self.address)
            .data(calldata)
            .into();
        let output = self.deadline.request(self.provider.call(&tx, None)).await?;
        function_abi
            .decode_output(&output)
            .map_err(contract_harness::HarnessError::from)?
            .into_iter()
            .next()
            .ok_or_else(|| unexpected(function))
    }

    async fn string(&self, function: &str) -> Result<String, DeployError> {
        self.read(function, &[])
            .await?
            .into_string()
            .ok_or_else(|| unexpected(function))
    }

    async fn uint(&self, function: &str, args: &[Token]) -> Result<U256, DeployError> {
        self.read(function, args)
            .await?
            .into_uint()
            .ok_or_else(|| unexpected(function))
    }
}

fn unexpected(function: &str) -> DeployError {
    DeployError::UnexpectedReturn {
        function: function.to_string(),
    }
}
