use std::sync::Arc;

use ethers_core::{
    abi::{Abi, Log as DecodedLog, Token},
    types::{Address, H256},
};

use crate::{
    chain::{transaction_hash, Chain, ExecutionOptions, Receipt},
    ContractArtifact, HarnessError,
};

/// Contract template ready to be deployed: its ABI plus init code.
#[derive(Debug, Clone)]
pub struct ContractFactory {
    name: String,
    abi: Arc<Abi>,
    init_code: Vec<u8>,
}

impl ContractFactory {
    pub fn new(name: impl Into<String>, abi: Abi, init_code: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            abi: Arc::new(abi),
            init_code,
        }
    }

    pub fn from_artifact(artifact: &ContractArtifact) -> Result<Self, HarnessError> {
        Ok(Self::new(
            artifact.contract_name.clone(),
            artifact.abi.clone(),
            artifact.init_code()?,
        ))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Init code with the ABI-encoded constructor arguments appended.
    pub fn deployment_data(&self, args: &[Token]) -> Result<Vec<u8>, HarnessError> {
        match self.abi.constructor() {
            Some(constructor) => {
                if constructor.inputs.len() != args.len() {
                    return Err(HarnessError::ArgumentCount {
                        function: format!("{} constructor", self.name),
                        expected: constructor.inputs.len(),
                        found: args.len(),
                    });
                }
                Ok(constructor.encode_input(self.init_code.clone(), args)?)
            }
            None if args.is_empty() => Ok(self.init_code.clone()),
            None => Err(HarnessError::ArgumentCount {
                function: format!("{} constructor", self.name),
                expected: 0,
                found: args.len(),
            }),
        }
    }

    /// Builds the creation transaction for `deployer`.
    ///
    /// Nothing is executed yet: the returned value carries the address the
    /// contract will have once mined and the transaction hash.
    pub fn deploy(
        &self,
        chain: &Chain,
        deployer: Address,
        args: &[Token],
    ) -> Result<PendingDeployment, HarnessError> {
        let data = self.deployment_data(args)?;
        let nonce = chain.nonce(deployer);
        let pending = PendingDeployment {
            name: self.name.clone(),
            abi: Arc::clone(&self.abi),
            address: chain.predict_create_address(deployer),
            tx_hash: transaction_hash(deployer, nonce, None, &data),
            deployer,
            nonce,
            data,
        };
        tracing::debug!(
            target: "factory",
            "Prepared deployment of {} at {:?} (nonce {nonce})",
            pending.name,
            pending.address
        );
        Ok(pending)
    }
}

/// A creation transaction that has been built but not mined.
#[derive(Debug, Clone)]
pub struct PendingDeployment {
    name: String,
    abi: Arc<Abi>,
    /// Address the contract will have once mined.
    pub address: Address,
    pub tx_hash: H256,
    pub deployer: Address,
    pub nonce: u64,
    data: Vec<u8>,
}

impl PendingDeployment {
    /// Mines the creation transaction and returns the live instance.
    pub fn deployed(self, chain: &mut Chain) -> Result<ContractInstance, HarnessError> {
        let receipt = chain.create(
            &self.data,
            self.nonce,
            ExecutionOptions::from_caller(self.deployer),
        )?;
        let address = receipt
            .contract_address
            .ok_or(HarnessError::UnexpectedOutput)?;
        if address != self.address {
            return Err(HarnessError::Execution(format!(
                "{} landed at {address:?}, expected {:?}",
                self.name, self.address
            )));
        }
        tracing::info!(target: "factory", "Deployed {} at {address:?}", self.name);
        Ok(ContractInstance {
            address,
            abi: self.abi,
            deploy_receipt: Some(receipt),
        })
    }
}

/// Handle on a deployed contract. The chain is passed to every call.
#[derive(Debug, Clone)]
pub struct ContractInstance {
    address: Address,
    abi: Arc<Abi>,
    deploy_receipt: Option<Receipt>,
}

impl ContractInstance {
    /// Attaches to a contract that is already deployed at `address`.
    pub fn at(address: Address, abi: Abi) -> Self {
        Self {
            address,
            abi: Arc::new(abi),
            deploy_receipt: None,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// Receipt of the creation transaction, when this handle deployed it.
    pub fn deploy_receipt(&self) -> Option<&Receipt> {
        self.deploy_receipt.as_ref()
    }

    fn encode(&self, function: &str, args: &[Token]) -> Result<Vec<u8>, HarnessError> {
        let abi_function = self.abi.function(function)?;
        if abi_function.inputs.len() != args.len() {
            return Err(HarnessError::ArgumentCount {
                function: function.to_string(),
                expected: abi_function.inputs.len(),
                found: args.len(),
            });
        }
        Ok(abi_function.encode_input(args)?)
    }

    /// Calls a read-only function and decodes its outputs.
    pub fn call(
        &self,
        chain: &mut Chain,
        function: &str,
        args: &[Token],
    ) -> Result<Vec<Token>, HarnessError> {
        let calldata = self.encode(function, args)?;
        let result = chain.call(self.address, &calldata, ExecutionOptions::default())?;
        Ok(self.abi.function(function)?.decode_output(&result.return_data)?)
    }

    /// Sends a state-changing transaction from `from`.
    pub fn send(
        &self,
        chain: &mut Chain,
        from: Address,
        function: &str,
        args: &[Token],
    ) -> Result<Receipt, HarnessError> {
        self.send_with(chain, ExecutionOptions::from_caller(from), function, args)
    }

    pub fn send_with(
        &self,
        chain: &mut Chain,
        options: ExecutionOptions,
        function: &str,
        args: &[Token],
    ) -> Result<Receipt, HarnessError> {
        let calldata = self.encode(function, args)?;
        chain.send(self.address, &calldata, options)
    }

    /// Decodes the return data of a mined transaction against `function`.
    pub fn decode_return(
        &self,
        function: &str,
        receipt: &Receipt,
    ) -> Result<Vec<Token>, HarnessError> {
        Ok(self
            .abi
            .function(function)?
            .decode_output(&receipt.return_data)?)
    }

    /// Decodes every `event` this contract emitted in `receipt`.
    pub fn events(&self, event: &str, receipt: &Receipt) -> Result<Vec<DecodedLog>, HarnessError> {
        let abi_event = self.abi.event(event)?;
        let signature = abi_event.signature();
        receipt
            .logs
            .iter()
            .filter(|log| log.address == self.address)
            .filter(|log| log.raw.topics.first() == Some(&signature))
            .map(|log| Ok(abi_event.parse_log(log.raw.clone())?))
            .collect()
    }
}
