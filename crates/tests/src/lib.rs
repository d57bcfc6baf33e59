//! Shared setup for the token scenarios: loads the fixture token artifact and
//! deploys it onto a fresh chain per scenario.
use camino::Utf8PathBuf;
use common::DEFAULT_DECIMALS;
use contract_harness::{
    Artifacts, Chain, ContractArtifact, ContractFactory, Erc20, HarnessError, Receipt,
};
use ethers_core::{
    abi::Token,
    types::{Address, H256, U256},
};

pub const FIXTURE_CONTRACT: &str = "MillionDotToken";
pub const FIXTURE_NAME: &str = "MillionDotToken.sol";
pub const FIXTURE_SOURCE: &str = include_str!("../fixtures/MillionDotToken.sol");

/// Funded signers created for every scenario.
pub const SIGNERS: usize = 5;

/// `whole` tokens in base units.
pub fn tokens(whole: u64) -> U256 {
    U256::from(whole) * U256::exp10(DEFAULT_DECIMALS as usize)
}

/// Directory holding the fixture source and its compiled artifact.
pub fn fixtures_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures"))
}

/// The committed Hardhat artifact of the fixture token.
pub fn token_artifact() -> Result<ContractArtifact, HarnessError> {
    Artifacts::new(fixtures_dir()).load(FIXTURE_CONTRACT)
}

pub fn token_factory() -> Result<ContractFactory, HarnessError> {
    ContractFactory::from_artifact(&token_artifact()?)
}

/// Constructor arguments of the fixture token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenArgs {
    pub name: String,
    pub symbol: String,
    pub initial_supply: U256,
    pub cap: U256,
    /// Receiver of the initial supply; the deployer when `None`.
    pub beneficiary: Option<Address>,
}

impl TokenArgs {
    /// 10,000,000 MDOT minted to the deployer.
    pub fn million_dot() -> Self {
        Self {
            name: "MillionDotToken".to_string(),
            symbol: "MDOT".to_string(),
            initial_supply: tokens(10_000_000),
            cap: tokens(1_000_000_000),
            beneficiary: None,
        }
    }

    /// The arguments the deployment driver uses by default.
    pub fn deploy_defaults() -> Self {
        Self {
            name: "TokenName".to_string(),
            symbol: "TKS".to_string(),
            initial_supply: tokens(10_000),
            cap: tokens(1_000_000),
            beneficiary: Some(Address::from([
                0x90, 0xdc, 0x10, 0xe2, 0x8f, 0x4c, 0x07, 0x9d, 0x9b, 0x65, 0x37, 0xe1, 0x0c, 0xb2,
                0xde, 0xe2, 0x2f, 0x72, 0x1c, 0xbb,
            ])),
        }
    }

    pub fn constructor_args(&self, deployer: Address) -> Vec<Token> {
        vec![
            Token::String(self.name.clone()),
            Token::String(self.symbol.clone()),
            Token::Uint(self.initial_supply),
            Token::Uint(self.cap),
            Token::Address(self.beneficiary.unwrap_or(deployer)),
        ]
    }
}

/// A freshly deployed token on its own chain.
pub struct TokenFixture {
    pub chain: Chain,
    pub token: Erc20,
    /// Deployer, i.e. `signers[0]`.
    pub owner: Address,
    pub deploy_tx: H256,
}

impl TokenFixture {
    pub fn deploy(factory: &ContractFactory, args: &TokenArgs) -> Result<Self, HarnessError> {
        let mut chain = Chain::new(SIGNERS);
        let owner = chain.signer(0)?;
        let pending = factory.deploy(&chain, owner, &args.constructor_args(owner))?;
        let deploy_tx = pending.tx_hash;
        let instance = pending.deployed(&mut chain)?;
        Ok(Self {
            chain,
            token: Erc20::new(instance),
            owner,
            deploy_tx,
        })
    }

    pub fn signer(&self, index: usize) -> Result<Address, HarnessError> {
        self.chain.signer(index)
    }

    pub fn balance_of(&mut self, owner: Address) -> Result<U256, HarnessError> {
        self.token.balance_of(&mut self.chain, owner)
    }

    pub fn total_supply(&mut self) -> Result<U256, HarnessError> {
        self.token.total_supply(&mut self.chain)
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Receipt, HarnessError> {
        self.token.transfer(&mut self.chain, from, to, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contract_harness::solc::SolcCompiler;
    use pretty_assertions::assert_eq;

    #[test]
    fn token_amounts_use_eighteen_decimals() {
        assert_eq!(
            tokens(12_313),
            U256::from_dec_str("12313000000000000000000").unwrap()
        );
    }

    #[test]
    fn fixture_artifact_loads_from_disk() {
        let artifact = token_artifact().unwrap();
        assert_eq!(artifact.contract_name, FIXTURE_CONTRACT);
        assert_eq!(artifact.source_name, FIXTURE_NAME);
        let constructor = artifact.abi.constructor().unwrap();
        assert_eq!(constructor.inputs.len(), 5);
        assert!(!artifact.init_code().unwrap().is_empty());
        assert!(artifact.abi.function("transfer").is_ok());
    }

    #[test]
    #[allow(clippy::print_stderr)]
    fn fixture_artifact_matches_source() {
        let compiler = SolcCompiler::from_env();
        if !compiler.is_available() {
            eprintln!("skipping fixture_artifact_matches_source because solc is missing");
            return;
        }
        let compiled = compiler
            .compile_source(FIXTURE_NAME, FIXTURE_SOURCE)
            .unwrap()
            .into_iter()
            .find(|artifact| artifact.contract_name == FIXTURE_CONTRACT)
            .unwrap();
        assert_eq!(compiled.abi, token_artifact().unwrap().abi);
    }

    #[test]
    fn beneficiary_defaults_to_the_deployer() {
        let deployer = Address::repeat_byte(0x11);
        let args = TokenArgs::million_dot().constructor_args(deployer);
        assert_eq!(args[4], Token::Address(deployer));
        assert_eq!(args[2], Token::Uint(tokens(10_000_000)));

        let args = TokenArgs::deploy_defaults().constructor_args(deployer);
        assert_ne!(args[4], Token::Address(deployer));
    }
}
