use ethers_core::{
    abi::Token,
    types::{Address, U256},
};

use crate::{Chain, ContractInstance, HarnessError, Receipt};

/// Typed view of a deployed ERC-20 token.
#[derive(Debug, Clone)]
pub struct Erc20 {
    instance: ContractInstance,
}

impl Erc20 {
    pub fn new(instance: ContractInstance) -> Self {
        Self { instance }
    }

    pub fn address(&self) -> Address {
        self.instance.address()
    }

    pub fn instance(&self) -> &ContractInstance {
        &self.instance
    }

    pub fn name(&self, chain: &mut Chain) -> Result<String, HarnessError> {
        let token = self.single(chain, "name", &[])?;
        token
            .clone()
            .into_string()
            .ok_or_else(|| unexpected("name", &token))
    }

    pub fn symbol(&self, chain: &mut Chain) -> Result<String, HarnessError> {
        let token = self.single(chain, "symbol", &[])?;
        token
            .clone()
            .into_string()
            .ok_or_else(|| unexpected("symbol", &token))
    }

    pub fn decimals(&self, chain: &mut Chain) -> Result<u32, HarnessError> {
        let token = self.single(chain, "decimals", &[])?;
        token
            .clone()
            .into_uint()
            .filter(|decimals| *decimals <= U256::from(u8::MAX))
            .map(|decimals| decimals.as_u32())
            .ok_or_else(|| unexpected("decimals", &token))
    }

    pub fn total_supply(&self, chain: &mut Chain) -> Result<U256, HarnessError> {
        self.uint(chain, "totalSupply", &[])
    }

    pub fn balance_of(&self, chain: &mut Chain, owner: Address) -> Result<U256, HarnessError> {
        self.uint(chain, "balanceOf", &[Token::Address(owner)])
    }

    /// Upper bound on the supply, for capped tokens.
    pub fn cap(&self, chain: &mut Chain) -> Result<U256, HarnessError> {
        self.uint(chain, "cap", &[])
    }

    /// Moves `amount` base units from `from` to `to`.
    ///
    /// A token that returns `false` instead of reverting is reported as
    /// [`HarnessError::Rejected`].
    pub fn transfer(
        &self,
        chain: &mut Chain,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<Receipt, HarnessError> {
        let receipt = self.instance.send(
            chain,
            from,
            "transfer",
            &[Token::Address(to), Token::Uint(amount)],
        )?;
        match self.instance.decode_return("transfer", &receipt)?.as_slice() {
            [Token::Bool(true)] => {
                tracing::debug!(target: "erc20", "Transferred {amount} from {from:?} to {to:?}");
                Ok(receipt)
            }
            [Token::Bool(false)] => Err(HarnessError::Rejected("transfer".to_string())),
            other => Err(HarnessError::UnexpectedReturn {
                function: "transfer".to_string(),
                found: format!("{other:?}"),
            }),
        }
    }

    fn uint(
        &self,
        chain: &mut Chain,
        function: &str,
        args: &[Token],
    ) -> Result<U256, HarnessError> {
        let token = self.single(chain, function, args)?;
        token
            .clone()
            .into_uint()
            .ok_or_else(|| unexpected(function, &token))
    }

    fn single(
        &self,
        chain: &mut Chain,
        function: &str,
        args: &[Token],
    ) -> Result<Token, HarnessError> {
        let mut outputs = self.instance.call(chain, function, args)?;
        match outputs.len() {
            1 => Ok(outputs.remove(0)),
            _ => Err(HarnessError::UnexpectedReturn {
                function: function.to_string(),
                found: format!("{outputs:?}"),
            }),
        }
    }
}

fn unexpected(function: &str, token: &Token) -> HarnessError {
    HarnessError::UnexpectedReturn {
        function: function.to_string(),
        found: token.to_string(),
    }
}
