use contract_harness::HarnessError;
use ethers_core::{
    abi::Token,
    types::{Address, U256},
};
use mdot_tests::{token_factory, tokens, TokenArgs, TokenFixture};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn recipient() -> Address {
    "0xC00c6c407ED165c92306724C76eC6148CAe755cA"
        .parse()
        .expect("valid address")
}

#[rstest]
#[case("MillionDotToken", "MDOT")]
#[case("TokenName", "TKS")]
fn name_and_symbol_match_constructor(#[case] name: &str, #[case] symbol: &str) {
    let factory = token_factory().unwrap();
    let args = TokenArgs {
        name: name.to_string(),
        symbol: symbol.to_string(),
        ..TokenArgs::million_dot()
    };
    let mut fixture = TokenFixture::deploy(&factory, &args).unwrap();
    assert_eq!(fixture.token.name(&mut fixture.chain).unwrap(), name);
    assert_eq!(fixture.token.symbol(&mut fixture.chain).unwrap(), symbol);
    assert_eq!(fixture.token.decimals(&mut fixture.chain).unwrap(), 18);
}

#[test]
fn total_supply_is_ten_million_tokens() {
    let factory = token_factory().unwrap();
    let mut fixture = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    assert_eq!(fixture.total_supply().unwrap(), tokens(10_000_000));
    assert_eq!(
        fixture.token.cap(&mut fixture.chain).unwrap(),
        tokens(1_000_000_000)
    );
}

#[test]
fn deployer_holds_the_initial_supply() {
    let factory = token_factory().unwrap();
    let mut fixture = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    let owner = fixture.owner;
    assert_eq!(fixture.balance_of(owner).unwrap(), tokens(10_000_000));
    let other = fixture.signer(1).unwrap();
    assert_eq!(fixture.balance_of(other).unwrap(), U256::zero());
}

#[test]
fn deploy_defaults_mint_to_the_beneficiary() {
    let factory = token_factory().unwrap();
    let args = TokenArgs::deploy_defaults();
    let beneficiary = args.beneficiary.unwrap();
    let mut fixture = TokenFixture::deploy(&factory, &args).unwrap();
    let owner = fixture.owner;
    assert_eq!(fixture.balance_of(beneficiary).unwrap(), tokens(10_000));
    assert_eq!(fixture.balance_of(owner).unwrap(), U256::zero());
    assert_eq!(fixture.total_supply().unwrap(), tokens(10_000));
}

#[test]
fn transfer_moves_exactly_the_amount() {
    let factory = token_factory().unwrap();
    let mut fixture = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    let owner = fixture.owner;
    let amount = tokens(12_313);

    let receipt = fixture.transfer(owner, recipient(), amount).unwrap();

    assert_eq!(fixture.balance_of(recipient()).unwrap(), amount);
    assert_eq!(
        fixture.balance_of(owner).unwrap(),
        tokens(10_000_000) - amount
    );
    assert_eq!(fixture.total_supply().unwrap(), tokens(10_000_000));

    let events = fixture
        .token
        .instance()
        .events("Transfer", &receipt)
        .unwrap();
    assert_eq!(events.len(), 1);
    let values: Vec<_> = events[0].params.iter().map(|param| &param.value).collect();
    assert_eq!(
        values,
        vec![
            &Token::Address(owner),
            &Token::Address(recipient()),
            &Token::Uint(amount),
        ]
    );
}

#[test]
fn transfer_above_balance_reverts() {
    let factory = token_factory().unwrap();
    let mut fixture = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    let owner = fixture.owner;
    let poor = fixture.signer(1).unwrap();

    let err = fixture.transfer(poor, owner, tokens(1)).unwrap_err();
    match err {
        HarnessError::Revert(data) => {
            assert_eq!(data.reason().as_deref(), Some("insufficient balance"))
        }
        other => panic!("expected a revert, got {other}"),
    }
    assert_eq!(fixture.balance_of(owner).unwrap(), tokens(10_000_000));
    assert_eq!(fixture.balance_of(poor).unwrap(), U256::zero());
}

#[test]
fn supply_above_cap_reverts() {
    let factory = token_factory().unwrap();
    let args = TokenArgs {
        initial_supply: tokens(1_000_001),
        cap: tokens(1_000_000),
        ..TokenArgs::million_dot()
    };
    match TokenFixture::deploy(&factory, &args) {
        Err(HarnessError::Revert(data)) => {
            assert_eq!(data.reason().as_deref(), Some("cap exceeded"))
        }
        Err(other) => panic!("expected a revert, got {other}"),
        Ok(_) => panic!("deployment above the cap succeeded"),
    }
}

#[test]
fn deployment_lands_on_predicted_address() {
    let factory = token_factory().unwrap();
    let fixture = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    let receipt = fixture.token.instance().deploy_receipt().unwrap();
    assert_eq!(receipt.tx_hash, fixture.deploy_tx);
    assert_eq!(receipt.contract_address, Some(fixture.token.address()));

    let minted = fixture.token.instance().events("Transfer", receipt).unwrap();
    assert_eq!(minted.len(), 1);
    assert_eq!(minted[0].params[0].value, Token::Address(Address::zero()));
}

#[test]
fn transactions_have_distinct_hashes() {
    let factory = token_factory().unwrap();
    let mut fixture = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    let owner = fixture.owner;
    let first = fixture.transfer(owner, recipient(), tokens(1)).unwrap();
    let second = fixture.transfer(owner, recipient(), tokens(1)).unwrap();
    assert_ne!(first.tx_hash, second.tx_hash);
    assert_ne!(first.tx_hash, fixture.deploy_tx);
    assert_eq!(fixture.balance_of(recipient()).unwrap(), tokens(2));
}

#[test]
fn scenarios_do_not_share_state() {
    let factory = token_factory().unwrap();
    let mut first = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    let mut second = TokenFixture::deploy(&factory, &TokenArgs::million_dot()).unwrap();
    assert_eq!(first.token.address(), second.token.address());

    let owner = first.owner;
    first.transfer(owner, recipient(), tokens(12_313)).unwrap();
    assert_eq!(first.balance_of(recipient()).unwrap(), tokens(12_313));
    assert_eq!(second.balance_of(recipient()).unwrap(), U256::zero());
}
