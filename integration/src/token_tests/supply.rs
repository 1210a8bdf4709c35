//! Tests of minting and burning

use alloy::primitives::{utils::parse_ether, Address, U256};
use eyre::Result;
use scripts::rpc::send_tx;

use crate::{
    integration_test,
    test_args::{pre_mint_amount, TestArgs, OWNER, PRE_MINT},
    token_tests::{assert_eq_result, assert_reverts_with},
};

/// A holder with no role and, initially, no balance
const HOLDER: usize = 6;

/// Test that initialization mints the pre-mint supply
async fn test_pre_mint(args: TestArgs) -> Result<()> {
    let token = args.deploy_token().await?;

    let balance = args.balance_of(token, PRE_MINT).await?;
    assert_eq_result(balance, pre_mint_amount()?, "pre-mint balance")
}
integration_test!(test_pre_mint);

/// Test the guards on `mintFor`
async fn test_mint_guards(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;

    assert_reverts_with(
        token.mintFor(Address::ZERO, U256::from(100)),
        "VBTC: mint to the zero address",
    )
    .await?;

    let max_supply = token.MAX_SUPPLY().call().await?;
    assert_reverts_with(
        token.mintFor(args.address(OWNER)?, max_supply),
        "VBTC: mint amount exceeds max supply",
    )
    .await
}
integration_test!(test_mint_guards);

/// Test minting to a wallet and burning it all back
async fn test_mint_and_burn(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let amount = parse_ether("1000")?;

    send_tx(token.mintFor(args.address(HOLDER)?, amount)).await?;
    assert_eq_result(args.balance_of(token_address, HOLDER).await?, amount, "minted")?;

    let holder_token = args.token(HOLDER, token_address)?;
    send_tx(holder_token.burn(amount)).await?;
    assert_eq_result(args.balance_of(token_address, HOLDER).await?, U256::ZERO, "burned")?;

    assert_reverts_with(
        holder_token.burn(parse_ether("10000")?),
        "VBTC: burn amount exceeds balance",
    )
    .await
}
integration_test!(test_mint_and_burn);

/// Test the guards on `burnFrom`
async fn test_burn_from_guards(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let holder = args.address(HOLDER)?;

    assert_reverts_with(
        token.burnFrom(Address::ZERO, U256::from(100)),
        "VBTC: burn from the zero address",
    )
    .await?;
    assert_reverts_with(
        token.burnFrom(holder, U256::from(100)),
        "VBTC: burn amount exceeds allowance",
    )
    .await?;

    // An allowance without a balance to back it
    let burn_amount = parse_ether("1000")?;
    let holder_token = args.token(HOLDER, token_address)?;
    send_tx(holder_token.approve(args.address(OWNER)?, burn_amount)).await?;

    assert_reverts_with(
        token.burnFrom(holder, burn_amount),
        "VBTC: burn amount exceeds balance",
    )
    .await
}
integration_test!(test_burn_from_guards);

/// Test burning an approved balance through `burnFrom`
async fn test_burn_from(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let holder = 7;
    let amount = parse_ether("55")?;

    send_tx(token.mintFor(args.address(holder)?, amount)).await?;
    assert_eq_result(args.balance_of(token_address, holder).await?, amount, "minted")?;

    let holder_token = args.token(holder, token_address)?;
    send_tx(holder_token.approve(args.address(OWNER)?, amount)).await?;
    send_tx(token.burnFrom(args.address(holder)?, amount)).await?;

    assert_eq_result(args.balance_of(token_address, holder).await?, U256::ZERO, "burned")
}
integration_test!(test_burn_from);
