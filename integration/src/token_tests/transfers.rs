//! Tests of transfers, trading restrictions and taxes

use alloy::primitives::{utils::parse_ether, Address, U256};
use eyre::Result;
use scripts::rpc::send_tx;

use crate::{
    integration_test,
    test_args::{TestArgs, MANAGEMENT, OWNER, PRE_MINT, TAX_COLLECTOR},
    token_tests::{assert_eq_result, assert_reverts_with},
};

/// The revert reason for transfers to an invalid address
const INVALID_TO: &str = "VBTC: to address is not valid";

/// A trader with no role
const WALLET: usize = 9;
/// The account registered as a DEX pair
const DEX: usize = 13;

/// Test the guards on `transfer`
async fn test_transfer_guards(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;

    assert_reverts_with(token.transfer(Address::ZERO, U256::from(1000)), INVALID_TO).await?;
    assert_reverts_with(
        token.transfer(args.address(5)?, U256::from(1000)),
        "VBTC: insufficient balance",
    )
    .await
}
integration_test!(test_transfer_guards);

/// Test that a blacklisted wallet can neither send nor receive
async fn test_blacklist(args: TestArgs) -> Result<()> {
    let reason = "VBTC: cannot transfer to/from blacklisted account";
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let blacklisted = args.address(WALLET)?;

    send_tx(token.manageBlacklist(vec![blacklisted], vec![true])).await?;

    let blacklisted_token = args.token(WALLET, token_address)?;
    assert_reverts_with(
        blacklisted_token.transfer(args.address(PRE_MINT)?, U256::from(1000)),
        reason,
    )
    .await?;
    assert_reverts_with(token.transfer(blacklisted, U256::from(1000)), reason).await?;

    // Lifting the blacklist restores transfers
    send_tx(token.manageBlacklist(vec![blacklisted], vec![false])).await?;
    let amount = parse_ether("1")?;
    send_tx(token.mintFor(blacklisted, amount)).await?;
    send_tx(blacklisted_token.transfer(args.address(PRE_MINT)?, amount)).await?;

    Ok(())
}
integration_test!(test_blacklist);

/// Test a plain wallet-to-wallet transfer
async fn test_transfer(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let receiver = 10;
    let amount = parse_ether("100")?;

    send_tx(token.mintFor(args.address(WALLET)?, amount)).await?;
    let wallet_token = args.token(WALLET, token_address)?;
    send_tx(wallet_token.transfer(args.address(receiver)?, amount)).await?;

    assert_eq_result(args.balance_of(token_address, WALLET).await?, U256::ZERO, "sender")?;
    assert_eq_result(args.balance_of(token_address, receiver).await?, amount, "receiver")
}
integration_test!(test_transfer);

/// Test that transfers to a DEX are rejected while trading is paused
async fn test_paused_dex_transfer(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let dex = args.address(DEX)?;
    let amount = parse_ether("100")?;

    send_tx(token.updateDexAddress(dex, true)).await?;
    send_tx(token.mintFor(args.address(WALLET)?, amount)).await?;

    let wallet_token = args.token(WALLET, token_address)?;
    assert_reverts_with(
        wallet_token.transfer(dex, amount),
        "VBTC: only liq transfer allowed",
    )
    .await
}
integration_test!(test_paused_dex_transfer);

/// Test the tax split on a sale to a DEX
async fn test_sell_tax(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let dex = args.address(DEX)?;
    let amount = parse_ether("100")?;

    let dev_fund_tax = token.devFundTax().call().await?;
    let sell_tax = token.taxOnSell().call().await?;

    send_tx(token.pauseTrading(false)).await?;
    send_tx(token.updateDexAddress(dex, true)).await?;
    send_tx(token.mintFor(args.address(WALLET)?, amount)).await?;

    let wallet_token = args.token(WALLET, token_address)?;
    send_tx(wallet_token.transfer(dex, amount)).await?;

    let hundred = U256::from(100);
    let dev_fund_amount = amount * dev_fund_tax / hundred;
    let sell_tax_amount = amount * sell_tax / hundred;

    assert_eq_result(
        args.balance_of(token_address, MANAGEMENT).await?,
        dev_fund_amount,
        "management",
    )?;
    assert_eq_result(
        args.balance_of(token_address, TAX_COLLECTOR).await?,
        sell_tax_amount,
        "tax collector",
    )?;
    assert_eq_result(
        args.balance_of_address(token_address, dex).await?,
        amount - dev_fund_amount - sell_tax_amount,
        "dex",
    )
}
integration_test!(test_sell_tax);

/// Test the guards on `transferFrom`
async fn test_transfer_from_guards(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;

    assert_reverts_with(
        token.transferFrom(args.address(PRE_MINT)?, args.address(MANAGEMENT)?, U256::from(100)),
        "VBTC: insufficient allowance",
    )
    .await?;

    let owner = 5;
    let spender = PRE_MINT;
    let owner_token = args.token(owner, token_address)?;
    send_tx(owner_token.approve(args.address(spender)?, U256::from(100))).await?;

    let spender_token = args.token(spender, token_address)?;
    assert_reverts_with(
        spender_token.transferFrom(args.address(owner)?, Address::ZERO, U256::from(100)),
        INVALID_TO,
    )
    .await
}
integration_test!(test_transfer_from_guards);
