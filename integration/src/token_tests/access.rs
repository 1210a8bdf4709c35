//! Tests of owner-only administration

use alloy::primitives::{Address, U256};
use eyre::Result;
use scripts::rpc::send_tx;

use crate::{
    integration_test,
    test_args::{TestArgs, OUTSIDER, OWNER},
    token_tests::{assert_eq_result, assert_reverts_with, NOT_OWNER},
};

/// Test that every administrative function rejects a caller other than the owner
async fn test_owner_only_functions(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OUTSIDER, token_address)?;
    let outsider = args.address(OUTSIDER)?;

    assert_reverts_with(token.updateDexAddress(Address::ZERO, true), NOT_OWNER).await?;
    assert_reverts_with(token.updateTaxExcemptAddress(Address::ZERO, true), NOT_OWNER).await?;
    assert_reverts_with(token.updateTaxCollector(Address::ZERO), NOT_OWNER).await?;
    assert_reverts_with(token.manageBlacklist(vec![], vec![]), NOT_OWNER).await?;
    assert_reverts_with(token.mintFor(outsider, U256::from(100)), NOT_OWNER).await?;
    assert_reverts_with(token.pauseTrading(true), NOT_OWNER).await?;
    assert_reverts_with(token.updateManagementAddress(Address::ZERO), NOT_OWNER).await?;
    assert_reverts_with(token.withdrawBnb(), NOT_OWNER).await?;

    Ok(())
}
integration_test!(test_owner_only_functions);

/// Test handing ownership to another account
async fn test_transfer_ownership(args: TestArgs) -> Result<()> {
    let token_address = args.deploy_token().await?;
    let token = args.token(OWNER, token_address)?;
    let new_owner = args.address(15)?;

    send_tx(token.transferOwnership(new_owner)).await?;

    let owner = token.owner().call().await?;
    assert_eq_result(owner, new_owner, "owner")?;

    // The previous owner has lost its privileges
    assert_reverts_with(token.pauseTrading(true), NOT_OWNER).await
}
integration_test!(test_transfer_ownership);
