//! Behavioral tests for the VBTC token

use alloy::contract::{CallBuilder, CallDecoder};
use eyre::{eyre, Result};
use scripts::{
    errors::ScriptError,
    rpc::{send_tx, Wallet},
};

mod access;
mod supply;
mod transfers;

/// The revert reason of `onlyOwner` functions
pub(crate) const NOT_OWNER: &str = "Ownable: caller is not the owner";

/// Send a transaction and check that it reverts with the given reason
pub(crate) async fn assert_reverts_with<C: CallDecoder>(
    call: CallBuilder<&Wallet, C>,
    reason: &str,
) -> Result<()> {
    match send_tx(call).await {
        Ok(receipt) => Err(eyre!(
            "tx {:#x} succeeded, expected revert `{reason}`",
            receipt.transaction_hash
        )),
        Err(ScriptError::ContractRevert(msg)) if msg.contains(reason) => Ok(()),
        Err(e) => Err(eyre!("expected revert `{reason}`, got: {e}")),
    }
}

/// Check two values are equal, failing the test otherwise
pub(crate) fn assert_eq_result<T: PartialEq + std::fmt::Debug>(
    actual: T,
    expected: T,
    what: &str,
) -> Result<()> {
    if actual != expected {
        return Err(eyre!("{what}: expected {expected:?}, got {actual:?}"));
    }

    Ok(())
}
