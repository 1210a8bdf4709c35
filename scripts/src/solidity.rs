//! Definitions of Solidity functions called during deployment and migration

use alloy::sol;

sol! {
    /// The proxy admin surface; OpenZeppelin v4 admins expose `upgrade`,
    /// v5 admins only expose `upgradeAndCall`
    #[sol(rpc)]
    interface IProxyAdmin {
        function upgrade(address proxy, address implementation) external;
        function upgradeAndCall(address proxy, address implementation, bytes memory data) external payable;
    }

    /// The mutation surface of the intermediate slot manager implementation.
    ///
    /// `addVaribaleAtSlot` is spelled as deployed.
    #[sol(rpc)]
    interface ISlotManager {
        function updateSlotMovability(uint256 slot, bool movable) external;
        function addVaribaleAtSlot(uint256 slot, uint256 lastSlot) external;
        function removeVariableAtSlot(uint256 slot, uint256 lastSlot) external;
    }
}
