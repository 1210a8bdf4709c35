//! Bindings for the VBTC token under test

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface VBTC {
        function initialize(address management, address taxCollector, address preMint, uint256 preMintAmount) external;

        function owner() external view returns (address);
        function transferOwnership(address newOwner) external;

        function MAX_SUPPLY() external view returns (uint256);
        function devFundTax() external view returns (uint256);
        function taxOnSell() external view returns (uint256);

        function balanceOf(address account) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);

        function mintFor(address account, uint256 amount) external;
        function burn(uint256 amount) external;
        function burnFrom(address account, uint256 amount) external;

        function updateDexAddress(address dex, bool isDex) external;
        function updateTaxExcemptAddress(address account, bool exempt) external;
        function updateTaxCollector(address taxCollector) external;
        function updateManagementAddress(address management) external;
        function manageBlacklist(address[] accounts, bool[] blacklisted) external;
        function pauseTrading(bool paused) external;
        function withdrawBnb() external;
    }
}
