//! Constants used in the deploy scripts

use alloy::primitives::{b256, B256};

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// The storage slot containing the implementation contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#logic-contract-address
pub const PROXY_IMPLEMENTATION_STORAGE_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// The name of the OpenZeppelin v5 transparent proxy artifact
pub const PROXY_CONTRACT_NAME: &str = "TransparentUpgradeableProxy";

/// The name of the slot manager artifact used as the intermediate
/// implementation during a slot migration
pub const DEFAULT_SLOT_MANAGER_NAME: &str = "SlotManager";

/// The name of the initializer invoked when deploying a proxy
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// The default directory holding compiled contract artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "out";

/// The default path of the deployments file
pub const DEFAULT_DEPLOYMENTS_PATH: &str = "deployments.json";

/// The extension of a JSON artifact
pub const JSON_EXTENSION: &str = "json";

/// The extension of a Solidity source file, used in Foundry's output layout
pub const SOL_EXTENSION: &str = "sol";

/// The deployments key in the `deployments.json` file
pub const DEPLOYMENTS_KEY: &str = "deployments";

/// The suffix of a proxy contract key in the `deployments.json` file
pub const PROXY_KEY_SUFFIX: &str = "Proxy";

/// The suffix of a proxy admin contract key in the `deployments.json` file
pub const PROXY_ADMIN_KEY_SUFFIX: &str = "ProxyAdmin";

/// The suffix of an implementation contract key in the `deployments.json` file
pub const IMPLEMENTATION_KEY_SUFFIX: &str = "Implementation";

/// How long to wait after a proxy deployment before verifying its
/// implementation, giving the explorer time to index the bytecode
pub const DEFAULT_VERIFICATION_DELAY_MS: u64 = 10_000;

/// The default maximum number of implementation-slot polls
pub const DEFAULT_CONFIRMATION_ATTEMPTS: u32 = 30;

/// The default delay before the second implementation-slot poll
pub const DEFAULT_CONFIRMATION_INITIAL_DELAY_MS: u64 = 500;

/// The cap on the delay between implementation-slot polls
pub const DEFAULT_CONFIRMATION_MAX_DELAY_MS: u64 = 8_000;

/// The multiplier applied to the poll delay after each unconfirmed poll
pub const DEFAULT_CONFIRMATION_BACKOFF_FACTOR: u32 = 2;

/// How long a single implementation-slot read may take before the poll is
/// counted as unconfirmed
pub const DEFAULT_CONFIRMATION_POLL_TIMEOUT_MS: u64 = 10_000;

/// The name of the Forge command
pub const FORGE_COMMAND: &str = "forge";

/// The Forge subcommand used for source verification
pub const VERIFY_CONTRACT_COMMAND: &str = "verify-contract";

/// The marker in verifier output indicating nothing is left to do
pub const ALREADY_VERIFIED_MARKER: &str = "already verified";
