//! Definitions of CLI arguments and commands for deploy scripts

use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use clap::{Args, Parser, Subcommand};

use crate::{
    chain::SourceVerifier,
    commands::{deploy_contract, deploy_proxy, migrate_slots, upgrade, verify},
    config::MigrationConfig,
    confirmation::ConfirmationPolicy,
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_DEPLOYMENTS_PATH, DEFAULT_INITIALIZER,
        DEFAULT_SLOT_MANAGER_NAME, DEFAULT_VERIFICATION_DELAY_MS, PROXY_KEY_SUFFIX,
    },
    errors::ScriptError,
    rpc::Wallet,
    types::{AdminAbi, MigrationOperation},
    utils::{get_chain_id, parse_addr_from_deployments_file},
    verify::{ForgeVerifier, SkipVerifier},
};

/// Deploy, upgrade, verify and migrate upgradeable proxy contracts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PKEY")]
    pub priv_key: String,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = "http://localhost:8545")]
    pub rpc_url: String,

    /// Path to the deployments file
    #[arg(short, long, default_value = DEFAULT_DEPLOYMENTS_PATH)]
    pub deployments_path: PathBuf,

    /// Directory holding compiled contract artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

/// The scripts available
#[derive(Subcommand)]
pub enum Command {
    /// Deploy a contract from its artifact
    DeployContract(DeployContractArgs),
    /// Deploy a contract behind a transparent upgradeable proxy
    DeployProxy(DeployProxyArgs),
    /// Point a proxy at a new implementation
    Upgrade(UpgradeArgs),
    /// Verify a deployed contract's source
    Verify(VerifyContractArgs),
    /// Add or remove a storage variable of a proxy through the slot manager
    MigrateSlots(MigrateSlotsArgs),
}

impl Command {
    /// Run the command against the given client
    pub async fn run(
        self,
        client: Wallet,
        artifacts_dir: &Path,
        deployments_path: &Path,
    ) -> Result<(), ScriptError> {
        match self {
            Command::DeployContract(args) => {
                deploy_contract(args, client, artifacts_dir, deployments_path).await
            }
            Command::DeployProxy(args) => {
                deploy_proxy(args, client, artifacts_dir, deployments_path).await
            }
            Command::Upgrade(args) => upgrade(args, client, artifacts_dir, deployments_path).await,
            Command::Verify(args) => verify(args, client).await,
            Command::MigrateSlots(args) => {
                migrate_slots(args, client, artifacts_dir, deployments_path).await
            }
        }
    }
}

/// Source verification options shared by the scripts that deploy
#[derive(Args, Clone, Debug)]
pub struct VerifyArgs {
    /// Skip source verification
    #[arg(long)]
    pub skip_verify: bool,

    /// Explorer API key used for verification
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    pub etherscan_api_key: Option<String>,

    /// Custom verifier endpoint
    #[arg(long)]
    pub verifier_url: Option<String>,

    /// The Foundry project holding the contract sources
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,
}

impl VerifyArgs {
    /// Build the verifier these options describe
    pub async fn build_verifier(
        &self,
        client: &Wallet,
    ) -> Result<Box<dyn SourceVerifier>, ScriptError> {
        if self.skip_verify {
            return Ok(Box::new(SkipVerifier));
        }

        Ok(Box::new(ForgeVerifier {
            chain_id: get_chain_id(client).await?,
            project_root: self.project_root.clone(),
            etherscan_api_key: self.etherscan_api_key.clone(),
            verifier_url: self.verifier_url.clone(),
        }))
    }
}

/// Deploy a contract from its artifact
#[derive(Args)]
pub struct DeployContractArgs {
    /// The artifact name of the contract
    #[arg(short, long)]
    pub contract: String,

    /// A constructor argument, repeated in declaration order
    #[arg(long = "arg")]
    pub constructor_args: Vec<String>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub verify: VerifyArgs,
}

/// Deploy a contract behind a [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy),
/// which itself deploys a `ProxyAdmin` contract.
///
/// Calls made directly to the `TransparentUpgradeableProxy` contract will be forwarded to the implementation contract.
/// Upgrade calls can only be made to the `TransparentUpgradeableProxy` through the `ProxyAdmin`.
#[derive(Args)]
pub struct DeployProxyArgs {
    /// The artifact name of the implementation contract
    #[arg(short, long)]
    pub contract: String,

    /// Address of the owner of the proxy admin contract
    #[arg(short, long)]
    pub owner: Address,

    /// The initializer called through the proxy on deployment
    #[arg(long, default_value = DEFAULT_INITIALIZER)]
    pub initializer: String,

    /// An initializer argument, repeated in declaration order
    #[arg(long = "init-arg")]
    pub init_args: Vec<String>,

    /// Deploy without calling an initializer
    #[arg(long, conflicts_with_all = ["initializer", "init_args"])]
    pub no_initializer: bool,

    /// How long to wait before verifying the implementation, in milliseconds
    #[arg(long, default_value_t = DEFAULT_VERIFICATION_DELAY_MS)]
    pub verification_delay_ms: u64,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub verify: VerifyArgs,
}

/// Upgrade a proxy's implementation
#[derive(Args)]
pub struct UpgradeArgs {
    /// Address of the proxy contract, read from the deployments file entry
    /// of `--contract` if omitted
    #[arg(long)]
    pub proxy: Option<Address>,

    /// Address of the proxy admin contract, read from the proxy if omitted
    #[arg(long)]
    pub proxy_admin: Option<Address>,

    /// Artifact name of a new implementation to deploy
    #[arg(short, long, required_unless_present = "implementation")]
    pub contract: Option<String>,

    /// Address of an already deployed implementation
    #[arg(short, long, conflicts_with = "contract")]
    pub implementation: Option<Address>,

    /// Optional calldata, in hex form, with which to
    /// call the implementation contract when upgrading
    #[arg(long)]
    pub calldata: Option<String>,

    /// The ABI of the proxy admin
    #[arg(long, value_enum, default_value_t = AdminAbi::default())]
    pub admin_abi: AdminAbi,

    /// Maximum number of implementation-slot polls after repointing
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Time limit on each implementation-slot poll, in milliseconds
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,
}

impl UpgradeArgs {
    /// The confirmation policy for the repoint
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        let mut policy = ConfirmationPolicy::default();
        if let Some(max_polls) = self.max_polls {
            policy.max_attempts = max_polls;
        }
        if let Some(poll_timeout_ms) = self.poll_timeout_ms {
            policy.poll_timeout_ms = poll_timeout_ms;
        }
        policy
    }

    /// The proxy to upgrade, falling back to the `<contract>Proxy` entry of
    /// the deployments file
    pub fn proxy_address(&self, deployments_path: &Path) -> Result<Address, ScriptError> {
        match (self.proxy, &self.contract) {
            (Some(proxy), _) => Ok(proxy),
            (None, Some(name)) => parse_addr_from_deployments_file(
                deployments_path,
                &format!("{name}{PROXY_KEY_SUFFIX}"),
            ),
            (None, None) => Err(ScriptError::Config(
                "--proxy is required when no --contract is given".to_string(),
            )),
        }
    }
}

/// Verify a deployed contract
#[derive(Args)]
pub struct VerifyContractArgs {
    /// The artifact name of the contract
    #[arg(short, long)]
    pub contract: String,

    /// The address of the deployed contract
    #[arg(long)]
    pub address: Address,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub verify: VerifyArgs,
}

/// Add or remove a storage variable of a proxy.
///
/// Values given as flags override those read from `--config`.
#[derive(Args)]
pub struct MigrateSlotsArgs {
    /// A JSON migration config
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address of the proxy whose storage is migrated
    #[arg(long)]
    pub proxy: Option<Address>,

    /// Artifact name of the final implementation
    #[arg(long)]
    pub target: Option<String>,

    /// Artifact name of the slot manager implementation
    #[arg(long)]
    pub slot_manager: Option<String>,

    /// The operation to apply
    #[arg(long, value_enum)]
    pub operation: Option<MigrationOperation>,

    /// The slot being added or removed
    #[arg(long)]
    pub slot: Option<u64>,

    /// The last occupied slot of the current layout
    #[arg(long)]
    pub last_slot: Option<u64>,

    /// Slots that must not move, comma separated
    #[arg(long, value_delimiter = ',')]
    pub unmovable: Vec<u64>,

    /// The ABI of the proxy admin
    #[arg(long, value_enum)]
    pub admin_abi: Option<AdminAbi>,

    /// Maximum number of implementation-slot polls after each repoint
    #[arg(long)]
    pub max_polls: Option<u32>,

    /// Time limit on each implementation-slot poll, in milliseconds
    #[arg(long)]
    pub poll_timeout_ms: Option<u64>,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub verify: VerifyArgs,
}

impl MigrateSlotsArgs {
    /// Build the migration config from the config file and flags
    pub fn to_config(&self) -> Result<MigrationConfig, ScriptError> {
        let mut config = match &self.config {
            Some(path) => MigrationConfig::from_file(path)?,
            None => MigrationConfig {
                proxy_address: self.proxy.ok_or_else(|| missing_flag("proxy"))?,
                target_contract_name: self.target.clone().ok_or_else(|| missing_flag("target"))?,
                slot_manager_contract_name: DEFAULT_SLOT_MANAGER_NAME.to_string(),
                operation: self.operation.ok_or_else(|| missing_flag("operation"))?.into(),
                slot_number: self.slot.ok_or_else(|| missing_flag("slot"))?,
                last_slot_number: self.last_slot.ok_or_else(|| missing_flag("last-slot"))?,
                unmovable_slots: Vec::new(),
                admin_abi: AdminAbi::default(),
                confirmation: ConfirmationPolicy::default(),
            },
        };

        if let Some(proxy) = self.proxy {
            config.proxy_address = proxy;
        }
        if let Some(target) = &self.target {
            config.target_contract_name = target.clone();
        }
        if let Some(slot_manager) = &self.slot_manager {
            config.slot_manager_contract_name = slot_manager.clone();
        }
        if let Some(operation) = self.operation {
            config.operation = operation.into();
        }
        if let Some(slot) = self.slot {
            config.slot_number = slot;
        }
        if let Some(last_slot) = self.last_slot {
            config.last_slot_number = last_slot;
        }
        if !self.unmovable.is_empty() {
            config.unmovable_slots = self.unmovable.clone();
        }
        if let Some(admin_abi) = self.admin_abi {
            config.admin_abi = admin_abi;
        }
        if let Some(max_polls) = self.max_polls {
            config.confirmation.max_attempts = max_polls;
        }
        if let Some(poll_timeout_ms) = self.poll_timeout_ms {
            config.confirmation.poll_timeout_ms = poll_timeout_ms;
        }

        Ok(config)
    }
}

/// The error for a flag required in the absence of a config file
fn missing_flag(flag: &str) -> ScriptError {
    ScriptError::Config(format!("--{flag} is required when no --config is given"))
}
