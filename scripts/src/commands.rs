//! Implementations of the various deploy scripts

use std::{path::Path, str::FromStr, time::Duration};

use alloy::primitives::{Address, Bytes};
use tracing::{error, info};

use crate::{
    artifacts::ArtifactStore,
    chain::{ContractDeployer, ProxyAdmin, ProxyInspector},
    cli::{DeployContractArgs, DeployProxyArgs, MigrateSlotsArgs, UpgradeArgs, VerifyContractArgs},
    confirmation::{wait_for_implementation, TokioSleeper},
    constants::{
        IMPLEMENTATION_KEY_SUFFIX, PROXY_ADMIN_KEY_SUFFIX, PROXY_CONTRACT_NAME, PROXY_KEY_SUFFIX,
    },
    errors::{MigrationStep, ScriptError},
    migration::SlotMigration,
    rpc::{RpcChain, Wallet},
    types::AdminAbi,
    utils::write_deployed_address,
};

/// Deploy a contract and record its address under its artifact name
pub async fn deploy_contract(
    args: DeployContractArgs,
    client: Wallet,
    artifacts_dir: &Path,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let verifier = args.verify.build_verifier(&client).await?;
    let chain = RpcChain::new(client, ArtifactStore::new(artifacts_dir), AdminAbi::default());

    let address = chain.deploy(&args.contract, &args.constructor_args).await?;
    info!("{} deployed at {address:#x}", args.contract);
    write_deployed_address(deployments_path, &args.contract, address)?;

    let outcome = verifier.verify(&args.contract, address).await?;
    info!("{} verification: {outcome}", args.contract);

    Ok(())
}

/// Deploy an implementation and a transparent proxy in front of it
pub async fn deploy_proxy(
    args: DeployProxyArgs,
    client: Wallet,
    artifacts_dir: &Path,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let verifier = args.verify.build_verifier(&client).await?;
    let chain = RpcChain::new(client, ArtifactStore::new(artifacts_dir), AdminAbi::V5);

    let implementation = chain.deploy(&args.contract, &[]).await?;
    info!("{} implementation deployed at {implementation:#x}", args.contract);

    let init_calldata = if args.no_initializer {
        Bytes::new()
    } else {
        chain
            .artifacts()
            .load(&args.contract)?
            .encode_call(&args.initializer, &args.init_args)?
    };

    // The proxy deploys its own admin, owned by `owner`
    let proxy_args = [
        format!("{implementation:#x}"),
        format!("{:#x}", args.owner),
        init_calldata.to_string(),
    ];
    let proxy = chain.deploy(PROXY_CONTRACT_NAME, &proxy_args).await?;

    // This is the recommended way to get the proxy admin address:
    // https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
    let admin = chain.admin_address(proxy).await?;
    let proxied_implementation = chain.implementation_address(proxy).await?;
    if proxied_implementation != implementation {
        return Err(ScriptError::ContractDeployment(format!(
            "proxy {proxy:#x} points at {proxied_implementation:#x}, expected {implementation:#x}"
        )));
    }

    info!("{} proxy deployed at {proxy:#x}", args.contract);
    info!("{} proxy admin deployed at {admin:#x}", args.contract);

    let name = &args.contract;
    write_deployed_address(deployments_path, &format!("{name}{PROXY_KEY_SUFFIX}"), proxy)?;
    write_deployed_address(deployments_path, &format!("{name}{PROXY_ADMIN_KEY_SUFFIX}"), admin)?;
    write_deployed_address(
        deployments_path,
        &format!("{name}{IMPLEMENTATION_KEY_SUFFIX}"),
        implementation,
    )?;

    // Give the explorer time to index the new contract
    if !args.verify.skip_verify {
        tokio::time::sleep(Duration::from_millis(args.verification_delay_ms)).await;
    }
    let outcome = verifier.verify(name, implementation).await?;
    info!("{name} implementation verification: {outcome}");

    Ok(())
}

/// Point a proxy at a new implementation and wait until the slot reflects it
pub async fn upgrade(
    args: UpgradeArgs,
    client: Wallet,
    artifacts_dir: &Path,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let policy = args.confirmation_policy();
    policy.validate()?;
    let proxy = args.proxy_address(deployments_path)?;
    let chain = RpcChain::new(client, ArtifactStore::new(artifacts_dir), args.admin_abi);

    let implementation = match (args.implementation, &args.contract) {
        (Some(address), _) => address,
        (None, Some(name)) => {
            let address = chain.deploy(name, &[]).await?;
            info!("{name} implementation deployed at {address:#x}");
            address
        }
        (None, None) => {
            return Err(ScriptError::Config(
                "one of --implementation or --contract is required".to_string(),
            ))
        }
    };

    let admin = match args.proxy_admin {
        Some(admin) => admin,
        None => chain.admin_address(proxy).await?,
    };

    match &args.calldata {
        Some(calldata) => {
            let data = Bytes::from_str(calldata)
                .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
            chain.upgrade_and_call(admin, proxy, implementation, data).await?
        }
        None => chain.upgrade(admin, proxy, implementation).await?,
    }

    let confirmation =
        wait_for_implementation(&chain, &TokioSleeper, &policy, proxy, implementation).await?;
    info!(
        "proxy {proxy:#x} upgraded to {implementation:#x} after {} polls",
        confirmation.polls
    );

    if let Some(name) = &args.contract {
        write_deployed_address(
            deployments_path,
            &format!("{name}{IMPLEMENTATION_KEY_SUFFIX}"),
            implementation,
        )?;
    }

    Ok(())
}

/// Verify the source of a deployed contract
pub async fn verify(args: VerifyContractArgs, client: Wallet) -> Result<(), ScriptError> {
    let verifier = args.verify.build_verifier(&client).await?;
    let outcome = verifier.verify(&args.contract, args.address).await?;
    info!("{} at {:#x}: {outcome}", args.contract, args.address);

    Ok(())
}

/// Add or remove a storage variable of a proxy by way of the slot manager
pub async fn migrate_slots(
    args: MigrateSlotsArgs,
    client: Wallet,
    artifacts_dir: &Path,
    deployments_path: &Path,
) -> Result<(), ScriptError> {
    let config = args.to_config()?;
    let verifier = args.verify.build_verifier(&client).await?;
    let chain = RpcChain::new(client, ArtifactStore::new(artifacts_dir), config.admin_abi);

    let migration = SlotMigration::new(&chain, verifier.as_ref(), &TokioSleeper);
    let report = match migration.run(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("{e}");
            // A failed verification leaves the upgrade in place
            if e.step == MigrationStep::VerifyTarget {
                if let Some(target) = e.last_known_implementation {
                    record_implementation(deployments_path, &config.target_contract_name, target)?;
                }
            }
            return Err(e.into());
        }
    };

    info!(
        "proxy {:#x} migrated ({}) to {:#x} through slot manager {:#x}; verification: {}",
        report.proxy, report.operation, report.target, report.slot_manager, report.verification
    );

    write_deployed_address(
        deployments_path,
        &config.slot_manager_contract_name,
        report.slot_manager,
    )?;
    record_implementation(deployments_path, &config.target_contract_name, report.target)
}

/// Record an implementation address under `<name>Implementation`
fn record_implementation(
    deployments_path: &Path,
    contract_name: &str,
    implementation: Address,
) -> Result<(), ScriptError> {
    write_deployed_address(
        deployments_path,
        &format!("{contract_name}{IMPLEMENTATION_KEY_SUFFIX}"),
        implementation,
    )
}
