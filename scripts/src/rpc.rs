//! The chain collaborators, backed by a JSON-RPC node

use alloy::{
    contract::{CallBuilder, CallDecoder},
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, B256, U256},
    providers::{DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider},
    rpc::types::{TransactionReceipt, TransactionRequest},
};
use async_trait::async_trait;
use tracing::debug;

use crate::{
    artifacts::ArtifactStore,
    chain::{ContractDeployer, ProxyAdmin, ProxyInspector, SlotManager},
    constants::{PROXY_ADMIN_STORAGE_SLOT, PROXY_IMPLEMENTATION_STORAGE_SLOT},
    errors::ScriptError,
    solidity::{IProxyAdmin, ISlotManager},
    types::AdminAbi,
};

/// The provider type used by the scripts
pub type Wallet = DynProvider<Ethereum>;

/// The call builder type used by the scripts
pub type ScriptCallBuilder<'a, C> = CallBuilder<&'a Wallet, C, Ethereum>;

/// A chain client that deploys from local artifacts and signs with a local wallet
#[derive(Clone)]
pub struct RpcChain {
    /// The signing provider
    provider: Wallet,
    /// Where contract artifacts are read from
    artifacts: ArtifactStore,
    /// Which admin ABI to use when repointing proxies
    admin_abi: AdminAbi,
}

impl RpcChain {
    /// Constructor
    pub fn new(provider: Wallet, artifacts: ArtifactStore, admin_abi: AdminAbi) -> Self {
        Self {
            provider,
            artifacts,
            admin_abi,
        }
    }

    /// The artifact store deployments are read from
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Read an address out of one of the proxy's EIP-1967 slots
    async fn read_address_slot(&self, proxy: Address, slot: B256) -> Result<Address, ScriptError> {
        let word = self
            .provider
            .get_storage_at(proxy, U256::from_be_bytes(slot.0))
            .await
            .map_err(|e| ScriptError::from_transport(&e))?;

        Ok(Address::from_word(B256::from(word.to_be_bytes::<32>())))
    }

    /// Repoint a proxy through `upgradeAndCall`, calling the new
    /// implementation with `data`
    pub async fn upgrade_and_call(
        &self,
        admin: Address,
        proxy: Address,
        implementation: Address,
        data: Bytes,
    ) -> Result<(), ScriptError> {
        let proxy_admin = IProxyAdmin::new(admin, self.provider.clone());
        send_tx(proxy_admin.upgradeAndCall(proxy, implementation, data)).await?;
        Ok(())
    }
}

#[async_trait]
impl ContractDeployer for RpcChain {
    async fn deploy(
        &self,
        contract_name: &str,
        constructor_args: &[String],
    ) -> Result<Address, ScriptError> {
        let artifact = self.artifacts.load(contract_name)?;
        let code = artifact.deploy_code(constructor_args)?;
        debug!("deploying {contract_name} ({} bytes of creation code)", code.len());

        let tx = TransactionRequest::default().with_deploy_code(code);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::from_transport(&e))?;
        let receipt = wait_for_receipt(pending).await?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "creation of {contract_name} reverted in tx {:#x}",
                receipt.transaction_hash
            )));
        }

        receipt.contract_address.ok_or_else(|| {
            ScriptError::ContractDeployment(format!(
                "receipt for {contract_name} has no contract address"
            ))
        })
    }
}

#[async_trait]
impl ProxyInspector for RpcChain {
    async fn admin_address(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.read_address_slot(proxy, PROXY_ADMIN_STORAGE_SLOT).await
    }

    async fn implementation_address(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.read_address_slot(proxy, PROXY_IMPLEMENTATION_STORAGE_SLOT)
            .await
    }
}

#[async_trait]
impl ProxyAdmin for RpcChain {
    async fn upgrade(
        &self,
        admin: Address,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ScriptError> {
        let proxy_admin = IProxyAdmin::new(admin, self.provider.clone());
        match self.admin_abi {
            AdminAbi::Legacy => send_tx(proxy_admin.upgrade(proxy, implementation)).await?,
            AdminAbi::V5 => {
                send_tx(proxy_admin.upgradeAndCall(proxy, implementation, Bytes::new())).await?
            }
        };

        Ok(())
    }
}

#[async_trait]
impl SlotManager for RpcChain {
    async fn update_slot_movability(
        &self,
        proxy: Address,
        slot: u64,
        movable: bool,
    ) -> Result<(), ScriptError> {
        let slot_manager = ISlotManager::new(proxy, self.provider.clone());
        send_tx(slot_manager.updateSlotMovability(U256::from(slot), movable)).await?;
        Ok(())
    }

    async fn add_variable_at_slot(
        &self,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError> {
        let slot_manager = ISlotManager::new(proxy, self.provider.clone());
        send_tx(slot_manager.addVaribaleAtSlot(U256::from(slot), U256::from(last_slot))).await?;
        Ok(())
    }

    async fn remove_variable_at_slot(
        &self,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError> {
        let slot_manager = ISlotManager::new(proxy, self.provider.clone());
        send_tx(slot_manager.removeVariableAtSlot(U256::from(slot), U256::from(last_slot)))
            .await?;
        Ok(())
    }
}

// ----------------
// | Transactions |
// ----------------

/// Send a transaction and wait for a successful receipt
pub async fn send_tx<C: CallDecoder>(
    tx: ScriptCallBuilder<'_, C>,
) -> Result<TransactionReceipt, ScriptError> {
    let pending = tx.send().await.map_err(map_contract_error)?;
    let receipt = wait_for_receipt(pending).await?;

    if !receipt.status() {
        return Err(ScriptError::ContractRevert(format!(
            "tx {:#x} reverted",
            receipt.transaction_hash
        )));
    }

    Ok(receipt)
}

/// Wait for a pending transaction to be mined
async fn wait_for_receipt(
    pending: PendingTransactionBuilder<Ethereum>,
) -> Result<TransactionReceipt, ScriptError> {
    pending.get_receipt().await.map_err(|e| match e {
        PendingTransactionError::TransportError(e) => ScriptError::from_transport(&e),
        e => ScriptError::Rpc(e.to_string()),
    })
}

/// Map a contract call error into the script error taxonomy
fn map_contract_error(err: alloy::contract::Error) -> ScriptError {
    match err {
        alloy::contract::Error::TransportError(e) => ScriptError::from_transport(&e),
        e => ScriptError::CalldataConstruction(e.to_string()),
    }
}
