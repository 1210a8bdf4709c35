//! The on-chain collaborators the scripts drive.
//!
//! Each trait covers one concern of a migration or deployment so that the
//! orchestration logic can run against a live node or an in-memory chain.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{errors::ScriptError, types::VerificationOutcome};

/// Creates new contract instances from compiled artifacts
#[async_trait]
pub trait ContractDeployer: Send + Sync {
    /// Deploy the named contract with the given constructor arguments,
    /// returning its address once the creation transaction is mined
    async fn deploy(
        &self,
        contract_name: &str,
        constructor_args: &[String],
    ) -> Result<Address, ScriptError>;
}

/// Read-only introspection of an EIP-1967 proxy
#[async_trait]
pub trait ProxyInspector: Send + Sync {
    /// The address stored in the proxy's admin slot
    async fn admin_address(&self, proxy: Address) -> Result<Address, ScriptError>;

    /// The address stored in the proxy's implementation slot
    async fn implementation_address(&self, proxy: Address) -> Result<Address, ScriptError>;
}

/// Repoints a proxy through its admin contract
#[async_trait]
pub trait ProxyAdmin: Send + Sync {
    /// Point `proxy` at `implementation`; reverts if the caller does not own `admin`
    async fn upgrade(
        &self,
        admin: Address,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ScriptError>;
}

/// The mutation surface of a proxy while it runs the slot manager implementation
#[async_trait]
pub trait SlotManager: Send + Sync {
    /// Mark a slot as (un)movable
    async fn update_slot_movability(
        &self,
        proxy: Address,
        slot: u64,
        movable: bool,
    ) -> Result<(), ScriptError>;

    /// Insert a variable at `slot`, where `last_slot` is the last occupied slot
    async fn add_variable_at_slot(
        &self,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError>;

    /// Remove the variable at `slot`, where `last_slot` is the last occupied slot
    async fn remove_variable_at_slot(
        &self,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError>;
}

/// Everything a slot migration needs from the chain
pub trait ChainClient: ContractDeployer + ProxyInspector + ProxyAdmin + SlotManager {}

impl<T: ContractDeployer + ProxyInspector + ProxyAdmin + SlotManager> ChainClient for T {}

/// A source verification service
#[async_trait]
pub trait SourceVerifier: Send + Sync {
    /// Verify the source of the named contract deployed at `address`.
    ///
    /// An explorer reporting the source as already verified is a success.
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
    ) -> Result<VerificationOutcome, ScriptError>;
}
