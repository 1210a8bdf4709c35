//! An in-memory chain and verifier for exercising the migration flow

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::primitives::Address;
use async_trait::async_trait;
use scripts::{
    chain::{ContractDeployer, ProxyAdmin, ProxyInspector, SlotManager, SourceVerifier},
    config::MigrationConfig,
    confirmation::{ConfirmationPolicy, Sleeper},
    constants::DEFAULT_SLOT_MANAGER_NAME,
    errors::ScriptError,
    types::{AdminAbi, MigrationOperation, RequestedOperation, VerificationOutcome},
};

/// The proxy under migration
pub const PROXY: Address = Address::repeat_byte(0xa1);
/// The proxy's admin contract
pub const ADMIN: Address = Address::repeat_byte(0xad);
/// The implementation the proxy starts out on
pub const ORIGINAL_IMPLEMENTATION: Address = Address::repeat_byte(0x01);
/// The artifact name of the final implementation
pub const TARGET_NAME: &str = "Proxy";

/// A call made against the mock chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainCall {
    /// A contract creation
    Deploy(String),
    /// A read of the admin slot
    ReadAdmin(Address),
    /// A read of the implementation slot
    ReadImplementation(Address),
    /// A repoint through the admin
    Upgrade {
        admin: Address,
        proxy: Address,
        implementation: Address,
    },
    /// A movability update through the slot manager
    UpdateSlotMovability {
        proxy: Address,
        slot: u64,
        movable: bool,
    },
    /// A variable insertion through the slot manager
    AddVariable {
        proxy: Address,
        slot: u64,
        last_slot: u64,
    },
    /// A variable removal through the slot manager
    RemoveVariable {
        proxy: Address,
        slot: u64,
        last_slot: u64,
    },
}

/// Mutable chain state
#[derive(Default)]
struct ChainState {
    /// Every call in the order it was made
    calls: Vec<ChainCall>,
    /// Contract names by deployed address
    deployed: HashMap<Address, String>,
    /// The value of the proxy's implementation slot
    implementation: Address,
    /// A repoint not yet visible to reads, with the number of stale reads left
    pending: Option<(Address, u32)>,
    /// Transport failures still to be returned by implementation reads
    transient_errors_left: u32,
}

/// A single-proxy chain that records every call made against it
#[derive(Clone)]
pub struct MockChain {
    /// Shared chain state
    state: Arc<Mutex<ChainState>>,
    /// Stale implementation reads served after each repoint
    pub stale_polls: u32,
    /// Repoints are accepted but never become visible
    pub never_confirm: bool,
    /// Repoints revert
    pub revert_upgrades: bool,
    /// Implementation reads never resolve
    pub stall_reads: bool,
    /// The name of a contract whose creation fails
    pub failing_deploy: Option<String>,
}

impl MockChain {
    /// A chain holding [`PROXY`], pointed at [`ORIGINAL_IMPLEMENTATION`]
    pub fn new() -> Self {
        let state = ChainState {
            implementation: ORIGINAL_IMPLEMENTATION,
            ..Default::default()
        };

        Self {
            state: Arc::new(Mutex::new(state)),
            stale_polls: 0,
            never_confirm: false,
            revert_upgrades: false,
            stall_reads: false,
            failing_deploy: None,
        }
    }

    /// Fail the next `n` implementation reads with a transport error
    pub fn with_transient_errors(self, n: u32) -> Self {
        self.state.lock().unwrap().transient_errors_left = n;
        self
    }

    /// Every call made so far
    pub fn calls(&self) -> Vec<ChainCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Every call made so far, without slot reads
    pub fn writes(&self) -> Vec<ChainCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(call, ChainCall::ReadAdmin(_) | ChainCall::ReadImplementation(_))
            })
            .collect()
    }

    /// The address a contract was deployed at
    pub fn deployed_address(&self, name: &str) -> Option<Address> {
        let state = self.state.lock().unwrap();
        state
            .deployed
            .iter()
            .find(|(_, deployed)| deployed.as_str() == name)
            .map(|(address, _)| *address)
    }

    /// The proxy's implementation once all pending repoints land
    pub fn settled_implementation(&self) -> Address {
        let state = self.state.lock().unwrap();
        if self.never_confirm {
            return state.implementation;
        }
        state.pending.map(|(implementation, _)| implementation).unwrap_or(state.implementation)
    }

    /// Record a call
    fn record(&self, call: ChainCall) {
        self.state.lock().unwrap().calls.push(call);
    }

    /// Check the proxy is running the slot manager before a slot mutation
    fn require_slot_manager(&self) -> Result<(), ScriptError> {
        let state = self.state.lock().unwrap();
        match state.deployed.get(&state.implementation) {
            Some(name) if name == DEFAULT_SLOT_MANAGER_NAME => Ok(()),
            _ => Err(ScriptError::ContractRevert(
                "function selector was not recognized".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ContractDeployer for MockChain {
    async fn deploy(
        &self,
        contract_name: &str,
        _constructor_args: &[String],
    ) -> Result<Address, ScriptError> {
        self.record(ChainCall::Deploy(contract_name.to_string()));
        if self.failing_deploy.as_deref() == Some(contract_name) {
            return Err(ScriptError::ContractDeployment(format!(
                "creation of {contract_name} reverted"
            )));
        }

        let mut state = self.state.lock().unwrap();
        let address = Address::with_last_byte(0x10 + state.deployed.len() as u8);
        state.deployed.insert(address, contract_name.to_string());
        Ok(address)
    }
}

#[async_trait]
impl ProxyInspector for MockChain {
    async fn admin_address(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.record(ChainCall::ReadAdmin(proxy));
        Ok(ADMIN)
    }

    async fn implementation_address(&self, proxy: Address) -> Result<Address, ScriptError> {
        self.record(ChainCall::ReadImplementation(proxy));
        if self.stall_reads {
            return std::future::pending().await;
        }

        let mut state = self.state.lock().unwrap();
        if state.transient_errors_left > 0 {
            state.transient_errors_left -= 1;
            return Err(ScriptError::Rpc("connection reset by peer".to_string()));
        }

        let pending = state.pending;
        match pending {
            Some((implementation, 0)) if !self.never_confirm => {
                state.implementation = implementation;
                state.pending = None;
            }
            Some((implementation, stale)) if !self.never_confirm => {
                state.pending = Some((implementation, stale - 1));
            }
            _ => {}
        }

        Ok(state.implementation)
    }
}

#[async_trait]
impl ProxyAdmin for MockChain {
    async fn upgrade(
        &self,
        admin: Address,
        proxy: Address,
        implementation: Address,
    ) -> Result<(), ScriptError> {
        self.record(ChainCall::Upgrade {
            admin,
            proxy,
            implementation,
        });
        if self.revert_upgrades || admin != ADMIN {
            return Err(ScriptError::ContractRevert(
                "Ownable: caller is not the owner".to_string(),
            ));
        }

        let mut state = self.state.lock().unwrap();
        if self.stale_polls == 0 && !self.never_confirm {
            state.implementation = implementation;
            state.pending = None;
        } else {
            state.pending = Some((implementation, self.stale_polls));
        }

        Ok(())
    }
}

#[async_trait]
impl SlotManager for MockChain {
    async fn update_slot_movability(
        &self,
        proxy: Address,
        slot: u64,
        movable: bool,
    ) -> Result<(), ScriptError> {
        self.record(ChainCall::UpdateSlotMovability {
            proxy,
            slot,
            movable,
        });
        self.require_slot_manager()
    }

    async fn add_variable_at_slot(
        &self,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError> {
        self.record(ChainCall::AddVariable {
            proxy,
            slot,
            last_slot,
        });
        self.require_slot_manager()
    }

    async fn remove_variable_at_slot(
        &self,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError> {
        self.record(ChainCall::RemoveVariable {
            proxy,
            slot,
            last_slot,
        });
        self.require_slot_manager()
    }
}

/// A verifier returning a canned response
pub struct MockVerifier {
    /// The response to every verification request
    response: Result<VerificationOutcome, String>,
    /// Every verification request made
    requests: Mutex<Vec<(String, Address)>>,
}

impl MockVerifier {
    /// A verifier that reports the given outcome
    pub fn returning(outcome: VerificationOutcome) -> Self {
        Self {
            response: Ok(outcome),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A verifier that fails with the given reason
    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every verification request made
    pub fn requests(&self) -> Vec<(String, Address)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceVerifier for MockVerifier {
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
    ) -> Result<VerificationOutcome, ScriptError> {
        self.requests
            .lock()
            .unwrap()
            .push((contract_name.to_string(), address));
        self.response.clone().map_err(ScriptError::Verification)
    }
}

/// A sleeper that returns immediately, recording each requested delay
#[derive(Default)]
pub struct RecordingSleeper {
    /// The delays requested so far
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// The delays requested so far
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

/// A migration of [`PROXY`] to [`TARGET_NAME`]
pub fn migration_config(operation: MigrationOperation, slot: u64, last_slot: u64) -> MigrationConfig {
    MigrationConfig {
        proxy_address: PROXY,
        target_contract_name: TARGET_NAME.to_string(),
        slot_manager_contract_name: DEFAULT_SLOT_MANAGER_NAME.to_string(),
        operation: RequestedOperation::Supported(operation),
        slot_number: slot,
        last_slot_number: last_slot,
        unmovable_slots: Vec::new(),
        admin_abi: AdminAbi::Legacy,
        confirmation: ConfirmationPolicy {
            max_attempts: 5,
            initial_delay_ms: 10,
            max_delay_ms: 40,
            backoff_factor: 2,
            poll_timeout_ms: 50,
        },
    }
}
