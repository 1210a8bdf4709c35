//! Two-hop proxy upgrade that adds or removes a storage variable.
//!
//! The proxy is first pointed at the slot manager implementation, which
//! rewrites the proxy's storage layout in place, and then at the target
//! implementation whose layout matches the rewritten storage.

use alloy::primitives::Address;
use itertools::Itertools;
use tracing::{info, warn};

use crate::{
    chain::{ChainClient, SourceVerifier},
    config::MigrationConfig,
    confirmation::{wait_for_implementation, Sleeper},
    errors::{MigrationError, MigrationStep, ScriptError},
    types::{MigrationOperation, VerificationOutcome},
};

/// The outcome of a completed slot migration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationReport {
    /// The proxy that was migrated
    pub proxy: Address,
    /// The proxy's admin contract
    pub admin: Address,
    /// The intermediate slot manager implementation
    pub slot_manager: Address,
    /// The final implementation the proxy now points at
    pub target: Address,
    /// The operation that was applied
    pub operation: MigrationOperation,
    /// Polls needed to observe the slot manager in the implementation slot
    pub slot_manager_polls: u32,
    /// Polls needed to observe the target in the implementation slot
    pub target_polls: u32,
    /// The result of verifying the target's source
    pub verification: VerificationOutcome,
}

/// Runs storage-slot migrations against a chain
pub struct SlotMigration<'a> {
    /// The chain the proxy lives on
    chain: &'a dyn ChainClient,
    /// The source verification service
    verifier: &'a dyn SourceVerifier,
    /// The clock used while waiting on repoints
    sleeper: &'a dyn Sleeper,
}

impl<'a> SlotMigration<'a> {
    /// Constructor
    pub fn new(
        chain: &'a dyn ChainClient,
        verifier: &'a dyn SourceVerifier,
        sleeper: &'a dyn Sleeper,
    ) -> Self {
        Self {
            chain,
            verifier,
            sleeper,
        }
    }

    /// Run the migration described by `config`.
    ///
    /// Every step is awaited before the next is issued. On failure the error
    /// names the step and the proxy's implementation as re-read from chain,
    /// so a half-finished migration can be completed by hand.
    pub async fn run(&self, config: &MigrationConfig) -> Result<MigrationReport, MigrationError> {
        let proxy = config.proxy_address;
        config
            .validate()
            .map_err(|e| MigrationError {
                step: MigrationStep::ValidateConfig,
                last_known_implementation: None,
                source: e,
            })?;

        info!(
            "migrating proxy {proxy:#x}: {} at slot {} (last slot {})",
            config.operation, config.slot_number, config.last_slot_number
        );

        let slot_manager = self
            .step(MigrationStep::DeploySlotManager, config, None, async {
                self.chain
                    .deploy(&config.slot_manager_contract_name, &[])
                    .await
            })
            .await?;
        info!(
            "{} deployed at {slot_manager:#x}",
            config.slot_manager_contract_name
        );

        let target = self
            .step(MigrationStep::DeployTarget, config, None, async {
                self.chain.deploy(&config.target_contract_name, &[]).await
            })
            .await?;
        info!("{} deployed at {target:#x}", config.target_contract_name);

        let admin = self
            .step(MigrationStep::ResolveAdmin, config, None, async {
                self.chain.admin_address(proxy).await
            })
            .await?;
        info!("proxy admin is {admin:#x}");

        self.step(MigrationStep::RepointToSlotManager, config, None, async {
            self.chain.upgrade(admin, proxy, slot_manager).await
        })
        .await?;
        info!("proxy {proxy:#x} repointed to slot manager {slot_manager:#x}");

        let slot_manager_confirmation = self
            .step(MigrationStep::ConfirmSlotManager, config, None, async {
                wait_for_implementation(
                    self.chain,
                    self.sleeper,
                    &config.confirmation,
                    proxy,
                    slot_manager,
                )
                .await
            })
            .await?;
        let last_known = Some(slot_manager);

        // Unsupported requests stop here, before any slot metadata changes
        let operation = self
            .step(MigrationStep::ApplyOperation, config, last_known, async {
                config.operation.resolve()
            })
            .await?;

        if !config.unmovable_slots.is_empty() {
            info!(
                "marking slots [{}] unmovable",
                config.unmovable_slots.iter().join(", ")
            );
            self.step(MigrationStep::MarkUnmovableSlots, config, last_known, async {
                for slot in config.unmovable_slots.iter() {
                    self.chain.update_slot_movability(proxy, *slot, true).await?;
                    info!("slot {slot} marked unmovable");
                }
                Ok::<_, ScriptError>(())
            })
            .await?;
        }

        self.step(MigrationStep::ApplyOperation, config, last_known, async {
            self.apply(operation, proxy, config.slot_number, config.last_slot_number)
                .await
        })
        .await?;
        info!(
            "{operation} applied at slot {} (last slot {})",
            config.slot_number, config.last_slot_number
        );

        self.step(MigrationStep::RepointToTarget, config, last_known, async {
            self.chain.upgrade(admin, proxy, target).await
        })
        .await?;
        info!("proxy {proxy:#x} repointed to {target:#x}");

        let target_confirmation = self
            .step(MigrationStep::ConfirmTarget, config, last_known, async {
                wait_for_implementation(self.chain, self.sleeper, &config.confirmation, proxy, target)
                    .await
            })
            .await?;

        let verification = self
            .step(MigrationStep::VerifyTarget, config, Some(target), async {
                self.verifier
                    .verify(&config.target_contract_name, target)
                    .await
            })
            .await?;
        info!(
            "verification of {} at {target:#x}: {verification}",
            config.target_contract_name
        );

        Ok(MigrationReport {
            proxy,
            admin,
            slot_manager,
            target,
            operation,
            slot_manager_polls: slot_manager_confirmation.polls,
            target_polls: target_confirmation.polls,
            verification,
        })
    }

    /// Dispatch the slot mutation to the slot manager
    async fn apply(
        &self,
        operation: MigrationOperation,
        proxy: Address,
        slot: u64,
        last_slot: u64,
    ) -> Result<(), ScriptError> {
        match operation {
            MigrationOperation::AddVariable => {
                self.chain.add_variable_at_slot(proxy, slot, last_slot).await
            }
            MigrationOperation::RemoveVariable => {
                self.chain
                    .remove_variable_at_slot(proxy, slot, last_slot)
                    .await
            }
        }
    }

    /// Run a single step, annotating any failure with the step and the
    /// proxy's current implementation
    async fn step<T>(
        &self,
        step: MigrationStep,
        config: &MigrationConfig,
        last_known: Option<Address>,
        fut: impl std::future::Future<Output = Result<T, ScriptError>>,
    ) -> Result<T, MigrationError> {
        match fut.await {
            Ok(value) => Ok(value),
            Err(source) => Err(self.fail(step, config, last_known, source).await),
        }
    }

    /// Build a [`MigrationError`], re-reading the implementation slot so the
    /// report reflects the chain rather than our last observation
    async fn fail(
        &self,
        step: MigrationStep,
        config: &MigrationConfig,
        last_known: Option<Address>,
        source: ScriptError,
    ) -> MigrationError {
        let proxy = config.proxy_address;
        let read = tokio::time::timeout(
            config.confirmation.poll_timeout(),
            self.chain.implementation_address(proxy),
        )
        .await;

        let fallback = match &source {
            ScriptError::ConfirmationTimeout { last_seen, .. } => last_seen.or(last_known),
            _ => last_known,
        };
        let last_known_implementation = match read {
            Ok(Ok(implementation)) => Some(implementation),
            Ok(Err(e)) => {
                warn!("could not re-read implementation of proxy {proxy:#x}: {e}");
                fallback
            }
            Err(_elapsed) => {
                warn!("re-reading implementation of proxy {proxy:#x} timed out");
                fallback
            }
        };

        MigrationError {
            step,
            last_known_implementation,
            source,
        }
    }
}
