//! Configuration for a storage-slot migration

use std::{fs, path::Path};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::{
    confirmation::ConfirmationPolicy,
    constants::DEFAULT_SLOT_MANAGER_NAME,
    errors::ScriptError,
    types::{AdminAbi, RequestedOperation},
};

/// Everything needed to migrate a storage slot of one proxy
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// The proxy whose storage layout is being migrated
    pub proxy_address: Address,
    /// The artifact name of the final implementation
    pub target_contract_name: String,
    /// The artifact name of the intermediate slot manager implementation
    #[serde(default = "default_slot_manager_name")]
    pub slot_manager_contract_name: String,
    /// The operation to apply
    pub operation: RequestedOperation,
    /// The slot being added or removed
    pub slot_number: u64,
    /// The last occupied slot of the current layout
    pub last_slot_number: u64,
    /// Slots that must keep their position, marked before the operation runs
    #[serde(default)]
    pub unmovable_slots: Vec<u64>,
    /// Which admin ABI the proxy's admin speaks
    #[serde(default)]
    pub admin_abi: AdminAbi,
    /// How to wait for each repoint to land
    #[serde(default)]
    pub confirmation: ConfirmationPolicy,
}

/// The default slot manager artifact name
fn default_slot_manager_name() -> String {
    DEFAULT_SLOT_MANAGER_NAME.to_string()
}

impl MigrationConfig {
    /// Read a config from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))?;
        Self::from_json(&contents)
    }

    /// Parse a config from a JSON string
    pub fn from_json(contents: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(contents).map_err(|e| ScriptError::Config(e.to_string()))
    }

    /// Check the slot layout parameters.
    ///
    /// The operation itself is only resolved when the migration dispatches it.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.target_contract_name.is_empty() {
            return Err(ScriptError::Config("target contract name is empty".to_string()));
        }
        if self.slot_number > self.last_slot_number {
            return Err(ScriptError::Config(format!(
                "slot {} is past the last slot {}",
                self.slot_number, self.last_slot_number
            )));
        }
        if self.unmovable_slots.contains(&self.slot_number) {
            return Err(ScriptError::Config(format!(
                "slot {} is declared unmovable but is the slot being migrated",
                self.slot_number
            )));
        }

        self.confirmation.validate()
    }
}
