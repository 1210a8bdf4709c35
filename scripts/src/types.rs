//! Type definitions used throughout the scripts

use std::fmt::{self, Display};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::ScriptError;

/// A storage-slot mutation applied through the slot manager
#[derive(ValueEnum, Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MigrationOperation {
    /// Insert a variable at the given slot, shifting the following slots down
    AddVariable,
    /// Remove the variable at the given slot, shifting the following slots up
    RemoveVariable,
}

impl MigrationOperation {
    /// The legacy numeric code of the operation
    pub fn code(&self) -> u64 {
        match self {
            MigrationOperation::AddVariable => 0,
            MigrationOperation::RemoveVariable => 1,
        }
    }

    /// Parse an operation from its legacy numeric code
    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(MigrationOperation::AddVariable),
            1 => Some(MigrationOperation::RemoveVariable),
            _ => None,
        }
    }

    /// Parse an operation name, accepting kebab, snake and camel case
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "addvariable" => Some(MigrationOperation::AddVariable),
            "removevariable" => Some(MigrationOperation::RemoveVariable),
            _ => None,
        }
    }
}

impl Display for MigrationOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOperation::AddVariable => write!(f, "add-variable"),
            MigrationOperation::RemoveVariable => write!(f, "remove-variable"),
        }
    }
}

/// The operation as requested in a migration config.
///
/// Values that do not name a supported operation are kept as-is and rejected
/// when the migration reaches its dispatch step.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "RawOperation", into = "RawOperation")]
pub enum RequestedOperation {
    /// A supported operation
    Supported(MigrationOperation),
    /// An unrecognized operation, with its raw representation
    Unsupported(String),
}

impl RequestedOperation {
    /// Resolve the request into a supported operation
    pub fn resolve(&self) -> Result<MigrationOperation, ScriptError> {
        match self {
            RequestedOperation::Supported(op) => Ok(*op),
            RequestedOperation::Unsupported(raw) => {
                Err(ScriptError::UnsupportedOperation(raw.clone()))
            }
        }
    }
}

impl From<MigrationOperation> for RequestedOperation {
    fn from(op: MigrationOperation) -> Self {
        RequestedOperation::Supported(op)
    }
}

impl Display for RequestedOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestedOperation::Supported(op) => write!(f, "{op}"),
            RequestedOperation::Unsupported(raw) => write!(f, "{raw} (unsupported)"),
        }
    }
}

/// The serialized form of an operation: a legacy code or a name
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
enum RawOperation {
    /// A legacy numeric code
    Code(u64),
    /// An operation name
    Name(String),
    /// Any other JSON value
    Other(serde_json::Value),
}

impl From<RawOperation> for RequestedOperation {
    fn from(raw: RawOperation) -> Self {
        let op = match &raw {
            RawOperation::Code(code) => MigrationOperation::from_code(*code),
            RawOperation::Name(name) => MigrationOperation::from_name(name),
            RawOperation::Other(_) => None,
        };

        match (op, raw) {
            (Some(op), _) => RequestedOperation::Supported(op),
            (None, RawOperation::Code(code)) => {
                RequestedOperation::Unsupported(format!("operation code {code}"))
            }
            (None, RawOperation::Name(name)) => RequestedOperation::Unsupported(name),
            (None, RawOperation::Other(value)) => {
                RequestedOperation::Unsupported(format!("operation {value}"))
            }
        }
    }
}

impl From<RequestedOperation> for RawOperation {
    fn from(op: RequestedOperation) -> Self {
        match op {
            RequestedOperation::Supported(op) => RawOperation::Name(op.to_string()),
            RequestedOperation::Unsupported(raw) => RawOperation::Name(raw),
        }
    }
}

/// Which proxy admin ABI to drive when repointing a proxy
#[derive(ValueEnum, Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AdminAbi {
    /// OpenZeppelin v4 `ProxyAdmin.upgrade(proxy, implementation)`
    #[default]
    Legacy,
    /// OpenZeppelin v5 `ProxyAdmin.upgradeAndCall(proxy, implementation, "")`
    V5,
}

/// The result of a source verification request
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The source was verified by this request
    Verified,
    /// The explorer already had the source verified
    AlreadyVerified,
    /// Verification was disabled
    Skipped,
}

impl Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationOutcome::Verified => write!(f, "verified"),
            VerificationOutcome::AlreadyVerified => write!(f, "already verified"),
            VerificationOutcome::Skipped => write!(f, "skipped"),
        }
    }
}
