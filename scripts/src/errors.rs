//! Definitions of errors that can occur during the execution of the contract management scripts

use std::fmt::{self, Display, Formatter};

use alloy::{
    primitives::Address,
    sol_types::decode_revert_reason,
    transports::{RpcError, TransportError},
};

/// Errors that can occur during the execution of the contract management scripts
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Error reading a file from disk
    #[error("error reading file: {0}")]
    ReadFile(String),
    /// Error writing a file to disk
    #[error("error writing file: {0}")]
    WriteFile(String),
    /// Error parsing a compilation artifact
    #[error("error parsing artifact: {0}")]
    ArtifactParsing(String),
    /// Error initializing the RPC client
    #[error("error initializing client: {0}")]
    ClientInitialization(String),
    /// Error constructing calldata for a contract method or constructor
    #[error("error constructing calldata: {0}")]
    CalldataConstruction(String),
    /// Error deploying a contract
    #[error("error deploying contract: {0}")]
    ContractDeployment(String),
    /// A contract call or transaction reverted
    #[error("contract call reverted: {0}")]
    ContractRevert(String),
    /// The node rejected a request for a reason other than a revert
    #[error("request rejected by node: {0}")]
    NodeRejected(String),
    /// A transport-level RPC failure, which may succeed if retried
    #[error("rpc transport error: {0}")]
    Rpc(String),
    /// A proxy's implementation slot did not reach the expected value in time
    #[error(
        "implementation of proxy {proxy:#x} did not become {expected:#x} after {attempts} polls"
    )]
    ConfirmationTimeout {
        /// The proxy being polled
        proxy: Address,
        /// The implementation address we were waiting for
        expected: Address,
        /// The number of polls issued
        attempts: u32,
        /// The last implementation address read, if any read succeeded
        last_seen: Option<Address>,
    },
    /// The requested slot migration operation is not supported
    #[error("unsupported migration operation: {0}")]
    UnsupportedOperation(String),
    /// Invalid script configuration
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Source verification failed
    #[error("verification failed: {0}")]
    Verification(String),
    /// Error running an external command
    #[error("error running command: {0}")]
    Command(String),
    /// A slot migration failed partway through
    #[error(transparent)]
    Migration(Box<MigrationError>),
}

impl ScriptError {
    /// Whether the failure is a transport hiccup that a read may retry
    pub fn is_transient(&self) -> bool {
        matches!(self, ScriptError::Rpc(_))
    }

    /// Map an RPC error into the script error taxonomy, separating reverts
    /// from other node rejections and from transport failures
    pub fn from_transport(err: &TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => {
                let is_revert = payload.as_revert_data().is_some()
                    || payload.message.to_lowercase().contains("revert");
                if is_revert {
                    let reason = payload
                        .as_revert_data()
                        .and_then(|data| decode_revert_reason(&data));
                    ScriptError::ContractRevert(reason.unwrap_or_else(|| payload.to_string()))
                } else {
                    ScriptError::NodeRejected(payload.to_string())
                }
            }
            RpcError::Transport(_) | RpcError::NullResp => ScriptError::Rpc(err.to_string()),
            _ => ScriptError::NodeRejected(err.to_string()),
        }
    }
}

impl From<MigrationError> for ScriptError {
    fn from(err: MigrationError) -> Self {
        ScriptError::Migration(Box::new(err))
    }
}

/// The steps of a storage-slot migration, in execution order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationStep {
    /// Checking the migration config before touching the chain
    ValidateConfig,
    /// Deploying the slot manager implementation
    DeploySlotManager,
    /// Deploying the final target implementation
    DeployTarget,
    /// Reading the proxy's admin from the EIP-1967 admin slot
    ResolveAdmin,
    /// Repointing the proxy at the slot manager
    RepointToSlotManager,
    /// Waiting for the proxy to report the slot manager as its implementation
    ConfirmSlotManager,
    /// Marking declared slots as unmovable
    MarkUnmovableSlots,
    /// Applying the add / remove variable operation
    ApplyOperation,
    /// Repointing the proxy at the target implementation
    RepointToTarget,
    /// Waiting for the proxy to report the target as its implementation
    ConfirmTarget,
    /// Verifying the target implementation's source
    VerifyTarget,
}

impl Display for MigrationStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStep::ValidateConfig => write!(f, "validate-config"),
            MigrationStep::DeploySlotManager => write!(f, "deploy-slot-manager"),
            MigrationStep::DeployTarget => write!(f, "deploy-target"),
            MigrationStep::ResolveAdmin => write!(f, "resolve-admin"),
            MigrationStep::RepointToSlotManager => write!(f, "repoint-to-slot-manager"),
            MigrationStep::ConfirmSlotManager => write!(f, "confirm-slot-manager"),
            MigrationStep::MarkUnmovableSlots => write!(f, "mark-unmovable-slots"),
            MigrationStep::ApplyOperation => write!(f, "apply-operation"),
            MigrationStep::RepointToTarget => write!(f, "repoint-to-target"),
            MigrationStep::ConfirmTarget => write!(f, "confirm-target"),
            MigrationStep::VerifyTarget => write!(f, "verify-target"),
        }
    }
}

/// A slot migration failure, annotated with where it stopped and what the
/// proxy was last known to point at
#[derive(Debug, thiserror::Error)]
#[error(
    "slot migration failed at step `{step}` (proxy implementation: {}): {source}",
    fmt_implementation(.last_known_implementation)
)]
pub struct MigrationError {
    /// The step that failed
    pub step: MigrationStep,
    /// The proxy's implementation address as last read from chain
    pub last_known_implementation: Option<Address>,
    /// The underlying failure
    pub source: ScriptError,
}

impl MigrationError {
    /// Whether the run failed because the proxy never confirmed a repoint
    pub fn is_timeout(&self) -> bool {
        matches!(self.source, ScriptError::ConfirmationTimeout { .. })
    }
}

/// Format an optional implementation address for error output
fn fmt_implementation(addr: &Option<Address>) -> String {
    match addr {
        Some(addr) => format!("{addr:#x}"),
        None => "unknown".to_string(),
    }
}
