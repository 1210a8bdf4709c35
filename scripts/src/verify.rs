//! Source verification through `forge verify-contract`

use std::{path::PathBuf, process::Stdio};

use alloy::primitives::Address;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{
    chain::SourceVerifier,
    constants::{ALREADY_VERIFIED_MARKER, FORGE_COMMAND, VERIFY_CONTRACT_COMMAND},
    errors::ScriptError,
    types::VerificationOutcome,
};

/// Verifies contracts by shelling out to Forge from the contracts project root
#[derive(Clone, Debug)]
pub struct ForgeVerifier {
    /// The chain the contracts are deployed on
    pub chain_id: u64,
    /// The Foundry project holding the contract sources
    pub project_root: PathBuf,
    /// The explorer API key, if the verifier requires one
    pub etherscan_api_key: Option<String>,
    /// A custom verifier endpoint
    pub verifier_url: Option<String>,
}

impl ForgeVerifier {
    /// Build the `forge verify-contract` invocation
    fn command(&self, contract_name: &str, address: Address) -> Command {
        let mut cmd = Command::new(FORGE_COMMAND);
        cmd.current_dir(&self.project_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        cmd.arg(VERIFY_CONTRACT_COMMAND)
            .arg(format!("{address:#x}"))
            .arg(contract_name)
            .arg("--chain")
            .arg(self.chain_id.to_string())
            .arg("--watch");

        if let Some(key) = &self.etherscan_api_key {
            cmd.arg("--etherscan-api-key").arg(key);
        }
        if let Some(url) = &self.verifier_url {
            cmd.arg("--verifier-url").arg(url);
        }

        cmd
    }
}

#[async_trait]
impl SourceVerifier for ForgeVerifier {
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
    ) -> Result<VerificationOutcome, ScriptError> {
        info!("verifying {contract_name} at {address:#x}");

        let output = self
            .command(contract_name, address)
            .output()
            .await
            .map_err(|e| ScriptError::Command(format!("{FORGE_COMMAND}: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("{FORGE_COMMAND} {VERIFY_CONTRACT_COMMAND} output:\n{stdout}{stderr}");

        classify_verification_output(output.status.success(), &format!("{stdout}\n{stderr}"))
    }
}

/// A verifier that does nothing, for networks without an explorer
#[derive(Clone, Copy, Debug, Default)]
pub struct SkipVerifier;

#[async_trait]
impl SourceVerifier for SkipVerifier {
    async fn verify(
        &self,
        contract_name: &str,
        address: Address,
    ) -> Result<VerificationOutcome, ScriptError> {
        info!("skipping verification of {contract_name} at {address:#x}");
        Ok(VerificationOutcome::Skipped)
    }
}

/// Interpret the verifier's exit status and output.
///
/// An "already verified" response is a success whatever the exit status.
pub fn classify_verification_output(
    success: bool,
    output: &str,
) -> Result<VerificationOutcome, ScriptError> {
    if output.to_lowercase().contains(ALREADY_VERIFIED_MARKER) {
        return Ok(VerificationOutcome::AlreadyVerified);
    }
    if success {
        return Ok(VerificationOutcome::Verified);
    }

    let reason = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("verifier exited with an error");
    Err(ScriptError::Verification(reason.to_string()))
}
