//! Utilities for the deploy scripts.

use std::{fs, path::Path, str::FromStr};

use alloy::{
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use serde_json::{Map, Value};

use crate::{constants::DEPLOYMENTS_KEY, errors::ScriptError, rpc::Wallet};

/// Sets up the signing client used by the scripts from a private key and RPC url
pub fn setup_client(priv_key: &str, rpc_url: &str) -> Result<Wallet, ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    client_from_signer(signer, rpc_url)
}

/// Sets up a signing client for an already constructed signer
pub fn client_from_signer(signer: PrivateKeySigner, rpc_url: &str) -> Result<Wallet, ScriptError> {
    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

    let provider = ProviderBuilder::new()
        .wallet(signer)
        .with_simple_nonce_management()
        .connect_http(url);

    Ok(DynProvider::new(provider))
}

/// Fetch the chain ID of the connected node
pub async fn get_chain_id(client: &Wallet) -> Result<u64, ScriptError> {
    client
        .get_chain_id()
        .await
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

/// Read a JSON file, treating a missing file as an empty object
fn read_json_or_empty(file_path: &Path) -> Result<Value, ScriptError> {
    if !file_path.exists() {
        return Ok(Value::Object(Map::new()));
    }

    let contents = fs::read_to_string(file_path)
        .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", file_path.display())))?;
    serde_json::from_str(&contents).map_err(|e| ScriptError::ReadFile(e.to_string()))
}

/// Read a contract address from the deployments file
pub fn parse_addr_from_deployments_file(
    file_path: &Path,
    contract_key: &str,
) -> Result<Address, ScriptError> {
    let parsed_json = read_json_or_empty(file_path)?;

    let addr_str = parsed_json[DEPLOYMENTS_KEY][contract_key]
        .as_str()
        .ok_or_else(|| {
            ScriptError::ReadFile(format!(
                "no `{contract_key}` address in {}",
                file_path.display()
            ))
        })?;

    Address::from_str(addr_str).map_err(|e| ScriptError::ReadFile(e.to_string()))
}

/// Record a contract address in the deployments file, creating the file if needed
pub fn write_deployed_address(
    file_path: &Path,
    contract_key: &str,
    address: Address,
) -> Result<(), ScriptError> {
    let mut parsed_json = read_json_or_empty(file_path)?;
    let root = parsed_json.as_object_mut().ok_or_else(|| {
        ScriptError::WriteFile(format!("{} is not a JSON object", file_path.display()))
    })?;

    let deployments = root
        .entry(DEPLOYMENTS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let deployments = deployments.as_object_mut().ok_or_else(|| {
        ScriptError::WriteFile(format!(
            "`{DEPLOYMENTS_KEY}` in {} is not a JSON object",
            file_path.display()
        ))
    })?;
    deployments.insert(
        contract_key.to_string(),
        Value::String(format!("{address:#x}")),
    );

    let contents = serde_json::to_string_pretty(&parsed_json)
        .map_err(|e| ScriptError::WriteFile(e.to_string()))?;
    fs::write(file_path, contents).map_err(|e| ScriptError::WriteFile(e.to_string()))
}
