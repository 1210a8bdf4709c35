//! Loading compiled contract artifacts and encoding calls against their ABIs

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt, Specifier},
    json_abi::{JsonAbi, Param},
    primitives::Bytes,
};
use serde_json::Value;

use crate::{
    constants::{JSON_EXTENSION, SOL_EXTENSION},
    errors::ScriptError,
};

/// A directory of compiled artifacts, in Foundry (`<Name>.sol/<Name>.json`)
/// or flat (`<Name>.json`) layout
#[derive(Clone, Debug)]
pub struct ArtifactStore {
    /// The artifacts directory
    root: PathBuf,
}

impl ArtifactStore {
    /// Constructor
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The paths at which the named artifact may live, in lookup order
    fn candidate_paths(&self, contract_name: &str) -> [PathBuf; 2] {
        let file_name = format!("{contract_name}.{JSON_EXTENSION}");
        [
            self.root
                .join(format!("{contract_name}.{SOL_EXTENSION}"))
                .join(&file_name),
            self.root.join(&file_name),
        ]
    }

    /// Load the named artifact
    pub fn load(&self, contract_name: &str) -> Result<ContractArtifact, ScriptError> {
        let path = self
            .candidate_paths(contract_name)
            .into_iter()
            .find(|path| path.exists())
            .ok_or_else(|| {
                ScriptError::ReadFile(format!(
                    "no artifact for `{contract_name}` under {}",
                    self.root.display()
                ))
            })?;

        ContractArtifact::from_file(contract_name, &path)
    }
}

/// The ABI and creation bytecode of a compiled contract
#[derive(Clone, Debug)]
pub struct ContractArtifact {
    /// The contract name
    pub name: String,
    /// The contract ABI
    pub abi: JsonAbi,
    /// The creation bytecode
    pub bytecode: Bytes,
}

impl ContractArtifact {
    /// Read an artifact from a JSON file
    pub fn from_file(contract_name: &str, path: &Path) -> Result<Self, ScriptError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| ScriptError::ReadFile(format!("{}: {e}", path.display())))?;
        Self::from_json(contract_name, &contents)
    }

    /// Parse an artifact, accepting both Foundry's `bytecode.object` and
    /// Hardhat's flat `bytecode` string
    pub fn from_json(contract_name: &str, contents: &str) -> Result<Self, ScriptError> {
        let parsed: Value = serde_json::from_str(contents)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        let abi: JsonAbi = serde_json::from_value(parsed["abi"].clone())
            .map_err(|e| ScriptError::ArtifactParsing(format!("{contract_name} abi: {e}")))?;

        let bytecode_hex = match &parsed["bytecode"] {
            Value::String(hex) => hex.as_str(),
            Value::Object(obj) => obj.get("object").and_then(Value::as_str).unwrap_or_default(),
            _ => "",
        };
        if bytecode_hex.contains("__") {
            return Err(ScriptError::ArtifactParsing(format!(
                "{contract_name} bytecode has unlinked libraries"
            )));
        }

        let bytecode = Bytes::from_str(bytecode_hex)
            .map_err(|e| ScriptError::ArtifactParsing(format!("{contract_name} bytecode: {e}")))?;
        if bytecode.is_empty() {
            return Err(ScriptError::ArtifactParsing(format!(
                "{contract_name} has no creation bytecode"
            )));
        }

        Ok(Self {
            name: contract_name.to_string(),
            abi,
            bytecode,
        })
    }

    /// The creation code with ABI-encoded constructor arguments appended
    pub fn deploy_code(&self, constructor_args: &[String]) -> Result<Bytes, ScriptError> {
        let encoded_args = match self.abi.constructor() {
            Some(constructor) => {
                let values = coerce_args(&self.name, &constructor.inputs, constructor_args)?;
                constructor
                    .abi_encode_input(&values)
                    .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?
            }
            None if constructor_args.is_empty() => Vec::new(),
            None => {
                return Err(ScriptError::CalldataConstruction(format!(
                    "{} has no constructor but {} arguments were given",
                    self.name,
                    constructor_args.len()
                )))
            }
        };

        let mut code = self.bytecode.to_vec();
        code.extend(encoded_args);
        Ok(code.into())
    }

    /// Calldata for the named function, picking the overload whose arity
    /// matches the given arguments
    pub fn encode_call(&self, function_name: &str, args: &[String]) -> Result<Bytes, ScriptError> {
        let function = self
            .abi
            .function(function_name)
            .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == args.len()))
            .ok_or_else(|| {
                ScriptError::CalldataConstruction(format!(
                    "{} has no function `{function_name}` taking {} arguments",
                    self.name,
                    args.len()
                ))
            })?;

        let values = coerce_args(&self.name, &function.inputs, args)?;
        function
            .abi_encode_input(&values)
            .map(Bytes::from)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
    }
}

/// Coerce string arguments into ABI values of the given parameter types
fn coerce_args(
    contract_name: &str,
    params: &[Param],
    args: &[String],
) -> Result<Vec<DynSolValue>, ScriptError> {
    if params.len() != args.len() {
        return Err(ScriptError::CalldataConstruction(format!(
            "{contract_name} expects {} arguments, got {}",
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
            ty.coerce_str(arg).map_err(|e| {
                ScriptError::CalldataConstruction(format!(
                    "argument `{}` ({}): {e}",
                    param.name, param.ty
                ))
            })
        })
        .collect()
}
