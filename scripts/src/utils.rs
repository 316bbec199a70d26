//! Utilities for the deploy scripts.

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::{
    dyn_abi::{DynSolType, DynSolValue, JsonAbiExt, Specifier},
    json_abi::{Function, JsonAbi, Param},
    network::Ethereum,
    primitives::Address,
    providers::{DynProvider, ProviderBuilder},
    signers::local::PrivateKeySigner,
    transports::http::reqwest::Url,
};
use deployer_core::state::switch_config as switch_state_config;
use itertools::Itertools;
use serde_json::Value;

use crate::{
    constants::{
        ARTIFACT_ABI_KEY, ARTIFACT_BYTECODE_KEY, ARTIFACT_BYTECODE_OBJECT_KEY, ARTIFACT_EXTENSION,
        HOME_ENV_VARS,
    },
    errors::ScriptError,
};

/// The RPC client type used by the scripts
pub type Client = DynProvider<Ethereum>;

/// Sets up the RPC client, signing transactions with the given private key.
///
/// Returns the client along with the deployer's address.
pub fn setup_client(priv_key: &str, rpc_url: &str) -> Result<(Client, Address), ScriptError> {
    let signer = PrivateKeySigner::from_str(priv_key)
        .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let deployer = signer.address();

    let url = Url::parse(rpc_url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;
    let provider = ProviderBuilder::new().wallet(signer).connect_http(url);

    Ok((DynProvider::new(provider), deployer))
}

// -------------
// | Artifacts |
// -------------

/// The ABI and creation bytecode of a compiled contract
#[derive(Clone, Debug)]
pub struct Artifact {
    /// The contract ABI
    pub abi: JsonAbi,
    /// The contract creation bytecode
    pub bytecode: Vec<u8>,
}

impl Artifact {
    /// Parse an artifact from its JSON form.
    ///
    /// Accepts both Hardhat (`"bytecode": "0x.."`) and Foundry
    /// (`"bytecode": { "object": "0x.." }`) layouts.
    pub fn from_json(json: &Value) -> Result<Self, ScriptError> {
        let abi_json = json.get(ARTIFACT_ABI_KEY).cloned().ok_or_else(|| {
            ScriptError::ArtifactParsing("artifact has no ABI".to_string())
        })?;
        let abi: JsonAbi = serde_json::from_value(abi_json)
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        let bytecode_json = json.get(ARTIFACT_BYTECODE_KEY);
        let bytecode_hex = bytecode_json
            .and_then(|b| b.get(ARTIFACT_BYTECODE_OBJECT_KEY).or(Some(b)))
            .and_then(Value::as_str)
            .ok_or_else(|| ScriptError::ArtifactParsing("artifact has no bytecode".to_string()))?;

        let bytecode = hex::decode(bytecode_hex.trim_start_matches("0x"))
            .map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

        Ok(Artifact { abi, bytecode })
    }

    /// The creation code with the ABI-encoded constructor arguments appended
    pub fn deploy_code(&self, args: &[Value]) -> Result<Vec<u8>, ScriptError> {
        let encoded_args = self.encode_constructor_args(args)?;
        Ok([self.bytecode.clone(), encoded_args].concat())
    }

    /// ABI-encode the constructor arguments; empty if there is no constructor
    pub fn encode_constructor_args(&self, args: &[Value]) -> Result<Vec<u8>, ScriptError> {
        match self.abi.constructor() {
            Some(constructor) => {
                let values = coerce_args(&constructor.inputs, args)?;
                constructor
                    .abi_encode_input(&values)
                    .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
            }
            None if args.is_empty() => Ok(Vec::new()),
            None => Err(ScriptError::CalldataConstruction(
                "arguments given for a contract without a constructor".to_string(),
            )),
        }
    }

    /// Look up the overload of `name` taking `arity` arguments
    pub fn function(&self, name: &str, arity: usize) -> Option<&Function> {
        self.abi
            .function(name)?
            .iter()
            .find(|f| f.inputs.len() == arity)
    }

    /// ABI-encode a call to `name` with the given arguments, selector included
    pub fn encode_call(&self, name: &str, args: &[Value]) -> Result<Vec<u8>, ScriptError> {
        let function = self.function(name, args.len()).ok_or_else(|| {
            ScriptError::CalldataConstruction(format!(
                "no function {name} taking {} argument(s)",
                args.len()
            ))
        })?;

        let values = coerce_args(&function.inputs, args)?;
        function
            .abi_encode_input(&values)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))
    }
}

/// Locate and parse the artifact for `name` under `artifacts_dir`.
///
/// Looks for `<name>.json`, then the Foundry layout `<name>.sol/<name>.json`,
/// then the Hardhat layout `contracts/<name>.sol/<name>.json`.
pub fn load_artifact(artifacts_dir: &Path, name: &str) -> Result<Artifact, ScriptError> {
    let file_name = format!("{name}.{ARTIFACT_EXTENSION}");
    let source_dir = format!("{name}.sol");
    let candidates = [
        artifacts_dir.join(&file_name),
        artifacts_dir.join(&source_dir).join(&file_name),
        artifacts_dir.join("contracts").join(&source_dir).join(&file_name),
    ];

    let path = candidates.iter().find(|p| p.exists()).ok_or_else(|| {
        ScriptError::ArtifactParsing(format!(
            "no artifact for {name} in {}",
            artifacts_dir.display()
        ))
    })?;

    let contents =
        fs::read_to_string(path).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;
    let json: Value =
        serde_json::from_str(&contents).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    Artifact::from_json(&json)
}

// -------------
// | Arguments |
// -------------

/// Coerce JSON arguments into Solidity values of the given parameter types
pub fn coerce_args(params: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>, ScriptError> {
    if params.len() != args.len() {
        return Err(ScriptError::CalldataConstruction(format!(
            "expected {} argument(s), got {}",
            params.len(),
            args.len()
        )));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty: DynSolType = param
                .resolve()
                .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
            ty.coerce_str(&solidity_literal(arg)).map_err(|e| {
                ScriptError::CalldataConstruction(format!("argument {}: {}", param.name, e))
            })
        })
        .collect()
}

/// Render a JSON argument in the textual form Solidity type coercion accepts
pub fn solidity_literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("[{}]", items.iter().map(solidity_literal).join(", ")),
        other => other.to_string(),
    }
}

// ------------------
// | Config Switch |
// ------------------

/// The user's home directory, if one is set
pub fn home_dir() -> Option<PathBuf> {
    HOME_ENV_VARS
        .iter()
        .find_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
}

/// Copy the `variant` configuration over the active one, searching the
/// home directory before `data_dir`
pub fn switch_config(
    data_dir: &Path,
    base_name: &str,
    variant: &str,
) -> Result<Option<PathBuf>, ScriptError> {
    let search_dirs: Vec<PathBuf> = home_dir()
        .into_iter()
        .chain(std::iter::once(data_dir.to_path_buf()))
        .collect();

    switch_state_config(&search_dirs, base_name, variant)
        .map_err(|e| ScriptError::ConfigSwitch(e.to_string()))
}

#[cfg(test)]
mod tests {
    use alloy::dyn_abi::DynSolValue;
    use serde_json::json;

    use super::{solidity_literal, Artifact};

    fn artifact(bytecode: serde_json::Value) -> Artifact {
        Artifact::from_json(&json!({
            "abi": [
                {
                    "type": "constructor",
                    "inputs": [{ "name": "owner", "type": "address", "internalType": "address" }],
                    "stateMutability": "nonpayable"
                },
                {
                    "type": "function",
                    "name": "setFee",
                    "inputs": [{ "name": "fee", "type": "uint256", "internalType": "uint256" }],
                    "outputs": [],
                    "stateMutability": "nonpayable"
                }
            ],
            "bytecode": bytecode
        }))
        .unwrap()
    }

    #[test]
    fn test_artifact_layouts() {
        let hardhat = artifact(json!("0x6001"));
        let foundry = artifact(json!({ "object": "0x6001" }));

        assert_eq!(hardhat.bytecode, vec![0x60, 0x01]);
        assert_eq!(foundry.bytecode, hardhat.bytecode);
    }

    #[test]
    fn test_deploy_code_appends_constructor_args() {
        let artifact = artifact(json!("0x6001"));
        let owner = "0x0000000000000000000000000000000000000001";

        let code = artifact.deploy_code(&[json!(owner)]).unwrap();

        assert_eq!(code.len(), 2 + 32);
        assert_eq!(&code[..2], &[0x60, 0x01]);
        assert_eq!(code[33], 1);
    }

    #[test]
    fn test_unresolved_placeholder_is_rejected() {
        let artifact = artifact(json!("0x6001"));
        assert!(artifact.deploy_code(&[json!("${Treasury.address}")]).is_err());
    }

    #[test]
    fn test_encode_call_includes_selector() {
        let artifact = artifact(json!("0x6001"));

        let calldata = artifact.encode_call("setFee", &[json!(5)]).unwrap();
        let function = artifact.function("setFee", 1).unwrap();

        assert_eq!(&calldata[..4], function.selector().as_slice());
        assert_eq!(calldata.len(), 4 + 32);
        assert!(artifact.encode_call("setFee", &[]).is_err());
    }

    #[test]
    fn test_solidity_literal() {
        assert_eq!(solidity_literal(&json!("0xab")), "0xab");
        assert_eq!(solidity_literal(&json!(12)), "12");
        assert_eq!(solidity_literal(&json!(true)), "true");
        assert_eq!(solidity_literal(&json!(["0x01", 2])), "[0x01, 2]");

        let coerced = alloy::dyn_abi::DynSolType::Uint(256)
            .coerce_str(&solidity_literal(&json!(7)))
            .unwrap();
        assert_eq!(coerced, DynSolValue::Uint(alloy::primitives::U256::from(7), 256));
    }
}
