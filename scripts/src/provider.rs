//! An EVM JSON-RPC implementation of the deployment [`Provider`]

use std::{path::PathBuf, process::Stdio, str::FromStr};

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    network::{ReceiptResponse, TransactionBuilder},
    primitives::{Address, Bytes, TxHash, B256, U256},
    providers::Provider as RpcProvider,
    rpc::types::TransactionRequest,
    sol_types::SolCall,
};
use async_trait::async_trait;
use deployer_core::{
    errors::ProviderError,
    provider::Provider,
    types::{Receipt, TxHandle},
};
use serde_json::Value;
use tokio::process::Command;
use tracing::info;

use crate::{
    constants::{
        FORGE_COMMAND, INITIALIZER_FUNCTION, PROXY_ADMIN_STORAGE_SLOT, PROXY_ARTIFACT,
        VERIFY_CONTRACT_COMMAND,
    },
    errors::ScriptError,
    solidity::upgradeAndCallCall,
    utils::{load_artifact, Artifact, Client},
};

/// Deploys, calls and verifies contracts on an EVM chain, reading compiled
/// artifacts from disk
pub struct EvmProvider {
    /// The signing RPC client
    client: Client,
    /// The deployer's address, also the owner of every proxy it creates
    deployer: Address,
    /// The directory holding compilation artifacts
    artifacts_dir: PathBuf,
    /// The block explorer API key passed to the verification command
    etherscan_api_key: Option<String>,
}

impl EvmProvider {
    /// Construct a provider over an initialized client
    pub fn new(client: Client, deployer: Address, artifacts_dir: PathBuf) -> Self {
        EvmProvider {
            client,
            deployer,
            artifacts_dir,
            etherscan_api_key: None,
        }
    }

    /// Set the block explorer API key used when verifying sources
    pub fn with_etherscan_api_key(mut self, key: Option<String>) -> Self {
        self.etherscan_api_key = key;
        self
    }

    /// Load the artifact for the named contract
    fn artifact(&self, name: &str) -> Result<Artifact, ScriptError> {
        load_artifact(&self.artifacts_dir, name)
    }

    /// Send a contract creation transaction and return the created address
    async fn deploy_code(&self, code: Vec<u8>) -> Result<Address, ScriptError> {
        let tx = TransactionRequest::default().with_deploy_code(code);
        let receipt = self
            .client
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractDeployment(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::ContractDeployment(format!(
                "creation reverted in tx {:#x}",
                receipt.transaction_hash()
            )));
        }

        receipt.contract_address().ok_or_else(|| {
            ScriptError::ContractDeployment("receipt has no contract address".to_string())
        })
    }

    /// Send a call and return its transaction hash without waiting for it
    async fn send_call(&self, to: Address, calldata: Vec<u8>) -> Result<TxHash, ScriptError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        let pending = self
            .client
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    /// Send a call and wait for it to be mined successfully
    async fn send_and_confirm(
        &self,
        to: Address,
        calldata: Vec<u8>,
    ) -> Result<TxHash, ScriptError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(calldata);
        let receipt = self
            .client
            .send_transaction(tx)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?
            .get_receipt()
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        if !receipt.status() {
            return Err(ScriptError::ContractInteraction(format!(
                "call reverted in tx {:#x}",
                receipt.transaction_hash()
            )));
        }

        Ok(receipt.transaction_hash())
    }

    /// Deploy a fresh implementation of the named contract
    async fn deploy_implementation(
        &self,
        unit: &str,
        artifact: &Artifact,
    ) -> Result<Address, ScriptError> {
        let implementation = self.deploy_code(artifact.deploy_code(&[])?).await?;
        info!("{unit} implementation deployed at {implementation:#x}");

        Ok(implementation)
    }

    /// Read the proxy admin contract address from the proxy's storage.
    ///
    /// This is the recommended way to get the proxy admin address:
    /// https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/ERC1967/ERC1967Utils.sol#L104-L106
    async fn proxy_admin(&self, proxy: Address) -> Result<Address, ScriptError> {
        let slot = U256::from_str(PROXY_ADMIN_STORAGE_SLOT)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let word = self
            .client
            .get_storage_at(proxy, slot)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(Address::from_word(B256::from(word.to_be_bytes::<32>())))
    }

    /// See [`Provider::create_proxy`]
    async fn create_proxy_inner(
        &self,
        unit: &str,
        init_args: &[Value],
    ) -> Result<Address, ScriptError> {
        let artifact = self.artifact(unit)?;
        let implementation = self.deploy_implementation(unit, &artifact).await?;

        let init_calldata = if init_args.is_empty()
            && artifact.function(INITIALIZER_FUNCTION, 0).is_none()
        {
            Vec::new()
        } else {
            artifact.encode_call(INITIALIZER_FUNCTION, init_args)?
        };

        // Concretely, the proxy is a `TransparentUpgradeableProxy`, which itself deploys a
        // `ProxyAdmin` contract owned by the deployer
        let proxy_artifact = self.artifact(PROXY_ARTIFACT)?;
        let constructor = proxy_artifact.abi.constructor().ok_or_else(|| {
            ScriptError::ArtifactParsing(format!("{PROXY_ARTIFACT} has no constructor"))
        })?;
        let proxy_args = constructor
            .abi_encode_input(&[
                DynSolValue::Address(implementation),
                DynSolValue::Address(self.deployer),
                DynSolValue::Bytes(init_calldata),
            ])
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;

        let proxy = self
            .deploy_code([proxy_artifact.bytecode, proxy_args].concat())
            .await?;
        info!("{unit} proxy deployed at {proxy:#x}");

        Ok(proxy)
    }

    /// See [`Provider::upgrade_proxy`]
    async fn upgrade_proxy_inner(&self, address: &str, unit: &str) -> Result<Address, ScriptError> {
        let proxy = Address::from_str(address)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        let artifact = self.artifact(unit)?;
        let implementation = self.deploy_implementation(unit, &artifact).await?;
        let proxy_admin = self.proxy_admin(proxy).await?;

        let calldata = upgradeAndCallCall {
            proxy,
            implementation,
            data: Bytes::new(),
        }
        .abi_encode();

        let tx_hash = self.send_and_confirm(proxy_admin, calldata).await?;
        info!("{unit} upgraded through proxy admin {proxy_admin:#x} in tx {tx_hash:#x}");

        Ok(proxy)
    }

    /// See [`Provider::invoke`]
    async fn invoke_inner(
        &self,
        contract_name: &str,
        address: &str,
        function: &str,
        args: &[Value],
    ) -> Result<TxHash, ScriptError> {
        let to = Address::from_str(address)
            .map_err(|e| ScriptError::CalldataConstruction(e.to_string()))?;
        let calldata = self.artifact(contract_name)?.encode_call(function, args)?;

        self.send_call(to, calldata).await
    }

    /// See [`Provider::get_receipt`]
    async fn get_receipt_inner(&self, tx: &TxHandle) -> Result<Option<Receipt>, ScriptError> {
        let hash = TxHash::from_str(&tx.0)
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;
        let receipt = self
            .client
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| ScriptError::ContractInteraction(e.to_string()))?;

        Ok(receipt.map(|r| Receipt {
            tx: tx.clone(),
            block_number: r.block_number(),
            success: r.status(),
        }))
    }

    /// See [`Provider::verify_source`]
    async fn verify_source_inner(
        &self,
        unit: &str,
        address: &str,
        constructor_args: &[Value],
    ) -> Result<(), ScriptError> {
        let encoded_args = self.artifact(unit)?.encode_constructor_args(constructor_args)?;
        let chain_id = self
            .client
            .get_chain_id()
            .await
            .map_err(|e| ScriptError::ClientInitialization(e.to_string()))?;

        let mut cmd = Command::new(FORGE_COMMAND);
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        cmd.arg(VERIFY_CONTRACT_COMMAND)
            .arg(address)
            .arg(unit)
            .arg("--chain")
            .arg(chain_id.to_string())
            .arg("--watch");
        if !encoded_args.is_empty() {
            cmd.arg("--constructor-args")
                .arg(format!("0x{}", hex::encode(&encoded_args)));
        }
        if let Some(key) = &self.etherscan_api_key {
            cmd.arg("--etherscan-api-key").arg(key);
        }

        let status = cmd
            .status()
            .await
            .map_err(|e| ScriptError::Verification(e.to_string()))?;
        if !status.success() {
            return Err(ScriptError::Verification(format!(
                "{FORGE_COMMAND} {VERIFY_CONTRACT_COMMAND} failed with status: {status}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Provider for EvmProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.client
            .get_chain_id()
            .await
            .map_err(|e| ProviderError::new(ScriptError::ClientInitialization(e.to_string())))
    }

    async fn create(&self, unit: &str, args: &[Value]) -> Result<String, ProviderError> {
        let code = self.artifact(unit)?.deploy_code(args)?;
        let address = self.deploy_code(code).await?;
        Ok(address.to_string())
    }

    async fn create_proxy(&self, unit: &str, init_args: &[Value]) -> Result<String, ProviderError> {
        let proxy = self.create_proxy_inner(unit, init_args).await?;
        Ok(proxy.to_string())
    }

    async fn upgrade_proxy(&self, address: &str, unit: &str) -> Result<String, ProviderError> {
        let proxy = self.upgrade_proxy_inner(address, unit).await?;
        Ok(proxy.to_string())
    }

    async fn invoke(
        &self,
        contract_name: &str,
        address: &str,
        function: &str,
        args: &[Value],
    ) -> Result<TxHandle, ProviderError> {
        let hash = self
            .invoke_inner(contract_name, address, function, args)
            .await?;
        Ok(TxHandle(format!("{hash:#x}")))
    }

    async fn get_receipt(&self, tx: &TxHandle) -> Result<Option<Receipt>, ProviderError> {
        Ok(self.get_receipt_inner(tx).await?)
    }

    async fn verify_source(
        &self,
        unit: &str,
        address: &str,
        constructor_args: &[Value],
    ) -> Result<(), ProviderError> {
        Ok(self
            .verify_source_inner(unit, address, constructor_args)
            .await?)
    }
}
