//! The capability interface through which phases reach the execution provider

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::ProviderError,
    types::{Receipt, TxHandle},
};

/// An execution provider able to create, upgrade, call and verify units.
///
/// Arguments arrive fully resolved as JSON values; encoding them for the
/// target environment is the implementation's concern.
#[async_trait]
pub trait Provider: Send + Sync {
    /// The identifier of the environment this provider is connected to
    async fn chain_id(&self) -> Result<u64, ProviderError>;

    /// Create the named unit, returning its address
    async fn create(&self, unit: &str, args: &[Value]) -> Result<String, ProviderError>;

    /// Create the named unit behind an upgradeable proxy initialized with
    /// `init_args`, returning the proxy address
    async fn create_proxy(&self, unit: &str, init_args: &[Value]) -> Result<String, ProviderError>;

    /// Point the proxy at `address` to a fresh implementation of the named
    /// unit, returning the address callers should use going forward
    async fn upgrade_proxy(&self, address: &str, unit: &str) -> Result<String, ProviderError>;

    /// Submit a call to `function` on the unit at `address`
    async fn invoke(
        &self,
        contract_name: &str,
        address: &str,
        function: &str,
        args: &[Value],
    ) -> Result<TxHandle, ProviderError>;

    /// Fetch the receipt of a submitted transaction, `None` while pending
    async fn get_receipt(&self, tx: &TxHandle) -> Result<Option<Receipt>, ProviderError>;

    /// Verify the source of the named unit deployed at `address`
    async fn verify_source(
        &self,
        unit: &str,
        address: &str,
        constructor_args: &[Value],
    ) -> Result<(), ProviderError>;
}
