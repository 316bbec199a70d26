//! A scripted in-memory provider for exercising the phase engines

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::ProviderError,
    provider::Provider,
    types::{Receipt, TxHandle},
};

/// The prefix of every receipt event in the log
const RECEIPT_EVENT: &str = "receipt";

/// The scripted operation that reports an invocation's receipt as reverted
const REVERT_OPERATION: &str = "revert";

/// The chain id reported by default
pub const MOCK_CHAIN_ID: u64 = 31337;

/// A provider that always succeeds unless told otherwise, handing out
/// sequential addresses and logging every operation in order
#[derive(Default)]
pub struct MockProvider {
    /// The chain id reported to callers
    chain_id: u64,
    /// `(operation, key)` pairs that fail
    failures: HashSet<(String, String)>,
    /// How many receipt polls report a transaction as pending
    pending_polls: usize,
    /// Mutable bookkeeping
    inner: Mutex<MockState>,
}

/// Bookkeeping behind the mock's lock
#[derive(Default)]
struct MockState {
    /// The number of addresses handed out so far
    next_address: u64,
    /// The number of transactions submitted so far
    next_tx: u64,
    /// Every operation, in order
    events: Vec<String>,
    /// The number of receipt polls seen per transaction
    polls: HashMap<TxHandle, usize>,
    /// Transactions whose receipt reports a revert
    reverted: HashSet<TxHandle>,
}

impl MockProvider {
    /// A provider on [`MOCK_CHAIN_ID`] whose operations all succeed
    pub fn new() -> Self {
        MockProvider {
            chain_id: MOCK_CHAIN_ID,
            ..Default::default()
        }
    }

    /// Report the given chain id
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Fail `operation` for `key`: the unit name, or `contract.function`
    /// for invocations. The `revert` operation lets an invocation through
    /// but reports its receipt as reverted
    pub fn fail_on(mut self, operation: &str, key: &str) -> Self {
        self.failures.insert((operation.to_string(), key.to_string()));
        self
    }

    /// Report every transaction as pending for the given number of polls
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Every logged operation, receipt polls included
    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    /// Every logged operation except receipt polls
    pub fn calls(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| !e.starts_with(RECEIPT_EVENT))
            .collect()
    }

    /// Only the logged invocations
    pub fn invocations(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.starts_with("invoke"))
            .collect()
    }

    /// The number of receipt polls seen for `tx`
    pub fn receipt_polls(&self, tx: &TxHandle) -> usize {
        self.state().polls.get(tx).copied().unwrap_or_default()
    }

    /// Lock the bookkeeping, recovering from a poisoned lock
    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Log an operation and fail it if scripted to
    fn record(&self, operation: &str, key: &str, event: String) -> Result<(), ProviderError> {
        self.state().events.push(event);
        if self
            .failures
            .contains(&(operation.to_string(), key.to_string()))
        {
            return Err(ProviderError(format!("scripted {operation} failure for {key}")));
        }
        Ok(())
    }

    /// Hand out the next address
    fn next_address(&self) -> String {
        let mut state = self.state();
        state.next_address += 1;
        format!("0x{:040x}", state.next_address)
    }
}

/// Render arguments the way the event log shows them
fn render(args: &[Value]) -> String {
    Value::Array(args.to_vec()).to_string()
}

#[async_trait]
impl Provider for MockProvider {
    async fn chain_id(&self) -> Result<u64, ProviderError> {
        Ok(self.chain_id)
    }

    async fn create(&self, unit: &str, args: &[Value]) -> Result<String, ProviderError> {
        self.record("create", unit, format!("create {unit} {}", render(args)))?;
        Ok(self.next_address())
    }

    async fn create_proxy(&self, unit: &str, init_args: &[Value]) -> Result<String, ProviderError> {
        self.record(
            "create_proxy",
            unit,
            format!("create_proxy {unit} {}", render(init_args)),
        )?;
        Ok(self.next_address())
    }

    async fn upgrade_proxy(&self, address: &str, unit: &str) -> Result<String, ProviderError> {
        self.record(
            "upgrade_proxy",
            unit,
            format!("upgrade_proxy {unit} {address}"),
        )?;
        Ok(self.next_address())
    }

    async fn invoke(
        &self,
        contract_name: &str,
        address: &str,
        function: &str,
        args: &[Value],
    ) -> Result<TxHandle, ProviderError> {
        let key = format!("{contract_name}.{function}");
        self.record(
            "invoke",
            &key,
            format!("invoke {key}@{address} {}", render(args)),
        )?;

        let reverts = self.failures.contains(&(REVERT_OPERATION.to_string(), key));
        let mut state = self.state();
        state.next_tx += 1;
        let tx = TxHandle(format!("0x{:064x}", state.next_tx));
        if reverts {
            state.reverted.insert(tx.clone());
        }

        Ok(tx)
    }

    async fn get_receipt(&self, tx: &TxHandle) -> Result<Option<Receipt>, ProviderError> {
        let mut state = self.state();
        let polls = {
            let count = state.polls.entry(tx.clone()).or_default();
            *count += 1;
            *count
        };

        if polls <= self.pending_polls {
            state.events.push(format!("{RECEIPT_EVENT} {tx} pending"));
            return Ok(None);
        }

        state.events.push(format!("{RECEIPT_EVENT} {tx} confirmed"));
        Ok(Some(Receipt {
            tx: tx.clone(),
            block_number: Some(polls as u64),
            success: !state.reverted.contains(tx),
        }))
    }

    async fn verify_source(
        &self,
        unit: &str,
        address: &str,
        constructor_args: &[Value],
    ) -> Result<(), ProviderError> {
        self.record(
            "verify_source",
            unit,
            format!("verify_source {unit} {address} {}", render(constructor_args)),
        )
    }
}
