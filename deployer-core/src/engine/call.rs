//! The call phase: sequential invocations, each confirmed before the next

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::{
    config::{ConfirmationConfig, EngineConfig},
    errors::{DeployError, ProviderError},
    placeholder::seed_calls,
    provider::Provider,
    types::{arg_values, CallOutcome, CallRecord, Receipt, TxHandle, UnitDocument},
};

use super::pace;

/// Invoke every enabled call in order, waiting for each to confirm.
///
/// Contract addresses and argument placeholders are first resolved against
/// the unit document. The first provider error aborts the remaining calls.
pub async fn run_calls<P: Provider + ?Sized>(
    provider: &P,
    calls: &mut [CallRecord],
    units: &UnitDocument,
    config: &EngineConfig,
) -> Result<Vec<CallOutcome>, DeployError> {
    seed_calls(calls, units);

    let mut outcomes = Vec::new();
    for call in calls.iter() {
        if !call.call {
            continue;
        }
        if call.contract_name.is_empty() || call.contract_address.is_empty() {
            warn!(
                "skipping call {}.{}: no contract address",
                call.contract_name, call.function_name
            );
            continue;
        }

        info!("=============== Call {}.{} ...", call.contract_name, call.function_name);
        pace(config.pacing_delay).await;

        let tx = provider
            .invoke(
                &call.contract_name,
                &call.contract_address,
                &call.function_name,
                &arg_values(&call.args),
            )
            .await
            .map_err(|e| {
                DeployError::Invocation(format!(
                    "{}.{}: {}",
                    call.contract_name, call.function_name, e
                ))
            })?;

        let receipt = wait_for_receipt(provider, &tx, &config.confirmation).await?;
        info!(
            "=============== Call {}.{} txhash: {} (block {})",
            call.contract_name,
            call.function_name,
            tx,
            receipt
                .block_number
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );
        if !receipt.success {
            warn!(
                "call {}.{} reverted in tx {}",
                call.contract_name, call.function_name, tx
            );
        }

        outcomes.push(CallOutcome {
            contract_name: call.contract_name.clone(),
            function_name: call.function_name.clone(),
            tx,
            success: receipt.success,
        });
    }

    Ok(outcomes)
}

/// Poll for the receipt of `tx` until it is available, then wait one more
/// interval before returning it.
///
/// With no `max_wait` this never gives up on a pending transaction.
pub async fn wait_for_receipt<P: Provider + ?Sized>(
    provider: &P,
    tx: &TxHandle,
    confirmation: &ConfirmationConfig,
) -> Result<Receipt, DeployError> {
    let deadline = confirmation.max_wait.map(|max| Instant::now() + max);

    loop {
        let receipt = provider
            .get_receipt(tx)
            .await
            .map_err(|e: ProviderError| DeployError::Provider(e.to_string()))?;

        if let Some(receipt) = receipt {
            sleep(confirmation.poll_interval).await;
            return Ok(receipt);
        }

        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(DeployError::ConfirmationTimeout(tx.to_string()));
        }
        sleep(confirmation.poll_interval).await;
    }
}
