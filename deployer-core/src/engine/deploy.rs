//! The deploy phase

use tracing::{error, info};

use crate::{
    config::{EngineConfig, FailurePolicy},
    errors::{DeployError, ProviderError},
    placeholder::propagate_to_units,
    provider::Provider,
    types::{arg_values, DeployMode, PhaseReport, UnitDocument},
};

use super::pace;

/// Deploy every unit not yet deployed, in document order.
///
/// Each new address is propagated into later units' arguments before they
/// are deployed. Under [`FailurePolicy::AbortOnError`] the first failure is
/// returned; otherwise it is recorded in the report and the phase moves on.
pub async fn run_deploy<P: Provider + ?Sized>(
    provider: &P,
    units: &mut UnitDocument,
    mode: DeployMode,
    config: &EngineConfig,
) -> Result<PhaseReport, DeployError> {
    info!("============ Start to deploy project's contracts ============");
    let mut report = PhaseReport::default();

    let names: Vec<String> = units.keys().cloned().collect();
    for name in names {
        match deploy_unit(provider, units, &name, mode, config).await {
            Ok(Some(address)) => {
                info!("deploy contract {name} new: {address}");
                report.succeeded.push(name);
            }
            Ok(None) => report.skipped.push(name),
            Err(e) => {
                error!("deploy contract {name} failed: {e}");
                if config.failure_policy == FailurePolicy::AbortOnError {
                    return Err(DeployError::Deployment(format!("{name}: {e}")));
                }
                report.failed.push((name, e.to_string()));
            }
        }
    }

    info!("==================== Deploy done ====================");
    Ok(report)
}

/// Deploy a single unit, returning its new address or `None` if it was
/// already deployed
async fn deploy_unit<P: Provider + ?Sized>(
    provider: &P,
    units: &mut UnitDocument,
    name: &str,
    mode: DeployMode,
    config: &EngineConfig,
) -> Result<Option<String>, ProviderError> {
    let Some(record) = units.get(name) else {
        return Ok(None);
    };
    if record.deployed {
        info!("deploy contract {name} exists: {}", record.address);
        return Ok(None);
    }

    let address = match mode {
        DeployMode::Direct => {
            info!("deploying contract {name}");
            provider.create(name, &arg_values(&record.constructor_args)).await?
        }
        DeployMode::Proxy => {
            let init_args = arg_values(&record.upgrade_args);
            pace(config.pacing_delay).await;
            info!("deploying contract {name} behind proxy");
            provider.create_proxy(name, &init_args).await?
        }
    };

    if let Some(record) = units.get_mut(name) {
        record.address = address.clone();
        record.deployed = true;
        record.verified = false;
        if mode == DeployMode::Proxy {
            record.upgraded = true;
        }
    }

    propagate_to_units(units, name, &address);
    Ok(Some(address))
}

#[cfg(test)]
mod tests {
    use crate::{
        config::EngineConfig,
        errors::DeployError,
        test_helpers::MockProvider,
        types::{Arg, DeployMode, UnitDocument, UnitRecord},
    };

    use super::run_deploy;

    fn two_units() -> UnitDocument {
        let mut units = UnitDocument::new();
        units.insert("A".to_string(), UnitRecord::default());
        units.insert(
            "B".to_string(),
            UnitRecord::with_constructor_args(vec![Arg::reference("A")]),
        );
        units
    }

    fn quiet(config: EngineConfig) -> EngineConfig {
        config.with_pacing_delay(std::time::Duration::ZERO)
    }

    #[tokio::test]
    async fn test_direct_deploy_sets_flags() {
        let provider = MockProvider::new();
        let mut units = two_units();
        units["A"].verified = true;

        let config = quiet(EngineConfig::direct());
        let report = run_deploy(&provider, &mut units, DeployMode::Direct, &config)
            .await
            .unwrap();

        assert_eq!(report.succeeded, vec!["A", "B"]);
        assert!(units["A"].deployed);
        assert!(!units["A"].verified);
        assert!(!units["A"].upgraded);
        assert!(!units["A"].address.is_empty());
    }

    #[tokio::test]
    async fn test_proxy_deploy_marks_upgraded() {
        let provider = MockProvider::new();
        let mut units = UnitDocument::new();
        units.insert(
            "A".to_string(),
            UnitRecord::with_upgrade_args(vec![Arg::literal("owner")]),
        );

        let config = quiet(EngineConfig::proxy());
        run_deploy(&provider, &mut units, DeployMode::Proxy, &config)
            .await
            .unwrap();

        assert!(units["A"].deployed);
        assert!(units["A"].upgraded);
        assert_eq!(provider.calls(), vec!["create_proxy A [\"owner\"]"]);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_at_first_failure() {
        let provider = MockProvider::new().fail_on("create", "A");
        let mut units = two_units();

        let config = quiet(EngineConfig::direct());
        let res = run_deploy(&provider, &mut units, DeployMode::Direct, &config).await;

        assert!(matches!(res, Err(DeployError::Deployment(_))));
        assert_eq!(provider.calls().len(), 1);
        assert!(!units["B"].deployed);
    }

    #[tokio::test]
    async fn test_continue_policy_records_failure() {
        let provider = MockProvider::new().fail_on("create", "A");
        let mut units = two_units();

        let config = quiet(EngineConfig::proxy());
        let report = run_deploy(&provider, &mut units, DeployMode::Direct, &config)
            .await
            .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.succeeded, vec!["B"]);
        // A never got an address, so B was created with the raw placeholder
        assert_eq!(units["B"].constructor_args, vec![Arg::reference("A")]);
    }
}
