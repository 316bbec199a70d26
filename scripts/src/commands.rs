//! Implementations of the various deploy scripts

use std::{fs, path::Path, time::Duration};

use deployer_core::{
    config::{ConfirmationConfig, EngineConfig, FailurePolicy},
    provider::Provider,
    session::{run_call_document, Session},
    types::{DeployMode, PhaseReport},
};
use itertools::Itertools;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::{
    cli::{CallArgs, DeployArgs, ProxyArgs, StateArgs, SwitchConfigArgs, VerifyArgs},
    errors::ScriptError,
    utils,
};

/// Deploy every contract in the unit document directly
pub async fn deploy(
    args: DeployArgs,
    provider: &impl Provider,
    data_dir: &Path,
) -> Result<(), ScriptError> {
    let policy = if args.continue_on_error {
        FailurePolicy::ContinueOnError
    } else {
        FailurePolicy::AbortOnError
    };
    let config = EngineConfig::direct().with_failure_policy(policy);

    let defaults = read_defaults(&args.state)?;
    let mut session = Session::before(provider, data_dir, defaults, config).await?;
    let report = session.deploy(DeployMode::Direct).await?;
    log_report("deploy", &report);
    session.after()?;

    Ok(())
}

/// Deploy every contract behind a proxy, then upgrade stale proxies
pub async fn deploy_proxy(
    args: ProxyArgs,
    provider: &impl Provider,
    data_dir: &Path,
) -> Result<(), ScriptError> {
    let policy = if args.abort_on_error {
        FailurePolicy::AbortOnError
    } else {
        FailurePolicy::ContinueOnError
    };
    let config = EngineConfig::proxy().with_failure_policy(policy);

    let defaults = read_defaults(&args.state)?;
    let mut session = Session::before(provider, data_dir, defaults, config).await?;
    let report = session.deploy(DeployMode::Proxy).await?;
    log_report("deploy", &report);
    let report = session.upgrade().await;
    log_report("upgrade", &report);
    session.after()?;

    Ok(())
}

/// Upgrade every deployed proxy not yet upgraded
pub async fn upgrade(
    args: StateArgs,
    provider: &impl Provider,
    data_dir: &Path,
) -> Result<(), ScriptError> {
    let defaults = read_defaults(&args)?;
    let mut session = Session::before(provider, data_dir, defaults, EngineConfig::proxy()).await?;
    let report = session.upgrade().await;
    log_report("upgrade", &report);
    session.after()?;

    Ok(())
}

/// Run the call document, waiting for each call to confirm
pub async fn call(
    args: CallArgs,
    provider: &impl Provider,
    data_dir: &Path,
) -> Result<(), ScriptError> {
    let confirmation = ConfirmationConfig {
        poll_interval: Duration::from_millis(args.poll_interval_ms),
        max_wait: args.max_wait_secs.map(Duration::from_secs),
    };
    let config = EngineConfig::proxy().with_confirmation(confirmation);

    let defaults = read_json_or_default(args.defaults.as_deref())?;
    let outcomes = run_call_document(provider, data_dir, defaults, config).await?;
    info!("{} call(s) confirmed", outcomes.len());

    Ok(())
}

/// Verify the source of every unverified contract
pub async fn verify(
    args: VerifyArgs,
    provider: &impl Provider,
    data_dir: &Path,
) -> Result<(), ScriptError> {
    let defaults = read_defaults(&args.state)?;
    let mut session = Session::before(provider, data_dir, defaults, EngineConfig::proxy()).await?;
    if session.units().is_empty() {
        warn!(
            "no units found in {}, nothing to verify",
            session.store().path().display()
        );
        return Ok(());
    }

    let report = session.verify().await;
    log_report("verify", &report);
    session.after()?;

    Ok(())
}

/// Activate a named configuration variant
pub fn switch_config(args: SwitchConfigArgs, data_dir: &Path) -> Result<(), ScriptError> {
    info!("switch config: {}", args.name);
    match utils::switch_config(data_dir, &args.base, &args.name)? {
        Some(path) => info!("activated {}", path.display()),
        None => warn!("no {}.{}.json found, nothing switched", args.base, args.name),
    }

    Ok(())
}

// -----------
// | Helpers |
// -----------

/// Read the default unit document named by the state arguments
fn read_defaults<T: DeserializeOwned + Default>(args: &StateArgs) -> Result<T, ScriptError> {
    read_json_or_default(args.defaults.as_deref())
}

/// Read a JSON document from `path`, or the type's default if none is given
fn read_json_or_default<T: DeserializeOwned + Default>(
    path: Option<&Path>,
) -> Result<T, ScriptError> {
    let Some(path) = path else {
        return Ok(T::default());
    };

    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ReadDefaults(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScriptError::ReadDefaults(format!("{}: {}", path.display(), e)))
}

/// Log a one-line summary of a phase, plus every failure
fn log_report(phase: &str, report: &PhaseReport) {
    info!(
        "{phase}: {} succeeded [{}], {} skipped, {} failed",
        report.succeeded.len(),
        report.succeeded.iter().join(", "),
        report.skipped.len(),
        report.failed.len()
    );
    for (unit, reason) in &report.failed {
        warn!("{phase} failed for {unit}: {reason}");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use deployer_core::{
        state::StateStore,
        test_helpers::MockProvider,
        types::{UnitDocument, UnitRecord},
    };

    use crate::cli::{StateArgs, VerifyArgs};

    use super::verify;

    fn verify_args() -> VerifyArgs {
        VerifyArgs {
            state: StateArgs { defaults: None },
            etherscan_api_key: None,
        }
    }

    #[tokio::test]
    async fn test_verify_without_units_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let provider = MockProvider::new();

        verify(verify_args(), &provider, dir.path()).await.unwrap();

        assert!(!dir.path().join(".data.json").exists());
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_verify_persists_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".data.json");

        let mut units = UnitDocument::new();
        units.insert(
            "Treasury".to_string(),
            UnitRecord {
                address: "0x01".to_string(),
                deployed: true,
                ..Default::default()
            },
        );
        StateStore::new(path.clone()).save(&units).unwrap();

        let provider = MockProvider::new();
        verify(verify_args(), &provider, dir.path()).await.unwrap();

        let persisted: UnitDocument =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert!(persisted["Treasury"].verified);
    }
}
