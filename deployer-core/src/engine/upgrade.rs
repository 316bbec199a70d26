//! The upgrade phase

use tracing::{error, info};

use crate::{
    errors::ProviderError,
    placeholder::propagate_to_units,
    provider::Provider,
    types::{PhaseReport, UnitDocument, UnitRecord},
};

/// Whether a unit is eligible for upgrade: deployed, addressed, and not yet
/// upgraded. Freshly proxied units are already marked upgraded and skip.
fn is_upgradeable(record: &UnitRecord) -> bool {
    record.deployed && !record.address.is_empty() && !record.upgraded
}

/// Upgrade every eligible unit in document order.
///
/// Failures are logged and recorded per unit; the phase always runs to the
/// end of the document.
pub async fn run_upgrade<P: Provider + ?Sized>(
    provider: &P,
    units: &mut UnitDocument,
) -> PhaseReport {
    info!("============ Start to upgrade project's contracts ============");
    let mut report = PhaseReport::default();

    let names: Vec<String> = units.keys().cloned().collect();
    for name in names {
        match upgrade_unit(provider, units, &name).await {
            Ok(Some(address)) => {
                info!("upgrade contract {name}: {address}");
                report.succeeded.push(name);
            }
            Ok(None) => report.skipped.push(name),
            Err(e) => {
                error!("upgrade contract {name} failed: {e}");
                report.failed.push((name, e.to_string()));
            }
        }
    }

    info!("==================== Upgrade done ====================");
    report
}

/// Upgrade a single unit, returning its new address or `None` if ineligible
async fn upgrade_unit<P: Provider + ?Sized>(
    provider: &P,
    units: &mut UnitDocument,
    name: &str,
) -> Result<Option<String>, ProviderError> {
    let current = match units.get(name) {
        Some(record) if is_upgradeable(record) => record.address.clone(),
        _ => return Ok(None),
    };

    let address = provider.upgrade_proxy(&current, name).await?;

    if let Some(record) = units.get_mut(name) {
        record.address = address.clone();
        record.upgraded_address = address.clone();
        record.deployed = true;
        record.upgraded = true;
        record.verified = false;
    }

    propagate_to_units(units, name, &address);
    Ok(Some(address))
}

#[cfg(test)]
mod tests {
    use crate::{
        test_helpers::MockProvider,
        types::{UnitDocument, UnitRecord},
    };

    use super::run_upgrade;

    fn deployed(address: &str, upgraded: bool) -> UnitRecord {
        UnitRecord {
            address: address.to_string(),
            deployed: true,
            upgraded,
            verified: true,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upgrade_gating() {
        let provider = MockProvider::new();
        let mut units = UnitDocument::new();
        units.insert("Fresh".to_string(), UnitRecord::default());
        units.insert("Done".to_string(), deployed("0x01", true));
        units.insert("Stale".to_string(), deployed("0x02", false));

        let report = run_upgrade(&provider, &mut units).await;

        assert_eq!(report.succeeded, vec!["Stale"]);
        assert_eq!(report.skipped, vec!["Fresh", "Done"]);
        assert_eq!(provider.calls(), vec!["upgrade_proxy Stale 0x02"]);

        let stale = &units["Stale"];
        assert!(stale.upgraded);
        assert!(!stale.verified);
        assert_eq!(stale.address, stale.upgraded_address);
    }

    #[tokio::test]
    async fn test_upgrade_runs_once() {
        let provider = MockProvider::new();
        let mut units = UnitDocument::new();
        units.insert("Stale".to_string(), deployed("0x02", false));

        run_upgrade(&provider, &mut units).await;
        let second = run_upgrade(&provider, &mut units).await;

        assert!(second.succeeded.is_empty());
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_upgrade_failure_leaves_unit_unchanged() {
        let provider = MockProvider::new().fail_on("upgrade_proxy", "A");
        let mut units = UnitDocument::new();
        units.insert("A".to_string(), deployed("0x01", false));
        units.insert("B".to_string(), deployed("0x02", false));

        let report = run_upgrade(&provider, &mut units).await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.succeeded, vec!["B"]);
        assert_eq!(units["A"], deployed("0x01", false));
    }
}
