//! The verify phase

use tracing::{error, info};

use crate::{
    provider::Provider,
    types::{arg_values, PhaseReport, UnitDocument},
};

/// Verify every unverified unit with a known effective address.
///
/// A failed verification leaves that unit unverified and does not stop the
/// remaining units.
pub async fn run_verify<P: Provider + ?Sized>(
    provider: &P,
    units: &mut UnitDocument,
) -> PhaseReport {
    info!("============ Start verify contract ============");
    let mut report = PhaseReport::default();

    for (name, record) in units.iter_mut() {
        let address = record.effective_address().to_string();
        if record.verified || address.is_empty() {
            report.skipped.push(name.clone());
            continue;
        }

        info!("verify: {name} {address}");
        let args = arg_values(&record.constructor_args);
        match provider.verify_source(name, &address, &args).await {
            Ok(()) => {
                record.verified = true;
                report.succeeded.push(name.clone());
            }
            Err(e) => {
                error!("verify contract {name} failed: {e}");
                report.failed.push((name.clone(), e.to_string()));
            }
        }
    }

    info!("============ Verify contract done ============");
    report
}
