//! The phase engines: deploy, upgrade, call and verify.
//!
//! Every engine takes the document it mutates by reference and processes
//! entries strictly in document order, one provider operation at a time.

mod call;
mod deploy;
mod upgrade;
mod verify;

pub use call::{run_calls, wait_for_receipt};
pub use deploy::run_deploy;
pub use upgrade::run_upgrade;
pub use verify::run_verify;

use std::time::Duration;

/// Sleep for the pacing delay, if any
pub(crate) async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
