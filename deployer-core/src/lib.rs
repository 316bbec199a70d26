//! Resumable orchestration of multi-step deployments.
//!
//! Units are deployed, upgraded, called and verified through an opaque
//! [`Provider`](provider::Provider), with progress tracked in a per-environment
//! JSON document so that re-running any phase is safe.

#![deny(missing_docs)]

pub mod config;
pub mod engine;
pub mod errors;
pub mod placeholder;
pub mod provider;
pub mod session;
pub mod state;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod types;
