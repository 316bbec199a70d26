//! Configuration knobs for the phase engines

use std::time::Duration;

/// The default interval between receipt polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The default delay inserted before each proxy creation and each call
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_millis(100);

/// What a phase does when a unit's provider operation fails
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log the failure, leave the unit in its prior state and move on
    ContinueOnError,
    /// Abort the whole run, surfacing the error without persisting
    AbortOnError,
}

/// How long to wait for a transaction to be confirmed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConfirmationConfig {
    /// The interval between receipt polls; also waited once after a receipt
    /// arrives
    pub poll_interval: Duration,
    /// The maximum time to wait for a receipt, `None` to wait indefinitely
    pub max_wait: Option<Duration>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        ConfirmationConfig {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }
}

/// Configuration shared by every phase engine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Failure handling in the deploy phase
    pub failure_policy: FailurePolicy,
    /// Confirmation waiting in the call phase
    pub confirmation: ConfirmationConfig,
    /// Delay before each proxy creation and each call
    pub pacing_delay: Duration,
}

impl EngineConfig {
    /// Defaults for direct deployments, which abort on the first error
    pub fn direct() -> Self {
        EngineConfig {
            failure_policy: FailurePolicy::AbortOnError,
            confirmation: ConfirmationConfig::default(),
            pacing_delay: DEFAULT_PACING_DELAY,
        }
    }

    /// Defaults for proxy deployments, which continue past failed units
    pub fn proxy() -> Self {
        EngineConfig {
            failure_policy: FailurePolicy::ContinueOnError,
            ..Self::direct()
        }
    }

    /// Override the failure policy
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Override the confirmation settings
    pub fn with_confirmation(mut self, confirmation: ConfirmationConfig) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Override the pacing delay
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::proxy()
    }
}
