//! Definitions of errors that can occur while orchestrating a deployment

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of a deployment phase
#[derive(Debug)]
pub enum DeployError {
    /// Error reading a persisted state document
    ReadState(String),
    /// Error writing a persisted state document
    WriteState(String),
    /// A persisted state document exists but could not be parsed
    MalformedState(String),
    /// Error querying the provider outside of a unit operation
    Provider(String),
    /// Error deploying a unit
    Deployment(String),
    /// Error upgrading a unit
    Upgrade(String),
    /// Error invoking a function on a deployed unit
    Invocation(String),
    /// A transaction was not confirmed within the configured maximum wait
    ConfirmationTimeout(String),
    /// Error verifying a unit's source
    Verification(String),
}

impl Display for DeployError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeployError::ReadState(s) => write!(f, "error reading state: {}", s),
            DeployError::WriteState(s) => write!(f, "error writing state: {}", s),
            DeployError::MalformedState(s) => write!(f, "malformed state document: {}", s),
            DeployError::Provider(s) => write!(f, "provider error: {}", s),
            DeployError::Deployment(s) => write!(f, "error deploying unit: {}", s),
            DeployError::Upgrade(s) => write!(f, "error upgrading unit: {}", s),
            DeployError::Invocation(s) => write!(f, "error invoking function: {}", s),
            DeployError::ConfirmationTimeout(s) => {
                write!(f, "transaction not confirmed in time: {}", s)
            }
            DeployError::Verification(s) => write!(f, "error verifying unit: {}", s),
        }
    }
}

impl Error for DeployError {}

/// The error returned by every [`Provider`](crate::provider::Provider) operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError(pub String);

impl ProviderError {
    /// Construct a provider error from anything displayable
    pub fn new(msg: impl Display) -> Self {
        ProviderError(msg.to_string())
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for ProviderError {}
