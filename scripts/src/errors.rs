//! Definitions of errors that can occur during the execution of the deploy scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use deployer_core::errors::{DeployError, ProviderError};

/// Errors that can occur during the execution of the deploy scripts
#[derive(Debug)]
pub enum ScriptError {
    /// Error initializing the RPC client
    ClientInitialization(String),
    /// Error reading or parsing a compilation artifact
    ArtifactParsing(String),
    /// Error encoding arguments for a constructor or method
    CalldataConstruction(String),
    /// Error deploying a contract
    ContractDeployment(String),
    /// Error calling a contract method or reading chain state
    ContractInteraction(String),
    /// Error running the source verification command
    Verification(String),
    /// Error reading a default document passed on the command line
    ReadDefaults(String),
    /// Error switching the active configuration
    ConfigSwitch(String),
    /// Error raised by the orchestration engine
    Deploy(DeployError),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::CalldataConstruction(s) => write!(f, "error constructing calldata: {}", s),
            ScriptError::ContractDeployment(s) => write!(f, "error deploying contract: {}", s),
            ScriptError::ContractInteraction(s) => {
                write!(f, "error interacting with contract: {}", s)
            }
            ScriptError::Verification(s) => write!(f, "error verifying contract: {}", s),
            ScriptError::ReadDefaults(s) => write!(f, "error reading defaults: {}", s),
            ScriptError::ConfigSwitch(s) => write!(f, "error switching config: {}", s),
            ScriptError::Deploy(e) => write!(f, "{}", e),
        }
    }
}

impl Error for ScriptError {}

impl From<DeployError> for ScriptError {
    fn from(e: DeployError) -> Self {
        ScriptError::Deploy(e)
    }
}

impl From<ScriptError> for ProviderError {
    fn from(e: ScriptError) -> Self {
        ProviderError(e.to_string())
    }
}
