//! Constants used in the deploy scripts

/// The default RPC URL, a local development node
pub const DEFAULT_RPC_URL: &str = "http://localhost:8545";

/// The default directory holding compilation artifacts
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// The default directory holding the unit and call documents
pub const DEFAULT_DATA_DIR: &str = ".";

/// The default base name of the configuration switched by `switch-config`
pub const DEFAULT_SWITCH_BASE: &str = ".hardhat.data";

/// The environment variables consulted, in order, for the user's home directory
pub const HOME_ENV_VARS: [&str; 2] = ["HOME", "USERPROFILE"];

/// The extension of a JSON compilation artifact
pub const ARTIFACT_EXTENSION: &str = "json";

/// The ABI key in a compilation artifact
pub const ARTIFACT_ABI_KEY: &str = "abi";

/// The bytecode key in a compilation artifact
pub const ARTIFACT_BYTECODE_KEY: &str = "bytecode";

/// The nested bytecode key used by Foundry artifacts
pub const ARTIFACT_BYTECODE_OBJECT_KEY: &str = "object";

/// The name of the proxy contract artifact.
///
/// Compiled from https://github.com/OpenZeppelin/openzeppelin-contracts/blob/v5.0.0/contracts/proxy/transparent/TransparentUpgradeableProxy.sol
pub const PROXY_ARTIFACT: &str = "TransparentUpgradeableProxy";

/// The name of the initializer called when a unit is created behind a proxy
pub const INITIALIZER_FUNCTION: &str = "initialize";

/// The storage slot containing the proxy admin contract address in the upgradeable proxy.
///
/// This is specified in EIP1967: https://eips.ethereum.org/EIPS/eip-1967#admin-address
pub const PROXY_ADMIN_STORAGE_SLOT: &str =
    "0xb53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103";

/// The name of the `forge` command
pub const FORGE_COMMAND: &str = "forge";

/// The `forge` subcommand that verifies a contract's source
pub const VERIFY_CONTRACT_COMMAND: &str = "verify-contract";

/// The default interval between receipt polls, in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
