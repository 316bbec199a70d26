//! Definitions of CLI arguments and commands for deploy scripts

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::{
    commands::{call, deploy, deploy_proxy, switch_config, upgrade, verify},
    constants::{
        DEFAULT_ARTIFACTS_DIR, DEFAULT_DATA_DIR, DEFAULT_POLL_INTERVAL_MS, DEFAULT_RPC_URL,
        DEFAULT_SWITCH_BASE,
    },
    errors::ScriptError,
    provider::EvmProvider,
    utils::setup_client,
};

/// Deploy, upgrade, call and verify contracts, tracking progress in
/// per-chain state files so that every command can be safely re-run
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Private key of the deployer
    #[arg(short, long, env = "PKEY")]
    pub priv_key: Option<String>,

    /// Network RPC URL
    #[arg(short, long, env = "RPC_URL", default_value = DEFAULT_RPC_URL)]
    pub rpc_url: String,

    /// Directory holding the `.data.json` and `.callData.json` state files
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Directory holding the contracts' compilation artifacts
    #[arg(short, long, default_value = DEFAULT_ARTIFACTS_DIR)]
    pub artifacts_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// The available commands
#[derive(Subcommand)]
pub enum Command {
    /// Deploy every not-yet-deployed contract directly
    Deploy(DeployArgs),
    /// Deploy every not-yet-deployed contract behind a proxy, then upgrade
    /// deployed proxies that are not yet upgraded
    Proxy(ProxyArgs),
    /// Upgrade deployed proxies that are not yet upgraded
    Upgrade(StateArgs),
    /// Run the enabled calls of the call document in order
    Call(CallArgs),
    /// Verify the source of every unverified contract
    Verify(VerifyArgs),
    /// Activate a named configuration variant
    SwitchConfig(SwitchConfigArgs),
}

impl Command {
    /// Run the command against the given connection settings
    pub async fn run(
        self,
        priv_key: Option<&str>,
        rpc_url: &str,
        data_dir: &Path,
        artifacts_dir: &Path,
    ) -> Result<(), ScriptError> {
        match self {
            Command::SwitchConfig(args) => switch_config(args, data_dir),
            Command::Deploy(args) => {
                let provider = connect(priv_key, rpc_url, artifacts_dir)?;
                deploy(args, &provider, data_dir).await
            }
            Command::Proxy(args) => {
                let provider = connect(priv_key, rpc_url, artifacts_dir)?;
                deploy_proxy(args, &provider, data_dir).await
            }
            Command::Upgrade(args) => {
                let provider = connect(priv_key, rpc_url, artifacts_dir)?;
                upgrade(args, &provider, data_dir).await
            }
            Command::Call(args) => {
                let provider = connect(priv_key, rpc_url, artifacts_dir)?;
                call(args, &provider, data_dir).await
            }
            Command::Verify(args) => {
                let provider = connect(priv_key, rpc_url, artifacts_dir)?
                    .with_etherscan_api_key(args.etherscan_api_key.clone());
                verify(args, &provider, data_dir).await
            }
        }
    }
}

/// Build the on-chain provider, which every command but `switch-config` needs
fn connect(
    priv_key: Option<&str>,
    rpc_url: &str,
    artifacts_dir: &Path,
) -> Result<EvmProvider, ScriptError> {
    let priv_key = priv_key.ok_or_else(|| {
        ScriptError::ClientInitialization("no deployer private key given".to_string())
    })?;
    let (client, deployer) = setup_client(priv_key, rpc_url)?;

    Ok(EvmProvider::new(client, deployer, artifacts_dir.to_path_buf()))
}

/// Arguments shared by every command that loads the unit document
#[derive(Args)]
pub struct StateArgs {
    /// JSON file holding the default unit document, used when no state
    /// file exists yet
    #[arg(long)]
    pub defaults: Option<PathBuf>,
}

/// Deploy contracts directly
#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Keep deploying the remaining contracts after one fails, instead of
    /// aborting the run
    #[arg(long)]
    pub continue_on_error: bool,
}

/// Deploy contracts behind upgradeable proxies.
///
/// Concretely, each proxy is a [`TransparentUpgradeableProxy`](https://docs.openzeppelin.com/contracts/5.x/api/proxy#transparent_proxy),
/// which itself deploys a `ProxyAdmin` contract owned by the deployer.
#[derive(Args)]
pub struct ProxyArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Abort the run on the first failed deployment, instead of moving on
    #[arg(long)]
    pub abort_on_error: bool,
}

/// Run the call document
#[derive(Args)]
pub struct CallArgs {
    /// JSON file holding the default call document, used when no call
    /// file exists yet
    #[arg(long)]
    pub defaults: Option<PathBuf>,

    /// Interval between transaction receipt polls, in milliseconds
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Give up waiting for a transaction receipt after this many seconds.
    /// Waits indefinitely if unset
    #[arg(long)]
    pub max_wait_secs: Option<u64>,
}

/// Verify contract sources
#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub state: StateArgs,

    /// Block explorer API key passed to the verification command
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    pub etherscan_api_key: Option<String>,
}

/// Copy `<base>.<name>.json` over `<base>.json`, looking in the home
/// directory first and then in the data directory
#[derive(Args)]
pub struct SwitchConfigArgs {
    /// The name of the variant to activate
    pub name: String,

    /// The base name of the configuration file
    #[arg(long, default_value = DEFAULT_SWITCH_BASE)]
    pub base: String,
}
