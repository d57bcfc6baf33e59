#![allow(clippy::print_stderr, clippy::print_stdout)]
mod build;
mod deploy;
mod error;
mod rpc;

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use common::{config::CONFIG_FILE_NAME, Config, NetworkConfig};
use contract_harness::Chain;
use deploy::{DeployArgs, DeployOverrides};
use error::DeployError;
use ethers_core::utils::to_checksum;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Options {
    /// Config file with networks and deploy defaults.
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: Utf8PathBuf,
    /// Network to use instead of the config's `default-network`.
    #[arg(long, global = true)]
    pub network: Option<String>,
    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Deploy the token and wait until the deployment is confirmed.
    Deploy {
        #[command(flatten)]
        overrides: DeployOverrides,
    },
    /// Compile a Solidity file into Hardhat-style artifacts using solc.
    Build {
        /// Solidity source file.
        path: Utf8PathBuf,
        /// Output directory (defaults to the configured artifacts directory).
        #[arg(long)]
        out_dir: Option<Utf8PathBuf>,
        /// Enable solc optimizer.
        #[arg(long)]
        optimize: bool,
        /// solc binary to use (overrides MDOT_SOLC_PATH).
        #[arg(long)]
        solc: Option<String>,
    },
    /// List the signer accounts of the selected network.
    Accounts,
}

#[tokio::main]
async fn main() {
    let opts = Options::parse();
    init_tracing(opts.verbose);
    if let Err(err) = run(&opts).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(opts: &Options) -> Result<(), DeployError> {
    let config = Config::load(&opts.config)?;
    let mut stdout = std::io::stdout();

    match &opts.command {
        Command::Deploy { overrides } => {
            let args = DeployArgs::resolve(&config.deploy, overrides)?;
            let (network_name, network) = config.network(opts.network.as_deref())?;
            tracing::info!("Deploying {} to {network_name}", args.contract);
            match network {
                NetworkConfig::InProcess(in_process) => {
                    deploy::deploy_in_process(in_process, &args, &mut stdout)?;
                }
                NetworkConfig::JsonRpc(json_rpc) => {
                    let mut json_rpc = json_rpc.clone();
                    if let Some(timeout) = overrides.timeout {
                        json_rpc.timeout_secs = timeout;
                    }
                    rpc::deploy(&json_rpc, &args, &mut stdout).await?;
                }
            }
        }
        Command::Build {
            path,
            out_dir,
            optimize,
            solc,
        } => {
            let out_dir = out_dir.as_ref().unwrap_or(&config.deploy.artifacts);
            build::build(path, out_dir, *optimize, solc.as_deref(), &mut stdout)?;
        }
        Command::Accounts => {
            let (_, network) = config.network(opts.network.as_deref())?;
            let accounts = match network {
                NetworkConfig::InProcess(in_process) => {
                    Chain::new(in_process.accounts).signers().to_vec()
                }
                NetworkConfig::JsonRpc(json_rpc) => rpc::accounts(json_rpc).await?,
            };
            for (index, account) in accounts.iter().enumerate() {
                writeln!(stdout, "{index}: {}", to_checksum(account, None))?;
            }
        }
    }
    Ok(())
}
