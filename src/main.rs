//! Launchpad command line client
//!
//! Drives the presale flows against a Solana cluster. Project and receipt
//! records are read from JSON files exported from the document store.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use launchpad_client::checkpoint::{CheckpointStore, SledCheckpointStore};
use launchpad_client::config::Config;
use launchpad_client::flows::{
    ClaimFlow, FlowContext, LaunchPhase, MarketLaunchOrchestrator, PurchaseFlow, WithdrawFlow,
};
use launchpad_client::metrics::metrics;
use launchpad_client::rpc::SolanaRpc;
use launchpad_client::status::{derive_status, expiry_reason, unix_now};
use launchpad_client::tx_builder::{HttpPriorityFeeOracle, TransactionBuilder};
use launchpad_client::types::{ProjectRecord, PurchaseReceipt};
use launchpad_client::wallet::{KeypairWallet, WalletSigner};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Print the Prometheus text exposition before exiting
    #[arg(long)]
    dump_metrics: bool,

    /// Evaluate against this unix time instead of the clock
    #[arg(long)]
    now: Option<i64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the derived lifecycle status of a project
    Status {
        #[arg(long)]
        project: PathBuf,
    },
    /// Contribute to a presale
    Purchase {
        #[arg(long)]
        project: PathBuf,
        /// Amount in quote base units
        #[arg(long)]
        amount: u64,
    },
    /// Refresh the claimable amount of a purchase receipt
    CheckEligibility {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        receipt: PathBuf,
    },
    /// Claim vested tokens
    Claim {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        receipt: PathBuf,
    },
    /// Take back a contribution from a presale that missed its target
    Refund {
        #[arg(long)]
        project: PathBuf,
        #[arg(long)]
        receipt: PathBuf,
    },
    /// Withdraw vested LP tokens as the project authority
    WithdrawLp {
        #[arg(long)]
        project: PathBuf,
    },
    /// Create the market and launch the pool, resuming from a checkpoint
    Launch {
        /// Updated in place with the LP mint and vesting start
        #[arg(long)]
        project: PathBuf,
    },
    /// Show stored launch checkpoints
    Checkpoint {
        /// Only this project
        #[arg(long)]
        id: Option<Pubkey>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting launchpad client");
    let config = load_config(&args.config)?;
    let now = args.now.unwrap_or_else(unix_now);

    let result = run(args.command, &config, now).await;

    if args.dump_metrics {
        print!("{}", metrics().export_text()?);
    }
    result
}

async fn run(command: Command, config: &Config, now: i64) -> Result<()> {
    match command {
        Command::Status { project } => {
            let record: ProjectRecord = read_json(&project).await?;
            match derive_status(&record, now) {
                Some(status) => {
                    println!("{}: {status}", record.id);
                    if let Some(reason) = expiry_reason(&record, now) {
                        println!("expiry reason: {reason:?}");
                    }
                }
                None => println!("{}: undetermined (no presale deadline)", record.id),
            }
        }
        Command::Purchase { project, amount } => {
            let record: ProjectRecord = read_json(&project).await?;
            let (ctx, wallet) = connect(config)?;
            let flow = PurchaseFlow::new(ctx);
            let balance = flow.spendable_balance(&record, &wallet.pubkey()).await?;
            let confirmed = flow
                .purchase(&record, wallet.as_ref(), amount, balance, now)
                .await?;
            println!("purchase confirmed: {}", confirmed.signature);
        }
        Command::CheckEligibility { project, receipt } => {
            let record: ProjectRecord = read_json(&project).await?;
            let receipt: PurchaseReceipt = read_json(&receipt).await?;
            let (ctx, wallet) = connect(config)?;
            let confirmed = ClaimFlow::new(ctx)
                .check_eligibility(&record, &receipt, wallet.as_ref(), now)
                .await?;
            println!("eligibility checked: {}", confirmed.signature);
        }
        Command::Claim { project, receipt } => {
            let record: ProjectRecord = read_json(&project).await?;
            let receipt: PurchaseReceipt = read_json(&receipt).await?;
            println!(
                "claimable now: {}",
                ClaimFlow::preview_claimable(&record, &receipt, now)
            );
            let (ctx, wallet) = connect(config)?;
            let confirmed = ClaimFlow::new(ctx)
                .claim(&record, &receipt, wallet.as_ref(), now)
                .await?;
            println!("claim confirmed: {}", confirmed.signature);
        }
        Command::Refund { project, receipt } => {
            let record: ProjectRecord = read_json(&project).await?;
            let receipt: PurchaseReceipt = read_json(&receipt).await?;
            let (ctx, wallet) = connect(config)?;
            let confirmed = WithdrawFlow::new(ctx)
                .refund(&record, &receipt, wallet.as_ref(), now)
                .await?;
            println!("refund confirmed: {}", confirmed.signature);
        }
        Command::WithdrawLp { project } => {
            let record: ProjectRecord = read_json(&project).await?;
            let (ctx, wallet) = connect(config)?;
            let confirmed = WithdrawFlow::new(ctx)
                .withdraw_lp_tokens(&record, wallet.as_ref(), now)
                .await?;
            println!("LP withdrawal confirmed: {}", confirmed.signature);
        }
        Command::Launch { project } => {
            let mut record: ProjectRecord = read_json(&project).await?;
            let (ctx, wallet) = connect(config)?;
            let store = Arc::new(open_store(config)?);
            let orchestrator = MarketLaunchOrchestrator::new(ctx, store, config.market.clone());

            if let LaunchPhase::Checkpointed(checkpoint) = orchestrator.phase(&record).await? {
                info!(market = %checkpoint.market_id, "Resuming launch from checkpoint");
            }
            let signer: Arc<dyn WalletSigner> = wallet;
            let outcome = orchestrator.launch(&record, signer, now).await?;

            record.lp_mint = Some(outcome.lp_mint);
            record.vesting_started_at = Some(outcome.vesting_started_at);
            write_json(&project, &record).await?;

            println!("market:  {}", outcome.market);
            println!("amm:     {}", outcome.amm_id);
            println!("lp mint: {}", outcome.lp_mint);
        }
        Command::Checkpoint { id } => {
            let store = open_store(config)?;
            let entries = match id {
                Some(project) => store
                    .load(&project)
                    .await?
                    .map(|checkpoint| vec![(project, checkpoint)])
                    .unwrap_or_default(),
                None => store.list().await?,
            };
            if entries.is_empty() {
                println!("no checkpoints");
            }
            for (project, checkpoint) in entries {
                println!("{project}: {}", serde_json::to_string_pretty(&checkpoint)?);
            }
        }
    }
    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "launchpad=debug,launchpad_client=debug,info"
    } else {
        "launchpad=info,launchpad_client=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_target(true)))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        let mut config = Config::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

/// RPC handle, fee oracle, wallet and builder for the transacting commands
fn connect(config: &Config) -> Result<(FlowContext, Arc<KeypairWallet>)> {
    let programs = config.programs.resolve()?;
    let rpc = Arc::new(SolanaRpc::new(&config.rpc));
    let oracle = Arc::new(
        HttpPriorityFeeOracle::new(
            config.fee_oracle_url(),
            Duration::from_secs(config.rpc.timeout_secs),
        )
        .context("Failed to create fee oracle client")?,
    );
    let wallet = Arc::new(
        KeypairWallet::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?,
    );
    info!(rpc = %rpc.url(), wallet = %wallet.pubkey(), "Connected");

    let builder = TransactionBuilder::from_config(rpc, oracle, config);
    Ok((FlowContext::new(builder, programs), wallet))
}

fn open_store(config: &Config) -> Result<SledCheckpointStore> {
    SledCheckpointStore::open(&config.storage.checkpoint_path)
        .with_context(|| format!("Failed to open checkpoint store at {}", config.storage.checkpoint_path))
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

async fn write_json(path: &Path, record: &ProjectRecord) -> Result<()> {
    let content = serde_json::to_string_pretty(record)?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
