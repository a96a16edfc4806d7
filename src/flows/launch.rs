//! Market and liquidity-pool launch
//!
//! The launch is a two-step saga:
//!
//! 1. **create_market**: allocate the order-book market, its queues, books
//!    and vaults (two transactions), then persist a `CheckpointRecord`.
//! 2. **launch_pool**: verify the checkpoint, size the market from the token
//!    supply, and initialize the market and create the pool in one
//!    transaction.
//!
//! Re-running after a crash resumes from the checkpoint. Phase-1 accounts live
//! at seed-derived addresses, so a sub-transaction whose first account already
//! exists is skipped rather than re-sent. When the pool already exists the
//! vesting start is the pool's on-chain open time, never the retry's clock.

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::sync::Arc;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::MarketConfig;
use crate::error::{LaunchpadError, Result};
use crate::flows::{require_signer, require_status, FlowContext};
use crate::metrics::metrics;
use crate::observability::TraceContext;
use crate::program::amm::pool_open_time;
use crate::program::launchpad::{LaunchPoolAccounts, LaunchpadInstruction};
use crate::program::market::{
    self, create_market_account_instructions, create_vault_instructions,
    initialize_market_instruction, lot_sizes, market_seed, sizing_for_supply, vault_signer,
    MarketAccounts, MarketRent, EVENT_QUEUE_SIZE, MARKET_ACCOUNT_SIZE, ORDERBOOK_SIZE,
    REQUEST_QUEUE_SIZE, TOKEN_ACCOUNT_SIZE,
};
use crate::program::{pda, AmmAccounts, LotSizes, MarketSizing};
use crate::structured_logging::StructuredLogger;
use crate::types::{CheckpointRecord, ProjectRecord};
use crate::wallet::WalletSigner;
use crate::workflow::{Saga, SagaReport, SagaStep};

pub const CREATE_MARKET_STEP: &str = "create_market";
pub const LAUNCH_POOL_STEP: &str = "launch_pool";

/// Where a project stands in the launch workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchPhase {
    NoCheckpoint,
    Checkpointed(CheckpointRecord),
    /// The record carries an LP mint
    Done,
}

/// Result of a completed launch
///
/// The caller updates the project record with `lp_mint` and
/// `vesting_started_at`. The latter is the pool's open time, which equals the
/// `now` of the run that created the pool.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub market: Pubkey,
    pub amm_id: Pubkey,
    pub lp_mint: Pubkey,
    pub vesting_started_at: i64,
    pub sizing: Option<MarketSizing>,
    pub lots: Option<LotSizes>,
    pub phase1_signatures: Vec<Signature>,
    pub phase2_signature: Option<Signature>,
    pub report: SagaReport,
}

/// Mutable state threaded through the launch steps
struct LaunchContext {
    record: ProjectRecord,
    wallet: Arc<dyn WalletSigner>,
    now: i64,
    checkpoint: Option<CheckpointRecord>,
    amm: Option<AmmAccounts>,
    vesting_started_at: Option<i64>,
    sizing: Option<MarketSizing>,
    lots: Option<LotSizes>,
    phase1_signatures: Vec<Signature>,
    phase2_signature: Option<Signature>,
    logger: StructuredLogger,
}

impl LaunchContext {
    fn checkpoint(&self) -> Result<&CheckpointRecord> {
        self.checkpoint.as_ref().ok_or_else(|| {
            LaunchpadError::inconsistent(self.record.id, "pool launch reached without a checkpoint")
        })
    }
}

pub struct MarketLaunchOrchestrator {
    ctx: FlowContext,
    store: Arc<dyn CheckpointStore>,
    market_config: MarketConfig,
}

impl MarketLaunchOrchestrator {
    pub fn new(ctx: FlowContext, store: Arc<dyn CheckpointStore>, market_config: MarketConfig) -> Self {
        Self {
            ctx,
            store,
            market_config,
        }
    }

    pub async fn phase(&self, record: &ProjectRecord) -> Result<LaunchPhase> {
        if record.is_launched() {
            return Ok(LaunchPhase::Done);
        }
        Ok(match self.store.load(&record.id).await? {
            Some(checkpoint) => LaunchPhase::Checkpointed(checkpoint),
            None => LaunchPhase::NoCheckpoint,
        })
    }

    fn saga(&self) -> Saga<LaunchContext> {
        Saga::new()
            .step(CreateMarketStep {
                ctx: self.ctx.clone(),
                store: self.store.clone(),
            })
            .step(LaunchPoolStep {
                ctx: self.ctx.clone(),
                market_config: self.market_config.clone(),
            })
    }

    /// Run the launch, resuming from a stored checkpoint if there is one
    ///
    /// Must not run concurrently for the same project: two callers that both
    /// see no checkpoint would both run phase 1.
    pub async fn launch(
        &self,
        record: &ProjectRecord,
        wallet: Arc<dyn WalletSigner>,
        now: i64,
    ) -> Result<LaunchOutcome> {
        if record.is_launched() {
            return Err(LaunchpadError::AlreadyLaunched { project: record.id });
        }
        require_status("launch", record, now, |s| s.allows_launch())?;
        require_signer(&record.authority, &wallet.pubkey(), "Launch")?;

        let trace_ctx = TraceContext::for_project("launch", &record.id.to_string());
        let logger = StructuredLogger::new(&trace_ctx);
        logger.log_flow_started(&wallet.pubkey().to_string());

        let mut launch = LaunchContext {
            record: record.clone(),
            wallet,
            now,
            checkpoint: None,
            amm: None,
            vesting_started_at: None,
            sizing: None,
            lots: None,
            phase1_signatures: Vec::new(),
            phase2_signature: None,
            logger,
        };
        let report = self.saga().run(&mut launch, &trace_ctx).await?;

        let checkpoint = launch.checkpoint()?.clone();
        let amm = launch
            .amm
            .unwrap_or_else(|| AmmAccounts::derive(&self.ctx.programs.amm, &checkpoint.market_id));
        let vesting_started_at = launch.vesting_started_at.ok_or_else(|| {
            LaunchpadError::inconsistent(record.id, format!("no open time known for pool {}", amm.amm_id))
        })?;

        info!(
            project = %record.id,
            market = %checkpoint.market_id,
            lp_mint = %amm.lp_mint,
            executed = ?report.executed,
            skipped = ?report.skipped,
            "Launch complete"
        );

        Ok(LaunchOutcome {
            market: checkpoint.market_id,
            amm_id: amm.amm_id,
            lp_mint: amm.lp_mint,
            vesting_started_at,
            sizing: launch.sizing,
            lots: launch.lots,
            phase1_signatures: launch.phase1_signatures,
            phase2_signature: launch.phase2_signature,
            report,
        })
    }

    /// Re-derive and check a stored checkpoint against the chain
    pub async fn verify_checkpoint(
        &self,
        record: &ProjectRecord,
        checkpoint: &CheckpointRecord,
    ) -> Result<()> {
        verify_checkpoint(&self.ctx, record, checkpoint).await
    }
}

async fn verify_checkpoint(
    ctx: &FlowContext,
    record: &ProjectRecord,
    checkpoint: &CheckpointRecord,
) -> Result<()> {
    let project = record.id;
    let openbook = ctx.programs.openbook;

    let expected_seed = market_seed(&project);
    if checkpoint.market_seed != expected_seed {
        return Err(LaunchpadError::inconsistent(
            project,
            format!("seed {} does not match project seed {expected_seed}", checkpoint.market_seed),
        ));
    }

    let derived = MarketAccounts::derive(&record.authority, &checkpoint.market_seed, &openbook)?;
    let pairs = [
        ("market", derived.market, checkpoint.market_id),
        ("request queue", derived.request_queue, checkpoint.request_queue),
        ("event queue", derived.event_queue, checkpoint.event_queue),
        ("bids", derived.bids, checkpoint.bids),
        ("asks", derived.asks, checkpoint.asks),
        ("base vault", derived.base_vault, checkpoint.base_vault),
        ("quote vault", derived.quote_vault, checkpoint.quote_vault),
    ];
    for (label, expected, stored) in pairs {
        if expected != stored {
            return Err(LaunchpadError::inconsistent(
                project,
                format!("{label} is {stored}, expected {expected}"),
            ));
        }
    }

    if vault_signer(&checkpoint.market_id, checkpoint.vault_signer_nonce, &openbook).is_none() {
        return Err(LaunchpadError::inconsistent(
            project,
            format!("vault signer nonce {} is not valid", checkpoint.vault_signer_nonce),
        ));
    }

    if !ctx.rpc().account_exists(&checkpoint.market_id).await? {
        return Err(LaunchpadError::inconsistent(
            project,
            format!("market account {} does not exist on-chain", checkpoint.market_id),
        ));
    }
    Ok(())
}

/// Phase 1: allocate market accounts and persist the checkpoint
struct CreateMarketStep {
    ctx: FlowContext,
    store: Arc<dyn CheckpointStore>,
}

impl CreateMarketStep {
    async fn rent(&self) -> Result<MarketRent> {
        let rpc = self.ctx.rpc();
        let (market, request_queue, event_queue, orderbook, token_account) = tokio::try_join!(
            rpc.rent_exempt_minimum(MARKET_ACCOUNT_SIZE),
            rpc.rent_exempt_minimum(REQUEST_QUEUE_SIZE),
            rpc.rent_exempt_minimum(EVENT_QUEUE_SIZE),
            rpc.rent_exempt_minimum(ORDERBOOK_SIZE),
            rpc.rent_exempt_minimum(TOKEN_ACCOUNT_SIZE),
        )?;
        Ok(MarketRent {
            market,
            request_queue,
            event_queue,
            orderbook,
            token_account,
        })
    }
}

#[async_trait]
impl SagaStep<LaunchContext> for CreateMarketStep {
    fn name(&self) -> &'static str {
        CREATE_MARKET_STEP
    }

    async fn is_committed(&self, ctx: &mut LaunchContext) -> Result<bool> {
        match self.store.load(&ctx.record.id).await? {
            Some(checkpoint) => {
                ctx.checkpoint = Some(checkpoint);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn execute(&self, ctx: &mut LaunchContext, trace_ctx: &TraceContext) -> Result<()> {
        let authority = ctx.wallet.pubkey();
        let openbook = self.ctx.programs.openbook;
        let seed = market_seed(&ctx.record.id);
        let accounts = MarketAccounts::derive(&authority, &seed, &openbook)?;
        let (signer, nonce) = market::find_vault_signer(&accounts.market, &openbook)
            .ok_or_else(|| {
                LaunchpadError::validation(format!("No vault signer nonce for market {}", accounts.market))
            })?;
        let rent = self.rent().await?;
        let rpc = self.ctx.rpc();

        if rpc.account_exists(&accounts.base_vault).await? {
            warn!(vault = %accounts.base_vault, "Market vaults already exist, skipping creation");
        } else {
            let draft = create_vault_instructions(
                &authority,
                &accounts,
                &signer,
                &ctx.record.token_mint,
                &ctx.record.quote_mint,
                &rent,
            )?;
            let confirmed = self
                .ctx
                .builder
                .build_and_send(draft, ctx.wallet.as_ref(), &trace_ctx.child_span("launch.vaults"))
                .await?;
            ctx.phase1_signatures.push(confirmed.signature);
        }

        if rpc.account_exists(&accounts.market).await? {
            warn!(market = %accounts.market, "Market accounts already exist, skipping creation");
        } else {
            let draft = create_market_account_instructions(&authority, &accounts, &rent, &openbook);
            let confirmed = self
                .ctx
                .builder
                .build_and_send(draft, ctx.wallet.as_ref(), &trace_ctx.child_span("launch.market"))
                .await?;
            ctx.phase1_signatures.push(confirmed.signature);
        }

        ctx.checkpoint = Some(CheckpointRecord {
            market_id: accounts.market,
            market_seed: seed,
            base_vault: accounts.base_vault,
            quote_vault: accounts.quote_vault,
            request_queue: accounts.request_queue,
            event_queue: accounts.event_queue,
            bids: accounts.bids,
            asks: accounts.asks,
            vault_signer_nonce: nonce,
        });
        Ok(())
    }

    async fn persist(&self, ctx: &mut LaunchContext) -> Result<()> {
        let checkpoint = ctx.checkpoint()?.clone();
        self.store.save(&ctx.record.id, &checkpoint).await?;
        metrics().checkpoints_written.inc();
        ctx.logger.log_checkpoint_written(&checkpoint.market_id.to_string());
        Ok(())
    }
}

/// Phase 2: initialize the market and create the pool in one transaction
struct LaunchPoolStep {
    ctx: FlowContext,
    market_config: MarketConfig,
}

#[async_trait]
impl SagaStep<LaunchContext> for LaunchPoolStep {
    fn name(&self) -> &'static str {
        LAUNCH_POOL_STEP
    }

    async fn is_committed(&self, ctx: &mut LaunchContext) -> Result<bool> {
        let market = ctx.checkpoint()?.market_id;
        let amm = AmmAccounts::derive(&self.ctx.programs.amm, &market);
        let Some(data) = self.ctx.rpc().account_data(&amm.amm_id).await? else {
            return Ok(false);
        };

        // Created by an earlier run whose caller never recorded the outcome.
        let open_time = pool_open_time(&data)
            .and_then(|t| i64::try_from(t).ok())
            .ok_or_else(|| {
                LaunchpadError::inconsistent(
                    ctx.record.id,
                    format!("pool {} exists but its open time is unreadable", amm.amm_id),
                )
            })?;
        info!(pool = %amm.amm_id, open_time, "Pool already exists, using its open time");
        ctx.amm = Some(amm);
        ctx.vesting_started_at = Some(open_time);
        Ok(true)
    }

    async fn check_preconditions(&self, ctx: &mut LaunchContext) -> Result<()> {
        verify_checkpoint(&self.ctx, &ctx.record, ctx.checkpoint()?).await
    }

    async fn execute(&self, ctx: &mut LaunchContext, trace_ctx: &TraceContext) -> Result<()> {
        let checkpoint = ctx.checkpoint()?.clone();
        let programs = self.ctx.programs;
        let record = &ctx.record;

        let sizing = sizing_for_supply(record.total_supply_tokens());
        let lots = lot_sizes(sizing, record.token_decimals, record.quote_decimals)?;
        info!(
            supply_tokens = record.total_supply_tokens(),
            tick_size = sizing.tick_size,
            order_size = sizing.order_size,
            base_lot = lots.base_lot_size,
            quote_lot = lots.quote_lot_size,
            "Market sizing selected"
        );

        let accounts = MarketAccounts {
            seed: checkpoint.market_seed.clone(),
            market: checkpoint.market_id,
            request_queue: checkpoint.request_queue,
            event_queue: checkpoint.event_queue,
            bids: checkpoint.bids,
            asks: checkpoint.asks,
            base_vault: checkpoint.base_vault,
            quote_vault: checkpoint.quote_vault,
        };
        let init_market = initialize_market_instruction(
            &programs.openbook,
            &accounts,
            &record.token_mint,
            &record.quote_mint,
            lots,
            self.market_config.fee_rate_bps,
            checkpoint.vault_signer_nonce,
            self.market_config.pc_dust_threshold,
        )?;

        let amm = AmmAccounts::derive(&programs.amm, &checkpoint.market_id);
        let launch_accounts = LaunchPoolAccounts {
            authority: ctx.wallet.pubkey(),
            project: record.id,
            project_authority: pda::project_authority(&programs.launchpad, &record.id).0,
            token_mint: record.token_mint,
            quote_mint: record.quote_mint,
            token_vault: pda::token_vault(&programs.launchpad, &record.id).0,
            quote_vault: pda::quote_vault(&programs.launchpad, &record.id).0,
            lp_vault: pda::lp_vault(&programs.launchpad, &record.id).0,
            market: checkpoint.market_id,
            openbook_program: programs.openbook,
            amm_program: programs.amm,
            amm,
        };
        let open_time = ctx.now.max(0);
        let launch_pool = LaunchpadInstruction::launch_pool(launch_accounts, open_time as u64)?
            .into_instruction(&programs.launchpad)?;

        let confirmed = self
            .ctx
            .builder
            .build_and_send(vec![init_market, launch_pool], ctx.wallet.as_ref(), trace_ctx)
            .await?;

        ctx.phase2_signature = Some(confirmed.signature);
        ctx.amm = Some(amm);
        ctx.vesting_started_at = Some(open_time);
        ctx.sizing = Some(sizing);
        ctx.lots = Some(lots);
        Ok(())
    }
}
