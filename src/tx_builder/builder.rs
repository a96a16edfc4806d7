//! Core TransactionBuilder implementation
//!
//! `build_and_send` takes a draft instruction list and a signer and returns
//! only once the transaction is observed at "confirmed" commitment or has
//! definitively failed:
//!
//! 1. Fee estimate, compute simulation and blockhash fetch run concurrently
//! 2. Compute-budget instructions are prepended to the draft
//! 3. A v0 message is compiled against the fetched blockhash
//! 4. The wallet signs (it may decline)
//! 5. The signed transaction is sent with preflight disabled
//! 6. Confirmation is polled until success, failure, or blockhash expiry

use solana_sdk::{
    address_lookup_table::AddressLookupTableAccount,
    instruction::Instruction,
    message::{v0::Message as MessageV0, VersionedMessage},
    pubkey::Pubkey,
    signature::Signature,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn, Instrument};

use crate::config::{ComputeConfig, Config, ConfirmationConfig};
use crate::metrics::{metrics, Timer};
use crate::observability::TraceContext;
use crate::rpc::ChainRpc;
use crate::structured_logging::StructuredLogger;
use crate::tx_builder::context::BuildInputs;
use crate::tx_builder::errors::TransactionBuilderError;
use crate::tx_builder::fee::{FeeEstimator, PriorityFeeOracle};
use crate::tx_builder::instructions::{
    compute_unit_limit_with_margin, plan_compute_budget, sanity_check_ix_order,
};
use crate::tx_builder::output::{ConfirmedTransaction, PreparedTransaction};
use crate::tx_builder::program_errors::ProgramErrorTable;
use crate::tx_builder::simulate::ComputeSimulator;
use crate::wallet::{WalletError, WalletSigner};

/// Consecutive failed poll rounds tolerated before giving up as ambiguous
const MAX_POLL_FAILURES: u32 = 10;

#[derive(Clone)]
pub struct TransactionBuilder {
    rpc: Arc<dyn ChainRpc>,
    fees: FeeEstimator,
    simulator: ComputeSimulator,
    compute: ComputeConfig,
    confirmation: ConfirmationConfig,
}

impl TransactionBuilder {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        fees: FeeEstimator,
        compute: ComputeConfig,
        confirmation: ConfirmationConfig,
    ) -> Self {
        let simulator = ComputeSimulator::new(rpc.clone());
        Self {
            rpc,
            fees,
            simulator,
            compute,
            confirmation,
        }
    }

    pub fn from_config(
        rpc: Arc<dyn ChainRpc>,
        oracle: Arc<dyn PriorityFeeOracle>,
        config: &Config,
    ) -> Self {
        Self::new(
            rpc,
            FeeEstimator::new(oracle, config.fees.clone()),
            config.compute.clone(),
            config.confirmation.clone(),
        )
    }

    pub fn rpc(&self) -> &Arc<dyn ChainRpc> {
        &self.rpc
    }

    /// Run the concurrent lookups and compile an unsigned v0 message
    pub async fn prepare(
        &self,
        draft: Vec<Instruction>,
        payer: &Pubkey,
        lookup_tables: &[AddressLookupTableAccount],
        trace_ctx: &TraceContext,
    ) -> Result<PreparedTransaction, TransactionBuilderError> {
        if draft.is_empty() {
            return Err(TransactionBuilderError::validation(
                "Draft transaction has no instructions",
            ));
        }

        let timer = Timer::new();
        let (fee, consumed_units, blockhash) = tokio::join!(
            self.fees.estimate(&draft, payer),
            self.simulator.simulate(&draft, payer, lookup_tables),
            self.rpc.latest_blockhash(),
        );
        let (blockhash, last_valid_block_height) = blockhash?;
        let inputs = BuildInputs {
            fee: fee?,
            consumed_units,
            blockhash,
            last_valid_block_height,
            trace_context: trace_ctx.clone(),
        };
        timer.observe_duration(&metrics().tx_prepare_latency);
        debug!(inputs = ?inputs, "Build inputs gathered");

        let limit = inputs.consumed_units.map(|units| {
            compute_unit_limit_with_margin(units, self.compute.margin_percent, self.compute.max_units)
        });
        let plan = plan_compute_budget(draft, inputs.fee.micro_lamports, limit)?;
        sanity_check_ix_order(&plan.instructions)?;

        let message =
            MessageV0::try_compile(payer, &plan.instructions, lookup_tables, inputs.blockhash)
                .map_err(|e| TransactionBuilderError::instruction_failed("message", e.to_string()))?;

        Ok(PreparedTransaction {
            message: VersionedMessage::V0(message),
            blockhash: inputs.blockhash,
            last_valid_block_height: inputs.last_valid_block_height,
            compute_unit_limit: plan.compute_unit_limit,
            compute_unit_price: plan.compute_unit_price,
            fee_source: inputs.fee.source,
        })
    }

    pub async fn build_and_send(
        &self,
        draft: Vec<Instruction>,
        wallet: &dyn WalletSigner,
        trace_ctx: &TraceContext,
    ) -> Result<ConfirmedTransaction, TransactionBuilderError> {
        self.build_and_send_with_lookup_tables(draft, &[], wallet, trace_ctx)
            .await
    }

    pub async fn build_and_send_with_lookup_tables(
        &self,
        draft: Vec<Instruction>,
        lookup_tables: &[AddressLookupTableAccount],
        wallet: &dyn WalletSigner,
        trace_ctx: &TraceContext,
    ) -> Result<ConfirmedTransaction, TransactionBuilderError> {
        let logger = StructuredLogger::new(trace_ctx);
        let result = async {
            let prepared = self
                .prepare(draft, &wallet.pubkey(), lookup_tables, trace_ctx)
                .await?;
            self.send_prepared(prepared, wallet, &logger).await
        }
        .instrument(trace_ctx.span())
        .await;

        if let Err(e) = &result {
            metrics().record_failure(e.category());
            logger.log_tx_failed(e.category(), &e.to_string());
        }
        result
    }

    async fn send_prepared(
        &self,
        prepared: PreparedTransaction,
        wallet: &dyn WalletSigner,
        logger: &StructuredLogger,
    ) -> Result<ConfirmedTransaction, TransactionBuilderError> {
        let tx = wallet
            .sign_message(prepared.message)
            .await
            .map_err(|e| match e {
                WalletError::Rejected(reason) => TransactionBuilderError::SigningRejected(reason),
                other => TransactionBuilderError::Signing(other.to_string()),
            })?;

        let timer = Timer::new();
        let signature = self.rpc.send(&tx).await?;
        metrics().tx_submitted.inc();
        logger.log_tx_submitted(
            &signature.to_string(),
            prepared.compute_unit_limit,
            prepared.compute_unit_price,
        );

        self.await_confirmation(&signature, prepared.last_valid_block_height)
            .await?;

        timer.observe_duration(&metrics().tx_confirm_latency);
        metrics().tx_confirmed.inc();
        logger.log_tx_confirmed(&signature.to_string(), (timer.elapsed_secs() * 1000.0) as u64);

        Ok(ConfirmedTransaction {
            signature,
            compute_unit_limit: prepared.compute_unit_limit,
            compute_unit_price: prepared.compute_unit_price,
        })
    }

    /// Poll until confirmed or failed, bounded by the blockhash window and `timeout_secs`
    async fn await_confirmation(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), TransactionBuilderError> {
        let deadline = Duration::from_secs(self.confirmation.timeout_secs);
        let polling = self.poll_confirmation(signature, last_valid_block_height);
        match tokio::time::timeout(deadline, polling).await {
            Ok(result) => result,
            Err(_) => {
                metrics().confirmation_timeouts.inc();
                warn!(%signature, timeout_secs = self.confirmation.timeout_secs, "Confirmation wait timed out");
                Err(TransactionBuilderError::ConfirmationTimeout {
                    signature: *signature,
                })
            }
        }
    }

    async fn poll_confirmation(
        &self,
        signature: &Signature,
        last_valid_block_height: u64,
    ) -> Result<(), TransactionBuilderError> {
        let interval = Duration::from_millis(self.confirmation.poll_interval_ms);
        let mut poll_failures = 0u32;

        loop {
            // Reset only after a round where both polls answered
            let mut round_failed = false;
            match self.check_signature(signature).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(e @ (TransactionBuilderError::Program { .. }
                | TransactionBuilderError::TransactionFailed { .. })) => return Err(e),
                Err(e) => {
                    round_failed = true;
                    warn!(error = %e, attempt = poll_failures + 1, "Signature status poll failed");
                }
            }

            match self.rpc.block_height().await {
                Ok(height) if height > last_valid_block_height => {
                    // One last look: the transaction may have landed in the final block.
                    if let Ok(true) = self.check_signature(signature).await {
                        return Ok(());
                    }
                    metrics().confirmation_timeouts.inc();
                    info!(%signature, height, last_valid_block_height, "Blockhash expired before confirmation");
                    return Err(TransactionBuilderError::ConfirmationTimeout {
                        signature: *signature,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    round_failed = true;
                    warn!(error = %e, attempt = poll_failures + 1, "Block height poll failed");
                }
            }

            poll_failures = if round_failed { poll_failures + 1 } else { 0 };
            if poll_failures >= MAX_POLL_FAILURES {
                metrics().confirmation_timeouts.inc();
                warn!(%signature, poll_failures, "Giving up on confirmation after repeated poll failures");
                return Err(TransactionBuilderError::ConfirmationTimeout {
                    signature: *signature,
                });
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// `Ok(true)` once confirmed; a landed failure is mapped to its error
    async fn check_signature(&self, signature: &Signature) -> Result<bool, TransactionBuilderError> {
        let Some(state) = self.rpc.signature_state(signature).await? else {
            return Ok(false);
        };
        if let Some(err) = state.err {
            return Err(ProgramErrorTable::launchpad()
                .classify(&err)
                .unwrap_or_else(|| TransactionBuilderError::TransactionFailed {
                    signature: signature.to_string(),
                    reason: err,
                }));
        }
        Ok(state.confirmed)
    }
}
