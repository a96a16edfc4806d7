//! Structured log events for flows and their transactions

use crate::observability::TraceContext;

/// Emits the fixed set of flow events with correlation fields attached
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    correlation_id: String,
    operation: String,
    project: String,
}

impl StructuredLogger {
    pub fn new(ctx: &TraceContext) -> Self {
        Self {
            correlation_id: ctx.correlation_id.to_string(),
            operation: ctx.operation.clone(),
            project: ctx.project_id.clone().unwrap_or_else(|| "-".to_string()),
        }
    }

    pub fn log_flow_started(&self, wallet: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            project = %self.project,
            wallet = %wallet,
            "Flow started"
        );
    }

    pub fn log_tx_submitted(&self, signature: &str, cu_limit: Option<u32>, cu_price: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            signature = %signature,
            cu_limit = ?cu_limit,
            cu_price = cu_price,
            "Transaction submitted"
        );
    }

    pub fn log_tx_confirmed(&self, signature: &str, latency_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            signature = %signature,
            latency_ms = latency_ms,
            "Transaction confirmed"
        );
    }

    pub fn log_tx_failed(&self, category: &str, error: &str) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            category = %category,
            error = %error,
            "Transaction failed"
        );
    }

    pub fn log_step_skipped(&self, step: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            project = %self.project,
            step = %step,
            "Step already committed, skipping"
        );
    }

    pub fn log_checkpoint_written(&self, market_id: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            project = %self.project,
            market_id = %market_id,
            "Launch checkpoint written"
        );
    }
}
