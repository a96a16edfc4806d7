//! Priority fee estimation
//!
//! The draft instructions are wrapped in an unsigned legacy transaction with a
//! synthetic blockhash, serialized to base58 and handed to a
//! `getPriorityFeeEstimate` JSON-RPC oracle. The highest tier is always
//! requested unless configured otherwise.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::{
    hash::Hash, instruction::Instruction, message::Message, pubkey::Pubkey,
    transaction::Transaction,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FeeConfig;
use crate::tx_builder::errors::TransactionBuilderError;

/// Priority tier understood by the fee oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriorityLevel {
    Min,
    Low,
    Medium,
    High,
    #[default]
    VeryHigh,
    UnsafeMax,
}

/// Out-of-band priority fee source
#[async_trait]
pub trait PriorityFeeOracle: Send + Sync {
    /// Estimate in micro-lamports per compute unit for a base58 serialized transaction
    async fn priority_fee_estimate(
        &self,
        serialized_tx: &str,
        level: PriorityLevel,
    ) -> Result<f64, TransactionBuilderError>;
}

/// JSON-RPC oracle speaking `getPriorityFeeEstimate`
pub struct HttpPriorityFeeOracle {
    http: reqwest::Client,
    url: String,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: [FeeEstimateParams<'a>; 1],
}

#[derive(Serialize)]
struct FeeEstimateParams<'a> {
    transaction: &'a str,
    options: FeeEstimateOptions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeeEstimateOptions {
    priority_level: PriorityLevel,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<FeeEstimateResult>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeeEstimateResult {
    priority_fee_estimate: Option<f64>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

impl HttpPriorityFeeOracle {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, TransactionBuilderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransactionBuilderError::Estimation(e.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PriorityFeeOracle for HttpPriorityFeeOracle {
    async fn priority_fee_estimate(
        &self,
        serialized_tx: &str,
        level: PriorityLevel,
    ) -> Result<f64, TransactionBuilderError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: uuid::Uuid::new_v4().to_string(),
            method: "getPriorityFeeEstimate",
            params: [FeeEstimateParams {
                transaction: serialized_tx,
                options: FeeEstimateOptions {
                    priority_level: level,
                },
            }],
        };

        let resp = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| TransactionBuilderError::Estimation(format!("request error: {e}")))?;

        if !resp.status().is_success() {
            return Err(TransactionBuilderError::Estimation(format!(
                "oracle returned HTTP {}",
                resp.status()
            )));
        }

        let body: JsonRpcResponse = resp
            .json()
            .await
            .map_err(|e| TransactionBuilderError::Estimation(format!("JSON parse error: {e}")))?;

        if let Some(err) = body.error {
            return Err(TransactionBuilderError::Estimation(format!(
                "oracle error {}: {}",
                err.code, err.message
            )));
        }

        body.result
            .and_then(|r| r.priority_fee_estimate)
            .ok_or_else(|| {
                TransactionBuilderError::Estimation("response has no priorityFeeEstimate".into())
            })
    }
}

/// Where a priority price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSource {
    Oracle,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeQuote {
    pub micro_lamports: u64,
    pub source: FeeSource,
}

/// Turns a draft instruction set into a compute-unit price
#[derive(Clone)]
pub struct FeeEstimator {
    oracle: Arc<dyn PriorityFeeOracle>,
    config: FeeConfig,
}

impl FeeEstimator {
    pub fn new(oracle: Arc<dyn PriorityFeeOracle>, config: FeeConfig) -> Self {
        Self { oracle, config }
    }

    pub async fn estimate(
        &self,
        instructions: &[Instruction],
        payer: &Pubkey,
    ) -> Result<FeeQuote, TransactionBuilderError> {
        let outcome = match serialize_skeleton(instructions, payer) {
            Ok(encoded) => {
                self.oracle
                    .priority_fee_estimate(&encoded, self.config.priority_level)
                    .await
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(estimate) if estimate.is_finite() && estimate >= 0.0 => {
                let micro_lamports = estimate.ceil() as u64;
                debug!(micro_lamports, level = ?self.config.priority_level, "Priority fee estimated");
                Ok(FeeQuote {
                    micro_lamports,
                    source: FeeSource::Oracle,
                })
            }
            Ok(estimate) => self.fallback(TransactionBuilderError::Estimation(format!(
                "oracle returned unusable estimate {estimate}"
            ))),
            Err(e) => self.fallback(e),
        }
    }

    fn fallback(&self, err: TransactionBuilderError) -> Result<FeeQuote, TransactionBuilderError> {
        if self.config.strict {
            return Err(err);
        }
        warn!(
            error = %err,
            fallback = self.config.fallback_micro_lamports,
            "Priority fee estimation failed, using fallback price"
        );
        crate::metrics::metrics().fee_fallbacks.inc();
        Ok(FeeQuote {
            micro_lamports: self.config.fallback_micro_lamports,
            source: FeeSource::Fallback,
        })
    }
}

/// Unsigned, non-executable transaction skeleton as base58
pub fn serialize_skeleton(
    instructions: &[Instruction],
    payer: &Pubkey,
) -> Result<String, TransactionBuilderError> {
    let message = Message::new_with_blockhash(instructions, Some(payer), &Hash::default());
    let tx = Transaction::new_unsigned(message);
    let bytes = bincode::serialize(&tx)
        .map_err(|e| TransactionBuilderError::Estimation(format!("serialize skeleton: {e}")))?;
    Ok(bs58::encode(bytes).into_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockFeeOracle;
    use solana_sdk::system_instruction;

    fn draft(payer: &Pubkey) -> Vec<Instruction> {
        vec![system_instruction::transfer(payer, &Pubkey::new_unique(), 10)]
    }

    #[test]
    fn test_skeleton_roundtrips_through_base58() {
        let payer = Pubkey::new_unique();
        let encoded = serialize_skeleton(&draft(&payer), &payer).unwrap();
        let bytes = bs58::decode(&encoded).into_vec().unwrap();
        let tx: Transaction = bincode::deserialize(&bytes).unwrap();
        assert_eq!(tx.message.account_keys[0], payer);
        assert_eq!(tx.message.recent_blockhash, Hash::default());
        assert!(tx.signatures.iter().all(|s| *s == Default::default()));
    }

    #[tokio::test]
    async fn test_oracle_estimate_is_rounded_up() {
        let oracle = Arc::new(MockFeeOracle::returning(1234.2));
        let estimator = FeeEstimator::new(oracle.clone(), FeeConfig::default());
        let payer = Pubkey::new_unique();

        let quote = estimator.estimate(&draft(&payer), &payer).await.unwrap();
        assert_eq!(quote.micro_lamports, 1235);
        assert_eq!(quote.source, FeeSource::Oracle);
        assert_eq!(oracle.last_level(), Some(PriorityLevel::VeryHigh));
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let estimator = FeeEstimator::new(Arc::new(MockFeeOracle::failing()), FeeConfig::default());
        let payer = Pubkey::new_unique();

        let quote = estimator.estimate(&draft(&payer), &payer).await.unwrap();
        assert_eq!(quote.micro_lamports, 50_000);
        assert_eq!(quote.source, FeeSource::Fallback);
    }

    #[tokio::test]
    async fn test_failure_is_fatal_in_strict_mode() {
        let config = FeeConfig {
            strict: true,
            ..Default::default()
        };
        let estimator = FeeEstimator::new(Arc::new(MockFeeOracle::failing()), config);
        let payer = Pubkey::new_unique();

        let err = estimator.estimate(&draft(&payer), &payer).await.unwrap_err();
        assert!(matches!(err, TransactionBuilderError::Estimation(_)));
    }

    #[tokio::test]
    async fn test_http_oracle_request_shape() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "method": "getPriorityFeeEstimate",
                "params": [{ "options": { "priorityLevel": "VeryHigh" } }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":"1","result":{"priorityFeeEstimate":42000.0}}"#)
            .create_async()
            .await;

        let oracle = HttpPriorityFeeOracle::new(server.url(), Duration::from_secs(5)).unwrap();
        let estimate = oracle
            .priority_fee_estimate("abc", PriorityLevel::VeryHigh)
            .await
            .unwrap();

        assert_eq!(estimate, 42_000.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_oracle_error_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32602,"message":"bad tx"}}"#)
            .create_async()
            .await;

        let oracle = HttpPriorityFeeOracle::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = oracle
            .priority_fee_estimate("abc", PriorityLevel::High)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad tx"));
    }
}
