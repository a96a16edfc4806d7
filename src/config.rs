//! Configuration module
//!
//! Loaded from TOML with per-field defaults; `.env` is read first so the
//! environment overrides below can come from it.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::tx_builder::fee::PriorityLevel;

/// Highest compute unit limit a transaction may request
pub const MAX_COMPUTE_UNIT_LIMIT: u32 = 1_400_000;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,

    #[serde(default)]
    pub fees: FeeConfig,

    #[serde(default)]
    pub compute: ComputeConfig,

    #[serde(default)]
    pub confirmation: ConfirmationConfig,

    #[serde(default)]
    pub programs: ProgramsConfig,

    #[serde(default)]
    pub market: MarketConfig,

    pub wallet: WalletConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Attempts for idempotent blockhash reads
    #[serde(default = "default_blockhash_retries")]
    pub blockhash_retries: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Priority-fee oracle endpoint; the RPC url when unset
    #[serde(default)]
    pub oracle_url: Option<String>,

    #[serde(default)]
    pub priority_level: PriorityLevel,

    /// Price used when the oracle fails
    #[serde(default = "default_fallback_fee")]
    pub fallback_micro_lamports: u64,

    /// Treat oracle failures as fatal instead of using the fallback price
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeConfig {
    /// Headroom added on top of simulated consumption
    #[serde(default = "default_margin_percent")]
    pub margin_percent: u32,

    #[serde(default = "default_max_units")]
    pub max_units: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound on one confirmation wait, whatever the chain reports
    #[serde(default = "default_confirmation_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsConfig {
    #[serde(default = "default_launchpad_program")]
    pub launchpad: String,

    #[serde(default = "default_openbook_program")]
    pub openbook: String,

    #[serde(default = "default_amm_program")]
    pub amm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default)]
    pub fee_rate_bps: u16,

    #[serde(default = "default_pc_dust_threshold")]
    pub pc_dust_threshold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the sled checkpoint database
    #[serde(default = "default_checkpoint_path")]
    pub checkpoint_path: String,
}

/// Program ids resolved from `ProgramsConfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub launchpad: Pubkey,
    pub openbook: Pubkey,
    pub amm: Pubkey,
}

// Default value functions
fn default_rpc_timeout() -> u64 { 30 }
fn default_blockhash_retries() -> usize { 3 }
fn default_fallback_fee() -> u64 { 50_000 }
fn default_margin_percent() -> u32 { 10 }
fn default_max_units() -> u32 { MAX_COMPUTE_UNIT_LIMIT }
fn default_poll_interval() -> u64 { 500 }
fn default_confirmation_timeout() -> u64 { 90 }
fn default_launchpad_program() -> String { "LaunchPad1111111111111111111111111111111111".to_string() }
fn default_openbook_program() -> String { "srmqPvymJeFKQ4zGQed1GFppgkRHL9kaELCbyksJtPX".to_string() }
fn default_amm_program() -> String { "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string() }
fn default_pc_dust_threshold() -> u64 { 500 }
fn default_checkpoint_path() -> String { "./launch-checkpoints".to_string() }

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            oracle_url: None,
            priority_level: PriorityLevel::default(),
            fallback_micro_lamports: default_fallback_fee(),
            strict: false,
        }
    }
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            margin_percent: default_margin_percent(),
            max_units: default_max_units(),
        }
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            timeout_secs: default_confirmation_timeout(),
        }
    }
}

impl Default for ProgramsConfig {
    fn default() -> Self {
        Self {
            launchpad: default_launchpad_program(),
            openbook: default_openbook_program(),
            amm: default_amm_program(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            fee_rate_bps: 0,
            pc_dust_threshold: default_pc_dust_threshold(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_path: default_checkpoint_path(),
        }
    }
}

impl ProgramsConfig {
    pub fn resolve(&self) -> anyhow::Result<ProgramIds> {
        let parse = |name: &str, value: &str| {
            Pubkey::from_str(value)
                .map_err(|e| anyhow::anyhow!("invalid {name} program id '{value}': {e}"))
        };
        Ok(ProgramIds {
            launchpad: parse("launchpad", &self.launchpad)?,
            openbook: parse("openbook", &self.openbook)?,
            amm: parse("amm", &self.amm)?,
        })
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration with `.env` and environment variable overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LAUNCHPAD_RPC_URL") {
            self.rpc.url = url;
        }
        if let Ok(path) = std::env::var("LAUNCHPAD_KEYPAIR") {
            self.wallet.keypair_path = path;
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.compute.margin_percent > 100 {
            anyhow::bail!("compute.margin_percent must be <= 100");
        }
        if self.compute.max_units == 0 || self.compute.max_units > MAX_COMPUTE_UNIT_LIMIT {
            anyhow::bail!("compute.max_units must be within 1..={MAX_COMPUTE_UNIT_LIMIT}");
        }
        if self.confirmation.poll_interval_ms == 0 {
            anyhow::bail!("confirmation.poll_interval_ms must be > 0");
        }
        if self.confirmation.timeout_secs == 0 {
            anyhow::bail!("confirmation.timeout_secs must be > 0");
        }
        self.programs.resolve()?;
        Ok(())
    }

    /// Oracle endpoint, falling back to the RPC url
    pub fn fee_oracle_url(&self) -> &str {
        self.fees.oracle_url.as_deref().unwrap_or(&self.rpc.url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "https://api.mainnet-beta.solana.com".to_string(),
                timeout_secs: default_rpc_timeout(),
                blockhash_retries: default_blockhash_retries(),
            },
            fees: FeeConfig::default(),
            compute: ComputeConfig::default(),
            confirmation: ConfirmationConfig::default(),
            programs: ProgramsConfig::default(),
            market: MarketConfig::default(),
            wallet: WalletConfig {
                keypair_path: "~/.config/solana/id.json".to_string(),
            },
            storage: StorageConfig::default(),
        }
    }
}
