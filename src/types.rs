//! Common types used throughout the client
//!
//! Records here mirror what the document store and the on-chain program
//! persist. The orchestrator only reads them; `Status` is always derived.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;

/// Presale project as persisted by the document store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Project account address (also the document id)
    #[serde(with = "pubkey_str")]
    pub id: Pubkey,

    /// Reward token mint
    #[serde(with = "pubkey_str")]
    pub token_mint: Pubkey,

    /// Quote currency mint (wrapped SOL or an SPL stablecoin)
    #[serde(with = "pubkey_str")]
    pub quote_mint: Pubkey,

    /// Creator; the only key allowed to launch
    #[serde(with = "pubkey_str")]
    pub authority: Pubkey,

    /// Liquidity pool mint, set once the launch workflow completes
    #[serde(default, with = "option_pubkey_str")]
    pub lp_mint: Option<Pubkey>,

    /// Quote units deposited by backers so far
    pub liquidity_collected: u64,

    /// Quote units required for the presale to succeed
    pub presale_target: u64,

    /// Reward token supply in base units
    pub total_supply: u64,

    /// Portion of the supply released through vesting
    pub vested_supply: u64,

    /// Quote units withdrawn through refunds or by the authority
    #[serde(default)]
    pub amount_withdrawn: u64,

    /// Reward tokens claimed by backers
    #[serde(default)]
    pub amount_claimed: u64,

    /// Absolute presale deadline (unix seconds)
    #[serde(default)]
    pub presale_time_limit: Option<i64>,

    /// Vesting duration in seconds
    pub vesting_period: i64,

    /// Set exactly once, when the pool is launched
    #[serde(default)]
    pub vesting_started_at: Option<i64>,

    pub token_decimals: u8,

    #[serde(default = "default_quote_decimals")]
    pub quote_decimals: u8,
}

fn default_quote_decimals() -> u8 {
    9
}

impl ProjectRecord {
    /// Whole-token supply, used to pick the market sizing bracket
    pub fn total_supply_tokens(&self) -> u64 {
        self.total_supply / 10u64.saturating_pow(self.token_decimals as u32)
    }

    pub fn is_launched(&self) -> bool {
        self.lp_mint.is_some()
    }

    pub fn target_met(&self) -> bool {
        self.liquidity_collected >= self.presale_target
    }
}

/// One backer's on-chain purchase record for a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseReceipt {
    #[serde(with = "pubkey_str")]
    pub project: Pubkey,

    #[serde(with = "pubkey_str")]
    pub buyer: Pubkey,

    /// Quote units deposited
    pub amount_contributed: u64,

    /// Reward tokens owed once fully vested
    pub token_allocation: u64,

    #[serde(default)]
    pub tokens_claimed: u64,

    /// Amount made claimable by the last eligibility check
    #[serde(default)]
    pub claimable_amount: u64,

    /// Unix time of the last eligibility check; `None` until the first one
    #[serde(default)]
    pub eligibility_checked_at: Option<i64>,

    #[serde(default)]
    pub refunded: bool,
}

/// Identifiers produced by phase 1 of the market launch
///
/// Its presence in the checkpoint store is the only signal that phase 1
/// committed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointRecord {
    #[serde(with = "pubkey_str")]
    pub market_id: Pubkey,
    pub market_seed: String,
    #[serde(with = "pubkey_str")]
    pub base_vault: Pubkey,
    #[serde(with = "pubkey_str")]
    pub quote_vault: Pubkey,
    #[serde(with = "pubkey_str")]
    pub request_queue: Pubkey,
    #[serde(with = "pubkey_str")]
    pub event_queue: Pubkey,
    #[serde(with = "pubkey_str")]
    pub bids: Pubkey,
    #[serde(with = "pubkey_str")]
    pub asks: Pubkey,
    pub vault_signer_nonce: u64,
}

/// Lifecycle phase of a project, derived from its record and the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "Presale In Progress")]
    PresaleInProgress,
    #[serde(rename = "Presale Target Met")]
    PresaleTargetMet,
    #[serde(rename = "Ready To Launch")]
    ReadyToLaunch,
    #[serde(rename = "Expired")]
    Expired,
    #[serde(rename = "Vesting In Progress")]
    VestingInProgress,
    #[serde(rename = "Vesting Completed")]
    VestingCompleted,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Status::PresaleInProgress,
        Status::PresaleTargetMet,
        Status::ReadyToLaunch,
        Status::Expired,
        Status::VestingInProgress,
        Status::VestingCompleted,
    ];

    /// Label shared with the UI
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::PresaleInProgress => "Presale In Progress",
            Status::PresaleTargetMet => "Presale Target Met",
            Status::ReadyToLaunch => "Ready To Launch",
            Status::Expired => "Expired",
            Status::VestingInProgress => "Vesting In Progress",
            Status::VestingCompleted => "Vesting Completed",
        }
    }

    pub fn is_vesting(&self) -> bool {
        matches!(self, Status::VestingInProgress | Status::VestingCompleted)
    }

    pub fn accepts_purchases(&self) -> bool {
        matches!(self, Status::PresaleInProgress | Status::PresaleTargetMet)
    }

    pub fn allows_launch(&self) -> bool {
        matches!(self, Status::ReadyToLaunch | Status::PresaleTargetMet)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serde adapter storing a `Pubkey` as its base58 string
pub mod pubkey_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let s = String::deserialize(deserializer)?;
        Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {s}: {e}")))
    }
}

pub mod option_pubkey_str {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;
    use std::str::FromStr;

    pub fn serialize<S: Serializer>(key: &Option<Pubkey>, serializer: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(key) => serializer.collect_str(key),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Pubkey>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| {
            Pubkey::from_str(&s).map_err(|e| D::Error::custom(format!("invalid pubkey {s}: {e}")))
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_match_serde() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_project_record_json_uses_base58_keys() {
        let record = ProjectRecord {
            id: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            lp_mint: None,
            liquidity_collected: 5,
            presale_target: 10,
            total_supply: 1_000_000_000,
            vested_supply: 500_000_000,
            amount_withdrawn: 0,
            amount_claimed: 0,
            presale_time_limit: Some(1_700_000_000),
            vesting_period: 86_400,
            vesting_started_at: None,
            token_decimals: 6,
            quote_decimals: 9,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tokenMint"], record.token_mint.to_string());
        assert!(json["lpMint"].is_null());

        let back: ProjectRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.total_supply_tokens(), 1_000);
    }

    #[test]
    fn test_checkpoint_field_names() {
        let checkpoint = CheckpointRecord {
            market_id: Pubkey::new_unique(),
            market_seed: "abc".to_string(),
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            event_queue: Pubkey::new_unique(),
            bids: Pubkey::new_unique(),
            asks: Pubkey::new_unique(),
            vault_signer_nonce: 3,
        };
        let json = serde_json::to_value(&checkpoint).unwrap();
        for field in [
            "marketId",
            "marketSeed",
            "baseVault",
            "quoteVault",
            "requestQueue",
            "eventQueue",
            "bids",
            "asks",
            "vaultSignerNonce",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json["marketId"].is_string());
    }
}
