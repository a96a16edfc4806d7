//! Project lifecycle derivation
//!
//! `derive_status` is pure: the same record and clock always give the same
//! answer, and nothing here touches storage or the network. Evaluation order
//! matters because each rule presumes the earlier ones did not match.

use crate::types::{ProjectRecord, Status};

/// Time a target-met presale may wait for its launch before expiring
pub const LAUNCH_GRACE_PERIOD_SECS: i64 = 7 * 24 * 60 * 60;

/// Derive the lifecycle phase of `record` at unix time `now`
///
/// Returns `None` when the record has no presale deadline and has not been
/// launched; that record is undetermined rather than invalid.
pub fn derive_status(record: &ProjectRecord, now: i64) -> Option<Status> {
    if let Some(started_at) = record.vesting_started_at {
        let ends_at = started_at.saturating_add(record.vesting_period);
        if now >= ends_at {
            return Some(Status::VestingCompleted);
        }
        return Some(Status::VestingInProgress);
    }

    let target_met = record.target_met();

    if let Some(deadline) = record.presale_time_limit {
        let past_deadline = now > deadline;
        let past_grace = now > deadline.saturating_add(LAUNCH_GRACE_PERIOD_SECS);

        if (past_deadline && !target_met) || past_grace {
            return Some(Status::Expired);
        }
        if past_deadline {
            return Some(Status::ReadyToLaunch);
        }
    }

    if target_met {
        return Some(Status::PresaleTargetMet);
    }

    record.presale_time_limit.map(|_| Status::PresaleInProgress)
}

/// Why an expired project expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryReason {
    /// The deadline passed below target; backers may take their funds back
    TargetMissed,
    /// Target met but nobody launched within the grace window
    LaunchWindowLapsed,
}

/// Classify an `Expired` project; `None` for any other status
pub fn expiry_reason(record: &ProjectRecord, now: i64) -> Option<ExpiryReason> {
    match derive_status(record, now) {
        Some(Status::Expired) if record.target_met() => Some(ExpiryReason::LaunchWindowLapsed),
        Some(Status::Expired) => Some(ExpiryReason::TargetMissed),
        _ => None,
    }
}

/// Linearly vested share of `allocation` at `now`
///
/// Zero before vesting starts, the whole allocation once the period has
/// elapsed. A non-positive period vests everything at the start.
pub fn vested_amount(allocation: u64, started_at: Option<i64>, period: i64, now: i64) -> u64 {
    let Some(started_at) = started_at else {
        return 0;
    };
    if now <= started_at {
        return 0;
    }
    if period <= 0 {
        return allocation;
    }

    let elapsed = (now - started_at).min(period) as u128;
    ((allocation as u128 * elapsed) / period as u128) as u64
}

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    const DEADLINE: i64 = 1_700_000_000;

    fn record(collected: u64, target: u64) -> ProjectRecord {
        ProjectRecord {
            id: Pubkey::new_unique(),
            token_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            lp_mint: None,
            liquidity_collected: collected,
            presale_target: target,
            total_supply: 1_000_000,
            vested_supply: 500_000,
            amount_withdrawn: 0,
            amount_claimed: 0,
            presale_time_limit: Some(DEADLINE),
            vesting_period: 1_000,
            vesting_started_at: None,
            token_decimals: 0,
            quote_decimals: 9,
        }
    }

    #[test]
    fn test_presale_in_progress_before_deadline() {
        let r = record(10, 100);
        assert_eq!(derive_status(&r, DEADLINE - 1), Some(Status::PresaleInProgress));
        assert_eq!(derive_status(&r, DEADLINE), Some(Status::PresaleInProgress));
    }

    #[test]
    fn test_target_met_before_deadline() {
        let r = record(100, 100);
        assert_eq!(derive_status(&r, DEADLINE - 10), Some(Status::PresaleTargetMet));
    }

    #[test]
    fn test_ready_to_launch_after_deadline_with_target() {
        let r = record(150, 100);
        assert_eq!(derive_status(&r, DEADLINE + 1), Some(Status::ReadyToLaunch));
        assert_eq!(
            derive_status(&r, DEADLINE + LAUNCH_GRACE_PERIOD_SECS),
            Some(Status::ReadyToLaunch)
        );
    }

    #[test]
    fn test_expired_when_target_missed() {
        let r = record(99, 100);
        assert_eq!(derive_status(&r, DEADLINE + 1), Some(Status::Expired));
        assert_eq!(expiry_reason(&r, DEADLINE + 1), Some(ExpiryReason::TargetMissed));
    }

    #[test]
    fn test_grace_window_expires_target_met_project() {
        let r = record(100, 100);
        let now = DEADLINE + LAUNCH_GRACE_PERIOD_SECS + 1;
        assert_eq!(derive_status(&r, now), Some(Status::Expired));
        assert_eq!(expiry_reason(&r, now), Some(ExpiryReason::LaunchWindowLapsed));
    }

    #[test]
    fn test_vesting_boundary() {
        let mut r = record(100, 100);
        r.vesting_started_at = Some(DEADLINE + 5);
        assert_eq!(derive_status(&r, DEADLINE + 5), Some(Status::VestingInProgress));
        assert_eq!(derive_status(&r, DEADLINE + 1_004), Some(Status::VestingInProgress));
        assert_eq!(derive_status(&r, DEADLINE + 1_005), Some(Status::VestingCompleted));
    }

    #[test]
    fn test_vesting_wins_over_expiry() {
        let mut r = record(100, 100);
        r.vesting_started_at = Some(DEADLINE + 1);
        r.vesting_period = LAUNCH_GRACE_PERIOD_SECS * 4;
        let now = DEADLINE + LAUNCH_GRACE_PERIOD_SECS + 10;
        assert_eq!(derive_status(&r, now), Some(Status::VestingInProgress));
        assert_eq!(expiry_reason(&r, now), None);
    }

    #[test]
    fn test_no_deadline_is_undetermined() {
        let mut r = record(10, 100);
        r.presale_time_limit = None;
        assert_eq!(derive_status(&r, DEADLINE), None);

        // target met without a deadline is still a definite answer
        r.liquidity_collected = 100;
        assert_eq!(derive_status(&r, DEADLINE), Some(Status::PresaleTargetMet));
    }

    #[test]
    fn test_vested_amount_linear() {
        assert_eq!(vested_amount(1_000, None, 100, 50), 0);
        assert_eq!(vested_amount(1_000, Some(0), 100, 0), 0);
        assert_eq!(vested_amount(1_000, Some(0), 100, 25), 250);
        assert_eq!(vested_amount(1_000, Some(0), 100, 100), 1_000);
        assert_eq!(vested_amount(1_000, Some(0), 100, 10_000), 1_000);
        assert_eq!(vested_amount(1_000, Some(0), 0, 1), 1_000);
    }

    #[test]
    fn test_vested_amount_no_overflow() {
        let v = vested_amount(u64::MAX, Some(0), i64::MAX, i64::MAX / 2);
        assert!(v > 0 && v < u64::MAX);
    }
}
