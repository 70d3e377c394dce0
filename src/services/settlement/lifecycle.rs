// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::{BPS_DENOMINATOR, UNLOCK_THRESHOLD_BPS};
use crate::domain::error::AppError;
use crate::domain::types::TokenMarketState;
use alloy::primitives::{Address, U256};
use serde::Deserialize;

/// What a `Locked` token means for a trader.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    /// Only the token's creator may trade until unlock.
    #[default]
    CreatorOnly,
    BlockAll,
    /// Never blocks; the lock is reported only.
    Advisory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Open,
    /// Locked, but the policy let this trader through.
    LockedPermitted,
}

pub fn can_trade(state: &TokenMarketState) -> bool {
    !state.completed
}

/// Decide whether `trader` may trade `state` right now.
pub fn check(
    state: &TokenMarketState,
    trader: Address,
    policy: LockPolicy,
) -> Result<GateDecision, AppError> {
    if !can_trade(state) {
        tracing::info!(target: "gate", token = %state.token, "Launch completed; trading disabled");
        return Err(AppError::TokenLaunchCompleted {
            token: format!("{:#x}", state.token),
        });
    }
    if state.unlocked {
        return Ok(GateDecision::Open);
    }
    let locked = || AppError::TokenLocked {
        token: format!("{:#x}", state.token),
    };
    match policy {
        LockPolicy::BlockAll => Err(locked()),
        LockPolicy::CreatorOnly if trader == state.creator => Ok(GateDecision::LockedPermitted),
        LockPolicy::CreatorOnly => {
            tracing::info!(
                target: "gate",
                token = %state.token,
                progress_bps = unlock_progress_bps(state),
                "Token locked; only the creator may trade"
            );
            Err(locked())
        }
        LockPolicy::Advisory => {
            tracing::warn!(
                target: "gate",
                token = %state.token,
                progress_bps = unlock_progress_bps(state),
                "Token still locked; proceeding under advisory policy"
            );
            Ok(GateDecision::LockedPermitted)
        }
    }
}

/// Creator purchase needed to unlock.
pub fn unlock_threshold(max_supply: U256) -> U256 {
    max_supply.saturating_mul(U256::from(UNLOCK_THRESHOLD_BPS)) / U256::from(BPS_DENOMINATOR)
}

/// Creator progress toward unlock in bps of the threshold, capped at 10_000.
/// Informational; the ledger's `unlocked` flag is what the gate obeys.
pub fn unlock_progress_bps(state: &TokenMarketState) -> u64 {
    if state.unlocked {
        return BPS_DENOMINATOR;
    }
    let threshold = unlock_threshold(state.max_supply);
    if threshold.is_zero() {
        return 0;
    }
    let progress =
        state.creator_purchased.saturating_mul(U256::from(BPS_DENOMINATOR)) / threshold;
    u64::try_from(progress.min(U256::from(BPS_DENOMINATOR))).unwrap_or(BPS_DENOMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::WAD;

    fn state(unlocked: bool, completed: bool) -> TokenMarketState {
        TokenMarketState {
            token: Address::from([1u8; 20]),
            name: "T".into(),
            symbol: "T".into(),
            creator: Address::from([2u8; 20]),
            unit_price: WAD,
            current_supply: U256::from(10u64) * WAD,
            max_supply: U256::from(1_000u64) * WAD,
            creator_purchased: U256::from(5u64) * WAD,
            creation_time: 0,
            unlocked,
            completed,
        }
    }

    #[test]
    fn completed_blocks_everyone_under_every_policy() {
        let s = state(true, true);
        for policy in [LockPolicy::CreatorOnly, LockPolicy::BlockAll, LockPolicy::Advisory] {
            assert!(matches!(
                check(&s, s.creator, policy),
                Err(AppError::TokenLaunchCompleted { .. })
            ));
        }
    }

    #[test]
    fn creator_only_lets_creator_through_while_locked() {
        let s = state(false, false);
        assert_eq!(
            check(&s, s.creator, LockPolicy::CreatorOnly).unwrap(),
            GateDecision::LockedPermitted
        );
        assert!(matches!(
            check(&s, Address::from([9u8; 20]), LockPolicy::CreatorOnly),
            Err(AppError::TokenLocked { .. })
        ));
        assert!(matches!(
            check(&s, s.creator, LockPolicy::BlockAll),
            Err(AppError::TokenLocked { .. })
        ));
        assert!(check(&s, Address::from([9u8; 20]), LockPolicy::Advisory).is_ok());
    }

    #[test]
    fn unlocked_is_open_to_all() {
        let s = state(true, false);
        assert_eq!(
            check(&s, Address::from([9u8; 20]), LockPolicy::BlockAll).unwrap(),
            GateDecision::Open
        );
    }

    #[test]
    fn progress_is_measured_against_two_percent() {
        // threshold = 20 tokens of 1000; creator bought 5 -> 25%.
        let s = state(false, false);
        assert_eq!(unlock_threshold(s.max_supply), U256::from(20u64) * WAD);
        assert_eq!(unlock_progress_bps(&s), 2_500);

        let mut over = s.clone();
        over.creator_purchased = U256::from(50u64) * WAD;
        assert_eq!(unlock_progress_bps(&over), 10_000);
    }
}
