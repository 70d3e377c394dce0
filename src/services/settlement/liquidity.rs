// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::{BPS_DENOMINATOR, WAD};
use crate::domain::error::AppError;
use crate::services::settlement::quote::display_wei;
use alloy::primitives::U256;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LiquidityAssessment {
    Sufficient {
        expected: U256,
    },
    /// The contract can pay at most `capped`.
    Shortfall {
        expected: U256,
        capped: U256,
        shortfall: U256,
    },
}

impl LiquidityAssessment {
    pub fn expected(&self) -> U256 {
        match self {
            LiquidityAssessment::Sufficient { expected }
            | LiquidityAssessment::Shortfall { expected, .. } => *expected,
        }
    }

    /// Best-case payout given the contract balance.
    pub fn payout(&self) -> U256 {
        match self {
            LiquidityAssessment::Sufficient { expected } => *expected,
            LiquidityAssessment::Shortfall { capped, .. } => *capped,
        }
    }

    pub fn is_shortfall(&self) -> bool {
        matches!(self, LiquidityAssessment::Shortfall { .. })
    }

    /// A shortfall only passes with the caller's explicit acknowledgment.
    pub fn require_acknowledged(self, acknowledged: bool) -> Result<Self, AppError> {
        match self {
            LiquidityAssessment::Shortfall {
                expected,
                capped,
                shortfall,
            } if !acknowledged => Err(AppError::LiquidityShortfall {
                expected: display_wei(expected),
                capped: display_wei(capped),
                shortfall: display_wei(shortfall),
            }),
            other => Ok(other),
        }
    }
}

/// `amount * price * (1 - fee)` in wei.
pub fn expected_payout(amount: U256, unit_price: U256, fee_bps: u64) -> U256 {
    let gross = amount.saturating_mul(unit_price) / WAD;
    let keep = BPS_DENOMINATOR.saturating_sub(fee_bps);
    gross.saturating_mul(U256::from(keep)) / U256::from(BPS_DENOMINATOR)
}

pub fn assess(expected: U256, contract_balance: U256) -> Result<LiquidityAssessment, AppError> {
    if contract_balance.is_zero() {
        tracing::error!(
            target: "liquidity",
            expected = %display_wei(expected),
            "Trading contract balance is zero; sell blocked"
        );
        return Err(AppError::LiquidityExhausted);
    }
    if contract_balance >= expected {
        return Ok(LiquidityAssessment::Sufficient { expected });
    }
    let shortfall = expected - contract_balance;
    tracing::warn!(
        target: "liquidity",
        expected = %display_wei(expected),
        capped = %display_wei(contract_balance),
        shortfall = %display_wei(shortfall),
        "Payout capped by contract balance"
    );
    Ok(LiquidityAssessment::Shortfall {
        expected,
        capped: contract_balance,
        shortfall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    const TWO_CENTS: u64 = 20_000_000_000_000_000;

    #[test]
    fn three_percent_fee_is_exact_in_wei() {
        let payout = expected_payout(units(1_000), U256::from(TWO_CENTS), 300);
        assert_eq!(payout, U256::from(19_400_000_000_000_000_000u128));
    }

    #[test]
    fn zero_balance_is_exhausted() {
        assert!(matches!(
            assess(units(1), U256::ZERO),
            Err(AppError::LiquidityExhausted)
        ));
    }

    #[test]
    fn partial_balance_caps_payout_and_reports_shortfall() {
        let expected = expected_payout(units(1_000), U256::from(TWO_CENTS), 300);
        let a = assess(expected, units(10)).unwrap();
        assert_eq!(
            a,
            LiquidityAssessment::Shortfall {
                expected,
                capped: units(10),
                shortfall: U256::from(9_400_000_000_000_000_000u128),
            }
        );
        match a.require_acknowledged(false) {
            Err(AppError::LiquidityShortfall {
                capped, shortfall, ..
            }) => {
                assert_eq!(capped, "10");
                assert_eq!(shortfall, "9.4");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(a.require_acknowledged(true).unwrap().payout(), units(10));
    }

    #[test]
    fn ample_balance_is_sufficient() {
        let a = assess(units(5), units(5)).unwrap();
        assert!(!a.is_shortfall());
        assert_eq!(a.payout(), units(5));
    }
}
