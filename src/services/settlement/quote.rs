// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Linear quoting at the last known unit price.
//!
//! Wire amounts are 18-decimal `U256`; display amounts are `Decimal` in
//! whole units rounded to six places. A quote is an approximation of what
//! the curve will settle at and is never adjusted after the fact.

use crate::domain::constants::{AMOUNT_DECIMALS, BPS_DENOMINATOR, DISPLAY_DECIMALS, WAD};
use crate::domain::error::AppError;
use crate::domain::types::Direction;
use alloy::primitives::U256;
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub direction: Direction,
    /// Buy: settlement currency in. Sell: tokens in.
    pub input: U256,
    /// Buy: tokens out. Sell: settlement currency out, after fee.
    pub expected_out: U256,
    pub min_out: U256,
    pub unit_price: U256,
    pub slippage_bps: u64,
}

impl Quote {
    pub fn buy(value: U256, unit_price: U256, slippage_bps: u64) -> Result<Self, AppError> {
        let expected_out = tokens_for_counter(value, unit_price)?;
        Ok(Self {
            direction: Direction::Buy,
            input: value,
            expected_out,
            min_out: min_out(expected_out, slippage_bps),
            unit_price,
            slippage_bps,
        })
    }

    /// Buy sized from the token leg: the counter input is derived from `tokens`.
    pub fn buy_for_tokens(tokens: U256, unit_price: U256, slippage_bps: u64) -> Result<Self, AppError> {
        if unit_price.is_zero() {
            return Err(AppError::InvalidAmount {
                field: "unit_price".into(),
                message: "ledger reported a zero price".into(),
            });
        }
        Ok(Self {
            direction: Direction::Buy,
            input: counter_for_tokens(tokens, unit_price),
            expected_out: tokens,
            min_out: min_out(tokens, slippage_bps),
            unit_price,
            slippage_bps,
        })
    }

    /// `expected_payout` is the post-fee amount from the liquidity guard.
    pub fn sell(tokens: U256, expected_payout: U256, unit_price: U256, slippage_bps: u64) -> Self {
        Self {
            direction: Direction::Sell,
            input: tokens,
            expected_out: expected_payout,
            min_out: min_out(expected_payout, slippage_bps),
            unit_price,
            slippage_bps,
        }
    }

    pub fn display_input(&self) -> String {
        display_wei(self.input)
    }

    pub fn display_expected_out(&self) -> String {
        display_wei(self.expected_out)
    }

    pub fn display_min_out(&self) -> String {
        display_wei(self.min_out)
    }
}

pub fn tokens_for_counter(counter: U256, unit_price: U256) -> Result<U256, AppError> {
    if unit_price.is_zero() {
        return Err(AppError::InvalidAmount {
            field: "unit_price".into(),
            message: "ledger reported a zero price".into(),
        });
    }
    Ok(counter.saturating_mul(WAD) / unit_price)
}

pub fn counter_for_tokens(tokens: U256, unit_price: U256) -> U256 {
    tokens.saturating_mul(unit_price) / WAD
}

pub fn min_out(amount: U256, slippage_bps: u64) -> U256 {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    amount.saturating_mul(U256::from(keep)) / U256::from(BPS_DENOMINATOR)
}

/// Parse a user-entered whole-unit amount.
pub fn parse_amount(field: &str, raw: &str) -> Result<Decimal, AppError> {
    let value = Decimal::from_str(raw.trim()).map_err(|e| AppError::InvalidAmount {
        field: field.to_string(),
        message: format!("{raw:?} is not a number: {e}"),
    })?;
    if value <= Decimal::ZERO {
        return Err(AppError::InvalidAmount {
            field: field.to_string(),
            message: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

pub fn to_wei(value: Decimal) -> Result<U256, AppError> {
    if value.is_sign_negative() {
        return Err(AppError::InvalidAmount {
            field: "amount".into(),
            message: "negative amounts are not allowed".into(),
        });
    }
    let rounded = value.round_dp(AMOUNT_DECIMALS);
    let mantissa = u128::try_from(rounded.mantissa()).map_err(|_| AppError::InvalidAmount {
        field: "amount".into(),
        message: "out of range".into(),
    })?;
    let scale_up = AMOUNT_DECIMALS.saturating_sub(rounded.scale());
    Ok(U256::from(mantissa).saturating_mul(U256::from(10u64).pow(U256::from(scale_up))))
}

pub fn from_wei(value: U256) -> Result<Decimal, AppError> {
    let raw = i128::try_from(value).map_err(|_| AppError::InvalidAmount {
        field: "amount".into(),
        message: format!("{value} wei exceeds display range"),
    })?;
    Decimal::try_from_i128_with_scale(raw, AMOUNT_DECIMALS).map_err(|e| AppError::InvalidAmount {
        field: "amount".into(),
        message: format!("{value} wei exceeds display range: {e}"),
    })
}

/// Six-place display string; falls back to the raw wei count when out of range.
pub fn display_wei(value: U256) -> String {
    match from_wei(value) {
        Ok(d) => d.round_dp(DISPLAY_DECIMALS).normalize().to_string(),
        Err(_) => format!("{value} wei"),
    }
}

/// Quick-pick shares of a wallet balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Quarter,
    Half,
    ThreeQuarters,
    Max,
}

impl Preset {
    pub fn bps(self) -> u64 {
        match self {
            Preset::Quarter => 2_500,
            Preset::Half => 5_000,
            Preset::ThreeQuarters => 7_500,
            Preset::Max => 10_000,
        }
    }

    pub fn from_percent(pct: u8) -> Option<Self> {
        match pct {
            25 => Some(Preset::Quarter),
            50 => Some(Preset::Half),
            75 => Some(Preset::ThreeQuarters),
            100 => Some(Preset::Max),
            _ => None,
        }
    }

    pub fn share_of(self, balance: U256) -> U256 {
        balance.saturating_mul(U256::from(self.bps())) / U256::from(BPS_DENOMINATOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::parsing::wei_to_f64;
    use rust_decimal_macros::dec;

    #[test]
    fn two_percent_slippage_on_hundred_tokens_floors_at_ninety_eight() {
        let hundred = U256::from(100u64) * WAD;
        assert_eq!(min_out(hundred, 200), U256::from(98u64) * WAD);
    }

    #[test]
    fn quote_round_trip_stays_within_a_millionth() {
        let prices = [
            U256::from(1_000_000_000_000u64),          // 0.000001
            U256::from(20_000_000_000_000_000u64),     // 0.02
            U256::from(3u64) * WAD,                    // 3
            U256::from(123_456_789u64) * WAD,          // large
        ];
        let amounts = [
            U256::from(1u64),
            U256::from(1_000_000_000_000_000_000u64),
            U256::from(987_654_321u64) * WAD + U256::from(12_345u64),
        ];
        for price in prices {
            for tokens in amounts {
                let counter = counter_for_tokens(tokens, price);
                let back = tokens_for_counter(counter, price).unwrap();
                let diff = (wei_to_f64(tokens) - wei_to_f64(back)).abs();
                assert!(diff < 1e-6, "price {price} tokens {tokens} drifted by {diff}");
            }
        }
    }

    #[test]
    fn zero_price_is_rejected() {
        assert!(matches!(
            tokens_for_counter(WAD, U256::ZERO),
            Err(AppError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn decimal_conversions_are_exact() {
        assert_eq!(to_wei(dec!(1.5)).unwrap(), U256::from(1_500_000_000_000_000_000u128));
        assert_eq!(to_wei(dec!(0.000000000000000001)).unwrap(), U256::from(1u64));
        assert_eq!(from_wei(U256::from(19_400_000_000_000_000_000u128)).unwrap(), dec!(19.4));
        assert!(to_wei(dec!(-1)).is_err());
    }

    #[test]
    fn display_rounds_to_six_places() {
        let v = to_wei(dec!(0.123456789)).unwrap();
        assert_eq!(display_wei(v), "0.123457");
    }

    #[test]
    fn parse_amount_rejects_zero_and_garbage() {
        assert!(parse_amount("value", "0").is_err());
        assert!(parse_amount("value", "abc").is_err());
        assert_eq!(parse_amount("value", " 2.5 ").unwrap(), dec!(2.5));
    }

    #[test]
    fn presets_take_share_of_balance() {
        let balance = U256::from(40u64) * WAD;
        assert_eq!(Preset::Quarter.share_of(balance), U256::from(10u64) * WAD);
        assert_eq!(Preset::from_percent(100).unwrap().share_of(balance), balance);
        assert!(Preset::from_percent(33).is_none());
    }

    #[test]
    fn buy_quote_carries_floor() {
        // 2 units at 0.02 each buys 100 tokens.
        let price = U256::from(20_000_000_000_000_000u64);
        let q = Quote::buy(U256::from(2u64) * WAD, price, 200).unwrap();
        assert_eq!(q.expected_out, U256::from(100u64) * WAD);
        assert_eq!(q.min_out, U256::from(98u64) * WAD);
        assert_eq!(q.display_expected_out(), "100");
    }

    #[test]
    fn token_sized_buy_derives_counter_input() {
        let price = U256::from(20_000_000_000_000_000u64);
        let q = Quote::buy_for_tokens(U256::from(100u64) * WAD, price, 200).unwrap();
        assert_eq!(q.input, U256::from(2u64) * WAD);
        assert_eq!(q.min_out, U256::from(98u64) * WAD);
        assert!(Quote::buy_for_tokens(WAD, U256::ZERO, 200).is_err());
    }
}
