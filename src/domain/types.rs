// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::parsing::wei_to_f64;
use crate::domain::constants::{BPS_DENOMINATOR, MAX_SLIPPAGE_BPS};
use crate::domain::error::AppError;
use alloy::primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Buy,
    Sell,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Buy => f.write_str("buy"),
            Direction::Sell => f.write_str("sell"),
        }
    }
}

/// Authoritative per-token state as the trading contract reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenMarketState {
    pub token: Address,
    pub name: String,
    pub symbol: String,
    pub creator: Address,
    /// Settlement currency per whole token, 18 decimals.
    pub unit_price: U256,
    pub current_supply: U256,
    pub max_supply: U256,
    pub creator_purchased: U256,
    pub creation_time: u64,
    pub unlocked: bool,
    pub completed: bool,
}

impl TokenMarketState {
    /// A snapshot is usable when supply is non-zero and within max supply.
    /// Freshly created tokens always carry the creator's initial allocation.
    pub fn is_structurally_valid(&self) -> bool {
        !self.current_supply.is_zero()
            && !self.max_supply.is_zero()
            && self.current_supply <= self.max_supply
    }
}

/// One user action, discarded once settled or failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TradeIntent {
    pub token: Address,
    pub wallet: Address,
    pub direction: Direction,
    /// Buy: settlement currency sent. Sell: tokens sold.
    pub input_amount: U256,
    /// Buy: tokens expected. Sell: settlement currency expected.
    pub quoted_amount: U256,
    pub slippage_bps: u64,
}

impl TradeIntent {
    pub fn buy(
        token: Address,
        wallet: Address,
        value: U256,
        quoted_tokens: U256,
        slippage_bps: u64,
    ) -> Self {
        Self {
            token,
            wallet,
            direction: Direction::Buy,
            input_amount: value,
            quoted_amount: quoted_tokens,
            slippage_bps,
        }
    }

    pub fn sell(
        token: Address,
        wallet: Address,
        tokens: U256,
        quoted_payout: U256,
        slippage_bps: u64,
    ) -> Self {
        Self {
            token,
            wallet,
            direction: Direction::Sell,
            input_amount: tokens,
            quoted_amount: quoted_payout,
            slippage_bps,
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.token == Address::ZERO {
            return Err(AppError::InvalidAddress(format!("{:#x}", self.token)));
        }
        if self.input_amount.is_zero() {
            return Err(AppError::InvalidAmount {
                field: "input_amount".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.quoted_amount.is_zero() {
            return Err(AppError::InvalidAmount {
                field: "quoted_amount".into(),
                message: "quote resolved to zero; check the unit price".into(),
            });
        }
        if self.slippage_bps > MAX_SLIPPAGE_BPS {
            return Err(AppError::InvalidAmount {
                field: "slippage_bps".into(),
                message: format!("{} exceeds {}", self.slippage_bps, MAX_SLIPPAGE_BPS),
            });
        }
        Ok(())
    }

    /// Lowest acceptable counter-leg amount under the slippage tolerance.
    pub fn min_counter_out(&self) -> U256 {
        let keep_bps = BPS_DENOMINATOR.saturating_sub(self.slippage_bps);
        self.quoted_amount.saturating_mul(U256::from(keep_bps)) / U256::from(BPS_DENOMINATOR)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettlementStatus {
    Success,
    Reverted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementReceipt {
    pub tx_hash: B256,
    pub direction: Direction,
    /// Buy: tokens received. Sell: settlement currency received.
    pub realized_amount: U256,
    /// The other leg as the event reports it.
    pub counter_amount: U256,
    pub gas_cost: U256,
    pub status: SettlementStatus,
}

/// Read-side mirror of [`TokenMarketState`]. Never authoritative.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedTokenRecord {
    pub token: Address,
    pub name: String,
    pub symbol: String,
    pub creator: Address,
    pub unit_price: U256,
    pub current_supply: U256,
    pub max_supply: U256,
    pub creator_purchased: U256,
    /// Unix seconds.
    pub creation_time: u64,
    pub unlocked: bool,
    pub completed: bool,
    /// Legacy trading contract for this token; `None` trades on the launchpad.
    pub factory: Option<Address>,
    pub approx_price: f64,
    pub market_cap: f64,
    pub last_synced: DateTime<Utc>,
}

impl CachedTokenRecord {
    pub fn from_state(state: &TokenMarketState, synced_at: DateTime<Utc>) -> Self {
        let approx_price = wei_to_f64(state.unit_price);
        let market_cap = wei_to_f64(state.current_supply) * approx_price;
        Self {
            token: state.token,
            name: state.name.clone(),
            symbol: state.symbol.clone(),
            creator: state.creator,
            unit_price: state.unit_price,
            current_supply: state.current_supply,
            max_supply: state.max_supply,
            creator_purchased: state.creator_purchased,
            creation_time: state.creation_time,
            unlocked: state.unlocked,
            completed: state.completed,
            factory: None,
            approx_price,
            market_cap,
            last_synced: synced_at,
        }
    }

    /// Carry the factory over from `previous`.
    ///
    /// Lock and completion flags only move forward; a lagging read must not undo them.
    pub fn merge_previous(mut self, previous: Option<&CachedTokenRecord>) -> Self {
        if let Some(prev) = previous {
            if self.factory.is_none() {
                self.factory = prev.factory;
            }
            if prev.unlocked && !self.unlocked {
                tracing::warn!(
                    target: "reconciler",
                    token = %self.token,
                    "Ledger read reports locked after unlock; keeping unlocked"
                );
                self.unlocked = true;
            }
            if prev.completed && !self.completed {
                tracing::warn!(
                    target: "reconciler",
                    token = %self.token,
                    "Ledger read reports active after completion; keeping completed"
                );
                self.completed = true;
            }
        }
        self
    }
}
