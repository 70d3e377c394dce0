// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! At most one pending settlement per wallet, token and direction.
//!
//! A guard is taken before anything is signed and released when it drops,
//! so early returns and errors can never leave a key stuck.

use crate::domain::error::AppError;
use crate::domain::types::Direction;
use alloy::primitives::Address;
use dashmap::DashSet;
use std::sync::Arc;

pub type TradeKey = (Address, Address, Direction);

#[derive(Clone, Debug, Default)]
pub struct InFlightRegistry {
    active: Arc<DashSet<TradeKey>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(
        &self,
        wallet: Address,
        token: Address,
        direction: Direction,
    ) -> Result<InFlightGuard, AppError> {
        let key = (wallet, token, direction);
        if !self.active.insert(key) {
            tracing::warn!(
                target: "settlement",
                wallet = %wallet,
                token = %token,
                direction = %direction,
                "Rejected duplicate submission while a trade is pending"
            );
            return Err(AppError::TradeInFlight {
                token: format!("{token:#x}"),
                direction: direction.to_string(),
            });
        }
        Ok(InFlightGuard {
            key,
            active: self.active.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    key: TradeKey,
    active: Arc<DashSet<TradeKey>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_guard_drops() {
        let reg = InFlightRegistry::new();
        let wallet = Address::from([1u8; 20]);
        let token = Address::from([2u8; 20]);

        let guard = reg.acquire(wallet, token, Direction::Buy).unwrap();
        assert!(matches!(
            reg.acquire(wallet, token, Direction::Buy),
            Err(AppError::TradeInFlight { .. })
        ));
        // Opposite direction is a different key.
        let sell = reg.acquire(wallet, token, Direction::Sell).unwrap();
        assert_eq!(reg.len(), 2);

        drop(guard);
        drop(sell);
        assert!(reg.is_empty());
        assert!(reg.acquire(wallet, token, Direction::Buy).is_ok());
    }
}
