// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::retry_async;
use crate::domain::error::AppError;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::providers::Provider;
use alloy::rpc::types::BlockNumberOrTag;
use alloy::rpc::types::eth::FeeHistory;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Floor tip when the node reports none.
const DEFAULT_PRIORITY_FEE_WEI: u128 = 1_000_000_000;

#[derive(Clone)]
pub struct GasOracle {
    provider: HttpProvider,
    last_good: Arc<Mutex<Option<GasFees>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasFees {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
    pub next_base_fee_per_gas: u128,
}

impl GasOracle {
    pub fn new(provider: HttpProvider) -> Self {
        Self {
            provider,
            last_good: Arc::new(Mutex::new(None)),
        }
    }

    /// Fee history first, then the last good sample, then `eth_gasPrice`.
    pub async fn estimate_eip1559_fees(&self) -> Result<GasFees, AppError> {
        match self.with_retry_history().await {
            Ok(history) => {
                let fees = fees_from_history(&history)?;
                if let Ok(mut guard) = self.last_good.lock() {
                    *guard = Some(fees);
                }
                Ok(fees)
            }
            Err(e) => {
                tracing::debug!(target: "ledger", error = %e, "Fee history unavailable");
                if let Ok(guard) = self.last_good.lock()
                    && let Some(fees) = *guard
                {
                    return Ok(fees);
                }
                self.fallback_estimate().await
            }
        }
    }

    async fn with_retry_history(&self) -> Result<FeeHistory, AppError> {
        let provider = self.provider.clone();
        retry_async(
            move |_| {
                let provider = provider.clone();
                async move {
                    provider
                        .get_fee_history(5, BlockNumberOrTag::Latest, &[50.0f64])
                        .await
                }
            },
            3,
            Duration::from_millis(100),
        )
        .await
        .map_err(|e| AppError::Connection(format!("Fee history failed: {e}")))
    }

    async fn fallback_estimate(&self) -> Result<GasFees, AppError> {
        let gas_price = self
            .provider
            .get_gas_price()
            .await
            .map_err(|e| AppError::Connection(format!("Gas price fetch failed: {e}")))?;
        let tip = self
            .provider
            .get_max_priority_fee_per_gas()
            .await
            .unwrap_or(DEFAULT_PRIORITY_FEE_WEI)
            .min(gas_price);
        Ok(GasFees {
            max_fee_per_gas: gas_price.saturating_mul(2).max(tip),
            max_priority_fee_per_gas: tip,
            next_base_fee_per_gas: gas_price,
        })
    }
}

pub fn fees_from_history(history: &FeeHistory) -> Result<GasFees, AppError> {
    let latest_base_fee = history
        .latest_block_base_fee()
        .or_else(|| history.base_fee_per_gas.iter().rev().nth(1).copied())
        .ok_or(AppError::Connection("No base fee history".into()))?;

    let raw_next_base = history.next_block_base_fee().unwrap_or(latest_base_fee);
    // Nodes that return zeroes get a 12.5% bump on the last seen base fee.
    let next_base_fee = if raw_next_base == 0 {
        latest_base_fee.saturating_mul(1125) / 1000
    } else {
        raw_next_base
    };

    let tips: Vec<u128> = history
        .reward
        .as_ref()
        .map(|rewards| rewards.iter().filter_map(|r| r.first().copied()).collect())
        .unwrap_or_default();
    let tip = if tips.is_empty() {
        DEFAULT_PRIORITY_FEE_WEI
    } else {
        tips.iter().sum::<u128>() / tips.len() as u128
    };

    Ok(GasFees {
        // Two base fees of headroom keeps the tx valid across a short fee spike.
        max_fee_per_gas: next_base_fee.saturating_mul(2).saturating_add(tip),
        max_priority_fee_per_gas: tip,
        next_base_fee_per_gas: next_base_fee,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_history_averages_tips_and_doubles_base() {
        let history = FeeHistory {
            base_fee_per_gas: vec![100, 110, 120],
            gas_used_ratio: vec![0.5, 0.6],
            base_fee_per_blob_gas: vec![],
            blob_gas_used_ratio: vec![],
            oldest_block: 1,
            reward: Some(vec![vec![10], vec![30]]),
        };
        let fees = fees_from_history(&history).unwrap();
        assert_eq!(fees.next_base_fee_per_gas, 120);
        assert_eq!(fees.max_priority_fee_per_gas, 20);
        assert_eq!(fees.max_fee_per_gas, 260);
    }

    #[test]
    fn empty_history_is_an_error() {
        let history = FeeHistory::default();
        assert!(fees_from_history(&history).is_err());
    }
}
