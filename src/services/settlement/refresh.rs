// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::RetryPolicy;
use crate::infrastructure::data::token_cache::TokenCacheStore;
use crate::infrastructure::network::ledger::LedgerReader;
use crate::services::settlement::reconciler::{Freshness, reconcile};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Owns the periodic cache refresh. Dropping the handle cancels the task.
pub struct RefreshHandle {
    cancel: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub fn spawn<L, C>(
        ledger: Arc<L>,
        cache: C,
        interval: Duration,
        policy: RetryPolicy,
    ) -> Self
    where
        L: LedgerReader + 'static,
        C: TokenCacheStore + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(target: "refresh", interval_ms = interval.as_millis() as u64, "Refresh task started");
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let tokens = match cache.tracked_tokens().await {
                    Ok(tokens) => tokens,
                    Err(e) => {
                        tracing::warn!(target: "refresh", error = %e, "Could not list tracked tokens");
                        continue;
                    }
                };
                let mut refreshed = 0usize;
                for addr in &tokens {
                    if token.is_cancelled() {
                        break;
                    }
                    if reconcile(ledger.as_ref(), &cache, *addr, Freshness::Any, policy)
                        .await
                        .is_committed()
                    {
                        refreshed += 1;
                    }
                }
                tracing::debug!(
                    target: "refresh",
                    tracked = tokens.len(),
                    refreshed,
                    "Refresh pass complete"
                );
            }
            tracing::info!(target: "refresh", "Refresh task stopped");
        });
        Self {
            cancel,
            join: Some(join),
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(join) = self.join.take()
            && let Err(e) = join.await
        {
            tracing::warn!(target: "refresh", error = %e, "Refresh task ended abnormally");
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::WAD;
    use crate::domain::error::AppError;
    use crate::domain::types::{CachedTokenRecord, TokenMarketState};
    use crate::infrastructure::data::token_cache::MemoryTokenCache;
    use alloy::primitives::{Address, U256};
    use chrono::Utc;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct GrowingReader {
        supply: AtomicU64,
    }

    impl LedgerReader for GrowingReader {
        fn launchpad(&self) -> Address {
            Address::ZERO
        }
        async fn token_state(&self, _venue: Address, token: Address) -> Result<TokenMarketState, AppError> {
            let supply = self.supply.fetch_add(1, Ordering::SeqCst);
            Ok(TokenMarketState {
                token,
                name: "G".into(),
                symbol: "G".into(),
                creator: Address::ZERO,
                unit_price: WAD,
                current_supply: U256::from(supply) * WAD,
                max_supply: U256::from(1_000_000u64) * WAD,
                creator_purchased: U256::ZERO,
                creation_time: 0,
                unlocked: true,
                completed: false,
            })
        }
        async fn fee_bps(&self) -> Result<u64, AppError> {
            Ok(300)
        }
        async fn post_migration_fee_bps(&self) -> Result<u64, AppError> {
            Ok(0)
        }
        async fn native_balance(&self, _: Address) -> Result<U256, AppError> {
            Ok(U256::ZERO)
        }
        async fn token_balance(&self, _: Address, _: Address) -> Result<U256, AppError> {
            Ok(U256::ZERO)
        }
        async fn allowance(&self, _: Address, _: Address, _: Address) -> Result<U256, AppError> {
            Ok(U256::ZERO)
        }
        async fn all_tokens(&self) -> Result<Vec<Address>, AppError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn refresh_updates_tracked_tokens_until_shutdown() {
        let token = Address::new([0x33; 20]);
        let reader = Arc::new(GrowingReader {
            supply: AtomicU64::new(1),
        });
        let cache = MemoryTokenCache::new();
        let seed = reader.token_state(Address::ZERO, token).await.unwrap();
        cache
            .commit(CachedTokenRecord::from_state(&seed, Utc::now()))
            .await
            .unwrap();

        let handle = RefreshHandle::spawn(
            reader.clone(),
            cache.clone(),
            Duration::from_millis(5),
            RetryPolicy::fixed(1, Duration::from_millis(1)),
        );
        assert!(handle.is_running());
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.shutdown().await;

        let after = cache.load(token).await.unwrap().unwrap();
        assert!(after.current_supply > seed.current_supply);

        let reads = reader.supply.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(reader.supply.load(Ordering::SeqCst), reads, "no reads after shutdown");
    }
}
