// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::{RetryPolicy, retry_with};
use crate::domain::error::AppError;
use crate::domain::types::{CachedTokenRecord, TokenMarketState};
use crate::infrastructure::data::token_cache::TokenCacheStore;
use crate::infrastructure::network::ledger::LedgerReader;
use alloy::primitives::{Address, U256};
use chrono::Utc;

/// Extra condition a snapshot must meet beyond structural validity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Freshness {
    Any,
    /// Post-buy: supply must have grown past the pre-trade value.
    SupplyAbove(U256),
}

impl Freshness {
    fn accepts(&self, state: &TokenMarketState) -> bool {
        match self {
            Freshness::Any => true,
            Freshness::SupplyAbove(pre) => state.current_supply > *pre,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReconcileOutcome {
    Committed(CachedTokenRecord),
    /// Every attempt was stale or failed; the cache was left untouched.
    Stale { attempts: usize },
}

impl ReconcileOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, ReconcileOutcome::Committed(_))
    }
}

#[derive(Debug)]
enum Miss {
    Stale,
    Read(AppError),
}

/// Re-read authoritative state until a usable snapshot arrives, then commit it.
/// Reads go to the token's cached factory when it has one. Failures are logged
/// and absorbed.
pub async fn reconcile<L, C>(
    ledger: &L,
    cache: &C,
    token: Address,
    freshness: Freshness,
    policy: RetryPolicy,
) -> ReconcileOutcome
where
    L: LedgerReader,
    C: TokenCacheStore,
{
    let factory = match cache.load(token).await {
        Ok(record) => record.and_then(|r| r.factory),
        Err(e) => {
            tracing::warn!(target: "reconciler", token = %token, error = %e, "Cache read failed; using launchpad");
            None
        }
    };
    let venue = factory.unwrap_or_else(|| ledger.launchpad());

    let mut attempts = 0usize;
    let fetched = retry_with(
        policy,
        |_: &Miss| true,
        |attempt| {
            attempts = attempt;
            async move {
                let state = ledger.token_state(venue, token).await.map_err(Miss::Read)?;
                if state.is_structurally_valid() && freshness.accepts(&state) {
                    Ok(state)
                } else {
                    tracing::debug!(
                        target: "reconciler",
                        token = %token,
                        attempt,
                        supply = %state.current_supply,
                        "Snapshot not yet usable"
                    );
                    Err(Miss::Stale)
                }
            }
        },
    )
    .await;

    let state = match fetched {
        Ok(state) => state,
        Err(miss) => {
            let reason = match miss {
                Miss::Stale => "stale".to_string(),
                Miss::Read(e) => e.to_string(),
            };
            tracing::warn!(
                target: "reconciler",
                token = %token,
                attempts,
                reason = %reason,
                "Reconciliation exhausted; cache left stale"
            );
            return ReconcileOutcome::Stale { attempts };
        }
    };

    match commit(cache, &state).await {
        Ok(record) => {
            tracing::info!(
                target: "reconciler",
                token = %token,
                attempts,
                supply = %record.current_supply,
                market_cap = record.market_cap,
                "Cache reconciled"
            );
            ReconcileOutcome::Committed(record)
        }
        Err(e) => {
            tracing::warn!(target: "reconciler", token = %token, error = %e, "Cache commit failed");
            ReconcileOutcome::Stale { attempts }
        }
    }
}

async fn commit<C: TokenCacheStore>(
    cache: &C,
    state: &TokenMarketState,
) -> Result<CachedTokenRecord, AppError> {
    let previous = cache.load(state.token).await?;
    let record =
        CachedTokenRecord::from_state(state, Utc::now()).merge_previous(previous.as_ref());
    cache.commit(record.clone()).await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::WAD;
    use crate::infrastructure::data::token_cache::MemoryTokenCache;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TOKEN: Address = Address::new([0x11; 20]);

    struct ScriptedReader {
        supplies: Mutex<VecDeque<u64>>,
        reads: AtomicUsize,
        venues: Mutex<Vec<Address>>,
    }

    impl ScriptedReader {
        fn new(supplies: &[u64]) -> Self {
            Self {
                supplies: Mutex::new(supplies.iter().copied().collect()),
                reads: AtomicUsize::new(0),
                venues: Mutex::new(Vec::new()),
            }
        }
    }

    impl LedgerReader for ScriptedReader {
        fn launchpad(&self) -> Address {
            Address::new([0xaa; 20])
        }

        async fn token_state(&self, venue: Address, token: Address) -> Result<TokenMarketState, AppError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.venues.lock().unwrap().push(venue);
            let supply = self
                .supplies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AppError::Connection("script exhausted".into()))?;
            Ok(TokenMarketState {
                token,
                name: "S".into(),
                symbol: "S".into(),
                creator: Address::ZERO,
                unit_price: WAD,
                current_supply: U256::from(supply) * WAD,
                max_supply: U256::from(1_000u64) * WAD,
                creator_purchased: U256::ZERO,
                creation_time: 0,
                unlocked: false,
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

    fn fast() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn stale_stale_fresh_commits_third_read_only() {
        let reader = ScriptedReader::new(&[10, 10, 12, 99]);
        let cache = MemoryTokenCache::new();
        let pre = U256::from(10u64) * WAD;

        let outcome = reconcile(&reader, &cache, TOKEN, Freshness::SupplyAbove(pre), fast()).await;

        assert!(outcome.is_committed());
        assert_eq!(reader.reads.load(Ordering::SeqCst), 3);
        let cached = cache.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(cached.current_supply, U256::from(12u64) * WAD);
    }

    #[tokio::test]
    async fn exhaustion_leaves_cache_untouched() {
        let reader = ScriptedReader::new(&[0, 0, 0]);
        let cache = MemoryTokenCache::new();

        let outcome = reconcile(&reader, &cache, TOKEN, Freshness::Any, fast()).await;

        assert_eq!(outcome, ReconcileOutcome::Stale { attempts: 3 });
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn read_errors_count_as_attempts() {
        let reader = ScriptedReader::new(&[]);
        let cache = MemoryTokenCache::new();
        let outcome = reconcile(&reader, &cache, TOKEN, Freshness::Any, fast()).await;
        assert_eq!(outcome, ReconcileOutcome::Stale { attempts: 3 });
        assert_eq!(reader.reads.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cached_factory_routes_reads_and_survives_commit() {
        let legacy = Address::new([0x44; 20]);
        let reader = ScriptedReader::new(&[10, 11]);
        let cache = MemoryTokenCache::new();

        reconcile(&reader, &cache, TOKEN, Freshness::Any, fast()).await;
        let mut tracked = cache.load(TOKEN).await.unwrap().unwrap();
        tracked.factory = Some(legacy);
        cache.commit(tracked).await.unwrap();

        let outcome = reconcile(&reader, &cache, TOKEN, Freshness::Any, fast()).await;
        assert!(outcome.is_committed());
        assert_eq!(
            *reader.venues.lock().unwrap(),
            vec![Address::new([0xaa; 20]), legacy]
        );
        let cached = cache.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(cached.factory, Some(legacy));
        assert_eq!(cached.current_supply, U256::from(11u64) * WAD);
    }
}
