// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Trade orchestration: quote, pre-flight, submit, classify, reconcile.
//!
//! Every fund-affecting decision reads the ledger fresh; the cache is only
//! written through the reconciler.

use crate::app::config::GlobalSettings;
use crate::common::inflight::InFlightRegistry;
use crate::common::retry::{RetryPolicy, retry_with};
use crate::domain::constants::{
    DEFAULT_RECEIPT_TIMEOUT_MS, DEFAULT_SELL_FEE_BPS, DEFAULT_SLIPPAGE_BPS, RECONCILE_ATTEMPTS,
    RECONCILE_DELAY, SYNC_CONCURRENCY,
};
use crate::domain::error::AppError;
use crate::domain::types::{
    CachedTokenRecord, Direction, SettlementReceipt, SettlementStatus, TokenMarketState,
    TradeIntent,
};
use crate::infrastructure::data::token_cache::TokenCacheStore;
use crate::infrastructure::network::ledger::{LedgerCall, LedgerReader, LedgerWriter};
use crate::services::settlement::events;
use crate::services::settlement::lifecycle::{self, GateDecision, LockPolicy};
use crate::services::settlement::liquidity::{self, LiquidityAssessment};
use crate::services::settlement::quote::{Preset, Quote, display_wei};
use crate::services::settlement::reconciler::{Freshness, ReconcileOutcome, reconcile};
use crate::services::settlement::refresh::RefreshHandle;
use crate::services::settlement::submitter::Submitter;
use alloy::primitives::{Address, B256, U256};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkParams {
    pub chain_id: u64,
    pub launchpad: Address,
}

/// Explicit session: ledger handle, acting wallet and network.
pub struct TradeContext<L> {
    pub ledger: Arc<L>,
    pub wallet: Address,
    pub network: NetworkParams,
}

impl<L> TradeContext<L>
where
    L: LedgerReader + LedgerWriter,
{
    pub fn new(ledger: Arc<L>, chain_id: u64) -> Self {
        let wallet = ledger.wallet();
        let launchpad = ledger.launchpad();
        Self {
            ledger,
            wallet,
            network: NetworkParams {
                chain_id,
                launchpad,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineSettings {
    pub slippage_bps: u64,
    pub fallback_fee_bps: u64,
    pub lock_policy: LockPolicy,
    pub enforce_sell_slippage: bool,
    pub confirmation_timeout: Duration,
    pub reconcile_policy: RetryPolicy,
    pub read_policy: RetryPolicy,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
            fallback_fee_bps: DEFAULT_SELL_FEE_BPS,
            lock_policy: LockPolicy::default(),
            enforce_sell_slippage: false,
            confirmation_timeout: Duration::from_millis(DEFAULT_RECEIPT_TIMEOUT_MS),
            reconcile_policy: RetryPolicy::fixed(RECONCILE_ATTEMPTS, RECONCILE_DELAY),
            read_policy: RetryPolicy::exponential(3, Duration::from_millis(200)),
        }
    }
}

impl EngineSettings {
    pub fn from_settings(settings: &GlobalSettings) -> Self {
        Self {
            slippage_bps: settings.slippage_bps,
            fallback_fee_bps: settings.sell_fee_bps,
            lock_policy: settings.lock_policy,
            enforce_sell_slippage: settings.enforce_sell_slippage,
            confirmation_timeout: settings.receipt_timeout(),
            reconcile_policy: settings.reconcile_policy(),
            ..Self::default()
        }
    }
}

/// Caller's answer to a capped-payout warning.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShortfallAck {
    #[default]
    Refuse,
    Accept,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TradeOutcome {
    pub receipt: SettlementReceipt,
    /// Floor the trade was checked against.
    pub min_counter_out: U256,
    pub liquidity: Option<LiquidityAssessment>,
    pub slippage_breached: bool,
    pub reconciled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SellPreflight {
    pub state: TokenMarketState,
    pub fee_bps: u64,
    pub quote: Quote,
    pub assessment: LiquidityAssessment,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenStatus {
    pub state: TokenMarketState,
    /// Legacy trading contract, when the token is not on the launchpad.
    pub factory: Option<Address>,
    pub gate: Result<GateDecision, String>,
    pub unlock_progress_bps: u64,
    pub contract_balance: U256,
    pub fee_bps: Option<u64>,
    pub post_migration_fee_bps: Option<u64>,
    pub cached: Option<CachedTokenRecord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreatedToken {
    pub token: Address,
    pub tx_hash: B256,
    pub reconciled: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub listed: usize,
    pub committed: usize,
    pub stale: Vec<Address>,
}

pub struct TradeEngine<L, C> {
    ctx: TradeContext<L>,
    cache: C,
    settings: EngineSettings,
    inflight: InFlightRegistry,
}

impl<L, C> TradeEngine<L, C>
where
    L: LedgerReader + LedgerWriter + 'static,
    C: TokenCacheStore + Clone + 'static,
{
    pub fn new(ctx: TradeContext<L>, cache: C, settings: EngineSettings) -> Self {
        Self {
            ctx,
            cache,
            settings,
            inflight: InFlightRegistry::new(),
        }
    }

    pub fn context(&self) -> &TradeContext<L> {
        &self.ctx
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    fn ledger(&self) -> &L {
        self.ctx.ledger.as_ref()
    }

    /// Factory recorded for `token`, if it trades on a legacy contract.
    async fn factory_of(&self, token: Address) -> Option<Address> {
        match self.cache.load(token).await {
            Ok(record) => record.and_then(|r| r.factory),
            Err(e) => {
                tracing::warn!(target: "db", token = %token, error = %e, "Cache read failed");
                None
            }
        }
    }

    fn venue(&self, factory: Option<Address>) -> Address {
        factory.unwrap_or(self.ctx.network.launchpad)
    }

    /// Fresh state for a listed token; unlisted addresses read back as zero supply.
    pub async fn fresh_state(&self, token: Address) -> Result<TokenMarketState, AppError> {
        let venue = self.venue(self.factory_of(token).await);
        self.fresh_state_at(venue, token).await
    }

    async fn fresh_state_at(
        &self,
        venue: Address,
        token: Address,
    ) -> Result<TokenMarketState, AppError> {
        if token == Address::ZERO {
            return Err(AppError::InvalidAddress(format!("{token:#x}")));
        }
        let ledger = self.ledger();
        let state = retry_with(self.settings.read_policy, AppError::is_retryable, |_| {
            ledger.token_state(venue, token)
        })
        .await?;
        if state.current_supply.is_zero() {
            return Err(AppError::InvalidAddress(format!(
                "{token:#x} is not a launchpad token"
            )));
        }
        Ok(state)
    }

    async fn sell_fee_bps(&self) -> u64 {
        match self.ledger().fee_bps().await {
            Ok(bps) => bps,
            Err(e) => {
                tracing::warn!(
                    target: "liquidity",
                    error = %e,
                    fallback_bps = self.settings.fallback_fee_bps,
                    "Fee read failed; using configured fallback"
                );
                self.settings.fallback_fee_bps
            }
        }
    }

    fn slippage(&self, override_bps: Option<u64>) -> u64 {
        override_bps.unwrap_or(self.settings.slippage_bps)
    }

    pub async fn quote_buy(
        &self,
        token: Address,
        value: U256,
        slippage_bps: Option<u64>,
    ) -> Result<Quote, AppError> {
        let state = self.fresh_state(token).await?;
        let quote = Quote::buy(value, state.unit_price, self.slippage(slippage_bps))?;
        tracing::debug!(
            target: "quote",
            token = %token,
            input = %quote.display_input(),
            expected = %quote.display_expected_out(),
            "Buy quoted"
        );
        Ok(quote)
    }

    /// Quote a buy sized by the number of tokens wanted.
    pub async fn quote_buy_for_tokens(
        &self,
        token: Address,
        tokens: U256,
        slippage_bps: Option<u64>,
    ) -> Result<Quote, AppError> {
        let state = self.fresh_state(token).await?;
        let quote = Quote::buy_for_tokens(tokens, state.unit_price, self.slippage(slippage_bps))?;
        tracing::debug!(
            target: "quote",
            token = %token,
            tokens = %quote.display_expected_out(),
            cost = %quote.display_input(),
            "Buy quoted from token amount"
        );
        Ok(quote)
    }

    /// Quote a sell and run the liquidity guard against current balances.
    pub async fn preflight_sell(
        &self,
        token: Address,
        amount: U256,
        slippage_bps: Option<u64>,
    ) -> Result<SellPreflight, AppError> {
        let venue = self.venue(self.factory_of(token).await);
        let state = self.fresh_state_at(venue, token).await?;
        self.assess_sell(venue, state, amount, slippage_bps).await
    }

    /// `venue` is the contract whose balance pays the sell.
    async fn assess_sell(
        &self,
        venue: Address,
        state: TokenMarketState,
        amount: U256,
        slippage_bps: Option<u64>,
    ) -> Result<SellPreflight, AppError> {
        let fee_bps = self.sell_fee_bps().await;
        let expected = liquidity::expected_payout(amount, state.unit_price, fee_bps);
        let balance = self.ledger().native_balance(venue).await?;
        let assessment = liquidity::assess(expected, balance)?;
        let quote = Quote::sell(amount, expected, state.unit_price, self.slippage(slippage_bps));
        Ok(SellPreflight {
            state,
            fee_bps,
            quote,
            assessment,
        })
    }

    /// Share of the wallet's balance: native for buys, the token for sells.
    pub async fn preset_amount(
        &self,
        token: Address,
        direction: Direction,
        preset: Preset,
    ) -> Result<U256, AppError> {
        let balance = match direction {
            Direction::Buy => self.ledger().native_balance(self.ctx.wallet).await?,
            Direction::Sell => self.ledger().token_balance(token, self.ctx.wallet).await?,
        };
        Ok(preset.share_of(balance))
    }

    pub async fn status(&self, token: Address) -> Result<TokenStatus, AppError> {
        let factory = self.factory_of(token).await;
        let venue = self.venue(factory);
        let state = self.fresh_state_at(venue, token).await?;
        let gate = lifecycle::check(&state, self.ctx.wallet, self.settings.lock_policy)
            .map_err(|e| e.to_string());
        let contract_balance = self.ledger().native_balance(venue).await?;
        let fee_bps = self.ledger().fee_bps().await.ok();
        let post_migration_fee_bps = self.ledger().post_migration_fee_bps().await.ok();
        let cached = self.cache.load(token).await.unwrap_or_else(|e| {
            tracing::warn!(target: "db", token = %token, error = %e, "Cache read failed");
            None
        });
        Ok(TokenStatus {
            unlock_progress_bps: lifecycle::unlock_progress_bps(&state),
            state,
            factory,
            gate,
            contract_balance,
            fee_bps,
            post_migration_fee_bps,
            cached,
        })
    }

    pub async fn buy(
        &self,
        token: Address,
        value: U256,
        slippage_bps: Option<u64>,
    ) -> Result<TradeOutcome, AppError> {
        let wallet = self.ctx.wallet;
        if value.is_zero() {
            return Err(AppError::InvalidAmount {
                field: "value".into(),
                message: "must be greater than zero".into(),
            });
        }
        let _guard = self.inflight.acquire(wallet, token, Direction::Buy)?;

        let factory = self.factory_of(token).await;
        let venue = self.venue(factory);
        let state = self.fresh_state_at(venue, token).await?;
        lifecycle::check(&state, wallet, self.settings.lock_policy)?;

        let available = self.ledger().native_balance(wallet).await?;
        if available < value {
            return Err(AppError::InsufficientFunds {
                required: display_wei(value),
                available: display_wei(available),
            });
        }

        let quote = Quote::buy(value, state.unit_price, self.slippage(slippage_bps))?;
        let intent = TradeIntent::buy(token, wallet, value, quote.expected_out, quote.slippage_bps);
        intent.validate()?;
        let floor = intent.min_counter_out();
        tracing::info!(
            target: "settlement",
            token = %token,
            value = %display_wei(value),
            expected = %quote.display_expected_out(),
            min_out = %display_wei(floor),
            "Submitting buy"
        );

        let submitter = Submitter::new(self.ledger(), self.settings.confirmation_timeout);
        let confirmed = match submitter.buy(token, factory, value, floor).await {
            Ok(confirmed) => confirmed,
            Err(e @ AppError::ConfirmationTimeout { .. }) => {
                return Err(self.unsettled(token, e).await);
            }
            Err(e) => return Err(e),
        };
        let receipt = match events::classify(&confirmed, venue, token, wallet, Direction::Buy) {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.unsettled(token, e).await),
        };

        let reconciled = self
            .reconcile(token, Freshness::SupplyAbove(state.current_supply))
            .await
            .is_committed();
        tracing::info!(
            target: "settlement",
            token = %token,
            hash = %receipt.tx_hash,
            tokens = %display_wei(receipt.realized_amount),
            reconciled,
            "Buy settled"
        );
        Ok(TradeOutcome {
            receipt,
            min_counter_out: floor,
            liquidity: None,
            slippage_breached: false,
            reconciled,
        })
    }

    pub async fn sell(
        &self,
        token: Address,
        amount: U256,
        slippage_bps: Option<u64>,
        ack: ShortfallAck,
    ) -> Result<TradeOutcome, AppError> {
        let wallet = self.ctx.wallet;
        if amount.is_zero() {
            return Err(AppError::InvalidAmount {
                field: "amount".into(),
                message: "must be greater than zero".into(),
            });
        }
        let _guard = self.inflight.acquire(wallet, token, Direction::Sell)?;

        let factory = self.factory_of(token).await;
        let venue = self.venue(factory);
        let (preflight, assessment, floor) =
            self.sell_checks(venue, token, amount, slippage_bps, ack).await?;

        let submitter = Submitter::new(self.ledger(), self.settings.confirmation_timeout);
        let approval = match submitter.ensure_allowance(token, venue, amount).await {
            Ok(approval) => approval,
            Err(e @ AppError::ConfirmationTimeout { .. }) => {
                return Err(self.unsettled(token, e).await);
            }
            Err(e) => return Err(e),
        };

        // State may have moved while the approval was mined.
        let (preflight, assessment, floor) = match approval {
            None => (preflight, assessment, floor),
            Some(hash) => match self
                .sell_checks(venue, token, amount, slippage_bps, ack)
                .await
            {
                Ok(checked) => checked,
                Err(e) => {
                    tracing::warn!(
                        target: "settlement",
                        token = %token,
                        approval = %hash,
                        error = %e,
                        "Sell aborted after approval; allowance stays outstanding"
                    );
                    return Err(e);
                }
            },
        };
        tracing::info!(
            target: "settlement",
            token = %token,
            venue = %venue,
            amount = %display_wei(amount),
            expected = %display_wei(assessment.expected()),
            fee_bps = preflight.fee_bps,
            shortfall = assessment.is_shortfall(),
            "Submitting sell"
        );

        let confirmed = match submitter.sell(token, factory, amount, approval).await {
            Ok(confirmed) => confirmed,
            Err(e @ AppError::ConfirmationTimeout { .. }) => {
                return Err(self.unsettled(token, e).await);
            }
            Err(e) => return Err(e),
        };
        let receipt = match events::classify(&confirmed, venue, token, wallet, Direction::Sell) {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.unsettled(token, e).await),
        };

        let slippage_breached = receipt.realized_amount < floor;
        if slippage_breached {
            tracing::warn!(
                target: "settlement",
                token = %token,
                hash = %receipt.tx_hash,
                realized = %display_wei(receipt.realized_amount),
                floor = %display_wei(floor),
                "Sell settled below slippage floor"
            );
        }

        let reconciled = self.reconcile(token, Freshness::Any).await.is_committed();
        tracing::info!(
            target: "settlement",
            token = %token,
            hash = %receipt.tx_hash,
            payout = %display_wei(receipt.realized_amount),
            reconciled,
            "Sell settled"
        );
        Ok(TradeOutcome {
            receipt,
            min_counter_out: floor,
            liquidity: Some(assessment),
            slippage_breached,
            reconciled,
        })
    }

    /// Pre-sell checks against a fresh read: lifecycle gate, holdings, liquidity
    /// guard and the slippage floor.
    async fn sell_checks(
        &self,
        venue: Address,
        token: Address,
        amount: U256,
        slippage_bps: Option<u64>,
        ack: ShortfallAck,
    ) -> Result<(SellPreflight, LiquidityAssessment, U256), AppError> {
        let wallet = self.ctx.wallet;
        let state = self.fresh_state_at(venue, token).await?;
        lifecycle::check(&state, wallet, self.settings.lock_policy)?;
        let held = self.ledger().token_balance(token, wallet).await?;
        if held < amount {
            return Err(AppError::InsufficientFunds {
                required: display_wei(amount),
                available: display_wei(held),
            });
        }

        let preflight = self.assess_sell(venue, state, amount, slippage_bps).await?;
        let assessment = preflight
            .assessment
            .require_acknowledged(ack == ShortfallAck::Accept)?;
        let intent = TradeIntent::sell(
            token,
            wallet,
            amount,
            preflight.quote.expected_out,
            preflight.quote.slippage_bps,
        );
        intent.validate()?;
        let floor = intent.min_counter_out();
        if self.settings.enforce_sell_slippage && assessment.payout() < floor {
            return Err(AppError::SlippageExceeded {
                minimum: display_wei(floor),
                quoted: display_wei(assessment.payout()),
            });
        }
        Ok((preflight, assessment, floor))
    }

    /// A broadcast trade failed to settle cleanly; ledger state may still have moved.
    async fn unsettled(&self, token: Address, err: AppError) -> AppError {
        let reconciled = self.reconcile(token, Freshness::Any).await.is_committed();
        tracing::warn!(
            target: "settlement",
            token = %token,
            error = %err,
            reconciled,
            "Trade did not settle; cache re-read"
        );
        err
    }

    pub async fn create_token(
        &self,
        name: &str,
        symbol: &str,
        metadata: &str,
    ) -> Result<CreatedToken, AppError> {
        for (field, value) in [("name", name), ("symbol", symbol)] {
            if value.trim().is_empty() {
                return Err(AppError::InvalidAmount {
                    field: field.into(),
                    message: "must not be empty".into(),
                });
            }
        }
        let confirmed = Submitter::new(self.ledger(), self.settings.confirmation_timeout)
            .send(LedgerCall::CreateToken {
                name: name.trim().to_string(),
                symbol: symbol.trim().to_string(),
                metadata: metadata.to_string(),
            })
            .await?;
        if confirmed.status() == SettlementStatus::Reverted {
            return Err(events::revert_error(&confirmed, None));
        }
        let hash = format!("{:#x}", confirmed.tx_hash);
        let token = events::created_token(&confirmed, self.ctx.network.launchpad, self.ctx.wallet)
            .ok_or(AppError::SettlementUnconfirmed { hash })?;
        let reconciled = self.reconcile(token, Freshness::Any).await.is_committed();
        tracing::info!(target: "settlement", token = %token, symbol, reconciled, "Token created");
        Ok(CreatedToken {
            token,
            tx_hash: confirmed.tx_hash,
            reconciled,
        })
    }

    /// Start caching `token`, optionally pinning the legacy factory it trades on.
    ///
    /// A factory once recorded is kept when `factory` is `None`.
    pub async fn track(
        &self,
        token: Address,
        factory: Option<Address>,
    ) -> Result<CachedTokenRecord, AppError> {
        let factory = match factory {
            Some(f) if f == Address::ZERO => {
                return Err(AppError::InvalidAddress(format!("{f:#x}")));
            }
            Some(f) => Some(f),
            None => self.factory_of(token).await,
        };
        let state = self.fresh_state_at(self.venue(factory), token).await?;
        let previous = self.cache.load(token).await?;
        let mut record = CachedTokenRecord::from_state(&state, Utc::now());
        record.factory = factory;
        let record = record.merge_previous(previous.as_ref());
        self.cache.commit(record.clone()).await?;
        tracing::info!(
            target: "reconciler",
            token = %token,
            factory = ?record.factory,
            supply = %record.current_supply,
            "Token tracked"
        );
        Ok(record)
    }

    /// Reconcile every token the ledger lists. Per-token failures are skipped.
    pub async fn sync_all(&self) -> Result<SyncReport, AppError> {
        let ledger = self.ledger();
        let tokens = retry_with(self.settings.read_policy, AppError::is_retryable, |_| {
            ledger.all_tokens()
        })
        .await?;
        let mut report = SyncReport {
            listed: tokens.len(),
            ..SyncReport::default()
        };
        let outcomes: Vec<(Address, ReconcileOutcome)> = stream::iter(tokens)
            .map(|token| async move { (token, self.reconcile(token, Freshness::Any).await) })
            .buffer_unordered(SYNC_CONCURRENCY)
            .collect()
            .await;
        for (token, outcome) in outcomes {
            match outcome {
                ReconcileOutcome::Committed(_) => report.committed += 1,
                ReconcileOutcome::Stale { .. } => report.stale.push(token),
            }
        }
        report.stale.sort();
        tracing::info!(
            target: "reconciler",
            listed = report.listed,
            committed = report.committed,
            stale = report.stale.len(),
            "Catalog sync finished"
        );
        Ok(report)
    }

    pub async fn reconcile(&self, token: Address, freshness: Freshness) -> ReconcileOutcome {
        reconcile(
            self.ledger(),
            &self.cache,
            token,
            freshness,
            self.settings.reconcile_policy,
        )
        .await
    }

    pub fn spawn_refresh(&self, interval: Duration) -> RefreshHandle {
        RefreshHandle::spawn(
            self.ctx.ledger.clone(),
            self.cache.clone(),
            interval,
            self.settings.reconcile_policy,
        )
    }
}
