// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand, ValueEnum};
use launchpad_settlement::app::config::GlobalSettings;
use launchpad_settlement::app::logging::setup_logging;
use launchpad_settlement::common::parsing::require_address;
use launchpad_settlement::domain::error::AppError;
use launchpad_settlement::domain::types::Direction;
use launchpad_settlement::infrastructure::data::db::Database;
use launchpad_settlement::infrastructure::network::ledger::RpcLedger;
use launchpad_settlement::infrastructure::network::provider::ConnectionFactory;
use launchpad_settlement::services::settlement::lifecycle::LockPolicy;
use launchpad_settlement::services::settlement::quote::{Preset, display_wei, parse_amount, to_wei};
use launchpad_settlement::services::settlement::{
    EngineSettings, ShortfallAck, TradeContext, TradeEngine, TradeOutcome,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "launchpad settlement")]
struct Cli {
    /// Path to config file (default: config.{toml,yaml,...})
    #[arg(long)]
    config: Option<String>,

    /// Emit JSON log lines
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Slippage basis points (overrides config/env)
    #[arg(long)]
    slippage_bps: Option<u64>,

    /// Lock handling (overrides config/env)
    #[arg(long, value_enum)]
    lock_policy: Option<LockPolicy>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Side {
    Buy,
    Sell,
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => Direction::Buy,
            Side::Sell => Direction::Sell,
        }
    }
}

#[derive(clap::Args, Debug)]
struct AmountArgs {
    /// Decimal amount, e.g. 1.5
    #[arg(conflicts_with = "percent")]
    amount: Option<String>,

    /// Share of the wallet balance: 25, 50, 75 or 100
    #[arg(long)]
    percent: Option<u8>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote a trade without submitting anything
    Quote {
        token: String,
        #[arg(value_enum)]
        side: Side,
        #[command(flatten)]
        amount: AmountArgs,
        /// Buy only: size the quote by tokens wanted instead of currency spent
        #[arg(long, conflicts_with_all = ["amount", "percent"])]
        tokens: Option<String>,
    },
    /// Show lifecycle, fees and cache state for a token
    Status { token: String },
    /// Buy tokens with the settlement currency
    Buy {
        token: String,
        #[command(flatten)]
        amount: AmountArgs,
    },
    /// Sell tokens back to the curve
    Sell {
        token: String,
        #[command(flatten)]
        amount: AmountArgs,
        /// Proceed even when the contract cannot pay the full amount
        #[arg(long, default_value_t = false)]
        accept_shortfall: bool,
    },
    /// Launch a new token
    Create {
        name: String,
        symbol: String,
        #[arg(long, default_value = "")]
        metadata: String,
    },
    /// Start caching a token, optionally on a legacy factory contract
    Track {
        token: String,
        /// Trading contract the token was launched on
        #[arg(long)]
        factory: Option<String>,
    },
    /// Reconcile every listed token into the cache
    Sync,
    /// Keep tracked tokens fresh until Ctrl-C
    Watch {
        /// Seconds between passes (overrides config/env)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}

type Engine = TradeEngine<RpcLedger, Database>;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let mut settings = GlobalSettings::load_with_path(cli.config.as_deref())?;
    setup_logging(
        if settings.debug { "debug" } else { "info" },
        cli.json || settings.log_json,
    );
    if let Some(bps) = cli.slippage_bps {
        settings.slippage_bps = bps;
    }
    if let Some(policy) = cli.lock_policy {
        settings.lock_policy = policy;
    }
    settings.validate()?;

    let signer = settings.signer()?;
    let provider = ConnectionFactory::http_checked(settings.rpc_url.trim(), settings.chain_id).await?;
    let ledger = RpcLedger::new(
        provider,
        signer,
        settings.chain_id,
        settings.launchpad_address,
        settings.receipt_poll_interval(),
        settings.receipt_confirm_blocks,
    );
    let db = Database::new(&settings.database_url).await?;
    let ctx = TradeContext::new(Arc::new(ledger), settings.chain_id);
    tracing::info!(
        target: "config",
        wallet = %ctx.wallet,
        launchpad = %ctx.network.launchpad,
        chain_id = ctx.network.chain_id,
        "Session ready"
    );
    let engine = TradeEngine::new(ctx, db, EngineSettings::from_settings(&settings));

    match cli.command {
        Command::Quote {
            token,
            side,
            amount,
            tokens,
        } => {
            let token = require_address(&token)?;
            match (side, tokens) {
                (Side::Buy, Some(raw)) => {
                    let tokens = to_wei(parse_amount("tokens", &raw)?)?;
                    let quote = engine.quote_buy_for_tokens(token, tokens, None).await?;
                    println!(
                        "buy ~{} tokens for {} (min {})",
                        quote.display_expected_out(),
                        quote.display_input(),
                        quote.display_min_out()
                    );
                }
                (Side::Sell, Some(_)) => {
                    return Err(AppError::InvalidAmount {
                        field: "tokens".into(),
                        message: "only applies to buy quotes".into(),
                    });
                }
                (Side::Buy, None) => {
                    let amount = resolve_amount(&engine, token, side.into(), &amount).await?;
                    let quote = engine.quote_buy(token, amount, None).await?;
                    println!(
                        "buy {} -> ~{} tokens (min {})",
                        quote.display_input(),
                        quote.display_expected_out(),
                        quote.display_min_out()
                    );
                }
                (Side::Sell, None) => {
                    let amount = resolve_amount(&engine, token, side.into(), &amount).await?;
                    let pre = engine.preflight_sell(token, amount, None).await?;
                    println!(
                        "sell {} -> ~{} (min {}, fee {} bps)",
                        pre.quote.display_input(),
                        pre.quote.display_expected_out(),
                        pre.quote.display_min_out(),
                        pre.fee_bps
                    );
                    if pre.assessment.is_shortfall() {
                        println!(
                            "warning: contract can pay at most {} of {}",
                            display_wei(pre.assessment.payout()),
                            display_wei(pre.assessment.expected())
                        );
                    }
                }
            }
        }
        Command::Status { token } => {
            let token = require_address(&token)?;
            let status = engine.status(token).await?;
            let s = &status.state;
            println!("{} ({}) {token:#x}", s.name, s.symbol);
            println!("  creator        {:#x}", s.creator);
            if let Some(factory) = status.factory {
                println!("  factory        {factory:#x}");
            }
            println!("  price          {}", display_wei(s.unit_price));
            println!(
                "  supply         {} / {}",
                display_wei(s.current_supply),
                display_wei(s.max_supply)
            );
            println!(
                "  unlocked       {} ({} bps of threshold)",
                s.unlocked, status.unlock_progress_bps
            );
            println!("  completed      {}", s.completed);
            match &status.gate {
                Ok(decision) => println!("  tradable       {decision:?}"),
                Err(reason) => println!("  tradable       no: {reason}"),
            }
            println!("  contract funds {}", display_wei(status.contract_balance));
            if let Some(fee) = status.fee_bps {
                println!("  trade fee      {fee} bps");
            }
            if let Some(fee) = status.post_migration_fee_bps {
                println!("  migrated fee   {fee} bps");
            }
            if let Some(cached) = &status.cached {
                println!("  cached at      {}", cached.last_synced.to_rfc3339());
            }
        }
        Command::Buy { token, amount } => {
            let token = require_address(&token)?;
            let value = resolve_amount(&engine, token, Direction::Buy, &amount).await?;
            let outcome = engine.buy(token, value, None).await?;
            print_outcome(&outcome);
        }
        Command::Sell {
            token,
            amount,
            accept_shortfall,
        } => {
            let token = require_address(&token)?;
            let amount = resolve_amount(&engine, token, Direction::Sell, &amount).await?;
            let ack = if accept_shortfall {
                ShortfallAck::Accept
            } else {
                ShortfallAck::Refuse
            };
            let outcome = engine.sell(token, amount, None, ack).await?;
            print_outcome(&outcome);
        }
        Command::Create {
            name,
            symbol,
            metadata,
        } => {
            let created = engine.create_token(&name, &symbol, &metadata).await?;
            println!("created {:#x} in {}", created.token, created.tx_hash);
        }
        Command::Track { token, factory } => {
            let token = require_address(&token)?;
            let factory = factory.as_deref().map(require_address).transpose()?;
            let record = engine.track(token, factory).await?;
            match record.factory {
                Some(factory) => println!("tracking {token:#x} on factory {factory:#x}"),
                None => println!("tracking {token:#x}"),
            }
        }
        Command::Sync => {
            let report = engine.sync_all().await?;
            println!(
                "synced {}/{} tokens",
                report.committed, report.listed
            );
            for token in &report.stale {
                println!("  stale {token:#x}");
            }
        }
        Command::Watch { interval_secs } => {
            let interval = interval_secs
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or_else(|| settings.refresh_interval());
            let handle = engine.spawn_refresh(interval);
            tokio::signal::ctrl_c()
                .await
                .map_err(|e| AppError::Initialization(format!("Signal handler failed: {e}")))?;
            tracing::info!(target: "refresh", "Interrupt received; stopping");
            handle.shutdown().await;
        }
    }
    Ok(())
}

async fn resolve_amount(
    engine: &Engine,
    token: Address,
    direction: Direction,
    args: &AmountArgs,
) -> Result<U256, AppError> {
    match (&args.amount, args.percent) {
        (Some(raw), _) => to_wei(parse_amount("amount", raw)?),
        (None, Some(pct)) => {
            let preset = Preset::from_percent(pct).ok_or_else(|| AppError::InvalidAmount {
                field: "percent".into(),
                message: format!("{pct} is not one of 25, 50, 75, 100"),
            })?;
            engine.preset_amount(token, direction, preset).await
        }
        (None, None) => Err(AppError::InvalidAmount {
            field: "amount".into(),
            message: "give an amount or --percent".into(),
        }),
    }
}

fn print_outcome(outcome: &TradeOutcome) {
    let r = &outcome.receipt;
    println!(
        "{} settled in {}: realized {} for {} (gas {})",
        r.direction,
        r.tx_hash,
        display_wei(r.realized_amount),
        display_wei(r.counter_amount),
        display_wei(r.gas_cost)
    );
    if outcome.slippage_breached {
        println!(
            "warning: realized below the slippage floor of {}",
            display_wei(outcome.min_counter_out)
        );
    }
    if !outcome.reconciled {
        println!("warning: cache not refreshed; run `sync` later");
    }
}
