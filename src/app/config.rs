// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::retry::RetryPolicy;
use crate::domain::constants;
use crate::domain::error::AppError;
use crate::services::settlement::lifecycle::LockPolicy;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub log_json: bool,
    #[serde(default = "default_database_url")]
    pub database_url: String,

    // Network
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_launchpad")]
    pub launchpad_address: Address,

    // Identity
    pub wallet_key: String,
    pub wallet_address: Option<Address>,

    // Trading
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u64,
    /// Used only when the ledger's fee read fails.
    #[serde(default = "default_sell_fee_bps")]
    pub sell_fee_bps: u64,
    #[serde(default)]
    pub lock_policy: LockPolicy,
    #[serde(default = "default_false")]
    pub enforce_sell_slippage: bool,

    // Confirmation
    #[serde(default = "default_receipt_poll_ms")]
    pub receipt_poll_ms: u64,
    #[serde(default = "default_receipt_timeout_ms")]
    pub receipt_timeout_ms: u64,
    #[serde(default = "default_receipt_confirm_blocks")]
    pub receipt_confirm_blocks: u64,

    // Reconciliation
    #[serde(default = "default_reconcile_attempts")]
    pub reconcile_attempts: usize,
    #[serde(default = "default_reconcile_delay_ms")]
    pub reconcile_delay_ms: u64,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

fn default_false() -> bool {
    false
}
fn default_database_url() -> String {
    "sqlite://launchpad_cache.db".to_string()
}
fn default_rpc_url() -> String {
    constants::INTUITION_MAINNET_RPC.to_string()
}
fn default_chain_id() -> u64 {
    constants::INTUITION_MAINNET_CHAIN_ID
}
fn default_launchpad() -> Address {
    constants::DEFAULT_LAUNCHPAD
}
fn default_slippage_bps() -> u64 {
    constants::DEFAULT_SLIPPAGE_BPS
}
fn default_sell_fee_bps() -> u64 {
    constants::DEFAULT_SELL_FEE_BPS
}
fn default_receipt_poll_ms() -> u64 {
    constants::DEFAULT_RECEIPT_POLL_MS
}
fn default_receipt_timeout_ms() -> u64 {
    constants::DEFAULT_RECEIPT_TIMEOUT_MS
}
fn default_receipt_confirm_blocks() -> u64 {
    constants::DEFAULT_RECEIPT_CONFIRM_BLOCKS
}
fn default_reconcile_attempts() -> usize {
    constants::RECONCILE_ATTEMPTS
}
fn default_reconcile_delay_ms() -> u64 {
    constants::RECONCILE_DELAY.as_millis() as u64
}
fn default_refresh_interval_secs() -> u64 {
    constants::DEFAULT_REFRESH_INTERVAL_SECS
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = resolve_config_path(path) {
            builder = builder.add_source(File::from(Path::new(&selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Deterministic precedence: CLI (in main) > env/.env > config file.
        builder = builder.add_source(Environment::default());

        let settings: GlobalSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        tracing::debug!(
            target: "config",
            chain_id = settings.chain_id,
            launchpad = %settings.launchpad_address,
            lock_policy = ?settings.lock_policy,
            "Settings loaded"
        );
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.wallet_key.trim().is_empty() {
            return Err(AppError::Config("WALLET_KEY is missing".to_string()));
        }
        if self.slippage_bps > constants::MAX_SLIPPAGE_BPS {
            return Err(AppError::Config(format!(
                "slippage_bps {} exceeds {}",
                self.slippage_bps,
                constants::MAX_SLIPPAGE_BPS
            )));
        }
        if self.sell_fee_bps > constants::MAX_TRADE_FEE_BPS {
            return Err(AppError::Config(format!(
                "sell_fee_bps {} exceeds {}",
                self.sell_fee_bps,
                constants::MAX_TRADE_FEE_BPS
            )));
        }
        if self.launchpad_address == Address::ZERO {
            return Err(AppError::Config(
                "launchpad_address must not be zero".to_string(),
            ));
        }
        if self.reconcile_attempts == 0 {
            return Err(AppError::Config(
                "reconcile_attempts must be at least 1".to_string(),
            ));
        }
        self.rpc_endpoint()?;
        Ok(())
    }

    pub fn rpc_endpoint(&self) -> Result<Url, AppError> {
        Url::parse(self.rpc_url.trim())
            .map_err(|e| AppError::Config(format!("Invalid rpc_url {}: {e}", self.rpc_url)))
    }

    /// Parse the wallet key and, when configured, check it against `wallet_address`.
    pub fn signer(&self) -> Result<PrivateKeySigner, AppError> {
        let signer = PrivateKeySigner::from_str(self.wallet_key.trim())
            .map_err(|_| AppError::Config("Invalid wallet key".into()))?;
        if let Some(expected) = self.wallet_address
            && signer.address() != expected
        {
            return Err(AppError::Config(format!(
                "wallet_address {expected:#x} does not match wallet key address {:#x}",
                signer.address()
            )));
        }
        Ok(signer)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms.max(1))
    }

    pub fn receipt_poll_interval(&self) -> Duration {
        Duration::from_millis(self.receipt_poll_ms.max(1))
    }

    pub fn reconcile_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.reconcile_attempts.max(1),
            Duration::from_millis(self.reconcile_delay_ms),
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

fn resolve_config_path(path: Option<&str>) -> Option<String> {
    if let Some(path) = path {
        return Some(path.to_string());
    }
    std::env::var("LAUNCHPAD_CONFIG")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && Path::new(s).exists())
}
