// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("Transaction was rejected by the wallet signer")]
    UserRejected,

    #[error("Address {0} is invalid or not checksummed")]
    InvalidAddress(String),

    #[error("Invalid amount for {field}: {message}")]
    InvalidAmount { field: String, message: String },

    #[error("Insufficient funds. Required: {required}, Available: {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("Token {token} is locked until its creator buys 2% of max supply")]
    TokenLocked { token: String },

    #[error("Token {token} launch is completed; bonding-curve trading is disabled")]
    TokenLaunchCompleted { token: String },

    #[error("Trading contract holds no settlement currency; sells cannot be paid out")]
    LiquidityExhausted,

    #[error(
        "Payout capped to {capped} (expected {expected}, shortfall {shortfall}); acknowledgment required"
    )]
    LiquidityShortfall {
        expected: String,
        capped: String,
        shortfall: String,
    },

    #[error("Slippage exceeded: minimum {minimum}, quoted {quoted}")]
    SlippageExceeded { minimum: String, quoted: String },

    #[error("A {direction} for token {token} is already in flight for this wallet")]
    TradeInFlight { token: String, direction: String },

    #[error("Transaction failed: {hash:?}, reason: {reason}")]
    Reverted { hash: String, reason: String },

    #[error("Settlement event missing from receipt {hash}; outcome is indeterminate")]
    SettlementUnconfirmed { hash: String },

    #[error("Transaction {hash} succeeded but {event} reported a zero payout")]
    ZeroPayoutAnomaly { hash: String, event: String },

    #[error("No confirmation for {hash} within {timeout_ms}ms")]
    ConfirmationTimeout { hash: String, timeout_ms: u64 },

    #[error("Ledger response shape mismatch for {call}: {message}")]
    Decode { call: String, message: String },

    #[error("Cache store error: {0}")]
    Cache(String),
}

impl AppError {
    /// Transient failures that a bounded retry may clear.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Connection(_) | AppError::ConfirmationTimeout { .. }
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Cache(err.to_string())
    }
}
