// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, U256, address};
use std::time::Duration;

// =============================================================================
// NETWORK DEFAULTS
// =============================================================================

pub const INTUITION_MAINNET_CHAIN_ID: u64 = 1155;
pub const INTUITION_MAINNET_RPC: &str = "https://intuition.calderachain.xyz/http";
pub const DEFAULT_LAUNCHPAD: Address = address!("D9E849B6d44946B0D0FAEafe34b92C79c68cCbeF");

// =============================================================================
// FIXED POINT
// =============================================================================

/// Every ledger amount is an 18-decimal fixed-point integer.
pub const AMOUNT_DECIMALS: u32 = 18;
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000u64, 0, 0, 0]);
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Decimal places shown for quoted amounts.
pub const DISPLAY_DECIMALS: u32 = 6;

// =============================================================================
// FEES, SLIPPAGE AND LIFECYCLE
// =============================================================================

pub const DEFAULT_SELL_FEE_BPS: u64 = 300;
pub const MAX_TRADE_FEE_BPS: u64 = 2_000;
pub const MAX_POST_MIGRATION_FEE_BPS: u64 = 500;
pub const DEFAULT_SLIPPAGE_BPS: u64 = 200;
pub const MAX_SLIPPAGE_BPS: u64 = 5_000;

/// Creator cumulative purchase share of max supply that unlocks a token.
pub const UNLOCK_THRESHOLD_BPS: u64 = 200;

// =============================================================================
// GAS & CONFIRMATION
// =============================================================================

pub const GAS_LIMIT_BUFFER_BPS: u64 = 12_000;
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;
pub const DEFAULT_RECEIPT_TIMEOUT_MS: u64 = 120_000;
pub const DEFAULT_RECEIPT_CONFIRM_BLOCKS: u64 = 1;

// =============================================================================
// RECONCILIATION
// =============================================================================

pub const RECONCILE_ATTEMPTS: usize = 3;
pub const RECONCILE_DELAY: Duration = Duration::from_millis(1_500);
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;
/// Tokens reconciled concurrently during a full catalog sync.
pub const SYNC_CONCURRENCY: usize = 4;

/// EIP-1193 code for a request the wallet user declined.
pub const EIP1193_USER_REJECTED: i64 = 4001;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wad_is_one_token() {
        assert_eq!(WAD, U256::from(10u64).pow(U256::from(AMOUNT_DECIMALS)));
    }
}
