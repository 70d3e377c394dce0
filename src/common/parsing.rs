// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::constants::AMOUNT_DECIMALS;
use crate::domain::error::AppError;
use alloy::primitives::{Address, U256};
use std::str::FromStr;

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

pub fn parse_address_hex(s: &str) -> Option<Address> {
    Address::from_str(strip_0x(s.trim())).ok()
}

/// Parse a user-supplied address, rejecting the zero address.
pub fn require_address(raw: &str) -> Result<Address, AppError> {
    match parse_address_hex(raw) {
        Some(addr) if addr != Address::ZERO => Ok(addr),
        _ => Err(AppError::InvalidAddress(raw.trim().to_string())),
    }
}

/// Lossy float view of an 18-decimal amount, for display and cache fields only.
pub fn wei_to_f64(value: U256) -> f64 {
    let scale = 10f64.powi(AMOUNT_DECIMALS as i32);
    match u128::try_from(value) {
        Ok(v) => v as f64 / scale,
        Err(_) => {
            let s = value.to_string();
            s.parse::<f64>().unwrap_or(f64::MAX) / scale
        }
    }
}
