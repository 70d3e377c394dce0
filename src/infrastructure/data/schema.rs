// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::common::parsing::parse_address_hex;
use crate::domain::error::AppError;
use crate::domain::types::CachedTokenRecord;
use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// `token_cache` row. Amounts are decimal wei strings.
#[derive(Debug, FromRow)]
pub struct CachedTokenRow {
    pub contract_address: String,
    pub name: String,
    pub symbol: String,
    pub creator: String,
    pub unit_price_wei: String,
    pub current_supply_wei: String,
    pub max_supply_wei: String,
    pub creator_purchased_wei: String,
    pub creation_time: i64,
    pub unlocked: bool,
    pub completed: bool,
    pub factory_address: Option<String>,
    pub approx_price: f64,
    pub market_cap: f64,
    pub last_synced: DateTime<Utc>,
}

fn wei(column: &str, raw: &str) -> Result<U256, AppError> {
    U256::from_str_radix(raw, 10)
        .map_err(|e| AppError::Cache(format!("Corrupt {column} value {raw}: {e}")))
}

impl TryFrom<CachedTokenRow> for CachedTokenRecord {
    type Error = AppError;

    fn try_from(row: CachedTokenRow) -> Result<Self, Self::Error> {
        let token = parse_address_hex(&row.contract_address)
            .ok_or_else(|| AppError::Cache(format!("Corrupt address {}", row.contract_address)))?;
        let creator = parse_address_hex(&row.creator)
            .ok_or_else(|| AppError::Cache(format!("Corrupt creator {}", row.creator)))?;
        let factory = match row.factory_address.as_deref() {
            Some(raw) => Some(
                parse_address_hex(raw)
                    .ok_or_else(|| AppError::Cache(format!("Corrupt factory {raw}")))?,
            ),
            None => None,
        };
        let creation_time = u64::try_from(row.creation_time)
            .map_err(|_| AppError::Cache(format!("Corrupt creation_time {}", row.creation_time)))?;
        Ok(CachedTokenRecord {
            token,
            name: row.name,
            symbol: row.symbol,
            creator,
            unit_price: wei("unit_price_wei", &row.unit_price_wei)?,
            current_supply: wei("current_supply_wei", &row.current_supply_wei)?,
            max_supply: wei("max_supply_wei", &row.max_supply_wei)?,
            creator_purchased: wei("creator_purchased_wei", &row.creator_purchased_wei)?,
            creation_time,
            unlocked: row.unlocked,
            completed: row.completed,
            factory,
            approx_price: row.approx_price,
            market_cap: row.market_cap,
            last_synced: row.last_synced,
        })
    }
}
