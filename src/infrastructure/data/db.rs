// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::AppError;
use crate::domain::types::CachedTokenRecord;
use crate::infrastructure::data::schema::CachedTokenRow;
use crate::infrastructure::data::token_cache::TokenCacheStore;
use alloy::primitives::Address;
use sqlx::{
    Pool, Sqlite,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;

#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::Initialization(format!("DB Connect failed: {}", e)))?
            .create_if_missing(true);

        // Each in-memory connection is its own database; pin the pool to one.
        let in_memory = database_url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::Initialization(format!("DB Connect failed: {}", e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Initialization(format!("DB Migration failed: {}", e)))?;

        tracing::debug!(target: "db", url = %database_url, "Token cache ready");
        Ok(Self { pool })
    }

    /// Every cached record, largest market cap first.
    pub async fn list(&self) -> Result<Vec<CachedTokenRecord>, AppError> {
        let rows = sqlx::query_as::<_, CachedTokenRow>(
            "SELECT * FROM token_cache ORDER BY market_cap DESC, contract_address ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(CachedTokenRecord::try_from).collect()
    }
}

impl TokenCacheStore for Database {
    async fn load(&self, token: Address) -> Result<Option<CachedTokenRecord>, AppError> {
        let row = sqlx::query_as::<_, CachedTokenRow>(
            "SELECT * FROM token_cache WHERE contract_address = ?",
        )
        .bind(format!("{token:#x}"))
        .fetch_optional(&self.pool)
        .await?;
        row.map(CachedTokenRecord::try_from).transpose()
    }

    async fn commit(&self, record: CachedTokenRecord) -> Result<(), AppError> {
        // Flags are merged with MAX so a lagging snapshot cannot clear them.
        let creation_time = i64::try_from(record.creation_time).map_err(|_| {
            AppError::Cache(format!("creation_time {} overflows", record.creation_time))
        })?;
        sqlx::query(
            r#"
            INSERT INTO token_cache (
                contract_address, name, symbol, creator,
                unit_price_wei, current_supply_wei, max_supply_wei, creator_purchased_wei,
                creation_time, unlocked, completed, factory_address,
                approx_price, market_cap, last_synced
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(contract_address) DO UPDATE SET
                name=excluded.name,
                symbol=excluded.symbol,
                creator=excluded.creator,
                unit_price_wei=excluded.unit_price_wei,
                current_supply_wei=excluded.current_supply_wei,
                max_supply_wei=excluded.max_supply_wei,
                creator_purchased_wei=excluded.creator_purchased_wei,
                creation_time=excluded.creation_time,
                unlocked=MAX(token_cache.unlocked, excluded.unlocked),
                completed=MAX(token_cache.completed, excluded.completed),
                factory_address=COALESCE(excluded.factory_address, token_cache.factory_address),
                approx_price=excluded.approx_price,
                market_cap=excluded.market_cap,
                last_synced=excluded.last_synced
            "#,
        )
        .bind(format!("{:#x}", record.token))
        .bind(&record.name)
        .bind(&record.symbol)
        .bind(format!("{:#x}", record.creator))
        .bind(record.unit_price.to_string())
        .bind(record.current_supply.to_string())
        .bind(record.max_supply.to_string())
        .bind(record.creator_purchased.to_string())
        .bind(creation_time)
        .bind(record.unlocked)
        .bind(record.completed)
        .bind(record.factory.map(|f| format!("{f:#x}")))
        .bind(record.approx_price)
        .bind(record.market_cap)
        .bind(record.last_synced)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tracked_tokens(&self) -> Result<Vec<Address>, AppError> {
        let rows: Vec<String> = sqlx::query_scalar(
            "SELECT contract_address FROM token_cache ORDER BY contract_address",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut tokens = Vec::with_capacity(rows.len());
        for raw in rows {
            match crate::common::parsing::parse_address_hex(&raw) {
                Some(addr) => tokens.push(addr),
                None => tracing::warn!(target: "db", address = %raw, "Skipping corrupt cache key"),
            }
        }
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::TokenMarketState;
    use alloy::primitives::U256;
    use chrono::Utc;

    fn record(supply: u64, unlocked: bool) -> CachedTokenRecord {
        let state = TokenMarketState {
            token: Address::from([7u8; 20]),
            name: "Seven".into(),
            symbol: "SVN".into(),
            creator: Address::from([8u8; 20]),
            unit_price: U256::from(2u64) * crate::domain::constants::WAD,
            current_supply: U256::from(supply) * crate::domain::constants::WAD,
            max_supply: U256::from(1_000_000u64) * crate::domain::constants::WAD,
            creator_purchased: U256::ZERO,
            creation_time: 1_700_000_000,
            unlocked,
            completed: false,
        };
        CachedTokenRecord::from_state(&state, Utc::now())
    }

    #[tokio::test]
    async fn upsert_round_trips_and_keeps_flags() {
        let db = Database::new("sqlite::memory:").await.unwrap();
        assert!(db.load(Address::from([7u8; 20])).await.unwrap().is_none());

        let mut first = record(10, true);
        first.factory = Some(Address::from([4u8; 20]));
        db.commit(first).await.unwrap();
        db.commit(record(12, false)).await.unwrap();

        let loaded = db.load(Address::from([7u8; 20])).await.unwrap().unwrap();
        assert_eq!(loaded.current_supply, U256::from(12u64) * crate::domain::constants::WAD);
        assert!(loaded.unlocked, "unlock flag must not regress");
        assert_eq!(loaded.creation_time, 1_700_000_000);
        assert_eq!(loaded.factory, Some(Address::from([4u8; 20])), "factory survives a bare snapshot");
        assert!((loaded.market_cap - 24.0).abs() < 1e-9);

        assert_eq!(db.tracked_tokens().await.unwrap(), vec![Address::from([7u8; 20])]);
        assert_eq!(db.list().await.unwrap().len(), 1);
    }
}
