// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::AppError;
use crate::domain::types::CachedTokenRecord;
use alloy::primitives::Address;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;

/// Read-side snapshot store, one record per contract address.
pub trait TokenCacheStore: Send + Sync {
    fn load(
        &self,
        token: Address,
    ) -> impl Future<Output = Result<Option<CachedTokenRecord>, AppError>> + Send;

    /// Insert or overwrite the record for `record.token`.
    fn commit(&self, record: CachedTokenRecord)
    -> impl Future<Output = Result<(), AppError>> + Send;

    fn tracked_tokens(&self) -> impl Future<Output = Result<Vec<Address>, AppError>> + Send;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTokenCache {
    records: Arc<DashMap<Address, CachedTokenRecord>>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TokenCacheStore for MemoryTokenCache {
    async fn load(&self, token: Address) -> Result<Option<CachedTokenRecord>, AppError> {
        Ok(self.records.get(&token).map(|r| r.value().clone()))
    }

    async fn commit(&self, record: CachedTokenRecord) -> Result<(), AppError> {
        self.records.insert(record.token, record);
        Ok(())
    }

    async fn tracked_tokens(&self) -> Result<Vec<Address>, AppError> {
        let mut tokens: Vec<Address> = self.records.iter().map(|r| *r.key()).collect();
        tokens.sort();
        Ok(tokens)
    }
}
