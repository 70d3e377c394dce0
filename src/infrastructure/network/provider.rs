// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::AppError;
use alloy::network::Ethereum;
use alloy::providers::{Provider, RootProvider};
use url::Url;

pub type HttpProvider = RootProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn http(rpc_url: &str) -> Result<HttpProvider, AppError> {
        let url =
            Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))?;
        Ok(RootProvider::new_http(url))
    }

    /// Connect and refuse to continue when the node serves a different chain.
    pub async fn http_checked(rpc_url: &str, expected_chain_id: u64) -> Result<HttpProvider, AppError> {
        let provider = Self::http(rpc_url)?;
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| AppError::Connection(format!("{rpc_url}: {e}")))?;
        if chain_id != expected_chain_id {
            return Err(AppError::Initialization(format!(
                "RPC {rpc_url} serves chain {chain_id}, expected {expected_chain_id}"
            )));
        }
        tracing::info!(target: "ledger", chain_id, "Connected to ledger RPC");
        Ok(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_url() {
        assert!(matches!(
            ConnectionFactory::http("not a url"),
            Err(AppError::Config(_))
        ));
        assert!(ConnectionFactory::http("http://127.0.0.1:8545").is_ok());
    }
}
