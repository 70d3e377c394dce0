// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::AppError;
use crate::domain::types::SettlementStatus;
use crate::infrastructure::network::ledger::{
    ConfirmedReceipt, LedgerCall, LedgerReader, LedgerWriter,
};
use crate::services::settlement::events::revert_error;
use alloy::primitives::{Address, B256, U256};
use std::time::Duration;

pub struct Submitter<'a, L> {
    ledger: &'a L,
    timeout: Duration,
}

impl<'a, L> Submitter<'a, L>
where
    L: LedgerReader + LedgerWriter,
{
    pub fn new(ledger: &'a L, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }

    /// Broadcast one call and wait for it to be mined.
    pub async fn send(&self, call: LedgerCall) -> Result<ConfirmedReceipt, AppError> {
        let label = call.label();
        let hash = match self.ledger.submit(call).await {
            Ok(hash) => hash,
            Err(AppError::UserRejected) => {
                tracing::info!(target: "submitter", call = label, "Signer declined the request");
                return Err(AppError::UserRejected);
            }
            Err(e) => {
                tracing::warn!(target: "submitter", call = label, error = %e, "Submission refused");
                return Err(e);
            }
        };
        let receipt = self.ledger.await_confirmation(hash, self.timeout).await?;
        tracing::debug!(
            target: "submitter",
            call = label,
            hash = %hash,
            success = receipt.success,
            block = ?receipt.block_number,
            "Transaction mined"
        );
        Ok(receipt)
    }

    pub async fn buy(
        &self,
        token: Address,
        factory: Option<Address>,
        value: U256,
        min_tokens_out: U256,
    ) -> Result<ConfirmedReceipt, AppError> {
        self.send(LedgerCall::Buy {
            token,
            factory,
            min_tokens_out,
            value,
        })
        .await
    }

    /// Approve `spender` for `amount` when the current allowance is short.
    /// Returns the approval hash when one was needed.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<Option<B256>, AppError> {
        let owner = self.ledger.wallet();
        let current = self.ledger.allowance(token, owner, spender).await?;
        if current >= amount {
            return Ok(None);
        }
        tracing::info!(
            target: "submitter",
            token = %token,
            current = %current,
            required = %amount,
            "Approving trading contract"
        );
        let receipt = self
            .send(LedgerCall::Approve {
                token,
                spender,
                amount,
            })
            .await?;
        if receipt.status() == SettlementStatus::Reverted {
            return Err(revert_error(&receipt, Some(token)));
        }
        Ok(Some(receipt.tx_hash))
    }

    /// Send the sell. `approval` is the allowance transaction that preceded it, if any;
    /// the two are not atomic.
    pub async fn sell(
        &self,
        token: Address,
        factory: Option<Address>,
        amount: U256,
        approval: Option<B256>,
    ) -> Result<ConfirmedReceipt, AppError> {
        let result = self
            .send(LedgerCall::Sell {
                token,
                factory,
                amount,
            })
            .await;
        let failed = match &result {
            Ok(receipt) => receipt.status() == SettlementStatus::Reverted,
            Err(_) => true,
        };
        if failed && let Some(approval) = approval {
            tracing::info!(
                target: "submitter",
                token = %token,
                approval = %approval,
                amount = %amount,
                "Sell did not settle; allowance stays outstanding"
            );
        }
        result
    }
}
