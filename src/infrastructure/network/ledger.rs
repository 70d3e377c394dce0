// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! The external ledger, seen through two seams.
//!
//! [`LedgerReader`] covers authoritative reads, [`LedgerWriter`] covers
//! signing, broadcast and confirmation. [`RpcLedger`] implements both over
//! JSON-RPC; tests substitute scripted doubles.

use crate::common::retry::{RetryPolicy, retry_with};
use crate::domain::constants::{
    BPS_DENOMINATOR, EIP1193_USER_REJECTED, GAS_LIMIT_BUFFER_BPS, MAX_POST_MIGRATION_FEE_BPS,
    MAX_TRADE_FEE_BPS,
};
use crate::domain::error::AppError;
use crate::domain::types::{SettlementStatus, TokenMarketState};
use crate::infrastructure::data::abi::{IERC20, ILaunchpad};
use crate::infrastructure::network::gas::GasOracle;
use crate::infrastructure::network::provider::HttpProvider;
use alloy::consensus::{SignableTransaction, TxEip1559};
use alloy::eips::eip2718::Encodable2718;
use alloy::eips::BlockId;
use alloy::eips::eip2930::AccessList;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, Bytes, Log, TxKind, U256};
use alloy::providers::Provider;
use alloy::rpc::types::eth::{TransactionInput, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use alloy::transports::{RpcError, TransportError};
use alloy_consensus::TxEnvelope;
use alloy_sol_types::{Revert, SolError};
use std::future::Future;
use std::time::{Duration, Instant};

/// A state-changing call the engine may ask the ledger to execute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerCall {
    /// `factory` routes to a legacy trading contract; `None` means the launchpad.
    Buy {
        token: Address,
        factory: Option<Address>,
        min_tokens_out: U256,
        value: U256,
    },
    Sell {
        token: Address,
        factory: Option<Address>,
        amount: U256,
    },
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    CreateToken {
        name: String,
        symbol: String,
        metadata: String,
    },
}

impl LedgerCall {
    pub fn label(&self) -> &'static str {
        match self {
            LedgerCall::Buy { .. } => "buyTokens",
            LedgerCall::Sell { .. } => "sellTokens",
            LedgerCall::Approve { .. } => "approve",
            LedgerCall::CreateToken { .. } => "createToken",
        }
    }

    /// The token the call concerns, if any.
    pub fn token(&self) -> Option<Address> {
        match self {
            LedgerCall::Buy { token, .. }
            | LedgerCall::Sell { token, .. }
            | LedgerCall::Approve { token, .. } => Some(*token),
            LedgerCall::CreateToken { .. } => None,
        }
    }

    /// Target, attached value and calldata for this call.
    pub fn encode(&self, launchpad: Address) -> (Address, U256, Bytes) {
        match self {
            LedgerCall::Buy {
                token,
                factory,
                min_tokens_out,
                value,
            } => (
                factory.unwrap_or(launchpad),
                *value,
                ILaunchpad::buyTokensCall {
                    tokenAddress: *token,
                    minTokensOut: *min_tokens_out,
                }
                .abi_encode()
                .into(),
            ),
            LedgerCall::Sell {
                token,
                factory,
                amount,
            } => (
                factory.unwrap_or(launchpad),
                U256::ZERO,
                ILaunchpad::sellTokensCall {
                    tokenAddress: *token,
                    tokenAmount: *amount,
                }
                .abi_encode()
                .into(),
            ),
            LedgerCall::Approve {
                token,
                spender,
                amount,
            } => (
                *token,
                U256::ZERO,
                IERC20::approveCall {
                    spender: *spender,
                    amount: *amount,
                }
                .abi_encode()
                .into(),
            ),
            LedgerCall::CreateToken {
                name,
                symbol,
                metadata,
            } => (
                launchpad,
                U256::ZERO,
                ILaunchpad::createTokenCall {
                    name: name.clone(),
                    symbol: symbol.clone(),
                    metadata: metadata.clone(),
                }
                .abi_encode()
                .into(),
            ),
        }
    }
}

/// Mined receipt reduced to what settlement classification needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmedReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub logs: Vec<Log>,
    /// Decoded `Error(string)` for a mined revert, when a replay recovered one.
    pub revert_reason: Option<String>,
}

impl ConfirmedReceipt {
    pub fn gas_cost(&self) -> U256 {
        U256::from(self.gas_used).saturating_mul(U256::from(self.effective_gas_price))
    }

    pub fn status(&self) -> SettlementStatus {
        if self.success {
            SettlementStatus::Success
        } else {
            SettlementStatus::Reverted
        }
    }
}

pub trait LedgerReader: Send + Sync {
    /// Address of the trading contract.
    fn launchpad(&self) -> Address;

    /// Market state as reported by `venue`, the launchpad or a legacy factory.
    fn token_state(
        &self,
        venue: Address,
        token: Address,
    ) -> impl Future<Output = Result<TokenMarketState, AppError>> + Send;

    /// Trade fee in basis points.
    fn fee_bps(&self) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn post_migration_fee_bps(&self) -> impl Future<Output = Result<u64, AppError>> + Send;

    fn native_balance(&self, owner: Address)
    -> impl Future<Output = Result<U256, AppError>> + Send;

    fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256, AppError>> + Send;

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256, AppError>> + Send;

    fn all_tokens(&self) -> impl Future<Output = Result<Vec<Address>, AppError>> + Send;
}

pub trait LedgerWriter: Send + Sync {
    fn wallet(&self) -> Address;

    /// Sign and broadcast; refusals come back as typed errors.
    fn submit(&self, call: LedgerCall) -> impl Future<Output = Result<B256, AppError>> + Send;

    fn await_confirmation(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> impl Future<Output = Result<ConfirmedReceipt, AppError>> + Send;
}

/// Build a [`TokenMarketState`] from positional `getTokenInfo` output.
pub fn token_state_from_parts(
    token: Address,
    info: ILaunchpad::getTokenInfoReturn,
    unit_price: U256,
    unlocked: bool,
) -> Result<TokenMarketState, AppError> {
    let creation_time = u64::try_from(info.creationTime).map_err(|_| AppError::Decode {
        call: "getTokenInfo".into(),
        message: format!("creationTime {} does not fit u64", info.creationTime),
    })?;
    if !info.maxSupply.is_zero() && info.currentSupply > info.maxSupply {
        return Err(AppError::Decode {
            call: "getTokenInfo".into(),
            message: format!(
                "currentSupply {} exceeds maxSupply {}",
                info.currentSupply, info.maxSupply
            ),
        });
    }
    Ok(TokenMarketState {
        token,
        name: info.name,
        symbol: info.symbol,
        creator: info.creator,
        unit_price,
        current_supply: info.currentSupply,
        max_supply: info.maxSupply,
        creator_purchased: info.creatorAllocation,
        creation_time,
        unlocked,
        completed: info.completed,
    })
}

/// Contract fee getters report whole percent.
pub fn percent_to_bps(call: &str, raw: U256, cap_bps: u64) -> Result<u64, AppError> {
    let bps = u64::try_from(raw)
        .ok()
        .and_then(|pct| pct.checked_mul(100))
        .filter(|bps| *bps <= cap_bps)
        .ok_or_else(|| AppError::Decode {
            call: call.into(),
            message: format!("fee {raw}% outside 0..={}%", cap_bps / 100),
        })?;
    Ok(bps)
}

pub fn buffered_gas_limit(estimate: u64) -> u64 {
    estimate.saturating_mul(GAS_LIMIT_BUFFER_BPS) / BPS_DENOMINATOR
}

/// Decode a ledger refusal into the error taxonomy.
///
/// Order: the EIP-1193 rejection code, then the `Error(string)` revert
/// reason, then the node message.
pub fn classify_refusal(
    code: Option<i64>,
    message: &str,
    revert_data: Option<&[u8]>,
    token: Option<Address>,
) -> AppError {
    let lowered = message.to_ascii_lowercase();
    if code == Some(EIP1193_USER_REJECTED)
        || lowered.contains("user rejected")
        || lowered.contains("user denied")
    {
        return AppError::UserRejected;
    }
    if let Some(data) = revert_data
        && let Ok(revert) = Revert::abi_decode(data)
    {
        return classify_reason(revert.reason(), token);
    }
    classify_reason(message, token)
}

fn classify_reason(reason: &str, token: Option<Address>) -> AppError {
    let lowered = reason.to_ascii_lowercase();
    let token_label = token
        .map(|t| format!("{t:#x}"))
        .unwrap_or_else(|| "unknown".to_string());
    if lowered.contains("insufficient funds") {
        AppError::InsufficientFunds {
            required: "value plus gas".into(),
            available: "less (node refused)".into(),
        }
    } else if lowered.contains("slippage") || lowered.contains("min tokens") {
        AppError::SlippageExceeded {
            minimum: "on-chain floor".into(),
            quoted: reason.to_string(),
        }
    } else if lowered.contains("completed") || lowered.contains("migrated") {
        AppError::TokenLaunchCompleted { token: token_label }
    } else if lowered.contains("locked") {
        AppError::TokenLocked { token: token_label }
    } else {
        AppError::Reverted {
            hash: "not broadcast".into(),
            reason: reason.to_string(),
        }
    }
}

/// `Error(string)` reason carried by a failed `eth_call`, else the node message.
fn revert_text(err: &TransportError) -> Option<String> {
    match err {
        RpcError::ErrorResp(payload) => {
            let decoded = payload
                .as_revert_data()
                .and_then(|data| Revert::abi_decode(&data).ok())
                .map(|revert| revert.reason().to_string());
            Some(decoded.unwrap_or_else(|| payload.message.to_string()))
        }
        _ => None,
    }
}

/// Run `lookup` every `interval` until it yields a value or `timeout` elapses.
///
/// Each lookup is bounded by the time left, so a hung call cannot outlive
/// the deadline.
pub async fn poll_until<T, F, Fut>(
    hash: B256,
    timeout: Duration,
    interval: Duration,
    mut lookup: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let started = Instant::now();
    let expired = || AppError::ConfirmationTimeout {
        hash: format!("{hash:#x}"),
        timeout_ms: timeout.as_millis() as u64,
    };
    loop {
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(expired());
        }
        match tokio::time::timeout(remaining, lookup()).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(_) => return Err(expired()),
        }
        let remaining = timeout.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(expired());
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }
}

/// The node must acknowledge the hash that was signed locally.
fn check_acknowledged(signed: B256, acknowledged: B256) -> Result<(), AppError> {
    if signed == acknowledged {
        return Ok(());
    }
    Err(AppError::Decode {
        call: "eth_sendRawTransaction".into(),
        message: format!("node acknowledged {acknowledged:#x}, signed {signed:#x}"),
    })
}

fn refusal_from_rpc(err: &TransportError, token: Option<Address>) -> AppError {
    match err {
        RpcError::ErrorResp(payload) => {
            let revert = payload.as_revert_data();
            classify_refusal(
                Some(payload.code),
                &payload.message,
                revert.as_ref().map(|b| b.as_ref()),
                token,
            )
        }
        other => AppError::Connection(other.to_string()),
    }
}

fn read_error(call: &str, err: alloy::contract::Error) -> AppError {
    match err {
        alloy::contract::Error::TransportError(RpcError::ErrorResp(payload)) => AppError::Decode {
            call: call.into(),
            message: payload.message.to_string(),
        },
        alloy::contract::Error::TransportError(e) => AppError::Connection(format!("{call}: {e}")),
        other => AppError::Decode {
            call: call.into(),
            message: other.to_string(),
        },
    }
}

pub struct RpcLedger {
    provider: HttpProvider,
    signer: PrivateKeySigner,
    chain_id: u64,
    launchpad: Address,
    gas: GasOracle,
    poll_interval: Duration,
    confirm_blocks: u64,
}

impl RpcLedger {
    pub fn new(
        provider: HttpProvider,
        signer: PrivateKeySigner,
        chain_id: u64,
        launchpad: Address,
        poll_interval: Duration,
        confirm_blocks: u64,
    ) -> Self {
        let gas = GasOracle::new(provider.clone());
        Self {
            provider,
            signer,
            chain_id,
            launchpad,
            gas,
            poll_interval,
            confirm_blocks: confirm_blocks.max(1),
        }
    }

    fn contract(&self, venue: Address) -> ILaunchpad::ILaunchpadInstance<HttpProvider> {
        ILaunchpad::new(venue, self.provider.clone())
    }

    /// Replay a mined revert against the parent block to recover its reason.
    async fn replay_revert(&self, hash: B256, block: Option<u64>) -> Option<String> {
        let tx = match self.provider.get_transaction_by_hash(hash).await {
            Ok(Some(tx)) => tx,
            Ok(None) => return None,
            Err(e) => {
                tracing::debug!(target: "ledger", error = %e, hash = %hash, "Replay lookup failed");
                return None;
            }
        };
        let from = tx.inner.signer();
        let mut request = tx.into_request().from(from);
        request.nonce = None;
        let at = BlockId::number(block.unwrap_or(1).saturating_sub(1));
        match self.provider.call(request).block(at).await {
            Ok(_) => {
                tracing::debug!(target: "ledger", hash = %hash, "Replay did not revert");
                None
            }
            Err(e) => revert_text(&e),
        }
    }

    async fn pending_nonce(&self) -> Result<u64, AppError> {
        let provider = self.provider.clone();
        let address = self.signer.address();
        retry_with(
            RetryPolicy::exponential(3, Duration::from_millis(100)),
            AppError::is_retryable,
            move |_| {
                let provider = provider.clone();
                async move {
                    provider
                        .get_transaction_count(address)
                        .pending()
                        .await
                        .map_err(|e| AppError::Connection(format!("Failed to fetch nonce: {e}")))
                }
            },
        )
        .await
    }

    fn receipt_is_confirmed(current_head: u64, receipt_block: u64, confirm_blocks: u64) -> bool {
        let needed_head = receipt_block.saturating_add(confirm_blocks.saturating_sub(1));
        current_head >= needed_head
    }
}

impl LedgerReader for RpcLedger {
    fn launchpad(&self) -> Address {
        self.launchpad
    }

    async fn token_state(&self, venue: Address, token: Address) -> Result<TokenMarketState, AppError> {
        let contract = self.contract(venue);
        let info_call = contract.getTokenInfo(token);
        let price_call = contract.getCurrentPrice(token);
        let unlocked_call = contract.tokenUnlocked(token);
        let (info, price, unlocked) = tokio::try_join!(
            async {
                info_call
                    .call()
                    .await
                    .map_err(|e| read_error("getTokenInfo", e))
            },
            async {
                price_call
                    .call()
                    .await
                    .map_err(|e| read_error("getCurrentPrice", e))
            },
            async {
                unlocked_call
                    .call()
                    .await
                    .map_err(|e| read_error("tokenUnlocked", e))
            },
        )?;
        token_state_from_parts(token, info, price, unlocked)
    }

    async fn fee_bps(&self) -> Result<u64, AppError> {
        let raw = self
            .contract(self.launchpad)
            .feePercent()
            .call()
            .await
            .map_err(|e| read_error("feePercent", e))?;
        percent_to_bps("feePercent", raw, MAX_TRADE_FEE_BPS)
    }

    async fn post_migration_fee_bps(&self) -> Result<u64, AppError> {
        let raw = self
            .contract(self.launchpad)
            .defaultPostMigrationTransferFeePercent()
            .call()
            .await
            .map_err(|e| read_error("defaultPostMigrationTransferFeePercent", e))?;
        percent_to_bps(
            "defaultPostMigrationTransferFeePercent",
            raw,
            MAX_POST_MIGRATION_FEE_BPS,
        )
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, AppError> {
        self.provider
            .get_balance(owner)
            .await
            .map_err(|e| AppError::Connection(format!("eth_getBalance {owner:#x}: {e}")))
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, AppError> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| read_error("balanceOf", e))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError> {
        IERC20::new(token, self.provider.clone())
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| read_error("allowance", e))
    }

    async fn all_tokens(&self) -> Result<Vec<Address>, AppError> {
        self.contract(self.launchpad)
            .getAllTokens()
            .call()
            .await
            .map_err(|e| read_error("getAllTokens", e))
    }
}

impl LedgerWriter for RpcLedger {
    fn wallet(&self) -> Address {
        self.signer.address()
    }

    async fn submit(&self, call: LedgerCall) -> Result<B256, AppError> {
        let from = self.signer.address();
        let token = call.token();
        let (to, value, input) = call.encode(self.launchpad);

        let request = TransactionRequest {
            from: Some(from),
            to: Some(TxKind::Call(to)),
            value: Some(value),
            input: TransactionInput::new(input.clone()),
            ..Default::default()
        };
        let estimate = self
            .provider
            .estimate_gas(request)
            .await
            .map_err(|e| refusal_from_rpc(&e, token))?;
        let gas_limit = buffered_gas_limit(estimate);

        let nonce = self.pending_nonce().await?;
        let fees = self.gas.estimate_eip1559_fees().await?;

        let mut tx = TxEip1559 {
            chain_id: self.chain_id,
            nonce,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit,
            to: TxKind::Call(to),
            value,
            access_list: AccessList::default(),
            input,
        };
        let sig = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
            .map_err(|e| AppError::Initialization(format!("Sign tx failed: {e}")))?;
        let signed: TxEnvelope = tx.into_signed(sig).into();
        let raw = signed.encoded_2718();
        let hash = *signed.tx_hash();

        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| refusal_from_rpc(&e, token))?;
        check_acknowledged(hash, *pending.tx_hash())?;

        tracing::info!(
            target: "submitter",
            call = call.label(),
            hash = %hash,
            nonce,
            gas_limit,
            max_fee_per_gas = fees.max_fee_per_gas,
            "Transaction broadcast"
        );
        Ok(hash)
    }

    async fn await_confirmation(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> Result<ConfirmedReceipt, AppError> {
        let confirm_blocks = self.confirm_blocks;
        let rcpt = poll_until(hash, timeout, self.poll_interval, move || async move {
            match self.provider.get_transaction_receipt(hash).await {
                Ok(Some(rcpt)) => {
                    let confirmed = match rcpt.block_number {
                        Some(block) => {
                            let head = self.provider.get_block_number().await.unwrap_or(0);
                            Self::receipt_is_confirmed(head.max(block), block, confirm_blocks)
                        }
                        None => true,
                    };
                    (confirmed || !rcpt.status()).then_some(rcpt)
                }
                Ok(None) => None,
                Err(e) => {
                    tracing::debug!(
                        target: "ledger",
                        error = %e,
                        hash = %hash,
                        "Receipt lookup error; retrying"
                    );
                    None
                }
            }
        })
        .await?;

        let success = rcpt.status();
        let revert_reason = if success {
            None
        } else {
            self.replay_revert(hash, rcpt.block_number).await
        };
        Ok(ConfirmedReceipt {
            tx_hash: hash,
            success,
            block_number: rcpt.block_number,
            gas_used: rcpt.gas_used,
            effective_gas_price: rcpt.effective_gas_price,
            logs: rcpt
                .inner
                .logs()
                .iter()
                .map(|l| l.inner.clone())
                .collect(),
            revert_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(current: u64, max: u64) -> ILaunchpad::getTokenInfoReturn {
        ILaunchpad::getTokenInfoReturn {
            name: "Meme".into(),
            symbol: "MEME".into(),
            metadata: "{}".into(),
            creator: Address::from([3u8; 20]),
            creatorAllocation: U256::from(5u64),
            heldTokens: U256::ZERO,
            maxSupply: U256::from(max),
            currentSupply: U256::from(current),
            virtualTrust: U256::ZERO,
            virtualTokens: U256::ZERO,
            completed: false,
            creationTime: U256::from(1_700_000_000u64),
        }
    }

    #[test]
    fn token_info_decodes_into_typed_state() {
        let token = Address::from([1u8; 20]);
        let state = token_state_from_parts(token, info(10, 100), U256::from(7u64), true).unwrap();
        assert_eq!(state.symbol, "MEME");
        assert_eq!(state.creator_purchased, U256::from(5u64));
        assert_eq!(state.creation_time, 1_700_000_000);
        assert!(state.unlocked);
    }

    #[test]
    fn supply_above_max_is_a_shape_mismatch() {
        let err = token_state_from_parts(Address::ZERO, info(101, 100), U256::ZERO, false);
        assert!(matches!(err, Err(AppError::Decode { .. })));
    }

    #[test]
    fn fee_percent_maps_to_bps_within_bounds() {
        assert_eq!(percent_to_bps("feePercent", U256::from(3u64), 2_000).unwrap(), 300);
        assert!(percent_to_bps("feePercent", U256::from(21u64), 2_000).is_err());
    }

    #[test]
    fn gas_limit_gets_twenty_percent_headroom() {
        assert_eq!(buffered_gas_limit(100_000), 120_000);
    }

    #[test]
    fn refusal_prefers_rejection_code_then_revert_reason() {
        let token = Some(Address::from([1u8; 20]));
        assert!(matches!(
            classify_refusal(Some(4001), "whatever", None, token),
            AppError::UserRejected
        ));

        let data = Revert::from("Token is locked").abi_encode();
        assert!(matches!(
            classify_refusal(Some(3), "execution reverted", Some(data.as_slice()), token),
            AppError::TokenLocked { .. }
        ));

        let data = Revert::from("Slippage too high").abi_encode();
        assert!(matches!(
            classify_refusal(Some(3), "execution reverted", Some(data.as_slice()), token),
            AppError::SlippageExceeded { .. }
        ));

        assert!(matches!(
            classify_refusal(Some(-32000), "insufficient funds for gas * price + value", None, token),
            AppError::InsufficientFunds { .. }
        ));

        match classify_refusal(Some(3), "execution reverted", Some(&[0xdeu8, 0xad][..]), token) {
            AppError::Reverted { reason, .. } => assert_eq!(reason, "execution reverted"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn encode_targets_token_for_approve() {
        let token = Address::from([1u8; 20]);
        let launchpad = Address::from([9u8; 20]);
        let (to, value, _) = LedgerCall::Approve {
            token,
            spender: launchpad,
            amount: U256::from(1u64),
        }
        .encode(launchpad);
        assert_eq!(to, token);
        assert_eq!(value, U256::ZERO);

        let (to, value, data) = LedgerCall::Buy {
            token,
            factory: None,
            min_tokens_out: U256::from(98u64),
            value: U256::from(2u64),
        }
        .encode(launchpad);
        assert_eq!(to, launchpad);
        assert_eq!(value, U256::from(2u64));
        assert_eq!(&data[..4], ILaunchpad::buyTokensCall::SELECTOR.as_slice());
    }

    #[test]
    fn trades_route_to_the_token_factory() {
        let token = Address::from([1u8; 20]);
        let launchpad = Address::from([9u8; 20]);
        let legacy = Address::from([4u8; 20]);
        let (to, _, data) = LedgerCall::Sell {
            token,
            factory: Some(legacy),
            amount: U256::from(5u64),
        }
        .encode(launchpad);
        assert_eq!(to, legacy);
        assert_eq!(&data[..4], ILaunchpad::sellTokensCall::SELECTOR.as_slice());

        let (to, _, _) = LedgerCall::CreateToken {
            name: "A".into(),
            symbol: "A".into(),
            metadata: String::new(),
        }
        .encode(launchpad);
        assert_eq!(to, launchpad);
    }

    #[test]
    fn receipt_status_reflects_success_flag() {
        let mut receipt = ConfirmedReceipt {
            tx_hash: B256::ZERO,
            success: true,
            block_number: Some(1),
            gas_used: 21_000,
            effective_gas_price: 2,
            logs: vec![],
            revert_reason: None,
        };
        assert_eq!(receipt.status(), SettlementStatus::Success);
        assert_eq!(receipt.gas_cost(), U256::from(42_000u64));
        receipt.success = false;
        assert_eq!(receipt.status(), SettlementStatus::Reverted);
    }

    #[test]
    fn broadcast_must_echo_the_signed_hash() {
        let signed = B256::with_last_byte(1);
        assert!(check_acknowledged(signed, signed).is_ok());
        assert!(matches!(
            check_acknowledged(signed, B256::with_last_byte(2)),
            Err(AppError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn polling_returns_once_lookup_yields() {
        let mut polls = 0;
        let found = poll_until(B256::ZERO, Duration::from_secs(2), Duration::from_millis(5), || {
            polls += 1;
            let ready = polls >= 3;
            async move { ready.then_some(polls) }
        })
        .await
        .unwrap();
        assert_eq!(found, 3);
    }

    #[tokio::test]
    async fn polling_times_out_when_nothing_is_mined() {
        let started = Instant::now();
        let err = poll_until::<(), _, _>(
            B256::with_last_byte(7),
            Duration::from_millis(60),
            Duration::from_millis(10),
            || async { None },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ConfirmationTimeout { timeout_ms: 60, .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn hung_lookup_is_bounded_by_the_deadline() {
        let started = Instant::now();
        let err = poll_until::<(), _, _>(
            B256::with_last_byte(8),
            Duration::from_millis(50),
            Duration::from_millis(10),
            || std::future::pending(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::ConfirmationTimeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
