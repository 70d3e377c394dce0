// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use crate::domain::error::AppError;
use crate::domain::types::{Direction, SettlementReceipt, SettlementStatus};
use crate::infrastructure::data::abi::ILaunchpad::{TokenCreated, TokensBought, TokensSold};
use crate::infrastructure::network::ledger::{ConfirmedReceipt, classify_refusal};
use alloy::primitives::{Address, Log, U256};
use alloy::sol_types::SolEvent;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettlementEvent {
    Bought {
        buyer: Address,
        token_amount: U256,
        counter_amount: U256,
    },
    Sold {
        seller: Address,
        token_amount: U256,
        counter_amount: U256,
    },
    Created {
        token: Address,
        creator: Address,
        name: String,
        symbol: String,
    },
}

impl SettlementEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SettlementEvent::Bought { .. } => "TokensBought",
            SettlementEvent::Sold { .. } => "TokensSold",
            SettlementEvent::Created { .. } => "TokenCreated",
        }
    }

    fn party(&self) -> Address {
        match self {
            SettlementEvent::Bought { buyer, .. } => *buyer,
            SettlementEvent::Sold { seller, .. } => *seller,
            SettlementEvent::Created { creator, .. } => *creator,
        }
    }
}

/// Decode one log by its `topic0`. `None` for anything else.
pub fn decode_log(log: &Log) -> Option<SettlementEvent> {
    let topic0 = *log.data.topics().first()?;
    let decoded = if topic0 == TokensBought::SIGNATURE_HASH {
        TokensBought::decode_log_data(&log.data).map(|e| SettlementEvent::Bought {
            buyer: e.buyer,
            token_amount: e.tokenAmount,
            counter_amount: e.counterAmount,
        })
    } else if topic0 == TokensSold::SIGNATURE_HASH {
        TokensSold::decode_log_data(&log.data).map(|e| SettlementEvent::Sold {
            seller: e.seller,
            token_amount: e.tokenAmount,
            counter_amount: e.counterAmount,
        })
    } else if topic0 == TokenCreated::SIGNATURE_HASH {
        TokenCreated::decode_log_data(&log.data).map(|e| SettlementEvent::Created {
            token: e.tokenAddress,
            creator: e.creator,
            name: e.name,
            symbol: e.symbol,
        })
    } else {
        return None;
    };
    match decoded {
        Ok(event) => Some(event),
        Err(e) => {
            tracing::warn!(
                target: "settlement",
                address = %log.address,
                error = %e,
                "Launchpad log matched a signature but failed to decode"
            );
            None
        }
    }
}

/// Launchpad events in `receipt` that concern `party`.
pub fn events_for(receipt: &ConfirmedReceipt, launchpad: Address, party: Address) -> Vec<SettlementEvent> {
    receipt
        .logs
        .iter()
        .filter(|log| log.address == launchpad)
        .filter_map(decode_log)
        .filter(|event| event.party() == party)
        .collect()
}

/// Address of the token a `createToken` receipt announced, if any.
pub fn created_token(receipt: &ConfirmedReceipt, launchpad: Address, creator: Address) -> Option<Address> {
    events_for(receipt, launchpad, creator)
        .into_iter()
        .find_map(|event| match event {
            SettlementEvent::Created { token, .. } => Some(token),
            _ => None,
        })
}

/// Error for a mined revert, typed by the replayed reason when one was recovered.
pub fn revert_error(receipt: &ConfirmedReceipt, token: Option<Address>) -> AppError {
    let hash = format!("{:#x}", receipt.tx_hash);
    let Some(reason) = receipt.revert_reason.as_deref() else {
        return AppError::Reverted {
            hash,
            reason: "receipt status 0".into(),
        };
    };
    tracing::warn!(target: "settlement", hash = %receipt.tx_hash, reason, "Transaction reverted on-chain");
    match classify_refusal(None, reason, None, token) {
        AppError::Reverted { reason, .. } => AppError::Reverted { hash, reason },
        typed => typed,
    }
}

/// Turn a mined trade receipt into a [`SettlementReceipt`] or a typed failure.
///
/// `venue` is the contract expected to emit the settlement event.
pub fn classify(
    receipt: &ConfirmedReceipt,
    venue: Address,
    token: Address,
    trader: Address,
    direction: Direction,
) -> Result<SettlementReceipt, AppError> {
    if receipt.status() == SettlementStatus::Reverted {
        return Err(revert_error(receipt, Some(token)));
    }
    let hash = format!("{:#x}", receipt.tx_hash);

    let matched = events_for(receipt, venue, trader)
        .into_iter()
        .find_map(|event| match (direction, event) {
            (
                Direction::Buy,
                SettlementEvent::Bought {
                    token_amount,
                    counter_amount,
                    ..
                },
            ) => Some((token_amount, counter_amount)),
            (
                Direction::Sell,
                SettlementEvent::Sold {
                    token_amount,
                    counter_amount,
                    ..
                },
            ) => Some((counter_amount, token_amount)),
            _ => None,
        });

    let event_name = match direction {
        Direction::Buy => "TokensBought",
        Direction::Sell => "TokensSold",
    };
    let Some((realized, counter)) = matched else {
        tracing::warn!(
            target: "settlement",
            hash = %receipt.tx_hash,
            event = event_name,
            "Successful receipt carries no settlement event"
        );
        return Err(AppError::SettlementUnconfirmed { hash });
    };

    if realized.is_zero() {
        tracing::error!(
            target: "settlement",
            hash = %receipt.tx_hash,
            event = event_name,
            counter = %counter,
            "Settlement succeeded with zero realized amount"
        );
        return Err(AppError::ZeroPayoutAnomaly {
            hash,
            event: event_name.to_string(),
        });
    }

    Ok(SettlementReceipt {
        tx_hash: receipt.tx_hash,
        direction,
        realized_amount: realized,
        counter_amount: counter,
        gas_cost: receipt.gas_cost(),
        status: receipt.status(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    const LAUNCHPAD: Address = Address::new([0xaa; 20]);
    const TRADER: Address = Address::new([0xbb; 20]);
    const TOKEN: Address = Address::new([0x11; 20]);

    fn receipt(success: bool, logs: Vec<Log>) -> ConfirmedReceipt {
        ConfirmedReceipt {
            tx_hash: B256::repeat_byte(0x11),
            success,
            block_number: Some(10),
            gas_used: 100_000,
            effective_gas_price: 2_000_000_000,
            logs,
            revert_reason: None,
        }
    }

    fn sold(seller: Address, tokens: u64, counter: u64) -> Log {
        let event = TokensSold {
            seller,
            tokenAmount: U256::from(tokens),
            counterAmount: U256::from(counter),
        };
        Log {
            address: LAUNCHPAD,
            data: event.encode_log_data(),
        }
    }

    fn bought(buyer: Address, tokens: u64, counter: u64) -> Log {
        let event = TokensBought {
            buyer,
            tokenAmount: U256::from(tokens),
            counterAmount: U256::from(counter),
        };
        Log {
            address: LAUNCHPAD,
            data: event.encode_log_data(),
        }
    }

    #[test]
    fn sell_realizes_counter_amount_and_gas_cost() {
        let r = classify(&receipt(true, vec![sold(TRADER, 5, 7)]), LAUNCHPAD, TOKEN, TRADER, Direction::Sell)
            .unwrap();
        assert_eq!(r.realized_amount, U256::from(7u64));
        assert_eq!(r.counter_amount, U256::from(5u64));
        assert_eq!(r.gas_cost, U256::from(200_000_000_000_000u64));
    }

    #[test]
    fn buy_realizes_token_amount() {
        let r = classify(&receipt(true, vec![bought(TRADER, 100, 2)]), LAUNCHPAD, TOKEN, TRADER, Direction::Buy)
            .unwrap();
        assert_eq!(r.realized_amount, U256::from(100u64));
    }

    #[test]
    fn zero_payout_sell_is_an_anomaly() {
        let err = classify(&receipt(true, vec![sold(TRADER, 5, 0)]), LAUNCHPAD, TOKEN, TRADER, Direction::Sell)
            .unwrap_err();
        assert!(matches!(err, AppError::ZeroPayoutAnomaly { .. }));
    }

    #[test]
    fn missing_event_is_unconfirmed_and_revert_wins() {
        assert!(matches!(
            classify(&receipt(true, vec![]), LAUNCHPAD, TOKEN, TRADER, Direction::Sell),
            Err(AppError::SettlementUnconfirmed { .. })
        ));
        assert!(matches!(
            classify(&receipt(false, vec![sold(TRADER, 5, 7)]), LAUNCHPAD, TOKEN, TRADER, Direction::Sell),
            Err(AppError::Reverted { .. })
        ));
    }

    #[test]
    fn mined_revert_is_typed_by_replayed_reason() {
        let mut reverted = receipt(false, vec![]);
        reverted.revert_reason = Some("Token launch completed".into());
        assert!(matches!(
            classify(&reverted, LAUNCHPAD, TOKEN, TRADER, Direction::Buy),
            Err(AppError::TokenLaunchCompleted { .. })
        ));

        reverted.revert_reason = Some("Transfer failed".into());
        match classify(&reverted, LAUNCHPAD, TOKEN, TRADER, Direction::Sell) {
            Err(AppError::Reverted { hash, reason }) => {
                assert_eq!(hash, format!("{:#x}", B256::repeat_byte(0x11)));
                assert_eq!(reason, "Transfer failed");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn foreign_emitters_and_other_traders_are_ignored() {
        let mut foreign = sold(TRADER, 5, 7);
        foreign.address = Address::new([0xcc; 20]);
        let other = sold(Address::new([0xdd; 20]), 5, 7);
        assert!(matches!(
            classify(&receipt(true, vec![foreign, other]), LAUNCHPAD, TOKEN, TRADER, Direction::Sell),
            Err(AppError::SettlementUnconfirmed { .. })
        ));
    }

    #[test]
    fn created_token_is_read_from_event() {
        let token = Address::new([0x42; 20]);
        let event = TokenCreated {
            tokenAddress: token,
            creator: TRADER,
            name: "Meme".into(),
            symbol: "MEME".into(),
        };
        let log = Log {
            address: LAUNCHPAD,
            data: event.encode_log_data(),
        };
        assert_eq!(created_token(&receipt(true, vec![log]), LAUNCHPAD, TRADER), Some(token));
        assert_eq!(decode_log(&sold(TRADER, 1, 1)).map(|e| e.name()), Some("TokensSold"));
    }
}
