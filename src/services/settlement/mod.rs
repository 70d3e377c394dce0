// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod engine;
pub mod events;
pub mod lifecycle;
pub mod liquidity;
pub mod quote;
pub mod reconciler;
pub mod refresh;
pub mod submitter;

pub use engine::{EngineSettings, ShortfallAck, TradeContext, TradeEngine, TradeOutcome};
