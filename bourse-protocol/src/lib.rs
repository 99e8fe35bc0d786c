#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]
#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! # Bourse-Protocol
//! Typed messages exchanged between external gateways (FIX acceptor, synthetic-flow
//! generator, admin surface) and the Bourse trading system. The wire codecs themselves
//! live with the gateways; this crate only defines the normalised message shapes, the
//! [`Session`](session::Session) routing variants, and the request/reply sum types the
//! middleware channels transfer.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use session::Session;
use smol_str::SmolStr;

/// Session variants replies are routed back over.
pub mod session;

/// Order identifiers, kinds, time-in-force and statuses.
pub mod order;

/// Order lifecycle and security-status messages.
pub mod trading;

/// Market-data subscription messages.
pub mod market_data;

/// A trade printed by a matching engine.
pub mod trade;

/// Admin request/reply pairs (trading phases, market state, generation).
pub mod admin;

/// Market-session phases a venue listing moves through.
pub mod phase;

/// Client-assigned identifier correlating a request with its replies.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct RequestId(pub SmolStr);

impl RequestId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id))
    }
}

/// Order lifecycle and subscription requests transferred over the trading request channel.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum TradingRequest {
    OrderPlacement(trading::OrderPlacementRequest),
    OrderModification(trading::OrderModificationRequest),
    OrderCancellation(trading::OrderCancellationRequest),
    MarketData(market_data::MarketDataRequest),
    SecurityStatus(trading::SecurityStatusRequest),
}

impl TradingRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrderPlacement(_) => "OrderPlacementRequest",
            Self::OrderModification(_) => "OrderModificationRequest",
            Self::OrderCancellation(_) => "OrderCancellationRequest",
            Self::MarketData(_) => "MarketDataRequest",
            Self::SecurityStatus(_) => "SecurityStatusRequest",
        }
    }
}

/// Replies and notifications transferred over the trading reply channel.
///
/// Every variant carries the [`Session`] it originated from; the reply channel receiver
/// dispatches on that variant (FIX acceptor vs generator).
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum TradingReply {
    BusinessMessageReject(trading::BusinessMessageReject),
    ExecutionReport(trading::ExecutionReport),
    OrderPlacementConfirmation(trading::OrderPlacementConfirmation),
    OrderPlacementReject(trading::OrderPlacementReject),
    OrderModificationConfirmation(trading::OrderModificationConfirmation),
    OrderModificationReject(trading::OrderModificationReject),
    OrderCancellationConfirmation(trading::OrderCancellationConfirmation),
    OrderCancellationReject(trading::OrderCancellationReject),
    MarketDataSnapshot(market_data::MarketDataSnapshot),
    MarketDataUpdate(market_data::MarketDataUpdate),
    MarketDataReject(market_data::MarketDataReject),
    SecurityStatus(trading::SecurityStatus),
}

impl TradingReply {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BusinessMessageReject(_) => "BusinessMessageReject",
            Self::ExecutionReport(_) => "ExecutionReport",
            Self::OrderPlacementConfirmation(_) => "OrderPlacementConfirmation",
            Self::OrderPlacementReject(_) => "OrderPlacementReject",
            Self::OrderModificationConfirmation(_) => "OrderModificationConfirmation",
            Self::OrderModificationReject(_) => "OrderModificationReject",
            Self::OrderCancellationConfirmation(_) => "OrderCancellationConfirmation",
            Self::OrderCancellationReject(_) => "OrderCancellationReject",
            Self::MarketDataSnapshot(_) => "MarketDataSnapshot",
            Self::MarketDataUpdate(_) => "MarketDataUpdate",
            Self::MarketDataReject(_) => "MarketDataReject",
            Self::SecurityStatus(_) => "SecurityStatus",
        }
    }

    /// Session this reply is routed back over.
    pub fn session(&self) -> &Session {
        match self {
            Self::BusinessMessageReject(reply) => &reply.session,
            Self::ExecutionReport(reply) => &reply.session,
            Self::OrderPlacementConfirmation(reply) => &reply.session,
            Self::OrderPlacementReject(reply) => &reply.session,
            Self::OrderModificationConfirmation(reply) => &reply.session,
            Self::OrderModificationReject(reply) => &reply.session,
            Self::OrderCancellationConfirmation(reply) => &reply.session,
            Self::OrderCancellationReject(reply) => &reply.session,
            Self::MarketDataSnapshot(reply) => &reply.session,
            Self::MarketDataUpdate(reply) => &reply.session,
            Self::MarketDataReject(reply) => &reply.session,
            Self::SecurityStatus(reply) => &reply.session,
        }
    }
}
