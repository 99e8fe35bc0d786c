use crate::{RequestId, session::Session};
use bourse_instrument::{Side, descriptor::InstrumentDescriptor, instrument::PartyId};
use derive_more::Display;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// What a [`MarketDataRequest`] asks the venue to do with the subscription.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum MarketDataAction {
    /// Register the session and stream a snapshot followed by incremental updates.
    Subscribe,
    /// Stop streaming to the session for this request id.
    Unsubscribe,
    /// One-shot snapshot without registering.
    Snapshot,
}

/// Kind of one entry inside a market-data message.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum MarketEntryKind {
    Bid,
    Offer,
    Trade,
    LowPrice,
    HighPrice,
}

/// Action an incremental [`MarketEntryUpdate`] applies to a price level.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum MarketEntryAction {
    New,
    Change,
    Delete,
}

/// One price level, trade print or statistic inside a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketEntry {
    pub kind: Option<MarketEntryKind>,
    pub price: Option<Decimal>,
    pub quantity: Option<Decimal>,
    pub aggressor_side: Option<Side>,
    pub buyer: Option<PartyId>,
    pub seller: Option<PartyId>,
}

impl MarketEntry {
    /// A plain price level on one side of the book.
    pub fn level(kind: MarketEntryKind, price: Decimal, quantity: Decimal) -> Self {
        Self {
            kind: Some(kind),
            price: Some(price),
            quantity: Some(quantity),
            ..Default::default()
        }
    }
}

/// Incremental change to one entry of a previously published snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketEntryUpdate {
    pub action: MarketEntryAction,
    pub entry: MarketEntry,
}

/// Market-data subscription request; must name exactly one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketDataRequest {
    pub session: Session,
    pub request_id: RequestId,
    pub action: MarketDataAction,
    pub instruments: Vec<InstrumentDescriptor>,
}

/// Full image of a listing's published market data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketDataSnapshot {
    pub session: Session,
    pub request_id: RequestId,
    pub instrument: Option<InstrumentDescriptor>,
    pub entries: Vec<MarketEntry>,
}

/// Incremental refresh following a previously delivered snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketDataUpdate {
    pub session: Session,
    pub request_id: RequestId,
    pub entries: Vec<MarketEntryUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketDataReject {
    pub session: Session,
    pub request_id: RequestId,
    pub reason: String,
}
