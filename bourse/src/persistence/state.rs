use crate::engine::{book::LimitOrder, market_data::InstrumentInfo};
use bourse_instrument::instrument::Instrument;
use bourse_protocol::trade::Trade;
use serde::{Deserialize, Serialize};

/// Resting orders of one book, in priority order per side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderBookRecord {
    pub bids: Vec<LimitOrder>,
    pub asks: Vec<LimitOrder>,
}

/// Persisted matching-engine state of one listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstrumentState {
    pub instrument: Instrument,
    pub order_book: OrderBookRecord,
    pub last_trade: Option<Trade>,
    pub info: Option<InstrumentInfo>,
}

impl InstrumentState {
    /// An empty state slot for the given listing, to be filled by its engine.
    pub fn empty(instrument: Instrument) -> Self {
        Self {
            instrument,
            order_book: OrderBookRecord::default(),
            last_trade: None,
            info: None,
        }
    }
}

/// The persisted market-state document: every listing's state under the venue it was
/// captured from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarketState {
    pub venue_id: String,
    pub instruments: Vec<InstrumentState>,
}
