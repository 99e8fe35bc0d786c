use bourse_instrument::{Side, instrument::PartyId};
use chrono::{DateTime, Utc};
use derive_more::{Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct TradeId(pub SmolStr);

impl TradeId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id))
    }
}

/// A trade printed by a matching engine.
///
/// Doubles as the last-trade record disseminated in market data and persisted with the
/// market state.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub price: Decimal,
    pub quantity: Decimal,
    pub aggressor_side: Option<Side>,
    pub buyer: Option<PartyId>,
    pub seller: Option<PartyId>,
    pub time: DateTime<Utc>,
}
