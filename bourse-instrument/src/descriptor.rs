use crate::instrument::{Currency, PartyId, PartyRole, SecurityExchange, SecurityId, SecurityType, Symbol};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Source of the alternative identifier carried by an [`InstrumentDescriptor`].
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum SecurityIdSource {
    Cusip,
    Sedol,
    Isin,
    Ric,
    ExchangeSymbol,
    BloombergSymbol,
}

/// Source of a [`Party`] identifier.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum PartyIdSource {
    Proprietary,
    Bic,
    Lei,
}

/// A party attached to an instrument descriptor or order.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct Party {
    pub party_id: PartyId,
    pub source: PartyIdSource,
    pub role: PartyRole,
}

impl Party {
    pub fn new(party_id: PartyId, source: PartyIdSource, role: PartyRole) -> Self {
        Self {
            party_id,
            source,
            role,
        }
    }
}

/// Client-supplied instrument locator.
///
/// A descriptor is well-formed iff it carries either a symbol or a
/// `(security_id, security_id_source)` pair; an ISIN identifier additionally requires
/// security type, currency and security exchange. Well-formedness is enforced by the
/// lookup strategy selection, not on construction.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct InstrumentDescriptor {
    pub symbol: Option<Symbol>,
    pub security_id: Option<SecurityId>,
    pub security_id_source: Option<SecurityIdSource>,
    pub currency: Option<Currency>,
    pub security_exchange: Option<SecurityExchange>,
    pub security_type: Option<SecurityType>,
    pub parties: Vec<Party>,
}

impl InstrumentDescriptor {
    /// Descriptor locating a listing by ticker symbol alone.
    pub fn from_symbol<S: AsRef<str>>(symbol: S) -> Self {
        Self {
            symbol: Some(Symbol::new(symbol)),
            ..Default::default()
        }
    }

    /// Descriptor locating a listing by an alternative identifier.
    pub fn from_security_id<S: AsRef<str>>(id: S, source: SecurityIdSource) -> Self {
        Self {
            security_id: Some(SecurityId::new(id)),
            security_id_source: Some(source),
            ..Default::default()
        }
    }
}
