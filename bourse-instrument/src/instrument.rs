use derive_more::{Display, From};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Formatter;

/// Dense internal instrument identifier, assigned by the cache on insert and never reused
/// within a process.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct InstrumentId(pub u64);

impl InstrumentId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Ticker symbol of a listing.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct Symbol(pub SmolStr);

impl Symbol {
    pub fn new<S: AsRef<str>>(symbol: S) -> Self {
        Self(SmolStr::new(symbol))
    }
}

/// ISO-4217 style currency code.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct Currency(pub SmolStr);

impl Currency {
    pub fn new<S: AsRef<str>>(code: S) -> Self {
        Self(SmolStr::new(code))
    }
}

/// Security exchange (MIC) a listing trades on.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct SecurityExchange(pub SmolStr);

impl SecurityExchange {
    pub fn new<S: AsRef<str>>(mic: S) -> Self {
        Self(SmolStr::new(mic))
    }
}

/// An alternative security identifier value (CUSIP, SEDOL, ISIN, RIC, exchange or
/// Bloomberg symbol).
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct SecurityId(pub SmolStr);

impl SecurityId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id))
    }
}

/// Identifier of a party associated with a listing or order.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display, From,
)]
pub struct PartyId(pub SmolStr);

impl PartyId {
    pub fn new<S: AsRef<str>>(id: S) -> Self {
        Self(SmolStr::new(id))
    }
}

/// Security type of a listing.
///
/// The type determines which currency attribute descriptor currencies are compared
/// against - see [`SecurityType::currency_group`].
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum SecurityType {
    CommonStock,
    ConvertibleBond,
    Future,
    Option,
    Warrant,
    Index,
    ContractForDifference,
    Certificate,
    FxSpot,
    FxForward,
    FxNonDeliverableForward,
    FxSwap,
    FxNonDeliverableSwap,
}

/// Currency attribute a descriptor currency is matched against for a [`SecurityType`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CurrencyGroup {
    /// Priced instruments (equities, derivatives) match against the price currency.
    Price,
    /// FX instruments match against the base currency.
    Base,
}

impl SecurityType {
    pub fn currency_group(&self) -> CurrencyGroup {
        match self {
            Self::CommonStock
            | Self::ConvertibleBond
            | Self::Future
            | Self::Option
            | Self::Warrant
            | Self::Index
            | Self::ContractForDifference
            | Self::Certificate => CurrencyGroup::Price,
            Self::FxSpot
            | Self::FxForward
            | Self::FxNonDeliverableForward
            | Self::FxSwap
            | Self::FxNonDeliverableSwap => CurrencyGroup::Base,
        }
    }
}

/// Role a [`PartyId`] fulfils.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
pub enum PartyRole {
    ExecutingFirm,
    ClearingFirm,
    ContraFirm,
    LiquidityProvider,
}

/// A tradable venue listing.
///
/// Immutable once cached - only the `identifier` is written by the cache on insert. Every
/// attribute apart from the identifier is optional.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Instrument {
    /// Internal identifier, unique across the cache. Assigned on insert.
    #[serde(default)]
    pub identifier: Option<InstrumentId>,
    pub database_id: Option<u64>,
    pub symbol: Option<Symbol>,
    pub security_type: Option<SecurityType>,
    pub price_currency: Option<Currency>,
    pub base_currency: Option<Currency>,
    pub security_exchange: Option<SecurityExchange>,
    pub party_id: Option<PartyId>,
    pub party_role: Option<PartyRole>,
    pub cusip: Option<SecurityId>,
    pub sedol: Option<SecurityId>,
    pub isin: Option<SecurityId>,
    pub ric: Option<SecurityId>,
    pub exchange_symbol: Option<SecurityId>,
    pub bloomberg_symbol: Option<SecurityId>,
    pub price_tick: Option<Decimal>,
    pub quantity_tick: Option<Decimal>,
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
}

impl Instrument {
    /// Alternative identifier of this listing for the given source, if assigned.
    pub fn security_id(&self, source: crate::descriptor::SecurityIdSource) -> Option<&SecurityId> {
        use crate::descriptor::SecurityIdSource;
        match source {
            SecurityIdSource::Cusip => self.cusip.as_ref(),
            SecurityIdSource::Sedol => self.sedol.as_ref(),
            SecurityIdSource::Isin => self.isin.as_ref(),
            SecurityIdSource::Ric => self.ric.as_ref(),
            SecurityIdSource::ExchangeSymbol => self.exchange_symbol.as_ref(),
            SecurityIdSource::BloombergSymbol => self.bloomberg_symbol.as_ref(),
        }
    }

    /// Equality over the full identification tuple, ignoring the internal identifier.
    ///
    /// Used on the recovery path, where a persisted listing must be mapped back onto the
    /// listing currently cached under a (possibly different) internal identifier.
    pub fn same_listing(&self, other: &Instrument) -> bool {
        self.symbol == other.symbol
            && self.price_currency == other.price_currency
            && self.base_currency == other.base_currency
            && self.security_exchange == other.security_exchange
            && self.party_id == other.party_id
            && self.cusip == other.cusip
            && self.sedol == other.sedol
            && self.isin == other.isin
            && self.ric == other.ric
            && self.exchange_symbol == other.exchange_symbol
            && self.bloomberg_symbol == other.bloomberg_symbol
            && self.party_role == other.party_role
            && self.security_type == other.security_type
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Instrument {{ identifier: {}, symbol: {} }}",
            self.identifier
                .map_or_else(|| "unassigned".to_string(), |id| id.to_string()),
            self.symbol
                .as_ref()
                .map_or_else(|| "none".to_string(), |symbol| symbol.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_type_currency_group() {
        assert_eq!(
            SecurityType::CommonStock.currency_group(),
            CurrencyGroup::Price
        );
        assert_eq!(SecurityType::Future.currency_group(), CurrencyGroup::Price);
        assert_eq!(SecurityType::FxSpot.currency_group(), CurrencyGroup::Base);
        assert_eq!(SecurityType::FxSwap.currency_group(), CurrencyGroup::Base);
    }

    #[test]
    fn test_same_listing_ignores_identifier() {
        let base = Instrument {
            symbol: Some(Symbol::new("AAPL")),
            security_exchange: Some(SecurityExchange::new("XNAS")),
            ..Default::default()
        };

        let recovered = Instrument {
            identifier: Some(InstrumentId::new(42)),
            ..base.clone()
        };

        assert!(base.same_listing(&recovered));
    }

    #[test]
    fn test_same_listing_detects_attribute_difference() {
        let base = Instrument {
            symbol: Some(Symbol::new("AAPL")),
            ..Default::default()
        };

        let other = Instrument {
            symbol: Some(Symbol::new("GOOG")),
            ..Default::default()
        };

        assert!(!base.same_listing(&other));
    }
}
