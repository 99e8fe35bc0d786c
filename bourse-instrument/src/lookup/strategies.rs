use super::{
    LookupError,
    match_rate::MatchRate,
    matchers::{
        match_currency, match_party, match_security_exchange, match_security_type, match_symbol,
        security_id_matcher,
    },
};
use crate::{
    descriptor::{InstrumentDescriptor, SecurityIdSource},
    instrument::Instrument,
};

type Matcher = fn(&InstrumentDescriptor, &Instrument) -> MatchRate;

/// A lookup strategy selected from the identifiers present on a descriptor.
///
/// The primary identifier always participates in the score; the remaining matchers
/// increase discrimination and break ties in favour of the listing matching more of the
/// descriptor's attributes.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Strategy {
    Symbol,
    SecurityId(SecurityIdSource),
}

impl Strategy {
    /// Select the strategy for a descriptor, validating its well-formedness.
    ///
    /// An identifier source takes precedence over a symbol; a descriptor with neither is
    /// malformed. An ISIN identifier is only resolvable together with security type,
    /// currency and security exchange.
    pub(crate) fn select(descriptor: &InstrumentDescriptor) -> Result<Self, LookupError> {
        if let Some(source) = descriptor.security_id_source {
            if descriptor.security_id.is_none() {
                return Err(LookupError::MalformedInstrumentDescriptor);
            }

            if source == SecurityIdSource::Isin
                && (descriptor.security_type.is_none()
                    || descriptor.currency.is_none()
                    || descriptor.security_exchange.is_none())
            {
                return Err(LookupError::MalformedInstrumentDescriptor);
            }

            return Ok(Self::SecurityId(source));
        }

        if descriptor.symbol.is_some() {
            return Ok(Self::Symbol);
        }

        Err(LookupError::MalformedInstrumentDescriptor)
    }

    /// Score a listing against the descriptor by summing the strategy's matcher tuple.
    pub(crate) fn rate(&self, descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
        match self {
            Self::Symbol => compose(
                &[
                    match_symbol,
                    match_security_type,
                    match_currency,
                    match_security_exchange,
                    match_party,
                ],
                descriptor,
                instrument,
            ),
            Self::SecurityId(source) => compose(
                &[
                    security_id_matcher(*source),
                    match_security_type,
                    match_currency,
                    match_security_exchange,
                    match_symbol,
                    match_party,
                ],
                descriptor,
                instrument,
            ),
        }
    }
}

fn compose(matchers: &[Matcher], descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    matchers.iter().fold(MatchRate::UNMATCHABLE, |rate, matcher| {
        rate + matcher(descriptor, instrument)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{Currency, SecurityExchange, SecurityId, SecurityType, Symbol};

    #[test]
    fn test_select_prefers_security_id_over_symbol() {
        let descriptor = InstrumentDescriptor {
            symbol: Some(Symbol::new("AAPL")),
            ..InstrumentDescriptor::from_security_id("037833100", SecurityIdSource::Cusip)
        };

        assert_eq!(
            Strategy::select(&descriptor),
            Ok(Strategy::SecurityId(SecurityIdSource::Cusip))
        );
    }

    #[test]
    fn test_select_falls_back_to_symbol() {
        let descriptor = InstrumentDescriptor::from_symbol("AAPL");
        assert_eq!(Strategy::select(&descriptor), Ok(Strategy::Symbol));
    }

    #[test]
    fn test_select_rejects_empty_descriptor() {
        assert_eq!(
            Strategy::select(&InstrumentDescriptor::default()),
            Err(LookupError::MalformedInstrumentDescriptor)
        );
    }

    #[test]
    fn test_select_rejects_source_without_id() {
        let descriptor = InstrumentDescriptor {
            security_id_source: Some(SecurityIdSource::Ric),
            ..Default::default()
        };

        assert_eq!(
            Strategy::select(&descriptor),
            Err(LookupError::MalformedInstrumentDescriptor)
        );
    }

    #[test]
    fn test_select_requires_full_isin_attribute_set() {
        let complete = InstrumentDescriptor {
            security_type: Some(SecurityType::CommonStock),
            currency: Some(Currency::new("USD")),
            security_exchange: Some(SecurityExchange::new("XNAS")),
            ..InstrumentDescriptor::from_security_id("US0378331005", SecurityIdSource::Isin)
        };
        assert_eq!(
            Strategy::select(&complete),
            Ok(Strategy::SecurityId(SecurityIdSource::Isin))
        );

        for strip in [
            |d: &mut InstrumentDescriptor| d.security_type = None,
            |d: &mut InstrumentDescriptor| d.currency = None,
            |d: &mut InstrumentDescriptor| d.security_exchange = None,
        ] {
            let mut incomplete = complete.clone();
            strip(&mut incomplete);
            assert_eq!(
                Strategy::select(&incomplete),
                Err(LookupError::MalformedInstrumentDescriptor)
            );
        }
    }

    #[test]
    fn test_symbol_strategy_rate_accumulates_secondary_matchers() {
        let descriptor = InstrumentDescriptor {
            security_exchange: Some(SecurityExchange::new("XNAS")),
            ..InstrumentDescriptor::from_symbol("AAPL")
        };

        let plain = Instrument {
            symbol: Some(Symbol::new("AAPL")),
            ..Default::default()
        };
        let exact = Instrument {
            security_exchange: Some(SecurityExchange::new("XNAS")),
            ..plain.clone()
        };

        let strategy = Strategy::select(&descriptor).unwrap();
        assert!(strategy.rate(&descriptor, &exact) > MatchRate::MATCH);
        assert_eq!(strategy.rate(&descriptor, &plain), MatchRate::NO_MATCH);
    }

    #[test]
    fn test_id_strategy_rate_contradiction_disqualifies() {
        let descriptor = InstrumentDescriptor {
            symbol: Some(Symbol::new("AAPL")),
            ..InstrumentDescriptor::from_security_id("2046251", SecurityIdSource::Sedol)
        };

        let instrument = Instrument {
            sedol: Some(SecurityId::new("2046251")),
            symbol: Some(Symbol::new("GOOG")),
            ..Default::default()
        };

        let strategy = Strategy::select(&descriptor).unwrap();
        assert_eq!(strategy.rate(&descriptor, &instrument), MatchRate::NO_MATCH);
    }
}
