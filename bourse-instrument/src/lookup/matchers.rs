use super::match_rate::MatchRate;
use crate::{
    descriptor::{InstrumentDescriptor, SecurityIdSource},
    instrument::{CurrencyGroup, Instrument},
};

/// Compare one optional attribute of the descriptor against one of the listing.
///
/// Absent on the descriptor side carries no information; present on the descriptor side
/// but absent or different on the listing side disqualifies the listing.
fn match_attribute<T: PartialEq>(descriptor: Option<&T>, instrument: Option<&T>) -> MatchRate {
    let Some(expected) = descriptor else {
        return MatchRate::UNMATCHABLE;
    };

    match instrument {
        Some(actual) if actual == expected => MatchRate::MATCH,
        _ => MatchRate::NO_MATCH,
    }
}

pub fn match_symbol(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(descriptor.symbol.as_ref(), instrument.symbol.as_ref())
}

pub fn match_sedol_id(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(descriptor.security_id.as_ref(), instrument.sedol.as_ref())
}

pub fn match_cusip_id(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(descriptor.security_id.as_ref(), instrument.cusip.as_ref())
}

pub fn match_isin_id(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(descriptor.security_id.as_ref(), instrument.isin.as_ref())
}

pub fn match_ric_id(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(descriptor.security_id.as_ref(), instrument.ric.as_ref())
}

pub fn match_exchange_id(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(
        descriptor.security_id.as_ref(),
        instrument.exchange_symbol.as_ref(),
    )
}

pub fn match_bloomberg_id(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(
        descriptor.security_id.as_ref(),
        instrument.bloomberg_symbol.as_ref(),
    )
}

/// Matcher for the alternative identifier named by the given source.
pub fn security_id_matcher(
    source: SecurityIdSource,
) -> fn(&InstrumentDescriptor, &Instrument) -> MatchRate {
    match source {
        SecurityIdSource::Cusip => match_cusip_id,
        SecurityIdSource::Sedol => match_sedol_id,
        SecurityIdSource::Isin => match_isin_id,
        SecurityIdSource::Ric => match_ric_id,
        SecurityIdSource::ExchangeSymbol => match_exchange_id,
        SecurityIdSource::BloombergSymbol => match_bloomberg_id,
    }
}

pub fn match_security_type(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    match_attribute(
        descriptor.security_type.as_ref(),
        instrument.security_type.as_ref(),
    )
}

pub fn match_security_exchange(
    descriptor: &InstrumentDescriptor,
    instrument: &Instrument,
) -> MatchRate {
    match_attribute(
        descriptor.security_exchange.as_ref(),
        instrument.security_exchange.as_ref(),
    )
}

/// Currency matching is conditional on the listing's security type: priced instruments
/// compare against the price currency, FX instruments against the base currency. A listing
/// without a security type has an unknown currency category and can not satisfy a
/// descriptor that names a currency.
pub fn match_currency(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    if descriptor.currency.is_none() {
        return MatchRate::UNMATCHABLE;
    }

    let Some(security_type) = instrument.security_type else {
        return MatchRate::NO_MATCH;
    };

    let currency = match security_type.currency_group() {
        CurrencyGroup::Price => instrument.price_currency.as_ref(),
        CurrencyGroup::Base => instrument.base_currency.as_ref(),
    };

    match_attribute(descriptor.currency.as_ref(), currency)
}

/// A descriptor party matches when an identical `(party_id, party_role)` pair is assigned
/// to the listing. Parties never disqualify a listing - an absent or different pair is
/// merely unmatchable.
pub fn match_party(descriptor: &InstrumentDescriptor, instrument: &Instrument) -> MatchRate {
    let (Some(party_id), Some(party_role)) = (&instrument.party_id, instrument.party_role) else {
        return MatchRate::UNMATCHABLE;
    };

    let matched = descriptor
        .parties
        .iter()
        .any(|party| party.party_id == *party_id && party.role == party_role);

    if matched {
        MatchRate::MATCH
    } else {
        MatchRate::UNMATCHABLE
    }
}
