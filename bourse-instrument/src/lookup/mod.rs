use crate::{descriptor::InstrumentDescriptor, instrument::Instrument};
use match_rate::MatchRate;
use serde::{Deserialize, Serialize};
use strategies::Strategy;
use thiserror::Error;
use tracing::debug;

/// Match-rate algebra used to score a listing against a descriptor.
pub mod match_rate;

/// Per-attribute matchers.
pub mod matchers;

/// Per-identifier lookup strategies composing the attribute matchers.
pub mod strategies;

/// Reason an [`InstrumentDescriptor`] failed to resolve to exactly one cached listing.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Error,
)]
pub enum LookupError {
    #[error("instrument not found")]
    InstrumentNotFound,

    #[error("instrument descriptor matches multiple instruments")]
    AmbiguousInstrumentDescriptor,

    #[error("instrument descriptor is malformed")]
    MalformedInstrumentDescriptor,
}

/// Score every listing yielded by `instruments` and select the single best match.
///
/// Listings scoring [`MatchRate::UNMATCHABLE`] or below never match. A tie between two
/// listings at the best positive rate is ambiguous.
pub(crate) fn lookup_best_match<'a, Iter>(
    descriptor: &InstrumentDescriptor,
    instruments: Iter,
) -> Result<&'a Instrument, LookupError>
where
    Iter: IntoIterator<Item = &'a Instrument>,
{
    let strategy = Strategy::select(descriptor)?;

    let mut best_match: Option<&Instrument> = None;
    let mut ambiguous_match: Option<&Instrument> = None;
    let mut best_rate = MatchRate::UNMATCHABLE;

    for instrument in instruments {
        let rate = strategy.rate(descriptor, instrument);
        if rate > MatchRate::UNMATCHABLE {
            if rate > best_rate {
                best_rate = rate;
                best_match = Some(instrument);
                ambiguous_match = None;
            } else if rate == best_rate {
                ambiguous_match = Some(instrument);
            }
        }
    }

    let Some(best) = best_match else {
        debug!("no instrument found for a given descriptor");
        return Err(LookupError::InstrumentNotFound);
    };

    if let Some(ambiguous) = ambiguous_match {
        debug!(
            first = %best,
            second = %ambiguous,
            "multiple instruments found for a given descriptor"
        );
        return Err(LookupError::AmbiguousInstrumentDescriptor);
    }

    debug!(instrument = %best, "instrument found");
    Ok(best)
}
