use crate::{
    descriptor::InstrumentDescriptor,
    instrument::{Instrument, InstrumentId},
    lookup::{LookupError, lookup_best_match},
    sources::InstrumentSource,
};
use std::collections::BTreeMap;
use tracing::{debug, error, info};

/// Non-owning reference to one cached [`Instrument`].
#[derive(Debug, Copy, Clone)]
pub struct View<'a> {
    instrument: &'a Instrument,
}

impl<'a> View<'a> {
    pub fn instrument(&self) -> &'a Instrument {
        self.instrument
    }

    /// Internal identifier of the referenced listing.
    ///
    /// Every cached listing carries one - the cache assigns it on insert.
    pub fn identifier(&self) -> InstrumentId {
        self.instrument
            .identifier
            .expect("cached instrument carries an identifier")
    }
}

/// Id-ordered cache of the venue's tradable listings.
///
/// Populated once at startup from an [`InstrumentSource`] and effectively immutable
/// afterwards. Resolution of client-supplied descriptors goes through
/// [`Cache::find`]; the recovery path maps persisted listings back with
/// [`Cache::find_by_instrument`].
#[derive(Debug, Default)]
pub struct Cache {
    container: BTreeMap<InstrumentId, Instrument>,
    next_identifier: u64,
}

impl Cache {
    pub fn new() -> Self {
        info!("created instruments cache");
        Self::default()
    }

    /// Load every instrument yielded by the source into the cache.
    pub fn load(&mut self, source: &dyn InstrumentSource) {
        debug!("loading instruments into cache from a source");
        source.load_instruments(&mut |instrument| self.add_instrument(instrument));
        info!(name = source.name(), "loaded instruments from source into cache");
    }

    /// Insert one instrument, assigning it a fresh internal identifier.
    ///
    /// # Panics
    /// Panics if the generated identifier is already present in the cache. Identifiers are
    /// generated from a monotonically increasing sequence that is never reused within a
    /// process, so a collision indicates an internal invariant violation and the process
    /// must not continue with a corrupted cache.
    pub fn add_instrument(&mut self, mut instrument: Instrument) {
        let identifier = self.generate_new_id();
        instrument.identifier = Some(identifier);

        if self.container.contains_key(&identifier) {
            error!(
                %instrument,
                %identifier,
                "failed to add an instrument to the cache because another instrument with \
                 the same internal identifier already exists, this may indicate a bug in \
                 the internal instrument identifier generation algorithm"
            );
            panic!("internal identifier collision detected");
        }

        info!(%instrument, "cached instrument");
        self.container.insert(identifier, instrument);
    }

    /// Resolve a client-supplied descriptor to the single best-matched listing.
    pub fn find(&self, descriptor: &InstrumentDescriptor) -> Result<View<'_>, LookupError> {
        debug!(?descriptor, "looking for an instrument by descriptor");
        lookup_best_match(descriptor, self.container.values())
            .map(|instrument| View { instrument })
    }

    /// Find the cached listing equal to `instrument` on the full identification tuple.
    ///
    /// Used during recovery, where persisted listings carry identifiers from a previous
    /// process.
    pub fn find_by_instrument(&self, instrument: &Instrument) -> Result<View<'_>, LookupError> {
        debug!(%instrument, "looking for an instrument by instrument");
        self.container
            .values()
            .find(|cached| cached.same_listing(instrument))
            .map(|instrument| View { instrument })
            .ok_or_else(|| {
                debug!(%instrument, "the instrument was not found in the cache");
                LookupError::InstrumentNotFound
            })
    }

    /// Iterate the cached listings in identifier order.
    pub fn instruments(&self) -> impl Iterator<Item = &Instrument> + '_ {
        self.container.values()
    }

    /// Clone out every cached listing in identifier order.
    pub fn retrieve_instruments(&self) -> Vec<Instrument> {
        debug!("retrieving instruments from cache");
        self.container.values().cloned().collect()
    }

    fn generate_new_id(&mut self) -> InstrumentId {
        let Some(next) = self.next_identifier.checked_add(1) else {
            // Only reachable after u64::MAX instruments were cached in one process.
            error!(
                "failed to generate a new internal instrument identifier, this may indicate \
                 a bug in the internal instrument identifier generation algorithm"
            );
            panic!("unable to generate new instrument identifier");
        };
        self.next_identifier = next;
        InstrumentId::new(next)
    }
}
