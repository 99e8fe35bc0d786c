use crate::instrument::Instrument;
use derive_more::Constructor;

/// Abstract producer of the venue's listings, visited once at startup.
///
/// Concrete database-backed sources live with the data layer; the core only consumes the
/// visitation contract.
pub trait InstrumentSource {
    /// Short source name used in log statements.
    fn name(&self) -> &'static str;

    /// Yield every instrument to the provided visitor.
    fn load_instruments(&self, visitor: &mut dyn FnMut(Instrument));
}

/// In-memory instrument source.
#[derive(Debug, Clone, Default, Constructor)]
pub struct MemorySource {
    instruments: Vec<Instrument>,
}

impl InstrumentSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load_instruments(&self, visitor: &mut dyn FnMut(Instrument)) {
        for instrument in &self.instruments {
            visitor(instrument.clone());
        }
    }
}
