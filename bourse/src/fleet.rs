use crate::{FnvIndexMap, engine::TradingEngineHandle};
use bourse_instrument::instrument::InstrumentId;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Owns the venue's trading engines, keyed by internal instrument id.
///
/// Engines are registered once per instrument at startup; afterwards the repository only
/// dispatches - unicast by id or broadcast to the whole fleet.
#[derive(Debug, Default)]
pub struct TradingEngineRepository {
    engines: RwLock<FnvIndexMap<InstrumentId, TradingEngineHandle>>,
}

impl TradingEngineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_engine(&self, instrument_id: InstrumentId, engine: TradingEngineHandle) {
        let mut engines = self.engines.write();
        if engines.insert(instrument_id, engine).is_some() {
            warn!(
                instrument = %instrument_id,
                "replaced an already registered trading engine"
            );
        }
    }

    /// Invoke `action` with the engine of the given instrument; silently no-ops when no
    /// engine is registered under the id.
    pub fn unicast<F>(&self, instrument_id: InstrumentId, action: F)
    where
        F: FnOnce(&TradingEngineHandle),
    {
        debug!(instrument = %instrument_id, "unicasting action to the engine");
        match self.engines.read().get(&instrument_id) {
            Some(engine) => action(engine),
            None => debug!(
                instrument = %instrument_id,
                "no trading engine registered for the instrument, action dropped"
            ),
        }
    }

    /// Invoke `action` with every registered engine, in registration order.
    pub fn broadcast<F>(&self, action: F)
    where
        F: Fn(&TradingEngineHandle),
    {
        debug!("broadcasting action to all trading engines");
        for engine in self.engines.read().values() {
            action(engine);
        }
    }

    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }

    /// Deregister every engine, closing the fleet's command queues.
    pub fn clear(&self) {
        self.engines.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::{EngineSettings, TradingEngine},
        events::PhaseTransition,
    };
    use bourse_instrument::instrument::{Instrument, Symbol};
    use bourse_protocol::phase::TradingPhase;
    use chrono::Utc;

    fn handle(id: u64) -> TradingEngineHandle {
        let instrument = Instrument {
            identifier: Some(InstrumentId::new(id)),
            symbol: Some(Symbol::new("AAPL")),
            ..Default::default()
        };
        let initial = PhaseTransition {
            phase: TradingPhase::Open,
            allow_cancels: false,
            time: Utc::now(),
        };
        TradingEngine::new(instrument, EngineSettings::default(), initial).1
    }

    #[test]
    fn test_unicast_reaches_only_the_requested_engine() {
        let repository = TradingEngineRepository::new();
        repository.add_engine(InstrumentId::new(1), handle(1));
        repository.add_engine(InstrumentId::new(2), handle(2));

        let mut reached = Vec::new();
        repository.unicast(InstrumentId::new(2), |engine| {
            reached.push(engine.instrument_id())
        });

        assert_eq!(reached, vec![InstrumentId::new(2)]);
    }

    #[test]
    fn test_unicast_unknown_id_is_a_no_op() {
        let repository = TradingEngineRepository::new();
        repository.add_engine(InstrumentId::new(1), handle(1));

        let mut reached = 0;
        repository.unicast(InstrumentId::new(9), |_| reached += 1);

        assert_eq!(reached, 0);
    }

    #[test]
    fn test_broadcast_visits_every_engine_in_registration_order() {
        let repository = TradingEngineRepository::new();
        for id in [3, 1, 2] {
            repository.add_engine(InstrumentId::new(id), handle(id));
        }

        let reached = parking_lot::Mutex::new(Vec::new());
        repository.broadcast(|engine| reached.lock().push(engine.instrument_id().0));

        assert_eq!(*reached.lock(), vec![3, 1, 2]);
    }
}
