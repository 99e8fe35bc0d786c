use crate::execution::ExecutionSystem;
use bourse_instrument::instrument::Instrument;
use bourse_protocol::admin::{RecoverMarketStateResult, StoreMarketStateResult};
use serializer::MarketStateSerializer;
use state::MarketState;
use std::{path::Path, sync::Arc};
use tracing::{debug, info, warn};

/// Pluggable market-state encodings.
pub mod serializer;

/// Persisted market-state document types.
pub mod state;

/// Coordinates store/recover of the fleet's matching-engine state.
///
/// Both operations are gated on the venue's persistence configuration; the actual state
/// gathering and re-hydration goes through the execution system's store/recover dispatch.
pub struct PersistenceController {
    enabled: bool,
    file_path: String,
    venue_id: String,
    serializer: Box<dyn MarketStateSerializer>,
    instruments: Vec<Instrument>,
    execution: Arc<ExecutionSystem>,
}

impl PersistenceController {
    pub fn new(
        enabled: bool,
        file_path: String,
        venue_id: String,
        serializer: Box<dyn MarketStateSerializer>,
        instruments: Vec<Instrument>,
        execution: Arc<ExecutionSystem>,
    ) -> Self {
        Self {
            enabled,
            file_path,
            venue_id,
            serializer,
            instruments,
            execution,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Serialize every engine's state to the configured persistence file.
    pub fn store(&self) -> StoreMarketStateResult {
        if !self.enabled {
            return StoreMarketStateResult::PersistenceDisabled;
        }
        if self.file_path.is_empty() {
            return StoreMarketStateResult::PersistenceFilePathIsEmpty;
        }
        if !self.path_reachable() {
            return StoreMarketStateResult::PersistenceFilePathIsUnreachable;
        }

        debug!("gathering market state from the trading engine fleet");
        let instruments = self.execution.collect_instrument_states(&self.instruments);
        let market_state = MarketState {
            venue_id: self.venue_id.clone(),
            instruments,
        };

        let bytes = match self.serializer.serialize(&market_state) {
            Ok(bytes) => bytes,
            Err(cause) => {
                warn!(%cause, "failed to serialize market state");
                return StoreMarketStateResult::ErrorWhenWritingToPersistenceFile;
            }
        };

        let mut file = match std::fs::File::create(&self.file_path) {
            Ok(file) => file,
            Err(cause) => {
                warn!(%cause, path = %self.file_path, "failed to open the persistence file");
                return StoreMarketStateResult::ErrorWhenOpeningPersistenceFile;
            }
        };

        if let Err(cause) = std::io::Write::write_all(&mut file, &bytes) {
            warn!(%cause, path = %self.file_path, "failed to write to the persistence file");
            return StoreMarketStateResult::ErrorWhenWritingToPersistenceFile;
        }

        info!(path = %self.file_path, "market state has been persisted");
        StoreMarketStateResult::Stored
    }

    /// Parse the persistence file and re-hydrate the fleet.
    pub fn recover(&self) -> (RecoverMarketStateResult, Option<String>) {
        if !self.enabled {
            return (RecoverMarketStateResult::PersistenceDisabled, None);
        }
        if self.file_path.is_empty() {
            return (RecoverMarketStateResult::PersistenceFilePathIsEmpty, None);
        }
        if !self.path_reachable() {
            return (
                RecoverMarketStateResult::PersistenceFilePathIsUnreachable,
                None,
            );
        }

        let bytes = match std::fs::read(&self.file_path) {
            Ok(bytes) => bytes,
            Err(cause) => {
                warn!(%cause, path = %self.file_path, "failed to open the persistence file");
                return (
                    RecoverMarketStateResult::ErrorWhenOpeningPersistenceFile,
                    None,
                );
            }
        };

        let market_state = match self.serializer.deserialize(&bytes) {
            Ok(state) => state,
            Err(cause) => {
                warn!(%cause, path = %self.file_path, "the persistence file is malformed");
                return (
                    RecoverMarketStateResult::PersistenceFileIsMalformed,
                    Some(cause.to_string()),
                );
            }
        };

        if market_state.venue_id != self.venue_id {
            warn!(
                stored = %market_state.venue_id,
                configured = %self.venue_id,
                "the persistence file was captured from a different venue"
            );
        }

        self.execution.recover_states(market_state.instruments);
        info!(path = %self.file_path, "market state has been recovered");
        (RecoverMarketStateResult::Recovered, None)
    }

    /// The persistence file's directory must exist; the file itself may not yet.
    fn path_reachable(&self) -> bool {
        match Path::new(&self.file_path).parent() {
            None => false,
            Some(parent) if parent.as_os_str().is_empty() => true,
            Some(parent) => parent.is_dir(),
        }
    }
}

impl std::fmt::Debug for PersistenceController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceController")
            .field("enabled", &self.enabled)
            .field("file_path", &self.file_path)
            .field("venue_id", &self.venue_id)
            .finish()
    }
}
