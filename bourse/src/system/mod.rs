use crate::{
    config::{Config, ConfigError},
    engine::{EngineCommand, EngineSettings, TradingEngine},
    events::{EventController, clock::TzClock, schedule::PhaseSchedule},
    execution::ExecutionSystem,
    fleet::TradingEngineRepository,
    middleware::{
        self, TradingAdminRequestReceiver, TradingRequestReceiver, TradingSessionEventListener,
    },
    persistence::{PersistenceController, serializer::JsonSerializer},
};
use bourse_instrument::cache::Cache;
use bourse_protocol::{
    TradingRequest,
    admin::{
        HaltPhaseReply, HaltPhaseRequest, RecoverMarketStateReply, RecoverMarketStateRequest,
        ResumePhaseReply, ResumePhaseRequest, StoreMarketStateReply, StoreMarketStateRequest,
    },
    market_data::MarketDataRequest,
    session::SessionTerminatedEvent,
    trading::{
        InstrumentState, InstrumentStateRequest, OrderCancellationRequest,
        OrderModificationRequest, OrderPlacementRequest, SecurityStatusRequest,
    },
};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use thiserror::Error;
use tokio::{runtime::Runtime, sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to build the trading system runtime: {0}")]
    Runtime(#[from] std::io::Error),

    #[error("invalid venue configuration: {0}")]
    Config(#[from] ConfigError),
}

/// The venue's trading system.
///
/// Constructs and wires the middleware channels, the instrument cache, the trading-engine
/// fleet, the execution system, the internal event system and the persistence controller.
/// External gateways drive it through the `process_*` entry points or through the bound
/// middleware channels.
pub struct TradingSystem {
    runtime: Runtime,
    repository: Arc<TradingEngineRepository>,
    execution: Arc<ExecutionSystem>,
    event_controller: EventController,
    persistence: Arc<PersistenceController>,
    engine_tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_tx: watch::Sender<bool>,
    terminated: Arc<AtomicBool>,
}

impl TradingSystem {
    /// Construct the trading system over an already populated instrument cache, attempt a
    /// market-state recovery, and start the internal event loop.
    pub fn create(config: Config, instruments: Cache) -> Result<Self, SystemError> {
        debug!("creating trading system instance");

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_time()
            .build()?;
        let instruments = Arc::new(instruments);

        let clock = TzClock::parse(&config.timezone_clock)?;
        let schedule = PhaseSchedule::new(config.trading_phases_schedule.clone());
        let event_controller = EventController::new(clock, schedule);
        let initial_phase = event_controller.initial_transition();

        let repository = Arc::new(TradingEngineRepository::new());
        let settings = EngineSettings::from(&config);
        let mut engine_tasks = Vec::new();
        for instrument in instruments.instruments() {
            let (engine, handle) =
                TradingEngine::new(instrument.clone(), settings.clone(), initial_phase);
            engine_tasks.push(runtime.spawn(engine.run()));
            repository.add_engine(handle.instrument_id(), handle);
        }
        info!(engines = repository.len(), "initialized trading engines");

        let execution = Arc::new(ExecutionSystem::new(
            Arc::clone(&instruments),
            Arc::clone(&repository),
        ));

        let tick_fleet = Arc::clone(&repository);
        event_controller.bind_tick_listener(move |tick| {
            let tick = *tick;
            tick_fleet.broadcast(|engine| engine.execute(EngineCommand::Tick(tick)));
        });
        let phase_fleet = Arc::clone(&repository);
        event_controller.bind_phase_listener(move |transition| {
            let transition = *transition;
            phase_fleet
                .broadcast(|engine| engine.execute(EngineCommand::PhaseTransition(transition)));
        });

        let persistence = Arc::new(PersistenceController::new(
            config.persistence_enabled,
            config.persistence_file_path.clone(),
            config.venue_id.clone(),
            Box::new(JsonSerializer),
            instruments.retrieve_instruments(),
            Arc::clone(&execution),
        ));

        let terminated = Arc::new(AtomicBool::new(false));

        middleware::bind_trading_request_channel(Arc::new(RequestReceiver {
            execution: Arc::clone(&execution),
            terminated: Arc::clone(&terminated),
        }));
        middleware::bind_trading_admin_channel(Arc::new(AdminReceiver {
            event_controller: event_controller.clone(),
            persistence: Arc::clone(&persistence),
        }));
        middleware::bind_trading_session_event_channel(Arc::new(SessionEventListener {
            execution: Arc::clone(&execution),
            terminated: Arc::clone(&terminated),
        }));

        if persistence.enabled() {
            let (result, _) = persistence.recover();
            info!(%result, "attempted market state recovery at startup");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        event_controller.run(runtime.handle(), shutdown_rx);

        info!("created trading system instance");
        Ok(Self {
            runtime,
            repository,
            execution,
            event_controller,
            persistence,
            engine_tasks: Mutex::new(engine_tasks),
            shutdown_tx,
            terminated,
        })
    }

    pub fn process_order_placement(&self, request: OrderPlacementRequest) {
        if self.dropped("OrderPlacementRequest") {
            return;
        }
        self.execution.execute_placement(request);
    }

    pub fn process_order_modification(&self, request: OrderModificationRequest) {
        if self.dropped("OrderModificationRequest") {
            return;
        }
        self.execution.execute_modification(request);
    }

    pub fn process_order_cancellation(&self, request: OrderCancellationRequest) {
        if self.dropped("OrderCancellationRequest") {
            return;
        }
        self.execution.execute_cancellation(request);
    }

    pub fn process_market_data(&self, request: MarketDataRequest) {
        if self.dropped("MarketDataRequest") {
            return;
        }
        self.execution.execute_market_data(request);
    }

    pub fn process_security_status(&self, request: SecurityStatusRequest) {
        if self.dropped("SecurityStatusRequest") {
            return;
        }
        self.execution.execute_security_status(request);
    }

    /// Blocks the caller until the engine of the resolved listing answered.
    pub fn process_instrument_state(
        &self,
        request: InstrumentStateRequest,
    ) -> Option<InstrumentState> {
        if self.dropped("InstrumentStateRequest") {
            return None;
        }
        self.execution.execute_instrument_state(request)
    }

    pub fn process_halt(&self, request: HaltPhaseRequest) -> HaltPhaseReply {
        debug!("trading system received HaltPhaseRequest");
        self.event_controller.process_halt(request)
    }

    pub fn process_resume(&self, request: ResumePhaseRequest) -> ResumePhaseReply {
        debug!("trading system received ResumePhaseRequest");
        self.event_controller.process_resume(request)
    }

    pub fn process_store(&self, _: StoreMarketStateRequest) -> StoreMarketStateReply {
        debug!("trading system received StoreMarketStateRequest");
        StoreMarketStateReply::new(self.persistence.store())
    }

    pub fn process_recover(&self, _: RecoverMarketStateRequest) -> RecoverMarketStateReply {
        debug!("trading system received RecoverMarketStateRequest");
        let (result, error_message) = self.persistence.recover();
        RecoverMarketStateReply::new(result, error_message)
    }

    pub fn react_on(&self, event: SessionTerminatedEvent) {
        if self.dropped("SessionTerminatedEvent") {
            return;
        }
        debug!(session = %event.session, "trading system is notified about session termination");
        self.execution.handle_session_terminated(event);
    }

    /// Store the market state, stop the event loop and drain the engine fleet.
    ///
    /// Idempotent; subsequent `process_*` calls and events are silently dropped.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("terminating trading system");

        if self.persistence.enabled() {
            let result = self.persistence.store();
            info!(%result, "stored market state during termination");
        }

        self.shutdown_tx.send(true).ok();
        self.repository.clear();

        let tasks: Vec<_> = self.engine_tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(cause) = self.runtime.block_on(task) {
                error!(%cause, "trading engine task failed during termination");
            }
        }

        middleware::release_trading_request_channel();
        middleware::release_trading_admin_channel();
        middleware::release_trading_session_event_channel();

        info!("trading system has been terminated");
    }

    fn dropped(&self, message: &'static str) -> bool {
        if self.terminated.load(Ordering::SeqCst) {
            debug!(message, "trading system is terminated, message dropped");
            true
        } else {
            debug!(message, "trading system received message");
            false
        }
    }
}

impl Drop for TradingSystem {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for TradingSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingSystem")
            .field("engines", &self.repository.len())
            .field("terminated", &self.terminated.load(Ordering::SeqCst))
            .finish()
    }
}

/// Trading-request channel binding: forwards requests into the execution system.
struct RequestReceiver {
    execution: Arc<ExecutionSystem>,
    terminated: Arc<AtomicBool>,
}

impl TradingRequestReceiver for RequestReceiver {
    fn process(&self, request: TradingRequest) {
        if self.terminated.load(Ordering::SeqCst) {
            debug!(
                message = request.name(),
                "trading system is terminated, request dropped"
            );
            return;
        }

        match request {
            TradingRequest::OrderPlacement(request) => self.execution.execute_placement(request),
            TradingRequest::OrderModification(request) => {
                self.execution.execute_modification(request)
            }
            TradingRequest::OrderCancellation(request) => {
                self.execution.execute_cancellation(request)
            }
            TradingRequest::MarketData(request) => self.execution.execute_market_data(request),
            TradingRequest::SecurityStatus(request) => {
                self.execution.execute_security_status(request)
            }
        }
    }

    fn process_instrument_state_request(
        &self,
        request: InstrumentStateRequest,
    ) -> Option<InstrumentState> {
        if self.terminated.load(Ordering::SeqCst) {
            return None;
        }
        self.execution.execute_instrument_state(request)
    }
}

/// Trading-admin channel binding: phase control and market-state persistence.
struct AdminReceiver {
    event_controller: EventController,
    persistence: Arc<PersistenceController>,
}

impl TradingAdminRequestReceiver for AdminReceiver {
    fn process_halt(&self, request: HaltPhaseRequest) -> HaltPhaseReply {
        self.event_controller.process_halt(request)
    }

    fn process_resume(&self, request: ResumePhaseRequest) -> ResumePhaseReply {
        self.event_controller.process_resume(request)
    }

    fn process_store(&self, _: StoreMarketStateRequest) -> StoreMarketStateReply {
        StoreMarketStateReply::new(self.persistence.store())
    }

    fn process_recover(&self, _: RecoverMarketStateRequest) -> RecoverMarketStateReply {
        let (result, error_message) = self.persistence.recover();
        RecoverMarketStateReply::new(result, error_message)
    }
}

/// Session-event channel binding: fans session terminations out to the fleet.
struct SessionEventListener {
    execution: Arc<ExecutionSystem>,
    terminated: Arc<AtomicBool>,
}

impl TradingSessionEventListener for SessionEventListener {
    fn on_session_terminated(&self, event: SessionTerminatedEvent) {
        if self.terminated.load(Ordering::SeqCst) {
            debug!("trading system is terminated, session event dropped");
            return;
        }
        self.execution.handle_session_terminated(event);
    }
}
