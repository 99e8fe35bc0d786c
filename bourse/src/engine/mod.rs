use crate::{
    config::Config,
    events::{PhaseTransition, Tick},
    middleware,
    persistence::state::InstrumentState as MarketInstrumentState,
};
use book::OrderBook;
use bourse_instrument::{
    Side,
    descriptor::InstrumentDescriptor,
    instrument::{Instrument, InstrumentId, PartyId},
};
use bourse_protocol::{
    TradingReply,
    order::{OrderId, OrderStatus},
    session::Session,
    trade::{Trade, TradeId},
    market_data::MarketDataRequest,
    trading::{
        ExecutionReport, InstrumentState, OrderCancellationRequest, OrderModificationRequest,
        OrderPlacementRequest, Quote, SecurityStatus, SecurityStatusRequest,
    },
};
use bourse_protocol::phase::TradingPhase;
use chrono::{DateTime, Utc};
use market_data::{MarketDataPublisher, MarketDataSettings};
use rust_decimal::Decimal;
use smol_str::SmolStr;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

/// Price-time priority limit order book.
pub mod book;

/// Market-data publisher and per-session subscriptions.
pub mod market_data;

mod orders;

/// Engine options derived from the venue [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub venue_id: SmolStr,
    pub cancel_on_disconnect: bool,
    pub support_tif_ioc: bool,
    pub support_tif_fok: bool,
    pub support_tif_day: bool,
    pub market_data: MarketDataSettings,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        Self {
            venue_id: SmolStr::new(&config.venue_id),
            cancel_on_disconnect: config.cancel_on_disconnect,
            support_tif_ioc: config.support_tif_ioc,
            support_tif_fok: config.support_tif_fok,
            support_tif_day: config.support_tif_day,
            market_data: MarketDataSettings {
                include_own_orders: config.include_own_orders,
                tns_enabled: config.tns_enabled,
                tns_qty_enabled: config.tns_qty_enabled,
                tns_side_enabled: config.tns_side_enabled,
                tns_parties_enabled: config.tns_parties_enabled,
            },
        }
    }
}

/// A unit of work queued on a trading engine.
///
/// Commands for one instrument run in submission order; engines of different
/// instruments run concurrently.
#[derive(Debug)]
pub enum EngineCommand {
    PlaceOrder(OrderPlacementRequest),
    AmendOrder(OrderModificationRequest),
    CancelOrder(OrderCancellationRequest),
    ProcessSecurityStatusRequest(SecurityStatusRequest),
    ProcessMarketDataRequest(MarketDataRequest),
    CaptureInstrumentState {
        response_tx: oneshot::Sender<InstrumentState>,
    },
    StoreState {
        state: MarketInstrumentState,
        response_tx: oneshot::Sender<MarketInstrumentState>,
    },
    RecoverState(MarketInstrumentState),
    NotifyClientDisconnected(Session),
    Tick(Tick),
    PhaseTransition(PhaseTransition),
}

impl EngineCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaceOrder(_) => "PlaceOrder",
            Self::AmendOrder(_) => "AmendOrder",
            Self::CancelOrder(_) => "CancelOrder",
            Self::ProcessSecurityStatusRequest(_) => "ProcessSecurityStatusRequest",
            Self::ProcessMarketDataRequest(_) => "ProcessMarketDataRequest",
            Self::CaptureInstrumentState { .. } => "CaptureInstrumentState",
            Self::StoreState { .. } => "StoreState",
            Self::RecoverState(_) => "RecoverState",
            Self::NotifyClientDisconnected(_) => "NotifyClientDisconnected",
            Self::Tick(_) => "Tick",
            Self::PhaseTransition(_) => "PhaseTransition",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum EngineError {
    #[error("requester disconnected before the engine could reply")]
    ResponseReceiverDropped,
}

/// Enqueues commands onto one engine's private queue.
#[derive(Debug, Clone)]
pub struct TradingEngineHandle {
    instrument_id: InstrumentId,
    command_tx: mpsc::UnboundedSender<EngineCommand>,
}

impl TradingEngineHandle {
    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    /// Enqueue a command; dropped with a warning when the engine has shut down.
    pub fn execute(&self, command: EngineCommand) {
        if self.command_tx.send(command).is_err() {
            warn!(
                instrument = %self.instrument_id,
                "trading engine queue is closed, command dropped"
            );
        }
    }
}

/// Single-instrument command-serialising trading engine.
///
/// Owns the listing's order book, market-data publisher and client-notification cache.
/// One worker drains the queue at a time, so every command observes a consistent view of
/// the engine's state.
#[derive(Debug)]
pub struct TradingEngine {
    instrument: Instrument,
    instrument_id: InstrumentId,
    descriptor: InstrumentDescriptor,
    settings: EngineSettings,
    phase: TradingPhase,
    halt_allows_cancels: bool,
    book: OrderBook,
    publisher: MarketDataPublisher,
    notifications: Vec<TradingReply>,
    order_sequence: u64,
    trade_sequence: u64,
    command_rx: mpsc::UnboundedReceiver<EngineCommand>,
}

impl TradingEngine {
    pub fn new(
        instrument: Instrument,
        settings: EngineSettings,
        initial_phase: PhaseTransition,
    ) -> (Self, TradingEngineHandle) {
        let instrument_id = instrument
            .identifier
            .expect("cached instrument carries an identifier");
        let descriptor = descriptor_for(&instrument);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let publisher = MarketDataPublisher::new(settings.market_data.clone());
        let engine = Self {
            instrument,
            instrument_id,
            descriptor,
            settings,
            phase: initial_phase.phase,
            halt_allows_cancels: initial_phase.phase == TradingPhase::Halted
                && initial_phase.allow_cancels,
            book: OrderBook::new(),
            publisher,
            notifications: Vec::new(),
            order_sequence: 0,
            trade_sequence: 0,
            command_rx,
        };

        let handle = TradingEngineHandle {
            instrument_id,
            command_tx,
        };

        (engine, handle)
    }

    /// Drain the command queue until every handle is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.command_rx.recv().await {
            let name = command.name();
            debug!(instrument = %self.instrument_id, command = name, "processing command");

            if let Err(cause) = self.process(command) {
                error!(
                    instrument = %self.instrument_id,
                    command = name,
                    %cause,
                    "command failed, engine state may be corrupted"
                );
            }

            self.flush_notifications();
        }

        debug!(instrument = %self.instrument_id, "trading engine stopped");
    }

    fn process(&mut self, command: EngineCommand) -> Result<(), EngineError> {
        match command {
            EngineCommand::PlaceOrder(request) => self.place_order(request),
            EngineCommand::AmendOrder(request) => self.amend_order(request),
            EngineCommand::CancelOrder(request) => self.cancel_order(request),
            EngineCommand::ProcessSecurityStatusRequest(request) => {
                self.process_security_status(request)
            }
            EngineCommand::ProcessMarketDataRequest(request) => self.process_market_data(request),
            EngineCommand::CaptureInstrumentState { response_tx } => {
                return response_tx
                    .send(self.capture_state())
                    .map_err(|_| EngineError::ResponseReceiverDropped);
            }
            EngineCommand::StoreState { state, response_tx } => {
                return response_tx
                    .send(self.store_state(state))
                    .map_err(|_| EngineError::ResponseReceiverDropped);
            }
            EngineCommand::RecoverState(state) => self.recover_state(state),
            EngineCommand::NotifyClientDisconnected(session) => self.handle_disconnect(&session),
            EngineCommand::Tick(tick) => self.handle_tick(tick),
            EngineCommand::PhaseTransition(transition) => self.handle_phase_transition(transition),
        }
        Ok(())
    }

    /// Forward the cached notifications, in order, onto the trading reply channel.
    ///
    /// An unbound reply channel is logged by the middleware; the notification is dropped.
    fn flush_notifications(&mut self) {
        for reply in self.notifications.drain(..) {
            middleware::send_trading_reply(reply).ok();
        }
    }

    pub(crate) fn drain_notifications(&mut self) -> Vec<TradingReply> {
        std::mem::take(&mut self.notifications)
    }

    pub(crate) fn notify<Reply: Into<TradingReply>>(&mut self, reply: Reply) {
        self.notifications.push(reply.into());
    }

    fn handle_tick(&mut self, tick: Tick) {
        // Day orders survive a halt; they expire once the venue is closed.
        if self.phase == TradingPhase::Closed {
            let expired = self.expire_day_orders(tick.time);
            if expired {
                self.publish_market_data(&[]);
            }
        }
    }

    fn handle_phase_transition(&mut self, transition: PhaseTransition) {
        let previous = self.phase;
        self.phase = transition.phase;
        self.halt_allows_cancels =
            transition.phase == TradingPhase::Halted && transition.allow_cancels;

        let mut trades = Vec::new();
        if previous.is_auction() && transition.phase == TradingPhase::Open {
            trades = self.uncross_book(transition.time);
        }
        if transition.phase == TradingPhase::Closed {
            self.expire_day_orders(transition.time);
        }

        for session in self.publisher.sessions() {
            let status = SecurityStatus {
                session,
                request_id: None,
                instrument: self.descriptor.clone(),
                trading_phase: self.phase,
            };
            self.notify(status);
        }

        self.publish_market_data(&trades);
    }

    fn handle_disconnect(&mut self, session: &Session) {
        debug!(instrument = %self.instrument_id, %session, "client session disconnected");

        if self.settings.cancel_on_disconnect {
            let cancelled = self.book.remove_session_orders(session);
            let time = Utc::now();
            for order in cancelled {
                let report = self.execution_report_for_order(
                    &order,
                    OrderStatus::Cancelled,
                    None,
                    None,
                    time,
                );
                self.notify(report);
            }
        }

        self.publisher.stop_streaming(session);
        self.publish_market_data(&[]);
    }

    fn capture_state(&self) -> InstrumentState {
        InstrumentState {
            trading_phase: Some(self.phase),
            best_bid: self.best_quote(Side::Buy),
            best_offer: self.best_quote(Side::Sell),
            low_price: self.publisher.info().low_price,
            high_price: self.publisher.info().high_price,
            last_trade: self.book.last_trade().cloned(),
        }
    }

    fn store_state(&self, mut state: MarketInstrumentState) -> MarketInstrumentState {
        state.order_book.bids = self.book.side(Side::Buy).to_vec();
        state.order_book.asks = self.book.side(Side::Sell).to_vec();
        state.last_trade = self.book.last_trade().cloned();
        state.info = Some(self.publisher.info());
        state
    }

    fn recover_state(&mut self, state: MarketInstrumentState) {
        self.book = OrderBook::restore(
            state.order_book.bids,
            state.order_book.asks,
            state.last_trade,
        );
        self.publisher.set_info(state.info.unwrap_or_default());
        debug!(instrument = %self.instrument_id, "recovered market state");
        self.publish_market_data(&[]);
    }

    /// Aggregate quantity resting at the best price of a side.
    fn best_quote(&self, side: Side) -> Option<Quote> {
        let best = self.book.best(side)?;
        let quantity = self
            .book
            .side(side)
            .iter()
            .take_while(|order| order.price == best.price)
            .map(|order| order.remaining_quantity)
            .sum();
        Some(Quote::new(best.price, quantity))
    }

    fn publish_market_data(&mut self, trades: &[Trade]) {
        let updates = self.publisher.publish(&self.book, trades);
        self.notifications
            .extend(updates.into_iter().map(TradingReply::MarketDataUpdate));
    }

    fn execution_report_for_order(
        &self,
        order: &book::LimitOrder,
        status: OrderStatus,
        executed_price: Option<Decimal>,
        executed_quantity: Option<Decimal>,
        time: DateTime<Utc>,
    ) -> ExecutionReport {
        let leaves = match status {
            OrderStatus::Cancelled | OrderStatus::Expired | OrderStatus::Filled => Decimal::ZERO,
            _ => order.remaining_quantity,
        };

        ExecutionReport {
            session: order.session.clone(),
            instrument: self.descriptor.clone(),
            venue_order_id: order.order_id.clone(),
            client_order_id: order.client_order_id.clone(),
            status,
            side: order.side,
            // A market aggressor carries no limit price.
            order_price: (!order.price.is_zero()).then_some(order.price),
            executed_price,
            executed_quantity,
            leaves_quantity: leaves,
            time,
        }
    }

    pub(crate) fn next_order_id(&mut self) -> OrderId {
        self.order_sequence += 1;
        OrderId::new(format!(
            "{}-{}-{}",
            self.settings.venue_id, self.instrument_id, self.order_sequence
        ))
    }

    pub(crate) fn next_trade_id(&mut self) -> TradeId {
        self.trade_sequence += 1;
        TradeId::new(format!(
            "{}-{}-T{}",
            self.settings.venue_id, self.instrument_id, self.trade_sequence
        ))
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> TradingPhase {
        self.phase
    }
}

/// Descriptor identifying this listing in unsolicited outbound notifications.
fn descriptor_for(instrument: &Instrument) -> InstrumentDescriptor {
    InstrumentDescriptor {
        symbol: instrument.symbol.clone(),
        security_exchange: instrument.security_exchange.clone(),
        security_type: instrument.security_type,
        ..Default::default()
    }
}

pub(crate) fn first_party_id(parties: &[bourse_instrument::descriptor::Party]) -> Option<PartyId> {
    parties.first().map(|party| party.party_id.clone())
}
