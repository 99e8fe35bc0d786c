use crate::{
    engine::EngineCommand,
    fleet::TradingEngineRepository,
    middleware,
    persistence::state::InstrumentState as MarketInstrumentState,
};
use bourse_instrument::{cache::Cache, instrument::Instrument, lookup::LookupError};
use bourse_protocol::{
    TradingReply,
    market_data::{MarketDataReject, MarketDataRequest},
    session::SessionTerminatedEvent,
    trading::{
        BusinessMessageReject, InstrumentState, InstrumentStateRequest, OrderCancellationReject,
        OrderCancellationRequest, OrderModificationReject, OrderModificationRequest,
        OrderPlacementReject, OrderPlacementRequest, SecurityStatusRequest,
    },
};
use smol_str::SmolStr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// Human-readable reason attached to a reject caused by a failed instrument resolution.
const fn describe(error: LookupError) -> &'static str {
    match error {
        LookupError::InstrumentNotFound => "listing not found",
        LookupError::AmbiguousInstrumentDescriptor => "cannot resolve listing uniquely",
        LookupError::MalformedInstrumentDescriptor => {
            "listing identification attributes set is malformed"
        }
    }
}

/// Routes each external request to the engine of the resolved listing.
///
/// Requests whose instrument descriptor fails to resolve are answered with a typed reject
/// on the trading reply channel; internal requests without a reject route are logged and
/// dropped.
#[derive(Debug)]
pub struct ExecutionSystem {
    instruments: Arc<Cache>,
    repository: Arc<TradingEngineRepository>,
}

impl ExecutionSystem {
    pub fn new(instruments: Arc<Cache>, repository: Arc<TradingEngineRepository>) -> Self {
        Self {
            instruments,
            repository,
        }
    }

    pub fn execute_placement(&self, request: OrderPlacementRequest) {
        match self.instruments.find(&request.instrument) {
            Ok(view) => self
                .repository
                .unicast(view.identifier(), move |engine| {
                    engine.execute(EngineCommand::PlaceOrder(request))
                }),
            Err(error) => self.reject(TradingReply::OrderPlacementReject(OrderPlacementReject {
                session: request.session,
                instrument: request.instrument,
                client_order_id: request.client_order_id,
                side: request.side,
                price: request.price,
                quantity: request.quantity,
                reason: String::from(describe(error)),
            })),
        }
    }

    pub fn execute_modification(&self, request: OrderModificationRequest) {
        match self.instruments.find(&request.instrument) {
            Ok(view) => self
                .repository
                .unicast(view.identifier(), move |engine| {
                    engine.execute(EngineCommand::AmendOrder(request))
                }),
            Err(error) => {
                self.reject(TradingReply::OrderModificationReject(OrderModificationReject {
                    session: request.session,
                    instrument: request.instrument,
                    client_order_id: request.client_order_id,
                    orig_client_order_id: request.orig_client_order_id,
                    reason: String::from(describe(error)),
                }))
            }
        }
    }

    pub fn execute_cancellation(&self, request: OrderCancellationRequest) {
        match self.instruments.find(&request.instrument) {
            Ok(view) => self
                .repository
                .unicast(view.identifier(), move |engine| {
                    engine.execute(EngineCommand::CancelOrder(request))
                }),
            Err(error) => {
                self.reject(TradingReply::OrderCancellationReject(OrderCancellationReject {
                    session: request.session,
                    instrument: request.instrument,
                    client_order_id: request.client_order_id,
                    orig_client_order_id: request.orig_client_order_id,
                    reason: String::from(describe(error)),
                }))
            }
        }
    }

    pub fn execute_security_status(&self, request: SecurityStatusRequest) {
        match self.instruments.find(&request.instrument) {
            Ok(view) => self
                .repository
                .unicast(view.identifier(), move |engine| {
                    engine.execute(EngineCommand::ProcessSecurityStatusRequest(request))
                }),
            Err(error) => self.reject(TradingReply::BusinessMessageReject(
                BusinessMessageReject::new(
                    request.session,
                    SmolStr::new("SecurityStatusRequest"),
                    String::from(describe(error)),
                ),
            )),
        }
    }

    pub fn execute_market_data(&self, request: MarketDataRequest) {
        if request.instruments.is_empty() {
            self.reject(TradingReply::MarketDataReject(MarketDataReject {
                session: request.session,
                request_id: request.request_id,
                reason: String::from("no instruments requested"),
            }));
            return;
        }

        if request.instruments.len() > 1 {
            self.reject(TradingReply::MarketDataReject(MarketDataReject {
                session: request.session,
                request_id: request.request_id,
                reason: String::from("multiple instruments requested"),
            }));
            return;
        }

        match self.instruments.find(&request.instruments[0]) {
            Ok(view) => self
                .repository
                .unicast(view.identifier(), move |engine| {
                    engine.execute(EngineCommand::ProcessMarketDataRequest(request))
                }),
            Err(error) => self.reject(TradingReply::MarketDataReject(MarketDataReject {
                session: request.session,
                request_id: request.request_id,
                reason: String::from(describe(error)),
            })),
        }
    }

    /// Internal request sent by the generator; blocks the caller until the engine
    /// answered. There is no route for a reject, so resolution failures are dropped.
    pub fn execute_instrument_state(
        &self,
        request: InstrumentStateRequest,
    ) -> Option<InstrumentState> {
        let view = match self.instruments.find(&request.instrument) {
            Ok(view) => view,
            Err(error) => {
                warn!(
                    ?request,
                    %error,
                    "failed to resolve instrument, ignoring instrument state request"
                );
                return None;
            }
        };

        let (response_tx, response_rx) = oneshot::channel();
        self.repository.unicast(view.identifier(), move |engine| {
            engine.execute(EngineCommand::CaptureInstrumentState { response_tx })
        });

        response_rx.blocking_recv().ok()
    }

    /// Session-end is relevant to every engine (resting orders, subscriptions).
    pub fn handle_session_terminated(&self, event: SessionTerminatedEvent) {
        self.repository.broadcast(|engine| {
            engine.execute(EngineCommand::NotifyClientDisconnected(event.session.clone()))
        });
    }

    /// Gather a filled state slot from every listed engine, blocking the caller.
    ///
    /// Engines that have gone away are skipped with a warning.
    pub fn collect_instrument_states(
        &self,
        instruments: &[Instrument],
    ) -> Vec<MarketInstrumentState> {
        let mut pending = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            let Some(identifier) = instrument.identifier else {
                continue;
            };

            let (response_tx, response_rx) = oneshot::channel();
            let state = MarketInstrumentState::empty(instrument.clone());
            self.repository.unicast(identifier, move |engine| {
                engine.execute(EngineCommand::StoreState { state, response_tx })
            });
            pending.push((identifier, response_rx));
        }

        pending
            .into_iter()
            .filter_map(|(identifier, response_rx)| match response_rx.blocking_recv() {
                Ok(state) => Some(state),
                Err(_) => {
                    warn!(
                        instrument = %identifier,
                        "engine did not answer the store request, state skipped"
                    );
                    None
                }
            })
            .collect()
    }

    /// Re-hydrate engines from persisted per-instrument states.
    ///
    /// Records whose instrument is no longer cached are logged and skipped.
    pub fn recover_states(&self, states: Vec<MarketInstrumentState>) {
        for state in states {
            match self.instruments.find_by_instrument(&state.instrument) {
                Ok(view) => self.repository.unicast(view.identifier(), move |engine| {
                    engine.execute(EngineCommand::RecoverState(state))
                }),
                Err(_) => warn!(
                    instrument = %state.instrument,
                    "the instrument was not found, its recovery was ignored"
                ),
            }
        }
    }

    fn reject(&self, reply: TradingReply) {
        debug!(reply = reply.name(), "rejecting unresolvable request");
        middleware::send_trading_reply(reply).ok();
    }
}
