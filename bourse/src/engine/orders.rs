use super::{TradingEngine, book::LimitOrder, first_party_id};
use bourse_instrument::Side;
use bourse_protocol::{
    order::{OrderKind, OrderStatus, TimeInForce},
    trade::Trade,
    trading::{
        OrderCancellationConfirmation, OrderCancellationReject, OrderCancellationRequest,
        OrderModificationConfirmation, OrderModificationReject, OrderModificationRequest,
        OrderPlacementConfirmation, OrderPlacementReject, OrderPlacementRequest, SecurityStatus,
        SecurityStatusRequest,
    },
    market_data::{MarketDataAction, MarketDataReject, MarketDataRequest},
    phase::TradingPhase,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

impl TradingEngine {
    pub(super) fn place_order(&mut self, request: OrderPlacementRequest) {
        if let Err(reason) = self.validate_placement(&request) {
            let reject = OrderPlacementReject {
                session: request.session,
                instrument: request.instrument,
                client_order_id: request.client_order_id,
                side: request.side,
                price: request.price,
                quantity: request.quantity,
                reason,
            };
            self.notify(reject);
            return;
        }

        let time = Utc::now();
        let venue_order_id = self.next_order_id();

        let confirmation = OrderPlacementConfirmation {
            session: request.session.clone(),
            instrument: request.instrument.clone(),
            venue_order_id: venue_order_id.clone(),
            client_order_id: request.client_order_id.clone(),
            side: request.side,
            price: request.price,
            quantity: request.quantity,
            time_in_force: request.time_in_force,
        };
        self.notify(confirmation);

        let limit_price = match request.order_kind {
            OrderKind::Limit => request.price,
            OrderKind::Market => None,
        };

        let mut incoming = LimitOrder {
            order_id: venue_order_id,
            client_order_id: request.client_order_id.clone(),
            session: request.session.clone(),
            parties: request.parties.clone(),
            side: request.side,
            price: limit_price.unwrap_or_default(),
            remaining_quantity: request.quantity,
            time_in_force: request.time_in_force,
        };

        // An unfillable fill-or-kill order expires untouched.
        if request.time_in_force == TimeInForce::FillOrKill
            && self.book.available_quantity(request.side, limit_price) < request.quantity
        {
            let report =
                self.execution_report_for_order(&incoming, OrderStatus::Expired, None, None, time);
            self.notify(report);
            return;
        }

        let mut trades = Vec::new();
        if self.phase == TradingPhase::Open {
            trades = self.match_incoming_order(&mut incoming, limit_price, time);
        }

        if incoming.remaining_quantity > Decimal::ZERO {
            let rests = request.order_kind == OrderKind::Limit
                && request.time_in_force != TimeInForce::ImmediateOrCancel;
            if rests {
                self.book.insert(incoming);
            } else {
                let report = self.execution_report_for_order(
                    &incoming,
                    OrderStatus::Expired,
                    None,
                    None,
                    time,
                );
                self.notify(report);
            }
        }

        self.publish_market_data(&trades);
    }

    pub(super) fn amend_order(&mut self, request: OrderModificationRequest) {
        if let Err(reason) = self.validate_modification(&request) {
            let reject = OrderModificationReject {
                session: request.session,
                instrument: request.instrument,
                client_order_id: request.client_order_id,
                orig_client_order_id: request.orig_client_order_id,
                reason,
            };
            self.notify(reject);
            return;
        }

        let Some(resting) =
            self.book
                .remove(request.side, &request.orig_client_order_id, &request.session)
        else {
            let reject = OrderModificationReject {
                session: request.session,
                instrument: request.instrument,
                client_order_id: request.client_order_id,
                orig_client_order_id: request.orig_client_order_id,
                reason: String::from("order not found"),
            };
            self.notify(reject);
            return;
        };

        let time = Utc::now();
        let price = request.price.unwrap_or(resting.price);

        // An amended order loses its queue position.
        let mut amended = LimitOrder {
            client_order_id: Some(request.client_order_id.clone()),
            price,
            remaining_quantity: request.quantity,
            time_in_force: request.time_in_force,
            ..resting
        };

        let confirmation = OrderModificationConfirmation {
            session: request.session.clone(),
            instrument: request.instrument.clone(),
            venue_order_id: amended.order_id.clone(),
            client_order_id: request.client_order_id.clone(),
            orig_client_order_id: request.orig_client_order_id.clone(),
            price: Some(price),
            quantity: request.quantity,
            leaves_quantity: request.quantity,
        };
        self.notify(confirmation);

        let mut trades = Vec::new();
        if self.phase == TradingPhase::Open {
            trades = self.match_incoming_order(&mut amended, Some(price), time);
        }
        if amended.remaining_quantity > Decimal::ZERO {
            self.book.insert(amended);
        }

        self.publish_market_data(&trades);
    }

    pub(super) fn cancel_order(&mut self, request: OrderCancellationRequest) {
        if self.phase == TradingPhase::Halted && !self.halt_allows_cancels {
            let reject = OrderCancellationReject {
                session: request.session,
                instrument: request.instrument,
                client_order_id: request.client_order_id,
                orig_client_order_id: request.orig_client_order_id,
                reason: String::from("order cancellation is not allowed while trading is halted"),
            };
            self.notify(reject);
            return;
        }

        let Some(cancelled) =
            self.book
                .remove(request.side, &request.orig_client_order_id, &request.session)
        else {
            let reject = OrderCancellationReject {
                session: request.session,
                instrument: request.instrument,
                client_order_id: request.client_order_id,
                orig_client_order_id: request.orig_client_order_id,
                reason: String::from("order not found"),
            };
            self.notify(reject);
            return;
        };

        let confirmation = OrderCancellationConfirmation {
            session: request.session,
            instrument: request.instrument,
            venue_order_id: cancelled.order_id,
            client_order_id: request.client_order_id,
            orig_client_order_id: request.orig_client_order_id,
        };
        self.notify(confirmation);

        self.publish_market_data(&[]);
    }

    pub(super) fn process_security_status(&mut self, request: SecurityStatusRequest) {
        let status = SecurityStatus {
            session: request.session,
            request_id: Some(request.request_id),
            instrument: request.instrument,
            trading_phase: self.phase,
        };
        self.notify(status);
    }

    pub(super) fn process_market_data(&mut self, request: MarketDataRequest) {
        // The execution system already enforced the single-instrument rule.
        let Some(instrument) = request.instruments.into_iter().next() else {
            let reject = MarketDataReject {
                session: request.session,
                request_id: request.request_id,
                reason: String::from("no instruments requested"),
            };
            self.notify(reject);
            return;
        };

        match request.action {
            MarketDataAction::Subscribe => {
                let snapshot = self.publisher.subscribe(
                    request.session,
                    request.request_id,
                    instrument,
                    &self.book,
                );
                self.notify(snapshot);
            }
            MarketDataAction::Snapshot => {
                let snapshot = self.publisher.snapshot(
                    request.session,
                    request.request_id,
                    instrument,
                    &self.book,
                );
                self.notify(snapshot);
            }
            MarketDataAction::Unsubscribe => {
                if !self
                    .publisher
                    .unsubscribe(&request.session, &request.request_id)
                {
                    let reject = MarketDataReject {
                        session: request.session,
                        request_id: request.request_id,
                        reason: String::from("market data subscription not found"),
                    };
                    self.notify(reject);
                }
            }
        }
    }

    /// Match an incoming or amended order against the opposite side and notify both
    /// counterparties of every execution.
    fn match_incoming_order(
        &mut self,
        incoming: &mut LimitOrder,
        limit_price: Option<Decimal>,
        time: DateTime<Utc>,
    ) -> Vec<Trade> {
        let fills =
            self.book
                .match_incoming(incoming.side, limit_price, incoming.remaining_quantity);

        let mut trades = Vec::new();
        for fill in fills {
            incoming.remaining_quantity -= fill.quantity;

            let trade = self.print_trade(
                fill.price,
                fill.quantity,
                Some(incoming.side),
                incoming,
                &fill.maker,
                time,
            );
            trades.push(trade);

            let taker_status = if incoming.remaining_quantity > Decimal::ZERO {
                OrderStatus::PartiallyFilled
            } else {
                OrderStatus::Filled
            };
            let taker_report = self.execution_report_for_order(
                incoming,
                taker_status,
                Some(fill.price),
                Some(fill.quantity),
                time,
            );
            self.notify(taker_report);

            let maker_status = if fill.maker_removed {
                OrderStatus::Filled
            } else {
                OrderStatus::PartiallyFilled
            };
            let maker_report = self.execution_report_for_order(
                &fill.maker,
                maker_status,
                Some(fill.price),
                Some(fill.quantity),
                time,
            );
            self.notify(maker_report);
        }

        trades
    }

    /// Match overlapping resting orders after leaving an auction phase.
    pub(super) fn uncross_book(&mut self, time: DateTime<Utc>) -> Vec<Trade> {
        let fills = self.book.uncross();

        let mut trades = Vec::new();
        for fill in fills {
            let trade =
                self.print_trade(fill.price, fill.quantity, None, &fill.bid, &fill.ask, time);
            trades.push(trade);

            for (order, removed) in [(&fill.bid, fill.bid_removed), (&fill.ask, fill.ask_removed)] {
                let status = if removed {
                    OrderStatus::Filled
                } else {
                    OrderStatus::PartiallyFilled
                };
                let report = self.execution_report_for_order(
                    order,
                    status,
                    Some(fill.price),
                    Some(fill.quantity),
                    time,
                );
                self.notify(report);
            }
        }

        trades
    }

    /// Expire every resting day order; `true` when the book changed.
    pub(super) fn expire_day_orders(&mut self, time: DateTime<Utc>) -> bool {
        let expired = self.book.expire_day_orders();
        let changed = !expired.is_empty();
        for order in expired {
            let report =
                self.execution_report_for_order(&order, OrderStatus::Expired, None, None, time);
            self.notify(report);
        }
        changed
    }

    fn print_trade(
        &mut self,
        price: Decimal,
        quantity: Decimal,
        aggressor_side: Option<Side>,
        taker: &LimitOrder,
        maker: &LimitOrder,
        time: DateTime<Utc>,
    ) -> Trade {
        let (buy_order, sell_order) = match taker.side {
            Side::Buy => (taker, maker),
            Side::Sell => (maker, taker),
        };

        let trade = Trade {
            id: self.next_trade_id(),
            price,
            quantity,
            aggressor_side,
            buyer: first_party_id(&buy_order.parties),
            seller: first_party_id(&sell_order.parties),
            time,
        };

        self.book.set_last_trade(trade.clone());
        self.publisher.record_trade(&trade);
        trade
    }

    fn validate_placement(&self, request: &OrderPlacementRequest) -> Result<(), String> {
        match self.phase {
            TradingPhase::Closed => {
                return Err(String::from(
                    "order placement is not allowed when the market is closed",
                ));
            }
            TradingPhase::Halted => {
                return Err(String::from(
                    "order placement is not allowed while trading is halted",
                ));
            }
            phase if phase.is_auction() => {
                let rests = request.order_kind == OrderKind::Limit
                    && matches!(
                        request.time_in_force,
                        TimeInForce::GoodTillCancel | TimeInForce::Day
                    );
                if !rests {
                    return Err(String::from(
                        "only resting orders are accepted during an auction",
                    ));
                }
            }
            _ => {}
        }

        self.validate_time_in_force(request.time_in_force)?;
        self.validate_quantity(request.quantity)?;

        if request.order_kind == OrderKind::Limit {
            let Some(price) = request.price else {
                return Err(String::from("limit order price is missing"));
            };
            self.validate_price(price)?;
        }

        Ok(())
    }

    fn validate_modification(&self, request: &OrderModificationRequest) -> Result<(), String> {
        match self.phase {
            TradingPhase::Closed => {
                return Err(String::from(
                    "order modification is not allowed when the market is closed",
                ));
            }
            TradingPhase::Halted => {
                return Err(String::from(
                    "order modification is not allowed while trading is halted",
                ));
            }
            _ => {}
        }

        if matches!(
            request.time_in_force,
            TimeInForce::ImmediateOrCancel | TimeInForce::FillOrKill
        ) {
            return Err(String::from(
                "a resting order can not be amended to an immediate time in force",
            ));
        }

        self.validate_time_in_force(request.time_in_force)?;
        self.validate_quantity(request.quantity)?;
        if let Some(price) = request.price {
            self.validate_price(price)?;
        }

        Ok(())
    }

    fn validate_time_in_force(&self, time_in_force: TimeInForce) -> Result<(), String> {
        let supported = match time_in_force {
            TimeInForce::GoodTillCancel => true,
            TimeInForce::Day => self.settings.support_tif_day,
            TimeInForce::ImmediateOrCancel => self.settings.support_tif_ioc,
            TimeInForce::FillOrKill => self.settings.support_tif_fok,
        };

        if supported {
            Ok(())
        } else {
            Err(format!(
                "time in force {time_in_force} is not supported by the venue"
            ))
        }
    }

    fn validate_quantity(&self, quantity: Decimal) -> Result<(), String> {
        if quantity <= Decimal::ZERO {
            return Err(String::from("order quantity must be positive"));
        }
        if let Some(min) = self.instrument.min_quantity
            && quantity < min
        {
            return Err(String::from(
                "order quantity is less than the minimal allowed quantity",
            ));
        }
        if let Some(max) = self.instrument.max_quantity
            && quantity > max
        {
            return Err(String::from(
                "order quantity is greater than the maximal allowed quantity",
            ));
        }
        if let Some(tick) = self.instrument.quantity_tick
            && tick > Decimal::ZERO
            && !(quantity % tick).is_zero()
        {
            return Err(String::from(
                "order quantity is not a multiple of the instrument quantity tick",
            ));
        }
        Ok(())
    }

    fn validate_price(&self, price: Decimal) -> Result<(), String> {
        if price <= Decimal::ZERO {
            return Err(String::from("order price must be positive"));
        }
        if let Some(tick) = self.instrument.price_tick
            && tick > Decimal::ZERO
            && !(price % tick).is_zero()
        {
            return Err(String::from(
                "order price is not a multiple of the instrument price tick",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        engine::{EngineCommand, EngineSettings, TradingEngine},
        events::PhaseTransition,
        persistence::state::InstrumentState as MarketInstrumentState,
    };
    use bourse_instrument::{
        Side,
        descriptor::InstrumentDescriptor,
        instrument::{Instrument, InstrumentId, Symbol},
    };
    use bourse_protocol::{
        RequestId, TradingReply,
        market_data::{MarketDataAction, MarketDataRequest, MarketEntryKind},
        order::{ClientOrderId, OrderKind, OrderStatus, TimeInForce},
        phase::TradingPhase,
        session::{FixSession, Session},
        trading::{
            OrderCancellationRequest, OrderModificationRequest, OrderPlacementRequest,
            SecurityStatusRequest,
        },
    };
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument {
            identifier: Some(InstrumentId::new(1)),
            symbol: Some(Symbol::new("AAPL")),
            min_quantity: Some(dec!(1)),
            max_quantity: Some(dec!(10000)),
            quantity_tick: Some(dec!(1)),
            price_tick: Some(dec!(0.01)),
            ..Default::default()
        }
    }

    fn transition(phase: TradingPhase) -> PhaseTransition {
        PhaseTransition {
            phase,
            allow_cancels: false,
            time: Utc::now(),
        }
    }

    fn engine(phase: TradingPhase) -> TradingEngine {
        engine_with_settings(phase, EngineSettings::default())
    }

    fn engine_with_settings(phase: TradingPhase, settings: EngineSettings) -> TradingEngine {
        TradingEngine::new(instrument(), settings, transition(phase)).0
    }

    fn fix(name: &str) -> Session {
        Session::Fix(FixSession::fix44(name, "VENUE"))
    }

    fn placement(
        session: Session,
        cl_ord_id: &str,
        side: Side,
        price: Decimal,
        quantity: Decimal,
    ) -> OrderPlacementRequest {
        OrderPlacementRequest {
            session,
            instrument: InstrumentDescriptor::from_symbol("AAPL"),
            client_order_id: Some(ClientOrderId::new(cl_ord_id)),
            parties: vec![],
            side,
            order_kind: OrderKind::Limit,
            time_in_force: TimeInForce::GoodTillCancel,
            price: Some(price),
            quantity,
        }
    }

    fn place(engine: &mut TradingEngine, request: OrderPlacementRequest) -> Vec<TradingReply> {
        engine.place_order(request);
        engine.drain_notifications()
    }

    #[test]
    fn test_placement_confirms_and_rests() {
        let mut engine = engine(TradingPhase::Open);
        let replies = place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(100)),
        );

        assert_eq!(replies.len(), 1);
        let TradingReply::OrderPlacementConfirmation(confirmation) = &replies[0] else {
            panic!("expected OrderPlacementConfirmation, got {replies:?}");
        };
        assert_eq!(confirmation.quantity, dec!(100));
        assert_eq!(engine.book.side(Side::Buy).len(), 1);
    }

    #[test]
    fn test_crossing_orders_trade_and_report_both_sides() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("MAKER"), "m1", Side::Sell, dec!(150.00), dec!(60)),
        );

        let replies = place(
            &mut engine,
            placement(fix("TAKER"), "t1", Side::Buy, dec!(150.00), dec!(100)),
        );

        // Confirmation, taker report, maker report.
        assert!(matches!(replies[0], TradingReply::OrderPlacementConfirmation(_)));

        let TradingReply::ExecutionReport(taker) = &replies[1] else {
            panic!("expected taker ExecutionReport, got {replies:?}");
        };
        assert_eq!(taker.status, OrderStatus::PartiallyFilled);
        assert_eq!(taker.executed_quantity, Some(dec!(60)));
        assert_eq!(taker.leaves_quantity, dec!(40));

        let TradingReply::ExecutionReport(maker) = &replies[2] else {
            panic!("expected maker ExecutionReport, got {replies:?}");
        };
        assert_eq!(maker.session, fix("MAKER"));
        assert_eq!(maker.status, OrderStatus::Filled);

        // Remainder rests on the bid side.
        assert_eq!(engine.book.side(Side::Buy).len(), 1);
        assert_eq!(engine.book.last_trade().unwrap().price, dec!(150.00));
    }

    #[test]
    fn test_placement_rejected_while_halted_or_closed() {
        for (phase, reason) in [
            (
                TradingPhase::Halted,
                "order placement is not allowed while trading is halted",
            ),
            (
                TradingPhase::Closed,
                "order placement is not allowed when the market is closed",
            ),
        ] {
            let mut engine = engine(phase);
            let replies = place(
                &mut engine,
                placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(100)),
            );

            let TradingReply::OrderPlacementReject(reject) = &replies[0] else {
                panic!("expected OrderPlacementReject, got {replies:?}");
            };
            assert_eq!(reject.reason, reason);
        }
    }

    #[test]
    fn test_placement_validation_rejects() {
        struct TestCase {
            request: OrderPlacementRequest,
            expected_reason: &'static str,
        }

        let tests = vec![
            TestCase {
                request: placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(0)),
                expected_reason: "order quantity must be positive",
            },
            TestCase {
                request: placement(fix("A"), "c2", Side::Buy, dec!(150.00), dec!(20000)),
                expected_reason: "order quantity is greater than the maximal allowed quantity",
            },
            TestCase {
                request: placement(fix("A"), "c3", Side::Buy, dec!(150.00), dec!(10.5)),
                expected_reason: "order quantity is not a multiple of the instrument quantity tick",
            },
            TestCase {
                request: placement(fix("A"), "c4", Side::Buy, dec!(150.001), dec!(100)),
                expected_reason: "order price is not a multiple of the instrument price tick",
            },
            TestCase {
                request: OrderPlacementRequest {
                    price: None,
                    ..placement(fix("A"), "c5", Side::Buy, dec!(150.00), dec!(100))
                },
                expected_reason: "limit order price is missing",
            },
            TestCase {
                request: OrderPlacementRequest {
                    time_in_force: TimeInForce::FillOrKill,
                    ..placement(fix("A"), "c6", Side::Buy, dec!(150.00), dec!(100))
                },
                expected_reason: "time in force FillOrKill is not supported by the venue",
            },
        ];

        let settings = EngineSettings {
            support_tif_fok: false,
            ..EngineSettings::default()
        };

        for (index, test) in tests.into_iter().enumerate() {
            let mut engine = engine_with_settings(TradingPhase::Open, settings.clone());
            let replies = place(&mut engine, test.request);

            let TradingReply::OrderPlacementReject(reject) = &replies[0] else {
                panic!("TC{index} failed: expected reject, got {replies:?}");
            };
            assert_eq!(reject.reason, test.expected_reason, "TC{index} failed");
        }
    }

    #[test]
    fn test_immediate_or_cancel_expires_remainder() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("MAKER"), "m1", Side::Sell, dec!(150.00), dec!(30)),
        );

        let replies = place(
            &mut engine,
            OrderPlacementRequest {
                time_in_force: TimeInForce::ImmediateOrCancel,
                ..placement(fix("TAKER"), "t1", Side::Buy, dec!(150.00), dec!(100))
            },
        );

        let statuses: Vec<_> = replies
            .iter()
            .filter_map(|reply| match reply {
                TradingReply::ExecutionReport(report) => Some(report.status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Expired
            ]
        );
        assert!(engine.book.side(Side::Buy).is_empty());
    }

    #[test]
    fn test_fill_or_kill_expires_when_unfillable() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("MAKER"), "m1", Side::Sell, dec!(150.00), dec!(30)),
        );

        let replies = place(
            &mut engine,
            OrderPlacementRequest {
                time_in_force: TimeInForce::FillOrKill,
                ..placement(fix("TAKER"), "t1", Side::Buy, dec!(150.00), dec!(100))
            },
        );

        let TradingReply::ExecutionReport(report) = &replies[1] else {
            panic!("expected ExecutionReport, got {replies:?}");
        };
        assert_eq!(report.status, OrderStatus::Expired);
        // The resting offer is untouched.
        assert_eq!(
            engine.book.best(Side::Sell).unwrap().remaining_quantity,
            dec!(30)
        );
    }

    #[test]
    fn test_amend_reprices_and_confirms() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(149.00), dec!(100)),
        );

        engine.amend_order(OrderModificationRequest {
            session: fix("A"),
            instrument: InstrumentDescriptor::from_symbol("AAPL"),
            venue_order_id: None,
            client_order_id: ClientOrderId::new("c2"),
            orig_client_order_id: ClientOrderId::new("c1"),
            side: Side::Buy,
            time_in_force: TimeInForce::GoodTillCancel,
            price: Some(dec!(150.00)),
            quantity: dec!(50),
        });
        let replies = engine.drain_notifications();

        assert!(matches!(
            replies[0],
            TradingReply::OrderModificationConfirmation(_)
        ));
        let resting = engine.book.best(Side::Buy).unwrap();
        assert_eq!(resting.price, dec!(150.00));
        assert_eq!(resting.remaining_quantity, dec!(50));
        assert_eq!(resting.client_order_id, Some(ClientOrderId::new("c2")));
    }

    #[test]
    fn test_amend_unknown_order_rejected() {
        let mut engine = engine(TradingPhase::Open);

        engine.amend_order(OrderModificationRequest {
            session: fix("A"),
            instrument: InstrumentDescriptor::from_symbol("AAPL"),
            venue_order_id: None,
            client_order_id: ClientOrderId::new("c2"),
            orig_client_order_id: ClientOrderId::new("missing"),
            side: Side::Buy,
            time_in_force: TimeInForce::GoodTillCancel,
            price: Some(dec!(150.00)),
            quantity: dec!(50),
        });
        let replies = engine.drain_notifications();

        let TradingReply::OrderModificationReject(reject) = &replies[0] else {
            panic!("expected OrderModificationReject, got {replies:?}");
        };
        assert_eq!(reject.reason, "order not found");
    }

    #[test]
    fn test_cancel_confirms_and_removes() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(149.00), dec!(100)),
        );

        engine.cancel_order(OrderCancellationRequest {
            session: fix("A"),
            instrument: InstrumentDescriptor::from_symbol("AAPL"),
            venue_order_id: None,
            client_order_id: Some(ClientOrderId::new("c2")),
            orig_client_order_id: ClientOrderId::new("c1"),
            side: Side::Buy,
        });
        let replies = engine.drain_notifications();

        assert!(matches!(
            replies[0],
            TradingReply::OrderCancellationConfirmation(_)
        ));
        assert!(engine.book.side(Side::Buy).is_empty());
    }

    #[test]
    fn test_cancel_allowed_while_halted_when_permitted() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(149.00), dec!(100)),
        );

        engine.handle_phase_transition(PhaseTransition {
            phase: TradingPhase::Halted,
            allow_cancels: true,
            time: Utc::now(),
        });
        engine.drain_notifications();

        engine.cancel_order(OrderCancellationRequest {
            session: fix("A"),
            instrument: InstrumentDescriptor::from_symbol("AAPL"),
            venue_order_id: None,
            client_order_id: None,
            orig_client_order_id: ClientOrderId::new("c1"),
            side: Side::Buy,
        });
        let replies = engine.drain_notifications();

        assert!(matches!(
            replies[0],
            TradingReply::OrderCancellationConfirmation(_)
        ));
    }

    #[test]
    fn test_cancel_rejected_while_halted_without_permission() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(149.00), dec!(100)),
        );

        engine.handle_phase_transition(PhaseTransition {
            phase: TradingPhase::Halted,
            allow_cancels: false,
            time: Utc::now(),
        });
        engine.drain_notifications();

        engine.cancel_order(OrderCancellationRequest {
            session: fix("A"),
            instrument: InstrumentDescriptor::from_symbol("AAPL"),
            venue_order_id: None,
            client_order_id: None,
            orig_client_order_id: ClientOrderId::new("c1"),
            side: Side::Buy,
        });
        let replies = engine.drain_notifications();

        let TradingReply::OrderCancellationReject(reject) = &replies[0] else {
            panic!("expected OrderCancellationReject, got {replies:?}");
        };
        assert_eq!(
            reject.reason,
            "order cancellation is not allowed while trading is halted"
        );
    }

    #[test]
    fn test_security_status_reports_current_phase() {
        let mut engine = engine(TradingPhase::Open);

        engine.process_security_status(SecurityStatusRequest::new(
            fix("A"),
            RequestId::new("ss-1"),
            InstrumentDescriptor::from_symbol("AAPL"),
        ));
        let replies = engine.drain_notifications();

        let TradingReply::SecurityStatus(status) = &replies[0] else {
            panic!("expected SecurityStatus, got {replies:?}");
        };
        assert_eq!(status.trading_phase, TradingPhase::Open);
        assert_eq!(status.request_id, Some(RequestId::new("ss-1")));
    }

    #[test]
    fn test_market_data_subscription_sees_placed_order() {
        let mut engine = engine(TradingPhase::Open);

        engine.process_market_data(MarketDataRequest {
            session: fix("MD"),
            request_id: RequestId::new("md-1"),
            action: MarketDataAction::Subscribe,
            instruments: vec![InstrumentDescriptor::from_symbol("AAPL")],
        });
        let replies = engine.drain_notifications();
        let TradingReply::MarketDataSnapshot(snapshot) = &replies[0] else {
            panic!("expected MarketDataSnapshot, got {replies:?}");
        };
        assert!(snapshot.entries.is_empty());

        let replies = place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(100)),
        );
        let TradingReply::MarketDataUpdate(update) = &replies[1] else {
            panic!("expected MarketDataUpdate, got {replies:?}");
        };
        assert_eq!(update.entries[0].entry.kind, Some(MarketEntryKind::Bid));
        assert_eq!(update.entries[0].entry.price, Some(dec!(150.00)));
    }

    #[test]
    fn test_disconnect_cancels_orders_when_configured() {
        let settings = EngineSettings {
            cancel_on_disconnect: true,
            ..EngineSettings::default()
        };
        let mut engine = engine_with_settings(TradingPhase::Open, settings);

        place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(100)),
        );
        engine.handle_disconnect(&fix("A"));
        let replies = engine.drain_notifications();

        let TradingReply::ExecutionReport(report) = &replies[0] else {
            panic!("expected ExecutionReport, got {replies:?}");
        };
        assert_eq!(report.status, OrderStatus::Cancelled);
        assert_eq!(report.leaves_quantity, Decimal::ZERO);
        assert!(engine.book.side(Side::Buy).is_empty());
    }

    #[test]
    fn test_day_orders_expire_on_tick_when_closed() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            OrderPlacementRequest {
                time_in_force: TimeInForce::Day,
                ..placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(100))
            },
        );

        engine.handle_phase_transition(transition(TradingPhase::Closed));
        let replies = engine.drain_notifications();

        let TradingReply::ExecutionReport(report) = &replies[0] else {
            panic!("expected ExecutionReport, got {replies:?}");
        };
        assert_eq!(report.status, OrderStatus::Expired);
        assert!(engine.book.side(Side::Buy).is_empty());
    }

    #[test]
    fn test_auction_rests_orders_and_uncrosses_into_open() {
        let mut engine = engine(TradingPhase::OpeningAuction);

        place(
            &mut engine,
            placement(fix("B"), "b1", Side::Buy, dec!(151.00), dec!(100)),
        );
        place(
            &mut engine,
            placement(fix("S"), "s1", Side::Sell, dec!(150.00), dec!(100)),
        );
        // Crossed but not matched during the auction call.
        assert!(engine.book.is_crossed());

        engine.handle_phase_transition(transition(TradingPhase::Open));
        let replies = engine.drain_notifications();

        let filled: Vec<_> = replies
            .iter()
            .filter_map(|reply| match reply {
                TradingReply::ExecutionReport(report) => Some(report.status),
                _ => None,
            })
            .collect();
        assert_eq!(filled, vec![OrderStatus::Filled, OrderStatus::Filled]);
        assert!(!engine.book.is_crossed());
        assert_eq!(engine.book.last_trade().unwrap().price, dec!(150.00));
        assert_eq!(engine.phase(), TradingPhase::Open);
    }

    #[test]
    fn test_store_then_recover_restores_book() {
        let mut engine = engine(TradingPhase::Open);
        place(
            &mut engine,
            placement(fix("A"), "c1", Side::Buy, dec!(150.00), dec!(100)),
        );
        place(
            &mut engine,
            placement(fix("B"), "c2", Side::Sell, dec!(151.00), dec!(50)),
        );

        let stored = engine.store_state(MarketInstrumentState::empty(instrument()));
        assert_eq!(stored.order_book.bids.len(), 1);
        assert_eq!(stored.order_book.asks.len(), 1);

        let mut recovered =
            engine_with_settings(TradingPhase::Open, EngineSettings::default());
        recovered.recover_state(stored);

        let before = engine.capture_state();
        let after = recovered.capture_state();
        assert_eq!(before.best_bid, after.best_bid);
        assert_eq!(before.best_offer, after.best_offer);
    }

    #[test]
    fn test_command_queue_runs_in_submission_order() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .unwrap();

        let (engine, handle) = TradingEngine::new(
            instrument(),
            EngineSettings::default(),
            transition(TradingPhase::Open),
        );
        let task = runtime.spawn(engine.run());

        handle.execute(EngineCommand::PlaceOrder(placement(
            fix("A"),
            "c1",
            Side::Buy,
            dec!(150.00),
            dec!(100),
        )));

        let (state_tx, state_rx) = tokio::sync::oneshot::channel();
        handle.execute(EngineCommand::CaptureInstrumentState {
            response_tx: state_tx,
        });

        // The capture command observes the earlier placement.
        let state = runtime.block_on(state_rx).unwrap();
        assert_eq!(state.best_bid.map(|quote| quote.price), Some(dec!(150.00)));

        drop(handle);
        runtime.block_on(task).unwrap();
    }
}
