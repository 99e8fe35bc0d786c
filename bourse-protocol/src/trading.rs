use crate::{
    RequestId,
    order::{ClientOrderId, OrderId, OrderKind, OrderStatus, TimeInForce},
    phase::TradingPhase,
    session::Session,
    trade::Trade,
};
use bourse_instrument::{
    Side,
    descriptor::{InstrumentDescriptor, Party},
};
use chrono::{DateTime, Utc};
use derive_more::Constructor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Request to place a new order on a listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderPlacementRequest {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub client_order_id: Option<ClientOrderId>,
    pub parties: Vec<Party>,
    pub side: Side,
    pub order_kind: OrderKind,
    pub time_in_force: TimeInForce,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderPlacementConfirmation {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub venue_order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub side: Side,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub time_in_force: TimeInForce,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderPlacementReject {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub client_order_id: Option<ClientOrderId>,
    pub side: Side,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub reason: String,
}

/// Request to modify a resting order, targeted by its original client order id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderModificationRequest {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub venue_order_id: Option<OrderId>,
    pub client_order_id: ClientOrderId,
    pub orig_client_order_id: ClientOrderId,
    pub side: Side,
    pub time_in_force: TimeInForce,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderModificationConfirmation {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub venue_order_id: OrderId,
    pub client_order_id: ClientOrderId,
    pub orig_client_order_id: ClientOrderId,
    pub price: Option<Decimal>,
    pub quantity: Decimal,
    pub leaves_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderModificationReject {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub client_order_id: ClientOrderId,
    pub orig_client_order_id: ClientOrderId,
    pub reason: String,
}

/// Request to cancel a resting order, targeted by its original client order id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderCancellationRequest {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub venue_order_id: Option<OrderId>,
    pub client_order_id: Option<ClientOrderId>,
    pub orig_client_order_id: ClientOrderId,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderCancellationConfirmation {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub venue_order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub orig_client_order_id: ClientOrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OrderCancellationReject {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub client_order_id: Option<ClientOrderId>,
    pub orig_client_order_id: ClientOrderId,
    pub reason: String,
}

/// Unsolicited or solicited report on an order's lifecycle (fill, expiry, forced cancel).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExecutionReport {
    pub session: Session,
    pub instrument: InstrumentDescriptor,
    pub venue_order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub status: OrderStatus,
    pub side: Side,
    pub order_price: Option<Decimal>,
    pub executed_price: Option<Decimal>,
    pub executed_quantity: Option<Decimal>,
    pub leaves_quantity: Decimal,
    pub time: DateTime<Utc>,
}

/// Reject for a message that can not be answered with a typed reject.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct BusinessMessageReject {
    pub session: Session,
    pub ref_message_type: SmolStr,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct SecurityStatusRequest {
    pub session: Session,
    pub request_id: RequestId,
    pub instrument: InstrumentDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SecurityStatus {
    pub session: Session,
    pub request_id: Option<RequestId>,
    pub instrument: InstrumentDescriptor,
    pub trading_phase: TradingPhase,
}

/// Internal request for a listing's current state, sent by the synthetic-flow generator.
///
/// Carries no route for a reject reply; an unresolvable instrument is logged and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct InstrumentStateRequest {
    pub instrument: InstrumentDescriptor,
}

/// One side of the top of the book.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize, Serialize, Constructor)]
pub struct Quote {
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Snapshot of a listing's current market state, answered to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct InstrumentState {
    pub trading_phase: Option<TradingPhase>,
    pub best_bid: Option<Quote>,
    pub best_offer: Option<Quote>,
    pub low_price: Option<Decimal>,
    pub high_price: Option<Decimal>,
    pub last_trade: Option<Trade>,
}
