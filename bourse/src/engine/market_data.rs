use super::book::OrderBook;
use crate::FnvIndexMap;
use bourse_instrument::{Side, descriptor::InstrumentDescriptor};
use bourse_protocol::{
    RequestId,
    market_data::{
        MarketDataSnapshot, MarketDataUpdate, MarketEntry, MarketEntryAction, MarketEntryKind,
        MarketEntryUpdate,
    },
    session::Session,
    trade::Trade,
};
use itertools::Itertools;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Published price statistics of a listing, maintained from its trades.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstrumentInfo {
    pub low_price: Option<Decimal>,
    pub high_price: Option<Decimal>,
}

impl InstrumentInfo {
    fn record_trade(&mut self, price: Decimal) {
        self.low_price = Some(self.low_price.map_or(price, |low| low.min(price)));
        self.high_price = Some(self.high_price.map_or(price, |high| high.max(price)));
    }
}

/// Market-data dissemination options of the venue.
#[derive(Debug, Clone)]
pub struct MarketDataSettings {
    pub include_own_orders: bool,
    pub tns_enabled: bool,
    pub tns_qty_enabled: bool,
    pub tns_side_enabled: bool,
    pub tns_parties_enabled: bool,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            include_own_orders: true,
            tns_enabled: true,
            tns_qty_enabled: true,
            tns_side_enabled: true,
            tns_parties_enabled: false,
        }
    }
}

type Levels = Vec<(Decimal, Decimal)>;

#[derive(Debug)]
struct SubscriptionState {
    bids: Levels,
    asks: Levels,
    info: InstrumentInfo,
}

/// Disseminates snapshots and incremental updates of one listing's book to the sessions
/// currently subscribed to it.
#[derive(Debug)]
pub struct MarketDataPublisher {
    settings: MarketDataSettings,
    subscriptions: FnvIndexMap<(Session, RequestId), SubscriptionState>,
    info: InstrumentInfo,
}

impl MarketDataPublisher {
    pub fn new(settings: MarketDataSettings) -> Self {
        Self {
            settings,
            subscriptions: FnvIndexMap::default(),
            info: InstrumentInfo::default(),
        }
    }

    pub fn info(&self) -> InstrumentInfo {
        self.info
    }

    pub fn set_info(&mut self, info: InstrumentInfo) {
        self.info = info;
    }

    pub fn record_trade(&mut self, trade: &Trade) {
        self.info.record_trade(trade.price);
    }

    /// Register the session and answer with a full snapshot.
    pub fn subscribe(
        &mut self,
        session: Session,
        request_id: RequestId,
        instrument: InstrumentDescriptor,
        book: &OrderBook,
    ) -> MarketDataSnapshot {
        let (snapshot, state) =
            self.build_snapshot(session.clone(), request_id.clone(), instrument, book);
        self.subscriptions.insert((session, request_id), state);
        snapshot
    }

    /// One-shot snapshot without registering the session.
    pub fn snapshot(
        &self,
        session: Session,
        request_id: RequestId,
        instrument: InstrumentDescriptor,
        book: &OrderBook,
    ) -> MarketDataSnapshot {
        self.build_snapshot(session, request_id, instrument, book).0
    }

    /// Remove one subscription; `false` when no such subscription is registered.
    pub fn unsubscribe(&mut self, session: &Session, request_id: &RequestId) -> bool {
        self.subscriptions
            .shift_remove(&(session.clone(), request_id.clone()))
            .is_some()
    }

    /// Drop every subscription of a disconnected session.
    pub fn stop_streaming(&mut self, session: &Session) {
        self.subscriptions
            .retain(|(subscriber, _), _| subscriber != session);
    }

    /// Distinct sessions with at least one active subscription.
    pub fn sessions(&self) -> Vec<Session> {
        self.subscriptions
            .keys()
            .map(|(session, _)| session.clone())
            .unique()
            .collect()
    }

    /// Compute the incremental refresh of every subscription after a book mutation.
    ///
    /// Subscriptions whose view did not change receive nothing.
    pub fn publish(&mut self, book: &OrderBook, trades: &[Trade]) -> Vec<MarketDataUpdate> {
        let mut updates = Vec::new();

        for ((session, request_id), state) in self.subscriptions.iter_mut() {
            let exclude = excluded_session(&self.settings, session);
            let bids = side_levels(book, Side::Buy, exclude);
            let asks = side_levels(book, Side::Sell, exclude);

            let mut entries = Vec::new();
            entries.extend(diff_levels(MarketEntryKind::Bid, &state.bids, &bids));
            entries.extend(diff_levels(MarketEntryKind::Offer, &state.asks, &asks));
            entries.extend(diff_info(&state.info, &self.info));
            entries.extend(
                trades
                    .iter()
                    .filter_map(|trade| trade_entry(&self.settings, trade))
                    .map(|entry| MarketEntryUpdate {
                        action: MarketEntryAction::New,
                        entry,
                    }),
            );

            state.bids = bids;
            state.asks = asks;
            state.info = self.info;

            if !entries.is_empty() {
                updates.push(MarketDataUpdate {
                    session: session.clone(),
                    request_id: request_id.clone(),
                    entries,
                });
            }
        }

        updates
    }

    fn build_snapshot(
        &self,
        session: Session,
        request_id: RequestId,
        instrument: InstrumentDescriptor,
        book: &OrderBook,
    ) -> (MarketDataSnapshot, SubscriptionState) {
        let exclude = excluded_session(&self.settings, &session);
        let bids = side_levels(book, Side::Buy, exclude);
        let asks = side_levels(book, Side::Sell, exclude);

        let mut entries = Vec::new();
        entries.extend(
            bids.iter()
                .map(|(price, quantity)| MarketEntry::level(MarketEntryKind::Bid, *price, *quantity)),
        );
        entries.extend(
            asks.iter()
                .map(|(price, quantity)| {
                    MarketEntry::level(MarketEntryKind::Offer, *price, *quantity)
                }),
        );
        if let Some(low) = self.info.low_price {
            entries.push(price_entry(MarketEntryKind::LowPrice, low));
        }
        if let Some(high) = self.info.high_price {
            entries.push(price_entry(MarketEntryKind::HighPrice, high));
        }
        if let Some(entry) = book
            .last_trade()
            .and_then(|trade| trade_entry(&self.settings, trade))
        {
            entries.push(entry);
        }

        let snapshot = MarketDataSnapshot {
            session,
            request_id,
            instrument: Some(instrument),
            entries,
        };

        let state = SubscriptionState {
            bids,
            asks,
            info: self.info,
        };

        (snapshot, state)
    }
}

fn excluded_session<'a>(
    settings: &MarketDataSettings,
    session: &'a Session,
) -> Option<&'a Session> {
    (!settings.include_own_orders).then_some(session)
}

/// Aggregate one book side into price levels, in price priority order.
fn side_levels(book: &OrderBook, side: Side, exclude: Option<&Session>) -> Levels {
    let grouped = book
        .side(side)
        .iter()
        .filter(|order| exclude.is_none_or(|session| order.session != *session))
        .map(|order| (order.price, order.remaining_quantity))
        .chunk_by(|(price, _)| *price);

    grouped
        .into_iter()
        .map(|(price, group)| (price, group.map(|(_, quantity)| quantity).sum()))
        .collect()
}

fn diff_levels(kind: MarketEntryKind, previous: &Levels, current: &Levels) -> Vec<MarketEntryUpdate> {
    let mut updates = Vec::new();

    for (price, quantity) in current {
        match previous.iter().find(|(known, _)| known == price) {
            None => updates.push(MarketEntryUpdate {
                action: MarketEntryAction::New,
                entry: MarketEntry::level(kind, *price, *quantity),
            }),
            Some((_, known_quantity)) if known_quantity != quantity => {
                updates.push(MarketEntryUpdate {
                    action: MarketEntryAction::Change,
                    entry: MarketEntry::level(kind, *price, *quantity),
                })
            }
            Some(_) => {}
        }
    }

    for (price, _) in previous {
        if !current.iter().any(|(known, _)| known == price) {
            updates.push(MarketEntryUpdate {
                action: MarketEntryAction::Delete,
                entry: MarketEntry {
                    kind: Some(kind),
                    price: Some(*price),
                    ..Default::default()
                },
            });
        }
    }

    updates
}

fn diff_info(previous: &InstrumentInfo, current: &InstrumentInfo) -> Vec<MarketEntryUpdate> {
    let mut updates = Vec::new();

    if previous.low_price != current.low_price
        && let Some(low) = current.low_price
    {
        updates.push(MarketEntryUpdate {
            action: info_action(previous.low_price),
            entry: price_entry(MarketEntryKind::LowPrice, low),
        });
    }
    if previous.high_price != current.high_price
        && let Some(high) = current.high_price
    {
        updates.push(MarketEntryUpdate {
            action: info_action(previous.high_price),
            entry: price_entry(MarketEntryKind::HighPrice, high),
        });
    }

    updates
}

fn info_action(previous: Option<Decimal>) -> MarketEntryAction {
    if previous.is_some() {
        MarketEntryAction::Change
    } else {
        MarketEntryAction::New
    }
}

fn price_entry(kind: MarketEntryKind, price: Decimal) -> MarketEntry {
    MarketEntry {
        kind: Some(kind),
        price: Some(price),
        ..Default::default()
    }
}

fn trade_entry(settings: &MarketDataSettings, trade: &Trade) -> Option<MarketEntry> {
    if !settings.tns_enabled {
        return None;
    }

    let mut entry = MarketEntry {
        kind: Some(MarketEntryKind::Trade),
        price: Some(trade.price),
        ..Default::default()
    };
    if settings.tns_qty_enabled {
        entry.quantity = Some(trade.quantity);
    }
    if settings.tns_side_enabled {
        entry.aggressor_side = trade.aggressor_side;
    }
    if settings.tns_parties_enabled {
        entry.buyer = trade.buyer.clone();
        entry.seller = trade.seller.clone();
    }

    Some(entry)
}
