use bourse_instrument::{Side, descriptor::Party};
use bourse_protocol::{
    order::{ClientOrderId, OrderId, TimeInForce},
    session::Session,
    trade::Trade,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An order resting on one side of the book.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LimitOrder {
    pub order_id: OrderId,
    pub client_order_id: Option<ClientOrderId>,
    pub session: Session,
    pub parties: Vec<Party>,
    pub side: Side,
    pub price: Decimal,
    pub remaining_quantity: Decimal,
    pub time_in_force: TimeInForce,
}

/// One execution against a resting order.
#[derive(Debug, Clone)]
pub struct Fill {
    /// The resting order after the fill was applied.
    pub maker: LimitOrder,
    pub price: Decimal,
    pub quantity: Decimal,
    /// The resting order was fully filled and removed from the book.
    pub maker_removed: bool,
}

/// Both sides of an auction uncross execution.
#[derive(Debug, Clone)]
pub struct UncrossFill {
    pub bid: LimitOrder,
    pub ask: LimitOrder,
    pub price: Decimal,
    pub quantity: Decimal,
    pub bid_removed: bool,
    pub ask_removed: bool,
}

/// Price-time priority limit order book of a single listing.
///
/// Each side is kept in priority order: bids by descending price, asks by ascending
/// price, arrival order within a price level.
#[derive(Debug, Default)]
pub struct OrderBook {
    bids: Vec<LimitOrder>,
    asks: Vec<LimitOrder>,
    last_trade: Option<Trade>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a book from persisted resting orders.
    ///
    /// A stable sort restores the price ordering while preserving the stored arrival
    /// order within each price level.
    pub fn restore(
        mut bids: Vec<LimitOrder>,
        mut asks: Vec<LimitOrder>,
        last_trade: Option<Trade>,
    ) -> Self {
        bids.sort_by(|a, b| b.price.cmp(&a.price));
        asks.sort_by(|a, b| a.price.cmp(&b.price));
        Self {
            bids,
            asks,
            last_trade,
        }
    }

    pub fn side(&self, side: Side) -> &[LimitOrder] {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut Vec<LimitOrder> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Best (highest bid / lowest ask) resting order on a side.
    pub fn best(&self, side: Side) -> Option<&LimitOrder> {
        self.side(side).first()
    }

    pub fn last_trade(&self) -> Option<&Trade> {
        self.last_trade.as_ref()
    }

    pub fn set_last_trade(&mut self, trade: Trade) {
        self.last_trade = Some(trade);
    }

    /// Queue a resting order behind every existing order of equal or better price.
    pub fn insert(&mut self, order: LimitOrder) {
        let side = order.side;
        let position = match side {
            Side::Buy => self
                .bids
                .iter()
                .position(|resting| resting.price < order.price),
            Side::Sell => self
                .asks
                .iter()
                .position(|resting| resting.price > order.price),
        };

        let orders = self.side_mut(side);
        match position {
            Some(index) => orders.insert(index, order),
            None => orders.push(order),
        }
    }

    pub fn find(
        &self,
        side: Side,
        client_order_id: &ClientOrderId,
        session: &Session,
    ) -> Option<&LimitOrder> {
        self.side(side).iter().find(|order| {
            order.client_order_id.as_ref() == Some(client_order_id) && order.session == *session
        })
    }

    pub fn remove(
        &mut self,
        side: Side,
        client_order_id: &ClientOrderId,
        session: &Session,
    ) -> Option<LimitOrder> {
        let orders = self.side_mut(side);
        let index = orders.iter().position(|order| {
            order.client_order_id.as_ref() == Some(client_order_id) && order.session == *session
        })?;
        Some(orders.remove(index))
    }

    /// Remove every resting order owned by a session, in book priority order.
    pub fn remove_session_orders(&mut self, session: &Session) -> Vec<LimitOrder> {
        let mut removed = Vec::new();
        for side in [Side::Buy, Side::Sell] {
            let orders = self.side_mut(side);
            let mut index = 0;
            while index < orders.len() {
                if orders[index].session == *session {
                    removed.push(orders.remove(index));
                } else {
                    index += 1;
                }
            }
        }
        removed
    }

    /// Remove every resting order whose time in force expires with the trading day.
    pub fn expire_day_orders(&mut self) -> Vec<LimitOrder> {
        let mut expired = Vec::new();
        for side in [Side::Buy, Side::Sell] {
            let orders = self.side_mut(side);
            let mut index = 0;
            while index < orders.len() {
                if orders[index].time_in_force == TimeInForce::Day {
                    expired.push(orders.remove(index));
                } else {
                    index += 1;
                }
            }
        }
        expired
    }

    /// Total opposite-side quantity an incoming order could execute against within its
    /// limit price.
    pub fn available_quantity(&self, side: Side, limit_price: Option<Decimal>) -> Decimal {
        self.side(side.opposite())
            .iter()
            .filter(|resting| crosses(side, limit_price, resting.price))
            .map(|resting| resting.remaining_quantity)
            .sum()
    }

    /// Execute an incoming order against the opposite side, best price first.
    ///
    /// Trades print at the resting price. Returns the fills in execution order; the
    /// leftover quantity is `quantity` minus the filled quantity.
    pub fn match_incoming(
        &mut self,
        side: Side,
        limit_price: Option<Decimal>,
        quantity: Decimal,
    ) -> Vec<Fill> {
        let mut fills = Vec::new();
        let mut leaves = quantity;

        while leaves > Decimal::ZERO {
            let orders = self.side_mut(side.opposite());
            let Some(best) = orders.first_mut() else {
                break;
            };
            if !crosses(side, limit_price, best.price) {
                break;
            }

            let fill_quantity = leaves.min(best.remaining_quantity);
            best.remaining_quantity -= fill_quantity;
            leaves -= fill_quantity;

            let maker_removed = best.remaining_quantity == Decimal::ZERO;
            let price = best.price;
            let maker = best.clone();
            if maker_removed {
                orders.remove(0);
            }

            fills.push(Fill {
                maker,
                price,
                quantity: fill_quantity,
                maker_removed,
            });
        }

        fills
    }

    /// Whether the best bid and ask overlap.
    pub fn is_crossed(&self) -> bool {
        match (self.bids.first(), self.asks.first()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Match overlapping resting orders against each other after an auction.
    ///
    /// Executions print at the resting offer price.
    pub fn uncross(&mut self) -> Vec<UncrossFill> {
        let mut fills = Vec::new();

        while self.is_crossed() {
            let quantity = {
                let bid = &self.bids[0];
                let ask = &self.asks[0];
                bid.remaining_quantity.min(ask.remaining_quantity)
            };
            let price = self.asks[0].price;

            self.bids[0].remaining_quantity -= quantity;
            self.asks[0].remaining_quantity -= quantity;

            let bid_removed = self.bids[0].remaining_quantity == Decimal::ZERO;
            let ask_removed = self.asks[0].remaining_quantity == Decimal::ZERO;

            let bid = self.bids[0].clone();
            let ask = self.asks[0].clone();
            if bid_removed {
                self.bids.remove(0);
            }
            if ask_removed {
                self.asks.remove(0);
            }

            fills.push(UncrossFill {
                bid,
                ask,
                price,
                quantity,
                bid_removed,
                ask_removed,
            });
        }

        fills
    }
}

fn crosses(side: Side, limit_price: Option<Decimal>, resting_price: Decimal) -> bool {
    match (side, limit_price) {
        (_, None) => true,
        (Side::Buy, Some(limit)) => resting_price <= limit,
        (Side::Sell, Some(limit)) => resting_price >= limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(side: Side, price: Decimal, quantity: Decimal, id: &str) -> LimitOrder {
        LimitOrder {
            order_id: OrderId::new(id),
            client_order_id: Some(ClientOrderId::new(id)),
            session: Session::Generator,
            parties: vec![],
            side,
            price,
            remaining_quantity: quantity,
            time_in_force: TimeInForce::GoodTillCancel,
        }
    }

    #[test]
    fn test_insert_keeps_price_time_priority() {
        let mut book = OrderBook::new();
        book.insert(order(Side::Buy, dec!(100), dec!(10), "b1"));
        book.insert(order(Side::Buy, dec!(101), dec!(10), "b2"));
        book.insert(order(Side::Buy, dec!(100), dec!(10), "b3"));

        let ids: Vec<_> = book
            .side(Side::Buy)
            .iter()
            .map(|o| o.order_id.0.as_str().to_owned())
            .collect();
        assert_eq!(ids, vec!["b2", "b1", "b3"]);

        book.insert(order(Side::Sell, dec!(103), dec!(10), "a1"));
        book.insert(order(Side::Sell, dec!(102), dec!(10), "a2"));
        assert_eq!(book.best(Side::Sell).unwrap().price, dec!(102));
    }

    #[test]
    fn test_match_incoming_walks_best_prices_first() {
        let mut book = OrderBook::new();
        book.insert(order(Side::Sell, dec!(101), dec!(5), "a1"));
        book.insert(order(Side::Sell, dec!(100), dec!(5), "a2"));

        let fills = book.match_incoming(Side::Buy, Some(dec!(101)), dec!(8));

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, dec!(100));
        assert_eq!(fills[0].quantity, dec!(5));
        assert!(fills[0].maker_removed);
        assert_eq!(fills[1].price, dec!(101));
        assert_eq!(fills[1].quantity, dec!(3));
        assert!(!fills[1].maker_removed);

        assert_eq!(book.best(Side::Sell).unwrap().remaining_quantity, dec!(2));
    }

    #[test]
    fn test_match_incoming_respects_limit_price() {
        let mut book = OrderBook::new();
        book.insert(order(Side::Sell, dec!(105), dec!(5), "a1"));

        let fills = book.match_incoming(Side::Buy, Some(dec!(104)), dec!(5));
        assert!(fills.is_empty());
        assert_eq!(book.side(Side::Sell).len(), 1);
    }

    #[test]
    fn test_market_order_matches_any_price() {
        let mut book = OrderBook::new();
        book.insert(order(Side::Buy, dec!(99), dec!(5), "b1"));
        let fills = book.match_incoming(Side::Sell, None, dec!(2));

        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].price, dec!(99));
    }

    #[test]
    fn test_available_quantity_within_limit() {
        let mut book = OrderBook::new();
        book.insert(order(Side::Sell, dec!(100), dec!(5), "a1"));
        book.insert(order(Side::Sell, dec!(102), dec!(5), "a2"));

        assert_eq!(book.available_quantity(Side::Buy, Some(dec!(101))), dec!(5));
        assert_eq!(book.available_quantity(Side::Buy, None), dec!(10));
    }

    #[test]
    fn test_uncross_prints_at_offer_price() {
        let mut book = OrderBook::new();
        book.insert(order(Side::Buy, dec!(102), dec!(10), "b1"));
        book.insert(order(Side::Sell, dec!(100), dec!(4), "a1"));
        book.insert(order(Side::Sell, dec!(101), dec!(10), "a2"));

        let fills = book.uncross();

        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].price, dec!(100));
        assert_eq!(fills[0].quantity, dec!(4));
        assert_eq!(fills[1].price, dec!(101));
        assert_eq!(fills[1].quantity, dec!(6));
        assert!(!book.is_crossed());
        assert_eq!(book.best(Side::Sell).unwrap().remaining_quantity, dec!(4));
    }

    #[test]
    fn test_remove_session_orders() {
        let fix = Session::Fix(bourse_protocol::session::FixSession::fix44("CLIENT", "VENUE"));

        let mut book = OrderBook::new();
        book.insert(LimitOrder {
            session: fix.clone(),
            ..order(Side::Buy, dec!(100), dec!(5), "b1")
        });
        book.insert(order(Side::Buy, dec!(100), dec!(5), "b2"));

        let removed = book.remove_session_orders(&fix);
        assert_eq!(removed.len(), 1);
        assert_eq!(book.side(Side::Buy).len(), 1);
    }

    #[test]
    fn test_expire_day_orders() {
        let mut book = OrderBook::new();
        book.insert(LimitOrder {
            time_in_force: TimeInForce::Day,
            ..order(Side::Buy, dec!(100), dec!(5), "b1")
        });
        book.insert(order(Side::Sell, dec!(105), dec!(5), "a1"));

        let expired = book.expire_day_orders();
        assert_eq!(expired.len(), 1);
        assert_eq!(book.side(Side::Buy).len(), 0);
        assert_eq!(book.side(Side::Sell).len(), 1);
    }

    #[test]
    fn test_restore_reorders_sides() {
        let bids = vec![
            order(Side::Buy, dec!(99), dec!(5), "b1"),
            order(Side::Buy, dec!(101), dec!(5), "b2"),
        ];
        let asks = vec![
            order(Side::Sell, dec!(105), dec!(5), "a1"),
            order(Side::Sell, dec!(103), dec!(5), "a2"),
        ];

        let book = OrderBook::restore(bids, asks, None);

        assert_eq!(book.best(Side::Buy).unwrap().price, dec!(101));
        assert_eq!(book.best(Side::Sell).unwrap().price, dec!(103));
    }
}
