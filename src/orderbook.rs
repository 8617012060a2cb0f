use crate::{
    order::{Order, Side},
    trade::Trade,
};
use std::collections::VecDeque;
use tracing::{info, warn};

/// An [`OrderBook`] stores **active** buy and sell orders for a single
/// instrument in two price-time-priority queues.
///
/// `buys` is sorted best-first (higher price first, ties broken by lower
/// `id`); `sells` is sorted best-first (lower price first, ties broken by
/// lower `id`). A linear insertion-sort on add keeps both sides ordered at
/// all times, which is fine at the sizes this engine targets (see spec
/// §4.1's "Sorting policy").
pub struct OrderBook {
    buys: VecDeque<Order>,
    sells: VecDeque<Order>,
    next_order_id: u64,
    trades: Vec<Trade>,
}

fn buy_rank(o: &Order) -> (std::cmp::Reverse<u64>, u64) {
    (std::cmp::Reverse(o.price), o.id)
}

fn sell_rank(o: &Order) -> (u64, u64) {
    (o.price, o.id)
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            buys: VecDeque::new(),
            sells: VecDeque::new(),
            next_order_id: 1,
            trades: Vec::new(),
        }
    }

    /// Adds a limit order to the book. Does not match; call
    /// [`OrderBook::match_orders`] separately. Returns the assigned id.
    pub fn add_order(&mut self, side: Side, price: u64, quantity: u64) -> u64 {
        let id = self.next_order_id;
        self.next_order_id += 1;
        let order = Order::new(id, side, price, quantity);
        info!(id, ?side, price, quantity, "order added");
        match side {
            Side::Buy => {
                let pos = self
                    .buys
                    .iter()
                    .position(|o| buy_rank(&order) < buy_rank(o))
                    .unwrap_or(self.buys.len());
                self.buys.insert(pos, order);
            }
            Side::Sell => {
                let pos = self
                    .sells
                    .iter()
                    .position(|o| sell_rank(&order) < sell_rank(o))
                    .unwrap_or(self.sells.len());
                self.sells.insert(pos, order);
            }
        }
        id
    }

    /// Removes the first resting order (either side) whose id matches.
    /// Returns `true` if something was removed.
    pub fn cancel_order(&mut self, order_id: u64) -> bool {
        if let Some(pos) = self.buys.iter().position(|o| o.id == order_id) {
            self.buys.remove(pos);
            info!(order_id, "order cancelled");
            return true;
        }
        if let Some(pos) = self.sells.iter().position(|o| o.id == order_id) {
            self.sells.remove(pos);
            info!(order_id, "order cancelled");
            return true;
        }
        false
    }

    /// Repeatedly crosses the best buy against the best sell until either
    /// side is empty or the book no longer crosses. Returns every trade
    /// produced by this call, in execution order (the "recent trades" of
    /// spec.md, returned directly rather than drained through a cursor —
    /// see SPEC_FULL.md's resolved Open Question).
    pub fn match_orders(&mut self) -> Vec<Trade> {
        let mut produced = Vec::new();
        loop {
            let (Some(b), Some(s)) = (self.buys.front(), self.sells.front()) else {
                break;
            };
            if b.price < s.price {
                break;
            }

            let qty = b.remaining_quantity.min(s.remaining_quantity);
            let price = s.price;
            let buy_id = b.id;
            let sell_id = s.id;

            let trade = Trade {
                buy_order_id: buy_id,
                sell_order_id: sell_id,
                price,
                quantity: qty,
            };
            warn!(?trade, "trade executed");
            self.trades.push(trade.clone());
            produced.push(trade);

            let buy = self.buys.front_mut().unwrap();
            buy.remaining_quantity -= qty;
            if buy.remaining_quantity == 0 {
                self.buys.pop_front();
            }

            let sell = self.sells.front_mut().unwrap();
            sell.remaining_quantity -= qty;
            if sell.remaining_quantity == 0 {
                self.sells.pop_front();
            }
        }
        produced
    }

    pub fn best_buy(&self) -> Option<&Order> {
        self.buys.front()
    }

    pub fn best_sell(&self) -> Option<&Order> {
        self.sells.front()
    }

    pub fn buys(&self) -> impl Iterator<Item = &Order> {
        self.buys.iter()
    }

    pub fn sells(&self) -> impl Iterator<Item = &Order> {
        self.sells.iter()
    }

    /// All trades ever produced by this book, oldest first.
    pub fn trade_log(&self) -> &[Trade] {
        &self.trades
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
