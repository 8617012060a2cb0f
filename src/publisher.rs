//! Process-wide fan-out of trades to every session that didn't trigger
//! them. See spec.md §4.4 for the asymmetric-dissemination contract this
//! implements.

use crate::{protocol::format_market_trade, trade::Trade};
use std::{collections::HashMap, sync::Mutex};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// A registered session is just its outgoing-message channel. A closed
/// channel is this engine's equivalent of a weak reference that failed to
/// resolve: the session's writer task owns the receiver and drops it on
/// exit, so `send` failing IS liveness failing. Dead entries are purged
/// opportunistically on every broadcast (spec.md §5's amortised-O(1)
/// requirement).
pub struct MarketPublisher {
    sessions: Mutex<HashMap<String, UnboundedSender<String>>>,
}

impl MarketPublisher {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_session(&self, addr: String, outbox: UnboundedSender<String>) {
        self.sessions.lock().unwrap().insert(addr, outbox);
    }

    pub fn unregister_session(&self, addr: &str) {
        self.sessions.lock().unwrap().remove(addr);
    }

    /// Sends the redacted `MARKET TRADE` line to every live session except
    /// `originator`. Sessions whose channel is closed are dropped from the
    /// registry as a side effect.
    pub fn broadcast_trade(&self, trade: &Trade, originator: &str) {
        let line = format_market_trade(trade);
        let mut sessions = self.sessions.lock().unwrap();
        sessions.retain(|addr, outbox| {
            if addr == originator {
                return true;
            }
            match outbox.send(line.clone()) {
                Ok(()) => true,
                Err(_) => {
                    debug!(addr, "purging dead session from publisher registry");
                    false
                }
            }
        });
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

impl Default for MarketPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn broadcast_skips_originator_and_reaches_others() {
        let publisher = MarketPublisher::new();
        let (a_tx, mut a_rx) = mpsc::unbounded_channel();
        let (b_tx, mut b_rx) = mpsc::unbounded_channel();
        publisher.register_session("A".into(), a_tx);
        publisher.register_session("B".into(), b_tx);

        let trade = Trade {
            buy_order_id: 1,
            sell_order_id: 2,
            price: 10000,
            quantity: 5,
        };
        publisher.broadcast_trade(&trade, "A");

        assert!(a_rx.try_recv().is_err(), "originator must not self-receive");
        let msg = b_rx.try_recv().expect("non-originator should receive");
        assert_eq!(msg, "MARKET TRADE Price: 100, Quantity: 5\n\n");
    }

    #[test]
    fn dead_sessions_are_purged_on_broadcast() {
        let publisher = MarketPublisher::new();
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        publisher.register_session("dead".into(), tx);
        drop(rx);

        assert_eq!(publisher.session_count(), 1);
        let trade = Trade {
            buy_order_id: 1,
            sell_order_id: 2,
            price: 100,
            quantity: 1,
        };
        publisher.broadcast_trade(&trade, "someone-else");
        assert_eq!(publisher.session_count(), 0);
    }
}
