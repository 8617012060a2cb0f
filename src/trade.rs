//! A completed execution between two resting orders.

/// A trade represents a matched transaction between two orders.
///
/// - `price` comes from the resting sell order (the maker).
/// - `quantity` is the amount filled.
/// - `buy_order_id`/`sell_order_id` identify the two crossed orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub buy_order_id: u64,
    pub sell_order_id: u64,
    pub price: u64,
    pub quantity: u64,
}
