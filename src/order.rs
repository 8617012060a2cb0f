//! Resting-order value type.

/// Which side of the book an [`Order`] rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A resting limit order.
///
/// Immutable except for `remaining_quantity`, which only ever decreases
/// as trades consume it.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: u64,
    pub side: Side,
    pub price: u64,
    pub remaining_quantity: u64,
}

impl Order {
    pub fn new(id: u64, side: Side, price: u64, quantity: u64) -> Self {
        Self {
            id,
            side,
            price,
            remaining_quantity: quantity,
        }
    }
}
