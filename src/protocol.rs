//! The wire grammar: parsing client command lines and formatting
//! responses. See spec.md §4.2 for the exact grammar this module
//! implements.

use crate::{errors::ProtocolError, trade::Trade};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Buy { price: u64, quantity: u64 },
    Sell { price: u64, quantity: u64 },
    Cancel { order_id: u64 },
    Dc,
}

/// Parses a price token into integer ticks at a fixed 2-decimal scale
/// (e.g. `"100"` -> `10000`, `"100.5"` -> `10050`), avoiding binary
/// floating point in the matching path per spec.md §9.
fn parse_ticks(raw: &str) -> Result<u64, ProtocolError> {
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::NotANumber(raw.to_string()));
    }
    if frac.len() > 2 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::NotANumber(raw.to_string()));
    }
    let whole_ticks: u64 = whole
        .parse::<u64>()
        .map_err(|_| ProtocolError::NotANumber(raw.to_string()))?
        .checked_mul(100)
        .ok_or_else(|| ProtocolError::NotANumber(raw.to_string()))?;
    let frac_ticks: u64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<u64>().unwrap() * 10,
        _ => frac.parse::<u64>().unwrap(),
    };
    Ok(whole_ticks + frac_ticks)
}

fn parse_u64(raw: &str) -> Result<u64, ProtocolError> {
    raw.parse::<u64>()
        .map_err(|_| ProtocolError::NotANumber(raw.to_string()))
}

/// Formats integer ticks back into a decimal string, dropping the
/// fractional part when it's zero (`10000` -> `"100"`, `10050` -> `"100.50"`).
pub fn format_price(ticks: u64) -> String {
    if ticks % 100 == 0 {
        format!("{}", ticks / 100)
    } else {
        format!("{}.{:02}", ticks / 100, ticks % 100)
    }
}

/// Parses one client command line (already stripped of its trailing `\n`).
pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let mut tokens = line.trim().split_whitespace();
    let verb = tokens.next().ok_or(ProtocolError::EmptyLine)?;
    match verb.to_ascii_uppercase().as_str() {
        "BUY" | "SELL" => {
            let price_tok = tokens.next().ok_or(ProtocolError::MissingArgument)?;
            let qty_tok = tokens.next().ok_or(ProtocolError::MissingArgument)?;
            if tokens.next().is_some() {
                return Err(ProtocolError::TooManyArguments);
            }
            let price = parse_ticks(price_tok)?;
            let quantity = parse_u64(qty_tok)?;
            if price == 0 {
                return Err(ProtocolError::NonPositivePrice);
            }
            if quantity == 0 {
                return Err(ProtocolError::NonPositiveQuantity);
            }
            Ok(if verb.eq_ignore_ascii_case("buy") {
                Command::Buy { price, quantity }
            } else {
                Command::Sell { price, quantity }
            })
        }
        "CANCEL" => {
            let id_tok = tokens.next().ok_or(ProtocolError::MissingArgument)?;
            if tokens.next().is_some() {
                return Err(ProtocolError::TooManyArguments);
            }
            let order_id = parse_u64(id_tok)?;
            if order_id == 0 {
                return Err(ProtocolError::NonPositiveOrderId);
            }
            Ok(Command::Cancel { order_id })
        }
        "DC" => {
            if tokens.next().is_some() {
                return Err(ProtocolError::TooManyArguments);
            }
            Ok(Command::Dc)
        }
        other => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

pub const WELCOME_MESSAGE: &str = concat!(
    "=== Welcome to the matching engine ===\n",
    "Commands:\n",
    "  BUY <price> <qty>     e.g. BUY 100.50 10\n",
    "  SELL <price> <qty>    e.g. SELL 101 5\n",
    "  CANCEL <order_id>     e.g. CANCEL 3\n",
    "  DC                    disconnect\n",
    "\n",
);

/// One detailed `TRADE` fragment for the originating session's own response.
pub fn format_trade_detail(trade: &Trade) -> String {
    format!(
        "TRADE BuyID: {}, SellID: {}, Price: {}, Quantity: {}\n\n",
        trade.buy_order_id,
        trade.sell_order_id,
        format_price(trade.price),
        trade.quantity
    )
}

/// The redacted line every *other* session sees for a trade: no order ids.
pub fn format_market_trade(trade: &Trade) -> String {
    format!(
        "MARKET TRADE Price: {}, Quantity: {}\n\n",
        format_price(trade.price),
        trade.quantity
    )
}

pub fn format_confirmed(order_id: u64, trades: &[Trade]) -> String {
    let mut out = format!("CONFIRMED OrderID: {order_id}\n\n");
    for trade in trades {
        out.push_str(&format_trade_detail(trade));
    }
    out
}

pub fn format_cancelled(order_id: u64) -> String {
    format!("CANCELLED OrderID: {order_id}\n\n")
}

pub fn format_not_found(order_id: u64) -> String {
    format!("ORDER NOT FOUND: {order_id}\n\n")
}

pub fn format_invalid() -> String {
    "INVALID INPUT\n\n".to_string()
}

pub fn format_disconnecting() -> String {
    "Disconnecting...\n\n".to_string()
}
