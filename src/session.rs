//! Per-connection dispatch: parses command lines, drives the shared
//! order book, and formats responses. See spec.md §4.2 for the state
//! machine this module implements.

use crate::{
    errors::ProtocolError,
    order::Side,
    orderbook::OrderBook,
    protocol::{
        self, format_cancelled, format_confirmed, format_disconnecting, format_invalid,
        format_not_found, Command,
    },
    publisher::MarketPublisher,
    server::SessionRegistry,
};
use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Guards `handle_disconnect` against double-invocation: it is reachable
/// both from the reader loop (EOF / shutdown / DC) and from the writer
/// task (write failure) for the same connection.
fn handle_disconnect(
    addr: &str,
    registry: &SessionRegistry,
    publisher: &MarketPublisher,
    disconnect_handled: &AtomicBool,
) {
    if disconnect_handled
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        return;
    }
    publisher.unregister_session(addr);
    let removed = registry.remove(addr);
    if removed {
        info!(addr, active = registry.count(), "session disconnected");
    }
}

/// Runs one client connection to completion: registers with the
/// publisher, emits the welcome banner, then dispatches command lines
/// until disconnect, `DC`, or server shutdown.
pub async fn run(
    stream: TcpStream,
    addr: SocketAddr,
    book: Arc<Mutex<OrderBook>>,
    publisher: Arc<MarketPublisher>,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
) {
    let key = addr.to_string();
    let (rd, mut wr) = tokio::io::split(stream);
    let (outbox, mut inbox) = mpsc::unbounded_channel::<String>();
    let disconnect_handled = Arc::new(AtomicBool::new(false));

    publisher.register_session(key.clone(), outbox.clone());
    registry.insert(key.clone());
    info!(addr = %key, active = registry.count(), "session connected");

    // The write queue of spec.md §4.2: a single consumer draining this
    // channel guarantees FIFO delivery without a separate
    // `writing_in_progress` flag.
    let writer_key = key.clone();
    let writer_registry = registry.clone();
    let writer_publisher = publisher.clone();
    let writer_disconnect = disconnect_handled.clone();
    let writer_task = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            if let Err(error) = wr.write_all(message.as_bytes()).await {
                warn!(addr = %writer_key, %error, "write failed");
                handle_disconnect(
                    &writer_key,
                    &writer_registry,
                    &writer_publisher,
                    &writer_disconnect,
                );
                break;
            }
        }
    });

    let _ = outbox.send(protocol::WELCOME_MESSAGE.to_string());

    let mut lines = BufReader::new(rd).lines();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(raw)) => {
                        match protocol::parse_command(&raw) {
                            Ok(Command::Dc) => {
                                let _ = outbox.send(format_disconnecting());
                                // Give the writer task a chance to flush the
                                // acknowledgement before we tear the
                                // connection down.
                                tokio::time::sleep(Duration::from_millis(100)).await;
                                break;
                            }
                            Ok(cmd) => {
                                let response = dispatch(cmd, &book, &publisher, &key);
                                let _ = outbox.send(response);
                            }
                            Err(reason) => {
                                log_rejected(&key, &raw, &reason);
                                let _ = outbox.send(format_invalid());
                            }
                        }
                    }
                    Ok(None) => break,  // clean EOF
                    Err(_) => break,    // transport error
                }
            }
        }
    }

    drop(outbox);
    handle_disconnect(&key, &registry, &publisher, &disconnect_handled);
    let _ = writer_task.await;
}

fn log_rejected(addr: &str, raw: &str, reason: &ProtocolError) {
    warn!(addr, line = raw, %reason, "rejected: invalid input");
}

/// Applies one already-validated [`Command`] against the shared book and
/// returns this session's private response. Trades produced by a match
/// are broadcast to every other live session before this call returns,
/// which is what guarantees a private `CONFIRMED`/`TRADE` response and
/// the corresponding public `MARKET TRADE` broadcasts describe the same
/// book state (spec.md §5).
fn dispatch(
    cmd: Command,
    book: &Mutex<OrderBook>,
    publisher: &MarketPublisher,
    originator: &str,
) -> String {
    match cmd {
        Command::Buy { price, quantity } => {
            let (order_id, trades) = {
                let mut book = book.lock().unwrap();
                let order_id = book.add_order(Side::Buy, price, quantity);
                let trades = book.match_orders();
                (order_id, trades)
            };
            for trade in &trades {
                publisher.broadcast_trade(trade, originator);
            }
            format_confirmed(order_id, &trades)
        }
        Command::Sell { price, quantity } => {
            let (order_id, trades) = {
                let mut book = book.lock().unwrap();
                let order_id = book.add_order(Side::Sell, price, quantity);
                let trades = book.match_orders();
                (order_id, trades)
            };
            for trade in &trades {
                publisher.broadcast_trade(trade, originator);
            }
            format_confirmed(order_id, &trades)
        }
        Command::Cancel { order_id } => {
            let found = book.lock().unwrap().cancel_order(order_id);
            if found {
                format_cancelled(order_id)
            } else {
                format_not_found(order_id)
            }
        }
        Command::Dc => unreachable!("DC is handled by the caller before dispatch"),
    }
}
