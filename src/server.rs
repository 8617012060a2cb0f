//! Accepts connections, owns the shared book, and coordinates shutdown.
//! See spec.md §4.3 for the lifecycle this module implements.

use crate::{errors::EngineError, orderbook::OrderBook, publisher::MarketPublisher, session};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Tracks live connections by peer address, purely for the accept-side
/// bookkeeping spec.md §4.3 describes (idempotent removal + the "Total
/// active clients" log line). This is deliberately separate from
/// [`MarketPublisher`]'s registry (spec.md §4.4's "why this exists as a
/// distinct component").
pub struct SessionRegistry {
    live: Mutex<HashSet<String>>,
}

impl SessionRegistry {
    fn new() -> Self {
        Self {
            live: Mutex::new(HashSet::new()),
        }
    }

    pub fn insert(&self, addr: String) {
        self.live.lock().unwrap().insert(addr);
    }

    /// Idempotent: returns `true` only the first time `addr` is removed.
    pub fn remove(&self, addr: &str) -> bool {
        self.live.lock().unwrap().remove(addr)
    }

    pub fn count(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EngineServer {
    port: u16,
    book: Arc<Mutex<OrderBook>>,
    publisher: Arc<MarketPublisher>,
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl EngineServer {
    pub fn new(port: u16, shutdown: CancellationToken) -> Self {
        Self {
            port,
            book: Arc::new(Mutex::new(OrderBook::new())),
            publisher: Arc::new(MarketPublisher::new()),
            registry: Arc::new(SessionRegistry::new()),
            shutdown,
        }
    }

    /// Binds the listener, prints the startup banner (spec.md §6), then
    /// accepts connections until the shutdown token fires. New
    /// connections are refused (by exiting the accept loop) once
    /// shutdown has been requested.
    pub async fn run(self) -> Result<(), EngineError> {
        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .map_err(|source| EngineError::Bind {
                port: self.port,
                source,
            })?;

        println!("=== HFT Matching Engine Server ===");
        println!("Server started on port {}", self.port);
        println!("Press Ctrl+C or type 'shutdown' to gracefully stop the server");
        println!("====================================");
        info!(port = self.port, "listening");

        tokio::spawn(watch_stdin(self.shutdown.clone()));

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let book = self.book.clone();
                            let publisher = self.publisher.clone();
                            let registry = self.registry.clone();
                            let shutdown = self.shutdown.clone();
                            tokio::spawn(async move {
                                session::run(stream, addr, book, publisher, registry, shutdown).await;
                            });
                        }
                        Err(error) => {
                            error!(%error, "accept failed");
                        }
                    }
                }
            }
        }

        info!("server stopped");
        Ok(())
    }
}

/// Reads operator commands from the server's own stdin (spec.md §6): the
/// literal line `shutdown` triggers graceful shutdown, anything else
/// non-empty is logged and ignored.
async fn watch_stdin(shutdown: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(raw)) => {
                        let trimmed = raw.trim();
                        if trimmed.eq_ignore_ascii_case("shutdown") {
                            info!("operator requested shutdown via stdin");
                            shutdown.cancel();
                            break;
                        } else if !trimmed.is_empty() {
                            warn!(command = trimmed, "unknown operator command");
                        }
                    }
                    Ok(None) => break,
                    Err(_) => break,
                }
            }
        }
    }
}
