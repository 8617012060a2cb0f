//! End-to-end tests driving the real TCP protocol against a bound
//! server, mirroring the teacher's `tests/ws_tests.rs` spawn-a-server
//! pattern but over raw line-oriented TCP instead of a WebSocket.

use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;

use clob_engine::server::EngineServer;

/// Binds on an ephemeral port, spawns the server, and returns the port
/// plus a token the test can cancel to shut it down.
async fn spawn_server() -> (u16, CancellationToken, tokio::task::JoinHandle<()>) {
    // EngineServer binds internally; reserve a free port by binding once
    // and dropping immediately, same trick used by `tests/ws_tests.rs`.
    let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let shutdown = CancellationToken::new();
    let server = EngineServer::new(port, shutdown.clone());
    let handle = tokio::spawn(async move {
        server.run().await.unwrap();
    });

    // Give the listener a moment to actually bind before clients connect.
    for _ in 0..50 {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    (port, shutdown, handle)
}

async fn connect(port: u16) -> (impl AsyncBufReadExt + Unpin, impl AsyncWriteExt + Unpin) {
    let stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    let (rd, wr) = stream.into_split();
    (BufReader::new(rd), wr)
}

/// Reads lines until a blank line is hit (the `\n\n` message boundary),
/// returning the joined text without the trailing blank line.
async fn read_message(reader: &mut (impl AsyncBufReadExt + Unpin)) -> String {
    let mut out = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        assert_ne!(n, 0, "connection closed before message boundary");
        if line == "\n" {
            break;
        }
        out.push_str(&line);
    }
    out
}

#[tokio::test]
async fn welcome_message_is_sent_on_connect() {
    let (port, shutdown, handle) = spawn_server().await;
    let (mut rd, _wr) = connect(port).await;

    let welcome = read_message(&mut rd).await;
    assert!(welcome.contains("BUY"));
    assert!(welcome.contains("SELL"));
    assert!(welcome.contains("CANCEL"));
    assert!(welcome.contains("DC"));

    shutdown.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn s7_two_session_broadcast() {
    let (port, shutdown, handle) = spawn_server().await;

    let (mut a_rd, mut a_wr) = connect(port).await;
    let _ = read_message(&mut a_rd).await; // A's welcome

    let (mut b_rd, mut b_wr) = connect(port).await;
    let _ = read_message(&mut b_rd).await; // B's welcome

    a_wr.write_all(b"BUY 100 5\n").await.unwrap();
    let a_confirm = read_message(&mut a_rd).await;
    assert_eq!(a_confirm, "CONFIRMED OrderID: 1\n");

    b_wr.write_all(b"SELL 100 5\n").await.unwrap();
    let b_confirm = read_message(&mut b_rd).await;
    assert_eq!(b_confirm, "CONFIRMED OrderID: 2\n");
    let b_trade = read_message(&mut b_rd).await;
    assert_eq!(
        b_trade,
        "TRADE BuyID: 1, SellID: 2, Price: 100, Quantity: 5\n"
    );

    let a_market = read_message(&mut a_rd).await;
    assert_eq!(a_market, "MARKET TRADE Price: 100, Quantity: 5\n");

    // A must never see a MARKET TRADE for its own triggering order; the
    // confirmation it already received was the only message for it.
    shutdown.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn invalid_input_keeps_session_open() {
    let (port, shutdown, handle) = spawn_server().await;
    let (mut rd, mut wr) = connect(port).await;
    let _ = read_message(&mut rd).await; // welcome

    wr.write_all(b"BUY -5 3\n").await.unwrap();
    let resp = read_message(&mut rd).await;
    assert_eq!(resp, "INVALID INPUT\n");

    // session still open: a valid command afterwards works
    wr.write_all(b"BUY 10 1\n").await.unwrap();
    let resp = read_message(&mut rd).await;
    assert_eq!(resp, "CONFIRMED OrderID: 1\n");

    shutdown.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn cancel_unknown_order_reports_not_found() {
    let (port, shutdown, handle) = spawn_server().await;
    let (mut rd, mut wr) = connect(port).await;
    let _ = read_message(&mut rd).await; // welcome

    wr.write_all(b"CANCEL 999\n").await.unwrap();
    let resp = read_message(&mut rd).await;
    assert_eq!(resp, "ORDER NOT FOUND: 999\n");

    shutdown.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn cancel_resting_order_then_idempotent_miss() {
    let (port, shutdown, handle) = spawn_server().await;
    let (mut rd, mut wr) = connect(port).await;
    let _ = read_message(&mut rd).await; // welcome

    wr.write_all(b"BUY 10 1\n").await.unwrap();
    let _ = read_message(&mut rd).await; // CONFIRMED OrderID: 1

    wr.write_all(b"CANCEL 1\n").await.unwrap();
    let resp = read_message(&mut rd).await;
    assert_eq!(resp, "CANCELLED OrderID: 1\n");

    wr.write_all(b"CANCEL 1\n").await.unwrap();
    let resp = read_message(&mut rd).await;
    assert_eq!(resp, "ORDER NOT FOUND: 1\n");

    shutdown.cancel();
    let _ = handle.await;
}

#[tokio::test]
async fn dc_acknowledges_then_closes() {
    let (port, shutdown, handle) = spawn_server().await;
    let (mut rd, mut wr) = connect(port).await;
    let _ = read_message(&mut rd).await; // welcome

    wr.write_all(b"DC\n").await.unwrap();
    let resp = read_message(&mut rd).await;
    assert_eq!(resp, "Disconnecting...\n");

    // Socket should close shortly after; read_line should hit EOF (n == 0).
    let mut trailer = String::new();
    let n = tokio::time::timeout(Duration::from_secs(2), rd.read_line(&mut trailer))
        .await
        .expect("timed out waiting for close")
        .unwrap();
    assert_eq!(n, 0);

    shutdown.cancel();
    let _ = handle.await;
}
