#![allow(dead_code)]

//! In-process fake jet daemon for integration tests.
//!
//! Speaks the framed wire protocol on a loopback TCP listener and lets
//! tests script the daemon side of a conversation message by message.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::time::timeout;

use jet_peer::{FetchHandler, PeerAsync, PeerConfig, ResponseHandler};

const WAIT: Duration = Duration::from_secs(5);

pub struct FakeDaemon {
    listener: TcpListener,
}

impl FakeDaemon {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind fake daemon");
        Self { listener }
    }

    /// Peer configuration pointing at this daemon.
    pub fn peer_config(&self) -> PeerConfig {
        let port = self
            .listener
            .local_addr()
            .expect("fake daemon has no local addr")
            .port();
        PeerConfig::tcp("127.0.0.1", port).with_name("test peer")
    }

    pub async fn accept(&self) -> DaemonConnection {
        let (stream, _addr) = timeout(WAIT, self.listener.accept())
            .await
            .expect("timed out waiting for the peer to connect")
            .expect("accept failed");
        DaemonConnection { stream }
    }
}

pub struct DaemonConnection {
    stream: TcpStream,
}

impl DaemonConnection {
    /// Read one framed message from the peer.
    pub async fn read_message(&mut self) -> Value {
        timeout(WAIT, self.read_message_inner())
            .await
            .expect("timed out waiting for a message from the peer")
    }

    async fn read_message_inner(&mut self) -> Value {
        let mut header = [0u8; 4];
        self.stream
            .read_exact(&mut header)
            .await
            .expect("failed to read frame header");
        let len = u32::from_be_bytes(header) as usize;
        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .expect("failed to read frame payload");
        serde_json::from_slice(&payload).expect("peer sent invalid JSON")
    }

    /// Send one framed message to the peer.
    pub async fn send_message(&mut self, message: &Value) {
        let payload = serde_json::to_vec(message).expect("failed to encode message");
        self.stream
            .write_all(&(payload.len() as u32).to_be_bytes())
            .await
            .expect("failed to write frame header");
        self.stream
            .write_all(&payload)
            .await
            .expect("failed to write frame payload");
    }

    /// Send a raw frame with an explicit length prefix, for protocol
    /// violation tests.
    pub async fn send_raw(&mut self, header: [u8; 4], payload: &[u8]) {
        self.stream
            .write_all(&header)
            .await
            .expect("failed to write raw header");
        self.stream
            .write_all(payload)
            .await
            .expect("failed to write raw payload");
    }

    /// Read a message and assert it is a request for `operation`.
    pub async fn expect_request(&mut self, operation: &str) -> Value {
        let message = self.read_message().await;
        assert_eq!(
            message["method"], operation,
            "expected a '{operation}' request, got: {message}"
        );
        message
    }

    /// Every fresh connection starts with the peer announcing itself.
    pub async fn expect_config(&mut self) -> Value {
        self.expect_request("config").await
    }

    /// Answer a request with a success result.
    pub async fn respond_result(&mut self, request: &Value, result: Value) {
        let id = request
            .get("id")
            .expect("cannot respond to a request without id")
            .clone();
        self.send_message(&serde_json::json!({"id": id, "result": result}))
            .await;
    }

    /// Answer a request with an error.
    pub async fn respond_error(&mut self, request: &Value, code: i64, message: &str) {
        let id = request
            .get("id")
            .expect("cannot respond to a request without id")
            .clone();
        self.send_message(&serde_json::json!({
            "id": id,
            "error": {"code": code, "message": message},
        }))
        .await;
    }
}

/// Connect a peer to the daemon and consume the `config` handshake.
pub async fn connect_peer(daemon: &FakeDaemon) -> (PeerAsync, DaemonConnection) {
    let (peer, mut conn) = tokio::join!(PeerAsync::connect(daemon.peer_config()), daemon.accept());
    let peer = peer.expect("peer failed to connect");
    conn.expect_config().await;
    (peer, conn)
}

/// A fetch callback forwarding every invocation as
/// `{"status": .., "notification": ..}` into a channel.
pub fn fetch_channel() -> (FetchHandler, UnboundedReceiver<Value>) {
    let (tx, rx) = unbounded_channel();
    let handler: FetchHandler = Arc::new(move |notification, status| {
        let _ = tx.send(json!({"status": status, "notification": notification}));
    });
    (handler, rx)
}

/// A response callback forwarding the response object into a channel.
pub fn response_channel() -> (ResponseHandler, UnboundedReceiver<Value>) {
    let (tx, rx) = unbounded_channel();
    let handler: ResponseHandler = Box::new(move |response: &Value| {
        let _ = tx.send(response.clone());
    });
    (handler, rx)
}

/// Await the next value from a callback channel, failing the test on a
/// timeout.
pub async fn next_value(rx: &mut UnboundedReceiver<Value>) -> Value {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a callback")
        .expect("callback channel closed")
}
