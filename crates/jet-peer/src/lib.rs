//! Jet Peer
//!
//! This crate implements a client peer for the Jet protocol: a
//! length-prefixed, JSON-RPC-2.0-based publish/subscribe and RPC protocol
//! spoken over TCP or a unix domain stream socket against a Jet daemon.
//!
//! # Overview
//!
//! A peer can
//! - publish *states* (named, mutable JSON values with an optional set
//!   handler) and *methods* (named, callable RPC endpoints),
//! - *fetch* (subscribe to) states and methods matching a path filter,
//! - *set* remote states and *call* remote methods,
//! - survive a lost daemon connection and restore its fetches on
//!   [`resume`](PeerAsync::resume).
//!
//! # Façades
//!
//! [`PeerAsync`] is the async façade: every operation exists in a
//! callback-taking flavor (`*_async`, returns after framing) and an
//! awaitable flavor that resolves with the daemon's response. All callbacks
//! run on the peer's receive task.
//!
//! [`Peer`] is the blocking façade for synchronous applications. It owns a
//! private tokio runtime and must not be used from within another runtime.
//!
//! # Example
//!
//! ```no_run
//! use jet_peer::{Matcher, PeerAsync, PeerConfig, StateChange};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> jet_peer::Result<()> {
//! let peer = PeerAsync::connect(PeerConfig::tcp("127.0.0.1", 11122).with_name("demo")).await?;
//!
//! // Publish a writable state echoing whatever is set.
//! peer.add_state(
//!     "demo/level",
//!     json!(0),
//!     None,
//!     None,
//!     Some(Arc::new(|value, _path| Ok(StateChange::changed(value.clone())))),
//! )
//! .await?;
//!
//! // Watch everything below demo/.
//! peer.add_fetch(
//!     Matcher::prefix("demo/"),
//!     Arc::new(|notification, _status| println!("{notification}")),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod dispatcher;
mod peer;
mod registry;
mod requests;
mod stream;
mod sync;

pub use config::PeerConfig;
pub use peer::{Access, PeerAsync};
pub use stream::Endpoint;
pub use sync::Peer;

pub use jet_common::{
    consts, ErrorDetail, FetchId, JetError, Matcher, Result, RpcError, StateChange, Warning,
    FETCH_LOST, WARN_ADAPTED,
};
pub use jet_common::protocol::handlers::{FetchHandler, MethodHandler, ResponseHandler, StateHandler};
