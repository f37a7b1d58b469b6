//! Jet Protocol Common Types
//!
//! This crate provides the wire-level building blocks shared by every Jet
//! component: protocol constants, the length-prefixed frame codec, the path
//! matcher descriptor, JSON-RPC 2.0 message builders, and the error taxonomy.
//!
//! # Overview
//!
//! Jet is a publish/subscribe and RPC protocol spoken over TCP or a unix
//! domain stream socket against a Jet daemon. Peers publish *states* (named,
//! mutable JSON values) and *methods* (callable endpoints), subscribe to
//! entries matching a path filter (*fetch*), and set states or call methods
//! owned by other peers.
//!
//! # Wire format
//!
//! Every message is a frame: a 4-byte big-endian unsigned payload length
//! followed by that many bytes of JSON. The payload is a JSON-RPC 2.0 object
//! or an array of such objects (a batch). Frames larger than
//! [`MAX_MESSAGE_SIZE`](consts::MAX_MESSAGE_SIZE) are rejected on both
//! directions.
//!
//! # Example
//!
//! ```
//! use jet_common::framing;
//! use jet_common::protocol::message;
//! use serde_json::json;
//!
//! let request = message::request("set", json!({"path": "lcd/brightness", "value": 7}), Some(1));
//! let frame = framing::encode_message(&request).unwrap();
//! assert_eq!(&frame[..4], &(frame.len() as u32 - 4).to_be_bytes());
//! ```

pub mod framing;
pub mod protocol;

pub use protocol::consts;
pub use protocol::error::{ErrorDetail, JetError, Result, RpcError};
pub use protocol::handlers::{FetchId, StateChange, Warning, FETCH_LOST, WARN_ADAPTED};
pub use protocol::matcher::Matcher;
