//! Jet Protocol Definitions
//!
//! This module defines the protocol-level vocabulary of Jet: the constant
//! names used on the wire, the matcher descriptor for fetch/get filters,
//! JSON-RPC 2.0 message builders, the handler result types, and the error
//! taxonomy.
//!
//! # Components
//!
//! - [`consts`] - Operation names, parameter keys, matcher keys, endpoints
//! - [`matcher`] - The path filter carried by `fetch` and `get` requests
//! - [`message`] - Builders and accessors for JSON-RPC 2.0 frames
//! - [`handlers`] - Result types returned by state set handlers
//! - [`error`] - [`JetError`](error::JetError) and the wire-level
//!   [`RpcError`](error::RpcError)

pub mod consts;
pub mod error;
pub mod handlers;
pub mod matcher;
pub mod message;

pub use error::{ErrorDetail, JetError, Result, RpcError};
pub use handlers::{FetchId, StateChange, Warning};
pub use matcher::Matcher;
