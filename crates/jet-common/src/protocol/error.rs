//! Error taxonomy of the peer library.
//!
//! Two layers exist. [`RpcError`] is the wire-level JSON-RPC error object
//! `{code, message, data?}` as produced by the daemon or by a local handler.
//! [`JetError`] is the library error enum covering everything a façade call
//! can fail with: transport problems, framing bounds, cancellation, and RPC
//! errors delivered in a response.
//!
//! # Error Codes
//!
//! Standard JSON-RPC 2.0 error codes used by jet:
//! - `-32603`: Internal error (also used for handler failures)
//! - `-1`: Locally generated errors (cancellation, send failures,
//!   parameter checks in method handlers)

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::protocol::consts;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;
/// Code of errors generated locally by the peer library.
pub const LOCAL_ERROR: i32 = -1;

/// Message of the synthetic response delivered to every request that was
/// still pending when the peer shut down.
pub const CANCELED_MESSAGE: &str = "jet request has been canceled without response!";

/// Per-field error detail carried in the `data` object of an [`RpcError`].
///
/// Complex state validators use this to report which fields of a requested
/// value failed and why.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Error code for this field
    pub code: i32,
    /// Optional describing text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// JSON-RPC 2.0 error object.
///
/// Per the JSON-RPC 2.0 spec, an error object must have:
/// - `code`: Integer error code
/// - `message`: Short description of the error
/// - `data`: Additional data (optional)
///
/// A handler returning an `RpcError` has its exact JSON form sent back as
/// the response, including `data` when present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Error)]
#[error("jet rpc error {code}: {message}")]
pub struct RpcError {
    /// Error code (standard codes are negative integers)
    pub code: i32,
    /// Short description of the error
    pub message: String,
    /// Additional data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error with the given code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create an internal error (-32603).
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    /// The synthetic error delivered to requests that were still pending
    /// when the peer shut down.
    pub fn canceled() -> Self {
        Self::new(LOCAL_ERROR, CANCELED_MESSAGE)
    }

    /// Convenience error for method handlers called with an unsuitable
    /// number of parameters.
    pub fn wrong_parameter_count() -> Self {
        Self::new(LOCAL_ERROR, "wrong number of parameters for method")
    }

    /// Convenience error for method handlers missing an expected parameter.
    pub fn missing_parameter(name: &str) -> Self {
        Self::new(LOCAL_ERROR, format!("missing parameter '{name}' for method"))
    }

    /// Attach an arbitrary `data` value.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach per-field details as the `data` object.
    ///
    /// # Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use jet_common::{ErrorDetail, RpcError};
    ///
    /// let mut details = HashMap::new();
    /// details.insert(
    ///     "frequency".to_string(),
    ///     ErrorDetail { code: -1, message: Some("out of range".into()) },
    /// );
    /// let error = RpcError::new(-32602, "invalid parameters").with_details(details);
    /// assert!(error.data.is_some());
    /// ```
    pub fn with_details(mut self, details: HashMap<String, ErrorDetail>) -> Self {
        self.data = Some(serde_json::to_value(details).unwrap_or(Value::Null));
        self
    }

    /// Decode the `data` object back into per-field details, if it has that
    /// shape.
    pub fn details(&self) -> Option<HashMap<String, ErrorDetail>> {
        self.data
            .as_ref()
            .and_then(|data| serde_json::from_value(data.clone()).ok())
    }

    /// Parse the `error` member of a response object.
    ///
    /// Returns `None` when the response carries no error or the error object
    /// is malformed.
    pub fn from_response(response: &Value) -> Option<Self> {
        let error = response.get(consts::ERROR)?;
        serde_json::from_value(error.clone()).ok()
    }

    /// The JSON form of this error as it appears inside a response frame.
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            consts::CODE: self.code,
            consts::MESSAGE: self.message,
        });
        if let Some(data) = &self.data {
            error[consts::DATA] = data.clone();
        }
        error
    }
}

/// Library error enum.
///
/// Transport-level failures, framing violations, and RPC errors delivered in
/// a response all surface through this type. A blocking façade call that the
/// daemon rejects returns [`JetError::Rpc`] carrying the daemon's exact
/// error object.
#[derive(Error, Debug)]
pub enum JetError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// An outbound payload exceeded [`consts::MAX_MESSAGE_SIZE`]. Nothing
    /// was written to the stream.
    #[error("message size {size} exceeds maximum message size ({max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("could not send message: {0}")]
    Send(String),

    /// The peer shut down before the response arrived.
    #[error("jet request has been canceled without response!")]
    Canceled,

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl JetError {
    /// Flatten this error into the wire-level error object used for
    /// synthetic responses.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            JetError::Rpc(e) => e.clone(),
            JetError::Canceled => RpcError::canceled(),
            other => RpcError::new(LOCAL_ERROR, other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, JetError>;
