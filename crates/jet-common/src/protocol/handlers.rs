//! Result types returned by state set handlers and callback signatures used
//! by the peer façade.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::error::RpcError;

/// Identifier of a live fetch, unique within one peer. Carried on the wire
/// as the JSON-RPC `method` field of inbound notifications for that fetch.
pub type FetchId = u64;

/// `status` value passed to a fetch callback when the connection to the
/// daemon was lost. The fetch stops delivering until the peer resumes.
pub const FETCH_LOST: i32 = -1;

/// Warning code: the request succeeded but the value got adapted.
pub const WARN_ADAPTED: i32 = 1;

/// Warning carried inside a successful set response.
///
/// A set that succeeds with a warning means the daemon or the owning peer
/// coerced the requested value, e.g. clamped it into a valid range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    /// The mandatory code, [`WARN_ADAPTED`] being the only one defined.
    pub code: i32,
    /// Optional describing text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Warning {
    /// The request succeeded but the value got adapted.
    pub fn adapted() -> Self {
        Self {
            code: WARN_ADAPTED,
            message: None,
        }
    }

    /// Adapted, with a describing text.
    pub fn adapted_with(message: impl Into<String>) -> Self {
        Self {
            code: WARN_ADAPTED,
            message: Some(message.into()),
        }
    }
}

/// Outcome of a successful state set handler invocation.
///
/// `value` is the value to publish as a `change` notification; `None` means
/// the state did not change and no notification is emitted. Either way a
/// success response is returned to the setter, carrying `warning` when set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateChange {
    /// New value of the state, `None` when unchanged.
    pub value: Option<Value>,
    /// Warning reported back to the setter.
    pub warning: Option<Warning>,
}

impl StateChange {
    /// The handler accepted the request but the state keeps its value; no
    /// `change` notification is emitted.
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// The state takes `value`; a `change` notification is emitted before
    /// the response.
    pub fn changed(value: Value) -> Self {
        Self {
            value: Some(value),
            warning: None,
        }
    }

    /// The state takes `value`, which differs from what the setter asked
    /// for; the response carries an adapted warning.
    pub fn adapted(value: Value) -> Self {
        Self {
            value: Some(value),
            warning: Some(Warning::adapted()),
        }
    }

    /// Attach a warning to this outcome.
    pub fn with_warning(mut self, warning: Warning) -> Self {
        self.warning = Some(warning);
        self
    }
}

/// Callback invoked when another peer sets a state owned by this peer.
///
/// Receives the requested value and the path of the state. Returning an
/// [`RpcError`] sends its exact JSON form back as the response.
pub type StateHandler =
    Arc<dyn Fn(&Value, &str) -> std::result::Result<StateChange, RpcError> + Send + Sync>;

/// Callback invoked when another peer calls a method owned by this peer.
///
/// Receives the request parameters; the returned value becomes the `result`
/// member of the response.
pub type MethodHandler =
    Arc<dyn Fn(&Value) -> std::result::Result<Value, RpcError> + Send + Sync>;

/// Callback invoked for every notification matching a fetch.
///
/// `notification` carries `path`, `event` (`add`/`change`/`remove`) and
/// `value`; `status` is `0` for regular notifications and [`FETCH_LOST`]
/// exactly once when the connection to the daemon is lost.
pub type FetchHandler = Arc<dyn Fn(&Value, i32) + Send + Sync>;

/// One-shot callback receiving the response object of a request, either
/// `{id, result}` or `{id, error}`. Invoked exactly once, with a synthetic
/// canceled error if the peer shuts down first.
pub type ResponseHandler = Box<dyn FnOnce(&Value) + Send>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_change_constructors() {
        assert_eq!(StateChange::unchanged(), StateChange::default());

        let changed = StateChange::changed(json!(5));
        assert_eq!(changed.value, Some(json!(5)));
        assert!(changed.warning.is_none());

        let adapted = StateChange::adapted(json!(5));
        assert_eq!(adapted.warning, Some(Warning::adapted()));
    }

    #[test]
    fn test_warning_serialization() {
        let warning = Warning::adapted();
        let serialized = serde_json::to_value(&warning).unwrap();
        assert_eq!(serialized, json!({"code": 1}));

        let warning = Warning::adapted_with("value clamped to 10");
        let serialized = serde_json::to_value(&warning).unwrap();
        assert_eq!(serialized, json!({"code": 1, "message": "value clamped to 10"}));
    }

    #[test]
    fn test_with_warning() {
        let outcome = StateChange::changed(json!(3)).with_warning(Warning::adapted_with("rounded"));
        assert_eq!(outcome.warning.unwrap().message.unwrap(), "rounded");
    }
}
