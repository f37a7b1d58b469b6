//! Inbound message dispatch.
//!
//! Every parsed frame lands here. The type of the `method` member decides
//! what an inbound message is:
//!
//! | `method` | meaning |
//! |---|---|
//! | absent or null | response to a request of ours |
//! | integer | notification for one of our fetches |
//! | string | another peer sets one of our states or calls one of our methods |
//!
//! A top-level array is a batch and is processed element by element in
//! order. Handler outcomes are answered with a response frame when the
//! inbound request carried an id; handler failures never take the
//! connection down.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use jet_common::protocol::handlers::{MethodHandler, StateHandler};
use jet_common::protocol::message;
use jet_common::{consts, FetchId, RpcError};

use crate::peer::PeerInner;

impl PeerInner {
    /// Process one frame payload: a single message or a batch.
    pub(crate) async fn process_payload(self: &Arc<Self>, payload: Value) {
        match payload {
            Value::Array(batch) => {
                for element in batch {
                    self.handle_message(element).await;
                }
            }
            element @ Value::Object(_) => self.handle_message(element).await,
            other => {
                error!("jet messages are to be a json object or an array of json objects, got: {other}")
            }
        }
    }

    async fn handle_message(self: &Arc<Self>, message: Value) {
        match message.get(consts::METHOD) {
            None | Some(Value::Null) => self.requests.resolve_response(&message),
            Some(Value::Number(number)) => match number.as_u64() {
                Some(fetch_id) => self.handle_fetch_notification(fetch_id, &message),
                None => warn!("dropping notification with non-integral fetch id: {number}"),
            },
            Some(Value::String(path)) => {
                let path = path.clone();
                if let Some(handler) = self.registry.state_entry(&path) {
                    self.handle_state_set(&path, handler, &message).await;
                } else if let Some(handler) = self.registry.method_entry(&path) {
                    self.handle_method_call(&path, handler, &message).await;
                } else {
                    error!("unknown request or notification '{path}'");
                }
            }
            Some(other) => error!("inbound method member has unsupported type: {other}"),
        }
    }

    fn handle_fetch_notification(&self, fetch_id: FetchId, message: &Value) {
        let Some(fetcher) = self.registry.fetcher(fetch_id) else {
            debug!("dropping notification for unknown fetch id {fetch_id}");
            return;
        };
        let params = message.get(consts::PARAMS).cloned().unwrap_or(Value::Null);
        let callback = fetcher.callback;
        if catch_unwind(AssertUnwindSafe(|| callback(&params, 0))).is_err() {
            error!("fetch callback '{}' panicked", fetcher.matcher);
        }
    }

    /// Another peer sets one of our states. See the state-set contract:
    /// on success the `change` notification goes out before the response,
    /// so peers fetching the state see the new value before the setter is
    /// unblocked.
    async fn handle_state_set(&self, path: &str, handler: Option<StateHandler>, message: &Value) {
        let value = message
            .get(consts::PARAMS)
            .and_then(|params| params.get(consts::VALUE));
        // A set without a requested value is degenerate: no handler runs
        // and no response is sent, id or not.
        let Some(value) = value.filter(|value| !value.is_null()) else {
            return;
        };

        let outcome = match handler {
            None => Err(RpcError::internal("state is read only!")),
            Some(handler) => match catch_unwind(AssertUnwindSafe(|| handler(value, path))) {
                Err(_) => Err(RpcError::internal("caught exception!")),
                Ok(Err(error)) => Err(error),
                Ok(Ok(change)) => {
                    if let Some(new_value) = change.value {
                        let notification = message::change_notification(path, new_value);
                        if let Err(e) = self.send_message(&notification).await {
                            error!("unable to send change notification for state '{path}': {e}");
                        }
                    }
                    Ok(message::result_body(change.warning.as_ref()))
                }
            },
        };

        self.respond(path, outcome, message).await;
    }

    /// Another peer calls one of our methods.
    async fn handle_method_call(&self, path: &str, handler: MethodHandler, message: &Value) {
        let params = message.get(consts::PARAMS).cloned().unwrap_or(Value::Null);
        let outcome = match catch_unwind(AssertUnwindSafe(|| handler(&params))) {
            Err(_) => Err(RpcError::internal("caught exception!")),
            Ok(outcome) => outcome,
        };
        self.respond(path, outcome, message).await;
    }

    /// Send the response frame for an inbound request, unless the request
    /// came without an id and therefore wants no answer.
    async fn respond(&self, path: &str, outcome: Result<Value, RpcError>, message: &Value) {
        let Some(id) = message.get(consts::ID).filter(|id| !id.is_null()) else {
            return;
        };
        let response = match outcome {
            Ok(result) => message::result_response(id, result),
            Err(error) => message::error_response(id, &error),
        };
        if let Err(e) = self.send_message(&response).await {
            error!("unable to send response for '{path}': {e}");
        }
    }
}
