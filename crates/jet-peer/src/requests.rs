//! Pending-request table.
//!
//! Every outbound request that expects a response allocates an id here and
//! deposits its response callback. The dispatcher resolves the id when the
//! response frame arrives; shutdown cancels whatever is left. Each callback
//! runs exactly once, outside the table lock.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, warn};

use jet_common::protocol::handlers::ResponseHandler;
use jet_common::protocol::message;
use jet_common::{consts, RpcError};

pub(crate) type RequestId = u64;

pub(crate) struct RequestRegistry {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, ResponseHandler>>,
}

impl RequestRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Allocate a fresh request id and deposit the response callback.
    pub(crate) fn allocate(&self, handler: ResponseHandler) -> RequestId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.pending.lock().insert(id, handler);
        id
    }

    /// Resolve a response frame against the table, using its `id` member.
    pub(crate) fn resolve_response(&self, response: &Value) {
        match response.get(consts::ID).and_then(Value::as_u64) {
            Some(id) => self.resolve(id, response),
            None => warn!("dropping response without usable id: {response}"),
        }
    }

    /// Remove the callback registered under `id` and invoke it with
    /// `response`. Unknown ids are logged and dropped.
    ///
    /// The callback runs after the table lock is released, so it may call
    /// back into the peer façade without deadlocking.
    pub(crate) fn resolve(&self, id: RequestId, response: &Value) {
        let handler = self.pending.lock().remove(&id);
        match handler {
            Some(handler) => {
                if catch_unwind(AssertUnwindSafe(move || handler(response))).is_err() {
                    debug!("response callback for request id={id} panicked");
                }
            }
            None => warn!("no request with id={id} is waiting for a response"),
        }
    }

    /// Cancel every pending request with the synthetic canceled-error
    /// response. Returns how many requests were canceled.
    pub(crate) fn cancel_all(&self) -> usize {
        let drained: Vec<(RequestId, ResponseHandler)> =
            self.pending.lock().drain().collect();
        let count = drained.len();
        for (id, handler) in drained {
            let response = message::error_response(&json!(id), &RpcError::canceled());
            if catch_unwind(AssertUnwindSafe(move || handler(&response))).is_err() {
                debug!("response callback for canceled request id={id} panicked");
            }
        }
        count
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}
