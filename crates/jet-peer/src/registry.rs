//! Local registry: the three keyed tables of things this peer owns.
//!
//! States and methods are keyed by path, fetches by fetch id. Entries are
//! inserted *before* the corresponding `add`/`fetch` request is sent and
//! rolled back when the daemon answers with an error; the daemon may echo a
//! freshly added entry through a fetch before the add response arrives, so
//! the handler must already be installed by then.
//!
//! Handlers are never invoked under a table lock: lookups clone the handler
//! out, so a running handler may itself register or deregister entries.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::error;

use jet_common::protocol::handlers::{FetchHandler, MethodHandler, StateHandler};
use jet_common::{FetchId, Matcher, FETCH_LOST};

/// A registered fetch: the notification callback plus the matcher it was
/// created with, kept for restoration after a reconnect.
#[derive(Clone)]
pub(crate) struct Fetcher {
    pub(crate) callback: FetchHandler,
    pub(crate) matcher: Matcher,
}

pub(crate) struct LocalRegistry {
    /// `None` marks a read-only state: registered, but refusing sets.
    states: Mutex<HashMap<String, Option<StateHandler>>>,
    methods: Mutex<HashMap<String, MethodHandler>>,
    fetchers: Mutex<HashMap<FetchId, Fetcher>>,
}

impl LocalRegistry {
    pub(crate) fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            methods: Mutex::new(HashMap::new()),
            fetchers: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn register_state(&self, path: &str, handler: Option<StateHandler>) {
        self.states.lock().insert(path.to_string(), handler);
    }

    pub(crate) fn unregister_state(&self, path: &str) -> bool {
        self.states.lock().remove(path).is_some()
    }

    /// `None`: not a state of this peer. `Some(None)`: read-only state.
    pub(crate) fn state_entry(&self, path: &str) -> Option<Option<StateHandler>> {
        self.states.lock().get(path).cloned()
    }

    pub(crate) fn register_method(&self, path: &str, handler: MethodHandler) {
        self.methods.lock().insert(path.to_string(), handler);
    }

    pub(crate) fn unregister_method(&self, path: &str) -> bool {
        self.methods.lock().remove(path).is_some()
    }

    pub(crate) fn method_entry(&self, path: &str) -> Option<MethodHandler> {
        self.methods.lock().get(path).cloned()
    }

    pub(crate) fn register_fetch(&self, id: FetchId, fetcher: Fetcher) {
        self.fetchers.lock().insert(id, fetcher);
    }

    pub(crate) fn unregister_fetch(&self, id: FetchId) -> bool {
        self.fetchers.lock().remove(&id).is_some()
    }

    pub(crate) fn fetcher(&self, id: FetchId) -> Option<Fetcher> {
        self.fetchers.lock().get(&id).cloned()
    }

    /// The live fetches as `(id, matcher)` pairs, for restoration after a
    /// reconnect.
    pub(crate) fn fetch_snapshot(&self) -> Vec<(FetchId, Matcher)> {
        self.fetchers
            .lock()
            .iter()
            .map(|(id, fetcher)| (*id, fetcher.matcher.clone()))
            .collect()
    }

    /// Tell every fetch callback once that the connection is gone. The
    /// fetches stay registered so a later resume can restore them.
    pub(crate) fn connection_lost(&self) {
        let fetchers: Vec<Fetcher> = self.fetchers.lock().values().cloned().collect();
        for fetcher in fetchers {
            let callback = fetcher.callback;
            if catch_unwind(AssertUnwindSafe(|| callback(&Value::Null, FETCH_LOST))).is_err() {
                error!("fetch callback '{}' panicked on connection loss", fetcher.matcher);
            }
        }
    }

    pub(crate) fn clear_states(&self) {
        self.states.lock().clear();
    }

    pub(crate) fn clear_methods(&self) {
        self.methods.lock().clear();
    }

    /// The daemon forgets all fetches of a disconnected peer by itself; on
    /// final shutdown we do the same.
    pub(crate) fn clear_fetchers(&self) {
        self.fetchers.lock().clear();
    }
}
