//! Blocking peer façade for synchronous applications.
//!
//! [`Peer`] owns a private tokio runtime and drives [`PeerAsync`] with
//! `block_on`, the way the original jet tooling runs its own event loop
//! thread. Every call blocks its caller until the daemon answered.
//!
//! Must not be used from inside an async context: the runtime refuses
//! nested `block_on`, which is exactly the deadlock this façade would
//! otherwise create.

use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use jet_common::protocol::handlers::{FetchHandler, MethodHandler, StateHandler};
use jet_common::{FetchId, Matcher, Result, Warning};

use crate::config::PeerConfig;
use crate::peer::{Access, PeerAsync};

/// Blocking jet peer.
///
/// # Example
///
/// ```no_run
/// use jet_peer::{Peer, PeerConfig};
/// use serde_json::json;
///
/// # fn main() -> jet_peer::Result<()> {
/// let peer = Peer::connect(PeerConfig::tcp("127.0.0.1", 11122).with_name("tool"))?;
/// let warning = peer.set_state_value("lcd/brightness", json!(7), None)?;
/// assert!(warning.is_none());
/// # Ok(())
/// # }
/// ```
pub struct Peer {
    // Declared before the runtime so teardown happens while the runtime is
    // still alive.
    peer: PeerAsync,
    runtime: Runtime,
}

impl Peer {
    /// Connect to the daemon described by `config`.
    pub fn connect(config: PeerConfig) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()?;
        let peer = runtime.block_on(PeerAsync::connect(config))?;
        Ok(Self { peer, runtime })
    }

    /// The asynchronous peer underneath, for mixing blocking and async use.
    pub fn async_peer(&self) -> &PeerAsync {
        &self.peer
    }

    /// Try to reconnect after a lost connection and restore all fetches.
    pub fn resume(&self) -> bool {
        self.runtime.block_on(self.peer.resume())
    }

    /// Retrieve information about the daemon.
    pub fn info(&self) -> Result<Value> {
        self.runtime.block_on(self.peer.info())
    }

    /// Announce name and debug preference to the daemon.
    pub fn config(&self, name: &str, debug: bool) -> Result<Value> {
        self.runtime.block_on(self.peer.config(name, debug))
    }

    /// Authenticate this peer against the daemon.
    pub fn authenticate(&self, user: &str, password: &str) -> Result<Value> {
        self.runtime.block_on(self.peer.authenticate(user, password))
    }

    /// Call a method of another peer.
    pub fn call_method(
        &self,
        path: &str,
        args: Option<Value>,
        timeout: Option<f64>,
    ) -> Result<Value> {
        self.runtime.block_on(self.peer.call_method(path, args, timeout))
    }

    /// Set a state of another peer. Returns the warning of an adapted set,
    /// `None` on a clean success.
    pub fn set_state_value(
        &self,
        path: &str,
        value: Value,
        timeout: Option<f64>,
    ) -> Result<Option<Warning>> {
        self.runtime
            .block_on(self.peer.set_state_value(path, value, timeout))
    }

    /// Snapshot all entries matching `matcher`.
    pub fn get(&self, matcher: &Matcher) -> Result<Value> {
        self.runtime.block_on(self.peer.get(matcher))
    }

    /// Subscribe to all entries matching `matcher`.
    pub fn add_fetch(&self, matcher: Matcher, callback: FetchHandler) -> Result<FetchId> {
        self.runtime.block_on(self.peer.add_fetch(matcher, callback))
    }

    /// Drop a subscription.
    pub fn remove_fetch(&self, fetch_id: FetchId) -> Result<()> {
        self.runtime.block_on(self.peer.remove_fetch(fetch_id))
    }

    /// Publish a state; without a handler it is read only.
    pub fn add_state(
        &self,
        path: &str,
        value: Value,
        timeout: Option<f64>,
        access: Option<Access>,
        handler: Option<StateHandler>,
    ) -> Result<()> {
        self.runtime
            .block_on(self.peer.add_state(path, value, timeout, access, handler))
    }

    /// Withdraw a state.
    pub fn remove_state(&self, path: &str) -> Result<()> {
        self.runtime.block_on(self.peer.remove_state(path))
    }

    /// Publish a method.
    pub fn add_method(
        &self,
        path: &str,
        timeout: Option<f64>,
        access: Option<Access>,
        handler: MethodHandler,
    ) -> Result<()> {
        self.runtime
            .block_on(self.peer.add_method(path, timeout, access, handler))
    }

    /// Withdraw a method.
    pub fn remove_method(&self, path: &str) -> Result<()> {
        self.runtime.block_on(self.peer.remove_method(path))
    }

    /// Notify a new value of an owned state, fire and forget.
    pub fn notify_state(&self, path: &str, value: Value) -> Result<()> {
        self.runtime.block_on(self.peer.notify_state(path, value))
    }
}
