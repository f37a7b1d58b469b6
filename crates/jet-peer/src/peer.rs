//! The asynchronous peer façade.
//!
//! Every operation comes in two flavors: a `*_async` variant taking an
//! optional response callback and returning right after the request is
//! framed, and an awaitable variant resolving with the daemon's answer.
//! Response callbacks and handlers run on the peer's receive task; the
//! awaitable variants bridge onto it with a one-shot channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde_json::{json, Map, Value};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use jet_common::protocol::handlers::{FetchHandler, MethodHandler, ResponseHandler, StateHandler};
use jet_common::protocol::message;
use jet_common::{consts, framing, FetchId, JetError, Matcher, Result, Warning};

use crate::config::PeerConfig;
use crate::registry::{Fetcher, LocalRegistry};
use crate::requests::RequestRegistry;
use crate::stream::{Endpoint, JetWriter};

/// User groups allowed to access a published state or method.
///
/// Empty group lists are omitted from the wire, leaving the daemon's
/// defaults in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Access {
    /// Groups allowed to fetch the entry.
    pub fetch_groups: Vec<String>,
    /// Groups allowed to set the state.
    pub set_groups: Vec<String>,
    /// Groups allowed to call the method.
    pub call_groups: Vec<String>,
}

impl Access {
    fn append_to(&self, params: &mut Map<String, Value>) {
        let mut access = Map::new();
        if !self.fetch_groups.is_empty() {
            access.insert(consts::FETCH_GROUPS.into(), json!(self.fetch_groups));
        }
        if !self.set_groups.is_empty() {
            access.insert(consts::SET_GROUPS.into(), json!(self.set_groups));
        }
        if !self.call_groups.is_empty() {
            access.insert(consts::CALL_GROUPS.into(), json!(self.call_groups));
        }
        if !access.is_empty() {
            params.insert(consts::ACCESS.into(), Value::Object(access));
        }
    }
}

/// Shared runtime state of one peer, owned jointly by the façade and the
/// receive task.
pub(crate) struct PeerInner {
    pub(crate) config: PeerConfig,
    pub(crate) endpoint: Endpoint,
    /// Write half of the stream; `None` while disconnected. Sending a frame
    /// holds this lock, so frames never interleave on the wire.
    pub(crate) writer: AsyncMutex<Option<JetWriter>>,
    pub(crate) requests: RequestRegistry,
    pub(crate) registry: LocalRegistry,
    pub(crate) next_fetch_id: AtomicU64,
    pub(crate) reader_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl PeerInner {
    /// Frame `value` and write it to the stream.
    ///
    /// Enforces the maximum message size before anything is written and
    /// maps write failures to [`JetError::Send`].
    pub(crate) async fn send_message(&self, value: &Value) -> Result<()> {
        let frame = framing::encode_message(value).map_err(|e| {
            error!("{e}");
            e
        })?;
        let mut writer = self.writer.lock().await;
        match writer.as_mut() {
            None => Err(JetError::Send("no connection to jet daemon".into())),
            Some(stream) => stream.write_all(&frame).await.map_err(|e| {
                error!("could not send message: {e}");
                JetError::Send(e.to_string())
            }),
        }
    }

    /// Compose and send a request.
    ///
    /// With a response callback present an id is allocated and attached;
    /// without one the request goes out as a notification and the daemon
    /// stays silent. A send failure with a callback present is turned into
    /// a synthetic error response delivered on the executor, never inline.
    pub(crate) async fn execute(
        self: &Arc<Self>,
        operation: &str,
        params: Value,
        handler: Option<ResponseHandler>,
    ) {
        match handler {
            None => {
                let frame = message::request(operation, params, None);
                if let Err(e) = self.send_message(&frame).await {
                    debug!("request '{operation}' without response callback failed: {e}");
                }
            }
            Some(handler) => {
                let id = self.requests.allocate(handler);
                let frame = message::request(operation, params, Some(id));
                if let Err(e) = self.send_message(&frame).await {
                    let error = e.to_rpc_error();
                    let inner = Arc::clone(self);
                    tokio::spawn(async move {
                        inner
                            .requests
                            .resolve(id, &message::error_response(&json!(id), &error));
                    });
                }
            }
        }
    }

    /// Wrap a response callback so an error response rolls the freshly
    /// registered state back out of the local registry.
    fn state_rollback(self: &Arc<Self>, path: &str, user: ResponseHandler) -> ResponseHandler {
        let weak = Arc::downgrade(self);
        let path = path.to_string();
        Box::new(move |response: &Value| {
            rollback_on_error(&weak, response, |inner| {
                inner.registry.unregister_state(&path);
            });
            user(response);
        })
    }

    fn method_rollback(self: &Arc<Self>, path: &str, user: ResponseHandler) -> ResponseHandler {
        let weak = Arc::downgrade(self);
        let path = path.to_string();
        Box::new(move |response: &Value| {
            rollback_on_error(&weak, response, |inner| {
                inner.registry.unregister_method(&path);
            });
            user(response);
        })
    }

    fn fetch_rollback(self: &Arc<Self>, fetch_id: FetchId, user: ResponseHandler) -> ResponseHandler {
        let weak = Arc::downgrade(self);
        Box::new(move |response: &Value| {
            rollback_on_error(&weak, response, |inner| {
                inner.registry.unregister_fetch(fetch_id);
            });
            user(response);
        })
    }
}

fn rollback_on_error(weak: &Weak<PeerInner>, response: &Value, undo: impl FnOnce(&PeerInner)) {
    if message::is_error(response) {
        if let Some(inner) = weak.upgrade() {
            undo(&inner);
        }
    }
}

/// One-shot cell bridging a response callback to an awaiting caller.
fn response_cell() -> (ResponseHandler, oneshot::Receiver<Value>) {
    let (tx, rx) = oneshot::channel();
    let handler: ResponseHandler = Box::new(move |response: &Value| {
        let _ = tx.send(response.clone());
    });
    (handler, rx)
}

/// Await the cell and split the response into result or error.
async fn await_response(rx: oneshot::Receiver<Value>) -> Result<Value> {
    let response = rx.await.map_err(|_| JetError::Canceled)?;
    Ok(message::into_result(&response)?)
}

/// Asynchronous jet peer.
///
/// Connects on construction and immediately announces itself with a
/// `config` request. Dropping the peer closes the stream, delivers a
/// terminal status to every fetch callback, and cancels all pending
/// requests with a synthetic error response.
pub struct PeerAsync {
    pub(crate) inner: Arc<PeerInner>,
}

impl PeerAsync {
    /// Connect to the daemon described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`JetError::Connection`] when the stream cannot be opened.
    pub async fn connect(config: PeerConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        let inner = Arc::new(PeerInner {
            config,
            endpoint,
            writer: AsyncMutex::new(None),
            requests: RequestRegistry::new(),
            registry: LocalRegistry::new(),
            next_fetch_id: AtomicU64::new(0),
            reader_task: parking_lot::Mutex::new(None),
        });
        inner.start().await?;
        Ok(Self { inner })
    }

    /// The endpoint this peer connects to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Try to reconnect after a lost connection.
    ///
    /// On success all fetches known before the disconnect are restored
    /// under their original ids and resume delivering notifications. On
    /// failure `false` is returned and nothing else happens.
    pub async fn resume(&self) -> bool {
        match self.inner.start().await {
            Ok(()) => true,
            Err(e) => {
                warn!("resume of jet peer '{}' failed: {e}", self.inner.config.name);
                false
            }
        }
    }

    /// Close the connection: every fetch callback sees the terminal status
    /// once, local registrations are cleared, and all pending requests are
    /// resolved with the canceled error.
    pub async fn close(&self) {
        self.inner.shutdown().await;
    }

    // --- operations available to any peer ---------------------------------

    /// Retrieve information about the daemon.
    pub async fn info_async(&self, result: Option<ResponseHandler>) {
        self.inner.execute(consts::INFO, json!({}), result).await;
    }

    pub async fn info(&self) -> Result<Value> {
        let (handler, rx) = response_cell();
        self.info_async(Some(handler)).await;
        await_response(rx).await
    }

    /// Announce name and debug preference to the daemon.
    pub async fn config_async(&self, name: &str, debug: bool, result: Option<ResponseHandler>) {
        let params = json!({consts::NAME: name, consts::DEBUG: debug});
        self.inner.execute(consts::CONFIG, params, result).await;
    }

    pub async fn config(&self, name: &str, debug: bool) -> Result<Value> {
        let (handler, rx) = response_cell();
        self.config_async(name, debug, Some(handler)).await;
        await_response(rx).await
    }

    /// Authenticate this peer against the daemon.
    pub async fn authenticate_async(
        &self,
        user: &str,
        password: &str,
        result: Option<ResponseHandler>,
    ) {
        let params = json!({consts::USER: user, consts::PASSWORD: password});
        self.inner.execute(consts::AUTHENTICATE, params, result).await;
    }

    pub async fn authenticate(&self, user: &str, password: &str) -> Result<Value> {
        let (handler, rx) = response_cell();
        self.authenticate_async(user, password, Some(handler)).await;
        await_response(rx).await
    }

    // --- operations towards entries owned by other peers ------------------

    /// Call a method of another peer.
    ///
    /// `args` is forwarded under `args` unless `None`; `timeout` is a hint
    /// in seconds forwarded to the daemon, which enforces it.
    pub async fn call_method_async(
        &self,
        path: &str,
        args: Option<Value>,
        timeout: Option<f64>,
        result: Option<ResponseHandler>,
    ) {
        let mut params = Map::new();
        if let Some(timeout) = timeout {
            params.insert(consts::TIMEOUT.into(), json!(timeout));
        }
        params.insert(consts::PATH.into(), json!(path));
        if let Some(args) = args.filter(|args| !args.is_null()) {
            params.insert(consts::ARGS.into(), args);
        }
        self.inner.execute(consts::CALL, Value::Object(params), result).await;
    }

    /// Call a method of another peer and await its result.
    ///
    /// # Errors
    ///
    /// [`JetError::Rpc`] with the daemon's error object when the call is
    /// rejected, [`JetError::Canceled`] when the peer shuts down first.
    pub async fn call_method(
        &self,
        path: &str,
        args: Option<Value>,
        timeout: Option<f64>,
    ) -> Result<Value> {
        let (handler, rx) = response_cell();
        self.call_method_async(path, args, timeout, Some(handler)).await;
        await_response(rx).await
    }

    /// Request a new value for a state owned by another peer.
    pub async fn set_state_value_async(
        &self,
        path: &str,
        value: Value,
        timeout: Option<f64>,
        result: Option<ResponseHandler>,
    ) {
        let mut params = Map::new();
        if let Some(timeout) = timeout {
            params.insert(consts::TIMEOUT.into(), json!(timeout));
        }
        params.insert(consts::PATH.into(), json!(path));
        params.insert(consts::VALUE.into(), value);
        self.inner.execute(consts::SET, Value::Object(params), result).await;
    }

    /// Request a new value for a remote state and await the response.
    ///
    /// Returns the warning of an adapted set, `None` on a clean success.
    pub async fn set_state_value(
        &self,
        path: &str,
        value: Value,
        timeout: Option<f64>,
    ) -> Result<Option<Warning>> {
        let (handler, rx) = response_cell();
        self.set_state_value_async(path, value, timeout, Some(handler)).await;
        let response = rx.await.map_err(|_| JetError::Canceled)?;
        message::into_result(&response)?;
        Ok(message::response_warning(&response))
    }

    /// Snapshot all matching entries. The result is an array of
    /// `{path, value}` objects.
    pub async fn get_async(&self, matcher: &Matcher, result: ResponseHandler) {
        let mut params = Map::new();
        matcher.append_to(&mut params);
        self.inner.execute(consts::GET, Value::Object(params), Some(result)).await;
    }

    pub async fn get(&self, matcher: &Matcher) -> Result<Value> {
        let (handler, rx) = response_cell();
        self.get_async(matcher, handler).await;
        await_response(rx).await
    }

    /// Subscribe to all entries matching `matcher`.
    ///
    /// The callback is registered before the `fetch` request goes out, so
    /// the initial burst of `add` notifications is never lost. If the
    /// daemon answers with an error the registration is rolled back; the
    /// returned fetch id identifies the subscription either way.
    pub async fn add_fetch_async(
        &self,
        matcher: Matcher,
        callback: FetchHandler,
        result: Option<ResponseHandler>,
    ) -> FetchId {
        let fetch_id = self.inner.next_fetch_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut params = Map::new();
        params.insert(consts::ID.into(), json!(fetch_id));
        matcher.append_to(&mut params);

        self.inner.registry.register_fetch(
            fetch_id,
            Fetcher {
                callback,
                matcher,
            },
        );
        let result = result.map(|user| self.inner.fetch_rollback(fetch_id, user));
        self.inner.execute(consts::FETCH, Value::Object(params), result).await;
        fetch_id
    }

    /// Subscribe and await the daemon's confirmation.
    pub async fn add_fetch(&self, matcher: Matcher, callback: FetchHandler) -> Result<FetchId> {
        let (handler, rx) = response_cell();
        let fetch_id = self.add_fetch_async(matcher, callback, Some(handler)).await;
        await_response(rx).await?;
        Ok(fetch_id)
    }

    /// Drop a subscription. The callback is deregistered before the
    /// `unfetch` request goes out.
    pub async fn remove_fetch_async(&self, fetch_id: FetchId, result: Option<ResponseHandler>) {
        self.inner.registry.unregister_fetch(fetch_id);
        let params = json!({consts::ID: fetch_id});
        self.inner.execute(consts::UNFETCH, params, result).await;
    }

    pub async fn remove_fetch(&self, fetch_id: FetchId) -> Result<()> {
        let (handler, rx) = response_cell();
        self.remove_fetch_async(fetch_id, Some(handler)).await;
        await_response(rx).await?;
        Ok(())
    }

    // --- operations of the owning peer ------------------------------------

    /// Publish a state.
    ///
    /// The handler is invoked whenever another peer sets the state; without
    /// a handler the state is read only and published with `fetchOnly`. The
    /// handler is installed before the `add` request goes out and rolled
    /// back when the daemon rejects it (only possible when a response
    /// callback was supplied).
    pub async fn add_state_async(
        &self,
        path: &str,
        value: Value,
        timeout: Option<f64>,
        access: Option<Access>,
        handler: Option<StateHandler>,
        result: Option<ResponseHandler>,
    ) {
        let mut params = Map::new();
        if let Some(timeout) = timeout {
            params.insert(consts::TIMEOUT.into(), json!(timeout));
        }
        if let Some(access) = &access {
            access.append_to(&mut params);
        }
        params.insert(consts::PATH.into(), json!(path));
        params.insert(consts::VALUE.into(), value);
        if handler.is_none() {
            params.insert(consts::FETCH_ONLY.into(), json!(true));
        }

        self.inner.registry.register_state(path, handler);
        let result = result.map(|user| self.inner.state_rollback(path, user));
        self.inner.execute(consts::ADD, Value::Object(params), result).await;
    }

    /// Publish a state and await the daemon's confirmation.
    pub async fn add_state(
        &self,
        path: &str,
        value: Value,
        timeout: Option<f64>,
        access: Option<Access>,
        handler: Option<StateHandler>,
    ) -> Result<()> {
        let (cell, rx) = response_cell();
        self.add_state_async(path, value, timeout, access, handler, Some(cell)).await;
        await_response(rx).await?;
        Ok(())
    }

    /// Withdraw a state. The local handler is removed before the `remove`
    /// request goes out; an empty path is a no-op.
    pub async fn remove_state_async(&self, path: &str, result: Option<ResponseHandler>) {
        if path.is_empty() {
            return;
        }
        self.inner.registry.unregister_state(path);
        let params = json!({consts::PATH: path});
        self.inner.execute(consts::REMOVE, params, result).await;
    }

    pub async fn remove_state(&self, path: &str) -> Result<()> {
        let (handler, rx) = response_cell();
        self.remove_state_async(path, Some(handler)).await;
        await_response(rx).await?;
        Ok(())
    }

    /// Publish a method other peers can call.
    pub async fn add_method_async(
        &self,
        path: &str,
        timeout: Option<f64>,
        access: Option<Access>,
        handler: MethodHandler,
        result: Option<ResponseHandler>,
    ) {
        let mut params = Map::new();
        if let Some(timeout) = timeout {
            params.insert(consts::TIMEOUT.into(), json!(timeout));
        }
        if let Some(access) = &access {
            access.append_to(&mut params);
        }
        params.insert(consts::PATH.into(), json!(path));

        self.inner.registry.register_method(path, handler);
        let result = result.map(|user| self.inner.method_rollback(path, user));
        self.inner.execute(consts::ADD, Value::Object(params), result).await;
    }

    /// Publish a method and await the daemon's confirmation.
    pub async fn add_method(
        &self,
        path: &str,
        timeout: Option<f64>,
        access: Option<Access>,
        handler: MethodHandler,
    ) -> Result<()> {
        let (cell, rx) = response_cell();
        self.add_method_async(path, timeout, access, handler, Some(cell)).await;
        await_response(rx).await?;
        Ok(())
    }

    /// Withdraw a method. An empty path is a no-op.
    pub async fn remove_method_async(&self, path: &str, result: Option<ResponseHandler>) {
        if path.is_empty() {
            return;
        }
        self.inner.registry.unregister_method(path);
        let params = json!({consts::PATH: path});
        self.inner.execute(consts::REMOVE, params, result).await;
    }

    pub async fn remove_method(&self, path: &str) -> Result<()> {
        let (handler, rx) = response_cell();
        self.remove_method_async(path, Some(handler)).await;
        await_response(rx).await?;
        Ok(())
    }

    /// Tell the daemon about a new value of an owned state.
    ///
    /// Goes out as a `change` notification without an id, so the daemon
    /// sends no response. This is the hot path for measurement values.
    pub async fn notify_state(&self, path: &str, value: Value) -> Result<()> {
        let frame = message::change_notification(path, value);
        self.inner.send_message(&frame).await
    }

    /// Frame and send an arbitrary payload.
    ///
    /// Low-level escape hatch; the payload must be a complete jet message.
    pub async fn send_message(&self, value: &Value) -> Result<()> {
        self.inner.send_message(value).await
    }
}
